//! Read-through and invalidation behavior of the link service against a
//! store that counts every read.

mod support;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use linkstash::application::links::{
    CreateLinkCommand, LinkPatch, LinkService, LinkServiceError,
};
use linkstash::application::repos::{LinksRepo, LinksWriteRepo, RepoError, UpdateLinkParams};
use linkstash::cache::{CacheConfig, CacheTrigger, CollectionCache};
use linkstash::domain::links::LinkRecord;
use linkstash::application::workspaces::{CreateWorkspaceCommand, WorkspaceServiceError};
use linkstash::cache::QuerySignature;
use linkstash::domain::error::DomainError;
use linkstash::domain::types::{Category, LinkScope};
use linkstash::domain::workspaces::DEFAULT_WORKSPACE_ID;
use linkstash::infra::memory::InMemoryRepositories;
use uuid::Uuid;

use support::{Harness, ids, record};

const INBOX: LinkScope = LinkScope::Category(Category::Inbox);
const FAVORITES: LinkScope = LinkScope::Category(Category::Favorites);
const TRASH: LinkScope = LinkScope::Category(Category::Trash);
const SCOPES: [LinkScope; 4] = [INBOX, FAVORITES, TRASH, LinkScope::All];

/// Three live links and one in the trash, in the default workspace.
async fn seeded() -> (Harness, Vec<Uuid>) {
    let store = InMemoryRepositories::new();
    let oldest = record(DEFAULT_WORKSPACE_ID, 0, "https://oldest.example");
    let middle = record(DEFAULT_WORKSPACE_ID, 10, "https://middle.example");
    let newest = record(DEFAULT_WORKSPACE_ID, 20, "https://newest.example");
    let mut trashed = record(DEFAULT_WORKSPACE_ID, 30, "https://trashed.example");
    trashed.is_deleted = true;

    let expected = vec![newest.id, middle.id, oldest.id];
    store.seed_link(oldest, &["rust"]).await;
    store.seed_link(middle, &[]).await;
    store.seed_link(newest, &["infra", "rust"]).await;
    store.seed_link(trashed, &[]).await;
    (Harness::new(store), expected)
}

fn create(workspace_id: Uuid, url: &str) -> CreateLinkCommand {
    CreateLinkCommand {
        workspace_id,
        url: url.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn cold_inbox_read_fills_and_repeat_read_skips_the_store() {
    let (harness, expected) = seeded().await;

    let first = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("first list");
    assert_eq!(ids(&first), expected);
    assert_eq!(first[0].tags, vec!["infra", "rust"]);
    assert!(harness.repo.store_calls() > 0);

    harness.repo.reset();
    let second = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("second list");
    assert_eq!(second, first);
    assert_eq!(harness.repo.store_calls(), 0);
}

#[tokio::test]
async fn favoriting_shows_in_favorites_and_stays_in_inbox() {
    let (harness, expected) = seeded().await;
    let target = expected[1];

    for scope in [INBOX, FAVORITES] {
        harness
            .links
            .list(DEFAULT_WORKSPACE_ID, scope)
            .await
            .expect("warm");
    }

    let updated = harness
        .links
        .update(
            target,
            LinkPatch {
                is_favorite: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert!(updated.is_favorite);

    let favorites = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, FAVORITES)
        .await
        .expect("favorites");
    assert_eq!(ids(&favorites), vec![target]);

    let inbox = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("inbox");
    assert_eq!(ids(&inbox), expected);
    let listed = inbox.iter().find(|link| link.id == target).expect("listed");
    assert!(listed.is_favorite);
}

#[tokio::test]
async fn second_create_fetches_only_the_new_link() {
    let harness = Harness::new(InMemoryRepositories::new());

    let first = harness
        .links
        .create(create(DEFAULT_WORKSPACE_ID, "https://first.example"))
        .await
        .expect("first create");
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");

    let second = harness
        .links
        .create(create(DEFAULT_WORKSPACE_ID, "https://second.example"))
        .await
        .expect("second create");

    harness.repo.reset();
    let inbox = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("list");

    assert_eq!(ids(&inbox), vec![second.id, first.id]);
    assert_eq!(harness.repo.id_reads(), 1);
    assert_eq!(harness.repo.fetched(), vec![vec![second.id]]);
}

#[tokio::test]
async fn invalidated_collection_does_not_list_the_entity_until_reread() {
    let (harness, expected) = seeded().await;
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");
    let signature = QuerySignature::new(DEFAULT_WORKSPACE_ID, INBOX);
    assert!(harness.cache.workspace_lists(DEFAULT_WORKSPACE_ID, expected[0]));

    harness
        .links
        .update(
            expected[0],
            LinkPatch {
                is_deleted: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("trash");

    assert!(harness.cache.get_collection(&signature).is_none());
    assert!(!harness.cache.workspace_lists(DEFAULT_WORKSPACE_ID, expected[0]));

    let inbox = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("reread");
    assert_eq!(ids(&inbox), expected[1..].to_vec());
    let trash = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, TRASH)
        .await
        .expect("trash list");
    assert!(ids(&trash).contains(&expected[0]));
}

#[tokio::test]
async fn writes_in_one_workspace_leave_other_workspaces_cached() {
    let store = InMemoryRepositories::new();
    let other = support::workspace("Other", "other");
    let other_id = other.id;
    store.seed_workspace(other).await;
    store
        .seed_link(record(other_id, 0, "https://other.example"), &[])
        .await;
    let harness = Harness::new(store);

    harness.links.list(other_id, INBOX).await.expect("warm");
    harness
        .links
        .create(create(DEFAULT_WORKSPACE_ID, "https://default.example"))
        .await
        .expect("create");

    harness.repo.reset();
    harness.links.list(other_id, INBOX).await.expect("reread");
    assert_eq!(harness.repo.store_calls(), 0);
}

#[tokio::test]
async fn ambiguous_failure_on_uncached_link_clears_every_collection() {
    let (harness, expected) = seeded().await;
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, TRASH)
        .await
        .expect("warm");
    assert_eq!(harness.cache.collection_count(), 2);

    // Only the snapshot goes; the workspace of the link is then unknown.
    harness.cache.invalidate_entity(expected[2], Some(Uuid::nil()));
    assert!(harness.cache.get_entity(expected[2]).is_none());
    assert_eq!(harness.cache.collection_count(), 2);

    harness.repo.fail_after_write(true);
    let result = harness
        .links
        .update(
            expected[2],
            LinkPatch {
                title: Some(Some("Renamed".to_string())),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(LinkServiceError::Repo(_))));
    assert_eq!(harness.cache.collection_count(), 0);

    harness.repo.fail_after_write(false);
    let inbox = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("reread");
    let renamed = inbox
        .iter()
        .find(|link| link.id == expected[2])
        .expect("listed");
    assert_eq!(renamed.title.as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn ambiguous_failure_on_cached_link_targets_its_workspace() {
    let store = InMemoryRepositories::new();
    let other = support::workspace("Other", "other");
    let other_id = other.id;
    store.seed_workspace(other).await;
    let link = record(DEFAULT_WORKSPACE_ID, 0, "https://a.example");
    let link_id = link.id;
    store.seed_link(link, &[]).await;
    let harness = Harness::new(store);

    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");
    harness.links.list(other_id, INBOX).await.expect("warm");

    harness.repo.fail_after_write(true);
    let result = harness.links.delete(link_id).await;
    assert!(result.is_err());

    assert!(
        harness
            .cache
            .get_collection(&QuerySignature::new(DEFAULT_WORKSPACE_ID, INBOX))
            .is_none()
    );
    assert!(
        harness
            .cache
            .get_collection(&QuerySignature::new(other_id, INBOX))
            .is_some()
    );
}

#[tokio::test]
async fn ambiguous_create_failure_drops_the_workspace_listing() {
    let (harness, expected) = seeded().await;
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");

    harness.repo.fail_after_write(true);
    let result = harness
        .links
        .create(create(DEFAULT_WORKSPACE_ID, "https://maybe.example"))
        .await;
    assert!(matches!(result, Err(LinkServiceError::Repo(_))));
    assert!(
        harness
            .cache
            .get_collection(&QuerySignature::new(DEFAULT_WORKSPACE_ID, INBOX))
            .is_none()
    );

    harness.repo.fail_after_write(false);
    let inbox = harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("reread");
    assert_eq!(inbox.len(), expected.len() + 1);
    assert_eq!(inbox[0].url, "https://maybe.example/");
}

#[tokio::test]
async fn missing_link_update_is_not_found_and_invalidates_nothing() {
    let (harness, _) = seeded().await;
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");

    let result = harness
        .links
        .update(
            Uuid::new_v4(),
            LinkPatch {
                is_favorite: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(LinkServiceError::Domain(DomainError::NotFound { entity: "link" }))
    ));
    assert_eq!(harness.cache.collection_count(), 1);
}

#[tokio::test]
async fn create_rejects_bad_input_without_touching_the_cache() {
    let harness = Harness::new(InMemoryRepositories::new());
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm");

    let bad_url = harness
        .links
        .create(create(DEFAULT_WORKSPACE_ID, "ftp://files.example"))
        .await;
    assert!(matches!(
        bad_url,
        Err(LinkServiceError::Domain(DomainError::Validation { field: "url", .. }))
    ));

    let mut too_many = create(DEFAULT_WORKSPACE_ID, "https://tags.example");
    too_many.tags = (0..11).map(|n| format!("tag{n}")).collect();
    assert!(matches!(
        harness.links.create(too_many).await,
        Err(LinkServiceError::Domain(DomainError::Validation { field: "tags", .. }))
    ));

    let unknown = harness
        .links
        .create(create(Uuid::new_v4(), "https://a.example"))
        .await;
    assert!(matches!(
        unknown,
        Err(LinkServiceError::Domain(DomainError::NotFound {
            entity: "workspace"
        }))
    ));

    assert_eq!(harness.cache.collection_count(), 1);
}

#[tokio::test]
async fn deleting_a_workspace_drops_its_collections() {
    let harness = Harness::new(InMemoryRepositories::new());
    let created = harness
        .workspaces
        .create(CreateWorkspaceCommand {
            id: None,
            name: "Research".to_string(),
        })
        .await
        .expect("create workspace");
    let link = harness
        .links
        .create(create(created.id, "https://paper.example"))
        .await
        .expect("create link");
    let listed = harness.links.list(created.id, INBOX).await.expect("list");
    assert_eq!(ids(&listed), vec![link.id]);

    harness.workspaces.delete(created.id).await.expect("delete");
    assert!(harness.links.list(created.id, INBOX).await.expect("list").is_empty());
    assert!(harness.cache.get_entity(link.id).is_none());
}

#[tokio::test]
async fn last_workspace_cannot_be_deleted() {
    let harness = Harness::new(InMemoryRepositories::new());
    let result = harness.workspaces.delete(DEFAULT_WORKSPACE_ID).await;
    assert!(matches!(
        result,
        Err(WorkspaceServiceError::Domain(DomainError::LastWorkspace))
    ));
    assert_eq!(harness.workspaces.list().await.expect("list").len(), 1);
}

/// Small deterministic generator so the mutation sequence is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[tokio::test]
async fn cache_agrees_with_store_across_mutation_sequences() {
    for seed in [1_u64, 7, 42, 2024] {
        let store = InMemoryRepositories::new();
        let second = support::workspace("Second", "second");
        let workspaces = [DEFAULT_WORKSPACE_ID, second.id];
        store.seed_workspace(second).await;
        let harness = Harness::new(store);
        let mut rng = Lcg(seed);
        let mut live: Vec<Uuid> = Vec::new();

        for step in 0..60 {
            let workspace_id = workspaces[rng.next(workspaces.len())];
            match rng.next(5) {
                0 | 1 => {
                    let mut command = create(workspace_id, &format!("https://{seed}-{step}.example"));
                    command.tags = vec![format!("t{}", rng.next(3))];
                    let link = harness.links.create(command).await.expect("create");
                    live.push(link.id);
                }
                2 if !live.is_empty() => {
                    let id = live[rng.next(live.len())];
                    let patch = LinkPatch {
                        is_favorite: Some(rng.next(2) == 0),
                        is_deleted: Some(rng.next(3) == 0),
                        ..Default::default()
                    };
                    harness.links.update(id, patch).await.expect("update");
                }
                3 if !live.is_empty() => {
                    let id = live[rng.next(live.len())];
                    let patch = LinkPatch {
                        tags: Some(vec![format!("t{}", rng.next(3))]),
                        ..Default::default()
                    };
                    harness.links.update(id, patch).await.expect("retag");
                }
                4 if !live.is_empty() => {
                    let id = live.swap_remove(rng.next(live.len()));
                    harness.links.delete(id).await.expect("delete");
                }
                _ => {}
            }

            for workspace_id in workspaces {
                for scope in SCOPES {
                    let cached = harness
                        .links
                        .list(workspace_id, scope)
                        .await
                        .expect("cached list");
                    let truth = harness
                        .reference
                        .list(workspace_id, scope)
                        .await
                        .expect("reference list");
                    assert_eq!(cached, truth, "seed {seed} step {step} {scope}");
                }
            }
        }
    }
}

/// Trashes one link inside the row fetch, after the id query has run.
struct TrashDuringFetch {
    inner: InMemoryRepositories,
    trigger: Arc<CacheTrigger>,
    target: Mutex<Option<Uuid>>,
}

#[async_trait]
impl LinksRepo for TrashDuringFetch {
    async fn list_link_ids(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<Uuid>, RepoError> {
        self.inner.list_link_ids(workspace_id, scope).await
    }

    async fn list_links(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<LinkRecord>, RepoError> {
        self.inner.list_links(workspace_id, scope).await
    }

    async fn find_links(&self, ids: &[Uuid]) -> Result<Vec<LinkRecord>, RepoError> {
        let target = self.target.lock().expect("target").take();
        if let Some(id) = target {
            self.inner
                .update_link(UpdateLinkParams {
                    id,
                    is_deleted: Some(true),
                    ..Default::default()
                })
                .await?;
            self.trigger.link_updated(id, Some(DEFAULT_WORKSPACE_ID));
        }
        self.inner.find_links(ids).await
    }

    async fn tags_for_links(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, RepoError> {
        self.inner.tags_for_links(ids).await
    }
}

#[tokio::test]
async fn write_between_id_query_and_row_fetch_is_not_listed() {
    let store = InMemoryRepositories::new();
    let kept = record(DEFAULT_WORKSPACE_ID, 0, "https://kept.example");
    let trashed = record(DEFAULT_WORKSPACE_ID, 10, "https://trashed.example");
    let (kept_id, trashed_id) = (kept.id, trashed.id);
    store.seed_link(kept, &[]).await;
    store.seed_link(trashed, &[]).await;

    let config = CacheConfig::default();
    let cache = Arc::new(CollectionCache::new(&config));
    let trigger = Arc::new(CacheTrigger::new(config, cache.clone()));
    let reader = Arc::new(TrashDuringFetch {
        inner: store.clone(),
        trigger: trigger.clone(),
        target: Mutex::new(Some(trashed_id)),
    });
    let plain = Arc::new(store);
    let links = LinkService::new(reader, plain.clone(), plain)
        .with_cache(cache.clone())
        .with_cache_trigger(trigger);

    let inbox = links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("racing list");
    assert_eq!(ids(&inbox), vec![kept_id]);
    assert!(inbox.iter().all(|link| !link.is_deleted));
    assert!(
        cache
            .get_collection(&QuerySignature::new(DEFAULT_WORKSPACE_ID, INBOX))
            .is_none()
    );

    let inbox = links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("reread");
    assert_eq!(ids(&inbox), vec![kept_id]);
    let trash = links
        .list(DEFAULT_WORKSPACE_ID, TRASH)
        .await
        .expect("trash");
    assert_eq!(ids(&trash), vec![trashed_id]);
}
