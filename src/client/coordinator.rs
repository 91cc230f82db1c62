//! Optimistic link store.
//!
//! Every mutation is applied to the held list synchronously, then sent to the
//! server. Success swaps in the server's record; failure undoes only that
//! mutation's own change and reports it to the observer. The lock guarding
//! the list is never held across a network call, so any number of mutations
//! may be in flight at once.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::cache::lock::mutex_lock;
use crate::domain::links::{Link, newest_first, normalize_tags};
use crate::domain::types::LinkScope;
use crate::infra::http::api::models::{LinkCreateRequest, LinkUpdateRequest};

use super::error::ClientError;
use super::gateway::LinkGateway;
use super::observer::{LinkListObserver, LoggingObserver};

const TARGET: &str = "client::coordinator";

/// Input for [`OptimisticLinks::add`]. Without a workspace the link goes to
/// the one currently held.
#[derive(Debug, Clone, Default)]
pub struct LinkDraft {
    pub workspace_id: Option<Uuid>,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub logo: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub enum MutationOutcome<T> {
    /// The server accepted the change; the held list now carries its record.
    Confirmed(T),
    /// The server call failed and the optimistic change was undone.
    RolledBack(ClientError),
    /// The link was not held, nothing was attempted.
    Missing(Uuid),
}

impl<T> MutationOutcome<T> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn confirmed(self) -> Option<T> {
        match self {
            Self::Confirmed(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Held {
    workspace_id: Option<Uuid>,
    links: Vec<Link>,
    in_flight: usize,
}

pub struct OptimisticLinks {
    gateway: Arc<dyn LinkGateway>,
    observer: Arc<dyn LinkListObserver>,
    held: Mutex<Held>,
}

impl OptimisticLinks {
    pub fn new(gateway: Arc<dyn LinkGateway>) -> Self {
        Self {
            gateway,
            observer: Arc::new(LoggingObserver),
            held: Mutex::new(Held::default()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LinkListObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Snapshot of the held list, newest first.
    pub fn links(&self) -> Vec<Link> {
        mutex_lock(&self.held, TARGET, "links").links.clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Link> {
        mutex_lock(&self.held, TARGET, "get")
            .links
            .iter()
            .find(|link| link.id == id)
            .cloned()
    }

    pub fn workspace_id(&self) -> Option<Uuid> {
        mutex_lock(&self.held, TARGET, "workspace_id").workspace_id
    }

    /// Mutations applied locally whose server call has not settled yet.
    pub fn in_flight(&self) -> usize {
        mutex_lock(&self.held, TARGET, "in_flight").in_flight
    }

    /// Replace the held list wholesale.
    pub fn hydrate(&self, workspace_id: Uuid, mut links: Vec<Link>) {
        links.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        self.mutate("hydrate", |held| {
            held.workspace_id = Some(workspace_id);
            held.links = links;
            Some(())
        });
    }

    /// Load every link of `workspace_id`, whatever its flags. On failure the
    /// held list is left as it was.
    pub async fn fetch_for_workspace(&self, workspace_id: Uuid) -> Result<usize, ClientError> {
        match self.gateway.fetch_links(workspace_id, LinkScope::All).await {
            Ok(links) => {
                let count = links.len();
                self.hydrate(workspace_id, links);
                Ok(count)
            }
            Err(err) => {
                self.observer.fetch_failed(workspace_id, &err);
                Err(err)
            }
        }
    }

    pub async fn add(&self, draft: LinkDraft) -> MutationOutcome<Link> {
        let Some(workspace_id) = draft.workspace_id.or_else(|| self.workspace_id()) else {
            let err = ClientError::NoWorkspace;
            self.observer.mutation_failed("add", None, &err);
            return MutationOutcome::RolledBack(err);
        };

        let now = OffsetDateTime::now_utc();
        let provisional = Link {
            id: Uuid::new_v4(),
            workspace_id,
            url: draft.url.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            image: draft.image.clone(),
            author: draft.author.clone(),
            publisher: draft.publisher.clone(),
            logo: draft.logo.clone(),
            is_favorite: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            tags: normalize_tags(&draft.tags),
        };
        let temp_id = provisional.id;
        let request = LinkCreateRequest {
            workspace_id,
            url: draft.url,
            title: draft.title,
            description: draft.description,
            image: draft.image,
            author: draft.author,
            publisher: draft.publisher,
            logo: draft.logo,
            is_favorite: false,
            is_deleted: false,
            tags: draft.tags,
        };

        self.mutate("add.apply", |held| {
            insert_sorted(&mut held.links, provisional);
            held.in_flight += 1;
            Some(())
        });

        match self.gateway.create_link(&request).await {
            Ok(link) => {
                let confirmed = link.clone();
                self.mutate("add.confirm", |held| {
                    held.in_flight = held.in_flight.saturating_sub(1);
                    let slot = held.links.iter_mut().find(|link| link.id == temp_id)?;
                    *slot = link;
                    Some(())
                });
                MutationOutcome::Confirmed(confirmed)
            }
            Err(err) => {
                self.mutate("add.rollback", |held| {
                    held.in_flight = held.in_flight.saturating_sub(1);
                    let index = held.links.iter().position(|link| link.id == temp_id)?;
                    held.links.remove(index);
                    Some(())
                });
                self.observer.mutation_failed("add", Some(temp_id), &err);
                MutationOutcome::RolledBack(err)
            }
        }
    }

    /// Apply `patch` locally, then on success re-apply the server's canonical
    /// record. Failure restores the link exactly as it was before this call.
    pub async fn update(&self, id: Uuid, patch: LinkUpdateRequest) -> MutationOutcome<Link> {
        let now = OffsetDateTime::now_utc();
        let original = self.mutate("update.apply", |held| {
            let slot = held.links.iter_mut().find(|link| link.id == id)?;
            let original = slot.clone();
            apply_patch(slot, &patch, now);
            held.in_flight += 1;
            Some(original)
        });
        let Some(original) = original else {
            return MutationOutcome::Missing(id);
        };

        match self.gateway.update_link(id, &patch).await {
            Ok(link) => {
                let confirmed = link.clone();
                self.mutate("update.confirm", |held| {
                    held.in_flight = held.in_flight.saturating_sub(1);
                    let slot = held.links.iter_mut().find(|link| link.id == id)?;
                    *slot = link;
                    Some(())
                });
                MutationOutcome::Confirmed(confirmed)
            }
            Err(err) => {
                self.mutate("update.rollback", |held| {
                    held.in_flight = held.in_flight.saturating_sub(1);
                    let slot = held.links.iter_mut().find(|link| link.id == id)?;
                    *slot = original;
                    Some(())
                });
                self.observer.mutation_failed("update", Some(id), &err);
                MutationOutcome::RolledBack(err)
            }
        }
    }

    pub async fn remove_permanently(&self, id: Uuid) -> MutationOutcome<()> {
        let removed = self.mutate("remove.apply", |held| {
            let index = held.links.iter().position(|link| link.id == id)?;
            held.in_flight += 1;
            Some(held.links.remove(index))
        });
        let Some(removed) = removed else {
            return MutationOutcome::Missing(id);
        };

        match self.gateway.delete_link(id).await {
            Ok(()) => {
                self.mutate("remove.confirm", |held| {
                    held.in_flight = held.in_flight.saturating_sub(1);
                    None::<()>
                });
                MutationOutcome::Confirmed(())
            }
            Err(err) => {
                self.mutate("remove.rollback", |held| {
                    held.in_flight = held.in_flight.saturating_sub(1);
                    if held.links.iter().any(|link| link.id == id) {
                        return None;
                    }
                    insert_sorted(&mut held.links, removed);
                    Some(())
                });
                self.observer.mutation_failed("remove_permanently", Some(id), &err);
                MutationOutcome::RolledBack(err)
            }
        }
    }

    pub async fn toggle_favorite(&self, id: Uuid) -> MutationOutcome<Link> {
        let Some(current) = self.get(id) else {
            return MutationOutcome::Missing(id);
        };
        let patch = LinkUpdateRequest {
            is_favorite: Some(!current.is_favorite),
            ..Default::default()
        };
        self.update(id, patch).await
    }

    /// Moves a link to or out of the trash.
    pub async fn toggle_deleted(&self, id: Uuid) -> MutationOutcome<Link> {
        let Some(current) = self.get(id) else {
            return MutationOutcome::Missing(id);
        };
        let patch = LinkUpdateRequest {
            is_deleted: Some(!current.is_deleted),
            ..Default::default()
        };
        self.update(id, patch).await
    }

    /// Run `change` under the lock. When it reports a change the observer is
    /// notified with a snapshot, after the lock is released.
    fn mutate<R>(
        &self,
        op: &'static str,
        change: impl FnOnce(&mut Held) -> Option<R>,
    ) -> Option<R> {
        let (result, snapshot) = {
            let mut held = mutex_lock(&self.held, TARGET, op);
            let result = change(&mut held);
            let snapshot = result.is_some().then(|| held.links.clone());
            (result, snapshot)
        };

        if let Some(links) = snapshot {
            debug!(target: "linkstash::client", op, held = links.len(), "link list changed");
            self.observer.links_changed(&links);
        }
        result
    }
}

/// Insert keeping the list newest first.
fn insert_sorted(links: &mut Vec<Link>, link: Link) {
    let index = links.partition_point(|held| {
        newest_first(held.created_at, held.id, link.created_at, link.id) == Ordering::Less
    });
    links.insert(index, link);
}

fn apply_patch(link: &mut Link, patch: &LinkUpdateRequest, now: OffsetDateTime) {
    if let Some(url) = &patch.url {
        link.url = url.clone();
    }
    if let Some(title) = &patch.title {
        link.title = title.clone();
    }
    if let Some(description) = &patch.description {
        link.description = description.clone();
    }
    if let Some(image) = &patch.image {
        link.image = image.clone();
    }
    if let Some(author) = &patch.author {
        link.author = author.clone();
    }
    if let Some(publisher) = &patch.publisher {
        link.publisher = publisher.clone();
    }
    if let Some(logo) = &patch.logo {
        link.logo = logo.clone();
    }
    if let Some(is_favorite) = patch.is_favorite {
        link.is_favorite = is_favorite;
    }
    if let Some(is_deleted) = patch.is_deleted {
        link.is_deleted = is_deleted;
    }
    if let Some(tags) = &patch.tags {
        link.tags = normalize_tags(tags);
    }
    link.updated_at = now.max(link.updated_at);
}
