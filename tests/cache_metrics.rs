mod support;

use std::collections::HashSet;

use linkstash::application::links::LinkPatch;
use linkstash::application::workspaces::CreateWorkspaceCommand;
use linkstash::domain::types::{Category, LinkScope};
use linkstash::domain::workspaces::DEFAULT_WORKSPACE_ID;
use linkstash::infra::memory::InMemoryRepositories;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use uuid::Uuid;

use support::{Harness, record};

const INBOX: LinkScope = LinkScope::Category(Category::Inbox);

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = InMemoryRepositories::new();
    let seeded = record(DEFAULT_WORKSPACE_ID, 0, "https://metrics.example");
    let seeded_id = seeded.id;
    store.seed_link(seeded, &["ops"]).await;
    let harness = Harness::new(store);

    // Cold read: collection miss, then snapshots filled from the store.
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("cold list");
    // Warm read: collection hit.
    harness
        .links
        .list(DEFAULT_WORKSPACE_ID, INBOX)
        .await
        .expect("warm list");

    harness
        .links
        .update(
            seeded_id,
            LinkPatch {
                is_favorite: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    harness
        .workspaces
        .create(CreateWorkspaceCommand {
            id: None,
            name: "Metrics".to_string(),
        })
        .await
        .expect("create workspace");
    harness.cache.invalidate_entity(Uuid::new_v4(), None);

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "linkstash_cache_collection_hit_total",
        "linkstash_cache_collection_miss_total",
        "linkstash_cache_partial_fill_total",
        "linkstash_cache_invalidation_total",
        "linkstash_cache_full_clear_total",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let plans: HashSet<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| {
            composite_key.key().name() == "linkstash_cache_invalidation_total"
        })
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "plan")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(plans.contains("entity_scoped"), "plans: {plans:?}");
    assert!(plans.contains("clear_all"), "plans: {plans:?}");

    let hits = snapshot.iter().find_map(|(composite_key, _, _, value)| {
        (composite_key.key().name() == "linkstash_cache_collection_hit_total").then_some(value)
    });
    assert!(matches!(hits, Some(DebugValue::Counter(count)) if *count >= 1));
}
