//! The HTTP gateway and optimistic store against a live listener.

use std::sync::Arc;

use axum::{Json, Router, routing::patch};
use linkstash::cache::CacheConfig;
use linkstash::client::{
    ClientError, FilterState, HttpGateway, LinkDraft, LinkGateway, MutationOutcome,
    OptimisticLinks,
};
use linkstash::domain::links::Link;
use linkstash::domain::types::{Category, LinkScope};
use linkstash::domain::workspaces::DEFAULT_WORKSPACE_ID;
use linkstash::infra::http::api::models::{LinkUpdateRequest, LinkUpdateResponse};
use linkstash::infra::http::{ApiState, build_router};
use linkstash::infra::memory::InMemoryRepositories;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

async fn spawn_server() -> (String, JoinHandle<()>) {
    let state = ApiState::from_repositories(
        Arc::new(InMemoryRepositories::new()),
        CacheConfig::default(),
    );
    let router = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("serve");
    });
    (format!("http://{addr}"), handle)
}

fn draft(url: &str, tags: &[&str]) -> LinkDraft {
    LinkDraft {
        url: url.to_string(),
        title: Some(format!("Title for {url}")),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        ..Default::default()
    }
}

#[tokio::test]
async fn store_mutations_reach_the_server() {
    let (site, server) = spawn_server().await;
    let gateway = Arc::new(HttpGateway::new(&site).expect("gateway"));
    let store = OptimisticLinks::new(gateway.clone());

    assert_eq!(
        store
            .fetch_for_workspace(DEFAULT_WORKSPACE_ID)
            .await
            .expect("fetch"),
        0
    );

    let figma = store
        .add(draft("https://figma.com/board", &["infra"]))
        .await
        .confirmed()
        .expect("figma");
    store
        .add(draft("https://figma.com/notes", &["design"]))
        .await
        .confirmed()
        .expect("notes");
    store
        .add(draft("https://grafana.example", &["infra"]))
        .await
        .confirmed()
        .expect("grafana");

    let mut filter = FilterState::default();
    filter.set_search_mode(true);
    filter.set_search_query("fig");
    filter.toggle_tag("infra");
    let visible = filter.apply(&store.links());
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, figma.id);

    store
        .toggle_favorite(figma.id)
        .await
        .confirmed()
        .expect("favorite");
    let favorites = gateway
        .fetch_links(DEFAULT_WORKSPACE_ID, LinkScope::Category(Category::Favorites))
        .await
        .expect("favorites");
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, figma.id);

    assert!(store.remove_permanently(figma.id).await.is_confirmed());
    let all = gateway
        .fetch_links(DEFAULT_WORKSPACE_ID, LinkScope::All)
        .await
        .expect("all");
    assert_eq!(all.len(), 2);

    server.abort();
}

#[tokio::test]
async fn server_rejections_roll_back_with_the_api_error() {
    let (site, server) = spawn_server().await;
    let gateway = Arc::new(HttpGateway::new(&site).expect("gateway"));
    let store = OptimisticLinks::new(gateway);
    store
        .fetch_for_workspace(DEFAULT_WORKSPACE_ID)
        .await
        .expect("fetch");

    let outcome = store.add(draft("not a url", &[])).await;
    match outcome {
        MutationOutcome::RolledBack(err) => {
            assert!(err.is_rejection(), "{err}");
            assert!(matches!(
                err,
                ClientError::Server { ref code, .. } if code == "validation_error"
            ));
        }
        other => panic!("expected rollback, got {other:?}"),
    }
    assert!(store.links().is_empty());

    server.abort();
}

#[tokio::test]
async fn unreachable_server_rolls_back() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = Arc::new(HttpGateway::new(&format!("http://{addr}")).expect("gateway"));
    let store = OptimisticLinks::new(gateway);
    store.hydrate(DEFAULT_WORKSPACE_ID, Vec::new());

    let outcome = store.add(draft("https://offline.example", &[])).await;
    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack(ClientError::Network(_))
    ));
    assert!(store.links().is_empty());
    assert_eq!(store.in_flight(), 0);
}

fn held_link() -> Link {
    let now = time::OffsetDateTime::now_utc();
    Link {
        id: Uuid::new_v4(),
        workspace_id: DEFAULT_WORKSPACE_ID,
        url: "https://held.example/".to_string(),
        title: Some("Held".to_string()),
        description: None,
        image: None,
        author: None,
        publisher: None,
        logo: None,
        is_favorite: false,
        is_deleted: false,
        created_at: now,
        updated_at: now,
        tags: Vec::new(),
    }
}

#[tokio::test]
async fn update_reported_unsuccessful_rolls_back() {
    let link = held_link();
    let mut echoed = link.clone();
    echoed.is_favorite = true;

    let router = Router::new().route(
        "/api/links/{id}",
        patch(move || {
            let echoed = echoed.clone();
            async move {
                Json(LinkUpdateResponse {
                    success: false,
                    link: echoed,
                })
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("serve");
    });

    let gateway = Arc::new(HttpGateway::new(&format!("http://{addr}")).expect("gateway"));
    let direct = gateway
        .update_link(
            link.id,
            &LinkUpdateRequest {
                is_favorite: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(direct, Err(ClientError::Decode(_))));

    let store = OptimisticLinks::new(gateway);
    store.hydrate(DEFAULT_WORKSPACE_ID, vec![link.clone()]);
    let outcome = store.toggle_favorite(link.id).await;
    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack(ClientError::Decode(_))
    ));
    assert_eq!(store.get(link.id), Some(link));

    server.abort();
}
