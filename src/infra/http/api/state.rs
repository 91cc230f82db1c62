use std::sync::Arc;

use crate::application::links::LinkService;
use crate::application::repos::{
    LinksRepo, LinksWriteRepo, StoreHealth, WorkspacesRepo, WorkspacesWriteRepo,
};
use crate::application::workspaces::WorkspaceService;
use crate::cache::{CacheConfig, CacheTrigger, CollectionCache};

#[derive(Clone)]
pub struct ApiState {
    pub links: Arc<LinkService>,
    pub workspaces: Arc<WorkspaceService>,
    pub health: Arc<dyn StoreHealth>,
}

impl ApiState {
    /// Wire both services over one backing store.
    ///
    /// A disabled cache config leaves the services uncached so every read
    /// hits `repositories` directly.
    pub fn from_repositories<R>(repositories: Arc<R>, cache_config: CacheConfig) -> Self
    where
        R: LinksRepo
            + LinksWriteRepo
            + WorkspacesRepo
            + WorkspacesWriteRepo
            + StoreHealth
            + 'static,
    {
        let mut links = LinkService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
        );
        let mut workspaces = WorkspaceService::new(repositories.clone(), repositories.clone());

        if cache_config.is_enabled() {
            let cache = Arc::new(CollectionCache::new(&cache_config));
            let trigger = Arc::new(CacheTrigger::new(cache_config, cache.clone()));
            links = links
                .with_cache(cache.clone())
                .with_cache_trigger(trigger.clone());
            workspaces = workspaces.with_cache(cache).with_cache_trigger(trigger);
        }

        Self {
            links: Arc::new(links),
            workspaces: Arc::new(workspaces),
            health: repositories,
        }
    }
}
