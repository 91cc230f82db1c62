//! Cache sizing and enablement.

use std::num::NonZeroUsize;

const DEFAULT_LINK_LIMIT: usize = 5_000;
const DEFAULT_COLLECTION_LIMIT: usize = 256;
const DEFAULT_WORKSPACE_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false, reads go straight to the store and triggers are no-ops.
    pub enabled: bool,
    /// Maximum link snapshots held.
    pub link_limit: usize,
    /// Maximum collection entries (query signatures) held.
    pub collection_limit: usize,
    /// Maximum workspace records held.
    pub workspace_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            link_limit: DEFAULT_LINK_LIMIT,
            collection_limit: DEFAULT_COLLECTION_LIMIT,
            workspace_limit: DEFAULT_WORKSPACE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            link_limit: settings.link_limit,
            collection_limit: settings.collection_limit,
            workspace_limit: settings.workspace_limit,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn link_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.link_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn collection_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.collection_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn workspace_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.workspace_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
