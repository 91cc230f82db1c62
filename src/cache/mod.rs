//! Server-side read cache.
//!
//! [`CollectionCache`] keeps link snapshots by id and ordered id lists by
//! [`QuerySignature`]. Nothing expires on a timer: every write path goes
//! through [`CacheTrigger`], which maps the committed [`Mutation`] to an
//! [`InvalidationPlan`] and applies it before the write returns.
//!
//! ```toml
//! [cache]
//! enabled = true
//! link_limit = 5000
//! collection_limit = 256
//! workspace_limit = 64
//! ```

mod config;
mod events;
mod keys;
pub(crate) mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use events::{Epoch, EpochCounter, Mutation, MutationEvent};
pub use keys::QuerySignature;
pub use planner::InvalidationPlan;
pub use store::{CollectionCache, FillToken};
pub use trigger::CacheTrigger;

pub(crate) use store::METRIC_FULL_CLEAR;
pub(crate) use trigger::METRIC_INVALIDATION;

pub(crate) const METRIC_COLLECTION_HIT: &str = "linkstash_cache_collection_hit_total";
pub(crate) const METRIC_COLLECTION_MISS: &str = "linkstash_cache_collection_miss_total";
pub(crate) const METRIC_PARTIAL_FILL: &str = "linkstash_cache_partial_fill_total";
