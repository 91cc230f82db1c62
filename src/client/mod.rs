//! Client-side link store: optimistic mutations over the JSON API plus the
//! pure filter/search evaluator that derives the visible list.

mod coordinator;
mod debounce;
mod error;
mod filter;
mod gateway;
mod observer;

pub use coordinator::{LinkDraft, MutationOutcome, OptimisticLinks};
pub use debounce::{DEFAULT_SEARCH_DEBOUNCE, Debouncer};
pub use error::ClientError;
pub use filter::{FilterState, all_tags, filter_links, matches_query};
pub use gateway::{HttpGateway, LinkGateway};
pub use observer::{LinkListObserver, LoggingObserver};
