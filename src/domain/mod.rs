//! Domain layer types and invariants.

pub mod error;
pub mod links;
pub mod slug;
pub mod types;
pub mod workspaces;
