//! Application services.

pub mod error;
pub mod links;
pub mod repos;
pub mod workspaces;
