//! linkstash: a self-hosted bookmark manager.
//!
//! The server keeps a read-through collection cache in front of its store and
//! invalidates it synchronously on every write. The `client` module holds the
//! optimistic link store and the filter evaluator used by front ends.

pub mod application;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod infra;
