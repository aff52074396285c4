//! Shared building blocks for the BirdIA client: configuration, session
//! handling, backend wire types and the client-side derivations every
//! screen needs (catalog lookup, aggregates, paging, map markers).

pub mod catalog;
pub mod config;
pub mod idle;
pub mod listing;
pub mod model;
pub mod session;
pub mod stats;
