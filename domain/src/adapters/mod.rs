//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory store backs unit tests, the demo CLI and the api-server's
//! `memory` storage mode. The file-backed store lives in `sqlite-adapter`.

pub mod memory_store;
