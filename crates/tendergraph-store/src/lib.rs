//! Tendergraph document-store layer.
//!
//! The [`DocumentStore`] trait is the engine's read-only view of the gold
//! layer: stable id-ordered pages with a resumable cursor. [`CouchStore`]
//! implements it over CouchDB's `_all_docs`; [`MemoryStore`] backs tests.
//! [`CheckpointTracker`] records durable per-collection sync progress in
//! SQLite, independent of graph-store state.

pub mod checkpoint;
pub mod couch;
pub mod document;
pub mod error;

pub use checkpoint::{Checkpoint, CheckpointStatus, CheckpointTracker};
pub use couch::{CouchConfig, CouchStore};
pub use document::{DocumentStore, MemoryStore};
pub use error::StoreError;
