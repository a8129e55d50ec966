//! Infrastructure adapters for persisted scheduler state.

pub mod store;

pub use store::{CollectionStore, InMemoryStore, JsonlStore, StoreError};
