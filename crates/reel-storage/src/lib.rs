//! S3-compatible content-store client for published renders.

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ContentStore, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{content_type_for, render_key};
