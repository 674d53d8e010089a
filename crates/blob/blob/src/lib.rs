pub mod error;
pub mod naming;
pub mod store;
pub mod testing;

pub use error::BlobError;
pub use naming::{StoredNameGenerator, sanitize_extension};
pub use store::BlobStore;
