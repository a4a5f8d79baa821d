pub mod cache;
pub mod catalog;
pub mod csv;
pub mod error;
pub mod models;
pub mod repo;
pub mod store;
pub mod validate;

// Re-export commonly used items for tests / external users
pub use error::{Error, Result};
pub use repo::{Entity, Fleet, Repo};
pub use store::{Query, StoreClient, StoreConfig};
pub use validate::{UniquenessCheck, Validation};
