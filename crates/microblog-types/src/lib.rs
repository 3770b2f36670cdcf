pub mod models;
pub mod repository;

pub use models::{Account, ModelError, Post, PostBody, PostQuery};
pub use repository::{Repository, StoreError};
