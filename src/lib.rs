pub mod entity;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod routes;
pub mod settings;

// Re-export commonly used items for tests / external users
pub use entity::{Entity, Relation, Votable};
pub use repo::{RepoError, RepoResult, SqliteRepo};
pub use routes::{config, AppState};
