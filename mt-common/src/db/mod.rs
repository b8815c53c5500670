//! Database schema, models and repository queries

pub mod init;
pub mod models;
pub mod repository;

pub use init::*;
pub use models::*;
pub use repository::*;
