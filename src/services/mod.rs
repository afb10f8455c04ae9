// Service exports
pub mod appwrite;
pub mod postgres;
pub mod presence;
pub mod repository;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use postgres::{PostgresClient, PostgresError};
pub use presence::InMemoryPresence;
pub use repository::LumeRepository;
