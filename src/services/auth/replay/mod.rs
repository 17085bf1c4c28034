pub mod cache;
pub mod pg;
pub mod store;

pub use cache::CacheReplayStore;
pub use pg::PgServiceTokenStore;
pub use store::{ReplayError, ServiceTokenStore};
