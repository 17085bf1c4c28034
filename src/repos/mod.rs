pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use error::{RepoError, RepoResult};
pub use memory::MemoryStore;
pub use pg::PgPlatformStore;
pub use store::PlatformStore;
