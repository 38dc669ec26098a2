pub mod key;
pub mod macros;
pub mod store;

pub use key::{build_key, CacheKey, CacheTtls};
pub use store::{Cache, CacheSweeperHandle};
