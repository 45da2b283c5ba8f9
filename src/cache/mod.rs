//! Response caching.
//!
//! - [`key::CacheKey`]: request fingerprint (prompt prefix, image flag,
//!   temperature, model).
//! - [`response::ResponseCache`]: TTL cache with oldest-N eviction and
//!   approximate prompt matching.
//! - [`similarity`]: normalized edit-distance score used by approximate
//!   matching.

pub mod key;
pub mod response;
pub mod similarity;

pub use key::CacheKey;
pub use response::{CacheConfig, CacheStats, ResponseCache};
pub use similarity::similarity;
