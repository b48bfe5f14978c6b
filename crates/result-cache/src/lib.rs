//! # Result Cache Crate
//!
//! Stores computed recommendations per (user, neighbour count) so repeat
//! requests skip the rating store.
//!
//! Every entry moves through `absent -> fresh -> stale -> fresh`:
//! [`ResultCache::set`] makes it fresh, [`ResultCache::invalidate`] marks
//! a user's entries stale after they rate something, and
//! [`ResultCache::purge`] drops an entry from any state.
//!
//! ## Example Usage
//!
//! ```ignore
//! use result_cache::{CacheKey, CacheLookup, MemoryResultCache, ResultCache};
//!
//! let cache = MemoryResultCache::new();
//! let key = CacheKey::new(1, 20);
//! let generation = cache.generation(1)?;
//! cache.set(&key, &result, generation)?;
//!
//! cache.invalidate(&CacheKey::user_prefix(1))?;
//! assert_eq!(cache.get(&key)?, CacheLookup::Stale);
//! ```

pub mod error;
pub mod key;
pub mod memory;

pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use memory::MemoryResultCache;

use data_loader::UserId;
use recommender::RecommendationResult;

/// What a cache read found
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// No entry, or an entry that could not be decoded
    Absent,
    /// An entry exists but the user's ratings changed since it was computed
    Stale,
    Fresh(RecommendationResult),
}

/// Key-value storage for computed recommendations.
///
/// Entries never expire on a timer.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<CacheLookup>;

    /// Invalidation generation of `user_id`'s entries. Read it before
    /// computing a result and pass it back to [`ResultCache::set`].
    fn generation(&self, user_id: UserId) -> Result<u64>;

    /// Store `result` under `key`, replacing any previous entry.
    ///
    /// The entry is fresh only if the user is still at `generation`,
    /// otherwise it is stored stale. Returns whether it was stored fresh.
    fn set(&self, key: &CacheKey, result: &RecommendationResult, generation: u64) -> Result<bool>;

    /// Mark every fresh entry whose key starts with `prefix` stale and
    /// advance the prefix's generation, even when nothing is stored under
    /// it. Returns how many entries were marked.
    fn invalidate(&self, prefix: &str) -> Result<usize>;

    /// Remove `key`. Returns whether an entry was there.
    fn purge(&self, key: &CacheKey) -> Result<bool>;

    /// Every stored key, sorted
    fn keys(&self) -> Result<Vec<CacheKey>>;
}
