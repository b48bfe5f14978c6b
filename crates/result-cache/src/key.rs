//! Cache keys.
//!
//! One entry per (user, neighbour count), laid out as
//! `recs:user:<user>:k:<k>`. Every key of a user starts with
//! [`CacheKey::user_prefix`], and the trailing `:` keeps user 1's prefix
//! from matching user 12's keys.

use data_loader::UserId;
use std::fmt;
use std::str::FromStr;

const NAMESPACE: &str = "recs:user:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub user_id: UserId,
    pub k: usize,
}

impl CacheKey {
    pub fn new(user_id: UserId, k: usize) -> Self {
        Self { user_id, k }
    }

    /// Prefix shared by every key of `user_id`
    pub fn user_prefix(user_id: UserId) -> String {
        format!("{}{}:", NAMESPACE, user_id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:k:{}", NAMESPACE, self.user_id, self.k)
    }
}

impl FromStr for CacheKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid cache key '{}'", s);

        let rest = s.strip_prefix(NAMESPACE).ok_or_else(invalid)?;
        let (user, k) = rest.split_once(":k:").ok_or_else(invalid)?;
        Ok(CacheKey {
            user_id: user.parse().map_err(|_| invalid())?,
            k: k.parse().map_err(|_| invalid())?,
        })
    }
}
