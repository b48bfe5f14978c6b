//! Rating-store contracts and the in-memory store built on [`DataIndex`].
//!
//! The engine only ever reads through [`RatingStore`]. The write side
//! ([`RatingWriter`]), movie metadata ([`MovieCatalog`]) and user records
//! ([`UserDirectory`]) are used by the service layer. Keeping them as
//! traits lets tests swap in fakes and lets another backend replace the
//! in-memory one.

use crate::error::StoreUnavailable;
use data_loader::{DataIndex, Genre, Movie, MovieId, MovieStats, Rating, TitleSearch, User, UserId};
use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read access to ratings
pub trait RatingStore: Send + Sync {
    fn user_exists(&self, user_id: UserId) -> Result<bool, StoreUnavailable>;

    fn ratings_by_user(&self, user_id: UserId) -> Result<Vec<Rating>, StoreUnavailable>;

    fn users_who_rated(&self, movie_id: MovieId) -> Result<BTreeSet<UserId>, StoreUnavailable>;

    fn ratings_by_movie(&self, movie_id: MovieId) -> Result<Vec<Rating>, StoreUnavailable>;
}

/// Outcome of a rating write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingWrite {
    /// The rating that was overwritten, if the pair was already rated
    pub previous: Option<Rating>,
    /// The movie's statistics after the write
    pub stats: Option<MovieStats>,
}

/// Write access to ratings.
///
/// A write creates or overwrites the (user, movie) rating and recomputes
/// the movie's average before returning.
pub trait RatingWriter: Send + Sync {
    fn put_rating(&self, rating: Rating) -> Result<RatingWrite, StoreUnavailable>;
}

/// Movie metadata lookups
pub trait MovieCatalog: Send + Sync {
    fn movie(&self, movie_id: MovieId) -> Result<Option<Movie>, StoreUnavailable>;

    fn movie_stats(&self, movie_id: MovieId) -> Result<Option<MovieStats>, StoreUnavailable>;

    fn search_titles(
        &self,
        query: &str,
        genre: Option<Genre>,
        limit: usize,
    ) -> Result<TitleSearch, StoreUnavailable>;
}

/// User records
pub trait UserDirectory: Send + Sync {
    fn user(&self, user_id: UserId) -> Result<Option<User>, StoreUnavailable>;

    /// Set a user's name, creating the user when absent
    fn register_user(&self, user_id: UserId, name: &str) -> Result<User, StoreUnavailable>;
}

/// Thread-safe store over a [`DataIndex`].
///
/// Reads share the lock; writes take it exclusively, so every read sees
/// either the state before a write or the state after it.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    index: RwLock<DataIndex>,
}

impl InMemoryRatingStore {
    pub fn new(index: DataIndex) -> Self {
        Self {
            index: RwLock::new(index),
        }
    }

    /// Run a read-only closure against the underlying index
    pub fn with_index<R>(&self, f: impl FnOnce(&DataIndex) -> R) -> Result<R, StoreUnavailable> {
        let index = self.read()?;
        Ok(f(&index))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DataIndex>, StoreUnavailable> {
        self.index
            .read()
            .map_err(|_| StoreUnavailable::new("data index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DataIndex>, StoreUnavailable> {
        self.index
            .write()
            .map_err(|_| StoreUnavailable::new("data index lock poisoned"))
    }
}

impl RatingStore for InMemoryRatingStore {
    fn user_exists(&self, user_id: UserId) -> Result<bool, StoreUnavailable> {
        Ok(self.read()?.get_user(user_id).is_some())
    }

    fn ratings_by_user(&self, user_id: UserId) -> Result<Vec<Rating>, StoreUnavailable> {
        Ok(self.read()?.get_user_ratings(user_id).to_vec())
    }

    fn users_who_rated(&self, movie_id: MovieId) -> Result<BTreeSet<UserId>, StoreUnavailable> {
        Ok(self
            .read()?
            .get_movie_ratings(movie_id)
            .iter()
            .map(|r| r.user_id)
            .collect())
    }

    fn ratings_by_movie(&self, movie_id: MovieId) -> Result<Vec<Rating>, StoreUnavailable> {
        Ok(self.read()?.get_movie_ratings(movie_id).to_vec())
    }
}

impl RatingWriter for InMemoryRatingStore {
    fn put_rating(&self, rating: Rating) -> Result<RatingWrite, StoreUnavailable> {
        let mut index = self.write()?;
        let previous = index.upsert_rating(rating);
        let stats = index.get_movie_stats(rating.movie_id).copied();
        Ok(RatingWrite { previous, stats })
    }
}

impl MovieCatalog for InMemoryRatingStore {
    fn movie(&self, movie_id: MovieId) -> Result<Option<Movie>, StoreUnavailable> {
        Ok(self.read()?.get_movie(movie_id).cloned())
    }

    fn movie_stats(&self, movie_id: MovieId) -> Result<Option<MovieStats>, StoreUnavailable> {
        Ok(self.read()?.get_movie_stats(movie_id).copied())
    }

    fn search_titles(
        &self,
        query: &str,
        genre: Option<Genre>,
        limit: usize,
    ) -> Result<TitleSearch, StoreUnavailable> {
        Ok(self.read()?.search_titles(query, genre, limit))
    }
}

impl UserDirectory for InMemoryRatingStore {
    fn user(&self, user_id: UserId) -> Result<Option<User>, StoreUnavailable> {
        Ok(self.read()?.get_user(user_id).cloned())
    }

    fn register_user(&self, user_id: UserId, name: &str) -> Result<User, StoreUnavailable> {
        Ok(self.write()?.set_user_name(user_id, name).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryRatingStore {
        let mut index = DataIndex::new();
        index.insert_user(User::new(1));
        index.insert_user(User::new(2));
        index.insert_movie(Movie {
            id: 10,
            title: "Heat (1995)".to_string(),
            year: Some(1995),
            genres: vec![Genre::Action, Genre::Crime],
        });
        index.insert_rating(Rating {
            user_id: 2,
            movie_id: 10,
            rating: 3.0,
            timestamp: 0,
        });
        index.compute_movie_stats();
        InMemoryRatingStore::new(index)
    }

    #[test]
    fn test_reads() {
        let store = store();

        assert!(store.user_exists(1).unwrap());
        assert!(!store.user_exists(3).unwrap());
        assert_eq!(store.ratings_by_user(2).unwrap().len(), 1);
        assert!(store.ratings_by_user(1).unwrap().is_empty());
        assert_eq!(store.users_who_rated(10).unwrap().into_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(store.movie(10).unwrap().unwrap().title, "Heat (1995)");
    }

    #[test]
    fn test_put_rating_recomputes_average() {
        let store = store();

        let write = store
            .put_rating(Rating {
                user_id: 1,
                movie_id: 10,
                rating: 5.0,
                timestamp: 1,
            })
            .unwrap();
        assert!(write.previous.is_none());
        assert_eq!(write.stats.unwrap().avg_rating, 4.0);

        let write = store
            .put_rating(Rating {
                user_id: 1,
                movie_id: 10,
                rating: 1.0,
                timestamp: 2,
            })
            .unwrap();
        assert_eq!(write.previous.unwrap().rating, 5.0);
        assert_eq!(write.stats.unwrap().avg_rating, 2.0);
        assert_eq!(store.ratings_by_movie(10).unwrap().len(), 2);
    }

    #[test]
    fn test_register_user() {
        let store = store();

        let created = store.register_user(9, "Maya").unwrap();
        assert_eq!(created.name.as_deref(), Some("Maya"));
        assert!(store.user_exists(9).unwrap());
        assert_eq!(store.with_index(|index| index.counts().0).unwrap(), 3);
    }
}
