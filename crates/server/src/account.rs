//! Logging in and listing what a user has rated.

use tracing::info;

use data_loader::{MovieId, UserId};
use recommender::RecommendError;
use result_cache::ResultCache;

use crate::error::Result;
use crate::service::{RecommendationService, ServiceStore};

/// How a login resolved the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Known user with a name
    Returning,
    /// Known user that had no name and was just given one
    Named,
    /// New user created at login
    Created,
}

/// The logged-in user, passed along with every request of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub name: String,
    pub outcome: LoginOutcome,
}

/// A movie the user rated, with their score
#[derive(Debug, Clone, PartialEq)]
pub struct RatedMovie {
    pub movie_id: MovieId,
    pub title: String,
    pub rating: f32,
}

impl<S: ServiceStore, C: ResultCache> RecommendationService<S, C> {
    /// Log `user_id` in.
    ///
    /// `ask_name` is only called when the user has no name yet; a missing
    /// or blank answer falls back to `User<id>`.
    pub fn login<F>(&self, user_id: UserId, ask_name: F) -> Result<Session>
    where
        F: FnOnce() -> Option<String>,
    {
        let store = self.store();
        let existing = store.user(user_id)?;

        if let Some(name) = existing.as_ref().and_then(|u| u.name.clone()) {
            info!("User {} logged in as {}", user_id, name);
            return Ok(Session {
                user_id,
                name,
                outcome: LoginOutcome::Returning,
            });
        }

        let outcome = match existing {
            Some(_) => LoginOutcome::Named,
            None => LoginOutcome::Created,
        };
        let name = ask_name()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("User{}", user_id));
        let user = store.register_user(user_id, &name)?;

        info!("User {} registered as {} ({:?})", user_id, name, outcome);
        Ok(Session {
            user_id,
            name: user.display_name(),
            outcome,
        })
    }

    /// Every movie `user_id` rated, highest score first, then by title
    pub fn rated_movies(&self, user_id: UserId) -> Result<Vec<RatedMovie>> {
        let store = self.store();
        if !store.user_exists(user_id)? {
            return Err(RecommendError::UnknownUser(user_id).into());
        }

        let mut rated = Vec::new();
        for rating in store.ratings_by_user(user_id)? {
            let title = store
                .movie(rating.movie_id)?
                .map(|m| m.title)
                .unwrap_or_else(|| format!("Movie {}", rating.movie_id));
            rated.push(RatedMovie {
                movie_id: rating.movie_id,
                title,
                rating: rating.rating,
            });
        }

        rated.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(rated)
    }
}
