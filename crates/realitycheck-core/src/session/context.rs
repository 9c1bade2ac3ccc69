use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::storage::{Config, SessionStore};
use crate::user::UserProvider;

/// Everything a tracker needs from the outside world, borrowed.
pub struct TrackingContext<'a, S: SessionStore + ?Sized> {
    pub store: &'a S,
    pub user: &'a dyn UserProvider,
    pub clock: &'a dyn Clock,
    pub config: &'a Config,
}

// Manual impls: deriving would require `S: Clone`.
impl<S: SessionStore + ?Sized> Clone for TrackingContext<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: SessionStore + ?Sized> Copy for TrackingContext<'_, S> {}

impl<'a, S: SessionStore + ?Sized> TrackingContext<'a, S> {
    pub fn new(
        store: &'a S,
        user: &'a dyn UserProvider,
        clock: &'a dyn Clock,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            user,
            clock,
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user.current_user_id()
    }
}
