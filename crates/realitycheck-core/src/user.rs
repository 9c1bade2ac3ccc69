//! Signed-in user lookup.
//!
//! Session logic asks a [`UserProvider`] for the current user instead of
//! reading a global. `None` means nobody is signed in, which turns session
//! commands into no-ops.

use crate::storage::Config;

pub trait UserProvider {
    fn current_user_id(&self) -> Option<String>;
}

/// A fixed user, or none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticUser(Option<String>);

impl StaticUser {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl UserProvider for StaticUser {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

impl UserProvider for Config {
    fn current_user_id(&self) -> Option<String> {
        self.user
            .current_user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_blank_user_counts_as_signed_out() {
        let mut config = Config::default();
        assert_eq!(config.current_user_id(), None);
        config.user.current_user_id = Some("  ".into());
        assert_eq!(config.current_user_id(), None);
        config.user.current_user_id = Some("u1".into());
        assert_eq!(config.current_user_id().as_deref(), Some("u1"));
    }

    #[test]
    fn static_user() {
        assert_eq!(StaticUser::signed_out().current_user_id(), None);
        assert_eq!(
            StaticUser::signed_in("u2").current_user_id().as_deref(),
            Some("u2")
        );
    }
}
