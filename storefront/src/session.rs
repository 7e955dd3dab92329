//! Session identity collaborator.
//!
//! The storefront never issues or checks credentials; it only asks whoever
//! owns the session which user, if any, is signed in.

use crate::types::UserId;

/// Source of the current user's identity
pub trait Session: Send + Sync {
    /// The signed-in user, if any
    fn current_user_id(&self) -> Option<UserId>;
}

/// Session whose user is fixed at construction
#[derive(Clone, Debug, Default)]
pub struct StaticSession {
    user_id: Option<UserId>,
}

impl StaticSession {
    /// A session for `user_id`
    #[must_use]
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(UserId::new(user_id)),
        }
    }

    /// A session nobody has signed into
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl Session for StaticSession {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.clone()
    }
}
