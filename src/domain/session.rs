use serde::{Deserialize, Serialize};

use crate::domain::contact::{initials, RESERVED_GUEST_KEY};

/// The logged-in user, kept across restarts; no session means guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub initials: String,
    /// Key under `users`; older session records don't carry it
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            initials: initials(&username),
            username,
            user_id: None,
        }
    }

    pub fn for_user(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::new(username)
        }
    }

    /// Namespace the session's contacts live under
    pub fn contact_namespace(&self) -> &str {
        self.user_id.as_deref().unwrap_or(RESERVED_GUEST_KEY)
    }
}

/// Contact namespace for an optional session; guests share the reserved one
pub fn contact_namespace(session: Option<&Session>) -> &str {
    session.map_or(RESERVED_GUEST_KEY, Session::contact_namespace)
}
