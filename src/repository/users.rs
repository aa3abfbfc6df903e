use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::contact::next_numeric_key;
use crate::domain::Session;
use crate::error::{FieldError, JoinError, Result};
use crate::store::{collection_entries, paths, RemoteStore};

/// A registered user as stored under `users/{key}`.
///
/// Passwords are stored and compared in plaintext; the store offers nothing
/// better and hardening it is outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(skip)]
    pub key: String,
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Password")]
    pub password: String,
}

/// The `users` collection, used for signup and login
pub struct UserDirectory<S> {
    store: S,
}

impl<S: RemoteStore> UserDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load_all(&self) -> Result<Vec<UserAccount>> {
        let Some(value) = self.store.read(paths::USERS).await? else {
            return Ok(Vec::new());
        };

        collection_entries(value)
            .into_iter()
            .map(|(key, record)| -> Result<UserAccount> {
                let mut user: UserAccount = serde_json::from_value(record)
                    .map_err(|err| JoinError::malformed(paths::user(&key), err))?;
                user.key = key;
                Ok(user)
            })
            .collect()
    }

    /// Emails compare case-insensitively
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        let email = email.trim();
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<UserAccount> {
        let mut errors = Vec::new();
        if name.trim().is_empty() {
            errors.push(FieldError::new("name", "This field is required"));
        }
        if !email.contains('@') {
            errors.push(FieldError::new("email", "Enter a valid email address"));
        }
        if password.is_empty() {
            errors.push(FieldError::new("password", "This field is required"));
        }
        if !errors.is_empty() {
            return Err(JoinError::Validation(errors));
        }

        let users = self.load_all().await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email.trim())) {
            warn!(email = email.trim(), "Signup rejected, email already registered");
            return Err(JoinError::EmailTaken(email.trim().to_string()));
        }

        let key = next_numeric_key(users.iter().map(|u| u.key.as_str())).to_string();
        let user = UserAccount {
            key,
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.store
            .write(&paths::user(&user.key), &serde_json::to_value(&user)?)
            .await?;

        info!(user_key = %user.key, "Registered user");
        Ok(user)
    }

    /// Checks the credentials and returns the session to persist
    pub async fn log_in(&self, email: &str, password: &str) -> Result<Session> {
        match self.find_by_email(email).await? {
            Some(user) if user.password == password => {
                info!(user_key = %user.key, "User logged in");
                Ok(Session::for_user(user.name, user.key))
            }
            _ => {
                warn!("Login rejected");
                Err(JoinError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn directory() -> UserDirectory<MemoryStore> {
        UserDirectory::new(MemoryStore::with_data(json!({
            "users": [
                {"name": "Sofia Müller", "Email": "sofia@example.com", "Password": "pw1"}
            ]
        })))
    }

    #[tokio::test]
    async fn test_log_in() {
        let users = directory();

        let session = users.log_in("SOFIA@example.com", "pw1").await.unwrap();
        assert_eq!(session.username, "Sofia Müller");
        assert_eq!(session.initials, "SM");
        assert_eq!(session.contact_namespace(), "0");
    }

    #[tokio::test]
    async fn test_log_in_wrong_password() {
        let users = directory();
        let err = users.log_in("sofia@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, JoinError::InvalidCredentials));

        let err = users.log_in("nobody@example.com", "pw1").await.unwrap_err();
        assert!(matches!(err, JoinError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_up_uses_next_key() {
        let users = directory();
        let user = users
            .sign_up("Ben Weber", "ben@example.com", "secret")
            .await
            .unwrap();

        assert_eq!(user.key, "1");
        let stored = users.store.read("users/1").await.unwrap().unwrap();
        assert_eq!(stored["Email"], "ben@example.com");
        assert_eq!(stored["Password"], "secret");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_taken_email() {
        let users = directory();
        let err = users
            .sign_up("Other", "Sofia@Example.com", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, JoinError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let users = directory();
        let err = users.sign_up("", "bad", "").await.unwrap_err();
        match err {
            JoinError::Validation(fields) => assert_eq!(fields.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
