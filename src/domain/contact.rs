use serde::{Deserialize, Serialize};

use crate::error::{FieldError, JoinError};

/// Key under `contacts/{userId}` that never names a real contact
pub const RESERVED_GUEST_KEY: &str = "guest";

/// Badge colors handed out to new contacts in rotation
pub const BADGE_PALETTE: [&str; 15] = [
    "#FF7A00", "#FF5EB3", "#6E52FF", "#9327FF", "#00BEE8", "#1FD7C1", "#FF745E", "#FFA35E",
    "#FC71FF", "#FFC701", "#0038FF", "#C3FF2B", "#FFE62B", "#FF4646", "#FFBB2B",
];

/// Fallback badge color for assignees with no matching contact
pub const UNKNOWN_BADGE_COLOR: &str = "#A8A8A8";

/// An entry in a user's address book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Store key; not part of the stored record
    #[serde(skip)]
    pub key: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Contact {
    pub fn initials(&self) -> String {
        initials(&self.name)
    }

    pub fn badge_color(&self) -> &str {
        self.color.as_deref().unwrap_or(UNKNOWN_BADGE_COLOR)
    }
}

/// Contents of the add/edit contact form
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub color: Option<String>,
}

impl NewContact {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn validate(&self) -> Result<(), JoinError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "This field is required"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError::new("email", "This field is required"));
        } else if !email.contains('@') {
            errors.push(FieldError::new("email", "Enter a valid email address"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JoinError::Validation(errors))
        }
    }

    /// Builds the stored contact, picking a palette color from the key when none was chosen.
    pub fn into_contact(self, key: u64) -> Result<Contact, JoinError> {
        self.validate()?;
        let color = self.color.unwrap_or_else(|| palette_color(key).to_string());
        Ok(Contact {
            key: key.to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            color: Some(color),
        })
    }
}

pub fn palette_color(key: u64) -> &'static str {
    BADGE_PALETTE[(key as usize) % BADGE_PALETTE.len()]
}

/// Uppercase first letters of the first and last word ("Anna Maria Schmidt" -> "AS")
pub fn initials(name: &str) -> String {
    let mut words = name.split_whitespace();
    let first = words.next().and_then(|w| w.chars().next());
    let last = words.last().and_then(|w| w.chars().next());

    first
        .into_iter()
        .chain(last)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Next free numeric key: one past the running maximum of the numeric keys.
pub fn next_numeric_key<'a>(existing: impl IntoIterator<Item = &'a str>) -> u64 {
    existing
        .into_iter()
        .filter_map(|key| key.parse::<u64>().ok())
        .max()
        .map_or(0, |max| max + 1)
}

/// Like [`next_numeric_key`], skipping the reserved guest key.
pub fn next_contact_key<'a>(existing: impl IntoIterator<Item = &'a str>) -> u64 {
    next_numeric_key(existing.into_iter().filter(|key| *key != RESERVED_GUEST_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials() {
        assert_eq!(initials("Anna Maria Schmidt"), "AS");
        assert_eq!(initials("anna"), "A");
        assert_eq!(initials("  ben   weber "), "BW");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_next_contact_key_skips_guest() {
        assert_eq!(next_contact_key([]), 0);
        assert_eq!(next_contact_key(["0", "1", "4"]), 5);
        assert_eq!(next_contact_key(["guest"]), 0);
        assert_eq!(next_contact_key(["2", "guest", "notes"]), 3);
    }

    #[test]
    fn test_new_contact_validation() {
        let err = NewContact::new("", "nope").validate().unwrap_err();
        match err {
            JoinError::Validation(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].field, "name");
                assert_eq!(fields[1].field, "email");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_into_contact_assigns_palette_color() {
        let contact = NewContact::new("Anna Schmidt", "anna@example.com")
            .with_phone("+49 1111")
            .into_contact(3)
            .unwrap();

        assert_eq!(contact.key, "3");
        assert_eq!(contact.color.as_deref(), Some(BADGE_PALETTE[3]));
        assert_eq!(contact.initials(), "AS");
    }

    #[test]
    fn test_key_not_serialized() {
        let contact = NewContact::new("Anna", "anna@example.com")
            .into_contact(1)
            .unwrap();
        let value = serde_json::to_value(&contact).unwrap();
        assert!(value.get("key").is_none());
        assert_eq!(value["name"], "Anna");
    }
}
