use futures::future::try_join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::contact::{next_contact_key, Contact, NewContact, RESERVED_GUEST_KEY};
use crate::error::{JoinError, Result};
use crate::store::{collection_entries, paths, RemoteStore};

/// A user's address book under `contacts/{userId}`
pub struct ContactRepository<S> {
    store: S,
    user_id: String,
    contacts: Vec<Contact>,
}

fn decode_contact(path: &str, key: String, record: Value) -> Result<Contact> {
    let mut contact: Contact =
        serde_json::from_value(record).map_err(|err| JoinError::malformed(path, err))?;
    contact.key = key;
    Ok(contact)
}

fn sort_by_name(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

impl<S: RemoteStore> ContactRepository<S> {
    pub fn new(store: S, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            contacts: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Contacts in memory, alphabetical by name
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, key: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.key == key)
    }

    /// Tasks refer to assignees by name, so this is how they are resolved
    pub fn find_by_name(&self, name: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.name == name)
    }

    async fn remote_entries(&self) -> Result<Vec<(String, Value)>> {
        let value = self.store.read(&paths::contacts(&self.user_id)).await?;
        Ok(value
            .map(collection_entries)
            .unwrap_or_default()
            .into_iter()
            .filter(|(key, _)| key != RESERVED_GUEST_KEY)
            .collect())
    }

    pub async fn load_all(&mut self) -> Result<&[Contact]> {
        let entries = self.remote_entries().await.inspect_err(|err| {
            warn!(user_id = %self.user_id, error = %err, "Failed to load contacts");
        })?;

        let mut contacts = entries
            .into_iter()
            .map(|(key, record)| {
                let path = paths::contact(&self.user_id, &key);
                decode_contact(&path, key, record)
            })
            .collect::<Result<Vec<_>>>()?;
        sort_by_name(&mut contacts);

        info!(user_id = %self.user_id, count = contacts.len(), "Loaded contacts");
        self.contacts = contacts;
        Ok(&self.contacts)
    }

    /// Stores a new contact under one past the highest key currently in the store.
    pub async fn create(&mut self, new_contact: NewContact) -> Result<Contact> {
        new_contact.validate()?;
        let entries = self.remote_entries().await?;
        let key = next_contact_key(entries.iter().map(|(k, _)| k.as_str()));
        let contact = new_contact.into_contact(key)?;

        let path = paths::contact(&self.user_id, &contact.key);
        self.store
            .write(&path, &serde_json::to_value(&contact)?)
            .await
            .inspect_err(|err| warn!(path = %path, error = %err, "Failed to store contact"))?;

        self.contacts.push(contact.clone());
        sort_by_name(&mut self.contacts);
        info!(user_id = %self.user_id, key = %contact.key, "Created contact");
        Ok(contact)
    }

    /// Replaces a contact's details; the badge color is kept unless a new one is given.
    pub async fn update(&mut self, key: &str, changes: NewContact) -> Result<Contact> {
        changes.validate()?;
        let existing = self
            .get(key)
            .ok_or_else(|| JoinError::ContactNotFound(key.to_string()))?;

        let contact = Contact {
            key: key.to_string(),
            name: changes.name.trim().to_string(),
            email: changes.email.trim().to_string(),
            phone: changes.phone.trim().to_string(),
            color: changes.color.or_else(|| existing.color.clone()),
        };

        let path = paths::contact(&self.user_id, key);
        self.store
            .write(&path, &serde_json::to_value(&contact)?)
            .await
            .inspect_err(|err| warn!(path = %path, error = %err, "Failed to update contact"))?;

        if let Some(slot) = self.contacts.iter_mut().find(|c| c.key == key) {
            *slot = contact.clone();
        }
        sort_by_name(&mut self.contacts);
        info!(user_id = %self.user_id, key, "Updated contact");
        Ok(contact)
    }

    /// Removes the contact. Tasks that name it as an assignee are left as they are.
    pub async fn delete(&mut self, key: &str) -> Result<()> {
        if self.get(key).is_none() {
            return Err(JoinError::ContactNotFound(key.to_string()));
        }
        let path = paths::contact(&self.user_id, key);
        self.store
            .delete(&path)
            .await
            .inspect_err(|err| warn!(path = %path, error = %err, "Failed to delete contact"))?;

        self.contacts.retain(|c| c.key != key);
        info!(user_id = %self.user_id, key, "Deleted contact");
        Ok(())
    }

    /// Fetches each assignee's current badge color from the store.
    ///
    /// The reads run concurrently; names without a known contact resolve to
    /// `None` without a request.
    pub async fn assignee_colors(&self, names: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let lookups = names.iter().map(|name| async move {
            let Some(contact) = self.find_by_name(name) else {
                return Ok((name.clone(), None));
            };
            let path = format!("{}/color", paths::contact(&self.user_id, &contact.key));
            let color = self
                .store
                .read(&path)
                .await?
                .and_then(|v| v.as_str().map(str::to_string));
            Ok::<_, JoinError>((name.clone(), color))
        });

        try_join_all(lookups).await
    }
}
