//! Recipient directory and subscription store.
//!
//! The notification flows only need two questions answered: who is currently
//! subscribed, and how to reach a given recipient. Those are the
//! [`RecipientDirectory`] trait. The inbound `start` / `stop` commands also need
//! to flip subscriptions, which is [`SubscriptionStore`].
//!
//! [`InMemoryDirectory`] implements both and is seeded from the configuration
//! file. Recipient identity for de-duplication is the contact address.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::info;

/// Directory key of a recipient.
pub type RecipientId = u64;

/// Someone who can receive tide reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    /// Contact address handed to the messaging transport (e.g. a phone number)
    pub address: String,
    /// Display name, when the recipient ever told us one
    #[serde(default)]
    pub name: Option<String>,
}

impl Recipient {
    /// Name to greet the recipient with: the display name when it is set and
    /// non-empty, otherwise the contact address.
    pub fn greeting_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.address)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("recipient {0} not found")]
    NotFound(RecipientId),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Read access to recipients and their subscriptions.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Ids of every recipient with an enabled subscription.
    async fn enabled_subscribers(&self) -> Result<Vec<RecipientId>, DirectoryError>;

    /// Contact details for `id`; [`DirectoryError::NotFound`] if it no longer resolves.
    async fn recipient(&self, id: RecipientId) -> Result<Recipient, DirectoryError>;
}

/// Write access to recipients and their subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Record `address` as a known recipient without touching its subscription.
    ///
    /// Returns the recipient id and whether it was created by this call.
    async fn register(
        &self,
        address: &str,
        name: Option<&str>,
    ) -> Result<(RecipientId, bool), DirectoryError>;

    /// Enable scheduled reports for `address`, creating the recipient if needed.
    async fn subscribe(
        &self,
        address: &str,
        name: Option<&str>,
    ) -> Result<RecipientId, DirectoryError>;

    /// Disable scheduled reports for `address`. Returns `false` when there was
    /// no enabled subscription to disable.
    async fn unsubscribe(&self, address: &str) -> Result<bool, DirectoryError>;
}

/// One row of the `[[recipients]]` configuration table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub id: RecipientId,
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default)]
struct DirectoryData {
    recipients: BTreeMap<RecipientId, Recipient>,
    enabled: BTreeMap<RecipientId, bool>,
    next_id: RecipientId,
}

impl DirectoryData {
    fn find_by_address(&self, address: &str) -> Option<RecipientId> {
        self.recipients
            .values()
            .find(|recipient| recipient.address == address)
            .map(|recipient| recipient.id)
    }

    /// Id for `address`, inserting a new recipient (not subscribed) when unknown.
    fn find_or_insert(&mut self, address: &str, name: Option<&str>) -> (RecipientId, bool) {
        if let Some(id) = self.find_by_address(address) {
            return (id, false);
        }

        self.next_id += 1;
        let id = self.next_id;
        self.recipients.insert(
            id,
            Recipient {
                id,
                address: address.to_string(),
                name: name.map(str::to_string),
            },
        );
        (id, true)
    }
}

/// Process-local directory, listing recipients in id order.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    data: RwLock<DirectoryData>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from configured entries. A later entry with an address
    /// already seen replaces nothing and is skipped.
    pub fn from_entries(entries: &[RecipientEntry]) -> Self {
        let mut data = DirectoryData::default();

        for entry in entries {
            if data.find_by_address(&entry.address).is_some() {
                continue;
            }
            data.recipients.insert(
                entry.id,
                Recipient {
                    id: entry.id,
                    address: entry.address.clone(),
                    name: entry.name.clone(),
                },
            );
            data.enabled.insert(entry.id, entry.enabled);
            data.next_id = data.next_id.max(entry.id);
        }

        Self {
            data: RwLock::new(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .recipients
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryDirectory {
    async fn enabled_subscribers(&self) -> Result<Vec<RecipientId>, DirectoryError> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data
            .enabled
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn recipient(&self, id: RecipientId) -> Result<Recipient, DirectoryError> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.recipients
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryDirectory {
    async fn register(
        &self,
        address: &str,
        name: Option<&str>,
    ) -> Result<(RecipientId, bool), DirectoryError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);

        let (id, created) = data.find_or_insert(address, name);
        if created {
            info!(recipient = id, "saved new recipient");
        }
        Ok((id, created))
    }

    async fn subscribe(
        &self,
        address: &str,
        name: Option<&str>,
    ) -> Result<RecipientId, DirectoryError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);

        let (id, _) = data.find_or_insert(address, name);
        data.enabled.insert(id, true);

        info!(recipient = id, "created/enabled subscription");
        Ok(id)
    }

    async fn unsubscribe(&self, address: &str) -> Result<bool, DirectoryError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);

        let Some(id) = data.find_by_address(address) else {
            return Ok(false);
        };
        let was_enabled = data.enabled.insert(id, false).unwrap_or(false);

        if was_enabled {
            info!(recipient = id, "disabled subscription");
        }
        Ok(was_enabled)
    }
}
