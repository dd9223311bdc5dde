use rand::Rng;
use std::fmt;

use storage::keys;
use storage::repository::{SessionStore, StorageError, Tier};

/// Device-stable guest label, generated once and kept in the persistent tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestId(String);

impl GuestId {
    /// Generate a fresh `GUEST ID: NNNN` label with a four-digit number.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let number: u16 = rng.random_range(1000..=9999);
        Self(format!("GUEST ID: {number}"))
    }

    /// Return the stored guest id, creating and storing one on first use.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    pub async fn load_or_create(store: &SessionStore) -> Result<Self, StorageError> {
        let persistent = store.tier(Tier::Persistent);
        if let Some(existing) = persistent.get(keys::GUEST_ID).await? {
            let existing = existing.trim();
            if !existing.is_empty() {
                return Ok(Self(existing.to_string()));
            }
        }

        let created = Self::generate(&mut rand::rng());
        persistent.set(keys::GUEST_ID, &created.0).await?;
        tracing::info!(guest_id = %created, "created guest id");
        Ok(created)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
