//! Test configuration stored in the persistent tier.

use cbt_core::model::{TestConfig, TestConfigDraft};
use storage::keys;
use storage::repository::{SessionStore, StorageError, Tier};

/// Load configuration, substituting defaults for anything missing or invalid.
///
/// # Errors
///
/// Returns `StorageError` on backend failures only.
pub async fn load_test_config(store: &SessionStore) -> Result<TestConfig, StorageError> {
    let persistent = store.tier(Tier::Persistent);
    let draft = TestConfigDraft {
        app_name: persistent.get(keys::APP_NAME).await?,
        test_title: persistent.get(keys::TEST_TITLE).await?,
        duration_minutes: store
            .load_parsed(Tier::Persistent, keys::DURATION_MINUTES)
            .await?,
        marks_per_question: store
            .load_parsed(Tier::Persistent, keys::MARKS_PER_QUESTION)
            .await?,
    };
    Ok(draft.normalize())
}

/// Persist configuration for hosts that seed it. The engine never writes it.
///
/// # Errors
///
/// Returns `StorageError` on backend failures.
pub async fn save_test_config(store: &SessionStore, config: &TestConfig) -> Result<(), StorageError> {
    let persistent = store.tier(Tier::Persistent);
    persistent.set(keys::APP_NAME, config.app_name()).await?;
    persistent.set(keys::TEST_TITLE, config.test_title()).await?;
    persistent
        .set(keys::DURATION_MINUTES, &config.duration_minutes().to_string())
        .await?;
    persistent
        .set(
            keys::MARKS_PER_QUESTION,
            &config.marks_per_question().to_string(),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_config_uses_defaults() {
        let store = SessionStore::in_memory();
        let config = load_test_config(&store).await.unwrap();
        assert_eq!(config, TestConfig::default());
    }

    #[tokio::test]
    async fn garbage_numbers_fall_back_to_defaults() {
        let store = SessionStore::in_memory();
        let persistent = store.tier(Tier::Persistent);
        persistent.set(keys::DURATION_MINUTES, "soon").await.unwrap();
        persistent.set(keys::MARKS_PER_QUESTION, "0").await.unwrap();
        persistent.set(keys::TEST_TITLE, "ANAT 213").await.unwrap();

        let config = load_test_config(&store).await.unwrap();
        assert_eq!(config.duration_minutes(), 20);
        assert_eq!(config.marks_per_question(), 2);
        assert_eq!(config.test_title(), "ANAT 213");
    }

    #[tokio::test]
    async fn saved_config_loads_back() {
        let store = SessionStore::in_memory();
        let config = TestConfigDraft {
            app_name: Some("Anatomy CBT".into()),
            test_title: Some("Embryology".into()),
            duration_minutes: Some(45),
            marks_per_question: Some(4),
        }
        .normalize();
        save_test_config(&store, &config).await.unwrap();
        assert_eq!(load_test_config(&store).await.unwrap(), config);
    }
}
