//! Mapping between engine state and the two storage tiers.
//!
//! `END_TIME` is the commit marker of a running attempt. Starting removes it
//! before anything else is touched and writes it back last, so a partial
//! start leaves no attempt behind. Submitting only removes it after the
//! result is safely in the session tier.

use chrono::{DateTime, Utc};

use cbt_core::model::{AnswerMap, ExamResult, Question};
use cbt_core::shuffle::shuffled;
use cbt_core::time::{from_epoch_millis, to_epoch_millis};
use storage::keys;
use storage::repository::{SessionStore, StorageError, Tier};

use super::state::RunningSession;

pub(crate) async fn load_bank(store: &SessionStore) -> Result<Vec<Question>, StorageError> {
    Ok(store
        .load_json(Tier::Persistent, keys::QUESTIONS)
        .await?
        .unwrap_or_default())
}

pub(crate) async fn save_bank(
    store: &SessionStore,
    questions: &[Question],
) -> Result<(), StorageError> {
    store
        .save_json(Tier::Persistent, keys::QUESTIONS, questions)
        .await
}

/// Store a shuffled copy of `questions` as the idle bank for hosts that seed it.
///
/// Returns `false` without writing while an attempt is stored, since its
/// running order lives under the same key.
///
/// # Errors
///
/// Returns `StorageError` on backend failures.
pub async fn seed_bank(
    store: &SessionStore,
    questions: Vec<Question>,
) -> Result<bool, StorageError> {
    if store
        .tier(Tier::Persistent)
        .get(keys::END_TIME)
        .await?
        .is_some()
    {
        return Ok(false);
    }
    save_bank(store, &shuffled(questions)).await?;
    Ok(true)
}

pub(crate) async fn load_deadline(
    store: &SessionStore,
) -> Result<Option<DateTime<Utc>>, StorageError> {
    let millis: Option<i64> = store.load_parsed(Tier::Persistent, keys::END_TIME).await?;
    Ok(millis.and_then(from_epoch_millis))
}

pub(crate) async fn save_answers(
    store: &SessionStore,
    answers: &AnswerMap,
) -> Result<(), StorageError> {
    store
        .save_json(Tier::Persistent, keys::ANSWERS, answers)
        .await
}

pub(crate) async fn save_index(store: &SessionStore, index: usize) -> Result<(), StorageError> {
    store
        .tier(Tier::Persistent)
        .set(keys::CURRENT_INDEX, &index.to_string())
        .await
}

/// Persist a freshly started attempt.
///
/// The previous attempt's keys go first and the new deadline goes last, so a
/// failure part way through resumes as idle rather than pairing a stored
/// deadline with another attempt's order, answers or position.
pub(crate) async fn begin_running(
    store: &SessionStore,
    running: &RunningSession,
) -> Result<(), StorageError> {
    clear_running(store).await?;
    save_bank(store, &running.questions).await?;
    save_answers(store, &running.answers).await?;
    save_index(store, running.current_index).await?;
    store
        .tier(Tier::Persistent)
        .set(
            keys::END_TIME,
            &to_epoch_millis(running.deadline).to_string(),
        )
        .await?;
    store.tier(Tier::Session).remove(keys::CURRENT_RESULT).await
}

/// Rebuild a running attempt around a persisted deadline.
pub(crate) async fn restore_running(
    store: &SessionStore,
    questions: Vec<Question>,
    deadline: DateTime<Utc>,
) -> Result<RunningSession, StorageError> {
    let answers: AnswerMap = store
        .load_json(Tier::Persistent, keys::ANSWERS)
        .await?
        .unwrap_or_default();
    let index: usize = store
        .load_parsed(Tier::Persistent, keys::CURRENT_INDEX)
        .await?
        .unwrap_or(0);
    Ok(RunningSession::restore(questions, answers, index, deadline))
}

pub(crate) async fn load_result(store: &SessionStore) -> Result<Option<ExamResult>, StorageError> {
    store.load_json(Tier::Session, keys::CURRENT_RESULT).await
}

/// Store the result, then drop the running keys. A crash in between leaves
/// the attempt resumable instead of lost.
pub(crate) async fn commit_result(
    store: &SessionStore,
    result: &ExamResult,
) -> Result<(), StorageError> {
    store
        .save_json(Tier::Session, keys::CURRENT_RESULT, result)
        .await?;
    clear_running(store).await
}

pub(crate) async fn clear_running(store: &SessionStore) -> Result<(), StorageError> {
    store
        .remove_all(Tier::Persistent, &keys::RUNNING_KEYS)
        .await
}

pub(crate) async fn clear_all(store: &SessionStore) -> Result<(), StorageError> {
    clear_running(store).await?;
    store.tier(Tier::Session).remove(keys::CURRENT_RESULT).await
}
