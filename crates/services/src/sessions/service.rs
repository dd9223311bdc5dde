use chrono::Duration;
use std::fmt;
use tracing::{debug, info, warn};

use cbt_core::bank::{LoadReport, merge_running};
use cbt_core::model::{ExamResult, OptionKey, Question, QuestionId, Submission, TestConfig};
use cbt_core::shuffle::shuffle_in_place;
use storage::repository::SessionStore;

use super::persist;
use super::state::{RunningSession, SessionState};
use super::view::SessionView;
use crate::Clock;
use crate::bank_source::{BankSource, fetch_bank};
use crate::error::EngineError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of one deadline reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still running, with this many whole seconds left.
    Remaining(i64),
    /// The deadline passed and the attempt was submitted.
    Expired,
    /// No attempt is running.
    Inactive,
}

/// What applying a fresh bank did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankUpdate {
    /// Running attempt reconciled in place; new questions appended.
    Merged { appended: usize },
    /// Idle bank replaced by a reshuffled copy of the fresh bank.
    Replaced { questions: usize },
    /// Fresh bank was empty or unavailable; the stored bank was kept.
    Kept,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Owns one test's lifecycle: start, answer, navigate, submit, exit.
///
/// Every mutation is persisted before the call returns, so dropping the
/// engine and calling [`SessionEngine::create`] again with the same store
/// resumes exactly where it left off.
pub struct SessionEngine {
    config: TestConfig,
    store: SessionStore,
    clock: Clock,
    bank: Vec<Question>,
    state: SessionState,
}

impl SessionEngine {
    /// Build an engine whose initial state is derived from storage.
    ///
    /// - a persisted deadline in the future resumes the running attempt;
    /// - a persisted deadline already in the past is submitted immediately;
    /// - otherwise a stored result resumes the completed view;
    /// - otherwise the engine starts idle.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` on backend failures.
    pub async fn create(
        config: TestConfig,
        store: SessionStore,
        clock: Clock,
    ) -> Result<Self, EngineError> {
        let mut engine = Self {
            config,
            store,
            clock,
            bank: Vec::new(),
            state: SessionState::Idle,
        };
        engine.load_from_store().await?;
        Ok(engine)
    }

    async fn load_from_store(&mut self) -> Result<(), EngineError> {
        self.bank = persist::load_bank(&self.store).await?;
        self.state = SessionState::Idle;

        if let Some(deadline) = persist::load_deadline(&self.store).await? {
            let running =
                persist::restore_running(&self.store, self.bank.clone(), deadline).await?;
            self.state = SessionState::Running(running);

            if deadline <= self.clock.now() {
                warn!(%deadline, "deadline passed while away; submitting stored answers");
                self.submit().await?;
            } else {
                info!(%deadline, "resumed running test");
            }
            return Ok(());
        }

        if let Some(result) = persist::load_result(&self.store).await? {
            debug!("resumed completed test");
            self.state = SessionState::Completed(result);
        }
        Ok(())
    }

    /// Tear the engine down. Consuming `self` guarantees nothing can drive it afterwards.
    pub fn dispose(self) {
        debug!(state = self.state.label(), "session engine disposed");
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Active question sequence: the running order while a test is in progress.
    #[must_use]
    pub fn bank(&self) -> &[Question] {
        match &self.state {
            SessionState::Running(running) => &running.questions,
            SessionState::Idle | SessionState::Completed(_) => &self.bank,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Advance a fixed clock. Has no effect on a real-time clock.
    pub fn advance_clock(&mut self, delta: Duration) {
        self.clock.advance(delta);
    }

    /// Read model for the presentation layer.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::build(&self.state, &self.config, &self.bank, self.clock.now())
    }

    /// Start a new attempt over a freshly shuffled bank.
    ///
    /// Starting while another attempt is running or completed discards it.
    /// If persisting fails, the in-memory state is reloaded from storage so
    /// the two never disagree.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotReady` if the bank is empty, or storage errors.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        if self.bank.is_empty() {
            return Err(EngineError::NotReady);
        }

        let mut questions = self.bank.clone();
        shuffle_in_place(&mut questions, &mut rand::rng());
        let deadline = self.clock.now() + self.config.duration();
        let running = RunningSession::new(questions, deadline);

        if let Err(err) = persist::begin_running(&self.store, &running).await {
            // Storage may now hold part of the new attempt; follow what it would resume.
            if let Err(reload) = self.load_from_store().await {
                warn!(error = %reload, "could not reload state after a failed start");
            }
            return Err(err.into());
        }

        self.bank.clone_from(&running.questions);
        info!(
            questions = running.questions.len(),
            %deadline,
            "test started"
        );
        self.state = SessionState::Running(running);
        Ok(())
    }

    /// Record the chosen option for a question.
    ///
    /// Ids outside the running sequence are accepted but never read back.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` outside a running attempt, or storage errors.
    pub async fn select_answer(
        &mut self,
        question_id: QuestionId,
        option: OptionKey,
    ) -> Result<(), EngineError> {
        let SessionState::Running(running) = &mut self.state else {
            return Err(EngineError::NotRunning);
        };
        debug!(question = %question_id, %option, "answer selected");
        running.record_answer(question_id, option);
        persist::save_answers(&self.store, &running.answers).await?;
        Ok(())
    }

    /// Answer whichever question is currently shown.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` outside a running attempt, or storage errors.
    pub async fn answer_current(&mut self, option: OptionKey) -> Result<(), EngineError> {
        let id = match &self.state {
            SessionState::Running(running) => running
                .current_question()
                .map(|q| q.id().clone())
                .ok_or(EngineError::NotRunning)?,
            SessionState::Idle | SessionState::Completed(_) => {
                return Err(EngineError::NotRunning);
            }
        };
        self.select_answer(id, option).await
    }

    /// Move by `delta` questions, clamped to the sequence. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` outside a running attempt, or storage errors.
    pub async fn navigate(&mut self, delta: isize) -> Result<usize, EngineError> {
        let SessionState::Running(running) = &mut self.state else {
            return Err(EngineError::NotRunning);
        };
        if running.move_by(delta) {
            persist::save_index(&self.store, running.current_index).await?;
        }
        Ok(running.current_index)
    }

    /// Jump to `index`, clamped to the sequence. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` outside a running attempt, or storage errors.
    pub async fn go_to(&mut self, index: usize) -> Result<usize, EngineError> {
        let SessionState::Running(running) = &mut self.state else {
            return Err(EngineError::NotRunning);
        };
        if running.move_to(index) {
            persist::save_index(&self.store, running.current_index).await?;
        }
        Ok(running.current_index)
    }

    /// Score the running attempt and freeze the result.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` outside a running attempt, or storage errors.
    pub async fn submit(&mut self) -> Result<(), EngineError> {
        let SessionState::Running(running) = &self.state else {
            return Err(EngineError::NotRunning);
        };

        let result = ExamResult::grade(
            Submission {
                questions: running.questions.clone(),
                answers: running.answers.clone(),
                deadline: running.deadline,
                completed_at: self.clock.now(),
            },
            &self.config,
        );

        persist::commit_result(&self.store, &result).await?;

        info!(
            score = result.score(),
            total = result.total(),
            percentage = result.percentage(),
            attempted = result.analytics().attempted_count,
            "test submitted"
        );
        self.state = SessionState::Completed(result);
        Ok(())
    }

    /// Leave the current attempt or result and return to idle.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn exit(&mut self) -> Result<(), EngineError> {
        persist::clear_all(&self.store).await?;
        info!(from = self.state.label(), "returned to welcome");
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Compare the clock against the absolute deadline, submitting once it has passed.
    ///
    /// # Errors
    ///
    /// Returns storage errors from an automatic submission.
    pub async fn reconcile(&mut self) -> Result<Tick, EngineError> {
        let remaining = match &self.state {
            SessionState::Running(running) => running.remaining_secs(self.clock.now()),
            SessionState::Idle | SessionState::Completed(_) => return Ok(Tick::Inactive),
        };
        if remaining > 0 {
            return Ok(Tick::Remaining(remaining));
        }

        info!("time is up; submitting automatically");
        self.submit().await?;
        Ok(Tick::Expired)
    }

    /// Apply a freshly loaded bank.
    ///
    /// While running, the attempt is merged in place: order, ids and answers
    /// are untouched and new questions are appended. Otherwise the fresh bank
    /// replaces the stored one after a shuffle. An empty bank is ignored.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn apply_bank(&mut self, report: LoadReport) -> Result<BankUpdate, EngineError> {
        if !report.defaulted_indicators.is_empty() {
            warn!(
                questions = ?report.defaulted_indicators,
                "unrecognized correct-answer indicator; defaulted to option A"
            );
        }
        let mut fresh = report.questions;
        if fresh.is_empty() {
            return Ok(BankUpdate::Kept);
        }

        if let SessionState::Running(running) = &mut self.state {
            let outcome = merge_running(&running.questions, &fresh);
            persist::save_bank(&self.store, &outcome.questions).await?;
            debug!(
                appended = outcome.appended,
                retained_missing = outcome.retained_missing,
                "merged bank into running test"
            );
            running.questions = outcome.questions;
            self.bank.clone_from(&running.questions);
            return Ok(BankUpdate::Merged {
                appended: outcome.appended,
            });
        }

        shuffle_in_place(&mut fresh, &mut rand::rng());
        persist::save_bank(&self.store, &fresh).await?;
        let count = fresh.len();
        self.bank = fresh;
        debug!(questions = count, "replaced idle bank");
        Ok(BankUpdate::Replaced { questions: count })
    }

    /// Fetch, parse and apply the bank from `source`.
    ///
    /// An unavailable or empty source is not an error: the stored bank is
    /// kept and `BankUpdate::Kept` is returned.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn refresh_bank(&mut self, source: &dyn BankSource) -> Result<BankUpdate, EngineError> {
        match fetch_bank(source).await {
            Ok(report) => self.apply_bank(report).await,
            Err(err) => {
                warn!(source = %source.describe(), error = %err, "keeping stored question bank");
                Ok(BankUpdate::Kept)
            }
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state.label())
            .field("bank_len", &self.bank.len())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
