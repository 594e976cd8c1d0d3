use std::fmt;
use std::sync::Arc;

use prep_core::model::{AnswerValue, ItemId, SessionSummary, SessionSummaryError};
use prep_core::{Clock, CodeGrader, Scorer, Session, SessionProgress, TimerEvent, TransitionError};
use storage::repository::{HistoryRepository, SummaryId};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::ticks::TickSource;

/// Immediate response to a submitted answer.
///
/// `correct` and `explanation` are only filled when the session shows
/// explanations right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub item_id: ItemId,
    pub correct: Option<bool>,
    pub explanation: Option<String>,
    pub answered: usize,
}

/// Drives one live session: forwards user actions, paces the countdown, and
/// archives the summary once the session ends.
pub struct SessionController {
    session: Session,
    ticks: Box<dyn TickSource>,
    clock: Clock,
    history: Arc<dyn HistoryRepository>,
    grader: Arc<dyn CodeGrader>,
    summary: Option<SessionSummary>,
    summary_id: Option<SummaryId>,
}

impl SessionController {
    pub(crate) fn new(
        session: Session,
        ticks: Box<dyn TickSource>,
        clock: Clock,
        history: Arc<dyn HistoryRepository>,
        grader: Arc<dyn CodeGrader>,
    ) -> Self {
        Self {
            session,
            ticks,
            clock,
            history,
            grader,
            summary: None,
            summary_id: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.session.progress()
    }

    /// The scored summary once the session completed or expired.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Archive id once the summary has been appended.
    #[must_use]
    pub fn summary_id(&self) -> Option<SummaryId> {
        self.summary_id
    }

    /// Whether the tick registration is currently held.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticks.is_armed()
    }

    /// Record an answer for any item of the set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transition` when the session rejects the answer.
    pub fn submit_answer(
        &mut self,
        item_id: ItemId,
        value: AnswerValue,
    ) -> Result<AnswerFeedback, SessionError> {
        let now = self.clock.now();
        let show = self.session.config().show_explanations();
        let correct = if show {
            self.session
                .items()
                .find(item_id)
                .and_then(|item| Scorer::new(self.grader.as_ref()).grade_answer(item, &value))
        } else {
            None
        };

        let submitted = self
            .session
            .submit_answer(item_id, value, now)
            .map(|_| ());
        submitted.map_err(|e| self.rejected("submit_answer", e))?;

        let explanation = if show {
            self.session
                .items()
                .find(item_id)
                .and_then(|item| item.explanation().map(str::to_string))
        } else {
            None
        };

        Ok(AnswerFeedback {
            item_id,
            correct,
            explanation,
            answered: self.session.answers().len(),
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::Transition` when navigation is not allowed.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.session.go_to(index).map_err(|e| self.rejected("go_to", e))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Transition` when navigation is not allowed.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.session.next().map_err(|e| self.rejected("next", e))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Transition` when navigation is not allowed.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.session.previous().map_err(|e| self.rejected("previous", e))
    }

    /// Pause the countdown and release the tick registration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transition` when not running.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.session.pause().map_err(|e| self.rejected("pause", e))?;
        self.ticks.disarm();
        info!(session_id = %self.session.id(), remaining = self.session.remaining_secs(), "session paused");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Transition` when not paused.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.session.resume().map_err(|e| self.rejected("resume", e))?;
        self.ticks.arm();
        info!(session_id = %self.session.id(), remaining = self.session.remaining_secs(), "session resumed");
        Ok(())
    }

    /// Complete the session, score it, and append the summary to history.
    ///
    /// # Errors
    ///
    /// `SessionError::Transition(SessionClosed)` once the session has ended;
    /// `SessionError::Storage` when the append fails (retry with
    /// `finalize_summary`).
    pub async fn finish(&mut self) -> Result<SummaryId, SessionError> {
        let now = self.clock.now();
        let status = self.session.finish(now).map_err(|e| self.rejected("finish", e))?;
        self.ticks.disarm();
        info!(
            session_id = %self.session.id(),
            %status,
            answered = self.session.answers().len(),
            "session finished"
        );
        self.conclude().await
    }

    /// Apply one elapsed second.
    ///
    /// A tick arriving after the session ended is discarded and yields
    /// `Ok(None)`. Expiry scores and archives the session like `finish`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when scoring or the archive append fails on expiry.
    pub async fn on_tick(&mut self) -> Result<Option<TimerEvent>, SessionError> {
        let now = self.clock.now();
        match self.session.tick(now) {
            Ok(Some(TimerEvent::Expired)) => {
                self.ticks.disarm();
                info!(session_id = %self.session.id(), "session expired");
                self.conclude().await?;
                Ok(Some(TimerEvent::Expired))
            }
            Ok(event) => Ok(event),
            Err(err) => {
                debug!(session_id = %self.session.id(), error = %err, "late tick discarded");
                self.ticks.disarm();
                Ok(None)
            }
        }
    }

    /// Wait for the tick source, then apply the tick.
    ///
    /// Returns `Ok(None)` immediately while the registration is released.
    ///
    /// # Errors
    ///
    /// See `on_tick`.
    pub async fn wait_tick(&mut self) -> Result<Option<TimerEvent>, SessionError> {
        if !self.ticks.next_tick().await {
            return Ok(None);
        }
        self.on_tick().await
    }

    /// Abandon the session. Nothing is scored or archived.
    ///
    /// # Errors
    ///
    /// `SessionError::Transition(SessionClosed)` once the session has ended.
    pub fn abort(&mut self) -> Result<(), SessionError> {
        self.ticks.disarm();
        let now = self.clock.now();
        self.session.abort(now).map_err(|e| self.rejected("abort", e))?;
        info!(session_id = %self.session.id(), "session aborted");
        Ok(())
    }

    /// Retry archiving after a failed append. Returns the existing id when the
    /// summary is already archived.
    ///
    /// # Errors
    ///
    /// `SessionError::Summary(NotScored)` when the session was not completed or
    /// expired; `SessionError::Storage` when the append fails again.
    pub async fn finalize_summary(&mut self) -> Result<SummaryId, SessionError> {
        if let Some(id) = self.summary_id {
            return Ok(id);
        }
        let status = self.session.status();
        if !status.is_scored() {
            return Err(SessionSummaryError::NotScored(status).into());
        }
        self.conclude().await
    }

    async fn conclude(&mut self) -> Result<SummaryId, SessionError> {
        let summary = match self.summary.take() {
            Some(summary) => summary,
            None => {
                let summary = Scorer::new(self.grader.as_ref()).score_session(&self.session)?;
                self.session.record_grades(&summary);
                summary
            }
        };

        let appended = self.history.append_summary(&summary).await;
        let kind = summary.kind();
        let score = summary.score_percent();
        self.summary = Some(summary);

        match appended {
            Ok(id) => {
                self.summary_id = Some(id);
                info!(
                    session_id = %self.session.id(),
                    summary_id = id,
                    %kind,
                    score,
                    "summary archived"
                );
                Ok(id)
            }
            Err(err) => {
                warn!(session_id = %self.session.id(), error = %err, "failed to archive summary");
                Err(err.into())
            }
        }
    }

    fn rejected(&self, op: &'static str, err: TransitionError) -> SessionError {
        debug!(session_id = %self.session.id(), op, error = %err, "transition rejected");
        SessionError::Transition(err)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.ticks.disarm();
        if !self.session.is_terminal() {
            let now = self.clock.now();
            if self.session.abort(now).is_ok() {
                info!(session_id = %self.session.id(), "live session dropped; aborted");
            }
        }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("ticking", &self.ticks.is_armed())
            .field("summary_id", &self.summary_id)
            .finish_non_exhaustive()
    }
}
