//! The session state machine shared by every assessment kind.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::model::{
    Answer, AnswerValue, Item, ItemId, ItemOutcome, ItemSet, SessionConfig, SessionId,
    SessionKind, SessionStatus, SessionSummary,
};
use crate::timer::{Countdown, TimerEvent, TimerState};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// An operation attempted outside its permitted state.
///
/// The session is left exactly as it was whenever one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("session is closed")]
    SessionClosed,

    #[error("session has not started")]
    NotStarted,

    #[error("session already started")]
    AlreadyStarted,

    #[error("session is paused")]
    Paused,

    #[error("session is not paused")]
    NotPaused,

    #[error("item {0} is not part of this session")]
    UnknownItem(ItemId),

    #[error("item {item_id} expects a {expected} answer")]
    AnswerKindMismatch {
        item_id: ItemId,
        expected: SessionKind,
    },

    #[error("option {index} is out of range for item {item_id} ({options} options)")]
    ChoiceOutOfRange {
        item_id: ItemId,
        index: usize,
        options: usize,
    },
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Read-only snapshot for progress display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current_index: usize,
    pub remaining_secs: u32,
    pub status: SessionStatus,
    pub paused: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed attempt at an item set.
///
/// `Configuring → InProgress → {Completed, Expired, Aborted}`. Answers are keyed
/// by item id and independent from the cursor position.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    items: ItemSet,
    config: SessionConfig,
    status: SessionStatus,
    current: usize,
    answers: HashMap<ItemId, Answer>,
    timer: Countdown,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    graded: bool,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, items: ItemSet, config: SessionConfig) -> Self {
        Self {
            id,
            items,
            config,
            status: SessionStatus::Configuring,
            current: 0,
            answers: HashMap::new(),
            timer: Countdown::new(),
            started_at: None,
            ended_at: None,
            graded: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.items.kind()
    }

    #[must_use]
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.timer.state() == TimerState::Paused
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&Item> {
        self.items.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<ItemId, Answer> {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, item_id: ItemId) -> Option<&Answer> {
        self.answers.get(&item_id)
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        if self.status == SessionStatus::Configuring {
            return self.config.total_duration_secs();
        }
        self.timer.remaining_secs()
    }

    /// Seconds of the countdown consumed so far; paused time is not counted.
    #[must_use]
    pub fn duration_used_secs(&self) -> u32 {
        self.timer.elapsed_secs()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.items.len(),
            answered: self.answers.len(),
            current_index: self.current,
            remaining_secs: self.remaining_secs(),
            status: self.status,
            paused: self.is_paused(),
        }
    }

    /// Move `Configuring → InProgress` and start the countdown.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` once running, `SessionClosed` after a terminal state.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.status {
            SessionStatus::Configuring => {}
            SessionStatus::InProgress => return Err(TransitionError::AlreadyStarted),
            _ => return Err(TransitionError::SessionClosed),
        }
        self.timer.start(self.config.total_duration_secs());
        self.status = SessionStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Record (or overwrite) the answer for any item of the set.
    ///
    /// The cursor does not move.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` when the session is not accepting answers, the
    /// item is unknown, or the value does not fit the item.
    pub fn submit_answer(
        &mut self,
        item_id: ItemId,
        value: AnswerValue,
        now: DateTime<Utc>,
    ) -> Result<&Answer, TransitionError> {
        self.ensure_interactive()?;
        let item = self
            .items
            .find(item_id)
            .ok_or(TransitionError::UnknownItem(item_id))?;
        if value.kind() != item.kind() {
            return Err(TransitionError::AnswerKindMismatch {
                item_id,
                expected: item.kind(),
            });
        }
        if let AnswerValue::Choice(index) = &value {
            let options = item.options().len();
            if *index >= options {
                return Err(TransitionError::ChoiceOutOfRange {
                    item_id,
                    index: *index,
                    options,
                });
            }
        }

        self.answers
            .insert(item_id, Answer::new(item_id, value, now));
        self.answers
            .get(&item_id)
            .ok_or(TransitionError::UnknownItem(item_id))
    }

    /// Jump to `index`, clamped to the valid range. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` when the session is not interactive.
    pub fn go_to(&mut self, index: usize) -> Result<usize, TransitionError> {
        self.ensure_interactive()?;
        let last = self.items.len().saturating_sub(1);
        self.current = index.min(last);
        Ok(self.current)
    }

    /// # Errors
    ///
    /// Returns `TransitionError` when the session is not interactive.
    pub fn next(&mut self) -> Result<usize, TransitionError> {
        self.go_to(self.current.saturating_add(1))
    }

    /// # Errors
    ///
    /// Returns `TransitionError` when the session is not interactive.
    pub fn previous(&mut self) -> Result<usize, TransitionError> {
        self.go_to(self.current.saturating_sub(1))
    }

    /// # Errors
    ///
    /// `NotStarted`, `SessionClosed`, or `Paused` when already paused.
    pub fn pause(&mut self) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        if self.timer.pause() {
            Ok(())
        } else {
            Err(TransitionError::Paused)
        }
    }

    /// # Errors
    ///
    /// `NotStarted`, `SessionClosed`, or `NotPaused` when running.
    pub fn resume(&mut self) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        if self.timer.resume() {
            Ok(())
        } else {
            Err(TransitionError::NotPaused)
        }
    }

    /// User-triggered completion. Allowed at any time while in progress, paused or not.
    ///
    /// # Errors
    ///
    /// `SessionClosed` on every call after the first terminal transition.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<SessionStatus, TransitionError> {
        self.ensure_in_progress()?;
        self.timer.cancel();
        Ok(self.close(SessionStatus::Completed, now))
    }

    /// Abandon the attempt; no summary will be produced.
    ///
    /// A session that never started can be aborted too.
    ///
    /// # Errors
    ///
    /// `SessionClosed` if the session already reached a terminal state.
    pub fn abort(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::SessionClosed);
        }
        self.timer.cancel();
        self.close(SessionStatus::Aborted, now);
        Ok(())
    }

    /// Apply one elapsed second. Expiry moves the session to `Expired`.
    ///
    /// Returns `Ok(None)` while paused.
    ///
    /// # Errors
    ///
    /// `SessionClosed` for a tick arriving after a terminal transition; the tick
    /// is discarded.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<TimerEvent>, TransitionError> {
        self.ensure_in_progress()?;
        let event = self.timer.tick();
        if event == Some(TimerEvent::Expired) {
            self.close(SessionStatus::Expired, now);
        }
        Ok(event)
    }

    /// Stamp each answer with the correctness decided by the scorer.
    ///
    /// Only applies once, and only to a scored session whose id matches.
    pub fn record_grades(&mut self, summary: &SessionSummary) -> bool {
        if self.graded || !self.status.is_scored() || summary.id() != self.id {
            return false;
        }
        for detail in summary.per_item_detail() {
            if let Some(answer) = self.answers.get_mut(&detail.item_id) {
                answer.correct = match detail.outcome {
                    ItemOutcome::Correct => Some(true),
                    ItemOutcome::Incorrect => Some(false),
                    ItemOutcome::Unanswered => None,
                };
            }
        }
        self.graded = true;
        true
    }

    fn close(&mut self, status: SessionStatus, now: DateTime<Utc>) -> SessionStatus {
        self.status = status;
        // Never record an end before the start.
        let ended = self.started_at.map_or(now, |started| started.max(now));
        self.ended_at = Some(ended);
        status
    }

    fn ensure_in_progress(&self) -> Result<(), TransitionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Configuring => Err(TransitionError::NotStarted),
            _ => Err(TransitionError::SessionClosed),
        }
    }

    fn ensure_interactive(&self) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        if self.is_paused() {
            return Err(TransitionError::Paused);
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.items.kind())
            .field("items_len", &self.items.len())
            .field("status", &self.status)
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("remaining_secs", &self.timer.remaining_secs())
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{interview, mcq};
    use crate::model::Rating;
    use crate::time::fixed_now;

    fn mcq_session(n: u64, duration: u32) -> Session {
        let items = (1..=n).map(|id| mcq(id, "General", 0)).collect();
        let set = ItemSet::new(SessionKind::Mcq, items).unwrap();
        Session::new(
            SessionId::generate(),
            set,
            SessionConfig::new(duration, false).unwrap(),
        )
    }

    fn started(n: u64, duration: u32) -> Session {
        let mut session = mcq_session(n, duration);
        session.start(fixed_now()).unwrap();
        session
    }

    #[test]
    fn start_moves_to_in_progress_once() {
        let mut session = mcq_session(2, 60);
        assert_eq!(session.status(), SessionStatus::Configuring);
        assert_eq!(session.remaining_secs(), 60);
        session.start(fixed_now()).unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(
            session.start(fixed_now()).unwrap_err(),
            TransitionError::AlreadyStarted
        );
    }

    #[test]
    fn operations_before_start_are_rejected() {
        let mut session = mcq_session(2, 60);
        assert_eq!(
            session
                .submit_answer(ItemId::new(1), AnswerValue::Choice(0), fixed_now())
                .unwrap_err(),
            TransitionError::NotStarted
        );
        assert_eq!(session.tick(fixed_now()).unwrap_err(), TransitionError::NotStarted);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn navigation_clamps_and_keeps_answers() {
        let mut session = started(5, 60);
        session
            .submit_answer(ItemId::new(2), AnswerValue::Choice(1), fixed_now())
            .unwrap();
        let before = session.answers().clone();

        assert_eq!(session.go_to(4).unwrap(), 4);
        assert_eq!(session.go_to(1).unwrap(), 1);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.go_to(99).unwrap(), 4);
        assert_eq!(session.next().unwrap(), 4);
        session.go_to(0).unwrap();
        assert_eq!(session.previous().unwrap(), 0);
        assert_eq!(session.answers(), &before);
    }

    #[test]
    fn answers_do_not_move_cursor_and_last_one_wins() {
        let mut session = started(3, 60);
        session
            .submit_answer(ItemId::new(3), AnswerValue::Choice(1), fixed_now())
            .unwrap();
        session
            .submit_answer(ItemId::new(3), AnswerValue::Choice(2), fixed_now())
            .unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answers().len(), 1);
        assert_eq!(
            session.answer_for(ItemId::new(3)).unwrap().value,
            AnswerValue::Choice(2)
        );
    }

    #[test]
    fn rejects_bad_answers_without_recording() {
        let mut session = started(2, 60);
        assert_eq!(
            session
                .submit_answer(ItemId::new(9), AnswerValue::Choice(0), fixed_now())
                .unwrap_err(),
            TransitionError::UnknownItem(ItemId::new(9))
        );
        assert!(matches!(
            session.submit_answer(ItemId::new(1), AnswerValue::Choice(4), fixed_now()),
            Err(TransitionError::ChoiceOutOfRange { index: 4, .. })
        ));
        let rating = AnswerValue::Rating {
            rating: Rating::new(3).unwrap(),
            notes: None,
        };
        assert!(matches!(
            session.submit_answer(ItemId::new(1), rating, fixed_now()),
            Err(TransitionError::AnswerKindMismatch { .. })
        ));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn pause_blocks_interaction_but_not_finish() {
        let mut session = started(2, 60);
        session.pause().unwrap();
        assert_eq!(session.pause().unwrap_err(), TransitionError::Paused);
        assert_eq!(session.go_to(1).unwrap_err(), TransitionError::Paused);
        assert_eq!(session.tick(fixed_now()).unwrap(), None);
        assert_eq!(session.remaining_secs(), 60);

        session.resume().unwrap();
        assert_eq!(session.resume().unwrap_err(), TransitionError::NotPaused);
        session.tick(fixed_now()).unwrap();
        assert_eq!(session.remaining_secs(), 59);

        session.pause().unwrap();
        assert_eq!(
            session.finish(fixed_now()).unwrap(),
            SessionStatus::Completed
        );
    }

    #[test]
    fn expiry_closes_session_once() {
        let mut session = started(5, 30);
        let mut expired = 0;
        for _ in 0..30 {
            if session.tick(fixed_now()).unwrap() == Some(TimerEvent::Expired) {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        assert_eq!(session.status(), SessionStatus::Expired);
        assert_eq!(session.remaining_secs(), 0);
        assert_eq!(session.duration_used_secs(), 30);
        assert_eq!(
            session.tick(fixed_now()).unwrap_err(),
            TransitionError::SessionClosed
        );
    }

    #[test]
    fn finish_is_only_accepted_once() {
        let mut session = started(2, 60);
        assert!(session.finish(fixed_now()).is_ok());
        assert_eq!(
            session.finish(fixed_now()).unwrap_err(),
            TransitionError::SessionClosed
        );
        assert_eq!(
            session.abort(fixed_now()).unwrap_err(),
            TransitionError::SessionClosed
        );
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn submit_after_finish_changes_nothing() {
        let mut session = started(2, 60);
        session.finish(fixed_now()).unwrap();
        let err = session
            .submit_answer(ItemId::new(1), AnswerValue::Choice(0), fixed_now())
            .unwrap_err();
        assert_eq!(err, TransitionError::SessionClosed);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn abort_is_terminal_and_idempotent() {
        let mut session = started(2, 60);
        session.abort(fixed_now()).unwrap();
        assert_eq!(session.status(), SessionStatus::Aborted);
        assert_eq!(
            session.abort(fixed_now()).unwrap_err(),
            TransitionError::SessionClosed
        );
        assert_eq!(
            session.tick(fixed_now()).unwrap_err(),
            TransitionError::SessionClosed
        );
    }

    #[test]
    fn configuring_session_can_be_aborted() {
        let mut session = mcq_session(1, 60);
        session.abort(fixed_now()).unwrap();
        assert_eq!(session.status(), SessionStatus::Aborted);
    }

    #[test]
    fn index_stays_in_range_across_random_walk() {
        let mut session = started(4, 600);
        let moves = [3_usize, 7, 0, 2, 100, 1, 5];
        for (step, target) in moves.iter().enumerate() {
            if step % 2 == 0 {
                session.go_to(*target).unwrap();
            } else {
                session.next().unwrap();
            }
            assert!(session.current_index() < session.items().len());
        }
    }

    #[test]
    fn rating_answers_accepted_for_interviews() {
        let set = ItemSet::new(SessionKind::Interview, vec![interview(1, "Behavioral")]).unwrap();
        let mut session = Session::new(
            SessionId::generate(),
            set,
            SessionConfig::default_for(SessionKind::Interview),
        );
        session.start(fixed_now()).unwrap();
        let value = AnswerValue::Rating {
            rating: Rating::new(5).unwrap(),
            notes: Some("solid".into()),
        };
        assert!(session.submit_answer(ItemId::new(1), value, fixed_now()).is_ok());
        assert_eq!(session.progress().answered, 1);
    }
}
