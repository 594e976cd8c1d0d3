//! Turns recorded answers into a `SessionSummary`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::model::{
    Answer, AnswerValue, CategoryBreakdown, Grading, Item, ItemDetail, ItemId, ItemOutcome,
    ItemSet, Rating, SessionId, SessionStatus, SessionSummary, SessionSummaryError,
    SummaryParts, TestCase,
};
use crate::session::Session;

/// Lowest interview rating that counts as a pass.
pub const PASSING_RATING: u8 = 3;

/// Decides whether submitted code satisfies an item's test cases.
pub trait CodeGrader: Send + Sync {
    /// `Some(true)` when every case passes, `Some(false)` when one fails, and
    /// `None` when the grader cannot tell.
    fn grade(&self, item: &Item, cases: &[TestCase], code: &str) -> Option<bool>;
}

/// Grader used when no execution backend is wired in: nothing is verified, so
/// every submission stays unconfirmed and scores as incorrect.
#[derive(Debug, Clone, Copy, Default)]
pub struct UngradedCode;

impl CodeGrader for UngradedCode {
    fn grade(&self, _item: &Item, _cases: &[TestCase], _code: &str) -> Option<bool> {
        None
    }
}

/// Session facts the summary needs besides items and answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreContext {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_used_secs: u32,
}

#[derive(Default)]
struct Tally {
    total: u32,
    answered: u32,
    correct: u32,
    rating_points: u32,
}

impl Tally {
    fn record(&mut self, outcome: ItemOutcome, rating: Option<Rating>) {
        self.total += 1;
        if outcome != ItemOutcome::Unanswered {
            self.answered += 1;
        }
        if outcome == ItemOutcome::Correct {
            self.correct += 1;
        }
        if let Some(r) = rating {
            self.rating_points += r.percent();
        }
    }

    fn score(&self, rating_only: bool) -> u8 {
        if rating_only {
            rounded_percent(self.rating_points, self.total)
        } else {
            rounded_percent(self.correct.saturating_mul(100), self.total)
        }
    }
}

/// `round(numer / denom)`, half rounded up, capped at 100.
fn rounded_percent(numer: u32, denom: u32) -> u8 {
    if denom == 0 {
        return 0;
    }
    let numer = u64::from(numer);
    let denom = u64::from(denom);
    let rounded = (numer * 2 + denom) / (denom * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

pub struct Scorer<'a> {
    grader: &'a dyn CodeGrader,
}

impl<'a> Scorer<'a> {
    #[must_use]
    pub fn new(grader: &'a dyn CodeGrader) -> Self {
        Self { grader }
    }

    /// Correctness of a single value against its item.
    ///
    /// Interview ratings pass at `PASSING_RATING` or above. Returns `None` when
    /// the value does not belong to the item or the grader cannot decide.
    #[must_use]
    pub fn grade_answer(&self, item: &Item, value: &AnswerValue) -> Option<bool> {
        match (item.grading(), value) {
            (Grading::Choice { correct, .. }, AnswerValue::Choice(index)) => Some(index == correct),
            (Grading::TestCases { cases }, AnswerValue::Code(code)) => {
                self.grader.grade(item, cases, code)
            }
            (Grading::RatingOnly, AnswerValue::Rating { rating, .. }) => {
                Some(rating.value() >= PASSING_RATING)
            }
            _ => None,
        }
    }

    fn outcome(&self, item: &Item, answer: Option<&Answer>) -> ItemOutcome {
        match answer {
            None => ItemOutcome::Unanswered,
            Some(answer) => match self.grade_answer(item, &answer.value) {
                Some(true) => ItemOutcome::Correct,
                Some(false) | None => ItemOutcome::Incorrect,
            },
        }
    }

    /// Score a finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the context is not a scored terminal
    /// state or the item count does not fit the summary counters.
    pub fn score(
        &self,
        items: &ItemSet,
        answers: &HashMap<ItemId, Answer>,
        ctx: &ScoreContext,
    ) -> Result<SessionSummary, SessionSummaryError> {
        u32::try_from(items.len())
            .map_err(|_| SessionSummaryError::TooManyItems { len: items.len() })?;

        let rating_only = items.kind().is_rating_only();
        let mut overall = Tally::default();
        let mut incorrect = 0_u32;
        let mut category_order: Vec<(String, Tally)> = Vec::new();
        let mut category_index: HashMap<String, usize> = HashMap::new();
        let mut details = Vec::with_capacity(items.len());

        for item in items.iter() {
            let answer = answers.get(&item.id());
            let outcome = self.outcome(item, answer);
            let rating = answer.and_then(|a| a.value.rating());

            overall.record(outcome, rating);
            if outcome == ItemOutcome::Incorrect {
                incorrect += 1;
            }

            let slot = *category_index
                .entry(item.category().to_string())
                .or_insert_with(|| {
                    category_order.push((item.category().to_string(), Tally::default()));
                    category_order.len() - 1
                });
            category_order[slot].1.record(outcome, rating);

            details.push(ItemDetail {
                item_id: item.id(),
                category: item.category().to_string(),
                outcome,
                rating: rating.map(Rating::value),
                submitted: answer.map(|a| a.value.display()),
            });
        }

        let categories = category_order
            .into_iter()
            .map(|(category, tally)| CategoryBreakdown {
                score_percent: tally.score(rating_only),
                category,
                total: tally.total,
                answered: tally.answered,
                correct: tally.correct,
            })
            .collect();

        SessionSummary::from_parts(SummaryParts {
            id: ctx.session_id,
            kind: items.kind(),
            status: ctx.status,
            started_at: ctx.started_at,
            completed_at: ctx.completed_at,
            items_total: overall.total,
            items_answered: overall.answered,
            items_correct: overall.correct,
            items_incorrect: incorrect,
            items_unanswered: overall.total - overall.answered,
            score_percent: overall.score(rating_only),
            duration_used_secs: ctx.duration_used_secs,
            categories,
            per_item_detail: details,
        })
    }

    /// Score a session that reached `Completed` or `Expired`.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::NotScored` for any other status.
    pub fn score_session(&self, session: &Session) -> Result<SessionSummary, SessionSummaryError> {
        let status = session.status();
        if !status.is_scored() {
            return Err(SessionSummaryError::NotScored(status));
        }
        let completed_at = session
            .ended_at()
            .ok_or(SessionSummaryError::NotScored(status))?;
        let ctx = ScoreContext {
            session_id: session.id(),
            status,
            started_at: session.started_at().unwrap_or(completed_at),
            completed_at,
            duration_used_secs: session.duration_used_secs(),
        };
        self.score(session.items(), session.answers(), &ctx)
    }
}
