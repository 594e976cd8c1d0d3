#![forbid(unsafe_code)]

pub mod model;
pub mod scorer;
pub mod session;
pub mod time;
pub mod timer;

pub use scorer::{CodeGrader, ScoreContext, Scorer, UngradedCode};
pub use session::{Session, SessionProgress, TransitionError};
pub use time::Clock;
pub use timer::{Countdown, TimerEvent, TimerState};
