//! Line-oriented terminal driver for a live session.

use prep_core::TimerEvent;
use prep_core::model::{AnswerValue, Grading, ItemId, Rating, SessionKind, SessionSummary};
use services::{SessionController, SessionError};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Answer(String),
    Next,
    Previous,
    GoTo(usize),
    Pause,
    Resume,
    Status,
    Finish,
    Abort,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    Some(match head {
        "a" | "answer" if !rest.is_empty() => Input::Answer(rest.to_string()),
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "g" | "goto" => Input::GoTo(rest.parse::<usize>().ok()?.saturating_sub(1)),
        "pause" => Input::Pause,
        "resume" => Input::Resume,
        "s" | "status" => Input::Status,
        "finish" | "done" => Input::Finish,
        "abort" | "quit" | "q" => Input::Abort,
        "h" | "help" | "?" => Input::Help,
        _ => Input::Answer(line.to_string()),
    })
}

/// Turn raw answer text into a value for an item of `kind`.
///
/// Choices are 1-based on screen; ratings accept `"<1-5> [notes]"`.
fn parse_answer(kind: SessionKind, raw: &str) -> Option<AnswerValue> {
    match kind {
        SessionKind::Mcq => {
            let n = raw.trim().parse::<usize>().ok()?;
            n.checked_sub(1).map(AnswerValue::Choice)
        }
        SessionKind::Coding => Some(AnswerValue::Code(raw.to_string())),
        SessionKind::Interview => {
            let (score, notes) = raw.trim().split_once(' ').unwrap_or((raw.trim(), ""));
            let rating = Rating::new(score.parse::<u8>().ok()?).ok()?;
            let notes = notes.trim();
            Some(AnswerValue::Rating {
                rating,
                notes: (!notes.is_empty()).then(|| notes.to_string()),
            })
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  <answer> | a <answer>   answer the current item (choice number, code, or rating 1-5 [notes])");
    println!("  n / p / g <number>      next, previous, jump to item");
    println!("  pause / resume          hold or continue the clock");
    println!("  s                       show progress");
    println!("  finish                  submit the session");
    println!("  abort                   leave without recording");
}

fn print_current(controller: &SessionController) {
    let session = controller.session();
    let Some(item) = session.current_item() else {
        return;
    };
    let progress = controller.progress();
    println!();
    println!(
        "[{}/{}] {} · {} · {}",
        progress.current_index + 1,
        progress.total,
        item.category(),
        item.difficulty(),
        format_secs(progress.remaining_secs),
    );
    println!("{}", item.prompt());
    match item.grading() {
        Grading::Choice { options, .. } => {
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {option}", i + 1);
            }
        }
        Grading::TestCases { cases } => {
            for case in cases {
                println!("  {} -> {}", case.input, case.expected_output);
            }
        }
        Grading::RatingOnly => println!("  rate yourself 1-5"),
    }
    if let Some(answer) = session.answer_for(item.id()) {
        println!("  (answered: {})", answer.value.display());
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!(
        "Session {}: {}% ({} correct, {} incorrect, {} unanswered) in {}",
        summary.status(),
        summary.score_percent(),
        summary.items_correct(),
        summary.items_incorrect(),
        summary.items_unanswered(),
        format_secs(summary.duration_used_secs()),
    );
    for category in summary.categories() {
        println!(
            "  {:<20} {}/{} correct ({}%)",
            category.category, category.correct, category.total, category.score_percent
        );
    }
}

fn format_secs(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn report(err: &SessionError) {
    println!("! {err}");
}

async fn conclude(
    controller: &mut SessionController,
    failure: Option<SessionError>,
) -> Result<(), SessionError> {
    if let Some(err) = failure {
        report(&err);
        // One retry before giving up; the summary stays on the controller.
        controller.finalize_summary().await?;
    }
    if let Some(summary) = controller.summary() {
        print_summary(summary);
    }
    if let Some(id) = controller.summary_id() {
        println!("Saved as #{id}");
    }
    Ok(())
}

/// Run the session until it finishes, expires, is aborted, or stdin closes.
///
/// # Errors
///
/// Returns `SessionError` when the summary cannot be archived.
pub async fn drive(mut controller: SessionController) -> Result<(), SessionError> {
    print_help();
    print_current(&controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let ticking = controller.is_ticking();
        tokio::select! {
            tick = controller.wait_tick(), if ticking => {
                match tick {
                    Ok(Some(TimerEvent::Expired)) => {
                        println!();
                        println!("Time is up.");
                        return conclude(&mut controller, None).await;
                    }
                    Ok(Some(TimerEvent::Tick { remaining_secs })) => {
                        if remaining_secs % 60 == 0 || remaining_secs <= 10 {
                            println!("  {} left", format_secs(remaining_secs));
                        }
                    }
                    Ok(None) => {}
                    Err(err) => return conclude(&mut controller, Some(err)).await,
                }
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    // stdin closed: dropping the controller aborts the session.
                    println!("Input closed; session abandoned.");
                    return Ok(());
                };
                let Some(input) = parse_input(&line) else {
                    continue;
                };
                match input {
                    Input::Answer(raw) => {
                        let Some(item) = controller.session().current_item() else {
                            continue;
                        };
                        let item_id: ItemId = item.id();
                        let Some(value) = parse_answer(item.kind(), &raw) else {
                            println!("! could not read that answer; type `help`");
                            continue;
                        };
                        match controller.submit_answer(item_id, value) {
                            Ok(feedback) => {
                                match feedback.correct {
                                    Some(true) => println!("  correct"),
                                    Some(false) => println!("  incorrect"),
                                    None => println!("  saved"),
                                }
                                if let Some(explanation) = feedback.explanation {
                                    println!("  {explanation}");
                                }
                            }
                            Err(err) => report(&err),
                        }
                    }
                    Input::Next => {
                        if let Err(err) = controller.next() {
                            report(&err);
                        }
                        print_current(&controller);
                    }
                    Input::Previous => {
                        if let Err(err) = controller.previous() {
                            report(&err);
                        }
                        print_current(&controller);
                    }
                    Input::GoTo(index) => {
                        if let Err(err) = controller.go_to(index) {
                            report(&err);
                        }
                        print_current(&controller);
                    }
                    Input::Pause => match controller.pause() {
                        Ok(()) => println!("Paused. Type `resume` to continue."),
                        Err(err) => report(&err),
                    },
                    Input::Resume => match controller.resume() {
                        Ok(()) => print_current(&controller),
                        Err(err) => report(&err),
                    },
                    Input::Status => {
                        let progress = controller.progress();
                        println!(
                            "  {}/{} answered, {} left{}",
                            progress.answered,
                            progress.total,
                            format_secs(progress.remaining_secs),
                            if progress.paused { " (paused)" } else { "" },
                        );
                    }
                    Input::Finish => {
                        let failure = controller.finish().await.err();
                        return conclude(&mut controller, failure).await;
                    }
                    Input::Abort => {
                        if let Err(err) = controller.abort() {
                            report(&err);
                        }
                        println!("Session aborted; nothing recorded.");
                        return Ok(());
                    }
                    Input::Help => print_help(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_text_is_an_answer() {
        assert_eq!(parse_input("  2 "), Some(Input::Answer("2".into())));
        assert_eq!(parse_input("a 4 good story"), Some(Input::Answer("4 good story".into())));
        assert_eq!(parse_input("g 3"), Some(Input::GoTo(2)));
        assert_eq!(parse_input("g x"), None);
        assert_eq!(parse_input(""), None);
        assert_eq!(parse_input("finish"), Some(Input::Finish));
    }

    #[test]
    fn answers_follow_item_kind() {
        assert_eq!(
            parse_answer(SessionKind::Mcq, "1"),
            Some(AnswerValue::Choice(0))
        );
        assert_eq!(parse_answer(SessionKind::Mcq, "0"), None);
        assert_eq!(
            parse_answer(SessionKind::Interview, "4 led the migration"),
            Some(AnswerValue::Rating {
                rating: Rating::new(4).unwrap(),
                notes: Some("led the migration".into()),
            })
        );
        assert_eq!(parse_answer(SessionKind::Interview, "9"), None);
        assert_eq!(
            parse_answer(SessionKind::Coding, "fn main() {}"),
            Some(AnswerValue::Code("fn main() {}".into()))
        );
    }

    #[test]
    fn seconds_render_as_clock() {
        assert_eq!(format_secs(0), "00:00");
        assert_eq!(format_secs(125), "02:05");
    }
}
