use std::fmt;
use std::sync::Arc;

use prep_core::model::{Difficulty, ItemQuery, SessionConfig, SessionKind};
use services::{Clock, EngineSettings, ExportFormat, HistoryService, IntervalTicks, SessionEngine};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod runner;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.parse::<T>()
        .map_err(|_| ArgsError::InvalidValue { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run --kind <mcq|coding|interview> [options]");
    eprintln!("  cargo run -p app -- history [--kind <k>] [--limit <n>]");
    eprintln!("  cargo run -p app -- export --id <n> [--format json|csv]");
    eprintln!();
    eprintln!("Run options:");
    eprintln!("  --limit <n>               Items to draw, 1-200 (default: 5)");
    eprintln!("  --duration <secs>         Time limit (default: per kind)");
    eprintln!("  --category <name>         Filter by category");
    eprintln!("  --difficulty <Easy|Medium|Hard>");
    eprintln!("  --company <name>          Filter by company");
    eprintln!("  --query <text>            Filter by prompt text");
    eprintln!("  --seed <n>                Shuffle items with a fixed seed");
    eprintln!("  --explain                 Show correctness and explanations after each answer");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://prep.sqlite3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL, PREP_FALLBACK, PREP_HISTORY_LIMIT, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunArgs {
    kind: SessionKind,
    query: ItemQuery,
    duration_secs: Option<u32>,
    shuffle_seed: Option<u64>,
    explain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    History {
        kind: Option<SessionKind>,
        limit: Option<u32>,
    },
    Export {
        id: i64,
        format: ExportFormat,
    },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PREP_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://prep.sqlite3".into(), normalize_sqlite_url);

        let mut args = argv.into_iter();
        let sub = args.next().ok_or(ArgsError::MissingValue { flag: "command" })?;

        let mut kind: Option<SessionKind> = None;
        let mut limit: Option<u32> = None;
        let mut query = ItemQuery::default();
        let mut duration_secs = None;
        let mut shuffle_seed = None;
        let mut explain = false;
        let mut id: Option<i64> = None;
        let mut format = ExportFormat::Json;

        while let Some(arg) = args.next() {
            match (sub.as_str(), arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                ("run" | "history", "--kind") => kind = Some(parse_value(&mut args, "--kind")?),
                ("run" | "history", "--limit") => limit = Some(parse_value(&mut args, "--limit")?),
                ("run", "--duration") => {
                    duration_secs = Some(parse_value(&mut args, "--duration")?);
                }
                ("run", "--category") => query.category = Some(require_value(&mut args, "--category")?),
                ("run", "--difficulty") => {
                    query.difficulty = Some(parse_value::<Difficulty>(&mut args, "--difficulty")?);
                }
                ("run", "--company") => query.company = Some(require_value(&mut args, "--company")?),
                ("run", "--query") => query.query = Some(require_value(&mut args, "--query")?),
                ("run", "--seed") => shuffle_seed = Some(parse_value(&mut args, "--seed")?),
                ("run", "--explain") => explain = true,
                ("export", "--id") => id = Some(parse_value(&mut args, "--id")?),
                ("export", "--format") => format = parse_value(&mut args, "--format")?,
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match sub.as_str() {
            "run" => {
                query.limit = match limit {
                    Some(n) if n > SessionConfig::MAX_ITEMS => {
                        return Err(ArgsError::InvalidValue {
                            flag: "--limit",
                            raw: n.to_string(),
                        });
                    }
                    Some(n) => n,
                    None => 5,
                };
                Command::Run(RunArgs {
                    kind: kind.ok_or(ArgsError::MissingFlag { flag: "--kind" })?,
                    query,
                    duration_secs,
                    shuffle_seed,
                    explain,
                })
            }
            "history" => Command::History { kind, limit },
            "export" => Command::Export {
                id: id.ok_or(ArgsError::MissingFlag { flag: "--id" })?,
                format,
            },
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(sub)),
        };

        Ok(Self { db_url, command })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = EngineSettings::from_env()?;

    // Open + migrate SQLite at startup; services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let clock = Clock::system();
    let engine = SessionEngine::from_storage(clock.clone(), &storage).with_settings(settings);
    let history = HistoryService::new(clock, Arc::clone(&storage.history))
        .with_default_limit(engine.settings().history_limit());

    match parsed.command {
        Command::Run(args) => {
            let mut config = match args.duration_secs {
                Some(secs) => SessionConfig::new(secs, args.explain)?,
                None if args.explain => {
                    let defaults = SessionConfig::default_for(args.kind);
                    SessionConfig::new(defaults.total_duration_secs(), true)?
                }
                None => SessionConfig::default_for(args.kind),
            };
            if let Some(seed) = args.shuffle_seed {
                config = config.with_shuffle_seed(seed);
            }

            let controller = engine
                .start(args.kind, &args.query, config, IntervalTicks::default())
                .await?;
            runner::drive(controller).await?;
            Ok(())
        }
        Command::History { kind, limit } => {
            let rows = history.list_recent(kind, limit).await?;
            if rows.is_empty() {
                println!("No sessions recorded yet.");
            }
            for row in &rows {
                println!(
                    "#{:<5} {:<10} {:<10} {:>3}%  {}/{} correct  {}s  {}",
                    row.id,
                    row.kind.as_str(),
                    row.status.as_str(),
                    row.score_percent,
                    row.items_correct,
                    row.items_total,
                    row.duration_used_secs,
                    row.completed_at.to_rfc3339(),
                );
            }
            if let Some(kind) = kind {
                let overview = history.overview(kind).await?;
                println!(
                    "{} sessions: {}, average {}, best {}",
                    overview.kind,
                    overview.sessions,
                    overview
                        .average_score
                        .map_or_else(|| "-".to_string(), |s| format!("{s}%")),
                    overview
                        .best_score
                        .map_or_else(|| "-".to_string(), |s| format!("{s}%")),
                );
            }
            Ok(())
        }
        Command::Export { id, format } => {
            let rendered = history.export(id, format).await?;
            print!("{rendered}");
            if !rendered.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_run_with_filters() {
        let args = Args::parse(argv(&[
            "run",
            "--kind",
            "mcq",
            "--limit",
            "3",
            "--difficulty",
            "Hard",
            "--category",
            "Graphs",
            "--db",
            "sqlite::memory:",
        ]))
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.kind, SessionKind::Mcq);
        assert_eq!(run.query.limit, 3);
        assert_eq!(run.query.difficulty, Some(Difficulty::Hard));
        assert_eq!(run.query.category.as_deref(), Some("Graphs"));
    }

    #[test]
    fn run_requires_kind_and_export_requires_id() {
        assert!(matches!(
            Args::parse(argv(&["run"])),
            Err(ArgsError::MissingFlag { flag: "--kind" })
        ));
        assert!(matches!(
            Args::parse(argv(&["export", "--format", "csv"])),
            Err(ArgsError::MissingFlag { flag: "--id" })
        ));
    }

    #[test]
    fn flags_are_scoped_to_their_command() {
        assert!(matches!(
            Args::parse(argv(&["history", "--duration", "10"])),
            Err(ArgsError::UnknownArg(_))
        ));
        let args = Args::parse(argv(&["export", "--id", "4", "--format", "csv"])).unwrap();
        assert_eq!(
            args.command,
            Command::Export {
                id: 4,
                format: ExportFormat::Csv
            }
        );
    }

    #[test]
    fn run_limit_is_capped() {
        assert!(matches!(
            Args::parse(argv(&["run", "--kind", "mcq", "--limit", "4294967295"])),
            Err(ArgsError::InvalidValue { flag: "--limit", .. })
        ));
        let args = Args::parse(argv(&["run", "--kind", "mcq", "--limit", "200"])).unwrap();
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.query.limit, SessionConfig::MAX_ITEMS);
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/prep.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/prep.sqlite3"));
    }
}
