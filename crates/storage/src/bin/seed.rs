use std::fmt;

use prep_core::model::{
    Difficulty, Grading, ItemDraft, ItemId, SessionKind, TestCase,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    kinds: Vec<SessionKind>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidKind { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidKind { raw } => write!(f, "invalid --kind value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PREP_DB_URL").unwrap_or_else(|_| "sqlite://prep.sqlite3".into());
        let mut kinds: Vec<SessionKind> = Vec::new();

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--kind" => {
                    let value = require_value(&mut args, "--kind")?;
                    let kind = value
                        .parse::<SessionKind>()
                        .map_err(|_| ArgsError::InvalidKind { raw: value.clone() })?;
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if kinds.is_empty() {
            kinds = SessionKind::ALL.to_vec();
        }

        Ok(Self { db_url, kinds })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://prep.sqlite3)");
    eprintln!("  --kind <mcq|coding|interview>");
    eprintln!("                            Seed only this kind (repeatable; default: all)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_DB_URL");
}

fn choice(
    id: u64,
    prompt: &str,
    category: &str,
    difficulty: Difficulty,
    options: [&str; 4],
    correct: usize,
    explanation: &str,
) -> ItemDraft {
    ItemDraft {
        id: ItemId::new(id),
        prompt: prompt.into(),
        category: category.into(),
        difficulty,
        company: None,
        explanation: Some(explanation.into()),
        grading: Grading::Choice {
            options: options.iter().map(|o| (*o).to_string()).collect(),
            correct,
        },
        estimated_secs: 60,
    }
}

fn catalog(kind: SessionKind) -> Vec<ItemDraft> {
    match kind {
        SessionKind::Mcq => vec![
            choice(
                101,
                "What is the average lookup cost of a hash map?",
                "Data Structures",
                Difficulty::Easy,
                ["O(1)", "O(log n)", "O(n)", "O(n log n)"],
                0,
                "Hashing distributes keys into buckets, so lookups are constant on average.",
            ),
            choice(
                102,
                "Which traversal visits a binary search tree in sorted order?",
                "Data Structures",
                Difficulty::Easy,
                ["Pre-order", "In-order", "Post-order", "Level-order"],
                1,
                "In-order visits left subtree, node, then right subtree.",
            ),
            choice(
                103,
                "Which algorithm finds shortest paths with non-negative weights?",
                "Algorithms",
                Difficulty::Medium,
                ["Kruskal", "Prim", "Dijkstra", "Floyd cycle detection"],
                2,
                "Dijkstra greedily settles the closest unsettled vertex.",
            ),
            choice(
                104,
                "What does the C in CAP stand for?",
                "System Design",
                Difficulty::Medium,
                ["Concurrency", "Consistency", "Caching", "Capacity"],
                1,
                "Consistency, Availability, Partition tolerance.",
            ),
            choice(
                105,
                "Which isolation level prevents phantom reads?",
                "Databases",
                Difficulty::Hard,
                ["Read uncommitted", "Read committed", "Repeatable read", "Serializable"],
                3,
                "Only serializable isolation rules out phantoms in the SQL standard.",
            ),
        ],
        SessionKind::Coding => vec![
            ItemDraft {
                id: ItemId::new(201),
                prompt: "Return the indices of the two numbers that add up to the target.".into(),
                category: "Arrays".into(),
                difficulty: Difficulty::Easy,
                company: Some("Acme".into()),
                explanation: None,
                grading: Grading::TestCases {
                    cases: vec![
                        TestCase::new("[2,7,11,15], 9", "[0,1]"),
                        TestCase::new("[3,2,4], 6", "[1,2]"),
                    ],
                },
                estimated_secs: 900,
            },
            ItemDraft {
                id: ItemId::new(202),
                prompt: "Decide whether a string of brackets is balanced.".into(),
                category: "Stacks".into(),
                difficulty: Difficulty::Medium,
                company: None,
                explanation: None,
                grading: Grading::TestCases {
                    cases: vec![
                        TestCase::new("\"()[]{}\"", "true"),
                        TestCase::new("\"(]\"", "false"),
                    ],
                },
                estimated_secs: 1200,
            },
        ],
        SessionKind::Interview => vec![
            ItemDraft {
                id: ItemId::new(301),
                prompt: "Tell me about a time you disagreed with a teammate.".into(),
                category: "Behavioral".into(),
                difficulty: Difficulty::Easy,
                company: None,
                explanation: None,
                grading: Grading::RatingOnly,
                estimated_secs: 300,
            },
            ItemDraft {
                id: ItemId::new(302),
                prompt: "Design a URL shortener.".into(),
                category: "System Design".into(),
                difficulty: Difficulty::Hard,
                company: None,
                explanation: None,
                grading: Grading::RatingOnly,
                estimated_secs: 900,
            },
        ],
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    for kind in &args.kinds {
        let drafts = catalog(*kind);
        let seeded = drafts.len();
        for draft in drafts {
            let item = draft.validate()?;
            storage.items.upsert_item(&item).await?;
        }
        let total = storage.items.count_items(*kind).await?;
        println!("Seeded {seeded} {kind} items ({total} stored)");
    }

    println!("Item bank ready at {}", args.db_url);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
