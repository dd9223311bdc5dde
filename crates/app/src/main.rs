mod commands;
mod render;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use cbt_core::model::{TestConfig, TestConfigDraft};
use commands::{Command, HELP};
use services::{
    AppServices, BankSource, BankUpdate, Clock, EngineError, FileBankSource, HttpBankSource,
    Tick, TickerHandle, fetch_bank, load_test_config, save_test_config, seed_bank,
};
use storage::repository::SessionStore;

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidDuration { raw: String },
    InvalidMarks { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDuration { raw } => {
                write!(f, "invalid --duration value (expected minutes > 0): {raw}")
            }
            ArgsError::InvalidMarks { raw } => {
                write!(f, "invalid --marks value (expected marks > 0): {raw}")
            }
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

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|value| *value > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Seed,
}

impl Mode {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    bank: Option<String>,
    app_name: Option<String>,
    test_title: Option<String>,
    duration_minutes: Option<u32>,
    marks_per_question: Option<u32>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [run]  [options]   # interactive test (default)");
    eprintln!("  cargo run -p app -- seed   [options]   # write config and idle bank, then exit");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://cbt.sqlite3)");
    eprintln!("  --bank <path|url>         Question bank source");
    eprintln!("  --name <text>             App name shown on every screen");
    eprintln!("  --title <text>            Test title");
    eprintln!("  --duration <minutes>      Time limit (default: 20)");
    eprintln!("  --marks <n>               Marks per question (default: 2)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CBT_DB_URL, CBT_BANK, CBT_APP_NAME, CBT_TEST_TITLE, RUST_LOG (default: info)");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("CBT_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("cbt.sqlite3".into()), normalize_sqlite_url);
        let mut bank = std::env::var("CBT_BANK").ok().filter(|v| !v.trim().is_empty());
        let mut app_name = std::env::var("CBT_APP_NAME").ok();
        let mut test_title = std::env::var("CBT_TEST_TITLE").ok();
        let mut duration_minutes = None;
        let mut marks_per_question = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bank" => bank = Some(require_value(args, "--bank")?),
                "--name" => app_name = Some(require_value(args, "--name")?),
                "--title" => test_title = Some(require_value(args, "--title")?),
                "--duration" => {
                    let value = require_value(args, "--duration")?;
                    duration_minutes = Some(
                        parse_positive(&value)
                            .ok_or_else(|| ArgsError::InvalidDuration { raw: value.clone() })?,
                    );
                }
                "--marks" => {
                    let value = require_value(args, "--marks")?;
                    marks_per_question = Some(
                        parse_positive(&value)
                            .ok_or_else(|| ArgsError::InvalidMarks { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            bank,
            app_name,
            test_title,
            duration_minutes,
            marks_per_question,
        })
    }

    fn bank_source(&self) -> Option<Arc<dyn BankSource>> {
        let raw = self.bank.as_deref()?;
        let remote = raw.starts_with("http://") || raw.starts_with("https://");
        let source: Arc<dyn BankSource> = if remote {
            Arc::new(HttpBankSource::new(raw))
        } else {
            Arc::new(FileBankSource::new(raw))
        };
        Some(source)
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

impl Args {
    fn overrides_config(&self) -> bool {
        self.app_name.is_some()
            || self.test_title.is_some()
            || self.duration_minutes.is_some()
            || self.marks_per_question.is_some()
    }
}

/// Apply config flags on top of the stored configuration.
async fn apply_config_overrides(
    store: &SessionStore,
    args: &Args,
) -> Result<TestConfig, Box<dyn std::error::Error>> {
    let current = load_test_config(store).await?;
    let updated = TestConfigDraft {
        app_name: args
            .app_name
            .clone()
            .or_else(|| Some(current.app_name().to_string())),
        test_title: args
            .test_title
            .clone()
            .or_else(|| Some(current.test_title().to_string())),
        duration_minutes: args.duration_minutes.or(Some(current.duration_minutes())),
        marks_per_question: args.marks_per_question.or(Some(current.marks_per_question())),
    }
    .normalize();
    save_test_config(store, &updated).await?;
    Ok(updated)
}

/// Write configuration and, unless an attempt is in progress, the idle bank.
async fn seed(store: &SessionStore, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply_config_overrides(store, args).await?;

    let mut seeded_questions = 0;
    if let Some(source) = args.bank_source() {
        let report = fetch_bank(source.as_ref()).await?;
        let count = report.questions.len();
        if seed_bank(store, report.questions).await? {
            seeded_questions = count;
        } else {
            tracing::warn!("a test is in progress; left its question bank untouched");
        }
    }

    println!(
        "Seeded \"{}\" ({} min, {} marks/question, {} questions) into {}",
        config.test_title(),
        config.duration_minutes(),
        config.marks_per_question(),
        seeded_questions,
        args.db_url
    );
    Ok(())
}

/// Keeps a ticker alive exactly while the engine is running.
#[derive(Default)]
struct TickerSlot {
    handle: Option<TickerHandle>,
    updates: Option<watch::Receiver<Option<Tick>>>,
}

impl TickerSlot {
    async fn sync(&mut self, services: &AppServices) {
        let running = services.engine().lock().await.state().is_running();
        let alive = self.handle.as_ref().is_some_and(|h| !h.is_finished());
        if running && !alive {
            let handle = services.spawn_ticker(TICK_PERIOD);
            self.updates = Some(handle.subscribe());
            self.handle = Some(handle);
        } else if !running {
            self.handle = None;
            self.updates = None;
        }
    }

    /// Next tick outcome. Pending forever when no ticker is active.
    async fn next(&mut self) -> Option<Tick> {
        let Some(updates) = self.updates.as_mut() else {
            return std::future::pending().await;
        };
        if updates.changed().await.is_err() {
            self.updates = None;
            return None;
        }
        *updates.borrow_and_update()
    }
}

async fn show(services: &AppServices) {
    let engine = services.engine();
    let engine = engine.lock().await;
    println!(
        "{}",
        render::render(&engine.view(), engine.config(), services.guest_id())
    );
}

/// Run one intent. Returns false when the driver should stop.
async fn dispatch(
    services: &AppServices,
    command: Command,
) -> Result<bool, Box<dyn std::error::Error>> {
    let engine = services.engine();
    match command {
        Command::Start => engine.lock().await.start().await?,
        Command::Answer(option) => engine.lock().await.answer_current(option).await?,
        Command::Next => {
            engine.lock().await.navigate(1).await?;
        }
        Command::Prev => {
            engine.lock().await.navigate(-1).await?;
        }
        Command::GoTo(index) => {
            engine.lock().await.go_to(index).await?;
        }
        Command::Submit => engine.lock().await.submit().await?,
        Command::Exit => engine.lock().await.exit().await?,
        Command::View => {}
        Command::Reload => services.reload().await?,
        Command::Refresh => match services.refresh_bank().await? {
            BankUpdate::Merged { appended } => println!("Bank merged ({appended} new)."),
            BankUpdate::Replaced { questions } => println!("Bank replaced ({questions} questions)."),
            BankUpdate::Kept => println!("Bank unchanged."),
        },
        Command::Help => {
            println!("{HELP}");
            return Ok(true);
        }
        Command::Quit => return Ok(false),
    }
    show(services).await;
    Ok(true)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1).peekable();

    let mode = match argv.peek().map(String::as_str) {
        None => Mode::Run,
        Some(first) if first.starts_with('-') => Mode::Run,
        Some(first) => Mode::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.to_string())
        })?,
    };
    if argv.peek().is_some_and(|first| !first.starts_with('-')) {
        argv.next();
    }

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let store = SessionStore::sqlite(&args.db_url).await?;
    if mode == Mode::Seed {
        return seed(&store, &args).await;
    }
    if args.overrides_config() {
        apply_config_overrides(&store, &args).await?;
    }

    let services =
        AppServices::from_store(store, Clock::default_clock(), args.bank_source()).await?;
    tracing::info!(db = %args.db_url, guest = %services.guest_id(), "ready");

    let mut ticker = TickerSlot::default();
    ticker.sync(&services).await;
    show(&services).await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.parse::<Command>() {
                    Ok(command) => match dispatch(&services, command).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(err) => match err.downcast_ref::<EngineError>() {
                            Some(EngineError::NotReady | EngineError::NotRunning) => println!("{err}"),
                            _ => return Err(err),
                        },
                    },
                    Err(err) => println!("{err}"),
                }
                ticker.sync(&services).await;
            }
            tick = ticker.next() => {
                match tick {
                    Some(Tick::Expired) => {
                        println!("Time is up! Your answers were submitted.");
                        show(&services).await;
                    }
                    Some(Tick::Remaining(60 | 10)) => show(&services).await,
                    Some(Tick::Remaining(_) | Tick::Inactive) | None => {}
                }
            }
        }
    }

    drop(ticker);
    tracing::info!("bye");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
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

    fn parse(raw: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut raw.iter().map(|arg| (*arg).to_string()))
    }

    #[test]
    fn subcommands_are_recognized() {
        assert_eq!(Mode::from_arg("seed"), Some(Mode::Seed));
        assert_eq!(Mode::from_arg("run"), Some(Mode::Run));
        assert_eq!(Mode::from_arg("serve"), None);
    }

    #[test]
    fn seed_flags_fill_config_overrides() {
        let args = parse(&[
            "--db",
            "sqlite::memory:",
            "--name",
            "Anatomy CBT",
            "--title",
            "Embryology",
            "--marks",
            "4",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.app_name.as_deref(), Some("Anatomy CBT"));
        assert_eq!(args.test_title.as_deref(), Some("Embryology"));
        assert_eq!(args.marks_per_question, Some(4));
        assert!(args.overrides_config());
    }

    #[test]
    fn rejects_zero_duration_and_dangling_flags() {
        assert!(matches!(
            parse(&["--duration", "0"]),
            Err(ArgsError::InvalidDuration { .. })
        ));
        assert!(matches!(
            parse(&["--title"]),
            Err(ArgsError::MissingValue { flag: "--title" })
        ));
    }
}
