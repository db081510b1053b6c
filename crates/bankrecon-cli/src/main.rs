//! CLI for bank-statement reconciliation.
//!
//! The Excel/PDF readers live outside this binary; their parsed value
//! objects arrive here as JSON documents (one array of statement lines,
//! one array of daily closes, one payroll object, one object per tax
//! filing) and feed the engine directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use bankrecon_config::Settings;
use bankrecon_core::{
    Action, BankMovement, DailyClose, FederalTax, JobSummary, LineResult, Payroll, ProcessKind,
    SocialSecurityTax, StateTax,
};
use bankrecon_db::Database;
use bankrecon_engine::{Classifier, Job, RunOptions, SideChannels};

#[derive(Parser)]
#[command(name = "bankrecon")]
#[command(about = "Bank-statement reconciliation against the ERP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify and process a statement, writing to the database unless
    /// running dry
    Run {
        /// Parsed statement lines (JSON array of movements)
        #[arg(long)]
        statement: PathBuf,

        /// Parsed treasury daily closes (JSON array)
        #[arg(long)]
        treasury: Option<PathBuf>,

        /// Parsed payroll workbook (JSON object)
        #[arg(long)]
        payroll: Option<PathBuf>,

        /// Parsed federal tax filing (JSON object)
        #[arg(long)]
        federal: Option<PathBuf>,

        /// Parsed state tax slip (JSON object)
        #[arg(long)]
        state_tax: Option<PathBuf>,

        /// Parsed social-security settlement (JSON object)
        #[arg(long)]
        social_security: Option<PathBuf>,

        /// Process a single date (YYYY-MM-DD), or the window start
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Window end (inclusive, at most 7 days from --date)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Execute against the database instead of reporting plans
        #[arg(long)]
        commit: bool,

        /// Database path (defaults to BANKRECON_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Create the schema in a new or existing database
    InitDb {
        /// Database path (defaults to BANKRECON_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Probe database connectivity
    CheckDb {
        /// Database path (defaults to BANKRECON_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Classify a statement and print per-kind counts
    Classify {
        /// Parsed statement lines (JSON array of movements)
        #[arg(long)]
        statement: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            statement,
            treasury,
            payroll,
            federal,
            state_tax,
            social_security,
            date,
            to,
            commit,
            db,
        } => run(
            &statement,
            treasury.as_deref(),
            payroll.as_deref(),
            federal.as_deref(),
            state_tax.as_deref(),
            social_security.as_deref(),
            date,
            to,
            commit,
            db,
        ),
        Commands::InitDb { db } => init_db(db),
        Commands::CheckDb { db } => check_db(db),
        Commands::Classify { statement } => classify(&statement),
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {what} from {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {what} from {}", path.display()))
}

fn resolve_db_path(settings: &Settings, db: Option<PathBuf>) -> Result<PathBuf> {
    db.or_else(|| settings.db_path.clone())
        .context("no database path: pass --db or set BANKRECON_DB")
}

#[allow(clippy::too_many_arguments)]
fn run(
    statement: &Path,
    treasury: Option<&Path>,
    payroll: Option<&Path>,
    federal: Option<&Path>,
    state_tax: Option<&Path>,
    social_security: Option<&Path>,
    date: Option<NaiveDate>,
    to: Option<NaiveDate>,
    commit: bool,
    db: Option<PathBuf>,
) -> Result<()> {
    if to.is_some() && date.is_none() {
        bail!("--to requires --date");
    }

    let settings = Settings::from_env()?;
    let movements: Vec<BankMovement> = load_json(statement, "statement")?;

    let mut side = SideChannels::default();
    if let Some(path) = treasury {
        let closes: Vec<DailyClose> = load_json(path, "treasury closes")?;
        side.closes = closes
            .into_iter()
            .map(|c| (c.close_date, c))
            .collect::<BTreeMap<_, _>>();
    }
    if let Some(path) = payroll {
        side.payroll = Some(load_json::<Payroll>(path, "payroll")?);
    }
    if let Some(path) = federal {
        side.federal = Some(load_json::<FederalTax>(path, "federal filing")?);
    }
    if let Some(path) = state_tax {
        side.state = Some(load_json::<StateTax>(path, "state filing")?);
    }
    if let Some(path) = social_security {
        side.social_security = Some(load_json::<SocialSecurityTax>(path, "social security")?);
    }

    // A dry run without a database still works: the processors warn and
    // tax breakdowns come back zero. A committed run must connect
    // before any plan executes.
    let database = match (commit, resolve_db_path(&settings, db)) {
        (true, Ok(path)) => Some(Database::open(&path)?),
        (true, Err(e)) => return Err(e),
        (false, Ok(path)) => Database::open(&path).ok(),
        (false, Err(_)) => None,
    };

    let options = RunOptions {
        dry_run: !commit,
        only_date: date,
        end_date: to,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").expect("spinner template"));
    spinner.set_message(if commit { "executing plans" } else { "building plans" });
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let mut job = Job::new(settings, database);
    let results = job.process_statement(movements, &mut side, &options)?;
    spinner.finish_and_clear();

    print_results(&results);
    print_summary(&JobSummary::from_results(&results), !commit);
    Ok(())
}

fn print_results(results: &[LineResult]) {
    println!();
    println!(
        "{:<10}  {:<13}  {:<24}  {:>14}  {:<18}  NOTE",
        "DATE", "ACTION", "KIND", "AMOUNT", "FOLIOS"
    );
    for result in results {
        let sign = if result.movement.is_credit() { "+" } else { "-" };
        let folios = result
            .folios
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<10}  {:<13}  {:<24}  {:>13}{}  {:<18}  {}",
            result.movement.date,
            format!("{:?}", result.action).to_uppercase(),
            format!("{:?}", result.kind),
            format!("{:.2}", result.movement.amount()),
            sign,
            folios,
            result.note
        );
    }
}

fn print_summary(summary: &JobSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("DRY-RUN SUMMARY ({} lines):", summary.total());
    } else {
        println!("SUMMARY ({} lines):", summary.total());
    }
    for action in [
        Action::Insert,
        Action::Reconcile,
        Action::Skip,
        Action::NotProcessed,
        Action::NeedsReview,
        Action::Error,
        Action::Unknown,
    ] {
        let count = summary.count(action);
        if count > 0 {
            println!("  {:<14} {count}", format!("{action:?}").to_uppercase());
        }
    }
}

fn init_db(db: Option<PathBuf>) -> Result<()> {
    let settings = Settings::from_env()?;
    let path = resolve_db_path(&settings, db)?;
    let database = Database::open(&path)?;
    database.init_schema()?;
    println!("Schema applied at {}", path.display());
    Ok(())
}

fn check_db(db: Option<PathBuf>) -> Result<()> {
    let settings = Settings::from_env()?;
    let path = resolve_db_path(&settings, db)?;
    let database = Database::open(&path)?;
    database.check()?;
    println!("Connection OK: {}", path.display());
    Ok(())
}

fn classify(statement: &Path) -> Result<()> {
    let settings = Settings::from_env()?;
    let registry = settings.registry();
    let classifier = Classifier::new(&registry);

    let mut movements: Vec<BankMovement> = load_json(statement, "statement")?;
    let counts = classifier.classify_all(&mut movements);

    println!();
    println!("{:<26}  COUNT", "KIND");
    for (kind, count) in &counts {
        println!("{:<26}  {count}", format!("{kind:?}"));
    }
    let unknown = counts.get(&ProcessKind::Unknown).copied().unwrap_or(0);
    println!();
    println!(
        "{} lines, {} unclassified",
        movements.len(),
        unknown
    );
    Ok(())
}
