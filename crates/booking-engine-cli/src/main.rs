//! `bookcheck` CLI: validate booking scenarios from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Validate every event in a scenario (stdin → stdout)
//! cat scenario.json | bookcheck validate --now 2024-01-01T00:00:00Z
//!
//! # Validate one event, with checker settings from TOML
//! bookcheck validate -i scenario.json --event B --config checker.toml
//!
//! # Human-readable messages instead of JSON
//! bookcheck validate -i scenario.json --text
//!
//! # List the occurrences of an event
//! bookcheck expand -i scenario.json --event standup
//!
//! # Re-validate the events overlapping an edited one
//! bookcheck neighbors -i scenario.json --event A
//! ```
//!
//! `validate` and `neighbors` exit with status 2 when any violation is found.
//! Set `RUST_LOG=booking_engine=debug` to trace the checks on stderr.

use std::io::{self, Read};
use std::process;

use anyhow::{Context, Result};
use booking_engine::{
    CheckerConfig, ConflictChecker, ConflictReport, FallbackResolver, Scenario, TimezoneResolver,
    ValidationContext,
};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Exit status when validation found violations.
const EXIT_VIOLATIONS: i32 = 2;

#[derive(Parser)]
#[command(
    name = "bookcheck",
    version,
    about = "Resource booking conflict checker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScenarioArgs {
    /// Scenario JSON file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
    /// Checker configuration (TOML)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate scenario events against each other and their resources
    Validate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Only validate this event
        #[arg(short, long)]
        event: Option<String>,
        /// Current instant (RFC 3339); events stopping earlier are skipped
        #[arg(long)]
        now: Option<String>,
        /// Print human-readable messages instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Print the occurrences of one event
    Expand {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Event to expand
        #[arg(short, long)]
        event: String,
    },
    /// Re-validate every event overlapping the given one
    Neighbors {
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// The changed event
        #[arg(short, long)]
        event: String,
        /// Current instant (RFC 3339); events stopping earlier are skipped
        #[arg(long)]
        now: Option<String>,
    },
}

/// A scenario with its configuration applied.
struct Loaded {
    scenario: Scenario,
    config: CheckerConfig,
}

impl Loaded {
    fn context(&self, now: DateTime<Utc>) -> Result<ValidationContext> {
        let ctx = self.config.context(now)?;
        Ok(match self.scenario.context_timezone()? {
            Some(tz) => ctx.with_timezone(tz),
            None => ctx,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            scenario,
            event,
            now,
            text,
        } => {
            let loaded = load(&scenario)?;
            let ctx = loaded.context(parse_now(now.as_deref())?)?;
            let events = match event.as_deref() {
                Some(id) => vec![loaded.scenario.event(id)?],
                None => loaded.scenario.events()?,
            };

            let options = loaded.config.options();
            let store = loaded.scenario.store_with(options.localization(&ctx))?;
            let calendars = loaded.scenario.calendars();
            let checker = ConflictChecker::new(&store, &calendars).with_options(options);
            let reports = checker
                .validate_all(&events, &ctx)
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .context("Validation failed")?;

            let rendered = if text {
                render_text(&reports, &ctx)
            } else {
                serde_json::to_string_pretty(&reports)?
            };
            write_output(scenario.output.as_deref(), &rendered)?;
            exit_on_violations(&reports);
        }
        Commands::Expand { scenario, event } => {
            let loaded = load(&scenario)?;
            let ctx = loaded.context(Utc::now())?;
            let target = loaded.scenario.event(&event)?;

            let event_tz = FallbackResolver.resolve(&target, ctx.timezone)?;
            let occurrences = booking_engine::expand(
                &target,
                event_tz,
                ctx.reference_timezone,
                loaded.config.options().dst_policy,
            )
            .and_then(|o| o.to_vec())
            .with_context(|| format!("Failed to expand event '{}'", event))?;

            let document = serde_json::json!({
                "event": target.id,
                "timezone": ctx.reference_timezone.name(),
                "occurrences": occurrences,
            });
            write_output(
                scenario.output.as_deref(),
                &serde_json::to_string_pretty(&document)?,
            )?;
        }
        Commands::Neighbors {
            scenario,
            event,
            now,
        } => {
            let loaded = load(&scenario)?;
            let ctx = loaded.context(parse_now(now.as_deref())?)?;
            let changed = loaded.scenario.event(&event)?;

            let options = loaded.config.options();
            let store = loaded.scenario.store_with(options.localization(&ctx))?;
            let calendars = loaded.scenario.calendars();
            let checker = ConflictChecker::new(&store, &calendars).with_options(options);
            let reports = checker
                .revalidate_neighbors(&changed, &ctx)
                .with_context(|| format!("Failed to re-validate neighbors of '{}'", event))?;

            write_output(
                scenario.output.as_deref(),
                &serde_json::to_string_pretty(&reports)?,
            )?;
            exit_on_violations(&reports);
        }
    }

    Ok(())
}

fn load(args: &ScenarioArgs) -> Result<Loaded> {
    let config = match args.config.as_deref() {
        Some(path) => CheckerConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => CheckerConfig::default(),
    };

    let json = read_input(args.input.as_deref())?;
    let mut scenario = Scenario::from_json(&json).context("Failed to parse scenario")?;
    // The configured default applies to scenarios that name no timezone.
    if scenario.timezone.is_none() {
        scenario.timezone = config.timezone.default.clone();
    }

    Ok(Loaded { scenario, config })
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --now timestamp: {}", raw))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn render_text(reports: &[ConflictReport], ctx: &ValidationContext) -> String {
    reports
        .iter()
        .map(|r| r.render(ctx.reference_timezone))
        .collect::<Vec<_>>()
        .join("\n")
}

fn exit_on_violations(reports: &[ConflictReport]) {
    let rejected = reports.iter().filter(|r| !r.is_clear()).count();
    if rejected > 0 {
        tracing::info!(rejected, "violations found");
        process::exit(EXIT_VIOLATIONS);
    }
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
