//! `visa` CLI: visa-day usage and stay conflicts from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Status of every country in a stay history (stdin -> stdout)
//! cat stays.json | visa status
//!
//! # One country, as of a fixed date, as JSON
//! visa status -i stays.json --country JP --reference-date 2024-06-20 --format json
//!
//! # Use a custom rule table and a nationality override
//! visa status -i stays.json --rules rules.json --nationality US
//!
//! # Pick a visa type for a country
//! visa status -i stays.json --visa-type KR=long-term-resident
//!
//! # Overlapping stays, then a resolved copy written to a file
//! visa conflicts -i stays.json
//! visa resolve -i stays.json -o resolved.json
//!
//! # Dashboard totals
//! visa summary -i stays.json
//!
//! # Inspect the rule table, or count days between two dates
//! visa rules --country KR
//! visa days 2024-01-01 2024-01-31
//! ```

mod logging;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::io::{self, Read};
use visa_engine::{
    calculate_visa_status, dates, detect_date_conflicts, evaluate, resolve_conflicts,
    stays_from_json, summarize, Conflict, ConflictSeverity, DashboardSummary, EvaluationContext,
    ResetType, RuleTable, Stay, VisaRule, VisaStatus,
};

#[derive(Parser)]
#[command(
    name = "visa",
    version,
    about = "Visa-day accounting for recorded stays"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Stays JSON file (reads from stdin if omitted)
    #[arg(short, long, global = true)]
    input: Option<String>,

    /// Rule table JSON file (uses the built-in table if omitted)
    #[arg(long, global = true, env = "VISA_RULES_FILE")]
    rules: Option<String>,

    /// Traveler nationality, for nationality-specific rules
    #[arg(long, global = true, env = "VISA_NATIONALITY")]
    nationality: Option<String>,

    /// IANA timezone used to resolve "today"
    #[arg(long, global = true, env = "VISA_TIMEZONE", default_value = "UTC")]
    timezone: String,

    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long, global = true)]
    reference_date: Option<String>,

    /// Visa type for a country, e.g. KR=long-term-resident (repeatable)
    #[arg(long = "visa-type", global = true, value_parser = parse_visa_type)]
    visa_types: Vec<(String, String)>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show days used and remaining per country
    Status {
        /// Only this country
        #[arg(long)]
        country: Option<String>,
    },
    /// List overlapping stays
    Conflicts,
    /// Trim or drop overlapping stays, most recent entry wins
    Resolve {
        /// Output file for the resolved stays (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Dashboard totals across all countries
    Summary,
    /// Show the rule table
    Rules {
        /// Only this country
        #[arg(long)]
        country: Option<String>,
    },
    /// Count calendar days between two dates, inclusive
    Days { start: String, end: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.log_json)?;

    match &cli.command {
        Commands::Status { country } => {
            let (stays, rules, ctx) = load(&cli)?;
            match country {
                Some(country) => {
                    let status = calculate_visa_status(country, &stays, &rules, &ctx);
                    match cli.format {
                        Format::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                        Format::Text => println!("{}", status_line(&status)),
                    }
                }
                None => {
                    let report = evaluate(&stays, &rules, &ctx);
                    report_skipped(report.diagnostics.skipped_count());
                    match cli.format {
                        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                        Format::Text if report.statuses.is_empty() => println!("No stays."),
                        Format::Text => {
                            for status in report.statuses.values() {
                                println!("{}", status_line(status));
                            }
                        }
                    }
                }
            }
        }
        Commands::Conflicts => {
            let (stays, _, ctx) = load(&cli)?;
            let conflicts = detect_date_conflicts(&stays, &ctx);
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&conflicts)?),
                Format::Text if conflicts.is_empty() => println!("No conflicts."),
                Format::Text => {
                    for conflict in &conflicts {
                        println!("{}", conflict_line(conflict));
                    }
                }
            }
        }
        Commands::Resolve { output } => {
            let (stays, _, ctx) = load(&cli)?;
            let resolution = resolve_conflicts(&stays, &ctx);
            for id in &resolution.trimmed {
                eprintln!("trimmed: {}", id);
            }
            for id in &resolution.dropped {
                eprintln!("dropped: {}", id);
            }
            let json = serde_json::to_string_pretty(&resolution.stays)?;
            write_output(output.as_deref(), &json)?;
        }
        Commands::Summary => {
            let (stays, rules, ctx) = load(&cli)?;
            let report = evaluate(&stays, &rules, &ctx);
            let conflicts = detect_date_conflicts(&stays, &ctx);
            let summary = summarize(&report, &conflicts);
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                Format::Text => print_summary(&summary),
            }
        }
        Commands::Rules { country } => {
            let table = load_rules(cli.rules.as_deref())?;
            let rules: Vec<&VisaRule> = match country {
                Some(c) => table.rules_for_country(c).iter().collect(),
                None => table.iter().collect(),
            };
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&rules)?),
                Format::Text if rules.is_empty() => println!("No rules."),
                Format::Text => {
                    for rule in rules {
                        println!("{}", rule_line(rule));
                    }
                    if country.is_none() {
                        let countries: Vec<&str> = table.countries().collect();
                        println!(
                            "{} rules for {} countries: {}",
                            table.len(),
                            countries.len(),
                            countries.join(", ")
                        );
                    }
                }
            }
        }
        Commands::Days { start, end } => {
            let start = dates::parse_date(start).context("Invalid start date")?;
            let end = dates::parse_date(end).context("Invalid end date")?;
            anyhow::ensure!(start <= end, "End date {} is before start date {}", end, start);
            println!("{}", dates::days_between_inclusive(start, end));
        }
    }

    Ok(())
}

/// Read stays, rules, and the evaluation context from the global options.
fn load(cli: &Cli) -> Result<(Vec<Stay>, RuleTable, EvaluationContext)> {
    let json = read_input(cli.input.as_deref())?;
    let stays = stays_from_json(&json).context("Failed to parse stays")?;
    let rules = load_rules(cli.rules.as_deref())?;
    let ctx = build_context(cli)?;
    tracing::debug!(
        stays = stays.len(),
        rules = rules.len(),
        reference_date = %ctx.reference_date,
        "loaded input"
    );
    Ok((stays, rules, ctx))
}

fn load_rules(path: Option<&str>) -> Result<RuleTable> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rules file: {}", path))?;
            RuleTable::from_json(&json).with_context(|| format!("Failed to parse rules file: {}", path))
        }
        None => Ok(RuleTable::builtin()),
    }
}

fn build_context(cli: &Cli) -> Result<EvaluationContext> {
    let reference = match cli.reference_date.as_deref() {
        Some(date) => dates::parse_date(date).context("Invalid --reference-date")?,
        None => dates::today_in(&cli.timezone).context("Invalid --timezone")?,
    };
    let mut ctx = EvaluationContext::new(reference);
    if let Some(nationality) = &cli.nationality {
        ctx = ctx.with_nationality(nationality.as_str());
    }
    for (country, visa_type) in &cli.visa_types {
        ctx = ctx.with_visa_type(country, visa_type.as_str());
    }
    Ok(ctx)
}

/// Parse `CC=TYPE` for `--visa-type`.
fn parse_visa_type(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((country, visa_type)) if !country.trim().is_empty() && !visa_type.trim().is_empty() => {
            Ok((country.trim().to_string(), visa_type.trim().to_string()))
        }
        _ => Err(format!("expected COUNTRY=VISA_TYPE, got '{}'", raw)),
    }
}

fn report_skipped(count: usize) {
    if count > 0 {
        tracing::warn!(skipped = count, "some stays were malformed and skipped");
        eprintln!("Skipped {} malformed stay(s).", count);
    }
}

fn status_line(status: &VisaStatus) -> String {
    let Some(rule) = &status.rule else {
        return format!(
            "{:<4} used {:>4}  no rule known",
            status.country_code, status.days_used
        );
    };
    let mut line = format!(
        "{:<4} used {:>4}/{:<4} remaining {:>5}  [{:?}]",
        status.country_code,
        status.days_used,
        rule.max_days,
        status.days_remaining.unwrap_or_default(),
        status.severity,
    );
    if let (Some(start), Some(end)) = (status.window_start, status.window_end) {
        line.push_str(&format!("  window {}..{}", start, end));
    }
    if let Some(reset) = status.next_reset {
        line.push_str(&format!("  resets {}", reset));
    }
    line
}

fn conflict_line(conflict: &Conflict) -> String {
    let severity = match conflict.severity {
        ConflictSeverity::Critical => "critical",
        ConflictSeverity::Warning => "warning",
    };
    format!(
        "{:<8} {} {} <-> {} {}  {}..{} ({} day{})",
        severity,
        conflict.country_a,
        conflict.stay_a,
        conflict.country_b,
        conflict.stay_b,
        conflict.overlap.start,
        conflict.overlap.end,
        conflict.overlap_days,
        if conflict.overlap_days == 1 { "" } else { "s" },
    )
}

fn rule_line(rule: &VisaRule) -> String {
    let policy = match rule.reset_type {
        ResetType::Exit => "per stay".to_string(),
        ResetType::Rolling => format!("per {} days rolling", rule.period_days),
        ResetType::Calendar => format!("per {:?}", rule.calendar_period).to_lowercase(),
    };
    let mut line = format!("{:<4} {:>4} days {}", rule.country_code, rule.max_days, policy);
    if let Some(ext) = rule.extension_days {
        line.push_str(&format!(" (+{} by extension)", ext));
    }
    if let Some(visa_type) = &rule.visa_type {
        line.push_str(&format!("  visa type: {}", visa_type));
    }
    if let Some(nationality) = &rule.nationality {
        line.push_str(&format!("  nationality: {}", nationality));
    }
    line
}

fn print_summary(summary: &DashboardSummary) {
    println!("As of {}", summary.reference_date);
    println!("Overstayed:     {}", summary.overstayed);
    println!("At risk:        {}", summary.at_risk);
    println!("Unknown rules:  {}", summary.unknown_rules);
    println!(
        "Conflicts:      {} ({} critical)",
        summary.conflicts, summary.critical_conflicts
    );
    println!("Skipped stays:  {}", summary.skipped_stays);
    for country in &summary.countries {
        let remaining = country
            .days_remaining
            .map(|r| r.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:<4} {:>4} used  {:>5} left  [{:?}]",
            country.country_code, country.days_used, remaining, country.severity
        );
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
