use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

use fixup_core::{comparison_windows, DateRange, FixupConfig, OutputFormat};
use fixup_engine::git::GitBackend;
use fixup_engine::{ComparisonReport, EngineOptions, FixupCounter, FixupReport, VisitedSet};

mod render;

const CONFIG_FILE: &str = ".fixups.toml";

#[derive(Parser)]
#[command(
    name = "fixups",
    version,
    about = "Measure fix-up chains in git history",
    long_about = "Measure fix-up chains in git history.\n\n\
                   A fix-up is a commit that, within a few days, deletes lines an earlier\n\
                   commit introduced. Chains of fix-ups are followed recursively, and every\n\
                   commit in a date range gets the length of its longest chain.\n\n\
                   Examples:\n  \
                     fixups count --since 2010-08-25 --until 2013-08-25\n  \
                     fixups compare --adoption 2010-08-25 --format markdown\n  \
                     fixups init                   Write a default .fixups.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .fixups.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Repository path (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summary and histogram (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown tables"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Count fix-up chains for every commit in a date range
    #[command(long_about = "Count fix-up chains for every commit in a date range.\n\n\
        Merge commits are skipped. Dates are inclusive and read as UTC days.\n\
        Without --since/--until the [range] section of the config file is used.\n\n\
        Examples:\n  fixups count --since 2010-08-25 --until 2013-08-25\n  \
        fixups count --window-days 7 --format json")]
    Count {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,
        /// Fix-up window in days (default: 5)
        #[arg(long)]
        window_days: Option<u32>,
    },
    /// Compare fix-up chains before and after a process change
    #[command(long_about = "Compare fix-up chains before and after a process change.\n\n\
        Analyzes two adjacent windows of equal length split at the adoption date,\n\
        each with its own set of consumed fix-ups.\n\n\
        Examples:\n  fixups compare --adoption 2010-08-25\n  \
        fixups compare --adoption 2010-08-25 --span-days 365 --format markdown")]
    Compare {
        /// First day of the new process (YYYY-MM-DD)
        #[arg(long)]
        adoption: Option<NaiveDate>,
        /// Length of each window in days (default: 1096)
        #[arg(long)]
        span_days: Option<u32>,
        /// Fix-up window in days (default: 5)
        #[arg(long)]
        window_days: Option<u32>,
    },
    /// Create a default .fixups.toml configuration file
    #[command(long_about = "Create a default .fixups.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .fixups.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# fixups configuration

[analysis]
# Days after a commit during which later commits can be its fix-ups
# window_days = 5
# Paths excluded from every change set
# ignored_paths = ["Testing/Data"]
# Seconds before a single git invocation is abandoned
# git_timeout_secs = 120

[range]
# since = "2010-08-25"
# until = "2013-08-25"

[compare]
# adoption_date = "2010-08-25"
# span_days = 1096
"#;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FixupConfig> {
    let config = match path {
        Some(path) => FixupConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                FixupConfig::from_file(default_path)?
            } else {
                FixupConfig::default()
            }
        }
    };
    Ok(config)
}

fn open_backend(path: &Path, config: &FixupConfig) -> Result<GitBackend> {
    // Hint: not a git repository
    if git2::Repository::discover(path).is_err() {
        miette::bail!(miette::miette!(
            help = "Run fixups from inside a git repository, or specify --path to one",
            "Not a git repository: {}",
            path.display()
        ));
    }
    let timeout = Duration::from_secs(config.analysis.git_timeout_secs);
    Ok(GitBackend::open(path, timeout)?)
}

fn engine_options(config: &FixupConfig, window_days: Option<u32>) -> Result<EngineOptions> {
    let mut options = EngineOptions::from(config.analysis.clone());
    if let Some(days) = window_days {
        if days == 0 {
            miette::bail!("--window-days must be at least 1");
        }
        options.window_days = days;
    }
    Ok(options)
}

/// CLI bounds win over the config file, one end at a time.
fn resolve_range(
    config: &FixupConfig,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<DateRange> {
    let configured = config.range.resolve()?;
    let since = since.or(configured.as_ref().map(|r| r.since));
    let until = until.or(configured.as_ref().map(|r| r.until));
    match (since, until) {
        (Some(since), Some(until)) => Ok(DateRange::new(since, until)?),
        _ => miette::bail!(miette::miette!(
            help = "Pass --since and --until, or set [range] in .fixups.toml",
            "No date range to analyze"
        )),
    }
}

fn progress_bar() -> Result<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {msg} ({elapsed})").into_diagnostic()?,
    );
    Ok(pb)
}

/// Analyze one date range with a fresh visited set.
fn analyze(counter: &FixupCounter<GitBackend>, range: DateRange) -> Result<FixupReport> {
    let pb = progress_bar()?;
    let mut visited = VisitedSet::default();
    let records = counter
        .count_window(&range, &mut visited, |i, n| {
            pb.set_length(n as u64);
            pb.set_position(i as u64);
            pb.set_message(format!("Analyzing commit {i} of {n}"));
        })
        .wrap_err_with(|| format!("failed to analyze {range}"))?;
    pb.finish_and_clear();
    eprintln!(
        "Analyzed {} commits in {range} ({} consumed as fix-ups).",
        records.len(),
        visited.len()
    );
    Ok(FixupReport::aggregate(
        range,
        counter.options().window_days,
        &records,
        visited,
    ))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Count {
            since,
            until,
            window_days,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let range = resolve_range(&config, since, until)?;
            let options = engine_options(&config, window_days)?;
            let backend = open_backend(&cli.path, &config)?;
            tracing::debug!(%range, window_days = options.window_days, "count");

            let counter = FixupCounter::new(backend, options);
            let report = analyze(&counter, range)?;
            println!("{}", render::report(&report, cli.format)?);
        }
        Some(Command::Compare {
            adoption,
            span_days,
            window_days,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let mut compare = config.compare.clone();
            if let Some(days) = span_days {
                compare.span_days = days;
            }
            let (before, after) = match adoption {
                Some(date) => comparison_windows(date, compare.span_days)?,
                None => compare.windows()?.ok_or_else(|| {
                    miette::miette!(
                        help = "Pass --adoption, or set compare.adoption_date in .fixups.toml",
                        "No adoption date to compare around"
                    )
                })?,
            };
            let options = engine_options(&config, window_days)?;
            let backend = open_backend(&cli.path, &config)?;
            tracing::debug!(%before, %after, "compare");

            let counter = FixupCounter::new(backend, options);
            let cmp = ComparisonReport {
                before: analyze(&counter, before)?,
                after: analyze(&counter, after)?,
            };
            println!("{}", render::comparison(&cmp, cli.format)?);
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "fixups", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn default_config_template_parses() {
        let config = FixupConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.analysis.window_days, 5);
        assert!(config.range.since.is_none());
    }

    #[test]
    fn cli_bounds_override_config_one_end_at_a_time() {
        let config = FixupConfig::from_toml(
            "[range]\nsince = \"2010-01-01\"\nuntil = \"2010-12-31\"\n",
        )
        .unwrap();
        let range = resolve_range(&config, None, Some(date("2010-06-30"))).unwrap();
        assert_eq!(range.to_string(), "2010-01-01..2010-06-30");
    }

    #[test]
    fn missing_range_is_an_error() {
        let config = FixupConfig::default();
        assert!(resolve_range(&config, Some(date("2010-01-01")), None).is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(engine_options(&FixupConfig::default(), Some(0)).is_err());
        assert_eq!(
            engine_options(&FixupConfig::default(), Some(9))
                .unwrap()
                .window_days,
            9
        );
    }

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }
}
