use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cleanup_patcher::config::{load_from_path, CleanupConfig};
use cleanup_patcher::diagnostics::{parse_cargo_output, ProblemsByFile};
use cleanup_patcher::driver::{CleanupDriver, UnitOutcome, UnitState};
use cleanup_patcher::ts::CompilerOptions;
use cleanup_patcher::workspace::{atomic_write, collect_sources, find_config, load_units};
use cleanup_patcher::DetectorKind;
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "cleanup-patcher")]
#[command(about = "Comment-preserving source cleanups for Rust", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the enabled cleanups over Rust sources
    Fix {
        /// Files or directories to clean up
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Cleanup config (defaults to the nearest cleanup-patcher.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Workspace root that compiler diagnostics are relative to
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Cargo JSON output (`cargo check --message-format=json`)
        #[arg(long)]
        diagnostics: Option<PathBuf>,

        /// Rust edition to parse with
        #[arg(long)]
        edition: Option<String>,

        /// Show what would change without writing files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// List available cleanups
    List {
        /// Cleanup config used to show enabled state and labels
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Fix {
            paths,
            config,
            workspace,
            diagnostics,
            edition,
            dry_run,
            diff,
            json,
        } => cmd_fix(FixArgs {
            paths,
            config,
            workspace,
            diagnostics,
            edition,
            dry_run,
            diff,
            json,
        }),

        Commands::List { config } => cmd_list(config),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid log level '{level}'"))?;
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

struct FixArgs {
    paths: Vec<PathBuf>,
    config: Option<PathBuf>,
    workspace: Option<PathBuf>,
    diagnostics: Option<PathBuf>,
    edition: Option<String>,
    dry_run: bool,
    diff: bool,
    json: bool,
}

/// Explicit path, else the nearest config above `start`, else defaults.
fn load_config(explicit: Option<PathBuf>, start: &Path) -> Result<CleanupConfig> {
    let known: Vec<&str> = DetectorKind::ids().collect();
    match explicit.or_else(|| find_config(start)) {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading cleanup config");
            Ok(load_from_path(&path, &known)?)
        }
        None => Ok(CleanupConfig::default()),
    }
}

fn load_problems(diagnostics: Option<&Path>, workspace: &Path) -> Result<ProblemsByFile> {
    let Some(path) = diagnostics else {
        return Ok(ProblemsByFile::new());
    };
    let file = File::open(path)
        .with_context(|| format!("failed to open diagnostics {}", path.display()))?;
    Ok(parse_cargo_output(BufReader::new(file), workspace)?)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {file} (original)").dimmed());
    println!("{}", format!("+++ {file} (cleaned)").dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{change}").red(),
                ChangeTag::Insert => format!("+{change}").green(),
                ChangeTag::Equal => format!(" {change}").normal(),
            };
            print!("{line}");
            if change.missing_newline() {
                println!();
            }
        }
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    status: &'static str,
    groups: Vec<GroupReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    states: &'a [UnitState],
}

#[derive(Serialize)]
struct GroupReport<'a> {
    label: &'a str,
    edits: usize,
}

impl<'a> FileReport<'a> {
    fn new(outcome: &'a UnitOutcome) -> Self {
        let (status, error) = match outcome {
            UnitOutcome::Applied { changed: true, .. } => ("changed", None),
            UnitOutcome::Applied { .. } => ("unchanged", None),
            UnitOutcome::Failed { error, .. } => ("failed", Some(error.to_string())),
        };
        Self {
            file: outcome.name().to_string(),
            status,
            groups: outcome
                .groups()
                .iter()
                .map(|group| GroupReport {
                    label: &group.label,
                    edits: group.edits.len(),
                })
                .collect(),
            error,
            states: outcome.states(),
        }
    }

    /// A file that never reached the driver.
    fn unreadable(file: String, error: String) -> Self {
        Self {
            file,
            status: "failed",
            groups: Vec::new(),
            error: Some(error),
            states: &[],
        }
    }

    fn write_failed(&mut self, error: String) {
        self.status = "failed";
        self.error = Some(error);
    }
}

fn cmd_fix(args: FixArgs) -> Result<()> {
    // 1. Resolve workspace and config
    let workspace = match args.workspace {
        Some(path) => path,
        None => env::current_dir()?,
    };
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("workspace {} does not exist", workspace.display()))?;
    let config = load_config(args.config, &workspace)?;

    // 2. Gather units
    let problems = load_problems(args.diagnostics.as_deref(), &workspace)?;
    let mut options = CompilerOptions::new();
    if let Some(edition) = args.edition {
        options = options.with(CompilerOptions::EDITION, edition);
    }
    let files = collect_sources(&args.paths)?;
    let mut sources = Vec::new();
    let mut units = Vec::new();
    let mut unreadable = Vec::new();
    for (file, loaded) in files.iter().zip(load_units(&files, &problems, &options)) {
        match loaded {
            Ok(unit) => {
                sources.push(file);
                units.push(unit);
            }
            Err(error) => {
                tracing::warn!(file = %file.display(), %error, "skipping unreadable source");
                unreadable.push((file, error));
            }
        }
    }
    tracing::info!(files = units.len(), "running cleanups");

    // 3. Run
    let driver = CleanupDriver::new(config);
    let outcomes = driver.run_all(&units);

    // 4. Write and report; every failure stays scoped to its own file
    let mut total_changed = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;
    let mut reports = Vec::new();

    if args.dry_run && !args.json {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }

    for (file, error) in &unreadable {
        total_failed += 1;
        let name = file.display().to_string();
        if !args.json {
            eprintln!(
                "{} cleanup could not be applied to file {name}: {error}",
                "✗".red()
            );
        }
        reports.push(FileReport::unreadable(name, error.to_string()));
    }

    for ((file, unit), outcome) in sources.iter().zip(&units).zip(&outcomes) {
        let mut report = FileReport::new(outcome);
        match outcome {
            UnitOutcome::Applied {
                text,
                changed: true,
                ..
            } => {
                let written = if args.dry_run {
                    Ok(())
                } else {
                    atomic_write(file, text.as_bytes())
                };
                match written {
                    Ok(()) => {
                        total_changed += 1;
                        if !args.json {
                            println!("{} {}", "✓".green(), outcome);
                            if args.diff {
                                display_diff(&unit.name, &unit.text, text);
                            }
                        }
                    }
                    Err(error) => {
                        total_failed += 1;
                        if !args.json {
                            eprintln!(
                                "{} cleanup could not be applied to file {}: {error}",
                                "✗".red(),
                                unit.name
                            );
                        }
                        report.write_failed(error.to_string());
                    }
                }
            }
            UnitOutcome::Applied { .. } => {
                total_unchanged += 1;
                if !args.json {
                    println!("{} {}", "⊙".yellow(), outcome.to_string().dimmed());
                }
            }
            UnitOutcome::Failed { .. } => {
                total_failed += 1;
                if !args.json {
                    eprintln!("{} {}", "✗".red(), outcome);
                }
            }
        }
        reports.push(report);
    }

    if args.json {
        reports.sort_by(|a, b| a.file.cmp(&b.file));
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!();
        println!("{}", "Summary:".bold());
        println!("  {} changed", format!("{total_changed}").green());
        println!("  {} unchanged", format!("{total_unchanged}").yellow());
        println!("  {} failed", format!("{total_failed}").red());
    }

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config, &env::current_dir()?)?;
    let driver = CleanupDriver::new(config);

    println!("{}", "Available cleanups:".bold());
    for detector in driver.detectors() {
        let id = detector.id();
        let state = if driver.config().is_enabled(id) {
            "enabled".green()
        } else {
            "disabled".red()
        };
        println!("  {} [{}]", id.bold(), state);
        println!("      {}", detector.description());
        println!("      {}", format!("label: {}", driver.label(id)).dimmed());
    }
    Ok(())
}
