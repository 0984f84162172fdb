// 🖥️ nav-reconcile CLI
// compare: reconcile two snapshots into a result workbook. validate: check a rules file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nav_reconcile::report::{ledger_table, write_workbook, RunSummary};
use nav_reconcile::{ConfigError, ExtractionError, LoadedRules, Pipeline, RuleStore};

#[derive(Parser, Debug)]
#[command(name = "nav-reconcile", version, about = "Compare two NAV snapshots and reconcile every record")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile a latest snapshot against a past snapshot
    Compare {
        #[arg(long)]
        latest: PathBuf,
        #[arg(long)]
        past: PathBuf,
        #[arg(short, long)]
        rules: PathBuf,
        #[arg(short, long, default_value = "NAV_Comparison_Result.xlsx")]
        output: PathBuf,
        /// Also write a JSON run summary
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Worksheet to read from Excel inputs (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Load a rules file and report validation warnings
    Validate {
        #[arg(short, long)]
        rules: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compare {
            latest,
            past,
            rules,
            output,
            summary,
            sheet,
        } => run_compare(latest, past, rules, output, summary, sheet),
        Command::Validate { rules } => run_validate(rules),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<ConfigError>().is_some() {
        ExitCode::from(2)
    } else if err.downcast_ref::<ExtractionError>().is_some() {
        ExitCode::from(3)
    } else {
        ExitCode::from(1)
    }
}

fn load_rules(path: &Path) -> Result<LoadedRules> {
    let loaded = RuleStore::load_file(path)?;
    for warning in &loaded.report.warnings {
        warn!("{}", warning);
    }
    Ok(loaded)
}

fn run_compare(
    latest: PathBuf,
    past: PathBuf,
    rules: PathBuf,
    output: PathBuf,
    summary: Option<PathBuf>,
    sheet: Option<String>,
) -> Result<()> {
    let loaded = load_rules(&rules)?;
    info!(fingerprint = %loaded.config.fingerprint(), "rules loaded");

    let rec = Pipeline::new(&loaded.config).run_files(&latest, &past, sheet, &loaded.extraction)?;

    write_workbook(&output, &rec)?;

    if let Some(path) = summary {
        RunSummary::new(&rec, &loaded.config, &loaded.report.warnings, &latest, &past).write(&path)?;
        info!(path = %path.display(), "wrote run summary");
    }

    println!("{}", rec.summary());
    print!("{}", ledger_table(&rec));
    Ok(())
}

fn run_validate(rules: PathBuf) -> Result<()> {
    let loaded = load_rules(&rules)?;
    let config = &loaded.config;

    println!("Rules OK: {}", rules.display());
    println!("  exclusion keywords:  {}", config.exclusion_keywords().len());
    println!("  strip terms:         {}", config.base_scheme_strip_terms().len());
    println!("  type categories:     {}", config.type_keywords().len());
    println!("  ladder rungs:        {}", config.variant_priority_ladder().len());
    println!("  warnings:            {}", loaded.report.warnings.len());
    Ok(())
}
