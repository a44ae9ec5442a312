use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use funcoes_mdl::{
    init_logging, load_function_catalog, load_location_catalog, open_reference_store, render_history,
    write_history, Config, CsvScrapedSource, Cutoff, FunctionCatalog, HistoryBuilder, JsonPageSource,
    LocationCatalog, LogSink, TracingSink, DEFAULT_CONFIG_FILE,
};

#[derive(Parser)]
#[command(name = "funcoes-mdl")]
#[command(about = "Histórico anual de funções a partir do relatório funcional e dos dados coletados", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// JSON page dump of the functional report (source A)
    #[arg(long)]
    pages: Option<PathBuf>,

    /// CSV of scraped rows: date,function_code,location (source B)
    #[arg(long)]
    scraped: Option<PathBuf>,

    /// SQLite reference store (unidades, funcoes)
    #[arg(long, global = true)]
    reference_db: Option<PathBuf>,

    /// Write the rendered history here as well as to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cutoff date (YYYY-MM-DD); overrides the configuration
    #[arg(long)]
    cutoff: Option<NaiveDate>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a 3-digit function code
    Lookup {
        code: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    init_logging(&config.logging.filter, cli.verbose);

    match &cli.command {
        Some(Commands::Lookup { code }) => run_lookup(&cli, &config, code),
        None => run_history(&cli, config),
    }
}

fn run_history(cli: &Cli, mut config: Config) -> Result<()> {
    if let Some(cutoff) = cli.cutoff {
        config.reconciliation.cutoff = cutoff;
    }
    let log = TracingSink;

    println!("📑 Histórico de Funções - cutoff {}", Cutoff::new(config.reconciliation.cutoff));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let pages_path = pick(&cli.pages, &config.inputs.pages, "pages")?;
    let scraped_path = pick(&cli.scraped, &config.inputs.scraped, "scraped")?;

    // 1. Reference data
    println!("\n🗄️  Loading reference data...");
    let (locations, functions) = load_catalogs(cli, &config, &log)?;
    println!("✓ {} units, {} functions", locations.len(), functions.len());

    // 2. Build
    println!("\n⚙️  Processing {}...", pages_path.display());
    let pages = JsonPageSource::new(&pages_path);
    let scraped = CsvScrapedSource::new(&scraped_path);

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .context("Invalid progress bar template")?,
    );
    let mut progress = |fraction: f64| bar.set_position((fraction * 100.0).round() as u64);

    let outcome = HistoryBuilder::from_config(&locations, &config)
        .build(&pages, &scraped, Some(&mut progress), &log)
        .context("Failed to build the function history")?;
    bar.finish_and_clear();

    let stats = &outcome.segmentation;
    println!(
        "✓ {} pages, {} reports kept, {} before cutoff, {} invalid",
        stats.pages, stats.reports_started, stats.reports_discarded, stats.invalid_boundaries
    );
    println!("✓ {}", outcome.report.summary());

    // 3. Render
    let text = render_history(&outcome.report.history, &functions);
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("{}", text);

    let output = cli.output.clone().or_else(|| config.output.path.clone());
    if let Some(path) = output {
        write_history(&path, &text).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\n💾 Saved to {}", path.display());
    }

    Ok(())
}

fn run_lookup(cli: &Cli, config: &Config, code: &str) -> Result<()> {
    let log = TracingSink;
    let (_, functions) = load_catalogs(cli, config, &log)?;

    match functions.lookup(code) {
        Err(message) => bail!(message),
        Ok(Some(info)) => {
            println!("{} - {}", code.trim(), info.description);
            if let Some(classification) = &info.classification {
                println!("Classificação: {}", classification);
            }
        }
        Ok(None) => println!("Nenhuma função encontrada"),
    }
    Ok(())
}

/// Reference store first; an optional function list file overrides the
/// store's function table
fn load_catalogs(cli: &Cli, config: &Config, log: &dyn LogSink) -> Result<(LocationCatalog, FunctionCatalog)> {
    let (locations, mut functions) = match cli.reference_db.as_ref().or(config.inputs.reference_db.as_ref()) {
        Some(path) => {
            let conn = open_reference_store(path)?;
            (load_location_catalog(&conn, log)?, load_function_catalog(&conn, log)?)
        }
        None => {
            log.warn("No reference database configured; locations stay unresolved");
            (LocationCatalog::new(), FunctionCatalog::new())
        }
    };

    if let Some(list_path) = &config.inputs.function_list {
        functions = load_function_list(list_path, log)?;
    }

    Ok((locations, functions))
}

fn load_function_list(path: &Path, log: &dyn LogSink) -> Result<FunctionCatalog> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read function list {}", path.display()))?;
    let catalog = FunctionCatalog::parse_list(&text, log);
    log.info(&format!("Loaded {} functions from {}", catalog.len(), path.display()));
    Ok(catalog)
}

fn pick(flag: &Option<PathBuf>, configured: &Option<PathBuf>, name: &str) -> Result<PathBuf> {
    flag.clone()
        .or_else(|| configured.clone())
        .ok_or_else(|| anyhow!("No {} input: pass --{} or set inputs.{} in the configuration", name, name, name))
}
