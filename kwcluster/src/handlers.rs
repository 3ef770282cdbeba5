use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use kwcluster_core::config::{
    CONFIG_FILE_NAME, Config, DATABASE_FILE_NAME, DEFAULT_CONFIG_DIR, expand_path,
};
use kwcluster_core::data::RankingStore;
use kwcluster_core::graph::ClusterGroup;
use kwcluster_core::pipeline::{
    IngestOptions, Ingested, cluster_keywords, import_directory, load_from_directory,
    load_from_store,
};
use kwcluster_core::report::{ReportFormat, generate_report, save_report};
use kwcluster_serp::KeywordData;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub fn print_banner() {
    eprintln!(
        "{} {}",
        "kwcluster".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn status(quiet: bool, line: String) {
    if !quiet {
        eprintln!("{}", line);
    }
}

// Configuration

/// Read `path` if given, otherwise the default config file if one exists,
/// otherwise fall back to built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let default_path = expand_path(DEFAULT_CONFIG_DIR).join(CONFIG_FILE_NAME);
            if default_path.exists() {
                Config::load(&default_path)
                    .with_context(|| format!("Failed to load config {}", default_path.display()))
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Flags a subcommand does not define read as unset.
fn flag<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> Option<T> {
    args.try_get_one::<T>(id).ok().flatten().cloned()
}

/// Layer command-line flags over a loaded config, then validate the result.
pub fn apply_overrides(mut config: Config, args: &ArgMatches) -> Result<Config> {
    if let Some(p) = flag::<f64>(args, "rbo-p") {
        config.rbo_p = p;
    }
    if let Some(power) = flag::<u32>(args, "power") {
        config.power = power;
    }
    if let Some(inflation) = flag::<u32>(args, "inflation") {
        config.inflation = inflation;
    }
    if let Some(max_iterations) = flag::<usize>(args, "max-iterations") {
        config.max_iterations = max_iterations;
    }
    if let Some(max_in_flight) = flag::<usize>(args, "max-in-flight") {
        config.max_in_flight = max_in_flight;
    }
    if let Some(database) = flag::<PathBuf>(args, "database") {
        config.database.path = database.display().to_string();
    }

    config.validate().context("Invalid settings")?;
    Ok(config)
}

pub fn resolve_config(args: &ArgMatches) -> Result<Config> {
    let path = flag::<PathBuf>(args, "config");
    let config = load_config(path.as_deref())?;
    apply_overrides(config, args)
}

fn ingest_options(config: &Config, quiet: bool) -> IngestOptions {
    IngestOptions {
        max_in_flight: config.max_in_flight,
        show_progress_bars: !quiet,
    }
}

// Ingestion

/// Accept a partial ingestion with a warning, or reject it under `--strict`.
pub fn settle_ingestion(ingested: Ingested, strict: bool) -> Result<KeywordData> {
    match ingested.failures {
        Some(failures) if strict => {
            Err(anyhow::Error::new(failures)
                .context("Some ranked lists could not be loaded (--strict)"))
        }
        Some(failures) => {
            for error in &failures.errors {
                warn!("Skipped: {}", error);
            }
            eprintln!(
                "{} Skipped {} ranked list(s): {}",
                "⚠".yellow().bold(),
                failures.len(),
                failures
            );
            Ok(ingested.data)
        }
        None => Ok(ingested.data),
    }
}

fn open_existing_store(config: &Config) -> Result<Arc<RankingStore>> {
    let path = config.database_path();
    if !RankingStore::exists(&path) {
        bail!(
            "No ranking store at {} (run `kwcluster init` first)",
            path.display()
        );
    }
    let store = RankingStore::open(&path)
        .with_context(|| format!("Failed to open ranking store {}", path.display()))?;
    Ok(Arc::new(store))
}

// Clustering and reporting

async fn cluster_and_report(data: KeywordData, config: &Config, args: &ArgMatches) -> Result<()> {
    let quiet = flag::<bool>(args, "quiet").unwrap_or(false);

    if data.is_empty() {
        bail!("No ranked lists to cluster");
    }
    let keyword_count = data.len();
    info!("Clustering {} keyword(s)", keyword_count);

    let clusters = cluster_keywords(data, config.finder())
        .await
        .context("Clustering failed")?;

    status(
        quiet,
        format!(
            "{} Grouped {} keyword(s) into {} cluster(s)",
            "✓".green().bold(),
            keyword_count,
            clusters.len()
        ),
    );

    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;

    emit_report(&clusters, &format, args.get_one::<PathBuf>("output"), quiet)
}

fn emit_report(
    clusters: &[ClusterGroup],
    format: &ReportFormat,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    let report = generate_report(clusters, format).context("Failed to render report")?;

    match output {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            status(
                quiet,
                format!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                ),
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}

// Subcommands

pub async fn handle_disk(args: &ArgMatches) -> Result<()> {
    let config = resolve_config(args)?;
    let quiet = flag::<bool>(args, "quiet").unwrap_or(false);
    let dir = args
        .get_one::<PathBuf>("DIR")
        .ok_or_else(|| anyhow!("A directory is required"))?;

    status(
        quiet,
        format!(
            "{} Reading ranked lists from {}",
            "→".blue(),
            dir.display().to_string().bright_white()
        ),
    );

    let ingested = load_from_directory(dir, &ingest_options(&config, quiet))
        .await
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    let data = settle_ingestion(ingested, flag::<bool>(args, "strict").unwrap_or(false))?;

    cluster_and_report(data, &config, args).await
}

pub async fn handle_db(args: &ArgMatches) -> Result<()> {
    let config = resolve_config(args)?;
    let quiet = flag::<bool>(args, "quiet").unwrap_or(false);
    let domain_id = *args
        .get_one::<i64>("domain-id")
        .ok_or_else(|| anyhow!("--domain-id is required"))?;

    let store = open_existing_store(&config)?;
    status(
        quiet,
        format!(
            "{} Querying domain {} in {}",
            "→".blue(),
            domain_id,
            store.path().display().to_string().bright_white()
        ),
    );

    let ingested = load_from_store(store, domain_id, &ingest_options(&config, quiet))
        .await
        .context("Failed to load keywords from the ranking store")?;
    let data = settle_ingestion(ingested, flag::<bool>(args, "strict").unwrap_or(false))?;

    cluster_and_report(data, &config, args).await
}

pub async fn handle_import(args: &ArgMatches) -> Result<()> {
    let config = resolve_config(args)?;
    let quiet = flag::<bool>(args, "quiet").unwrap_or(false);
    let domain_id = *args
        .get_one::<i64>("domain-id")
        .ok_or_else(|| anyhow!("--domain-id is required"))?;
    let dir = args
        .get_one::<PathBuf>("DIR")
        .ok_or_else(|| anyhow!("A directory is required"))?;

    let path = config.database_path();
    let store = RankingStore::open(&path)
        .with_context(|| format!("Failed to open ranking store {}", path.display()))?;

    let (count, failures) = import_directory(
        Arc::new(store),
        domain_id,
        dir,
        &ingest_options(&config, quiet),
    )
    .await
    .with_context(|| format!("Failed to import {}", dir.display()))?;

    settle_ingestion(
        Ingested {
            data: KeywordData::new(),
            failures,
        },
        flag::<bool>(args, "strict").unwrap_or(false),
    )?;

    status(
        quiet,
        format!(
            "{} Imported {} ranked list(s) into domain {}",
            "✓".green().bold(),
            count,
            domain_id
        ),
    );
    Ok(())
}

/// What `init` created or replaced.
#[derive(Debug)]
pub struct InitReport {
    pub config_path: PathBuf,
    pub database_path: PathBuf,
    pub config_written: bool,
    pub database_replaced: bool,
}

/// Create `dir` with a default config file and an empty ranking store.
///
/// An existing config file is kept unless `force` is set; `force` also drops
/// an existing store before recreating it.
pub fn init_workspace(dir: &Path, force: bool) -> Result<InitReport> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))?;

    let config_path = dir.join(CONFIG_FILE_NAME);
    let database_path = dir.join(DATABASE_FILE_NAME);

    let config_written = force || !config_path.exists();
    if config_written {
        let mut config = Config::default();
        config.database.path = database_path.display().to_string();
        config
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let database_replaced = force && RankingStore::exists(&database_path);
    if database_replaced {
        RankingStore::drop(&database_path)
            .with_context(|| format!("Failed to remove {}", database_path.display()))?;
    }
    RankingStore::open(&database_path)
        .with_context(|| format!("Failed to create ranking store {}", database_path.display()))?;

    Ok(InitReport {
        config_path,
        database_path,
        config_written,
        database_replaced,
    })
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let dir = args
        .get_one::<String>("PATH")
        .map(|p| expand_path(p))
        .unwrap_or_else(|| expand_path(DEFAULT_CONFIG_DIR));
    let force = args.get_flag("force");

    print_divider();
    println!("{}", "  KWCLUSTER INITIALIZATION".bright_white().bold());
    print_divider();
    println!();
    println!(
        "{} Target: {}",
        "→".blue(),
        dir.display().to_string().bright_white()
    );

    let report = init_workspace(&dir, force)?;

    if report.config_written {
        println!(
            "{} Config written: {}",
            "✓".green().bold(),
            report.config_path.display()
        );
    } else {
        println!(
            "{} Keeping existing config: {} (use --force to overwrite)",
            "⚠".yellow().bold(),
            report.config_path.display()
        );
    }
    if report.database_replaced {
        println!("{} Existing ranking store removed", "→".yellow().bold());
    }
    println!(
        "{} Ranking store: {}",
        "✓".green().bold(),
        report.database_path.display()
    );
    println!();
    println!("{} kwcluster initialization complete!", "✓".green().bold());
    Ok(())
}
