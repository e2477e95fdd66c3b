//! expfactory - assemble, preview and serve Experiment Factory batteries
//!
//! Configuration priority: command-line flag, then environment variable, then
//! the TOML config file, then compiled defaults.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};

use efx_common::battery::config_txt::parse_overrides;
use efx_common::battery::{generate, GenerateOptions};
use efx_common::config::{
    find_config_file, load_toml_config_or_default, log_filter, AppConfig, CliOverrides,
};
use efx_common::fetch::{custom_battery_download, RepoKind};
use efx_common::manifest::load_manifest;
use efx_common::page::stage_preview;
use efx_common::selection::{list_valid, load_items, select};
use efx_common::site::{generate_site, SiteOptions, SiteSources};
use efx_common::validation::{validate, ValidateOptions};
use efx_ui::serve::{serve_directory, shutdown_signal};
use efx_ui::{build_router, AppState};

#[derive(Parser)]
#[command(name = "expfactory", version, about = "Experiment Factory battery builder")]
struct Cli {
    /// Content base directory
    #[arg(long, global = true)]
    base: Option<PathBuf>,

    /// Selected items, names or paths separated by commas or spaces
    #[arg(long, global = true)]
    experiments: Option<String>,

    /// TOML config file (default: search the standard locations)
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List valid content items under the base directory
    List,
    /// Validate one content folder
    Validate {
        folder: PathBuf,
        /// Do not log warnings for recommended fields
        #[arg(long)]
        no_warnings: bool,
    },
    /// Serve a single item inside the battery skeleton
    Preview {
        folder: PathBuf,
        #[arg(long)]
        battery: Option<PathBuf>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Assemble a battery folder
    Generate {
        dest: PathBuf,
        #[arg(long)]
        battery: Option<PathBuf>,
        /// config.txt override, KEY=VALUE (repeatable)
        #[arg(long = "config", value_name = "KEY=VALUE")]
        config: Vec<String>,
        /// Do not write config.txt
        #[arg(long)]
        no_config: bool,
    },
    /// Assemble a time-limited battery and serve it locally
    Run {
        /// Maximum total duration in minutes
        #[arg(long, default_value_t = 30.0)]
        time: f64,
        #[arg(long)]
        port: Option<u16>,
        /// Subject identifier embedded in the session
        #[arg(long)]
        subid: Option<String>,
        #[arg(long)]
        battery: Option<PathBuf>,
    },
    /// Start the interactive assembly web UI
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Build the static preview site
    Site {
        output: PathBuf,
        #[arg(long)]
        battery: Option<PathBuf>,
        /// Surveys repository to include
        #[arg(long)]
        surveys: Option<PathBuf>,
        /// Games repository to include
        #[arg(long)]
        games: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_file.clone().or_else(find_config_file);
    let (toml_config, toml_error) = load_toml_config_or_default(config_path.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_filter(&toml_config)))
        .init();

    info!(
        "Starting Experiment Factory (expfactory) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(e) = toml_error {
        warn!("Ignoring config file: {}", e);
    }

    let overrides = CliOverrides {
        base: cli.base.clone(),
        experiments: cli.experiments.clone(),
        battery: command_battery(&cli.command),
        port: command_port(&cli.command),
        subject_id: match &cli.command {
            Commands::Run { subid, .. } => subid.clone(),
            _ => None,
        },
        output_root: None,
    };
    let config = AppConfig::resolve(&overrides, &toml_config)?;

    match cli.command {
        Commands::List => list(&config),
        Commands::Validate { folder, no_warnings } => validate_folder(&folder, !no_warnings),
        Commands::Preview { folder, port, .. } => preview(&config, &folder, port).await,
        Commands::Generate {
            dest,
            config: pairs,
            no_config,
            ..
        } => generate_battery(&config, &dest, &pairs, !no_config),
        Commands::Run { time, port, .. } => run(&config, time, port).await,
        Commands::Serve { .. } => serve(&config).await,
        Commands::Site {
            output,
            surveys,
            games,
            ..
        } => site(&config, &output, surveys, games),
    }
}

fn command_battery(command: &Commands) -> Option<PathBuf> {
    match command {
        Commands::Preview { battery, .. }
        | Commands::Generate { battery, .. }
        | Commands::Run { battery, .. }
        | Commands::Site { battery, .. } => battery.clone(),
        _ => None,
    }
}

fn command_port(command: &Commands) -> Option<u16> {
    match command {
        Commands::Serve { port } => *port,
        _ => None,
    }
}

/// The configured skeleton, or a fresh clone kept alive by the returned guard
fn skeleton(config: &AppConfig) -> Result<(PathBuf, Option<TempDir>)> {
    match &config.battery {
        Some(battery) => Ok((battery.clone(), None)),
        None => {
            info!("No battery folder configured, fetching the skeleton");
            let tmp = custom_battery_download(&[RepoKind::Battery])?;
            Ok((tmp.path().join(RepoKind::Battery.folder_name()), Some(tmp)))
        }
    }
}

fn list(config: &AppConfig) -> Result<()> {
    let valid = list_valid(&config.base, &ValidateOptions::quiet())
        .with_context(|| format!("Cannot read content base {}", config.base.display()))?;
    let items = load_items(&select(&valid, &config.selection))?;

    for item in &items {
        println!(
            "{}\t{}\t{}",
            item.exp_id(),
            item.manifest.template.as_str(),
            item.manifest.time
        );
    }
    info!(base = %config.base.display(), "{} valid items", items.len());
    Ok(())
}

fn validate_folder(folder: &Path, warnings: bool) -> Result<()> {
    let result = validate(folder, &ValidateOptions { warnings });
    if !result.is_valid() {
        bail!(
            "{} is not valid: {}",
            folder.display(),
            result.reasons().join("; ")
        );
    }
    info!(folder = %folder.display(), "Valid");
    Ok(())
}

async fn preview(config: &AppConfig, folder: &Path, port: Option<u16>) -> Result<()> {
    validate_folder(folder, true)?;
    let manifest = load_manifest(folder)?;
    let (battery, _clone) = skeleton(config)?;

    let staging = tempfile::tempdir()?;
    let dest = staging.path().join("preview");
    stage_preview(&manifest, folder, &battery, &dest)?;

    serve_directory(&dest, port).await
}

fn generate_battery(config: &AppConfig, dest: &Path, pairs: &[String], make_config: bool) -> Result<()> {
    if dest.exists() {
        bail!("{} already exists, choose a new destination", dest.display());
    }

    let options = GenerateOptions {
        destination: dest.to_path_buf(),
        battery_repo: config.battery.clone(),
        content_repos: content_repos(config),
        selection: config.selection.clone(),
        make_config,
        config: parse_overrides(pairs)?,
        max_minutes: None,
        subject_id: config.subject_id.clone(),
        warnings: true,
    };
    let battery = generate(&options)?;

    info!(
        dest = %battery.destination.display(),
        items = battery.items.len(),
        skipped = battery.skipped.len(),
        "Battery generated"
    );
    Ok(())
}

fn content_repos(config: &AppConfig) -> Vec<PathBuf> {
    if config.base.is_dir() {
        vec![config.base.clone()]
    } else {
        warn!(base = %config.base.display(), "Content base not found, fetching experiments");
        Vec::new()
    }
}

async fn run(config: &AppConfig, minutes: f64, port: Option<u16>) -> Result<()> {
    let subject = config
        .subject_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let staging = tempfile::tempdir()?;
    let options = GenerateOptions {
        destination: staging.path().join("battery"),
        battery_repo: config.battery.clone(),
        content_repos: content_repos(config),
        selection: config.selection.clone(),
        make_config: false,
        config: Default::default(),
        max_minutes: Some(minutes),
        subject_id: Some(subject.clone()),
        warnings: false,
    };
    let battery = generate(&options)?;
    if battery.items.is_empty() {
        bail!("No items fit in {} minutes", minutes);
    }

    info!(subject = %subject, items = battery.items.len(), "Local session ready");
    serve_directory(&battery.destination, port).await
}

async fn serve(config: &AppConfig) -> Result<()> {
    let state = AppState::load(config)?;
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;
    info!("expfactory listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn site(config: &AppConfig, output: &Path, surveys: Option<PathBuf>, games: Option<PathBuf>) -> Result<()> {
    let (battery, _clone) = skeleton(config)?;
    let sources = SiteSources {
        battery,
        experiments: Some(config.base.clone()),
        surveys,
        games,
    };
    let summary = generate_site(output, &sources, &SiteOptions::default())?;

    info!(
        output = %output.display(),
        items = summary.items,
        pages = summary.pages,
        "Site generated"
    );
    Ok(())
}
