//! station - hold-to-play music station in the terminal
//!
//! Run with: cargo run --bin station -- --audio-dir musics

mod app;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use saavy_station::config::{RecipePreset, StationConfig};
use saavy_station::site::Page;
use saavy_station::Lifecycle;

#[derive(Parser, Debug)]
#[command(name = "station")]
#[command(about = "Hold a key, hear a random track through a random effects chain", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of playable tracks
    #[arg(long, value_name = "DIR")]
    audio_dir: Option<PathBuf>,

    /// Directory of blog background images
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// Blog document
    #[arg(long, value_name = "FILE")]
    blog: Option<PathBuf>,

    /// Built-in effects recipe
    #[arg(long, value_enum)]
    recipe: Option<RecipeArg>,

    /// Output state policy between sessions
    #[arg(long, value_enum)]
    lifecycle: Option<LifecycleArg>,

    /// Seed for reproducible track picks and chains
    #[arg(long)]
    seed: Option<u64>,

    /// Output device name (host default otherwise)
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Page shown at startup (top, musics, blog)
    #[arg(long)]
    page: Option<Page>,

    /// Log file; the terminal belongs to the UI
    #[arg(long, value_name = "FILE", default_value = "station.log")]
    log_file: PathBuf,

    /// Log debug events (realized chains, node teardown)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RecipeArg {
    Chain,
    DryFxMix,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LifecycleArg {
    Persistent,
    Rebuild,
}

impl Cli {
    fn apply(&self, config: &mut StationConfig) {
        if let Some(dir) = &self.audio_dir {
            config.catalog.audio_dir = dir.clone();
        }
        if let Some(dir) = &self.image_dir {
            config.catalog.image_dir = dir.clone();
        }
        if let Some(path) = &self.blog {
            config.blog.path = path.clone();
        }
        if let Some(recipe) = self.recipe {
            config.playback.custom_recipe = None;
            config.playback.recipe = match recipe {
                RecipeArg::Chain => RecipePreset::Chain,
                RecipeArg::DryFxMix => RecipePreset::DryFxMix,
            };
        }
        if let Some(lifecycle) = self.lifecycle {
            config.playback.lifecycle = match lifecycle {
                LifecycleArg::Persistent => Lifecycle::Persistent,
                LifecycleArg::Rebuild => Lifecycle::Rebuild,
            };
        }
        if self.seed.is_some() {
            config.playback.seed = self.seed;
        }
        if let Some(device) = &self.device {
            config.playback.device = Some(device.clone());
        }
        if let Some(page) = self.page {
            config.start_page = page;
        }
    }
}

fn init_logging(cli: &Cli) -> EyreResult<()> {
    let file = File::create(&cli.log_file)
        .wrap_err_with(|| format!("failed to create log file {}", cli.log_file.display()))?;
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut config = StationConfig::load_or_default(cli.config.as_deref())
        .wrap_err("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().wrap_err("invalid configuration")?;

    // Single control thread: the session is Rc-shared and awaited locally
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .wrap_err("failed to start runtime")?;
    let local = tokio::task::LocalSet::new();

    let mut terminal = ratatui::init();
    let result = local.block_on(&runtime, app::run(config, &mut terminal));
    ratatui::restore();
    result
}
