use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Step limit used by `howfar` when a query should find the next boundary wherever it is.
pub const UNLIMITED_STEP: f64 = 1e30;

/// Runtime configuration for the driver and the consistency checker.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Number of random points tested by `check`.
    pub samples: usize,
    /// Centre of the sampling box.
    pub centre: [f64; 3],
    /// Half side length of the sampling box.
    pub extent: f64,
    /// Allowed excess of `hownear` over the boundary distance along a ray.
    pub tolerance: f64,
    pub seed: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load `config/default.toml` alone.
pub fn load_default_config() -> Result<Settings> {
    let default_config_file = retrieve_project_root()?.join("config/default.toml");

    let config: Settings = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("error loading configuration")?
        .try_deserialize()
        .context("error deserializing configuration")?;

    validate_config(&config)?;
    Ok(config)
}

/// Load settings from, in increasing precedence: `config/default.toml`,
/// `config/local.toml` or the file given by `--config`, `EGS_GEOM_*`
/// environment variables and command line options.
pub fn load_config(args: &CliArgs) -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");
    let user_config = args
        .config
        .clone()
        .or_else(|| Some(root.join("config/local.toml")).filter(|p| p.exists()));

    let mut builder = Config::builder().add_source(File::from(default_config_file).required(true));
    if let Some(path) = &user_config {
        log::debug!("using configuration overrides from {:?}", path);
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }
    let mut config: Settings = builder
        .add_source(Environment::with_prefix("egs_geom").try_parsing(true))
        .build()
        .context("error loading configuration")?
        .try_deserialize()
        .context("error deserializing configuration")?;

    args.apply(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Retrieve the project root directory, the one holding `config/`.
///
/// Tried in order: `CARGO_MANIFEST_DIR`, `EGS_GEOM_ROOT_DIR`, then the
/// executable's directory and its parents.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("EGS_GEOM_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }
    let exe_path = env::current_exe().context("failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(Path::to_path_buf)
        .context("could not find the project root directory, set EGS_GEOM_ROOT_DIR")
}

fn validate_config(config: &Settings) -> Result<()> {
    ensure!(config.samples > 0, "number of samples must be greater than 0");
    ensure!(config.extent > 0.0, "sampling extent must be greater than 0");
    ensure!(config.tolerance >= 0.0, "tolerance must not be negative");
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "egs-geom - geometry queries for particle transport")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file overriding `config/default.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `egs_geom::factory=debug`. `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Random seed for sampling.
    #[arg(short, long, global = true)]
    pub seed: Option<u64>,

    /// Number of random points tested by `check`.
    #[arg(short = 'n', long, global = true)]
    pub samples: Option<usize>,

    /// Half side length of the sampling box.
    #[arg(long, global = true)]
    pub extent: Option<f64>,

    /// Centre of the sampling box.
    #[arg(long, global = true, num_args = 3, allow_negative_numbers = true)]
    pub centre: Option<Vec<f64>>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Build every geometry of a definition file and print its description.
    Describe {
        /// TOML geometry definition.
        file: PathBuf,
    },
    /// Sample random points and rays and report inconsistent answers.
    Check {
        file: PathBuf,
        /// Check this geometry instead of the simulation geometry.
        #[arg(short, long)]
        geometry: Option<String>,
    },
    /// Follow one ray through the simulation geometry.
    Trace {
        file: PathBuf,
        #[arg(long, num_args = 3, allow_negative_numbers = true, required = true)]
        origin: Vec<f64>,
        /// Direction of flight, normalised before use.
        #[arg(long, num_args = 3, allow_negative_numbers = true, required = true)]
        direction: Vec<f64>,
        #[arg(short, long)]
        geometry: Option<String>,
        /// Print the steps as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    pub fn file(&self) -> &Path {
        match self {
            Command::Describe { file } | Command::Check { file, .. } | Command::Trace { file, .. } => {
                file
            }
        }
    }
}

impl CliArgs {
    fn apply(&self, config: &mut Settings) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
        if let Some(extent) = self.extent {
            config.extent = extent;
        }
        if let Some(&[x, y, z]) = self.centre.as_deref() {
            config.centre = [x, y, z];
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Samples: {}
  - Sampling Box: centre {:?}, half side {}
  - Tolerance: {:e}
  - Seed: {:?}
  ",
            self.samples, self.centre, self.extent, self.tolerance, self.seed,
        )
    }
}
