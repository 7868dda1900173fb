use crate::cli::Args;
use crate::seeding::check_range;
use anyhow::{bail, Context, Result};
use duffing_core::{ButcherTableau, DuffingParams, RunSettings, SchemeSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub params: DuffingParams,
    pub integration: RunSettings,
    pub ensemble: EnsembleConfig,
    pub schemes: SchemesConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default = "EnsembleConfig::default_particles")]
    pub particles: usize,
    #[serde(default = "EnsembleConfig::default_range")]
    pub position_range: [f64; 2],
    #[serde(default = "EnsembleConfig::default_range")]
    pub velocity_range: [f64; 2],
    /// Seed for the initial conditions. Drawn at random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EnsembleConfig {
    fn default_particles() -> usize {
        1000
    }
    fn default_range() -> [f64; 2] {
        [-10.0, 10.0]
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            particles: Self::default_particles(),
            position_range: Self::default_range(),
            velocity_range: Self::default_range(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemesConfig {
    #[serde(default = "SchemesConfig::default_low")]
    pub low: SchemeSpec,
    #[serde(default = "SchemesConfig::default_high")]
    pub high: SchemeSpec,
}

impl SchemesConfig {
    fn default_low() -> SchemeSpec {
        SchemeSpec::Rk4
    }
    fn default_high() -> SchemeSpec {
        SchemeSpec::Dp87
    }

    pub fn build(&self) -> Result<(ButcherTableau, ButcherTableau)> {
        let low = self.low.build().context("Invalid low-order scheme")?;
        let high = self.high.build().context("Invalid high-order scheme")?;
        Ok((low, high))
    }
}

impl Default for SchemesConfig {
    fn default() -> Self {
        Self {
            low: Self::default_low(),
            high: Self::default_high(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_directory")]
    pub directory: PathBuf,
    #[serde(default = "OutputConfig::default_low_file")]
    pub low_file: String,
    #[serde(default = "OutputConfig::default_high_file")]
    pub high_file: String,
    #[serde(default = "OutputConfig::default_divergence_file")]
    pub divergence_file: String,
    #[serde(default = "OutputConfig::default_summary_file")]
    pub summary_file: String,
    /// Per-step ensemble dumps dominate the output size; the divergence
    /// series and summary are always written.
    #[serde(default = "OutputConfig::default_write_trajectories")]
    pub write_trajectories: bool,
}

impl OutputConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_low_file() -> String {
        "duffing_low.dat".to_string()
    }
    fn default_high_file() -> String {
        "duffing_high.dat".to_string()
    }
    fn default_divergence_file() -> String {
        "diff.dat".to_string()
    }
    fn default_summary_file() -> String {
        "summary.toml".to_string()
    }
    fn default_write_trajectories() -> bool {
        true
    }

    pub fn low_path(&self) -> PathBuf {
        self.directory.join(&self.low_file)
    }

    pub fn high_path(&self) -> PathBuf {
        self.directory.join(&self.high_file)
    }

    pub fn divergence_path(&self) -> PathBuf {
        self.directory.join(&self.divergence_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.directory.join(&self.summary_file)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            low_file: Self::default_low_file(),
            high_file: Self::default_high_file(),
            divergence_file: Self::default_divergence_file(),
            summary_file: Self::default_summary_file(),
            write_trajectories: Self::default_write_trajectories(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Command line values take precedence over the file.
    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(dt) = args.dt {
            self.integration.dt = dt;
        }
        if let Some(duration) = args.duration {
            self.integration.duration = duration;
        }
        if args.parallel {
            self.integration.parallel = true;
        }
        if let Some(particles) = args.particles {
            self.ensemble.particles = particles;
        }
        if let Some(seed) = args.seed {
            self.ensemble.seed = Some(seed);
        }
        if let Some(directory) = &args.output_dir {
            self.output.directory = directory.clone();
        }
        if args.no_trajectories {
            self.output.write_trajectories = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.integration.validate()?;
        if self.ensemble.particles == 0 {
            bail!("ensemble.particles must be at least 1.");
        }
        check_range("ensemble.position_range", self.ensemble.position_range)?;
        check_range("ensemble.velocity_range", self.ensemble.velocity_range)?;
        self.schemes.build()?;
        Ok(())
    }
}
