//! Command line surface of the `pagemorph` binary.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::app_config::AppConfig;
use crate::error::{MorphError, Result};
use crate::morph::{MorphReport, Morpher};
use crate::padding::RandomSource;
use crate::strategy::distribution::{DistributionFiles, DistributionKind};
use crate::strategy::{DeterministicMultiples, DistributionSampler, ExplicitTarget, TargetStrategy};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Server side defence against website fingerprinting", long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    /// Page to morph (required)
    #[clap(long, global = true)]
    pub page: Option<PathBuf>,

    /// Destination directory (required)
    #[clap(long, global = true)]
    pub dst: Option<PathBuf>,

    /// TOML configuration file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for reproducible padding and sampling
    #[clap(long, global = true)]
    pub seed: Option<u64>,

    /// Sampled targets to try before giving up (distribution only)
    #[clap(long, global = true)]
    pub max_attempts: Option<usize>,

    /// Rewrite references to `path?type=..&size=..`
    #[clap(long, global = true)]
    pub annotate: bool,

    /// Pad and write objects on the calling thread only
    #[clap(long, global = true)]
    pub sequential: bool,

    /// Print the morph report as JSON
    #[clap(long, global = true)]
    pub json: bool,

    /// Print counters in the Prometheus text format
    #[clap(long, global = true)]
    pub metrics: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Morph to look like a target page.
    Target {
        /// HTML page whose sizes are copied
        #[clap(long, required = true)]
        target_page: PathBuf,
    },
    /// Morph with respect to a size file: html size, then object sizes.
    File {
        #[clap(long, required = true)]
        target_file: PathBuf,
    },
    /// Morph according to distributions.
    Distribution {
        /// histogram or kde
        #[clap(long, value_parser = ["histogram", "kde"], required = true)]
        distribution_type: String,
        /// Distribution of the number of objects
        #[clap(long, required = true)]
        count_dist: PathBuf,
        /// Distribution of the HTML size
        #[clap(long, required = true)]
        html_dist: PathBuf,
        /// Distribution of object sizes
        #[clap(long, required = true)]
        objects_dist: PathBuf,
    },
    /// Morph to multiples of S and L.
    Deterministic {
        /// Object and HTML sizes are padded to the next multiple of S
        #[clap(long = "S", required = true)]
        size_step: u64,
        /// The number of objects is padded to the next multiple of L
        #[clap(long = "L", required = true)]
        count_step: usize,
        /// Maximum size of new objects, a multiple of S
        #[clap(long = "maxs", required = true)]
        max_size: u64,
    },
}

impl Cli {
    /// Parses `args`, also requiring `--page` and `--dst`. Both are global so
    /// they may follow the subcommand, and clap refuses required globals.
    pub fn try_parse_checked<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Self::try_parse_from(args)?;
        for (flag, value) in [("--page", &cli.page), ("--dst", &cli.dst)] {
            if value.is_none() {
                return Err(Self::command().error(
                    ErrorKind::MissingRequiredArgument,
                    format!("the following required argument was not provided: {flag}"),
                ));
            }
        }
        Ok(cli)
    }

    /// Configuration file overridden by command line flags.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        if let Some(seed) = self.seed {
            cfg.morph.seed = Some(seed);
        }
        if let Some(n) = self.max_attempts {
            cfg.morph.max_attempts = n;
        }
        cfg.morph.annotate_references |= self.annotate;
        if self.sequential {
            cfg.morph.parallel = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Runs the command described by `cli`.
pub fn run(cli: &Cli) -> Result<MorphReport> {
    let page = required(cli.page.as_deref(), "--page")?;
    let dst = required(cli.dst.as_deref(), "--dst")?;
    let cfg = cli.app_config()?;
    let source = RandomSource::from_seed(cfg.morph.seed);
    let morpher = Morpher::new(cfg);

    let mut strategy: Box<dyn TargetStrategy> = match &cli.command {
        Commands::Target { target_page } => {
            Box::new(ExplicitTarget::from_page(&morpher.load(target_page)?))
        }
        Commands::File { target_file } => Box::new(ExplicitTarget::from_size_list(target_file)?),
        Commands::Distribution {
            distribution_type,
            count_dist,
            html_dist,
            objects_dist,
        } => {
            let kind: DistributionKind = distribution_type
                .parse()
                .map_err(MorphError::InvalidConfig)?;
            let files = DistributionFiles {
                count: count_dist.clone(),
                html: html_dist.clone(),
                objects: objects_dist.clone(),
            };
            Box::new(DistributionSampler::from_files(kind, &files, source)?)
        }
        Commands::Deterministic {
            size_step,
            count_step,
            max_size,
        } => Box::new(DeterministicMultiples::new(
            *size_step,
            *count_step,
            *max_size,
            source,
        )?),
    };

    morpher.morph_file(page, strategy.as_mut(), dst)
}

fn required<'a>(value: Option<&'a Path>, flag: &str) -> Result<&'a Path> {
    value.ok_or_else(|| MorphError::InvalidConfig(format!("{flag} is required")))
}
