use crate::config::{BackendKind, Config, load_config};
use crate::error::Result;
use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blobmark", version, about = "Checkpointing object store enumerator")]
pub struct Cli {
    /// YAML config file; flags and environment variables override it
    #[arg(short, long, env = "BLOBMARK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(
        long,
        value_enum,
        env = "BLOBMARK_LOG_FORMAT",
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    // Global, so flags and BLOBMARK_* variables apply with or without a subcommand.
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

pub const MAX_SEED_COUNT: u32 = 100_000;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the source container and persist the last seen object (default)
    Run,
    /// Upload sample objects into the source container
    Seed {
        /// Number of objects to upload
        #[arg(
            short = 'n',
            long,
            default_value_t = 10,
            value_parser = clap::value_parser!(u32).range(..=MAX_SEED_COUNT as i64)
        )]
        count: u32,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreArgs {
    /// Storage backend
    #[arg(long, value_enum, env = "BLOBMARK_BACKEND", global = true)]
    pub backend: Option<BackendKind>,

    /// Container to enumerate
    #[arg(long, env = "BLOBMARK_SOURCE_CONTAINER", global = true)]
    pub source_container: Option<String>,

    /// Container holding the checkpoint object
    #[arg(long, env = "BLOBMARK_CHECKPOINT_CONTAINER", global = true)]
    pub checkpoint_container: Option<String>,

    /// Key of the checkpoint object
    #[arg(long, env = "BLOBMARK_CHECKPOINT_KEY", global = true)]
    pub checkpoint_key: Option<String>,

    /// Delay before each object, in milliseconds (0 disables)
    #[arg(long, env = "BLOBMARK_PACE_MS", global = true)]
    pub pace_ms: Option<u64>,

    /// S3 region
    #[arg(long, env = "BLOBMARK_S3_REGION", global = true)]
    pub region: Option<String>,

    /// S3 endpoint URL, for S3-compatible stores
    #[arg(long, env = "BLOBMARK_S3_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Use path-style S3 addressing
    #[arg(long, env = "BLOBMARK_S3_FORCE_PATH_STYLE", global = true)]
    pub force_path_style: bool,

    /// Root directory for the local backend
    #[arg(long, env = "BLOBMARK_LOCAL_ROOT", global = true)]
    pub local_root: Option<PathBuf>,
}

impl StoreArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(v) = &self.source_container {
            config.source_container = v.clone();
        }
        if let Some(v) = &self.checkpoint_container {
            config.checkpoint_container = v.clone();
        }
        if let Some(v) = &self.checkpoint_key {
            config.checkpoint_key = v.clone();
        }
        if let Some(v) = self.pace_ms {
            config.pace_ms = v;
        }
        if let Some(v) = &self.region {
            config.s3.region = Some(v.clone());
        }
        if let Some(v) = &self.endpoint {
            config.s3.endpoint = Some(v.clone());
        }
        if self.force_path_style {
            config.s3.force_path_style = true;
        }
        if let Some(v) = &self.local_root {
            config.local_root = v.clone();
        }
    }
}

impl Cli {
    /// The subcommand to execute; `run` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// Layers defaults, the config file and store flags, then validates.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        self.store.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}
