use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the catalogd binary.
#[derive(Debug, Parser)]
#[command(name = "catalogd", version, about = "Chair and estate catalog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CATALOGD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Reset the database from the init scripts and exit.
    Initialize(InitializeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct InitializeArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the directory holding the init scripts.
    #[arg(long = "catalog-init-dir", value_name = "PATH")]
    pub init_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the CSV upload body limit in bytes.
    #[arg(long = "server-max-upload-bytes", value_name = "BYTES")]
    pub server_max_upload_bytes: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Cache search, count and list results.
    #[arg(
        long = "cache-enable-query-cache",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_query_cache: Option<bool>,

    /// Override the number of idle serialization buffers kept.
    #[arg(long = "cache-buffer-pool-size", value_name = "COUNT")]
    pub cache_buffer_pool_size: Option<usize>,

    /// Override the initial capacity of serialization buffers.
    #[arg(long = "cache-buffer-capacity", value_name = "BYTES")]
    pub cache_buffer_capacity: Option<usize>,

    /// Override the directory holding the init scripts.
    #[arg(long = "catalog-init-dir", value_name = "PATH")]
    pub init_dir: Option<PathBuf>,

    /// Reject crawler user agents.
    #[arg(
        long = "bot-filter-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub bot_filter_enabled: Option<bool>,
}
