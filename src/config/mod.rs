//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::*;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "catalogd";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 1323;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_BUFFER_POOL_SIZE: usize = 64;
const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;
const DEFAULT_INIT_DIR: &str = "db";
const DEFAULT_INIT_SCRIPTS: &[&str] = &["0_schema.sql", "1_estate_seed.sql", "2_chair_seed.sql"];
const DEFAULT_BOT_TOKENS: &[&str] = &["ISUCONbot", "Mediapartners-ISUCON", "isubot"];

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub catalog: CatalogSettings,
    pub bot_filter: BotFilterSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enable_query_cache: bool,
    pub buffer_pool_size: usize,
    pub buffer_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Init scripts in execution order, already joined with their directory.
    pub init_scripts: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BotFilterSettings {
    pub enabled: bool,
    pub tokens: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("CATALOGD")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("bot_filter.tokens")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Initialize(args)) => raw.apply_initialize_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    catalog: RawCatalogSettings,
    bot_filter: RawBotFilterSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(limit) = overrides.server_max_upload_bytes {
            self.server.max_upload_bytes = Some(limit);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(enabled) = overrides.cache_enable_query_cache {
            self.cache.enable_query_cache = Some(enabled);
        }
        if let Some(size) = overrides.cache_buffer_pool_size {
            self.cache.buffer_pool_size = Some(size);
        }
        if let Some(capacity) = overrides.cache_buffer_capacity {
            self.cache.buffer_capacity = Some(capacity);
        }
        if let Some(dir) = overrides.init_dir.as_ref() {
            self.catalog.init_dir = Some(dir.clone());
        }
        if let Some(enabled) = overrides.bot_filter_enabled {
            self.bot_filter.enabled = Some(enabled);
        }

        self.apply_database_override(&overrides.database);
    }

    fn apply_initialize_overrides(&mut self, args: &InitializeArgs) {
        self.apply_database_override(&args.database);
        if let Some(dir) = args.init_dir.as_ref() {
            self.catalog.init_dir = Some(dir.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            catalog,
            bot_filter,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            catalog: build_catalog_settings(catalog)?,
            bot_filter: build_bot_filter_settings(bot_filter),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let listen = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.listen", reason))?;

    let upload_value = server.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    if upload_value == 0 {
        return Err(LoadError::invalid(
            "server.max_upload_bytes",
            "must be greater than zero",
        ));
    }
    let max_upload_bytes = usize::try_from(upload_value).map_err(|_| {
        LoadError::invalid(
            "server.max_upload_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(ServerSettings {
        listen,
        max_upload_bytes,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_value).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = cache.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
    let buffer_capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
        LoadError::invalid("cache.buffer_capacity", "must be greater than zero")
    })?;

    Ok(CacheSettings {
        enable_query_cache: cache.enable_query_cache.unwrap_or(true),
        buffer_pool_size: cache.buffer_pool_size.unwrap_or(DEFAULT_BUFFER_POOL_SIZE),
        buffer_capacity: buffer_capacity.get(),
    })
}

fn build_catalog_settings(catalog: RawCatalogSettings) -> Result<CatalogSettings, LoadError> {
    let dir = catalog
        .init_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INIT_DIR));
    if dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "catalog.init_dir",
            "path must not be empty",
        ));
    }

    let names = catalog.init_scripts.unwrap_or_else(|| {
        DEFAULT_INIT_SCRIPTS
            .iter()
            .map(|name| (*name).to_string())
            .collect()
    });
    if names.is_empty() {
        return Err(LoadError::invalid(
            "catalog.init_scripts",
            "at least one script is required",
        ));
    }
    if let Some(blank) = names.iter().find(|name| name.trim().is_empty()) {
        return Err(LoadError::invalid(
            "catalog.init_scripts",
            format!("script name `{blank}` is empty"),
        ));
    }

    Ok(CatalogSettings {
        init_scripts: names.iter().map(|name| dir.join(name.trim())).collect(),
    })
}

fn build_bot_filter_settings(bot_filter: RawBotFilterSettings) -> BotFilterSettings {
    let tokens = bot_filter
        .tokens
        .unwrap_or_else(|| {
            DEFAULT_BOT_TOKENS
                .iter()
                .map(|token| (*token).to_string())
                .collect()
        })
        .into_iter()
        .filter(|token| !token.trim().is_empty())
        .collect();

    BotFilterSettings {
        enabled: bot_filter.enabled.unwrap_or(true),
        tokens,
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enable_query_cache: Option<bool>,
    buffer_pool_size: Option<usize>,
    buffer_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    init_dir: Option<PathBuf>,
    init_scripts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBotFilterSettings {
    enabled: Option<bool>,
    tokens: Option<Vec<String>>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests;
