use super::*;

#[test]
fn defaults_resolve() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.listen.port(), DEFAULT_PORT);
    assert_eq!(settings.database.max_connections.get(), 25);
    assert!(settings.cache.enable_query_cache);
    assert_eq!(settings.cache.buffer_pool_size, 64);
    assert_eq!(settings.cache.buffer_capacity, 16 * 1024);
    assert!(settings.bot_filter.enabled);
    assert_eq!(
        settings.catalog.init_scripts.first(),
        Some(&PathBuf::from("db/0_schema.sql"))
    );
    assert_eq!(settings.catalog.init_scripts.len(), 3);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.enable_query_cache = Some(true);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_enable_query_cache: Some(false),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.listen.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(!settings.cache.enable_query_cache);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.database.max_connections = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero pool");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.max_connections",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.cache.buffer_capacity = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn bad_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".into());
    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn init_scripts_join_directory_in_order() {
    let mut raw = RawSettings::default();
    raw.catalog.init_dir = Some(PathBuf::from("/srv/sql"));
    raw.catalog.init_scripts = Some(vec!["b.sql".into(), "a.sql".into()]);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.catalog.init_scripts,
        vec![PathBuf::from("/srv/sql/b.sql"), PathBuf::from("/srv/sql/a.sql")]
    );

    let mut raw = RawSettings::default();
    raw.catalog.init_scripts = Some(Vec::new());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_bot_tokens_are_dropped() {
    let mut raw = RawSettings::default();
    raw.bot_filter.tokens = Some(vec!["crawlr".into(), "  ".into()]);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.bot_filter.tokens, vec!["crawlr".to_string()]);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["catalogd"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_initialize_arguments() {
    let args = CliArgs::parse_from([
        "catalogd",
        "initialize",
        "--database-url",
        "postgres://example",
        "--catalog-init-dir",
        "/srv/sql",
    ]);

    match args.command.expect("initialize command") {
        Command::Initialize(init) => {
            assert_eq!(
                init.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(init.init_dir.as_deref(), Some(std::path::Path::new("/srv/sql")));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "catalogd",
        "serve",
        "--server-host",
        "127.0.0.1",
        "--database-url",
        "postgres://override",
        "--bot-filter-enabled",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("127.0.0.1"));
            assert_eq!(
                serve.overrides.database.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.bot_filter_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}
