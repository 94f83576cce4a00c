use std::{process, sync::Arc};

use catalogd::{
    application::{
        chairs::ChairService,
        error::AppError,
        estates::EstateService,
        maintenance::MaintenanceService,
        repos::{ChairsRepo, EstatesRepo, MaintenanceRepo},
    },
    cache::{CacheConfig, CatalogCaches},
    config,
    domain::conditions::SearchConditions,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AppState, BotFilter, RouterOptions},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Initialize(_) => run_initialize(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_application_state(repositories, &settings)?;

    let (chairs, estates) = state.maintenance.preload().await?;
    info!(chairs, estates, "Entity caches preloaded");

    serve_http(&settings, state).await
}

async fn run_initialize(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_application_state(repositories, &settings)?;

    let response = state.maintenance.initialize().await?;
    info!(
        target = "catalogd::initialize",
        language = %response.language,
        "Initialization completed"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let repositories = PostgresRepositories::new(pool);
    repositories
        .health_check()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(repositories))
}

fn build_application_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<AppState, AppError> {
    let chairs_repo: Arc<dyn ChairsRepo> = repositories.clone();
    let estates_repo: Arc<dyn EstatesRepo> = repositories.clone();
    let maintenance_repo: Arc<dyn MaintenanceRepo> = repositories;

    let conditions = Arc::new(SearchConditions::bundled().map_err(InfraError::from)?);
    let caches = CatalogCaches::new(&CacheConfig::from(&settings.cache));
    if !settings.cache.enable_query_cache {
        warn!("Query cache disabled; every search goes to the database");
    }

    let chairs = ChairService::new(
        caches.chairs.clone(),
        chairs_repo,
        Arc::new(conditions.chair.clone()),
    );
    let estates = EstateService::new(
        caches.estates.clone(),
        estates_repo,
        caches.chairs.clone(),
        Arc::new(conditions.estate.clone()),
    );
    let maintenance = MaintenanceService::new(
        maintenance_repo,
        settings.catalog.init_scripts.clone(),
        chairs.clone(),
        estates.clone(),
    );

    Ok(AppState {
        chairs: Arc::new(chairs),
        estates: Arc::new(estates),
        maintenance: Arc::new(maintenance),
        conditions,
    })
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let bot_filter = settings
        .bot_filter
        .enabled
        .then(|| BotFilter::new(settings.bot_filter.tokens.clone()));
    let router = http::build_router(
        state,
        RouterOptions {
            bot_filter,
            max_upload_bytes: Some(settings.server.max_upload_bytes),
        },
    );

    let listener = tokio::net::TcpListener::bind(settings.server.listen)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.listen, "Listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
