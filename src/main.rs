use std::{process, sync::Arc};

use sqlx::PgPool;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use trellis::{
    application::{
        cache::{CacheError, KeyValueStore, PostCache},
        error::AppError,
        posts::PostService,
        propagation::Propagator,
        reindex::Reindexer,
        repos::{ActivityRepo, PostsRepo, PostsWriteRepo},
        search::SearchIndex,
    },
    config::{self, CacheBackend},
    infra::{
        cache::{MemoryStore, RedisStore},
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, DatabaseProbe},
        search::ElasticsearchIndex,
        startup::connect_with_retry,
        telemetry,
    },
};

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
        config::Command::Reindex(args) => run_reindex(settings, args).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache_store = init_cache_store(&settings).await?;
    let search = init_search_index(&settings).await?;

    let propagator = Propagator::new(settings.propagation.max_in_flight.get());
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let activity_repo: Arc<dyn ActivityRepo> = repositories.clone();
    let db_probe: Arc<dyn DatabaseProbe> = repositories.clone();

    let service = Arc::new(PostService::new(
        posts_repo,
        posts_write_repo,
        activity_repo,
        PostCache::new(cache_store, settings.cache.ttl),
        search,
        propagator.clone(),
    ));

    serve_http(&settings, ApiState::new(service, db_probe)).await?;

    let pending = propagator.in_flight();
    if pending > 0 {
        info!(
            target = "trellis::shutdown",
            pending, "waiting for in-flight propagations"
        );
    }
    if tokio::time::timeout(settings.server.graceful_shutdown, propagator.wait_idle())
        .await
        .is_err()
    {
        warn!(
            target = "trellis::shutdown",
            pending = propagator.in_flight(),
            "shutdown timeout reached; dropping in-flight propagations"
        );
    }

    Ok(())
}

async fn run_reindex(
    settings: config::Settings,
    args: config::ReindexArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let search = init_search_index(&settings).await?;

    let mut reindexer = Reindexer::new(search, args.concurrency.clamp(1, 64));
    if args.flush_cache {
        let cache_store = init_cache_store(&settings).await?;
        reindexer = reindexer.with_cache_flush(PostCache::new(cache_store, settings.cache.ttl));
    }

    info!(
        target = "trellis::reindex",
        concurrency = args.concurrency,
        flush_cache = args.flush_cache,
        "Starting reindex"
    );

    let report = reindexer.run(repositories.stream_all_posts()).await?;
    AppError::check_reindex(&report)
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    migrate(&pool).await?;

    info!(target = "trellis::migrate", "migrations applied");
    Ok(())
}

fn database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)
}

async fn connect_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = database_url(settings)?;
    connect_with_retry("postgres", &settings.startup, || {
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
    })
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn migrate(pool: &PgPool) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;
    migrate(&pool).await?;
    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn init_cache_store(
    settings: &config::Settings,
) -> Result<Arc<dyn KeyValueStore>, AppError> {
    match settings.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new(settings.cache.memory_capacity))),
        CacheBackend::Redis => {
            let url = settings.cache.url.as_str();
            let store = connect_with_retry("redis", &settings.startup, || async move {
                let store = RedisStore::connect(url).await?;
                store.ping().await?;
                Ok::<_, CacheError>(store)
            })
            .await
            .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            Ok(Arc::new(store))
        }
    }
}

async fn init_search_index(
    settings: &config::Settings,
) -> Result<Arc<dyn SearchIndex>, AppError> {
    let index = ElasticsearchIndex::new(
        &settings.search.url,
        &settings.search.index,
        settings.search.timeout,
    )
    .map_err(|err| AppError::from(InfraError::search(err.to_string())))?;

    connect_with_retry("elasticsearch", &settings.startup, || index.ensure_index())
        .await
        .map_err(|err| AppError::from(InfraError::search(err.to_string())))?;

    info!(
        target = "trellis::search",
        index = index.index_name(),
        "search index ready"
    );
    Ok(Arc::new(index))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "trellis::http",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "trellis::shutdown", "shutdown signal received");
}
