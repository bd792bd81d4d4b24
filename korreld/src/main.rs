mod cli;
mod state;
mod tasks;

use anyhow::{Context, Result};
use clap::Parser;
use korr_ingest::{AlertSource, TextTailSource};
use korr_outdb::OutputSink;
use state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(any(feature = "postgres", feature = "mysql"))]
use korr_config::DbKind;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[cfg(feature = "postgres")]
async fn connect_postgres(database: &korr_config::DatabaseConfig) -> Result<sqlx::PgPool> {
    let url = format!(
        "postgres://{}:{}@{}:{}/{}",
        database.user, database.password, database.host, database.port, database.name
    );
    sqlx::PgPool::connect(&url).await.context("connecting to postgres output database")
}

#[cfg(feature = "mysql")]
async fn connect_mysql(database: &korr_config::DatabaseConfig) -> Result<sqlx::MySqlPool> {
    let url = format!(
        "mysql://{}:{}@{}:{}/{}",
        database.user, database.password, database.host, database.port, database.name
    );
    sqlx::MySqlPool::connect(&url).await.context("connecting to mysql output database")
}

#[allow(unused_variables)]
async fn build_output_sink(
    database: &Option<korr_config::DatabaseConfig>,
) -> Result<Option<Box<dyn OutputSink>>> {
    let Some(database) = database else {
        return Ok(None);
    };

    #[cfg(feature = "postgres")]
    if database.kind == DbKind::Postgres {
        let pool = connect_postgres(database).await?;
        return Ok(Some(Box::new(korr_outdb::PostgresSink::new(pool)) as Box<dyn OutputSink>));
    }
    #[cfg(feature = "mysql")]
    if database.kind == DbKind::Mysql {
        let pool = connect_mysql(database).await?;
        return Ok(Some(Box::new(korr_outdb::MySqlSink::new(pool)) as Box<dyn OutputSink>));
    }

    tracing::warn!("output database dialect not compiled into this build; persistence disabled");
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = cli::Cli::parse();
    let config = korr_config::load_config(cli.config.as_deref()).context("loading configuration")?;
    info!(webserv_port = config.webserv_port, "configuration loaded");

    let output_sink = build_output_sink(&config.output_database).await?;
    let state = Arc::new(AppState::build(config, output_sink)?);

    let source: Arc<dyn AlertSource + Send + Sync> =
        Arc::new(TextTailSource::new(state.config.alertfile.clone(), Some(state.tracker.clone()))
            .context("opening alert text source")?);

    let token = CancellationToken::new();

    let web_state = korr_web::WebState { webserv_dir: Arc::new(state.config.webserv_dir.clone()) };
    let web_router = korr_web::router(web_state);
    let web_addr = std::net::SocketAddr::from(([0, 0, 0, 0], state.config.webserv_port));
    let web_token = token.clone();
    let web_server = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(web_addr).await {
            Ok(listener) => listener,
            Err(error) => {
                tracing::error!(%error, "failed to bind http listener");
                return;
            }
        };
        info!(%web_addr, "http surface listening");
        let serve = axum::serve(
            listener,
            web_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(async move { web_token.cancelled().await });
        if let Err(error) = serve.await {
            tracing::error!(%error, "http server exited with an error");
        }
    });

    let mut handles = vec![web_server];
    macro_rules! spawn_task {
        ($f:path) => {
            handles.push(tokio::spawn($f(state.clone(), token.clone())));
        };
    }
    handles.push(tokio::spawn(tasks::ingest_task(state.clone(), source, token.clone())));
    spawn_task!(tasks::clustering_task);
    spawn_task!(tasks::correlation_task);
    spawn_task!(tasks::serialization_task);
    spawn_task!(tasks::manual_reload_task);
    spawn_task!(tasks::stream_sweep_task);
    spawn_task!(tasks::hashtable_cleanup_task);
    spawn_task!(tasks::neural_training_task);

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown requested, finishing in-flight work");
    token.cancel();

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
