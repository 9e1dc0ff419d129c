use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting up logging: {:?}", e);
        return std::process::ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Building runtime: {:?}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting");

    match runtime.block_on(run()) {
        Ok(()) => {
            tracing::info!("Stopped");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = listings_analyzer::Config::load().await?;
    tracing::info!(?config, "Loaded config");

    // Owns the pooled http client, dropped once the server has shut down
    let state = listings_analyzer::build_state(&config)?;
    let app = listings_analyzer::api::router(state);

    tracing::info!("Listening on {}", config.listen_addr);

    axum::Server::try_bind(&config.listen_addr)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Waiting for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutting down");
}
