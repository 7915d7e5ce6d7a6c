use rolecase::capture::HttpPageCapture;
use rolecase::config::Config;
use rolecase::remote::HttpApi;
use rolecase::session::Session;
use rolecase::store::JobStore;
use rolecase::{create_app, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let store = JobStore::connect(&config.database_url).await?;
    let api = Arc::new(HttpApi::new(&config)?);
    let bind_addr = config.bind_addr.clone();

    let session = Session::start(config, store, api.clone(), api);
    let state = AppState {
        session: session.clone(),
        capture: Arc::new(HttpPageCapture::new()?),
    };

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    session.shutdown();
    Ok(())
}
