use tracing_subscriber::EnvFilter;

use tagarena_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    let json_logs = std::env::var("TAGARENA_LOG_JSON").is_ok_and(|v| v == "1");
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = ServerConfig::load();
    config.validate();

    let addr = config.listen_addr.clone();
    let (app, _state) = tagarena_server::build_app(config);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind listen address");
            std::process::exit(1);
        },
    };

    tracing::info!(%addr, "Tagarena server listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server exited with error");
    }
}
