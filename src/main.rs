mod action;
mod frame;
mod routes;
mod services;
mod state;

use std::future::IntoFuture;

use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "4000".into())
        .parse()
        .expect("invalid PORT");

    // Closing the board is the only way the server stops on its own.
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let state = state::AppState::new(shutdown_tx);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "sketchroom listening");
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result.expect("server failed"),
        // The close-board grace delay has already elapsed by the time this
        // fires; dropping the serve future ends every connection.
        _ = shutdown_rx.recv() => tracing::info!("room closed, exiting"),
    }
}
