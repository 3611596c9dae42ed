//! Server lifecycle — bind, spawn the serve loop, hand back a shutdown
//! handle.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running chat API server.
pub struct ChatServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ChatServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("chat server shutdown signal sent");
        }
    }
}

/// Bind the listener, mount the router, and spawn the serve loop in a
/// background task. Port 0 binds an ephemeral port; the bound address
/// is on the returned handle.
pub async fn start_server(ctx: ApiContext, addr: SocketAddr) -> std::io::Result<ChatServer> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let app = api_router(ctx);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "chat server terminated");
        }
    });

    tracing::info!(%addr, "chat server listening");
    Ok(ChatServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}
