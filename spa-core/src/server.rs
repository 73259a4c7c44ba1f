use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Bind a TCP listener on all interfaces at `port`.
///
/// Failure to bind is fatal for startup; callers propagate the error.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(%addr, error = %e, "Error starting TCP listener");
        e
    })?;
    Ok(listener)
}

/// Serve `app` until `signal` resolves, then drain in-flight requests for at
/// most `wait`.
///
/// Requests still running at the deadline are abandoned; the abort is logged
/// and the function still returns `Ok`.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    app: Router,
    wait: Duration,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let token = CancellationToken::new();
    let graceful = token.clone();
    let addr = listener.local_addr()?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { graceful.cancelled().await })
    .into_future();
    let mut server = tokio::spawn(server);
    info!(%addr, "Web server started");

    tokio::select! {
        result = &mut server => return flatten(result),
        _ = signal => {}
    }

    info!(?wait, "Shutdown signal received, draining connections");
    token.cancel();

    match tokio::time::timeout(wait, &mut server).await {
        Ok(result) => {
            flatten(result)?;
            info!("Web server stopped");
            Ok(())
        }
        Err(_) => {
            server.abort();
            warn!(?wait, "Server forced to shutdown, in-flight requests aborted");
            Ok(())
        }
    }
}

fn flatten(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> std::io::Result<()> {
    match result {
        Ok(inner) => inner,
        Err(join) => Err(std::io::Error::other(join)),
    }
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
