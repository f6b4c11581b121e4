//! HTTP server lifecycle.
//!
//! bind → serve until the shutdown signal fires → drain in-flight requests.
//! `serve_until_ctrl_c` is the variant used by the binary.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

async fn bind(addr: SocketAddr) -> Result<TcpListener, String> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))
}

/// Serve `app` on an already bound listener until `signal` resolves.
pub async fn serve_with_shutdown<S>(
    listener: TcpListener,
    app: Router,
    signal: S,
) -> Result<(), String>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    tracing::info!("API server stopped");
    Ok(())
}

/// Serve `app` on `addr` until Ctrl-C, then drain in-flight requests.
pub async fn serve_until_ctrl_c(addr: SocketAddr, app: Router) -> Result<(), String> {
    let listener = bind(addr).await?;
    serve_with_shutdown(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        tracing::info!("Ctrl-C received, shutting down");
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    use crate::api::router::api_router;
    use crate::api::types::{ApiContext, Profiles};
    use crate::pipeline::analysis::{MockAnalysisProvider, ReportAnalyzer, SamplingParams};
    use crate::pipeline::extraction::{MockOcrProvider, TextExtractor};
    use crate::pipeline::translation::{IdentityTranslator, SectionTranslator};
    use crate::pipeline::upload::ArtifactStore;
    use crate::pipeline::ReportProcessor;

    fn test_app(dir: &std::path::Path) -> Router {
        let processor = ReportProcessor::new(
            ArtifactStore::new(dir),
            TextExtractor::new(
                Arc::new(MockOcrProvider::new("Hemoglobin 13.5 g/dL")),
                "eng",
                Duration::from_secs(5),
            ),
            ReportAnalyzer::new(
                Arc::new(MockAnalysisProvider::new("1. Symptoms:\nNone")),
                SamplingParams::default(),
                Duration::from_secs(5),
            ),
            SectionTranslator::new(
                Arc::new(IdentityTranslator::new()),
                "en",
                Duration::from_secs(5),
            ),
        );
        let ctx = ApiContext::new(Arc::new(processor), Profiles::with_max_upload(1024 * 1024));
        api_router(ctx, &[])
    }

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    async fn spawn_server(
        app: Router,
    ) -> (u16, oneshot::Sender<()>, JoinHandle<Result<(), String>>) {
        let listener = bind(localhost()).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve_with_shutdown(listener, app, async move {
            let _ = rx.await;
        }));
        (port, tx, handle)
    }

    #[tokio::test]
    async fn serves_health_and_stops_on_signal() {
        let dir = tempfile::tempdir().unwrap();
        let (port, stop, handle) = spawn_server(test_app(dir.path())).await;

        let url = format!("http://127.0.0.1:{port}/api/health");
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");

        stop.send(()).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server should stop after the signal")
            .unwrap();
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn unknown_route_is_404_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let (port, stop, handle) = spawn_server(test_app(dir.path())).await;

        let url = format!("http://127.0.0.1:{port}/nonexistent");
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let _ = stop.send(());
        let _ = handle.await;
    }

    #[tokio::test]
    async fn ctrl_c_server_reports_bind_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let taken = TcpListener::bind(localhost()).await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = serve_until_ctrl_c(addr, test_app(dir.path()))
            .await
            .unwrap_err();
        assert!(err.contains("Failed to bind"));
    }
}
