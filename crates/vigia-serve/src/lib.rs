// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vigia-serve
//!
//! The service loop: a read-only static-file HTTP server.
//!
//! Files are served by `tower-http`'s [`ServeDir`], which resolves every
//! request relative to the configured root and refuses `..` traversal.
//! Connections are handled as independent tasks on a multi-threaded tokio
//! runtime, so one slow client never holds up another.
//!
//! The runtime is built by [`serve_forever`] and therefore only exists after
//! the process has been daemonized; forking with live runtime threads is not
//! sound.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::Path;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use vigia_core::{DaemonError, Result, ServeConfig};

/// Builds the static-file router rooted at `root`.
pub fn router(root: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root.as_ref()))
        .layer(TraceLayer::new_for_http())
}

/// Serves `root` on an already bound listener until the process ends.
///
/// # Errors
/// Returns [`DaemonError::Serve`] if the accept loop fails.
pub async fn serve(listener: TcpListener, root: &Path) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, root = %root.display(), "serving static files");

    axum::serve(listener, router(root))
        .await
        .map_err(|e| DaemonError::serve(format!("server on {addr} failed: {e}")))
}

/// Binds the configured address and serves it.
///
/// # Errors
/// Returns [`DaemonError::Serve`] if the address cannot be bound.
pub async fn run(config: &ServeConfig) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| DaemonError::serve(format!("failed to bind {addr}: {e}")))?;
    serve(listener, &config.root).await
}

/// Changes into the served directory, builds a multi-threaded runtime and
/// blocks in [`run`].
///
/// Only returns on error; a running server ends with the process.
///
/// # Errors
/// Returns an error if the directory cannot be entered, the runtime cannot
/// be built, or the server fails.
pub fn serve_forever(config: &ServeConfig) -> Result<()> {
    std::env::set_current_dir(&config.root).map_err(|e| {
        DaemonError::serve(format!(
            "cannot enter served directory {}: {e}",
            config.root.display()
        ))
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vigia-http")
        .build()?;

    runtime.block_on(run(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hello, vigia\n").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("index.html"), b"<h1>docs</h1>").unwrap();
        dir
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_serves_exact_bytes() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/hello.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"hello, vigia\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = site();
        let (status, _) = get(router(dir.path()), "/nope.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_directory_serves_index_html() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/docs/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_traversal_outside_root_rejected() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
        let root = outer.path().join("public");
        std::fs::create_dir(&root).unwrap();

        let (status, body) = get(router(&root), "/../secret.txt").await;
        assert_ne!(status, StatusCode::OK);
        assert_ne!(body, b"secret");
    }

    #[tokio::test]
    async fn test_bind_failure_is_serve_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServeConfig {
            root: std::env::temp_dir(),
            bind: "127.0.0.1".parse().unwrap(),
            port: taken.local_addr().unwrap().port(),
        };

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, DaemonError::Serve(_)));
        assert!(err.to_string().contains("failed to bind"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stalled_client_does_not_block_others() {
        let dir = site();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let root = dir.path().to_path_buf();
        tokio::spawn(async move { serve(listener, &root).await });

        // Half a request line, never finished.
        let mut stalled = TcpStream::connect(addr).await.unwrap();
        stalled.write_all(b"GET /hello.txt HT").await.unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /hello.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut response))
            .await
            .expect("second client was blocked")
            .unwrap();

        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 200 OK"), "got: {text}");
        assert!(text.ends_with("hello, vigia\n"));
        drop(stalled);
    }
}
