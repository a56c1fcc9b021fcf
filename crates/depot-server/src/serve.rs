//! Service assembly and the accept loop
//!
//! Connections are accepted by hand rather than through a canned serve
//! helper: the upgrade protocol needs the loop to stop on the drain signal,
//! and every accepted socket gets a short linger so the final close never
//! outlives the delayed exit.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::branches::{get_branches, post_branches};
use crate::error::Result;
use crate::packages::{delete_packages, get_packages, post_package};
use crate::state::AppState;
use crate::upgrade::post_upgrade;

const CLOSE_LINGER: Duration = Duration::from_secs(1);

/// The full route table over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/branches", get(get_branches).post(post_branches))
        .route(
            "/packages/{branch}",
            get(get_packages).post(post_package).delete(delete_packages),
        )
        .route("/upgrade", post(post_upgrade))
        // package archives and executable images dwarf the default cap
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, optionally signal readiness, and accept connections until an
/// upgrade drains the service.
pub async fn serve(state: AppState, addr: impl ToSocketAddrs, notify: bool) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Start listening on {}", listener.local_addr()?);

    if notify {
        debug!("Notifying the supervisor about successful start");
        if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
            warn!("Readiness notification failed: {e}");
        }
    }

    let mut drain = state.upgrade.subscribe();
    let app = router(state);

    loop {
        tokio::select! {
            changed = drain.changed() => {
                if changed.is_ok() {
                    warn!("Draining, no longer accepting connections");
                }
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Accept failed: {e}");
                        continue;
                    }
                };
                debug!("Accepted connection from {peer}");
                let _ = stream.set_linger(Some(CLOSE_LINGER));

                let service = TowerToHyperService::new(app.clone());
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        debug!("Connection from {peer} ended with error: {e}");
                    }
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{package_bytes, test_state, write_package};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_branch_lifecycle_over_http() {
        let temp = TempDir::new().unwrap();
        let app = router(test_state(temp.path()));

        let response = app
            .clone()
            .oneshot(Request::get("/branches").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "No entries.");

        let response = app
            .clone()
            .oneshot(
                Request::post("/branches")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "stable"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::get("/branches").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "stable: 0 item(s)");
    }

    #[tokio::test]
    async fn test_package_routes() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("stable");
        std::fs::create_dir(&dir).unwrap();
        write_package(&dir.join("alpha-1.0-1.pkg.tar.zst"), "alpha");
        let app = router(test_state(temp.path()));

        let response = app
            .clone()
            .oneshot(Request::get("/packages/stable").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "alpha-1.0-1.pkg.tar.zst");

        let response = app
            .clone()
            .oneshot(Request::get("/packages/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(
                Request::get("/packages/stable?name=ghost-1.0-1.pkg.tar.zst")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(
                Request::get("/packages/stable?name=alpha-1.0-1.pkg.tar.zst")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let served = response.into_body().collect().await.unwrap().to_bytes();
        let on_disk = std::fs::read(dir.join("alpha-1.0-1.pkg.tar.zst")).unwrap();
        assert_eq!(served.as_ref(), on_disk.as_slice());

        let response = app
            .clone()
            .oneshot(
                Request::post("/packages/stable?name=beta-1.0-1.pkg.tar.zst")
                    .body(Body::from(package_bytes("beta")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(dir.join("beta-1.0-1.pkg.tar.zst").exists());

        let response = app
            .clone()
            .oneshot(
                Request::delete("/packages/stable?names=alpha,ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!dir.join("alpha-1.0-1.pkg.tar.zst").exists());
        assert!(dir.join("beta-1.0-1.pkg.tar.zst").exists());
    }

    #[tokio::test]
    async fn test_publish_corrupt_upload_is_client_error() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("stable")).unwrap();
        let app = router(test_state(temp.path()));

        let response = app
            .oneshot(
                Request::post("/packages/stable?name=junk-1.0-1.pkg.tar.zst")
                    .body(Body::from("not a package"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upgrade_with_empty_body_rejected() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());
        std::fs::write(state.upgrade.exe_path(), b"running image").unwrap();
        let app = router(state.clone());

        let response = app
            .oneshot(Request::post("/upgrade").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // executable byte-identical, service still running
        assert_eq!(
            std::fs::read(state.upgrade.exe_path()).unwrap(),
            b"running image"
        );
    }
}
