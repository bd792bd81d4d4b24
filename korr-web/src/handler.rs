use crate::cgi::{self, CgiRequest};
use crate::content_type::content_type_for;
use crate::path::resolve_path;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct WebState {
    pub webserv_dir: Arc<PathBuf>,
}

/// True when the path's extension is `.cgi` and the file is executable by
/// others, matching `webserv.c`'s `S_IXOTH` check.
fn is_cgi_script(path: &std::path::Path) -> bool {
    let is_cgi_ext = path.extension().and_then(|e| e.to_str()) == Some("cgi");
    if !is_cgi_ext {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o001 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}

pub async fn dispatch(
    State(state): State<WebState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !matches!(method, Method::GET | Method::POST | Method::HEAD) {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let raw_path = uri.path();
    let resolved = resolve_path(&state.webserv_dir, raw_path);

    let metadata = match std::fs::metadata(&resolved) {
        Ok(meta) => meta,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };
    if !metadata.is_file() {
        return StatusCode::NOT_FOUND.into_response();
    }

    if is_cgi_script(&resolved) {
        let req = CgiRequest {
            method: &method,
            request_uri: raw_path,
            query_string: uri.query(),
            server_protocol: "HTTP/1.1",
            remote_addr,
            document_root: &state.webserv_dir,
            headers: &headers,
            body,
        };
        return match cgi::run(&resolved, req).await {
            Ok(output) => output.into_response(),
            Err(error) => {
                tracing::warn!(path = %resolved.display(), %error, "cgi execution failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    match std::fs::read(&resolved) {
        Ok(contents) => {
            let extension = resolved.extension().and_then(|e| e.to_str()).unwrap_or("");
            let content_type = content_type_for(extension);
            ([("Content-Type", content_type)], contents).into_response()
        }
        Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => {
            StatusCode::FORBIDDEN.into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::net::Ipv4Addr;
    use tower::ServiceExt;

    fn router(dir: &std::path::Path) -> Router {
        crate::router(WebState { webserv_dir: Arc::new(dir.to_path_buf()) })
    }

    fn peer() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::new(127, 0, 0, 1), 54321))
    }

    #[tokio::test]
    async fn serves_a_static_file_with_its_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/")
                    .extension(ConnectInfo(peer()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html"
        );
    }

    #[tokio::test]
    async fn missing_file_is_a_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/nope.html")
                    .extension(ConnectInfo(peer()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn disallowed_method_is_a_405() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "ok").unwrap();
        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/index.html")
                    .extension(ConnectInfo(peer()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn traversal_outside_the_root_resolves_under_root_and_404s() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "ok").unwrap();

        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/%2e%2e/%2e%2e/etc/passwd")
                    .extension(ConnectInfo(peer()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cgi_script_response_has_no_content_type_header() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hello.cgi");
        std::fs::write(&script, "#!/bin/sh\necho -n hi\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let response = router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/hello.cgi")
                    .extension(ConnectInfo(peer()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("content-type").is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"hi");
    }
}
