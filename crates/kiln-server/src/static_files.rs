//! Static file serving from the working tree.
//!
//! Directory requests resolve to `index.html`. HTML responses get the live
//! reload client injected when live reload is enabled.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::live_reload::CLIENT_PATH;
use crate::state::AppState;

/// Serve the file addressed by the request path.
pub(crate) async fn serve_file(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response {
    let Some(relative) = request_path(req.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut path = state.root.join(relative);
    if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        path.push("index.html");
    }

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Failed to read file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let body = if mime.essence_str() == "text/html" && state.live_reload.is_some() {
        inject_client(content)
    } else {
        content
    };

    ([(header::CONTENT_TYPE, mime.to_string())], body).into_response()
}

/// Decode a URL path into a relative filesystem path.
///
/// Returns `None` for paths that are not valid UTF-8 or that try to leave the
/// served directory.
fn request_path(uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;

    let mut path = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

/// Insert the client script tag before the last `</body>`, or append it.
fn inject_client(html: Vec<u8>) -> Vec<u8> {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);

    let mut html = match String::from_utf8(html) {
        Ok(html) => html,
        // Served untouched
        Err(err) => return err.into_bytes(),
    };
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => html.insert_str(index, &tag),
        None => html.push_str(&tag),
    }
    html.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inject(html: &str) -> String {
        String::from_utf8(inject_client(html.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_inject_before_body_close() {
        assert_eq!(
            inject("<html><body><h1>Hi</h1></body></html>"),
            r#"<html><body><h1>Hi</h1><script src="/__kiln/livereload.js"></script></body></html>"#
        );
    }

    #[test]
    fn test_inject_is_case_insensitive() {
        assert_eq!(
            inject("<BODY>x</BODY>"),
            r#"<BODY>x<script src="/__kiln/livereload.js"></script></BODY>"#
        );
    }

    #[test]
    fn test_inject_appends_without_body() {
        assert_eq!(
            inject("<p>fragment</p>"),
            r#"<p>fragment</p><script src="/__kiln/livereload.js"></script>"#
        );
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/"), Some(PathBuf::new()));
        assert_eq!(request_path("/css/style.min.css"), Some(PathBuf::from("css/style.min.css")));
        assert_eq!(request_path("/images/my%20logo.png"), Some(PathBuf::from("images/my logo.png")));
        assert_eq!(request_path("/./index.html"), Some(PathBuf::from("index.html")));
    }

    #[test]
    fn test_request_path_rejects_traversal() {
        assert_eq!(request_path("/../secret.txt"), None);
        assert_eq!(request_path("/css/../../secret.txt"), None);
        assert_eq!(request_path("/%2e%2e/secret.txt"), None);
        assert_eq!(request_path("/..%5csecret.txt"), None);
    }
}
