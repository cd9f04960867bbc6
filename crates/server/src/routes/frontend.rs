use std::path::Path;

use axum::{
    extract::Path as UrlPath,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use crate::error::ApiError;

const PAGE_CACHE_CONTROL: &str = "no-cache";
const DEFAULT_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(RustEmbed)]
#[folder = "../../frontend"]
pub struct Assets;

pub async fn serve_index() -> Response {
    serve_file("index.html")
}

pub async fn serve_trash_page() -> Response {
    serve_file("trash.html")
}

pub async fn serve_script(UrlPath(path): UrlPath<String>) -> Response {
    serve_file(&format!("js/{}", path.trim_start_matches('/')))
}

pub async fn serve_stylesheet(UrlPath(path): UrlPath<String>) -> Response {
    serve_file(&format!("css/{}", path.trim_start_matches('/')))
}

fn serve_file(path: &str) -> Response {
    let Some(content) = Assets::get(path) else {
        tracing::debug!(path, "Asset not found");
        return ApiError::NotFound("Page not found".to_string()).into_response();
    };

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CACHE_CONTROL,
                cache_control_for_path(path).to_string(),
            ),
        ],
        content.data.into_owned(),
    )
        .into_response()
}

fn cache_control_for_path(path: &str) -> &'static str {
    let is_page = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
    if is_page {
        PAGE_CACHE_CONTROL
    } else {
        DEFAULT_CACHE_CONTROL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_revalidated_and_assets_cached() {
        assert_eq!(cache_control_for_path("index.html"), PAGE_CACHE_CONTROL);
        assert_eq!(cache_control_for_path("js/main.js"), DEFAULT_CACHE_CONTROL);
        assert_eq!(cache_control_for_path("css/site.css"), DEFAULT_CACHE_CONTROL);
    }

    #[test]
    fn bundled_pages_are_embedded() {
        for path in ["index.html", "trash.html", "js/main.js", "js/trash.js", "css/site.css"] {
            assert!(Assets::get(path).is_some(), "missing {path}");
        }
        assert!(Assets::get("js/missing.js").is_none());
    }
}
