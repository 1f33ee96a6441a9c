use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::filename::FileKey;
use crate::handlers::{download_handler, homepage_handler, upload_handler, view_qr_handler, AppState};

const DOWNLOAD_FILE: &str = "download-file";
const DOWNLOAD_QR: &str = "download-qr-code";
const VIEW_QR: &str = "view-qr-code";

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(homepage_handler))
        .route("/upload", post(upload_handler))
        .route(&format!("/{DOWNLOAD_FILE}/{{name}}"), get(download_handler))
        .route(&format!("/{DOWNLOAD_QR}/{{name}}"), get(download_handler))
        .route(&format!("/{VIEW_QR}/{{name}}"), get(view_qr_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Absolute URL a client (or a scanned QR code) downloads `key` from.
pub fn download_file_url(base: &Url, key: &FileKey) -> Result<Url> {
    base.join(&format!("{DOWNLOAD_FILE}/{key}"))
        .with_context(|| format!("building download URL for {key} under {base}"))
}

pub fn download_qr_path(key: &FileKey) -> String {
    format!("/{DOWNLOAD_QR}/{key}")
}

pub fn view_qr_path(key: &FileKey) -> String {
    format!("/{VIEW_QR}/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> FileKey {
        FileKey::sanitize(name).unwrap()
    }

    #[test]
    fn download_url_appends_to_base_path() {
        let base = Url::parse("https://files.example.com/qr/").unwrap();
        assert_eq!(
            download_file_url(&base, &key("report.pdf")).unwrap().as_str(),
            "https://files.example.com/qr/download-file/report.pdf"
        );

        let base = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            download_file_url(&base, &key("a.txt")).unwrap().as_str(),
            "http://127.0.0.1:8080/download-file/a.txt"
        );
    }

    #[test]
    fn qr_paths() {
        let qr = key("report.pdf").qr_companion();
        assert_eq!(download_qr_path(&qr), "/download-qr-code/report_QR.png");
        assert_eq!(view_qr_path(&qr), "/view-qr-code/report_QR.png");
    }
}
