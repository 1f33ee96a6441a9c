use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::header::{self, HeaderMap, HeaderValue},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::{self, Config};
use crate::filename::FileKey;
use crate::models::{QrArtifact, StoredFile, QR_CONTENT_TYPE};
use crate::routes;
use crate::storage::{FileStore, StorageError};
use crate::views::{UploadView, Views};

/// Name of the multipart part carrying the upload.
pub const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FileStore>,
    pub views: Arc<Views>,
    pub base_url: Option<Url>,
    pub fallback_base_url: Url,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn FileStore>, config: &Config) -> anyhow::Result<Self> {
        Ok(AppState {
            store,
            views: Arc::new(Views::new().context("loading templates")?),
            base_url: config.base_url.clone(),
            fallback_base_url: config.fallback_base_url()?,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    /// Configured base URL, else the request's `Host`, else the bind address.
    fn public_base_url(&self, headers: &HeaderMap) -> Url {
        if let Some(base) = &self.base_url {
            return base.clone();
        }
        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .filter(|proto| matches!(*proto, "http" | "https"))
            .unwrap_or("http");
        host.and_then(|host| config::parse_base_url(&format!("{scheme}://{host}/")).ok())
            .unwrap_or_else(|| self.fallback_base_url.clone())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("file not found")]
    NotFound,
    #[error(transparent)]
    Storage(StorageError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Multipart(e) => e.into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, "File not found").into_response(),
            AppError::Storage(e) => {
                error!("storage failure: {:#}", anyhow::Error::new(e));
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
            }
            AppError::Internal(e) => {
                error!("{e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound,
            other => AppError::Storage(other),
        }
    }
}

pub async fn homepage_handler(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = state.views.index(FILE_FIELD).context("rendering upload form")?;
    Ok(Html(page))
}

pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let file = read_file_part(&mut multipart).await?;
    state.store.put(&file).await?;
    info!(key = %file.key, size = file.bytes.len(), sha256 = %file.digest(), "stored upload");

    let base = state.public_base_url(&headers);
    let download_url = routes::download_file_url(&base, &file.key)?;
    let qr = QrArtifact::generate(&file.key, download_url.as_str())
        .with_context(|| format!("generating QR code for {}", file.key))?;
    let qr_key = qr.key.clone();
    state.store.put(&qr.into_stored()).await?;
    info!(key = %qr_key, url = %download_url, "stored QR code");

    let page = state
        .views
        .upload_result(&UploadView {
            file_name: file.key.to_string(),
            download_url: download_url.to_string(),
            qr_download_path: routes::download_qr_path(&qr_key),
            qr_view_path: routes::view_qr_path(&qr_key),
        })
        .context("rendering upload result")?;
    Ok(Html(page))
}

/// Pulls the `file` part out of the form, skipping any other parts.
async fn read_file_part(multipart: &mut Multipart) -> Result<StoredFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        // A `file` part without a filename is a plain text field, not an upload.
        let filename = match (field.name(), field.file_name()) {
            (Some(FILE_FIELD), Some("")) => return Err(AppError::Validation("No selected file")),
            (Some(FILE_FIELD), Some(name)) => name.to_owned(),
            _ => continue,
        };
        let key = FileKey::sanitize(&filename).map_err(|_| AppError::Validation("Invalid file name"))?;
        let bytes = field.bytes().await?;
        return Ok(StoredFile::new(key, bytes));
    }
    Err(AppError::Validation("No file part"))
}

/// Serves a stored file (original or QR code) as an attachment.
pub async fn download_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let file = fetch(&state, &name).await?;
    attachment(file)
}

pub async fn view_qr_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let file = fetch(&state, &name).await?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(QR_CONTENT_TYPE));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    Ok((headers, file.bytes).into_response())
}

async fn fetch(state: &AppState, name: &str) -> Result<StoredFile, AppError> {
    let key = FileKey::parse(name).map_err(|_| AppError::NotFound)?;
    Ok(state.store.get(&key).await?)
}

fn attachment(file: StoredFile) -> Result<Response, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&file.content_type).context("invalid stored content type")?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.key))
            .context("invalid content disposition")?,
    );
    headers.insert(
        header::ETAG,
        HeaderValue::from_str(&format!("\"{}\"", file.digest())).context("invalid etag")?,
    );
    Ok((headers, file.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::LocalStore;

    async fn state(base_url: Option<&str>) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            address: "10.0.0.5:8080".parse().unwrap(),
            base_url: base_url.map(|raw| config::parse_base_url(raw).unwrap()),
            max_upload_bytes: 1024,
            storage: StorageConfig::Local {
                root: dir.path().to_path_buf(),
            },
        };
        let store = Arc::new(LocalStore::create(dir.path()).await.unwrap());
        (AppState::new(store, &config).unwrap(), dir)
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[tokio::test]
    async fn configured_base_url_wins() {
        let (state, _dir) = state(Some("https://files.example.com")).await;
        let base = state.public_base_url(&headers(&[("host", "other.example")]));
        assert_eq!(base.as_str(), "https://files.example.com/");
    }

    #[tokio::test]
    async fn host_header_is_used_when_unconfigured() {
        let (state, _dir) = state(None).await;
        let base = state.public_base_url(&headers(&[("host", "qr.example:9000")]));
        assert_eq!(base.as_str(), "http://qr.example:9000/");

        let base = state.public_base_url(&headers(&[
            ("host", "qr.example"),
            ("x-forwarded-proto", "https"),
        ]));
        assert_eq!(base.as_str(), "https://qr.example/");
    }

    #[tokio::test]
    async fn bind_address_is_the_last_resort() {
        let (state, _dir) = state(None).await;
        assert_eq!(state.public_base_url(&HeaderMap::new()).as_str(), "http://10.0.0.5:8080/");

        let base = state.public_base_url(&headers(&[("host", "bad host/")]));
        assert_eq!(base.as_str(), "http://10.0.0.5:8080/");
    }

    #[test]
    fn storage_not_found_maps_to_not_found() {
        let key = FileKey::sanitize("a.txt").unwrap();
        let response = AppError::from(StorageError::NotFound(key)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let io = std::io::Error::other("disk on fire");
        let response = AppError::from(StorageError::Io(io)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
