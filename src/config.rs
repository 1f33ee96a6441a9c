use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub address: SocketAddr,
    /// Public base URL for download links; derived per request when unset.
    pub base_url: Option<Url>,
    pub max_upload_bytes: usize,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Local { root: PathBuf },
    S3(S3Config),
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let ip: IpAddr = var("QRDROP_ADDRESS")
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .context("QRDROP_ADDRESS is not an IP address")?;
        let port: u16 = var("QRDROP_PORT")
            .as_deref()
            .unwrap_or("8080")
            .parse()
            .context("QRDROP_PORT is not a port number")?;

        let base_url = var("QRDROP_BASE_URL")
            .map(|raw| parse_base_url(&raw))
            .transpose()
            .context("QRDROP_BASE_URL is not a valid URL")?;

        let max_upload_mb: usize = match var("QRDROP_MAX_UPLOAD_MB") {
            Some(raw) => raw.parse().context("QRDROP_MAX_UPLOAD_MB is not a number")?,
            None => DEFAULT_MAX_UPLOAD_MB,
        };

        let storage = match var("QRDROP_STORAGE").as_deref().unwrap_or("local") {
            "local" => StorageConfig::Local {
                root: var("QRDROP_UPLOAD_DIR")
                    .unwrap_or_else(|| "uploads".to_owned())
                    .into(),
            },
            "s3" => StorageConfig::S3(S3Config {
                bucket: var("QRDROP_S3_BUCKET")
                    .ok_or_else(|| anyhow!("QRDROP_S3_BUCKET must be set when QRDROP_STORAGE=s3"))?,
                endpoint_url: var("QRDROP_S3_ENDPOINT"),
                region: var("QRDROP_S3_REGION"),
            }),
            other => bail!("unknown QRDROP_STORAGE {other:?}, expected \"local\" or \"s3\""),
        };

        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .context("QRDROP_MAX_UPLOAD_MB is too large")?;

        Ok(Config {
            address: SocketAddr::new(ip, port),
            base_url,
            max_upload_bytes,
            storage,
        })
    }

    /// Base URL used when neither the configuration nor the request names one.
    pub fn fallback_base_url(&self) -> Result<Url> {
        parse_base_url(&format!("http://{}/", self.address))
    }
}

/// Parses an absolute http(s) URL and makes sure its path ends in `/` so
/// relative joins append to it.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("base URL must be http or https, got {}", url.scheme());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
