use axum::body::Bytes;
use ring::digest::{digest, SHA256};

use crate::filename::FileKey;
use crate::qr::{self, QrEncodeError};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const QR_CONTENT_TYPE: &str = "image/png";

#[derive(Debug)]
pub struct StoredFile {
    pub key: FileKey,
    pub bytes: Bytes,
    pub content_type: String,
}

impl StoredFile {
    /// Content type is inferred from the key's extension.
    pub fn new(key: FileKey, bytes: impl Into<Bytes>) -> Self {
        let content_type = content_type_for(&key);
        StoredFile {
            key,
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Hex SHA-256 of the payload, used for logging and as the download ETag.
    pub fn digest(&self) -> String {
        hex::encode(digest(&SHA256, &self.bytes))
    }
}

pub fn content_type_for(key: &FileKey) -> String {
    mime_guess::from_path(key.as_str())
        .first()
        .map(|mime| mime.essence_str().to_owned())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned())
}

pub struct QrArtifact {
    pub source: FileKey,
    pub key: FileKey,
    pub image: Vec<u8>,
}

impl QrArtifact {
    /// Encodes `url` (the public download URL of `source`) as a PNG.
    pub fn generate(source: &FileKey, url: &str) -> Result<Self, QrEncodeError> {
        Ok(QrArtifact {
            source: source.clone(),
            key: source.qr_companion(),
            image: qr::encode_png(url)?,
        })
    }

    pub fn into_stored(self) -> StoredFile {
        StoredFile {
            key: self.key,
            bytes: self.image.into(),
            content_type: QR_CONTENT_TYPE.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> FileKey {
        FileKey::sanitize(name).unwrap()
    }

    #[test]
    fn content_type_is_inferred_from_extension() {
        assert_eq!(StoredFile::new(key("a.pdf"), "x").content_type, "application/pdf");
        assert_eq!(StoredFile::new(key("a.png"), "x").content_type, "image/png");
        assert_eq!(StoredFile::new(key("a"), "x").content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(
            StoredFile::new(key("a.nosuchext"), "x").content_type,
            DEFAULT_CONTENT_TYPE
        );
    }

    #[test]
    fn digest_is_sha256_hex() {
        let file = StoredFile::new(key("a.txt"), "abc");
        assert_eq!(
            file.digest(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn qr_artifact_follows_naming_convention() {
        let source = key("report.pdf");
        let qr = QrArtifact::generate(&source, "http://localhost/download-file/report.pdf").unwrap();
        assert_eq!(qr.source, source);
        assert_eq!(qr.key.as_str(), "report_QR.png");

        let stored = qr.into_stored();
        assert_eq!(stored.content_type, QR_CONTENT_TYPE);
        assert!(stored.bytes.starts_with(b"\x89PNG"));
    }
}
