use std::fmt;

use thiserror::Error;

/// Upper bound on sanitized key length. QR companion keys may exceed it by the
/// length of [`QR_SUFFIX`].
pub const MAX_KEY_LEN: usize = 200;

pub const QR_SUFFIX: &str = "_QR.png";

const MAX_EXT_LEN: usize = 16;

/// Stem used when nothing of the original stem survives, e.g. `文件.pdf`.
const FALLBACK_STEM: &str = "file";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("file name {0:?} contains no usable characters")]
pub struct InvalidFileName(pub String);

/// A sanitized file name, the only thing storage backends accept as a key.
///
/// Keys are plain ASCII (`[A-Za-z0-9._-]`), never start with `.` or `_` and
/// never contain a path separator, so they always name a single entry directly
/// under the storage root and need no escaping in URLs or headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey(String);

impl FileKey {
    pub fn sanitize(raw: &str) -> Result<Self, InvalidFileName> {
        let stripped = sanitize_filename::sanitize_with_options(
            raw,
            sanitize_filename::Options {
                truncate: false,
                ..Default::default()
            },
        );

        // Leading dots are not an extension separator (`..passwd`).
        let (stem, extension) = match stripped.rsplit_once('.') {
            Some((stem, ext)) if stem.contains(|c: char| c != '.') => (stem, Some(ext)),
            _ => (stripped.as_str(), None),
        };

        let extension: String = extension
            .map(|ext| ext.chars().filter(char::is_ascii_alphanumeric).take(MAX_EXT_LEN).collect())
            .unwrap_or_default();
        let mut stem = clean(stem);
        let leading = stem.len() - stem.trim_start_matches(['.', '_']).len();
        stem.drain(..leading);

        if stem.is_empty() {
            if extension.is_empty() {
                return Err(InvalidFileName(raw.to_owned()));
            }
            stem.push_str(FALLBACK_STEM);
        }

        if extension.is_empty() {
            stem.truncate(MAX_KEY_LEN);
            return Ok(FileKey(stem));
        }
        stem.truncate(MAX_KEY_LEN - extension.len() - 1);
        Ok(FileKey(format!("{stem}.{extension}")))
    }

    /// Accepts `name` only if it is already in key form. Used for lookups,
    /// where anything else cannot have been stored.
    pub fn parse(name: &str) -> Result<Self, InvalidFileName> {
        let well_formed = !name.is_empty()
            && name.len() <= MAX_KEY_LEN + QR_SUFFIX.len()
            && !name.starts_with(['.', '_'])
            && name.bytes().all(is_key_byte);
        if !well_formed {
            return Err(InvalidFileName(name.to_owned()));
        }
        Ok(FileKey(name.to_owned()))
    }

    /// Name minus its last extension, e.g. `notes.tar.gz` -> `notes.tar`.
    pub fn base_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) if idx > 0 => &self.0[..idx],
            _ => &self.0,
        }
    }

    /// Key of the QR artifact generated for this file.
    pub fn qr_companion(&self) -> FileKey {
        FileKey(format!("{}{}", self.base_name(), QR_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn clean(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii() && is_key_byte(c as u8) => Some(c),
            _ => None,
        })
        .collect()
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
