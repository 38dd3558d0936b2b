//! Local session artifacts: one directory per session id under
//! `{storage_path}/sessions`, holding timestamped log files and saved images.

use crate::error::{ClientError, ClientResult};
use crate::session::ImageData;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Filesystem store for session logs and saved images.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Store rooted at `{storage_path}/sessions`. Directories are created on
    /// first write, not here.
    pub fn new(storage_path: impl AsRef<Path>) -> Self {
        Self {
            root: storage_path.as_ref().join("sessions"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: &str) -> ClientResult<PathBuf> {
        let dir = self.root.join(session_id);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write the session log as a timestamped text file and return its path.
    pub fn write_log(&self, session_id: &str, text: &str) -> ClientResult<PathBuf> {
        let dir = self.session_dir(session_id)?;
        let name = format!("session_log_{}.txt", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        std::fs::write(&path, text)?;
        Ok(path)
    }

    /// Persist the session's images. `data:` URLs are decoded and written as
    /// numbered image files; plain URLs are recorded in a `urls.txt` manifest
    /// instead of being downloaded (the export stays a single request).
    pub fn write_images(&self, session_id: &str, images: &[ImageData]) -> ClientResult<Vec<PathBuf>> {
        let dir = self.session_dir(session_id)?;
        let mut written = Vec::new();
        let mut remote_urls = Vec::new();

        for (index, image) in images.iter().enumerate() {
            if image.url.starts_with("data:") {
                let (mime, bytes) = decode_data_url(&image.url).ok_or_else(|| {
                    ClientError::Storage(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("image {index} has an undecodable data URL"),
                    ))
                })?;
                let path = dir.join(format!("image_{index:03}.{}", extension_for(&mime)));
                std::fs::write(&path, bytes)?;
                written.push(path);
            } else {
                remote_urls.push(image.url.clone());
            }
        }

        if !remote_urls.is_empty() {
            let path = dir.join("urls.txt");
            std::fs::write(&path, remote_urls.join("\n"))?;
            written.push(path);
        }

        Ok(written)
    }
}

/// Split a `data:` URL into its mime type and decoded bytes.
fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.split(';').any(|part| part == "base64") {
        return None;
    }
    let mime = meta.split(';').next().unwrap_or("").to_string();
    let bytes = BASE64.decode(payload.trim()).ok()?;
    Some((mime, bytes))
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_data_url(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(bytes))
    }

    #[test]
    fn log_lands_under_the_session_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let path = store.write_log("abc-123", "hello log").unwrap();
        assert!(path.starts_with(tmp.path().join("sessions").join("abc-123")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello log");
    }

    #[test]
    fn data_urls_are_decoded_to_image_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let images = vec![ImageData {
            url: png_data_url(b"fake png bytes"),
            mime_type: Some("image/png".to_string()),
            size: None,
        }];
        let written = store.write_images("s1", &images).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].extension().unwrap(), "png");
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"fake png bytes");
    }

    #[test]
    fn plain_urls_go_into_a_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let images = vec![
            ImageData {
                url: "https://example.com/a.png".to_string(),
                mime_type: None,
                size: None,
            },
            ImageData {
                url: "https://example.com/b.png".to_string(),
                mime_type: None,
                size: None,
            },
        ];
        let written = store.write_images("s2", &images).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("urls.txt"));
        let manifest = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(manifest.lines().count(), 2);
    }

    #[test]
    fn undecodable_data_url_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path());
        let images = vec![ImageData {
            url: "data:image/png;base64,@@not-base64@@".to_string(),
            mime_type: None,
            size: None,
        }];
        let err = store.write_images("s3", &images).unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
    }

    #[test]
    fn data_url_without_base64_marker_is_rejected() {
        assert!(decode_data_url("data:image/png,rawbytes").is_none());
        assert!(decode_data_url("https://example.com/a.png").is_none());
    }
}
