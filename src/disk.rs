//! Content-addressed on-disk cache for transformed image payloads.
//!
//! Files are stored at `<cache_dir>/<hash>.<ext>` where the hash is the
//! fingerprint of the logical request (source URL plus transform
//! parameters). Staleness is judged purely by file modification time
//! against a caller-supplied max age; nothing is stored inside the files
//! besides the payload itself.
//!
//! Writes to a given path are idempotent (same fingerprint, same bytes),
//! so concurrent writers need no locking, and a cleanup sweep racing a
//! write can at worst delete a file that was already older than the max
//! age.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::hash::{canonical_json, hash_key};

/// Output format of a transformed image; doubles as the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn ext(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }
}

/// How the image is resized into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    Cover,
    Contain,
    Fill,
    Inside,
    Outside,
}

/// The logical request an on-disk file is keyed by: source URL plus every
/// transform parameter that changes the output bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
    pub format: ImageFormat,
    pub fit: FitMode,
}

impl ImageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        ImageRequest {
            url: url.into(),
            width: None,
            height: None,
            quality: 85,
            format: ImageFormat::Jpeg,
            fit: FitMode::Cover,
        }
    }

    /// Canonical fingerprint: equal requests fingerprint identically no
    /// matter how they were built.
    pub fn fingerprint(&self) -> String {
        canonical_json(&json!({
            "url": self.url,
            "width": self.width,
            "height": self.height,
            "quality": self.quality,
            "format": self.format.ext(),
            "fit": self.fit,
        }))
    }
}

/// Aggregate view of the cache directory, for observability endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskCacheStats {
    pub files: usize,
    pub total_bytes: u64,
    #[serde(skip)]
    pub oldest_modified: Option<SystemTime>,
    #[serde(skip)]
    pub newest_modified: Option<SystemTime>,
}

/// Content-addressed file cache with age-based garbage collection.
pub struct DiskImageCache {
    dir: PathBuf,
}

impl DiskImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DiskImageCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic path for a fingerprint: `<dir>/<hash>.<ext>`.
    pub fn path_for(&self, fingerprint: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash_key(fingerprint), ext))
    }

    pub fn path_for_request(&self, request: &ImageRequest) -> PathBuf {
        self.path_for(&request.fingerprint(), request.format.ext())
    }

    /// Existence check only; staleness is the caller's concern (see
    /// [`is_fresh`](Self::is_fresh)).
    pub fn is_cached(&self, fingerprint: &str, ext: &str) -> bool {
        self.path_for(fingerprint, ext).exists()
    }

    /// Whether the file at `path` exists and was modified within
    /// `max_age`.
    pub fn is_fresh(&self, path: &Path, max_age: Duration) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        match metadata.modified().map(|mtime| mtime.elapsed()) {
            Ok(Ok(age)) => age < max_age,
            // mtime in the future reads as fresh
            Ok(Err(_)) => true,
            Err(_) => false,
        }
    }

    /// Persist a payload, creating the cache directory if absent. Write
    /// errors propagate: a caller relying on a successful write must know.
    pub fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        tracing::debug!("cached image: {}", path.display());
        Ok(())
    }

    pub fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        fs::read(path)
    }

    /// Delete every file older than `max_age`, returning the number
    /// deleted. Individual filesystem errors are logged and skipped; the
    /// sweep continues and the count is best-effort.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!("failed to read image cache dir: {}", err);
                return 0;
            }
        };

        let mut deleted = 0;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    tracing::warn!("failed to read cache dir entry: {}", err);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let stale = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(|mtime| mtime.elapsed().map(|age| age > max_age).unwrap_or(false))
                .unwrap_or(false);
            if !stale {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(err) => {
                    tracing::warn!("failed to delete {}: {}", path.display(), err);
                }
            }
        }

        if deleted > 0 {
            tracing::info!("cleaned up {} old image cache files", deleted);
        }
        deleted
    }

    /// File count, total size, and mtime range of the cache directory.
    pub fn stats(&self) -> DiskCacheStats {
        let mut stats = DiskCacheStats {
            files: 0,
            total_bytes: 0,
            oldest_modified: None,
            newest_modified: None,
        };

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return stats;
        };
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            stats.files += 1;
            stats.total_bytes += metadata.len();
            if let Ok(mtime) = metadata.modified() {
                stats.oldest_modified = Some(match stats.oldest_modified {
                    Some(oldest) => oldest.min(mtime),
                    None => mtime,
                });
                stats.newest_modified = Some(match stats.newest_modified {
                    Some(newest) => newest.max(mtime),
                    None => mtime,
                });
            }
        }
        stats
    }
}
