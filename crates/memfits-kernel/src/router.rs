//! Decides whether a mount-relative path is the synthetic image or a
//! passthrough to the backing directory.

use std::path::{Path, PathBuf};

use crate::config::MountContext;

/// Where a path is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The in-memory FITS image.
    Synthetic,
    /// A real entry, relative to the backing root.
    Real(PathBuf),
}

impl Route {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Route::Synthetic)
    }
}

/// Path classification for one mount.
#[derive(Debug, Clone)]
pub struct PathRouter {
    backing_root: PathBuf,
    suffix: String,
}

impl PathRouter {
    pub fn new(context: &MountContext) -> Self {
        Self {
            backing_root: context.backing_root().to_path_buf(),
            suffix: context.synthetic_suffix().to_string(),
        }
    }

    /// Classify `path`.
    ///
    /// Any path whose final component ends with the synthetic suffix is
    /// the synthetic image, whatever directory it appears in. Everything
    /// else is real, with the leading `/` removed.
    pub fn resolve(&self, path: &str) -> Route {
        if self.is_synthetic(path) {
            return Route::Synthetic;
        }
        Route::Real(PathBuf::from(path.trim_start_matches('/')))
    }

    /// Whether `path` names the synthetic image.
    pub fn is_synthetic(&self, path: &str) -> bool {
        path.rsplit('/')
            .next()
            .is_some_and(|name| !name.is_empty() && name.ends_with(&self.suffix))
    }

    /// Absolute location of a real path in the backing directory.
    ///
    /// No escape check is made here; the backend enforces containment.
    pub fn backing_path(&self, relative: &Path) -> PathBuf {
        self.backing_root.join(relative)
    }

    /// Paths that are directories without asking the backing store: the
    /// mount root and anything with a trailing `/`.
    pub fn is_directory_hint(&self, path: &str) -> bool {
        path.is_empty() || path.ends_with('/')
    }
}
