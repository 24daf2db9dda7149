//! Backing store operations trait.
//!
//! Everything the dispatcher does not synthesize itself is forwarded
//! through this trait. Path operations take a path relative to the
//! backend root; file contents are reached through the [`OpenFile`]
//! returned by `open` and `create`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::file::OpenFile;
use super::types::{AccessMode, DirEntry, FileAttr, OpenFlags, SetAttr, StatFs};
use super::VfsResult;

/// Passthrough operations against a real directory tree.
///
/// Operations that act on a directory entry itself (`getattr`, `unlink`,
/// `rename`, `link`, `readlink`, ...) never follow a symlink in the final
/// path component, matching the system calls they stand in for.
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Inspection
    // ========================================================================

    /// Attributes of the entry itself (`lstat`).
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Directory entries, excluding `.` and `..`, sorted by name.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Symbolic link target.
    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf>;

    /// Check whether the caller may access `path` with `mode`.
    async fn access(&self, path: &Path, mode: AccessMode) -> VfsResult<()>;

    // ========================================================================
    // Open files
    // ========================================================================

    /// Open an existing file, honouring `truncate` and `create` in `flags`.
    async fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<OpenFile>;

    /// Create (or reuse, unless `flags.exclusive`) a regular file with
    /// `mode` and open it for writing.
    async fn create(&self, path: &Path, mode: u32, flags: OpenFlags) -> VfsResult<OpenFile>;

    // ========================================================================
    // Structure
    // ========================================================================

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr>;

    /// Create a filesystem node (regular file, FIFO, device).
    async fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> VfsResult<FileAttr>;

    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Truncate a file by path.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    /// Change mode, owner or times.
    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr>;

    /// Create a symlink at `path` whose target is `target`, stored verbatim.
    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr>;

    /// Create a hard link at `newpath` to `oldpath`.
    async fn link(&self, oldpath: &Path, newpath: &Path) -> VfsResult<FileAttr>;

    // ========================================================================
    // Filesystem
    // ========================================================================

    fn read_only(&self) -> bool;

    async fn statfs(&self) -> VfsResult<StatFs>;
}
