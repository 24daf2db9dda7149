//! Local filesystem backend.
//!
//! The passthrough side of the mount: every real path is served from a
//! backing directory, with path security to prevent escaping it.

use async_trait::async_trait;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::file::OpenFile;
use crate::vfs::ops::VfsOps;
use crate::vfs::types::{AccessMode, DirEntry, FileAttr, FileType, OpenFlags, SetAttr, StatFs};

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/tmp/memfits`, then `open("notes/a.txt")` opens
/// `/tmp/memfits/notes/a.txt`.
///
/// Path security is enforced: attempts to escape via `..` or a symlink
/// are blocked.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    read_only: bool,
}

impl LocalBackend {
    /// Create a new local filesystem rooted at the given path.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            read_only: false,
        }
    }

    /// Create a read-only local filesystem.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::new(root)
        }
    }

    /// Resolve a relative path to an absolute path within the root,
    /// following symlinks all the way. Used by operations on file contents.
    ///
    /// Returns an error if the resolved path escapes the root.
    async fn resolve(&self, path: &Path) -> VfsResult<PathBuf> {
        // Strip leading slash if present
        let path = path.strip_prefix("/").unwrap_or(path);

        if path.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }

        let full = self.root.join(path);

        // A dangling symlink counts as present: canonicalize reports it missing
        let canonical = if fs::symlink_metadata(&full).await.is_ok() {
            dunce::canonicalize(&full)?
        } else {
            let parent = full.parent().ok_or_else(|| VfsError::invalid_path("no parent"))?;
            let filename = full
                .file_name()
                .ok_or_else(|| VfsError::invalid_path("no filename"))?;
            dunce::canonicalize(parent)?.join(filename)
        };

        self.contain(canonical)
    }

    /// Resolve the directory entry named by `path` without following a
    /// symlink in its final component. Only the parent is canonicalized,
    /// so a link can be inspected, renamed or removed wherever it points.
    async fn resolve_entry(&self, path: &Path) -> VfsResult<PathBuf> {
        let path = path.strip_prefix("/").unwrap_or(path);

        let name = match path.components().next_back() {
            None => return Ok(self.root.clone()),
            Some(Component::Normal(name)) => name.to_owned(),
            Some(_) => return Err(VfsError::invalid_path(path.display().to_string())),
        };

        let parent = self
            .resolve(path.parent().unwrap_or_else(|| Path::new("")))
            .await?;
        Ok(parent.join(name))
    }

    fn contain(&self, canonical: PathBuf) -> VfsResult<PathBuf> {
        if !canonical.starts_with(&self.root) {
            return Err(VfsError::path_escapes_root(format!(
                "{} is not under {}",
                canonical.display(),
                self.root.display()
            )));
        }
        Ok(canonical)
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Convert std::fs::Metadata to FileAttr.
    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        let kind = if meta.is_dir() {
            FileType::Directory
        } else if meta.file_type().is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        };

        FileAttr {
            size: meta.len(),
            kind,
            perm: meta.permissions().mode() & 0o7777,
            mtime: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            atime: meta.accessed().ok(),
            ctime: meta.created().ok(),
            nlink: meta.nlink() as u32,
            uid: Some(meta.uid()),
            gid: Some(meta.gid()),
        }
    }

    async fn entry_attr(full_path: &Path) -> VfsResult<FileAttr> {
        let meta = fs::symlink_metadata(full_path).await?;
        Ok(Self::metadata_to_attr(&meta))
    }
}

#[async_trait]
impl VfsOps for LocalBackend {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let full_path = self.resolve_entry(path).await?;
        Self::entry_attr(&full_path).await
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let full_path = self.resolve(path).await?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            let kind = if file_type.is_dir() {
                FileType::Directory
            } else if file_type.is_symlink() {
                FileType::Symlink
            } else {
                FileType::File
            };

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        let full_path = self.resolve_entry(path).await?;
        let target = fs::read_link(&full_path).await?;

        // Absolute targets inside the root are reported relative to it
        match target.strip_prefix(&self.root) {
            Ok(relative) if target.is_absolute() => Ok(relative.to_path_buf()),
            _ => Ok(target),
        }
    }

    async fn access(&self, path: &Path, mode: AccessMode) -> VfsResult<()> {
        use rustix::fs::Access;

        if mode.write {
            self.check_writable()?;
        }
        let full_path = self.resolve(path).await?;

        let mut access = Access::EXISTS;
        if mode.read {
            access |= Access::READ_OK;
        }
        if mode.write {
            access |= Access::WRITE_OK;
        }
        if mode.execute {
            access |= Access::EXEC_OK;
        }

        rustix::fs::access(&full_path, access).map_err(|e| {
            if e == rustix::io::Errno::ACCESS {
                VfsError::permission_denied(path.display().to_string())
            } else {
                VfsError::Io(e.into())
            }
        })
    }

    async fn open(&self, path: &Path, flags: OpenFlags) -> VfsResult<OpenFile> {
        if flags.mutates() {
            self.check_writable()?;
        }
        let full_path = self.resolve(path).await?;

        let file = fs::OpenOptions::new()
            .read(flags.read)
            .write(flags.write || flags.truncate || flags.create)
            .append(flags.append)
            .create(flags.create && !flags.exclusive)
            .create_new(flags.create && flags.exclusive)
            .truncate(flags.truncate && !flags.append)
            .open(&full_path)
            .await?;

        Ok(OpenFile::new(file.into_std().await))
    }

    async fn create(&self, path: &Path, mode: u32, flags: OpenFlags) -> VfsResult<OpenFile> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;

        // Without O_EXCL an existing file is reused
        let file = fs::OpenOptions::new()
            .read(flags.read)
            .write(true)
            .append(flags.append)
            .create(!flags.exclusive)
            .create_new(flags.exclusive)
            .truncate(flags.truncate && !flags.append)
            .mode(mode)
            .open(&full_path)
            .await?;

        Ok(OpenFile::new(file.into_std().await))
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileAttr> {
        use std::os::unix::fs::DirBuilderExt;

        self.check_writable()?;
        let full_path = self.resolve_entry(path).await?;

        std::fs::DirBuilder::new().mode(mode).create(&full_path)?;

        Self::entry_attr(&full_path).await
    }

    async fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> VfsResult<FileAttr> {
        use rustix::fs::{mknodat, FileType as NodeType, Mode, CWD};

        self.check_writable()?;
        let full_path = self.resolve_entry(path).await?;

        mknodat(
            CWD,
            &full_path,
            NodeType::from_raw_mode(mode),
            Mode::from_raw_mode(mode),
            rdev,
        )
        .map_err(|e| VfsError::Io(e.into()))?;

        Self::entry_attr(&full_path).await
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve_entry(path).await?;
        Ok(fs::remove_file(&full_path).await?)
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve_entry(path).await?;
        Ok(fs::remove_dir(&full_path).await?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.check_writable()?;
        let from_path = self.resolve_entry(from).await?;
        let to_path = self.resolve_entry(to).await?;

        Ok(fs::rename(&from_path, &to_path).await?)
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;

        let file = fs::OpenOptions::new().write(true).open(&full_path).await?;
        Ok(file.set_len(size).await?)
    }

    async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        self.check_writable()?;
        let full_path = self.resolve(path).await?;

        if let Some(perm) = attr.perm {
            let permissions = std::fs::Permissions::from_mode(perm);
            fs::set_permissions(&full_path, permissions).await?;
        }

        if attr.uid.is_some() || attr.gid.is_some() {
            std::os::unix::fs::chown(&full_path, attr.uid, attr.gid)?;
        }

        if attr.mtime.is_some() || attr.atime.is_some() {
            let mut times = std::fs::FileTimes::new();
            if let Some(atime) = attr.atime {
                times = times.set_accessed(atime);
            }
            if let Some(mtime) = attr.mtime {
                times = times.set_modified(mtime);
            }
            std::fs::File::open(&full_path)?.set_times(times)?;
        }

        let meta = fs::metadata(&full_path).await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileAttr> {
        self.check_writable()?;
        let full_path = self.resolve_entry(path).await?;

        fs::symlink(target, &full_path).await?;

        Self::entry_attr(&full_path).await
    }

    async fn link(&self, oldpath: &Path, newpath: &Path) -> VfsResult<FileAttr> {
        self.check_writable()?;
        let old_full = self.resolve_entry(oldpath).await?;
        let new_full = self.resolve_entry(newpath).await?;

        fs::hard_link(&old_full, &new_full).await?;

        Self::entry_attr(&new_full).await
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    async fn statfs(&self) -> VfsResult<StatFs> {
        use rustix::fs::statvfs;

        let stat = statvfs(&self.root).map_err(|e| VfsError::Io(e.into()))?;

        Ok(StatFs {
            blocks: stat.f_blocks,
            bfree: stat.f_bfree,
            bavail: stat.f_bavail,
            files: stat.f_files,
            ffree: stat.f_ffree,
            bsize: stat.f_bsize as u32,
            namelen: stat.f_namemax as u32,
            frsize: stat.f_frsize as u32,
        })
    }
}
