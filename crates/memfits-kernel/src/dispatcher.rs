//! Filesystem callback dispatcher.
//!
//! One async method per callback a userspace-filesystem transport
//! delivers. Each call is routed by [`PathRouter`]: the synthetic image is
//! answered from memory through a [`VirtualFileSession`], everything else
//! is forwarded to the backing [`VfsOps`] store.
//!
//! Open files are tracked in a handle table. Every open of the synthetic
//! path gets its own session, so concurrent readers never share a build
//! and a release only tears down its own buffer. A real handle owns its
//! descriptor until release, so it keeps working after the path is
//! unlinked or renamed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

use crate::config::{constants, MountContext};
use crate::fits::FitsImage;
use crate::router::{PathRouter, Route};
use crate::session::VirtualFileSession;
use crate::vfs::{
    AccessMode, DirEntry, FileAttr, LocalBackend, OpenFile, OpenFlags, SetAttr, StatFs, VfsError,
    VfsOps, VfsResult,
};

/// State behind one file handle.
#[derive(Debug, Clone)]
enum OpenHandle {
    Synthetic(Arc<VirtualFileSession>),
    Real(OpenFile),
}

/// Routes filesystem callbacks between the synthetic image and the
/// backing directory.
pub struct FitsDispatcher {
    context: Arc<MountContext>,
    router: PathRouter,
    image: Arc<FitsImage>,
    backend: Arc<dyn VfsOps>,
    handles: DashMap<u64, OpenHandle>,
    next_handle: AtomicU64,
}

impl std::fmt::Debug for FitsDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitsDispatcher")
            .field("context", &self.context)
            .field("open_handles", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl FitsDispatcher {
    /// Serve `image` over a [`LocalBackend`] rooted at the context's
    /// backing directory.
    pub fn new(context: MountContext, image: FitsImage) -> Self {
        let backend = if context.read_only_backing() {
            LocalBackend::read_only(context.backing_root())
        } else {
            LocalBackend::new(context.backing_root())
        };
        Self::with_backend(context, image, Arc::new(backend))
    }

    /// Serve `image` over an arbitrary backing store.
    pub fn with_backend(context: MountContext, image: FitsImage, backend: Arc<dyn VfsOps>) -> Self {
        Self {
            router: PathRouter::new(&context),
            context: Arc::new(context),
            image: Arc::new(image),
            backend,
            handles: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn context(&self) -> &MountContext {
        &self.context
    }

    pub fn image(&self) -> &FitsImage {
        &self.image
    }

    /// Number of handles not yet released.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// The session behind a synthetic handle.
    pub fn session(&self, fh: u64) -> Option<Arc<VirtualFileSession>> {
        match self.handles.get(&fh).as_deref() {
            Some(OpenHandle::Synthetic(session)) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    fn trace(&self, op: &'static str, path: &str) {
        if self.context.debug_trace() {
            tracing::debug!(op, path, "callback");
        }
    }

    /// Route `path`, failing when it names the synthetic image.
    fn real(&self, op: &'static str, path: &str) -> VfsResult<PathBuf> {
        match self.router.resolve(path) {
            Route::Synthetic => Err(VfsError::synthetic(op, path)),
            Route::Real(relative) => Ok(relative),
        }
    }

    fn insert(&self, handle: OpenHandle) -> u64 {
        let fh = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(fh, handle);
        fh
    }

    fn handle(&self, fh: u64) -> VfsResult<OpenHandle> {
        self.handles
            .get(&fh)
            .map(|h| h.value().clone())
            .ok_or(VfsError::BadHandle(fh))
    }

    fn owner() -> (u32, u32) {
        (
            rustix::process::getuid().as_raw(),
            rustix::process::getgid().as_raw(),
        )
    }

    fn synthetic_attr(&self) -> FileAttr {
        let (uid, gid) = Self::owner();
        let size = self.image.projected_size().unwrap_or(0);
        FileAttr::file(size, self.context.synthetic_mode()).owned_by(uid, gid)
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub async fn getattr(&self, path: &str, _fh: Option<u64>) -> VfsResult<FileAttr> {
        self.trace("getattr", path);
        if self.router.is_directory_hint(path) {
            let (uid, gid) = Self::owner();
            return Ok(FileAttr::directory(constants::DIRECTORY_MODE).owned_by(uid, gid));
        }
        match self.router.resolve(path) {
            Route::Synthetic => Ok(self.synthetic_attr()),
            Route::Real(relative) => self.backend.getattr(&relative).await,
        }
    }

    pub async fn access(&self, path: &str, mask: i32) -> VfsResult<()> {
        self.trace("access", path);
        let mode = AccessMode::from_mask(mask);
        match self.router.resolve(path) {
            Route::Synthetic if mode.write || mode.execute => {
                Err(VfsError::permission_denied(path))
            }
            Route::Synthetic => Ok(()),
            Route::Real(relative) => self.backend.access(&relative, mode).await,
        }
    }

    /// List a directory: `.`, `..`, the synthetic image, then the real
    /// entries. Real entries that would route to the synthetic image are
    /// unreachable and therefore hidden.
    pub async fn readdir(&self, path: &str, _fh: Option<u64>) -> VfsResult<Vec<DirEntry>> {
        self.trace("readdir", path);
        let relative = self.real("readdir", path)?;

        let real = self.backend.readdir(&relative).await?;
        let mut entries = Vec::with_capacity(real.len() + 3);
        entries.push(DirEntry::directory("."));
        entries.push(DirEntry::directory(".."));
        entries.push(DirEntry::file(self.context.synthetic_name()));
        entries.extend(
            real.into_iter()
                .filter(|entry| !self.router.is_synthetic(&entry.name)),
        );
        Ok(entries)
    }

    pub async fn readlink(&self, path: &str) -> VfsResult<PathBuf> {
        self.trace("readlink", path);
        let relative = self.real("readlink", path)?;
        self.backend.readlink(&relative).await
    }

    /// Filesystem-wide; always answered by the backing store.
    pub async fn statfs(&self, path: &str) -> VfsResult<StatFs> {
        self.trace("statfs", path);
        self.backend.statfs().await
    }

    pub async fn chmod(&self, path: &str, mode: u32) -> VfsResult<()> {
        self.trace("chmod", path);
        let relative = self.real("chmod", path)?;
        self.backend
            .setattr(&relative, SetAttr::new().with_perm(mode & 0o7777))
            .await?;
        Ok(())
    }

    pub async fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> VfsResult<()> {
        self.trace("chown", path);
        let relative = self.real("chown", path)?;
        self.backend
            .setattr(&relative, SetAttr::new().with_owner(uid, gid))
            .await?;
        Ok(())
    }

    /// Set access and modification times. `None` means now.
    pub async fn utimens(
        &self,
        path: &str,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> VfsResult<()> {
        self.trace("utimens", path);
        let relative = self.real("utimens", path)?;
        let now = SystemTime::now();
        let attr = SetAttr::new()
            .with_atime(atime.unwrap_or(now))
            .with_mtime(mtime.unwrap_or(now));
        self.backend.setattr(&relative, attr).await?;
        Ok(())
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub async fn mknod(&self, path: &str, mode: u32, rdev: u64) -> VfsResult<()> {
        self.trace("mknod", path);
        let relative = self.real("mknod", path)?;
        self.backend.mknod(&relative, mode, rdev).await?;
        Ok(())
    }

    pub async fn mkdir(&self, path: &str, mode: u32) -> VfsResult<()> {
        self.trace("mkdir", path);
        let relative = self.real("mkdir", path)?;
        self.backend.mkdir(&relative, mode).await?;
        Ok(())
    }

    pub async fn rmdir(&self, path: &str) -> VfsResult<()> {
        self.trace("rmdir", path);
        let relative = self.real("rmdir", path)?;
        self.backend.rmdir(&relative).await
    }

    pub async fn unlink(&self, path: &str) -> VfsResult<()> {
        self.trace("unlink", path);
        let relative = self.real("unlink", path)?;
        self.backend.unlink(&relative).await
    }

    /// Create a symlink at `path` pointing at `target`. The target is
    /// stored verbatim.
    pub async fn symlink(&self, path: &str, target: &str) -> VfsResult<()> {
        self.trace("symlink", path);
        let relative = self.real("symlink", path)?;
        self.backend.symlink(&relative, Path::new(target)).await?;
        Ok(())
    }

    pub async fn rename(&self, old: &str, new: &str) -> VfsResult<()> {
        self.trace("rename", old);
        let from = self.real("rename", old)?;
        let to = self.real("rename", new)?;
        self.backend.rename(&from, &to).await
    }

    /// Create a hard link at `path` to the existing `existing`.
    pub async fn link(&self, path: &str, existing: &str) -> VfsResult<()> {
        self.trace("link", path);
        let new = self.real("link", path)?;
        let old = self.real("link", existing)?;
        self.backend.link(&old, &new).await?;
        Ok(())
    }

    // ========================================================================
    // File I/O
    // ========================================================================

    /// Open `path` with raw `open(2)` flags and return a handle.
    ///
    /// The synthetic image opens read-only into a fresh, unbuilt session.
    pub async fn open(&self, path: &str, flags: i32) -> VfsResult<u64> {
        self.trace("open", path);
        let flags = OpenFlags::from_raw(flags);
        match self.router.resolve(path) {
            Route::Synthetic if flags.mutates() => Err(VfsError::synthetic("open", path)),
            Route::Synthetic => {
                let session = VirtualFileSession::open(Arc::clone(&self.image));
                let fh = self.insert(OpenHandle::Synthetic(Arc::new(session)));
                tracing::debug!(fh, "opened synthetic session");
                Ok(fh)
            }
            Route::Real(relative) => {
                let file = self.backend.open(&relative, flags).await?;
                Ok(self.insert(OpenHandle::Real(file)))
            }
        }
    }

    pub async fn create(&self, path: &str, mode: u32, flags: i32) -> VfsResult<u64> {
        self.trace("create", path);
        let relative = self.real("create", path)?;
        let file = self
            .backend
            .create(&relative, mode, OpenFlags::from_raw(flags))
            .await?;
        Ok(self.insert(OpenHandle::Real(file)))
    }

    /// Read up to `size` bytes at `offset` through handle `fh`.
    pub async fn read(&self, path: &str, size: u32, offset: u64, fh: u64) -> VfsResult<Vec<u8>> {
        self.trace("read", path);
        match self.handle(fh)? {
            OpenHandle::Synthetic(session) => Ok(session.read_chunk(offset, size as usize)?),
            OpenHandle::Real(file) => file.read_at(offset, size).await,
        }
    }

    pub async fn write(&self, path: &str, data: &[u8], offset: u64, fh: u64) -> VfsResult<u32> {
        self.trace("write", path);
        match self.handle(fh)? {
            OpenHandle::Synthetic(_) => Err(VfsError::synthetic("write", path)),
            // EBADF for read-only handles comes from the descriptor itself
            OpenHandle::Real(file) => file.write_at(offset, data).await,
        }
    }

    pub async fn truncate(&self, path: &str, length: u64, fh: Option<u64>) -> VfsResult<()> {
        self.trace("truncate", path);
        match fh.map(|fh| self.handle(fh)).transpose()? {
            Some(OpenHandle::Synthetic(_)) => Err(VfsError::synthetic("truncate", path)),
            Some(OpenHandle::Real(file)) => file.set_len(length).await,
            None => {
                let relative = self.real("truncate", path)?;
                self.backend.truncate(&relative, length).await
            }
        }
    }

    pub async fn flush(&self, path: &str, fh: u64) -> VfsResult<()> {
        self.trace("flush", path);
        match self.handle(fh)? {
            OpenHandle::Synthetic(_) => Ok(()),
            OpenHandle::Real(file) => file.sync(false).await,
        }
    }

    pub async fn fsync(&self, path: &str, datasync: bool, fh: u64) -> VfsResult<()> {
        self.trace("fsync", path);
        match self.handle(fh)? {
            OpenHandle::Synthetic(_) => Ok(()),
            OpenHandle::Real(file) => file.sync(datasync).await,
        }
    }

    /// Close handle `fh`. A synthetic session drops its buffer here.
    pub async fn release(&self, path: &str, fh: u64) -> VfsResult<()> {
        self.trace("release", path);
        match self.handles.remove(&fh) {
            Some((_, OpenHandle::Synthetic(session))) => {
                tracing::debug!(fh, builds = session.build_count(), "releasing synthetic session");
                session.release();
                Ok(())
            }
            // dropping the last clone closes the descriptor
            Some((_, OpenHandle::Real(_))) => Ok(()),
            None => Err(VfsError::BadHandle(fh)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountConfig;
    use crate::fits::{Header, Payload};
    use rustix::fs::OFlags;
    use tempfile::TempDir;

    const RDONLY: i32 = 0;

    fn image() -> FitsImage {
        let header = Header::new()
            .with("SIMPLE", true)
            .with("BITPIX", 16)
            .with("NAXIS", 1)
            .with("NAXIS1", 1500);
        FitsImage::new(header, Payload::I16((0..1500).collect()))
    }

    fn setup() -> (FitsDispatcher, TempDir) {
        let dir = TempDir::new().unwrap();
        let context = MountConfig {
            backing_root: dir.path().to_path_buf(),
            debug_trace: true,
            ..Default::default()
        }
        .into_context()
        .unwrap();
        (FitsDispatcher::new(context, image()), dir)
    }

    #[tokio::test]
    async fn test_getattr_synthetic_before_read() {
        let (fs, _dir) = setup();
        let attr = fs.getattr("/inMemFITS.fits", None).await.unwrap();
        assert!(attr.is_file());
        assert_eq!(attr.size, 8640);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.uid, Some(rustix::process::getuid().as_raw()));
    }

    #[tokio::test]
    async fn test_getattr_directory_hint() {
        let (fs, _dir) = setup();
        let attr = fs.getattr("/", None).await.unwrap();
        assert!(attr.is_dir());
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.size, 0);
    }

    #[tokio::test]
    async fn test_getattr_missing_real_path() {
        let (fs, _dir) = setup();
        let err = fs.getattr("/nope.txt", None).await.unwrap_err();
        assert_eq!(err.errno(), rustix::io::Errno::NOENT.raw_os_error());
    }

    #[tokio::test]
    async fn test_readdir_lists_synthetic_first() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("shadow.fits"), b"x").unwrap();

        let entries = fs.readdir("/", None).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", "..", "inMemFITS.fits", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_synthetic_session_lifecycle() {
        let (fs, _dir) = setup();
        let fh = fs.open("/inMemFITS.fits", RDONLY).await.unwrap();
        let session = fs.session(fh).unwrap();
        assert!(!session.is_built());

        let head = fs.read("/inMemFITS.fits", 80, 0, fh).await.unwrap();
        assert!(head.starts_with(b"SIMPLE  = T"));
        fs.read("/inMemFITS.fits", 4096, 4096, fh).await.unwrap();
        assert_eq!(session.build_count(), 1);

        fs.flush("/inMemFITS.fits", fh).await.unwrap();
        fs.release("/inMemFITS.fits", fh).await.unwrap();
        assert!(!session.is_built());
        assert_eq!(fs.open_handles(), 0);

        let err = fs.read("/inMemFITS.fits", 10, 0, fh).await.unwrap_err();
        assert!(matches!(err, VfsError::BadHandle(_)));
    }

    #[tokio::test]
    async fn test_each_open_gets_its_own_session() {
        let (fs, _dir) = setup();
        let a = fs.open("/inMemFITS.fits", RDONLY).await.unwrap();
        let b = fs.open("/inMemFITS.fits", RDONLY).await.unwrap();
        assert_ne!(a, b);

        fs.read("/inMemFITS.fits", 100, 0, a).await.unwrap();
        fs.release("/inMemFITS.fits", a).await.unwrap();

        let session = fs.session(b).unwrap();
        assert!(!session.is_built());
        let bytes = fs.read("/inMemFITS.fits", 100, 0, b).await.unwrap();
        assert_eq!(bytes.len(), 100);
    }

    #[tokio::test]
    async fn test_synthetic_rejects_mutation() {
        let (fs, _dir) = setup();
        let path = "/inMemFITS.fits";

        let writable = (OFlags::WRONLY | OFlags::TRUNC).bits() as i32;
        assert!(matches!(
            fs.open(path, writable).await,
            Err(VfsError::NotSupportedOnSynthetic { op: "open", .. })
        ));
        assert!(fs.create(path, 0o644, writable).await.is_err());
        assert!(fs.truncate(path, 0, None).await.is_err());
        assert!(fs.unlink(path).await.is_err());
        assert!(fs.chmod(path, 0o600).await.is_err());
        assert!(fs.rename(path, "/other.txt").await.is_err());
        assert!(fs.rename("/other.txt", path).await.is_err());
        assert!(fs.utimens(path, None, None).await.is_err());

        let fh = fs.open(path, RDONLY).await.unwrap();
        let err = fs.write(path, b"x", 0, fh).await.unwrap_err();
        assert_eq!(err.errno(), rustix::io::Errno::ROFS.raw_os_error());
    }

    #[tokio::test]
    async fn test_synthetic_access() {
        let (fs, _dir) = setup();
        fs.access("/inMemFITS.fits", 0).await.unwrap();
        fs.access("/inMemFITS.fits", 0o4).await.unwrap();
        assert!(matches!(
            fs.access("/inMemFITS.fits", 0o2).await,
            Err(VfsError::PermissionDenied(_))
        ));
        assert!(fs.access("/inMemFITS.fits", 0o1).await.is_err());
    }

    #[tokio::test]
    async fn test_real_file_round_trip() {
        let (fs, dir) = setup();
        let flags = (OFlags::RDWR | OFlags::CREATE).bits() as i32;

        let fh = fs.create("/notes.txt", 0o644, flags).await.unwrap();
        assert_eq!(fs.write("/notes.txt", b"hello", 0, fh).await.unwrap(), 5);
        fs.fsync("/notes.txt", false, fh).await.unwrap();
        assert_eq!(fs.read("/notes.txt", 100, 0, fh).await.unwrap(), b"hello");
        fs.release("/notes.txt", fh).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("notes.txt")).unwrap(), b"hello");
        assert_eq!(fs.getattr("/notes.txt", None).await.unwrap().size, 5);
    }

    #[tokio::test]
    async fn test_write_through_read_only_handle() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("ro.txt"), b"data").unwrap();

        let fh = fs.open("/ro.txt", RDONLY).await.unwrap();
        let err = fs.write("/ro.txt", b"x", 0, fh).await.unwrap_err();
        assert_eq!(err.errno(), rustix::io::Errno::BADF.raw_os_error());
        assert_eq!(std::fs::read(dir.path().join("ro.txt")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_append_handle_writes_at_end() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("log.txt"), b"one\n").unwrap();

        let flags = (OFlags::WRONLY | OFlags::APPEND).bits() as i32;
        let fh = fs.open("/log.txt", flags).await.unwrap();
        fs.write("/log.txt", b"two\n", 0, fh).await.unwrap();
        fs.release("/log.txt", fh).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("log.txt")).unwrap(), b"one\ntwo\n");
    }

    #[tokio::test]
    async fn test_handle_survives_unlink_and_rename() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"beta").unwrap();

        let a = fs.open("/a.txt", RDONLY).await.unwrap();
        let b = fs.open("/b.txt", (OFlags::RDWR).bits() as i32).await.unwrap();
        fs.unlink("/a.txt").await.unwrap();
        fs.rename("/b.txt", "/c.txt").await.unwrap();

        assert_eq!(fs.read("/a.txt", 64, 0, a).await.unwrap(), b"alpha");
        fs.write("/b.txt", b"BETA", 0, b).await.unwrap();
        fs.truncate("/b.txt", 2, Some(b)).await.unwrap();
        fs.release("/a.txt", a).await.unwrap();
        fs.release("/b.txt", b).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("c.txt")).unwrap(), b"BE");
    }

    #[tokio::test]
    async fn test_create_in_missing_directory() {
        let (fs, dir) = setup();
        let flags = (OFlags::RDWR | OFlags::CREATE).bits() as i32;

        let err = fs.create("/missing/f.txt", 0o644, flags).await.unwrap_err();
        assert_eq!(err.errno(), rustix::io::Errno::NOENT.raw_os_error());
        assert!(!dir.path().join("missing").exists());
        assert_eq!(fs.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_unlink_symlink_keeps_target() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("data.txt"), b"payload").unwrap();
        fs.symlink("/alias.txt", "data.txt").await.unwrap();

        assert!(fs.getattr("/alias.txt", None).await.unwrap().is_symlink());
        fs.rename("/alias.txt", "/other.txt").await.unwrap();
        fs.unlink("/other.txt").await.unwrap();

        assert!(fs.getattr("/other.txt", None).await.is_err());
        assert_eq!(std::fs::read(dir.path().join("data.txt")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_unrenderable_header_reports_zero_size() {
        let dir = TempDir::new().unwrap();
        let context = MountConfig {
            backing_root: dir.path().to_path_buf(),
            ..Default::default()
        }
        .into_context()
        .unwrap();
        let header = Header::new()
            .with("SIMPLE", true)
            .with("BITPIX", 16)
            .with("TOOLONGKEY", 1);
        let fs = FitsDispatcher::new(context, FitsImage::new(header, Payload::I16(vec![1, 2])));

        assert_eq!(fs.getattr("/inMemFITS.fits", None).await.unwrap().size, 0);
        let fh = fs.open("/inMemFITS.fits", RDONLY).await.unwrap();
        let err = fs.read("/inMemFITS.fits", 80, 0, fh).await.unwrap_err();
        assert_eq!(err.errno(), rustix::io::Errno::IO.raw_os_error());
    }

    #[tokio::test]
    async fn test_passthrough_structure_ops() {
        let (fs, dir) = setup();
        fs.mkdir("/sub", 0o755).await.unwrap();
        assert!(fs.getattr("/sub", None).await.unwrap().is_dir());

        let fh = fs.create("/sub/a.txt", 0o644, 0).await.unwrap();
        fs.release("/sub/a.txt", fh).await.unwrap();
        fs.rename("/sub/a.txt", "/sub/b.txt").await.unwrap();
        fs.link("/sub/c.txt", "/sub/b.txt").await.unwrap();
        fs.symlink("/sub/d.txt", "b.txt").await.unwrap();
        assert_eq!(fs.readlink("/sub/d.txt").await.unwrap(), PathBuf::from("b.txt"));

        let names: Vec<_> = fs
            .readdir("/sub", None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec![".", "..", "inMemFITS.fits", "b.txt", "c.txt", "d.txt"]);

        fs.unlink("/sub/b.txt").await.unwrap();
        fs.unlink("/sub/c.txt").await.unwrap();
        fs.unlink("/sub/d.txt").await.unwrap();
        fs.rmdir("/sub").await.unwrap();
        assert!(!dir.path().join("sub").exists());
    }

    #[tokio::test]
    async fn test_chmod_and_utimens() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("f.txt"), b"").unwrap();

        fs.chmod("/f.txt", 0o100600).await.unwrap();
        assert_eq!(fs.getattr("/f.txt", None).await.unwrap().perm, 0o600);

        let when = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs.utimens("/f.txt", Some(when), Some(when)).await.unwrap();
        assert_eq!(fs.getattr("/f.txt", None).await.unwrap().mtime, when);
    }

    #[tokio::test]
    async fn test_truncate_real() {
        let (fs, dir) = setup();
        std::fs::write(dir.path().join("t.txt"), b"0123456789").unwrap();
        fs.truncate("/t.txt", 4, None).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("t.txt")).unwrap(), b"0123");
    }

    #[tokio::test]
    async fn test_statfs_and_bad_handles() {
        let (fs, _dir) = setup();
        assert!(fs.statfs("/inMemFITS.fits").await.unwrap().bsize > 0);
        assert!(matches!(fs.release("/", 99).await, Err(VfsError::BadHandle(99))));
        assert!(matches!(fs.flush("/", 99).await, Err(VfsError::BadHandle(99))));
    }

    #[tokio::test]
    async fn test_read_only_backing() {
        let dir = TempDir::new().unwrap();
        let context = MountConfig {
            backing_root: dir.path().to_path_buf(),
            read_only_backing: true,
            ..Default::default()
        }
        .into_context()
        .unwrap();
        let fs = FitsDispatcher::new(context, image());

        assert!(matches!(fs.mkdir("/x", 0o755).await, Err(VfsError::ReadOnly)));
        let fh = fs.open("/inMemFITS.fits", RDONLY).await.unwrap();
        assert_eq!(fs.read("/inMemFITS.fits", 10, 0, fh).await.unwrap().len(), 10);
    }
}
