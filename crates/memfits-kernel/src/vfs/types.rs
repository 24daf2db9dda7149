//! Attribute and flag types shared by the dispatcher and backends.
//!
//! Path-based, no inodes. A callback transport maps these onto whatever
//! attribute structs its kernel interface wants.

use rustix::fs::OFlags;
use std::time::SystemTime;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileType {
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// What `getattr` reports for one path.
#[derive(Debug, Clone)]
pub struct FileAttr {
    pub size: u64,
    pub kind: FileType,
    /// Permission bits only, e.g. `0o644`.
    pub perm: u32,
    pub mtime: SystemTime,
    pub atime: Option<SystemTime>,
    pub ctime: Option<SystemTime>,
    pub nlink: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl FileAttr {
    /// A regular file stamped with the current time.
    pub fn file(size: u64, perm: u32) -> Self {
        Self::synthesized(FileType::File, size, perm, 1)
    }

    /// A directory stamped with the current time; nlink counts `.` and `..`.
    pub fn directory(perm: u32) -> Self {
        Self::synthesized(FileType::Directory, 0, perm, 2)
    }

    fn synthesized(kind: FileType, size: u64, perm: u32, nlink: u32) -> Self {
        let now = SystemTime::now();
        Self {
            size,
            kind,
            perm,
            mtime: now,
            atime: Some(now),
            ctime: Some(now),
            nlink,
            uid: None,
            gid: None,
        }
    }

    /// Attach an owner, builder style.
    pub fn owned_by(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

/// One `readdir` entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name, not the full path.
    pub name: String,
    pub kind: FileType,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// Attribute changes from `chmod`, `chown` and `utimens`. `None` leaves
/// the attribute alone.
#[derive(Debug, Clone, Default)]
pub struct SetAttr {
    pub mtime: Option<SystemTime>,
    pub atime: Option<SystemTime>,
    pub perm: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl SetAttr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn with_atime(mut self, atime: SystemTime) -> Self {
        self.atime = Some(atime);
        self
    }

    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = Some(perm);
        self
    }

    pub fn with_owner(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

/// `statvfs` figures for the backing filesystem.
#[derive(Debug, Clone)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    /// Free blocks available to unprivileged users.
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

/// The parts of `open(2)` flags a backend acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
    /// `O_EXCL`: creation fails if the file exists.
    pub exclusive: bool,
}

impl OpenFlags {
    /// Decode the raw `open(2)` flags a transport hands over.
    pub fn from_raw(flags: i32) -> Self {
        let flags = OFlags::from_bits_retain(flags as u32);
        let access = flags & (OFlags::WRONLY | OFlags::RDWR);
        Self {
            read: access != OFlags::WRONLY,
            write: !access.is_empty(),
            append: flags.contains(OFlags::APPEND),
            create: flags.contains(OFlags::CREATE),
            truncate: flags.contains(OFlags::TRUNC),
            exclusive: flags.contains(OFlags::EXCL),
        }
    }

    /// Returns true if the open could modify the file.
    pub fn mutates(&self) -> bool {
        self.write || self.append || self.create || self.truncate
    }
}

/// Permission bits requested by `access(2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessMode {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl AccessMode {
    /// Decode an `R_OK | W_OK | X_OK` mask; zero is `F_OK`.
    pub fn from_mask(mask: i32) -> Self {
        Self {
            read: mask & 0o4 != 0,
            write: mask & 0o2 != 0,
            execute: mask & 0o1 != 0,
        }
    }
}
