//! Backing-store abstraction.
//!
//! Everything under the mount that is not the synthetic image lives in a
//! real directory and is reached through these pieces:
//!
//! - [`VfsOps`] - Core trait for filesystem operations
//! - [`LocalBackend`] - Local filesystem access (with path security)
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   The callback transport handles inode ↔ path mapping.
//! - **Open files are values**: `open` and `create` return an
//!   [`OpenFile`] that the dispatcher keeps in its handle table until
//!   release; contents are only ever read or written through it.

pub mod backends;
mod error;
mod file;
mod ops;
mod types;

pub use backends::LocalBackend;
pub use error::{VfsError, VfsResult};
pub use file::OpenFile;
pub use ops::VfsOps;
pub use types::{AccessMode, DirEntry, FileAttr, FileType, OpenFlags, SetAttr, StatFs};
