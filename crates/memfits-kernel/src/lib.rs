//! # memfits-kernel
//!
//! Serves an in-memory FITS image as a file inside an otherwise ordinary
//! directory tree.
//!
//! - [`fits`] renders a header and flat payload into block-aligned bytes
//! - [`session`] builds that image once per open and slices it per read
//! - [`router`] decides which paths are synthetic and which are real
//! - [`dispatcher`] answers filesystem callbacks from either side
//! - [`vfs`] is the passthrough backing store

pub mod config;
pub mod dispatcher;
pub mod fits;
pub mod router;
pub mod session;
pub mod vfs;

pub use config::{ConfigError, MountConfig, MountContext};
pub use dispatcher::FitsDispatcher;
pub use fits::{FitsError, FitsImage, FitsResult, Header, HeaderField, HeaderValue, Payload};
pub use router::{PathRouter, Route};
pub use session::VirtualFileSession;
pub use vfs::{LocalBackend, VfsError, VfsOps, VfsResult};
