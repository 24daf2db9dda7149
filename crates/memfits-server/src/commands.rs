//! Commands that drive a [`FitsDispatcher`] the way a kernel transport
//! would, without needing a mount.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use memfits_kernel::vfs::FileType;
use memfits_kernel::FitsDispatcher;

/// Default read size, matching the common 128 KiB kernel request.
pub const DEFAULT_CHUNK: u32 = 128 * 1024;

/// Describe the synthetic image: card count and section sizes.
pub fn info(fs: &FitsDispatcher) -> Result<String> {
    let image = fs.image();
    let layout = image.layout().context("image header is not renderable")?;
    let header = image.header();

    let mut out = String::new();
    out.push_str(&format!("name:        {}\n", fs.context().synthetic_name()));
    out.push_str(&format!("cards:       {}\n", header.card_count()));
    out.push_str(&format!("elements:    {}\n", image.payload().len()));
    out.push_str(&format!("bitpix:      {}\n", header.element_kind()?.bitpix()));
    out.push_str(&format!("header:      {} bytes\n", layout.header_len));
    out.push_str(&format!(
        "data:        {} bytes ({} raw)\n",
        layout.data_len, layout.data_raw_len
    ));
    out.push_str(&format!("total:       {} bytes\n", layout.total_len()));
    Ok(out)
}

/// List a directory as the mount would show it, one entry per line with
/// a type marker and size.
pub async fn ls(fs: &FitsDispatcher, path: &str) -> Result<String> {
    let entries = fs
        .readdir(path, None)
        .await
        .with_context(|| format!("readdir {path}"))?;

    let base = path.trim_end_matches('/');
    let mut out = String::new();
    for entry in entries {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        let child = format!("{base}/{}", entry.name);
        let size = match fs.getattr(&child, None).await {
            Ok(attr) => attr.size,
            Err(e) => {
                tracing::warn!(path = %child, error = %e, "getattr failed");
                0
            }
        };
        let marker = match entry.kind {
            FileType::Directory => 'd',
            FileType::Symlink => 'l',
            FileType::File => '-',
        };
        out.push_str(&format!("{marker} {size:>12} {}\n", entry.name));
    }
    Ok(out)
}

/// Copy a file out of the mount in `chunk`-sized reads.
///
/// Returns the number of bytes written.
pub async fn cat<W: Write>(fs: &FitsDispatcher, path: &str, chunk: u32, out: &mut W) -> Result<u64> {
    anyhow::ensure!(chunk > 0, "chunk size must be positive");

    let fh = fs
        .open(path, 0)
        .await
        .with_context(|| format!("open {path}"))?;

    let copied = copy_out(fs, path, fh, chunk, out).await;
    // release even when a read failed
    fs.release(path, fh)
        .await
        .with_context(|| format!("release {path}"))?;
    copied
}

async fn copy_out<W: Write>(
    fs: &FitsDispatcher,
    path: &str,
    fh: u64,
    chunk: u32,
    out: &mut W,
) -> Result<u64> {
    let mut offset = 0u64;
    loop {
        let piece = fs
            .read(path, chunk, offset, fh)
            .await
            .with_context(|| format!("read {path} at {offset}"))?;
        if piece.is_empty() {
            break;
        }
        out.write_all(&piece)?;
        offset += piece.len() as u64;
    }
    out.flush()?;
    Ok(offset)
}

/// Write the synthetic image to a real file outside the mount.
pub async fn export(fs: &FitsDispatcher, dest: &Path, chunk: u32) -> Result<u64> {
    let path = format!("/{}", fs.context().synthetic_name());
    let file = std::fs::File::create(dest)
        .with_context(|| format!("create {}", dest.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    let written = cat(fs, &path, chunk, &mut writer).await?;
    tracing::info!(dest = %dest.display(), bytes = written, "exported image");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memfits_kernel::{FitsImage, Header, MountConfig, Payload};
    use tempfile::TempDir;

    fn setup() -> (FitsDispatcher, TempDir) {
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
            .with("NAXIS", 1)
            .with("NAXIS1", 1500);
        let image = FitsImage::new(header, Payload::I16(vec![7; 1500]));
        (FitsDispatcher::new(context, image), dir)
    }

    #[test]
    fn test_info() {
        let (fs, _dir) = setup();
        let text = info(&fs).unwrap();
        assert!(text.contains("cards:       5"));
        assert!(text.contains("data:        5760 bytes (3000 raw)"));
        assert!(text.contains("total:       8640 bytes"));
    }

    #[tokio::test]
    async fn test_ls_root() {
        let (fs, dir) = setup();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();

        let text = ls(&fs, "/").await.unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "-         8640 inMemFITS.fits");
        assert_eq!(lines[1], "-            3 a.txt");
        assert!(lines[2].starts_with('d'));
        assert!(lines[2].ends_with(" sub"));
    }

    #[tokio::test]
    async fn test_cat_small_chunks() {
        let (fs, _dir) = setup();
        let mut out = Vec::new();
        let n = cat(&fs, "/inMemFITS.fits", 1000, &mut out).await.unwrap();
        assert_eq!(n, 8640);
        assert_eq!(out.len(), 8640);
        assert_eq!(fs.open_handles(), 0);

        let mut zero = Vec::new();
        assert!(cat(&fs, "/inMemFITS.fits", 0, &mut zero).await.is_err());
    }

    #[tokio::test]
    async fn test_export() {
        let (fs, dir) = setup();
        let dest = dir.path().join("out.bin");
        let n = export(&fs, &dest, DEFAULT_CHUNK).await.unwrap();
        assert_eq!(n, 8640);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 8640);
    }
}
