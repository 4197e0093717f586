use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use super::{ExtractionError, Result};

/// Front and back photos located in an image folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentImages {
    pub front: Option<PathBuf>,
    pub back: Option<PathBuf>,
}

fn looks_like_front(name: &str) -> bool {
    name.starts_with("af") || name.starts_with("front") || name.contains("front")
}

fn looks_like_back(name: &str) -> bool {
    name.starts_with("ab") || name.starts_with("back") || name.contains("back")
}

fn is_sidecar_text(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("txt"))
}

/// Picks the front and back photos from `dir` by file-name convention.
///
/// Files are visited in sorted order; the first name matching each side
/// wins. When neither side matches and at least two files exist, the first
/// two files are taken as front and back. Recognized-text sidecars (`.txt`)
/// are skipped. A missing directory yields no images rather than an error.
pub fn find_document_images(dir: &Path) -> Result<DocumentImages> {
    if !dir.is_dir() {
        debug!("Image folder {:?} does not exist", dir);
        return Ok(DocumentImages::default());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && !is_sidecar_text(path))
        .collect();
    files.sort();

    let mut images = DocumentImages::default();
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if images.front.is_none() && looks_like_front(&name) {
            images.front = Some(path.clone());
        }
        if images.back.is_none() && looks_like_back(&name) {
            images.back = Some(path.clone());
        }
    }

    if images.front.is_none() && images.back.is_none() && files.len() >= 2 {
        images.front = Some(files[0].clone());
        images.back = Some(files[1].clone());
    }

    info!("Selected images: front={:?} back={:?}", images.front, images.back);
    Ok(images)
}

/// Writes `contents` to `path` through a temp file in the same directory so
/// readers never observe a partially written report.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp_file = NamedTempFile::new_in(&parent)?;
    temp_file.write_all(contents)?;
    temp_file
        .persist(path)
        .map_err(|e| ExtractionError::Io(e.error))?;
    Ok(())
}
