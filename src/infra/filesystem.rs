//! Filesystem operations
//!
//! Handles file and directory operations.

use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Replace `path` with `content` through a temporary file in the same directory
///
/// Readers never observe a half-written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), FilesystemError> {
    let write_err = |e: std::io::Error| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            create_dir_all(parent)?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(content).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy `from` to `to`, creating the destination directory
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Remove a file; a file that is already gone is not an error
pub fn remove_file(path: &Path) -> Result<(), FilesystemError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FilesystemError::RemoveFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
    }
}

/// SHA-256 of a file, read in chunks
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Lexically normalize a path: drop `.` and fold `..` where possible
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalized absolute form of `path`, resolved against the current directory
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        normalize_path(&cwd.join(path))
    }
}

/// `path` relative to `base` after making both absolute, if it lies below `base`
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    absolute_path(path)
        .strip_prefix(absolute_path(base))
        .ok()
        .map(Path::to_path_buf)
}

/// `file://` URL of `path`
pub fn file_uri(path: &Path) -> Option<String> {
    reqwest::Url::from_file_path(absolute_path(path))
        .ok()
        .map(String::from)
}

/// Forward-slash form of a relative path, as used in lock file names
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        std::fs::write(&path, "foo").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"
        );
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("out.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(read_file(&path).unwrap(), "second");
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let tmp = TempDir::new().unwrap();
        assert!(remove_file(&tmp.path().join("missing")).is_ok());
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/data/wheels");
        assert_eq!(
            relative_to(Path::new("/data/wheels/sub/../a.whl"), base),
            Some(PathBuf::from("a.whl"))
        );
        assert_eq!(
            relative_to(Path::new("/data/wheels/sub/b.whl"), base),
            Some(PathBuf::from("sub/b.whl"))
        );
        assert_eq!(relative_to(Path::new("/elsewhere/c.whl"), base), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_uri() {
        assert_eq!(
            file_uri(Path::new("/data/dist/../py_one-1.0.0-py3-none-any.whl")).as_deref(),
            Some("file:///data/py_one-1.0.0-py3-none-any.whl")
        );
        assert_eq!(
            file_uri(Path::new("/data/with space.whl")).as_deref(),
            Some("file:///data/with%20space.whl")
        );
    }

    #[test]
    fn test_to_posix() {
        assert_eq!(to_posix(&PathBuf::from("sub").join("b.whl")), "sub/b.whl");
    }
}
