//! The `fs` host module: synchronous file system calls.
//!
//! Every call completes before returning and never touches the scheduler.
//! Relative paths resolve against the module's base directory.

use crate::error::HostError;
use core_types::Value;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Data returned by [`FileSystem::read_file_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    /// Decoded as UTF-8 (invalid sequences replaced)
    Text(String),
    /// Raw bytes, for any encoding other than UTF-8
    Bytes(Vec<u8>),
}

impl FileContents {
    /// The text, if this was read as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContents::Text(text) => Some(text),
            FileContents::Bytes(_) => None,
        }
    }

    /// The value a script sees: a string, or an array of byte values.
    pub fn into_value(self) -> Value {
        match self {
            FileContents::Text(text) => Value::String(text),
            FileContents::Bytes(bytes) => {
                Value::Array(bytes.into_iter().map(|b| Value::Smi(b as i32)).collect())
            }
        }
    }
}

/// Result of [`FileSystem::stat_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Regular file (anything that is not a directory)
    pub is_file: bool,
    /// Directory
    pub is_directory: bool,
    /// Size in bytes
    pub size: u64,
    /// Permission bits
    pub mode: u32,
    /// Modification time, seconds since the Unix epoch
    pub mtime: i64,
}

impl FileStat {
    /// The record a script sees.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("isFile", Value::Boolean(self.is_file)),
            ("isDirectory", Value::Boolean(self.is_directory)),
            ("size", Value::Double(self.size as f64)),
            ("mode", Value::Double(self.mode as f64)),
            ("mtime", Value::Double(self.mtime as f64)),
        ])
    }
}

/// File system access rooted at a base directory.
///
/// # Examples
///
/// ```
/// use host_modules::{FileContents, FileSystem};
///
/// let dir = tempfile::tempdir().unwrap();
/// let fs = FileSystem::new(dir.path());
///
/// fs.write_file_sync("test.txt", "Hello from fs!").unwrap();
/// assert!(fs.exists_sync("test.txt"));
/// assert_eq!(
///     fs.read_file_sync("test.txt", Some("utf8")).unwrap(),
///     FileContents::Text("Hello from fs!".to_string())
/// );
/// fs.unlink_sync("test.txt").unwrap();
/// assert!(fs.read_file_sync("test.txt", None).unwrap_err().is_not_found());
/// ```
#[derive(Debug, Clone)]
pub struct FileSystem {
    base_dir: PathBuf,
}

impl FileSystem {
    /// Creates the module with `base_dir` as the root for relative paths.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, HostError> {
        if path.is_empty() {
            return Err(HostError::InvalidArgument("path must not be empty".to_string()));
        }
        let path = Path::new(path);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        })
    }

    /// Reads a file. `None`, `"utf8"` and `"utf-8"` decode as text; any
    /// other encoding returns the raw bytes.
    pub fn read_file_sync(&self, path: &str, encoding: Option<&str>) -> Result<FileContents, HostError> {
        let full = self.resolve(path)?;
        let data = std::fs::read(&full).map_err(|e| HostError::from_io(path, e))?;
        tracing::trace!(path = %full.display(), bytes = data.len(), "read file");
        Ok(match encoding.unwrap_or("utf8") {
            "utf8" | "utf-8" => FileContents::Text(String::from_utf8_lossy(&data).into_owned()),
            _ => FileContents::Bytes(data),
        })
    }

    /// Creates or truncates a file and writes `data`.
    pub fn write_file_sync(&self, path: &str, data: &str) -> Result<(), HostError> {
        let full = self.resolve(path)?;
        std::fs::write(&full, data).map_err(|source| HostError::Io {
            path: path.to_string(),
            source,
        })?;
        tracing::trace!(path = %full.display(), bytes = data.len(), "wrote file");
        Ok(())
    }

    /// True when `path` exists. Never fails.
    pub fn exists_sync(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|full| full.exists())
    }

    /// Creates a directory, with missing parents when `recursive`.
    pub fn mkdir_sync(&self, path: &str, recursive: bool) -> Result<(), HostError> {
        let full = self.resolve(path)?;
        let result = if recursive {
            std::fs::create_dir_all(&full)
        } else {
            std::fs::create_dir(&full)
        };
        result.map_err(|e| HostError::from_io(path, e))
    }

    /// Entry names of a directory, sorted.
    pub fn readdir_sync(&self, path: &str) -> Result<Vec<String>, HostError> {
        let full = self.resolve(path)?;
        let entries = std::fs::read_dir(&full).map_err(|e| HostError::from_io(path, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HostError::from_io(path, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Removes a file.
    pub fn unlink_sync(&self, path: &str) -> Result<(), HostError> {
        let full = self.resolve(path)?;
        std::fs::remove_file(&full).map_err(|e| HostError::from_io(path, e))
    }

    /// Metadata of `path`.
    pub fn stat_sync(&self, path: &str) -> Result<FileStat, HostError> {
        let full = self.resolve(path)?;
        let meta = std::fs::metadata(&full).map_err(|e| HostError::from_io(path, e))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs() as i64);
        Ok(FileStat {
            is_file: !meta.is_dir(),
            is_directory: meta.is_dir(),
            size: meta.len(),
            mode: permission_bits(&meta),
            mtime,
        })
    }
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
