//! The `path` host module.
//!
//! Paths are handled lexically with `/` as the separator; nothing here
//! touches the file system. Cleaning follows the usual rules: repeated
//! separators collapse, `.` elements drop, `..` removes the preceding
//! element (or is kept at the front of a relative path), and an empty
//! result becomes `"."`.

use core_types::Value;

/// Path segment separator
pub const SEP: &str = "/";

/// Separator of `PATH`-style lists
pub const DELIMITER: &str = ":";

/// Components returned by [`PathModule::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// `"/"` for absolute paths, empty otherwise
    pub root: String,
    /// Directory part, as [`PathModule::dirname`]
    pub dir: String,
    /// Last element including extension
    pub base: String,
    /// Extension including the dot
    pub ext: String,
    /// Last element without extension
    pub name: String,
}

impl ParsedPath {
    /// The record a script sees.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("root", Value::from(self.root.as_str())),
            ("dir", Value::from(self.dir.as_str())),
            ("base", Value::from(self.base.as_str())),
            ("ext", Value::from(self.ext.as_str())),
            ("name", Value::from(self.name.as_str())),
        ])
    }
}

fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join(SEP);
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Path utilities; `resolve` is relative to the module's working directory.
///
/// # Examples
///
/// ```
/// use host_modules::PathModule;
///
/// let path = PathModule::new("/home/app");
/// assert_eq!(path.join(&["foo", "bar", "baz.js"]), "foo/bar/baz.js");
/// assert_eq!(path.extname("test.js"), ".js");
/// assert_eq!(path.dirname("/foo/bar/baz.js"), "/foo/bar");
/// assert_eq!(path.resolve(&["src", "../lib"]), "/home/app/lib");
/// ```
#[derive(Debug, Clone)]
pub struct PathModule {
    cwd: String,
}

impl PathModule {
    /// Creates the module. A relative `cwd` is cleaned but kept relative.
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            cwd: clean(&cwd.into()),
        }
    }

    /// The directory `resolve` starts from.
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Joins non-empty segments with `/` and cleans the result. Joining only
    /// empty segments gives an empty string.
    pub fn join(&self, segments: &[&str]) -> String {
        let parts: Vec<&str> = segments.iter().copied().filter(|s| !s.is_empty()).collect();
        if parts.is_empty() {
            return String::new();
        }
        clean(&parts.join(SEP))
    }

    /// Joins the segments and makes the result absolute against the working
    /// directory.
    pub fn resolve(&self, segments: &[&str]) -> String {
        let joined = self.join(segments);
        if self.is_absolute(&joined) {
            joined
        } else {
            clean(&format!("{}/{}", self.cwd, joined))
        }
    }

    /// Cleans a path.
    pub fn normalize(&self, path: &str) -> String {
        clean(path)
    }

    /// Last element of `path`, with `ext` removed when it is a suffix.
    pub fn basename(&self, path: &str, ext: Option<&str>) -> String {
        if path.is_empty() {
            return ".".to_string();
        }
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return SEP.to_string();
        }
        let base = match trimmed.rfind('/') {
            Some(i) => &trimmed[i + 1..],
            None => trimmed,
        };
        match ext {
            Some(ext) if !ext.is_empty() && base.ends_with(ext) => {
                base[..base.len() - ext.len()].to_string()
            }
            _ => base.to_string(),
        }
    }

    /// Everything before the last element, cleaned.
    pub fn dirname(&self, path: &str) -> String {
        match path.rfind('/') {
            Some(i) => clean(&path[..=i]),
            None => ".".to_string(),
        }
    }

    /// Suffix of the last element starting at its last `.`, or `""`.
    pub fn extname(&self, path: &str) -> String {
        for (i, c) in path.char_indices().rev() {
            match c {
                '/' => break,
                '.' => return path[i..].to_string(),
                _ => {}
            }
        }
        String::new()
    }

    /// True when `path` starts at the root.
    pub fn is_absolute(&self, path: &str) -> bool {
        path.starts_with('/')
    }

    /// Path from `from` to `to`, or `""` when there is none (one absolute,
    /// one relative, or `from` climbing out through `..`).
    pub fn relative(&self, from: &str, to: &str) -> String {
        let base = clean(from);
        let target = clean(to);
        if base == target {
            return ".".to_string();
        }
        if self.is_absolute(&base) != self.is_absolute(&target) {
            return String::new();
        }
        let split = |p: &str| -> Vec<String> {
            p.split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string)
                .collect()
        };
        let (base, target) = (split(&base), split(&target));
        let common = base
            .iter()
            .zip(target.iter())
            .take_while(|(a, b)| a == b)
            .count();
        if base[common..].iter().any(|s| s == "..") {
            return String::new();
        }
        let mut parts: Vec<&str> = vec![".."; base.len() - common];
        parts.extend(target[common..].iter().map(String::as_str));
        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join(SEP)
        }
    }

    /// Splits a path into its components.
    pub fn parse(&self, path: &str) -> ParsedPath {
        let base = self.basename(path, None);
        let ext = self.extname(path);
        let name = base
            .strip_suffix(ext.as_str())
            .filter(|_| !ext.is_empty())
            .unwrap_or(&base)
            .to_string();
        ParsedPath {
            root: if self.is_absolute(path) { SEP.to_string() } else { String::new() },
            dir: self.dirname(path),
            base,
            ext,
            name,
        }
    }

    /// Inverse of [`parse`](Self::parse): `dir` joined with `base`, or with
    /// `name + ext` when `base` is empty.
    pub fn format(&self, parsed: &ParsedPath) -> String {
        let base = if parsed.base.is_empty() {
            format!("{}{}", parsed.name, parsed.ext)
        } else {
            parsed.base.clone()
        };
        self.join(&[&parsed.dir, &base])
    }

    /// [`SEP`]
    pub fn sep(&self) -> &'static str {
        SEP
    }

    /// [`DELIMITER`]
    pub fn delimiter(&self) -> &'static str {
        DELIMITER
    }
}

impl Default for PathModule {
    fn default() -> Self {
        Self::new("/")
    }
}
