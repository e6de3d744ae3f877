//! Item path rules.
//!
//! Item paths are UTF-8, `/`-separated, relative, and 1 to 255 bytes long.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result, MAX_PATH_SIZE};

/// Validate an item path and return its encoded length.
pub fn validate_item_path(path: &str) -> Result<u8> {
    if path.is_empty() {
        return Err(Error::BadItemPath {
            path: String::new(),
            reason: "path is empty",
        });
    }
    if path.len() > MAX_PATH_SIZE {
        return Err(Error::BadItemPath {
            path: path.to_string(),
            reason: "path is longer than 255 bytes",
        });
    }
    Ok(path.len() as u8)
}

/// Convert a path relative to some root into an item path.
pub fn item_path_from_relative(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();

    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| Error::BadItemPath {
                    path: relative.to_string_lossy().into_owned(),
                    reason: "path is not valid UTF-8",
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::BadItemPath {
                    path: relative.to_string_lossy().into_owned(),
                    reason: "path is not relative",
                })
            }
        }
    }

    let path = parts.join("/");
    validate_item_path(&path)?;
    Ok(path)
}

/// Resolve where an item should be written below `root`.
///
/// Absolute paths and `..` components are refused so an archive can never
/// write outside the output directory.
pub fn output_path(root: &Path, item_path: &str) -> Result<PathBuf> {
    let mut output = root.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(item_path).components() {
        match component {
            Component::Normal(part) => {
                output.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::BadItemPath {
                    path: item_path.to_string(),
                    reason: "path escapes the output directory",
                })
            }
        }
    }

    if depth == 0 {
        return Err(Error::BadItemPath {
            path: item_path.to_string(),
            reason: "path names no file",
        });
    }

    Ok(output)
}
