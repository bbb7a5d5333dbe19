//! Filesystem helpers

pub mod dir;
pub mod file;

use std::path::{Path, PathBuf};

/// Join a user supplied relative path onto `base`. Leading slashes are
/// dropped so the result never escapes to the filesystem root.
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim().trim_start_matches('/');
    if relative.is_empty() || relative == "." {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}
