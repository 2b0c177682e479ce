//! Small helpers shared by the binary and report rendering.

use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn warn_prefix() -> String {
    if colors_enabled() {
        "warning:".yellow().bold().to_string()
    } else {
        "warning:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if colors_enabled() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// `path` relative to `base` with `/` separators; the file name when `path`
/// is `base` itself, and `path` unchanged when no relative form exists.
pub fn rel_to(path: &Path, base: &Path) -> String {
    let rel = match pathdiff::diff_paths(path, base) {
        Some(r) if r.as_os_str().is_empty() => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
        Some(r) => r,
        None => path.to_path_buf(),
    };
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rel_to() {
        let base = Path::new("/work/proj");
        assert_eq!(rel_to(Path::new("/work/proj/src/a.c"), base), "src/a.c");
        assert_eq!(rel_to(Path::new("/work/proj/a.c"), Path::new("/work/proj/a.c")), "a.c");
        assert_eq!(rel_to(Path::new("/other/b.c"), base), "../../other/b.c");
    }
}
