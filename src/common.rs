use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Home directory from `HOME`, or `USERPROFILE` on Windows.
pub fn home_dir() -> Result<PathBuf> {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .context("Could not determine home directory")
}

/// Expands a leading `~` or `~/` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(path),
    };

    match home_dir() {
        Ok(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        Err(_) => PathBuf::from(path),
    }
}

/// Directory holding the running executable, if it can be determined.
pub fn executable_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = home_dir().unwrap();
        assert_eq!(expand_tilde("~/actions.json"), home.join("actions.json"));
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~other/x"), PathBuf::from("~other/x"));
        assert_eq!(expand_tilde("/etc/x"), PathBuf::from("/etc/x"));
    }
}
