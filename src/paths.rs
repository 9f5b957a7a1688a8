//! XDG-style path utilities for configuration and data directories.
//!
//! XDG Base Directory conventions are preferred over OS-specific locations on
//! every platform.

use std::path::PathBuf;

const APP_DIR: &str = "cliplens";

/// File holding the encrypted history.
pub const HISTORY_FILE: &str = "history.enc";

/// Returns the configuration directory.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/cliplens` if `XDG_CONFIG_HOME` is set
/// 2. `~/.config/cliplens` otherwise
pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME").map_or_else(
        |_| home_dir().join(".config").join(APP_DIR),
        |xdg| PathBuf::from(xdg).join(APP_DIR),
    )
}

/// Returns the data directory (history file, downloaded weights).
///
/// Resolution order:
/// 1. `$XDG_DATA_HOME/cliplens` if `XDG_DATA_HOME` is set
/// 2. `~/.local/share/cliplens` otherwise
pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME").map_or_else(
        |_| home_dir().join(".local").join("share").join(APP_DIR),
        |xdg| PathBuf::from(xdg).join(APP_DIR),
    )
}

pub fn history_file() -> PathBuf {
    data_dir().join(HISTORY_FILE)
}

/// Where on-device model weights are downloaded.
pub fn models_dir() -> PathBuf {
    data_dir().join("models")
}

// Falls back to the working directory when no home directory is known.
fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_var<T>(key: &str, value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let original = std::env::var(key).ok();
        match value {
            Some(value) => unsafe { std::env::set_var(key, value) },
            None => unsafe { std::env::remove_var(key) },
        }
        let result = f();
        match original {
            Some(original) => unsafe { std::env::set_var(key, original) },
            None => unsafe { std::env::remove_var(key) },
        }
        result
    }

    #[test]
    #[serial]
    fn test_config_dir_default() {
        let dir = with_var("XDG_CONFIG_HOME", None, config_dir);
        assert!(dir.ends_with(".config/cliplens"));
    }

    #[test]
    #[serial]
    fn test_config_dir_xdg_override() {
        let dir = with_var("XDG_CONFIG_HOME", Some("/custom/config"), config_dir);
        assert_eq!(dir, PathBuf::from("/custom/config/cliplens"));
    }

    #[test]
    #[serial]
    fn test_data_paths_follow_xdg_data_home() {
        let (history, models) = with_var("XDG_DATA_HOME", Some("/custom/data"), || {
            (history_file(), models_dir())
        });
        assert_eq!(history, PathBuf::from("/custom/data/cliplens/history.enc"));
        assert_eq!(models, PathBuf::from("/custom/data/cliplens/models"));
    }

    #[test]
    #[serial]
    fn test_data_dir_default() {
        let dir = with_var("XDG_DATA_HOME", None, data_dir);
        assert!(dir.ends_with(".local/share/cliplens"));
    }
}
