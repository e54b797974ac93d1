//! Path resolution for realmsync
//!
//! # Environment Variables
//!
//! - `REALMSYNC_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/realmsync`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `REALMSYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/realmsync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\realmsync`
//!    - macOS/Linux: `~/.config/realmsync`
//!
//! Definition files live under `<config_dir>/realms` unless paths are given
//! on the command line.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "REALMSYNC_CONFIG_DIR";

/// Get the realmsync config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(
        std::env::var(ENV_CONFIG_DIR).ok().as_deref(),
        std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
    )
}

fn resolve_config_dir(override_dir: Option<&str>, xdg_config: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        let path = expand(dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Some(xdg_config) = xdg_config {
        let path = PathBuf::from(xdg_config).join("realmsync");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("realmsync");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("realmsync");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default location of realm definition files
pub fn definitions_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("realms"))
}

/// Expand ~ and environment variables in a path string.
///
/// If expansion fails (an unknown `$VAR`), the path is returned unchanged.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let result = resolve_config_dir(Some("/custom/config"), Some("/xdg")).unwrap();
        assert_eq!(result, PathBuf::from("/custom/config"));
    }

    #[test]
    fn test_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let result = resolve_config_dir(Some("~/dotfiles/realmsync"), None).unwrap();
        assert_eq!(result, home.join("dotfiles").join("realmsync"));
    }

    #[test]
    fn test_xdg_config_home() {
        let result = resolve_config_dir(None, Some("/tmp/xdg-config-test")).unwrap();
        assert_eq!(result, PathBuf::from("/tmp/xdg-config-test/realmsync"));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_config_dir_unix() {
        let result = resolve_config_dir(None, None).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join(".config").join("realmsync"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_REALMSYNC_1/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_REALMSYNC_1/file"));
    }
}
