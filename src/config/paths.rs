use std::fs;
use std::path::PathBuf;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::Result;

/// Locations of skycast's configuration
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root configuration directory (~/.skycast)
    pub root: PathBuf,
    /// Configuration file path (~/.skycast/config.toml)
    pub config_file: PathBuf,
}

impl Paths {
    /// Paths under the user's home directory
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME")?;
        Ok(Self::in_dir(PathBuf::from(home).join(".skycast")))
    }

    /// Paths rooted at an explicit directory
    pub fn in_dir(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.toml"),
            root,
        }
    }

    /// Create the configuration directory, owner-only on unix
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        #[cfg(unix)]
        {
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.root, perms)?;
        }

        Ok(())
    }

    pub fn config_exists(&self) -> bool {
        self.config_file.exists()
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::in_dir(PathBuf::from(".skycast")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_lives_in_root() {
        let paths = Paths::in_dir(PathBuf::from("/tmp/skycast-test"));
        assert_eq!(paths.config_file, PathBuf::from("/tmp/skycast-test/config.toml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dirs_is_owner_only() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::in_dir(temp_dir.path().join("nested"));
        paths.ensure_dirs().unwrap();

        let mode = fs::metadata(&paths.root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
        assert!(!paths.config_exists());
    }
}
