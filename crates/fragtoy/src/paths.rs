use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "FRAGTOY_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "FRAGTOY_DATA_DIR";
pub const ENV_ASSETS_DIR: &str = "FRAGTOY_ASSETS_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Fragtoy";
const APPLICATION: &str = "fragtoy";

pub const CONFIG_FILE_NAME: &str = "fragtoy.toml";
const ASSETS_DIR_NAME: &str = "assets";

/// How many parents of the executable's directory are searched for `assets/`.
const EXECUTABLE_SEARCH_DEPTH: usize = 5;

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        Ok(Self {
            config_dir: env_override(ENV_CONFIG_DIR)
                .unwrap_or_else(|| project_dirs.config_dir().to_path_buf()),
            data_dir: env_override(ENV_DATA_DIR)
                .unwrap_or_else(|| project_dirs.data_dir().to_path_buf()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.data_dir.join("screenshots")
    }

    /// Directories searched for bundled assets, most specific first: the
    /// explicit directory, `./assets`, `assets/` beside the executable or one
    /// of its parents, and finally the user data directory.
    pub fn asset_roots(&self, explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(dir) = explicit {
            roots.push(dir.to_path_buf());
        }
        if let Ok(cwd) = env::current_dir() {
            roots.push(cwd.join(ASSETS_DIR_NAME));
        }
        if let Some(exe_dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            for dir in exe_dir.ancestors().take(EXECUTABLE_SEARCH_DEPTH + 1) {
                roots.push(dir.join(ASSETS_DIR_NAME));
            }
        }
        roots.push(self.data_dir.join(ASSETS_DIR_NAME));

        let mut unique = Vec::with_capacity(roots.len());
        for root in roots {
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        unique
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

/// Resolves asset names against an ordered list of directories.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    roots: Vec<PathBuf>,
}

impl AssetLocator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns the first regular file named `name` under the roots. Absolute
    /// names are returned as-is when they exist.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        self.roots
            .iter()
            .map(|root| root.join(candidate))
            .find(|path| path.is_file())
    }
}
