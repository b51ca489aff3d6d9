use crate::domain::{config::ClientSettings, error::{ClientError, ClientResult}};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file locator and loader
pub struct SettingsManager {
    global_settings_path: Option<PathBuf>,
    project_settings_path: Option<PathBuf>,
}

impl SettingsManager {
    /// Create a manager using the user's home directory and the current project
    pub fn new() -> Self {
        Self {
            global_settings_path: Self::get_global_settings_path(),
            project_settings_path: Self::find_project_settings_path(),
        }
    }

    /// Create a manager with explicit file locations
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_settings_path: global,
            project_settings_path: project,
        }
    }

    /// Settings file `load_settings` reads: the project file if present, else the global one
    pub fn settings_path(&self) -> Option<&Path> {
        [&self.project_settings_path, &self.global_settings_path]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .find(|path| path.exists())
    }

    /// Load settings, the project file taking precedence over the global one
    pub fn load_settings(&self) -> ClientResult<ClientSettings> {
        match self.settings_path() {
            Some(path) => self.load_settings_from_path(path),
            None => Ok(ClientSettings::default()),
        }
    }

    /// Load settings from a specific path
    pub fn load_settings_from_path(&self, path: &Path) -> ClientResult<ClientSettings> {
        let content = fs::read_to_string(path).map_err(|e| ClientError::Config {
            message: format!("Failed to read settings file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| ClientError::Config {
            message: format!("Failed to parse settings file {}: {}", path.display(), e),
        })
    }

    /// Write settings to a specific path, creating parent directories
    pub fn save_settings_to_path(&self, path: &Path, settings: &ClientSettings) -> ClientResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClientError::Config {
                message: format!("Failed to create settings directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(settings).map_err(|e| ClientError::Config {
            message: format!("Failed to serialize settings: {}", e),
        })?;

        fs::write(path, content).map_err(|e| ClientError::Config {
            message: format!("Failed to write settings file {}: {}", path.display(), e),
        })
    }

    /// Global settings path, if a home directory is known
    fn get_global_settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("jsondb").join("config.toml"))
    }

    /// Find project settings by walking up the directory tree
    fn find_project_settings_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let settings_path = path.join(".jsondb").join("config.toml");
            if settings_path.exists() {
                return Some(settings_path);
            }

            path = path.parent()?;
        }
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new()
    }
}
