use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{GhprsError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "~/.ghprs";

/// On-disk layout of the configuration file:
///
/// ```toml
/// organization = "acme"
/// token = "ghp_..."
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    organization: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub organization: String,
    /// `None` when the file has no token; see [`crate::auth::resolve_token`].
    pub token: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GhprsError::Config(format!("Error reading {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| GhprsError::Config(format!("Error parsing {}: {}", path.display(), e)))
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| e.to_string())?;

        let organization = non_blank(file.organization)
            .ok_or_else(|| "configuration file is missing organization".to_string())?;

        Ok(Self {
            organization,
            token: non_blank(file.token),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };

    let home = dirs::home_dir()
        .ok_or_else(|| GhprsError::Config("Failed to expand home directory".to_string()))?;
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}
