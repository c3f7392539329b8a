use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vmlist_core::{ActionKind, IdentityPolicy};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityPolicy,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Wire name of the permitted action that admits an entity to the
    /// set-access selection.
    pub set_access_action: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            set_access_action: ActionKind::All.as_wire().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let path = expand(path);
        let s = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse vmlist.toml")?;
        cfg.set_access_action()?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let path = expand(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(&path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if expand(path).exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn set_access_action(&self) -> Result<ActionKind> {
        let name = self.access.set_access_action.trim();
        ActionKind::from_wire(name).ok_or_else(|| anyhow!("unknown set_access_action: {name}"))
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join("vmlist.toml")
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
