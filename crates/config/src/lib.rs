//! Layered configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. `config.toml`, `config.yaml` and `config.json` in the config directory
//!    (the platform's per-user config location, see [`Config::config_dir`]),
//! 3. environment variables prefixed with `TITLEDB_`, with `__` separating
//!    nested keys (`TITLEDB_ICONS__TIMEOUT_SECS=5`).
//!
//! Missing files are fine. Command-line flags are applied on top by the
//! binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "TITLEDB_";
/// Database file picked up from the working directory when nothing else is
/// configured.
pub const DEFAULT_DATABASE: &str = "id_database.json";
pub const DEFAULT_ICON_BASE_URL: &str = "https://raw.githubusercontent.com/MobCat/MobCats-original-xbox-game-list/main";
pub const DEFAULT_USER_AGENT: &str = "PineconeOGXboxEditor/1.0 (+https://github.com/MrMilenko/Pinecone)";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file to open when none is given on the command line.
    pub database: Option<PathBuf>,
    pub icons: IconConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    /// Icon cache folder. Defaults to `data/icons` next to the database.
    pub cache_dir: Option<PathBuf>,
    /// Icons are fetched from `<base_url>/icon/<TID[:4]>/<TID>.png`.
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub prefetch_concurrency: usize,
}
impl Default for IconConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            base_url: DEFAULT_ICON_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 12,
            prefetch_concurrency: 4,
        }
    }
}
impl IconConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Per-user config directory, if the platform has one.
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "titledb").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Load from the per-user config directory and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_dir().as_deref())
    }

    /// Load from `config_dir` (if any) and the environment.
    pub fn load_from(config_dir: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(config_dir).extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Every source merged in precedence order, without extracting.
    pub fn figment(config_dir: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = config_dir {
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn validate(&self) -> Result<()> {
        if self.icons.prefetch_concurrency == 0 {
            exn::bail!(ErrorKind::InvalidValue {
                key: "icons.prefetch_concurrency",
                reason: "must be at least 1",
            });
        }
        if self.icons.timeout_secs == 0 {
            exn::bail!(ErrorKind::InvalidValue {
                key: "icons.timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.icons.base_url.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue {
                key: "icons.base_url",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// The database to open: `explicit` if given, then the configured one,
    /// then `id_database.json` in `working_dir` if it exists.
    pub fn database_path(&self, explicit: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(|| self.database.clone()).or_else(|| {
            let fallback = working_dir.join(DEFAULT_DATABASE);
            fallback.is_file().then_some(fallback)
        })
    }
}
