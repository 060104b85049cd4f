//! User settings
//!
//! Settings come from a TOML file. Lookup order:
//! 1. An explicit path (`--config`)
//! 2. `~/.config/cinch/settings.toml` (platform config dir)
//! 3. Defaults embedded in the binary
//!
//! Keys missing from an override file keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default settings
const DEFAULT_SETTINGS: &str = include_str!("../../../config/settings.toml");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub scope: ScopeSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub encrypt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScopeSettings {
    /// Account names making up the default scope. Empty = all accounts.
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySettings {
    pub currency_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings {
                path: PathBuf::from("cinch.db"),
                encrypt: true,
            },
            scope: ScopeSettings::default(),
            display: DisplaySettings {
                currency_symbol: "$".to_string(),
            },
        }
    }
}

impl Settings {
    /// Load settings, preferring `override_path` when given
    ///
    /// An explicit path that does not exist is an error. A missing file at the
    /// default location falls back to the embedded defaults.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::NotFound(format!(
                        "Config file {}",
                        path.display()
                    )));
                }
                debug!("Loading settings from {}", path.display());
                fs::read_to_string(path)?
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!("Loading settings from {}", path.display());
                    fs::read_to_string(&path)?
                }
                None => DEFAULT_SETTINGS.to_string(),
            },
        };

        Self::parse(&content)
    }

    /// Parse settings from TOML content, layering it over the defaults
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(content)?;
        let mut settings = Self::default();

        if let Some(database) = raw.database {
            if let Some(path) = database.path {
                settings.database.path = path;
            }
            if let Some(encrypt) = database.encrypt {
                settings.database.encrypt = encrypt;
            }
        }

        if let Some(scope) = raw.scope {
            if let Some(accounts) = scope.accounts {
                settings.scope.accounts = accounts
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect();
            }
        }

        if let Some(display) = raw.display {
            if let Some(symbol) = display.currency_symbol {
                settings.display.currency_symbol = symbol;
            }
        }

        Ok(settings)
    }

    /// Format an amount with the configured currency symbol
    pub fn format_amount(&self, amount: f64) -> String {
        if amount < 0.0 {
            format!("-{}{:.2}", self.display.currency_symbol, amount.abs())
        } else {
            format!("{}{:.2}", self.display.currency_symbol, amount)
        }
    }
}

/// Default settings override location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cinch").join("settings.toml"))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    database: Option<RawDatabase>,
    scope: Option<RawScope>,
    display: Option<RawDisplay>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    path: Option<PathBuf>,
    encrypt: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScope {
    accounts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDisplay {
    currency_symbol: Option<String>,
}
