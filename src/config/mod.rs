//! TOML configuration for the service binary.
//!
//! One file covers the whole runtime: store location, quest and stamina
//! economy knobs, the admin roster, the expiry sweep, and logging.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::engine::types::{QuestConfig, StaminaConfig};
use crate::server::service::ServiceConfig;
use crate::server::sweeper::SweeperConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceSection,
    pub storage: StorageSection,
    pub quest: QuestSection,
    pub stamina: StaminaSection,
    pub sweep: SweeperConfig,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Display name used in startup logs.
    pub name: String,
    /// Principals allowed to run admin operations (catalog, grants).
    pub admin_principals: Vec<String>,
    /// Number of rows in a leaderboard page.
    pub leaderboard_top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// Directory holding the sled database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestSection {
    /// Hours between quest acceptance and its deadline.
    pub deadline_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaminaSection {
    pub max: u64,
    /// Minutes per regenerated stamina point.
    pub regen_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Base log level: "info", "debug", or "trace".
    pub level: String,
    /// Log file path; empty string disables file logging.
    pub file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service: ServiceSection {
                name: "habitforge".to_string(),
                admin_principals: Vec::new(),
                leaderboard_top_n: 10,
            },
            storage: StorageSection {
                data_dir: "data/habitforge".to_string(),
            },
            quest: QuestSection { deadline_hours: 24 },
            stamina: StaminaSection {
                max: 100,
                regen_minutes: 5,
            },
            sweep: SweeperConfig::default(),
            logging: LoggingSection {
                level: "info".to_string(),
                file: "habitforge.log".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn stamina_config(&self) -> StaminaConfig {
        StaminaConfig {
            max: self.stamina.max,
            regen_minutes: self.stamina.regen_minutes,
        }
    }

    pub fn quest_config(&self) -> QuestConfig {
        QuestConfig {
            deadline_hours: self.quest.deadline_hours,
            stamina: self.stamina_config(),
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            quest: self.quest_config(),
            admins: self.service.admin_principals.clone(),
            leaderboard_top_n: self.service.leaderboard_top_n,
        }
    }
}
