use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NetMeterError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationRate {
    pub fiscal_year: i32,
    /// Dollars per kWh of net surplus.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_export_dir_string")]
    pub export_dir: String,
    #[serde(default = "default_utility_name")]
    pub utility_name: String,
    #[serde(default = "default_info_url")]
    pub info_url: String,
    #[serde(default = "default_phone")]
    pub phone: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_compensation_rates")]
    pub compensation_rates: Vec<CompensationRate>,
}

fn default_utility_name() -> String {
    "City of Palo Alto Utilities".to_string()
}

fn default_info_url() -> String {
    "www.cityofpaloalto.org/net-metering".to_string()
}

fn default_phone() -> String {
    "650-329-2161".to_string()
}

fn default_email() -> String {
    "UtilitiesCustomerService@CityofPaloAlto.org".to_string()
}

fn default_compensation_rates() -> Vec<CompensationRate> {
    vec![
        CompensationRate { fiscal_year: 2023, rate: 0.1026 },
        CompensationRate { fiscal_year: 2024, rate: 0.1535 },
    ]
}

fn default_export_dir_string() -> String {
    default_export_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir_string(),
            utility_name: default_utility_name(),
            info_url: default_info_url(),
            phone: default_phone(),
            email: default_email(),
            compensation_rates: default_compensation_rates(),
        }
    }
}

impl Settings {
    /// Adds or replaces the rate for `fiscal_year`, keeping the list sorted.
    pub fn set_rate(&mut self, fiscal_year: i32, rate: f64) {
        match self
            .compensation_rates
            .iter_mut()
            .find(|r| r.fiscal_year == fiscal_year)
        {
            Some(existing) => existing.rate = rate,
            None => self
                .compensation_rates
                .push(CompensationRate { fiscal_year, rate }),
        }
        self.compensation_rates.sort_by_key(|r| r.fiscal_year);
    }

    pub fn export_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.export_dir))
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("netmeter")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_export_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("netmeter")
}

pub fn load_settings() -> Settings {
    load_from(&settings_path())
}

/// Missing or corrupt files fall back to defaults.
fn load_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(path).unwrap_or_default();
    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("ignoring unreadable {}: {e}", path.display());
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_to(&settings_path(), settings)
}

fn save_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| NetMeterError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
