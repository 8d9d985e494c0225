//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden with `EXPENSEMATE__<SECTION>__<KEY>`
//! environment variables (e.g. `EXPENSEMATE__APP__LEVEL=debug`).
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use engine::ResetScope;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
    /// IANA zone used to decide "today" and month boundaries.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Notifier {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_alert_sweep_secs")]
    pub alert_sweep_secs: u64,
    #[serde(default = "default_badge_sweep_secs")]
    pub badge_sweep_secs: u64,
    #[serde(default = "default_daily_sweep_secs")]
    pub daily_sweep_secs: u64,
    #[serde(default = "default_month_check_secs")]
    pub month_check_secs: u64,
    #[serde(default)]
    pub reset_scope: ResetScope,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            alert_sweep_secs: default_alert_sweep_secs(),
            badge_sweep_secs: default_badge_sweep_secs(),
            daily_sweep_secs: default_daily_sweep_secs(),
            month_check_secs: default_month_check_secs(),
            reset_scope: ResetScope::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub telegram: Option<Telegram>,
    #[serde(default)]
    pub notifier: Notifier,
    #[serde(default)]
    pub scheduler: Scheduler,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", default_level())?
            .set_default("app.timezone", default_timezone())?
            .set_default("database", "memory")?
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("EXPENSEMATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_alert_sweep_secs() -> u64 {
    60 * 60
}

fn default_badge_sweep_secs() -> u64 {
    6 * 60 * 60
}

fn default_daily_sweep_secs() -> u64 {
    24 * 60 * 60
}

fn default_month_check_secs() -> u64 {
    60 * 60
}
