use std::fs::File;

use anyhow::{Error, Result};
use serde::Deserialize;

use self::{
    capability::CapabilityConfig, console::ConsoleConfig, db::DbConfig, log::LogConfig,
    query::QueryConfig, tenant::TenantConfig,
};

pub mod capability;
pub mod console;
pub mod db;
pub mod log;
pub mod query;
pub mod tenant;

#[derive(Deserialize)]
pub struct Config {
    log: LogConfig,
    db: DbConfig,
    #[serde(default)]
    tenant: TenantConfig,
    #[serde(default)]
    query: QueryConfig,
    #[serde(default)]
    capability: CapabilityConfig,
    console: Option<ConsoleConfig>,
}

impl Config {
    pub fn log(&self) -> &LogConfig {
        &self.log
    }

    pub fn db(&self) -> &DbConfig {
        &self.db
    }

    pub fn tenant(&self) -> &TenantConfig {
        &self.tenant
    }

    pub fn query(&self) -> &QueryConfig {
        &self.query
    }

    pub fn capability(&self) -> &CapabilityConfig {
        &self.capability
    }

    pub fn console(&self) -> &Option<ConsoleConfig> {
        &self.console
    }
}

pub fn from_path(path: &str) -> Result<Config> {
    let file = File::open(path)
        .map_err(|err| Error::msg(format!("Failed to open config file '{path}': {err}")))?;
    Ok(serde_yaml::from_reader::<_, Config>(file)?)
}

pub fn from_str(yaml: &str) -> Result<Config> {
    Ok(serde_yaml::from_str::<Config>(yaml)?)
}
