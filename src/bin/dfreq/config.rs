use serde::Deserialize;

use datefreq::{aggregator, filter};

#[derive(Clone, Default)]
pub struct Config {
    pub aggregator: aggregator::Config,
    pub filter: Option<filter::Config>,
}

#[derive(Clone, Deserialize)]
pub struct TomlConfig {
    aggregator: Option<aggregator::TomlConfig>,
    filter: Option<filter::TomlConfig>,
}

impl From<TomlConfig> for Config {
    fn from(cfg: TomlConfig) -> Config {
        Config {
            aggregator: cfg.aggregator.unwrap_or_default().into(),
            filter: cfg.filter.map(|f| f.into()),
        }
    }
}
