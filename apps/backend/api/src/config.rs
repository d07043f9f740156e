use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Seconds between maturation sweep passes.
    pub sweep_interval_secs: u64,
    /// Rows per sweep batch; keeps lock hold times bounded.
    pub sweep_batch_size: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SWEEP_INTERVAL_SECS".to_string()))?,
            sweep_batch_size: env::var("SWEEP_BATCH_SIZE")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SWEEP_BATCH_SIZE".to_string()))?,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
