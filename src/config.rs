use std::env;
use std::net::SocketAddr;

use crate::error::{env_var_error, Error};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    /// Base URL of the fleet service. Without it loads and assignments are
    /// kept in memory.
    pub fleet_api_base: Option<String>,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let addr = optional(&lookup, "HAULBID_ADDR")?
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .map_err(|_| env_var_error())?;

        let fleet_api_base =
            optional(&lookup, "FLEET_API_BASE")?.filter(|base| !base.trim().is_empty());

        let log_level = optional(&lookup, "LOG_LEVEL")?
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .parse()
            .map_err(|_| env_var_error())?;

        Ok(Self {
            addr,
            fleet_api_base,
            log_level,
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Result<Option<String>, Error>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
