use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::err::define::config as config_err;
use crate::err::make_err_msg;

pub const DEFAULT_MAX_INVENTORY : usize = 1000;
pub const DEFAULT_MAX_PENDING_CLEANUP : usize = 1000;
pub const DEFAULT_CLEANUP_POLL_MS : u64 = 10;

/// Bounds and timing of a [`ReusePool`](crate::collection::pool::ReusePool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub name : String,
    /// Cap on idle resources across every key.
    pub max_inventory : usize,
    /// Cap on resources waiting for the cleanup worker.
    pub max_pending_cleanup : usize,
    pub cleanup_poll_ms : u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            name : String::from("reuse"),
            max_inventory : DEFAULT_MAX_INVENTORY,
            max_pending_cleanup : DEFAULT_MAX_PENDING_CLEANUP,
            cleanup_poll_ms : DEFAULT_CLEANUP_POLL_MS,
        }
    }
}

impl PoolConfig {
    pub fn new(max_inventory : usize, max_pending_cleanup : usize) -> Self {
        PoolConfig {
            max_inventory,
            max_pending_cleanup,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name : impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cleanup_poll_ms(mut self, ms : u64) -> Self {
        self.cleanup_poll_ms = ms;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_poll_ms)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.cleanup_poll_ms == 0 {
            return Err(config_err::InvalidValueError::new(make_err_msg!(
                "pool_name:{} cleanup_poll_ms must be greater than 0", self.name
            )));
        }
        Ok(())
    }
}

pub fn parse_toml_str<C : DeserializeOwned>(data : &'_ str) -> Result<C, Box<dyn Error>> {
    toml::from_str(data).map_err(|x| {
        config_err::ParseError::chain(make_err_msg!("toml parsing failed"), Box::new(x))
    })
}

pub fn parse_toml<C : DeserializeOwned>(path : &Path) -> Result<C, Box<dyn Error>> {
    let data = fs::read_to_string(path).map_err(|x| {
        config_err::FileIoError::chain(make_err_msg!("can't read {}", path.display()), Box::new(x))
    })?;

    parse_toml_str(data.as_str())
}
