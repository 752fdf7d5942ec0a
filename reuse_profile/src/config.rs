use std::error::Error;

use serde::Deserialize;

use common::config::{parse_toml, PoolConfig};
use conn::CommonSqlConnectionInfo;

use crate::args::Args;

pub const DEFAULT_QUERY : &'static str = "SELECT tbl_name FROM sqlite_master WHERE type = 'table'";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub log_level : String,
    pub log_file : Option<String>,
    pub query : String,
    pub loop_count : usize,
    pub runs : usize,
    pub connection : CommonSqlConnectionInfo,
    pub pool : PoolConfig,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            log_level : "info".to_string(),
            log_file : None,
            query : DEFAULT_QUERY.to_string(),
            loop_count : 1000,
            runs : 10,
            connection : CommonSqlConnectionInfo::default(),
            pool : PoolConfig::default().with_name("reuse_profile"),
        }
    }
}

impl ProfileConfig {
    /// File values first, then any flag given on the command line.
    pub fn load(args : &'_ Args) -> Result<Self, Box<dyn Error>> {
        let mut cfg : ProfileConfig = match &args.config {
            Some(path) => parse_toml(path)?,
            None => ProfileConfig::default()
        };

        if let Some(n) = args.loop_count {
            cfg.loop_count = n;
        }
        if let Some(n) = args.runs {
            cfg.runs = n;
        }
        if let Some(q) = &args.query {
            cfg.query = q.clone();
        }
        if let Some(l) = &args.log_level {
            cfg.log_level = l.clone();
        }
        if args.log_file.is_some() {
            cfg.log_file = args.log_file.clone();
        }

        cfg.pool.validate()?;
        Ok(cfg)
    }
}
