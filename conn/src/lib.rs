use std::error::Error;
use std::sync::Arc;

use serde::Deserialize;

use common::collection::pool::{Reusable, ThreadSafePool};

#[derive(Clone, Debug, PartialEq)]
pub enum CommonValue {
    Double(f64),
    Int(i32),
    BigInt(i64),
    String(String),
    Binrary(Vec<u8>),
    Bool(bool),
    Null
}

#[derive(Default, Clone, Debug)]
pub struct CommonSqlExecuteResultSet {
    pub cols_name : Vec<String>,
    pub cols_data : Vec<Vec<CommonValue>>
}

impl CommonSqlExecuteResultSet {
    pub fn row_count(&self) -> usize {
        self.cols_data.len()
    }

    pub fn col_index(&self, name : &'_ str) -> Option<usize> {
        self.cols_name.iter().position(|c| c == name)
    }
}

/// A SQL connection that can live in a [`ThreadSafePool`]; the pool key is its connection target.
pub trait CommonSqlConnection : Reusable {
    fn execute(&mut self, query : &'_ str, param : &'_ [CommonValue]) -> Result<CommonSqlExecuteResultSet, Box<dyn Error>>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommonSqlConnectionInfo {
    pub timeout_sec : u32,
    /// Clean released connections on the pool's worker instead of the releasing thread.
    pub clean_in_background : bool
}

impl Default for CommonSqlConnectionInfo {
    fn default() -> Self {
        CommonSqlConnectionInfo {
            timeout_sec : 30,
            clean_in_background : false
        }
    }
}

pub type CommonSqlConnectionPool<C> = Arc<dyn ThreadSafePool<C>>;
