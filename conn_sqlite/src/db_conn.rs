use std::error::Error;
use std::time::Duration;

use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;

use common::collection::pool::Reusable;
use common::err::define as err_def;
use common::err::make_err_msg;
use common::logger::{error, trace};
use conn::{CommonSqlConnection, CommonSqlConnectionInfo, CommonSqlExecuteResultSet, CommonValue};

pub const MEMORY_DB_PATH : &'static str = ":memory:";

pub struct SqliteConnection {
    path : String,
    client : Connection,
    clean_in_background : bool
}

fn to_sqlite_value(v : &'_ CommonValue) -> Value {
    match v {
        CommonValue::Double(f) => Value::Real(*f),
        CommonValue::Int(i) => Value::Integer(*i as i64),
        CommonValue::BigInt(i) => Value::Integer(*i),
        CommonValue::String(s) => Value::Text(s.clone()),
        CommonValue::Binrary(b) => Value::Blob(b.clone()),
        CommonValue::Bool(b) => Value::Integer(*b as i64),
        CommonValue::Null => Value::Null
    }
}

fn from_sqlite_value(v : ValueRef<'_>) -> CommonValue {
    match v {
        ValueRef::Null => CommonValue::Null,
        ValueRef::Integer(i) => CommonValue::BigInt(i),
        ValueRef::Real(f) => CommonValue::Double(f),
        ValueRef::Text(t) => CommonValue::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CommonValue::Binrary(b.to_vec())
    }
}

impl SqliteConnection {
    /// Opens `path`; the empty path opens a private in-memory database.
    pub fn open(path : &'_ str, info : &'_ CommonSqlConnectionInfo) -> Result<Self, Box<dyn Error>> {
        let target = if path.is_empty() { MEMORY_DB_PATH } else { path };

        let client = Connection::open(target).map_err(|err| {
            err_def::connection::GetConnectionFailedError::chain(make_err_msg!("open {}", target), Box::new(err))
        })?;

        client.busy_timeout(Duration::from_secs(info.timeout_sec as u64)).map_err(|err| {
            err_def::connection::GetConnectionFailedError::chain(make_err_msg!("busy_timeout {}", target), Box::new(err))
        })?;

        Ok(SqliteConnection {
            path : path.to_string(),
            client,
            clean_in_background : info.clean_in_background
        })
    }

    pub fn is_autocommit(&self) -> bool {
        self.client.is_autocommit()
    }
}

impl Reusable for SqliteConnection {
    fn key(&self) -> &str {
        &self.path
    }

    fn clean(&mut self) {
        if self.client.is_autocommit() {
            return;
        }

        trace!("{} - rollback left open transaction", self.path);
        if let Err(err) = self.client.execute_batch("ROLLBACK") {
            error!("{}", err_def::connection::CommandRunError::chain(make_err_msg!("rollback {}", self.path), Box::new(err)));
        }
    }

    fn clean_in_background(&self) -> bool {
        self.clean_in_background
    }
}

impl CommonSqlConnection for SqliteConnection {
    fn execute(&mut self, query : &'_ str, param : &'_ [CommonValue]) -> Result<CommonSqlExecuteResultSet, Box<dyn Error>> {
        let mut stmt = self.client.prepare(query).map_err(|err| {
            err_def::connection::CommandRunError::chain(make_err_msg!("prepare {}", query), Box::new(err))
        })?;

        let mut ret = CommonSqlExecuteResultSet::default();
        ret.cols_name = stmt.column_names().into_iter().map(String::from).collect();
        let col_count = ret.cols_name.len();

        let bind : Vec<Value> = param.iter().map(to_sqlite_value).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(bind.iter())).map_err(|err| {
            err_def::connection::CommandRunError::chain(make_err_msg!("query {}", query), Box::new(err))
        })?;

        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(err) => return Err(err_def::connection::ResponseScanError::chain(make_err_msg!("step {}", query), Box::new(err)))
            };

            let mut col_data = Vec::with_capacity(col_count);
            for col_idx in 0..col_count {
                let v = row.get_ref(col_idx).map_err(|err| {
                    err_def::connection::ResponseScanError::chain(make_err_msg!("column {}", col_idx), Box::new(err))
                })?;
                col_data.push(from_sqlite_value(v));
            }
            ret.cols_data.push(col_data);
        }

        Ok(ret)
    }
}
