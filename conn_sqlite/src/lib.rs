mod db_conn;

use std::error::Error;

use common::collection::pool::get_thread_safe_pool;
use common::config::PoolConfig;
use conn::{CommonSqlConnectionInfo, CommonSqlConnectionPool};

pub use db_conn::{SqliteConnection, MEMORY_DB_PATH};

/// Pool of SQLite connections keyed by database path; the empty key is a private in-memory database.
pub fn create_sqlite_conn_pool(info : CommonSqlConnectionInfo, config : PoolConfig) -> Result<CommonSqlConnectionPool<SqliteConnection>, Box<dyn Error>> {
    let gen_fn = move |path : &'_ str| -> Result<SqliteConnection, Box<dyn Error>> {
        SqliteConnection::open(path, &info)
    };

    get_thread_safe_pool(Box::new(gen_fn), config)
}
