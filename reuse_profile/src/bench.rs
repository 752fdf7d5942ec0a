use std::error::Error;
use std::time::Instant;

use serde::Serialize;

use common::collection::pool::PoolStats;
use common::logger::{debug, info};
use conn::CommonSqlConnection;
use conn_sqlite::{create_sqlite_conn_pool, SqliteConnection};

use crate::config::ProfileConfig;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run : usize,
    pub traditional_ms : u128,
    pub pooled_ms : u128,
    pub pool : PoolStats,
}

/// Opens, queries and closes a connection `loop_count` times.
fn run_traditional(db_path : &'_ str, cfg : &'_ ProfileConfig) -> Result<u128, Box<dyn Error>> {
    let start = Instant::now();
    for _ in 0..cfg.loop_count {
        SqliteConnection::open(db_path, &cfg.connection)?.execute(&cfg.query, &[])?;
    }
    Ok(start.elapsed().as_millis())
}

/// Same work through a pool; the pool is dropped inside the timed section.
fn run_pooled(db_path : &'_ str, cfg : &'_ ProfileConfig) -> Result<(u128, PoolStats), Box<dyn Error>> {
    let start = Instant::now();
    let stats = {
        let pool = create_sqlite_conn_pool(cfg.connection.clone(), cfg.pool.clone())?;
        for _ in 0..cfg.loop_count {
            pool.get_owned(db_path)?.execute(&cfg.query, &[])?;
        }
        pool.stats()
    };
    Ok((start.elapsed().as_millis(), stats))
}

pub fn profile(db_path : &'_ str, cfg : &'_ ProfileConfig) -> Result<Vec<RunReport>, Box<dyn Error>> {
    let mut reports = Vec::with_capacity(cfg.runs);

    for run in 1..=cfg.runs {
        debug!("run {} - loop_count:{}", run, cfg.loop_count);

        let traditional_ms = run_traditional(db_path, cfg)?;
        println!("Traditional: {}ms", traditional_ms);

        let (pooled_ms, pool) = run_pooled(db_path, cfg)?;
        println!("Pooled: {}ms", pooled_ms);

        info!("run {} - traditional:{}ms pooled:{}ms created:{} reused:{}",
            run, traditional_ms, pooled_ms, pool.created, pool.reused);
        reports.push(RunReport { run, traditional_ms, pooled_ms, pool });
    }

    Ok(reports)
}
