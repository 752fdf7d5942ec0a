mod args;
mod bench;
mod config;

use std::error::Error;

use common::init::logger;
use common::logger::{error, info};

fn run() -> Result<(), Box<dyn Error>> {
    let proc_args = args::parsing();
    let cfg = config::ProfileConfig::load(&proc_args)?;

    logger::init_once(cfg.log_level.as_str(), cfg.log_file.as_deref())?;
    info!("profile {} - runs:{} loop_count:{}", proc_args.db_path, cfg.runs, cfg.loop_count);

    let reports = bench::profile(&proc_args.db_path, &cfg)?;

    if proc_args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("main - profile failed : {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
