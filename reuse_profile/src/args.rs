use clap::Parser;
use std::path::PathBuf;

/// Compare open/query/close against pooled SQLite connections.
#[derive(Parser, Debug)]
pub struct Args {
    #[clap(long)]
    pub db_path : String,
    #[clap(long)]
    pub config : Option<PathBuf>,
    #[clap(long)]
    pub loop_count : Option<usize>,
    #[clap(long)]
    pub runs : Option<usize>,
    #[clap(long)]
    pub query : Option<String>,
    #[clap(long)]
    pub log_level : Option<String>,
    #[clap(long)]
    pub log_file : Option<String>,
    #[clap(long, default_value_t = false)]
    pub json : bool,
}

pub fn parsing() -> Args {
    Args::parse()
}
