pub mod collection;
pub mod config;
pub mod err;
pub mod init;

pub mod logger {
    pub use log::debug;
    pub use log::error;
    pub use log::info;
    pub use log::trace;
    pub use log::warn;
}
