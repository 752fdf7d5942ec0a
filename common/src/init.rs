pub mod logger {
    use std::error::Error;
    use std::sync::OnceLock;

    use ftail::Ftail;
    use log::LevelFilter;

    use crate::err::define::system::ApiCallError;
    use crate::err::make_err_msg;

    pub(crate) fn convert_str_to_log_level(log_level : &'_ str) -> LevelFilter {
        match log_level {
            "debug" => LevelFilter::Debug,
            "warn" => LevelFilter::Warn,
            "trace" => LevelFilter::Trace,
            "info" => LevelFilter::Info,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Error
        }
    }

    static LOGGER_INIT_RET : OnceLock<Result<(), String>> = OnceLock::new();

    fn init_ftail(level : LevelFilter, log_file : Option<&'_ str>) -> Result<(), String> {
        let mut ftail = Ftail::new().console(LevelFilter::Debug);

        if let Some(file) = log_file {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .map_err(|e| make_err_msg!("log file {} : {}", file, e))?;

            ftail = ftail.single_file(file, true, level);
        }

        ftail.init().map_err(|e| make_err_msg!("{}", e))
    }

    /// Installs the process logger on first call; later calls return the first outcome.
    pub fn init_once(log_level : &'_ str, log_file : Option<&'_ str>) -> Result<(), Box<dyn Error>> {
        let ret = LOGGER_INIT_RET.get_or_init(|| {
            init_ftail(convert_str_to_log_level(log_level), log_file)
        });

        match ret {
            Ok(()) => Ok(()),
            Err(msg) => Err(ApiCallError::new(msg.clone()))
        }
    }

}
