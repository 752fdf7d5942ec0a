use crate::err::impl_err_mod;

impl_err_mod!(pool, [
    (WorkerSpawnError, "cleanup worker spawn failed", "the background cleanup thread could not be started, check thread limits")
]);

impl_err_mod!(config, [
    (FileIoError, "can't read config file", "check path and permission of the config file"),
    (ParseError, "config parsing failed", "check toml syntax and field types"),
    (InvalidValueError, "config value is invalid", "check value range of the config field")
]);

impl_err_mod!(connection, [
    (GetConnectionFailedError, "get other process connection", "check database file path and permission"),
    (CommandRunError, "running command or query is error", "check query or command"),
    (ResponseScanError, "connection response data read error", "check column types or error handling code")
]);

impl_err_mod!(system, [
    (ApiCallError, "system api call failed", "check env or process state")
]);
