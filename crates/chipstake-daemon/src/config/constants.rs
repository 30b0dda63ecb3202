pub const DEFAULT_API_PORT: u16 = 8470;
pub const DEFAULT_DATA_DIR_NAME: &str = ".chipstake";
pub const DEFAULT_SYSTEM_DATA_DIR: &str = "/var/lib/chipstake";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STORE_DIR_NAME: &str = "ledger";
pub const DEFAULT_EVENT_PAGE: usize = 100;
pub const MAX_EVENT_PAGE: usize = 1_000;
pub const MAX_NODE_PAGE: usize = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TX_BODY: usize = 256 * 1024;
pub const DEFAULT_STREAM_KEEP_ALIVE_SECS: u64 = 15;
