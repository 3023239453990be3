// Shared constants for deck geometry, search defaults, and app metadata.

pub const COMPANY_NAME: &str = "0x4D44 Software";
pub const PRODUCT_NAME: &str = "BakersDozen";
pub const PROJECT_QUALIFIER: &str = "com";

// Deck geometry for the standard deal
pub const SUIT_COUNT: usize = 4;
pub const RANKS_PER_SUIT: u8 = 13;
pub const DECK_SIZE: usize = 52;
pub const STANDARD_COLUMNS: usize = 13;
pub const CARDS_PER_COLUMN: usize = 4;

// Search defaults
pub const DEFAULT_MAX_STATES: usize = 50_000;
pub const DEFAULT_MAX_DEPTH: u32 = 100;
pub const DEFAULT_IDA_HEIGHT: u32 = 10;
pub const CHECK_INTERVAL: u64 = 100;

// Execution wrapper
pub const DEFAULT_GRACE_MS: u64 = 500;
// Watchdog ceiling for runs without their own timeout
pub const DEFAULT_WATCHDOG_MS: u64 = 600_000;
pub const WORKER_THREAD_NAME: &str = "bd-search";

// Persistence
pub const CACHE_FILE_NAME: &str = "learned.json";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "bdsolve.log";
pub const CACHE_FORMAT_VERSION: u32 = 1;
