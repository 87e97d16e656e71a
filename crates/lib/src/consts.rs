/// Cache id prefix for records describing files written to the public directory.
pub const PUBLIC_CACHE_PREFIX: &str = "public/";

/// Cache id prefix for records describing scanned source files.
pub const SOURCE_CACHE_PREFIX: &str = "source/";

/// Site configuration file name, looked up in the site root.
pub const CONFIG_FILENAME: &str = "_config.toml";

/// Version of the on-disk cache database format.
pub const CACHE_DB_VERSION: u32 = 1;

/// Chunk size used when draining route streams.
pub const STREAM_CHUNK_SIZE: usize = 8192;
