use serde::{Deserialize, Serialize};

/// Data version assumed for Java worlds without a readable `level.dat` (1.20.1).
pub const DEFAULT_JAVA_DATA_VERSION: i32 = 3465;

/// Knobs applied when opening a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// gzip level (0-9) for Java `.dat` files.
    pub java_compression: u32,
    /// zlib level (0-9) for Bedrock database blocks.
    pub bedrock_compression: u8,
    /// Data version stamped on Java files when the world does not declare one.
    pub java_data_version: i32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            java_compression: 6,
            bedrock_compression: 6,
            java_data_version: DEFAULT_JAVA_DATA_VERSION,
        }
    }
}
