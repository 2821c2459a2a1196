//! Standard locations for wavescope configuration files

use std::path::PathBuf;

/// Directory holding wavescope config files
///
/// Returns: `<platform config dir>/wavescope`, or `./wavescope` when the
/// platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wavescope")
}

/// Path of a named config file inside [`default_config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
