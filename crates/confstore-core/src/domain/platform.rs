//! Operating system family resolution.

use serde::Serialize;

/// The operating system family the process runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    /// Anything without a known per-user configuration directory. Forces the
    /// fallback storage backend during mounting.
    Other,
}

impl Platform {
    /// Resolves the family of the compilation target.
    pub fn current() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    /// Whether this family follows Linux filesystem conventions.
    pub fn is_linux_family(self) -> bool {
        matches!(self, Platform::Linux)
    }
}
