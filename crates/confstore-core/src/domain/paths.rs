//! Per-platform base paths for user-scoped configuration.
//!
//! Pure mapping from platform to the directory prefix under which a
//! filesystem-backed configuration volume is rooted:
//!
//! - Linux family: `$HOME/.config/`
//! - Windows:      `%APPDATA%\`
//! - macOS:        `$HOME/Library/Preferences/`
//!
//! When the platform is unrecognised or the required environment variable is
//! absent, no base path is available and the mount sequence falls back to
//! the key/value backend.
//!
//! Prefixes keep their trailing separator so that volume path resolution is
//! plain concatenation.

use super::platform::Platform;

/// Resolves the per-user configuration base path from the process
/// environment, or `None` when the platform has no usable location.
pub fn user_config_base(platform: Platform) -> Option<String> {
    user_config_base_with(platform, |name| std::env::var(name).ok())
}

/// [`user_config_base`] with an injected environment lookup.
///
/// Keeps the mapping a pure function of its inputs; tests exercise every
/// platform row without mutating process environment variables.
pub fn user_config_base_with<F>(platform: Platform, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|value| !value.is_empty());

    match platform {
        Platform::Linux => non_empty("HOME").map(|home| format!("{home}/.config/")),
        Platform::Windows => non_empty("APPDATA").map(|base| format!("{base}\\")),
        Platform::MacOs => non_empty("HOME").map(|home| format!("{home}/Library/Preferences/")),
        Platform::Other => None,
    }
}
