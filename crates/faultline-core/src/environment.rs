//! Host environment summary
//!
//! Non-identifying facts about the running process, appended to verbose
//! reporter logs. Never includes hostname or username.

/// Reporter version reported to the collector and in logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Non-identifying operating system information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub os: String,
    pub arch: String,
}

impl OsInfo {
    /// Collect OS information from the current system.
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// One-line summary: `[Faultline: 0.1.0] [OS: linux/x86_64] [Env: production]`.
pub fn environment_info(environment_name: &str) -> String {
    let os = OsInfo::collect();
    format!(
        "[Faultline: {VERSION}] [OS: {}/{}] [Env: {environment_name}]",
        os.os, os.arch
    )
}
