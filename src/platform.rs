/// Resolved once at startup and threaded explicitly into everything that
/// branches on it, so tests can exercise every platform on any host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Macos,
    Linux,
    Other,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Other => "other",
        }
    }

    /// macOS and Linux escalate through a permission grant on the proxy-core
    /// binary; Windows and everything else go through the background service.
    pub fn uses_permission_grant(self) -> bool {
        matches!(self, Self::Macos | Self::Linux)
    }
}
