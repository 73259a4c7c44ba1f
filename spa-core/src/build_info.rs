use serde::Serialize;

/// Build metadata reported by the `version` command and the `get_version`
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub build_time: String,
    /// Toolchain that produced the binary. The wire name is kept for
    /// compatibility with existing frontends.
    #[serde(rename = "go_version")]
    pub compiler_version: String,
}

impl BuildInfo {
    pub fn new(
        version: impl Into<String>,
        build_time: impl Into<String>,
        compiler_version: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            build_time: build_time.into(),
            compiler_version: compiler_version.into(),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), "unknown", "unknown")
    }
}
