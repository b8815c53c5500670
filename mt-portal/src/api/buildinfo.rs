//! Build identification shown in the portal footer

use axum::response::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub package: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    /// `version (git_hash)`, as rendered in page footers
    pub display: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        let version = env!("CARGO_PKG_VERSION");
        let git_hash = env!("GIT_HASH");
        Self {
            package: env!("CARGO_PKG_NAME"),
            version,
            git_hash,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            build_profile: env!("BUILD_PROFILE"),
            display: format!("{} ({})", version, git_hash),
        }
    }
}

/// GET /api/buildinfo
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo::current())
}
