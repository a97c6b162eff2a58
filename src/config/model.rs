// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Repository cloned when nothing else is configured.
pub const DEFAULT_REPO_URL: &str = "https://github.com/AngeloTadeucci/Maple2";

/// Directory name of the default install root, relative to the project root.
pub const DEFAULT_INSTALL_DIR: &str = "Maple2";

/// Process-wide launcher settings, persisted on explicit save only.
///
/// Keys are `repoRoot` / `installRoot`; PascalCase spellings written by
/// older launchers are accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LauncherConfig {
    #[serde(alias = "RepoRoot")]
    pub repo_root: String,
    #[serde(alias = "InstallRoot")]
    pub install_root: PathBuf,
}

impl LauncherConfig {
    /// Defaults relative to `project_root`.
    pub fn default_for(project_root: &Path) -> Self {
        Self {
            repo_root: DEFAULT_REPO_URL.to_string(),
            install_root: project_root.join(DEFAULT_INSTALL_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let cfg = LauncherConfig {
            repo_root: "https://example.invalid/repo".into(),
            install_root: PathBuf::from("/opt/maple2"),
        };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["repoRoot"], "https://example.invalid/repo");
        assert_eq!(json["installRoot"], "/opt/maple2");
    }

    #[test]
    fn accepts_pascal_case_keys() {
        let cfg: LauncherConfig =
            serde_json::from_str(r#"{ "RepoRoot": "u", "InstallRoot": "/x" }"#).unwrap();
        assert_eq!(cfg.repo_root, "u");
        assert_eq!(cfg.install_root, PathBuf::from("/x"));
    }
}
