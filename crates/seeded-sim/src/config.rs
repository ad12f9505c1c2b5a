//! Snapshot CLI configuration loaded via OrthoConfig.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

fn default_catalogue_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("runbooks.json")
}

/// Defaults for the `sim-snapshot` binary.
///
/// Values come from `SEEDED_SIM_*` environment variables or a configuration
/// file; command-line flags parsed by the CLI override them.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SEEDED_SIM")]
pub struct SnapshotSettings {
    /// Optional runbook catalogue path override.
    pub catalogue_path: Option<PathBuf>,
    /// Pretty-print rendered JSON.
    #[ortho_config(default = true)]
    pub pretty: bool,
}

impl SnapshotSettings {
    /// Return the configured catalogue path, falling back to the bundled
    /// fixture.
    #[must_use]
    pub fn catalogue_path(&self) -> PathBuf {
        self.catalogue_path
            .clone()
            .unwrap_or_else(default_catalogue_path)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for snapshot configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> SnapshotSettings {
        SnapshotSettings::load_from_iter([OsString::from("sim-snapshot")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("SEEDED_SIM_CATALOGUE_PATH", None::<String>),
            ("SEEDED_SIM_PRETTY", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert!(settings.pretty);
        assert_eq!(settings.catalogue_path(), default_catalogue_path());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            (
                "SEEDED_SIM_CATALOGUE_PATH",
                Some("/tmp/runbooks.json".to_owned()),
            ),
            ("SEEDED_SIM_PRETTY", Some("false".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert!(!settings.pretty);
        assert_eq!(
            settings.catalogue_path(),
            PathBuf::from("/tmp/runbooks.json")
        );
    }
}
