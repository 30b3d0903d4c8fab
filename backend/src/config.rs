//! Data core configuration loaded via OrthoConfig.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    BATCH_MAX_ATTEMPTS, DEFAULT_REFID_DIGITS, INTERACTIVE_MAX_ATTEMPTS, RefIdPolicy,
    RefIdPolicyError,
};

const DEFAULT_DATA_DIR: &str = "./data";

/// Configuration values for the fleet data core.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FLEET")]
pub struct FleetSettings {
    /// Directory holding one JSON file per collection.
    pub data_dir: Option<PathBuf>,
    /// Reference code width.
    pub refid_digits: Option<u32>,
    /// Attempt budget for interactive creation.
    pub refid_attempts: Option<u32>,
    /// Attempt budget per record during backfill.
    pub backfill_attempts: Option<u32>,
}

impl FleetSettings {
    /// Return the data directory, falling back to `./data`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// Return the code width, falling back to eight digits.
    pub fn refid_digits(&self) -> u32 {
        self.refid_digits.unwrap_or(DEFAULT_REFID_DIGITS)
    }

    /// Return the interactive attempt budget, falling back to ten.
    pub fn refid_attempts(&self) -> u32 {
        self.refid_attempts.unwrap_or(INTERACTIVE_MAX_ATTEMPTS)
    }

    /// Return the backfill attempt budget, falling back to twenty.
    pub fn backfill_attempts(&self) -> u32 {
        self.backfill_attempts.unwrap_or(BATCH_MAX_ATTEMPTS)
    }

    /// Policy for codes issued while an operator waits.
    pub fn interactive_policy(&self) -> Result<RefIdPolicy, RefIdPolicyError> {
        RefIdPolicy::new(self.refid_digits(), self.refid_attempts())
    }

    /// Policy for codes issued by the backfill pass.
    pub fn backfill_policy(&self) -> Result<RefIdPolicy, RefIdPolicyError> {
        RefIdPolicy::new(self.refid_digits(), self.backfill_attempts())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 4] = [
        "FLEET_DATA_DIR",
        "FLEET_REFID_DIGITS",
        "FLEET_REFID_ATTEMPTS",
        "FLEET_BACKFILL_ATTEMPTS",
    ];

    fn load_from_empty_args() -> FleetSettings {
        FleetSettings::load_from_iter([OsString::from("fleetctl")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.data_dir(), PathBuf::from("./data"));
        assert_eq!(
            settings.interactive_policy().expect("valid policy"),
            RefIdPolicy::interactive()
        );
        assert_eq!(
            settings.backfill_policy().expect("valid policy"),
            RefIdPolicy::batch()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("FLEET_DATA_DIR", Some("/srv/fleet".to_owned())),
            ("FLEET_REFID_DIGITS", Some("6".to_owned())),
            ("FLEET_REFID_ATTEMPTS", Some("3".to_owned())),
            ("FLEET_BACKFILL_ATTEMPTS", Some("7".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.data_dir(), PathBuf::from("/srv/fleet"));
        let interactive = settings.interactive_policy().expect("valid policy");
        assert_eq!((interactive.digits(), interactive.max_attempts()), (6, 3));
        let backfill = settings.backfill_policy().expect("valid policy");
        assert_eq!((backfill.digits(), backfill.max_attempts()), (6, 7));
    }

    #[rstest]
    fn invalid_overrides_surface_as_policy_errors() {
        let _guard = lock_env([
            ("FLEET_DATA_DIR", None::<String>),
            ("FLEET_REFID_DIGITS", Some("30".to_owned())),
            ("FLEET_REFID_ATTEMPTS", Some("0".to_owned())),
            ("FLEET_BACKFILL_ATTEMPTS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.interactive_policy(),
            Err(RefIdPolicyError::DigitsOutOfRange { digits: 30 })
        );
    }
}
