use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Settings for page initialization and the guest registry. Every key is optional in the TOML
/// file; missing ones keep their defaults.
///
/// ```toml
/// [page]
/// tooltip_trigger = '[data-bs-toggle="tooltip"]'
/// validated_class = "was-validated"
///
/// [registry]
/// permit_validity_months = 6
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Selectors and classes used when a page is initialized.
    pub page: PageSettings,
    /// Constants of the guest registry.
    pub registry: RegistrySettings,
}

/// Selectors and classes used by [`initialize`](crate::initialize).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    /// Elements that get a tooltip.
    pub tooltip_trigger: String,
    /// Elements that get a popover.
    pub popover_trigger: String,
    /// Forms whose submission is intercepted for validation styling.
    pub validation_marker: String,
    /// Class added to an intercepted form on every submit attempt.
    pub validated_class: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            tooltip_trigger: r#"[data-bs-toggle="tooltip"]"#.to_owned(),
            popover_trigger: r#"[data-bs-toggle="popover"]"#.to_owned(),
            validation_marker: ".needs-validation".to_owned(),
            validated_class: "was-validated".to_owned(),
        }
    }
}

/// Constants used when registering a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Birthplace code used for anyone born outside Italy.
    pub foreign_birthplace_code: String,
    /// Birthplace code used for someone born in Italy whose municipality code is unknown.
    pub fallback_birthplace_code: String,
    /// How long a residence permit lasts after its issue date.
    pub permit_validity_months: u32,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            foreign_birthplace_code: "Z330".to_owned(),
            fallback_birthplace_code: "A001".to_owned(),
            permit_validity_months: crate::permit::DEFAULT_VALIDITY_MONTHS,
        }
    }
}

impl Settings {
    /// Reads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Reads settings from `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, process};

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [page]
            validated_class = "is-checked"

            [registry]
            permit_validity_months = 12
            "#,
        )
        .unwrap();

        assert_eq!("is-checked", settings.page.validated_class);
        assert_eq!(".needs-validation", settings.page.validation_marker);
        assert_eq!(12, settings.registry.permit_validity_months);
        assert_eq!("Z330", settings.registry.foreign_birthplace_code);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(Settings::default(), settings);
    }

    #[test]
    fn test_demo_settings_are_the_defaults() {
        let settings: Settings = toml::from_str(include_str!("../demos/ancora.toml")).unwrap();
        assert_eq!(Settings::default(), settings);
    }

    #[test]
    fn test_load_or_default() {
        assert_eq!(Settings::default(), Settings::load_or_default(None).unwrap());

        let missing = Path::new("/definitely/not/here/ancora.toml");
        assert!(matches!(
            Settings::load_or_default(Some(missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = env::temp_dir();
        let good = dir.join(format!("ancora-settings-{}.toml", process::id()));
        fs::write(&good, "[registry]\nforeign_birthplace_code = \"Z100\"\n").unwrap();
        let settings = Settings::load(&good).unwrap();
        assert_eq!("Z100", settings.registry.foreign_birthplace_code);

        let bad = dir.join(format!("ancora-settings-bad-{}.toml", process::id()));
        fs::write(&bad, "[registry]\npermit_validity_months = \"six\"\n").unwrap();
        assert!(matches!(
            Settings::load(&bad),
            Err(ConfigError::Parse { .. })
        ));

        fs::remove_file(good).unwrap();
        fs::remove_file(bad).unwrap();
    }
}
