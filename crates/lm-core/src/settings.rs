//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub model: ModelSettings,
    pub discount: DiscountSettings,
    pub recency: RecencySettings,
    pub composition: CompositionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub order: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountSettings {
    pub fallback: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecencySettings {
    pub halflife: u32,
    pub ratio: f64,
    pub lambda: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompositionSettings {
    pub default_weight: f64,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_unit_interval {
        ($section:ident . $field:ident) => {
            if !(0.0..=1.0).contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be within [0, 1]".to_string(),
                });
            }
        };
    }

    check_positive!(model.order);
    check_positive!(recency.halflife);

    check_unit_interval!(discount.fallback);
    check_unit_interval!(recency.ratio);
    check_unit_interval!(recency.lambda);
    if s.discount.fallback == 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "discount.fallback".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    let weight = s.composition.default_weight;
    if weight.is_nan() || weight < 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "composition.default_weight".to_string(),
            reason: "must be non-negative".to_string(),
        });
    }

    Ok(())
}
