// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Overlay configuration.
//!
//! Contrast threshold, hue spreading and the double-click window are product tuning, so they
//! live here instead of in the components. Every field has a default; JSON documents may set
//! any subset and `TESSERA_*` environment variables override both.

use std::{env, error::Error, fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::identity::{Rgb, Tone};

/// Golden-ratio conjugate; successive hues land far apart for any number of blocks.
pub const DEFAULT_HUE_STEP: f64 = 0.618_033_988_749_895;
pub const DEFAULT_MIN_CONTRAST: f64 = 3.0;
pub const DEFAULT_DOUBLE_CLICK_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    pub colors: ColorConfig,
    pub double_click_ms: u64,
    /// Opacity (percent) of code belonging to non-focused blocks in focus mode.
    pub dim_opacity_pct: u8,
    pub tone: Tone,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            colors: ColorConfig::default(),
            double_click_ms: DEFAULT_DOUBLE_CLICK_MS,
            dim_opacity_pct: 45,
            tone: Tone::Dark,
        }
    }
}

impl OverlayConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|err| ConfigError::Json {
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `TESSERA_*` overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_value("TESSERA_MIN_CONTRAST")? {
            self.colors.min_contrast = parse_env("TESSERA_MIN_CONTRAST", &value)?;
        }
        if let Some(value) = env_value("TESSERA_HUE_STEP")? {
            self.colors.hue_step = parse_env("TESSERA_HUE_STEP", &value)?;
        }
        if let Some(value) = env_value("TESSERA_DOUBLE_CLICK_MS")? {
            self.double_click_ms = parse_env("TESSERA_DOUBLE_CLICK_MS", &value)?;
        }
        if let Some(value) = env_value("TESSERA_THEME")? {
            self.tone = match value.to_ascii_lowercase().as_str() {
                "dark" => Tone::Dark,
                "light" => Tone::Light,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: "TESSERA_THEME".to_owned(),
                        value: format!("{value} (expected dark or light)"),
                    })
                }
            };
        }
        self.validate()
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.colors.validate()?;
        if self.dim_opacity_pct > 100 {
            return Err(ConfigError::OutOfRange {
                field: "dim_opacity_pct",
                value: f64::from(self.dim_opacity_pct),
            });
        }
        Ok(())
    }
}

/// Saturation/lightness (both `0.0..=1.0`) a tone starts from before jitter and contrast
/// nudging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneParams {
    pub saturation: f64,
    pub lightness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub min_contrast: f64,
    pub hue_step: f64,
    /// Maximum deviation applied to saturation and lightness, seeded by the identity digest.
    pub jitter: f64,
    pub dark: ToneParams,
    pub light: ToneParams,
    pub dark_background: Rgb,
    pub light_background: Rgb,
    pub fill_alpha: u8,
    pub nudge_step: f64,
    pub max_nudges: u32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            min_contrast: DEFAULT_MIN_CONTRAST,
            hue_step: DEFAULT_HUE_STEP,
            jitter: 0.08,
            dark: ToneParams {
                saturation: 0.65,
                lightness: 0.62,
            },
            light: ToneParams {
                saturation: 0.70,
                lightness: 0.38,
            },
            dark_background: Rgb::new(0x1e, 0x1e, 0x1e),
            light_background: Rgb::new(0xff, 0xff, 0xff),
            fill_alpha: 0x38,
            nudge_step: 0.025,
            max_nudges: 40,
        }
    }
}

impl ColorConfig {
    pub fn tone_params(&self, tone: Tone) -> ToneParams {
        match tone {
            Tone::Dark => self.dark,
            Tone::Light => self.light,
        }
    }

    pub fn background(&self, tone: Tone) -> Rgb {
        match tone {
            Tone::Dark => self.dark_background,
            Tone::Light => self.light_background,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1.0..=21.0).contains(&self.min_contrast) {
            return Err(ConfigError::OutOfRange {
                field: "min_contrast",
                value: self.min_contrast,
            });
        }
        if !(self.hue_step > 0.0 && self.hue_step < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "hue_step",
                value: self.hue_step,
            });
        }
        if !(0.0..=0.5).contains(&self.jitter) {
            return Err(ConfigError::OutOfRange {
                field: "jitter",
                value: self.jitter,
            });
        }
        if !(self.nudge_step > 0.0 && self.nudge_step <= 0.5) {
            return Err(ConfigError::OutOfRange {
                field: "nudge_step",
                value: self.nudge_step,
            });
        }
        for (field, params) in [("dark", self.dark), ("light", self.light)] {
            let in_unit = |v: f64| (0.0..=1.0).contains(&v);
            if !in_unit(params.saturation) || !in_unit(params.lightness) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: params.lightness,
                });
            }
        }
        for tone in [Tone::Dark, Tone::Light] {
            let background = self.background(tone);
            let best = background.pole().contrast_ratio(background);
            if best < self.min_contrast {
                return Err(ConfigError::UnreachableContrast {
                    tone,
                    background,
                    min_contrast: self.min_contrast,
                    best,
                });
            }
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_owned())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnv {
            name: name.to_owned(),
            value: "<non-unicode>".to_owned(),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|err| ConfigError::InvalidEnv {
        name: name.to_owned(),
        value: format!("{value} ({err})"),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidEnv {
        name: String,
        value: String,
    },
    Json {
        message: String,
    },
    OutOfRange {
        field: &'static str,
        value: f64,
    },
    UnreachableContrast {
        tone: Tone,
        background: Rgb,
        min_contrast: f64,
        best: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { name, value } => write!(f, "invalid env {name}={value}"),
            Self::Json { message } => write!(f, "invalid config: {message}"),
            Self::OutOfRange { field, value } => {
                write!(f, "config field {field} out of range ({value})")
            }
            Self::UnreachableContrast {
                tone,
                background,
                min_contrast,
                best,
            } => write!(
                f,
                "min_contrast {min_contrast} unreachable on {tone:?} background {background} (best {best:.2})"
            ),
        }
    }
}

impl Error for ConfigError {}
