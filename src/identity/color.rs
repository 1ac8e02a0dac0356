// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Identity-seeded, contrast-safe block colours.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ColorConfig;
use crate::model::BlockId;

/// Whether the render surface is dark or light.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Dark,
    Light,
}

impl Tone {
    pub fn from_dark_surface(is_dark_surface: bool) -> Self {
        if is_dark_surface {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `0xRRGGBB` or bare `RRGGBB`.
    pub fn from_hex(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(format!("invalid hex color: {trimmed} (expected #RRGGBB)"));
        }
        let rgb =
            u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex color: {trimmed}"))?;
        Ok(Self::new(
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        ))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// `h` in degrees, `s` and `l` in `0.0..=1.0`.
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let h = h.rem_euclid(360.0) / 360.0;
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        if s == 0.0 {
            let v = channel(l);
            return Self::new(v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self::new(
            channel(hue_to_rgb(p, q, h + 1.0 / 3.0)),
            channel(hue_to_rgb(p, q, h)),
            channel(hue_to_rgb(p, q, h - 1.0 / 3.0)),
        )
    }

    /// WCAG relative luminance.
    pub fn relative_luminance(self) -> f64 {
        fn linearize(channel: u8) -> f64 {
            let c = f64::from(channel) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linearize(self.r) + 0.7152 * linearize(self.g) + 0.0722 * linearize(self.b)
    }

    pub fn contrast_ratio(self, other: Rgb) -> f64 {
        let l1 = self.relative_luminance();
        let l2 = other.relative_luminance();
        let lighter = l1.max(l2);
        let darker = l1.min(l2);
        (lighter + 0.05) / (darker + 0.05)
    }

    /// Black or white, whichever contrasts more with `self`.
    pub fn pole(self) -> Rgb {
        if Rgb::WHITE.contrast_ratio(self) >= Rgb::BLACK.contrast_ratio(self) {
            Rgb::WHITE
        } else {
            Rgb::BLACK
        }
    }
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

impl From<Rgb> for ratatui::style::Color {
    fn from(value: Rgb) -> Self {
        ratatui::style::Color::Rgb(value.r, value.g, value.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: u8,
}

impl Rgba {
    /// Composite over an opaque background.
    pub fn over(self, background: Rgb) -> Rgb {
        let a = u16::from(self.alpha);
        let mix = |fg: u8, bg: u8| -> u8 {
            ((u16::from(fg) * a + u16::from(bg) * (255 - a) + 127) / 255) as u8
        };
        Rgb::new(
            mix(self.rgb.r, background.r),
            mix(self.rgb.g, background.g),
            mix(self.rgb.b, background.b),
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02x}", self.rgb, self.alpha)
    }
}

/// The two colour variants of a block: a low-alpha fill for line backgrounds and an opaque
/// marker (gutter bar, list swatch) that meets the configured contrast minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockColor {
    pub fill: Rgba,
    pub marker: Rgb,
}

/// Derives and caches one [`BlockColor`] per identity and tone.
#[derive(Debug, Clone, Default)]
pub struct ColorAssigner {
    config: ColorConfig,
    cache: HashMap<(BlockId, Tone), BlockColor>,
}

impl ColorAssigner {
    pub fn new(config: ColorConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    pub fn color_for(&mut self, block_id: &BlockId, tone: Tone) -> BlockColor {
        if let Some(color) = self.cache.get(&(block_id.clone(), tone)) {
            return *color;
        }
        let color = derive_color(&self.config, block_id, tone);
        self.cache.insert((block_id.clone(), tone), color);
        color
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Drop cached colours of identities not in `keep`.
    pub fn retain(&mut self, keep: &[BlockId]) {
        self.cache.retain(|(block_id, _), _| keep.contains(block_id));
    }
}

/// Pure colour derivation; [`ColorAssigner`] only adds caching on top.
pub fn derive_color(config: &ColorConfig, block_id: &BlockId, tone: Tone) -> BlockColor {
    let digest = Sha256::digest(block_id.as_str().as_bytes());
    let seed = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let hue = (f64::from(seed) * config.hue_step).fract() * 360.0;

    let jitter = |byte: u8| (f64::from(byte) / 255.0 - 0.5) * 2.0 * config.jitter;
    let params = config.tone_params(tone);
    let saturation = (params.saturation + jitter(digest[4])).clamp(0.0, 1.0);
    let mut lightness = (params.lightness + jitter(digest[5])).clamp(0.0, 1.0);

    let background = config.background(tone);
    let pole = background.pole();
    let direction = if pole == Rgb::WHITE { 1.0 } else { -1.0 };

    let mut marker = Rgb::from_hsl(hue, saturation, lightness);
    let mut nudges = 0;
    while marker.contrast_ratio(background) < config.min_contrast && nudges < config.max_nudges {
        lightness = (lightness + direction * config.nudge_step).clamp(0.0, 1.0);
        marker = Rgb::from_hsl(hue, saturation, lightness);
        nudges += 1;
    }
    if marker.contrast_ratio(background) < config.min_contrast {
        marker = pole;
    }

    BlockColor {
        fill: Rgba {
            rgb: marker,
            alpha: config.fill_alpha,
        },
        marker,
    }
}

#[cfg(test)]
mod tests {
    use super::{derive_color, ColorAssigner, Rgb, Rgba, Tone};
    use crate::config::ColorConfig;
    use crate::model::BlockId;

    fn ids(n: usize) -> Vec<BlockId> {
        (0..n)
            .map(|i| BlockId::new(format!("blk:{i:016x}")).expect("id"))
            .collect()
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(Rgb::from_hsl(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsl(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hsl(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
        assert_eq!(Rgb::from_hsl(42.0, 0.0, 1.0), Rgb::WHITE);
    }

    #[test]
    fn contrast_ratio_extremes() {
        let ratio = Rgb::BLACK.contrast_ratio(Rgb::WHITE);
        assert!((ratio - 21.0).abs() < 1e-9, "{ratio}");
        assert!((Rgb::WHITE.contrast_ratio(Rgb::WHITE) - 1.0).abs() < 1e-9);
        assert_eq!(Rgb::new(0x1e, 0x1e, 0x1e).pole(), Rgb::WHITE);
        assert_eq!(Rgb::WHITE.pole(), Rgb::BLACK);
    }

    #[test]
    fn hex_round_trip() {
        let color = Rgb::from_hex("#1E1e1e").expect("hex");
        assert_eq!(color, Rgb::new(0x1e, 0x1e, 0x1e));
        assert_eq!(color.to_hex(), "#1e1e1e");
        assert!(Rgb::from_hex("#12345").is_err());
    }

    #[test]
    fn fill_composites_over_background() {
        let fill = Rgba {
            rgb: Rgb::WHITE,
            alpha: 0,
        };
        assert_eq!(fill.over(Rgb::BLACK), Rgb::BLACK);
        let opaque = Rgba {
            rgb: Rgb::WHITE,
            alpha: 255,
        };
        assert_eq!(opaque.over(Rgb::BLACK), Rgb::WHITE);
    }

    #[test]
    fn every_color_meets_min_contrast_on_both_tones() {
        let config = ColorConfig::default();
        for tone in [Tone::Dark, Tone::Light] {
            let background = config.background(tone);
            for id in ids(200) {
                let color = derive_color(&config, &id, tone);
                let ratio = color.marker.contrast_ratio(background);
                assert!(
                    ratio >= config.min_contrast,
                    "{id} on {tone:?}: {} has contrast {ratio:.2}",
                    color.marker
                );
            }
        }
    }

    #[test]
    fn strict_threshold_still_holds() {
        let config = ColorConfig {
            min_contrast: 7.0,
            ..ColorConfig::default()
        };
        for id in ids(50) {
            let color = derive_color(&config, &id, Tone::Light);
            assert!(color.marker.contrast_ratio(config.light_background) >= 7.0);
        }
    }

    #[test]
    fn colors_are_deterministic_and_cached() {
        let id = BlockId::new("blk:0123456789abcdef").expect("id");
        let mut first = ColorAssigner::new(ColorConfig::default());
        let mut second = ColorAssigner::new(ColorConfig::default());

        let a = first.color_for(&id, Tone::Dark);
        assert_eq!(first.color_for(&id, Tone::Dark), a);
        assert_eq!(second.color_for(&id, Tone::Dark), a);
        assert_eq!(first.cached(), 1);
        assert_eq!(a.fill.rgb, a.marker);
        assert_eq!(a.fill.alpha, ColorConfig::default().fill_alpha);

        first.color_for(&id, Tone::Light);
        assert_eq!(first.cached(), 2);
        first.clear();
        assert_eq!(first.cached(), 0);
    }

    #[test]
    fn hues_spread_across_blocks() {
        let config = ColorConfig::default();
        let markers: std::collections::HashSet<Rgb> = ids(12)
            .iter()
            .map(|id| derive_color(&config, id, Tone::Dark).marker)
            .collect();
        assert!(markers.len() >= 10, "only {} distinct colours", markers.len());
    }
}
