//! Shared activity palette and color blending.
//!
//! Every view colors activities through [`activity_color`] and labels them
//! through [`activity_label`]; there is exactly one table.
//!
//! Blending uses a weighted quadratic mean per channel.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ActivityType;

/// Floor applied to blended alpha so mixed nodes never vanish.
pub const MIN_BLEND_ALPHA: f32 = 0.4;

/// Color for activity kinds outside the known six.
pub const DEFAULT_ACTIVITY_COLOR: Rgba = Rgba::new(194, 178, 128, 0.6);

/// Color for a node or edge with no recorded activity.
pub const EMPTY_BLEND_COLOR: Rgba = Rgba::new(132, 132, 132, 0.6);

/// An sRGB color with straight alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        let a = if hex.len() == 8 {
            channel(6)? as f32 / 255.0
        } else {
            1.0
        };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// CSS `rgba(...)` notation, as the rendering widgets expect.
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Palette entry for one activity kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteEntry {
    pub color: Rgba,
    pub label: &'static str,
}

fn known_entry(activity_type: &ActivityType) -> Option<PaletteEntry> {
    let entry = match activity_type {
        ActivityType::StudyCircle => PaletteEntry {
            color: Rgba::new(130, 168, 2, 0.6),
            label: "SC",
        },
        ActivityType::Devotional => PaletteEntry {
            color: Rgba::new(184, 2, 75, 0.6),
            label: "DEV",
        },
        ActivityType::HomeVisit => PaletteEntry {
            color: Rgba::new(245, 45, 5, 0.6),
            label: "HV",
        },
        ActivityType::ChildrensClass => PaletteEntry {
            color: Rgba::new(242, 110, 2, 0.6),
            label: "CC",
        },
        ActivityType::Jyg => PaletteEntry {
            color: Rgba::new(195, 122, 255, 0.5),
            label: "JYG",
        },
        ActivityType::Nucleus => PaletteEntry {
            color: Rgba::new(152, 54, 18, 0.9),
            label: "NUC",
        },
        ActivityType::Other(_) => return None,
    };
    Some(entry)
}

/// Color of an activity kind; unknown kinds get [`DEFAULT_ACTIVITY_COLOR`].
pub fn activity_color(activity_type: &ActivityType) -> Rgba {
    known_entry(activity_type)
        .map(|e| e.color)
        .unwrap_or(DEFAULT_ACTIVITY_COLOR)
}

/// Short label of an activity kind; unknown kinds are labelled by name.
pub fn activity_label(activity_type: &ActivityType) -> &str {
    match known_entry(activity_type) {
        Some(entry) => entry.label,
        None => activity_type.as_str(),
    }
}

/// Blend weighted colors.
///
/// Each channel is `sqrt(Σ wᵢ·cᵢ² / Σ wᵢ)`; alpha is the weighted mean
/// alpha, floored at [`MIN_BLEND_ALPHA`]. Identical colors are merged
/// first, so a single distinct color comes back unchanged. Returns `None`
/// for an empty input or a non-positive total weight.
pub fn blend_colors(colors: &[(Rgba, f64)]) -> Option<Rgba> {
    let mut distinct: Vec<(Rgba, f64)> = Vec::with_capacity(colors.len());
    for &(color, weight) in colors {
        match distinct.iter_mut().find(|(c, _)| *c == color) {
            Some((_, w)) => *w += weight,
            None => distinct.push((color, weight)),
        }
    }

    let total: f64 = distinct.iter().map(|(_, w)| w).sum();
    if distinct.is_empty() || total <= 0.0 {
        return None;
    }
    if distinct.len() == 1 {
        return Some(distinct[0].0);
    }

    let quadratic = |channel: fn(&Rgba) -> u8| -> u8 {
        let sum: f64 = distinct
            .iter()
            .map(|(c, w)| {
                let v = channel(c) as f64;
                w * v * v
            })
            .sum();
        (sum / total).sqrt().round().clamp(0.0, 255.0) as u8
    };

    let alpha: f64 = distinct.iter().map(|(c, w)| w * c.a as f64).sum::<f64>() / total;

    Some(Rgba::new(
        quadratic(|c| c.r),
        quadratic(|c| c.g),
        quadratic(|c| c.b),
        (alpha as f32).max(MIN_BLEND_ALPHA),
    ))
}

/// Blend the palette colors of activity kinds weighted by occurrence count.
///
/// Falls back to [`EMPTY_BLEND_COLOR`] when there is nothing to blend.
pub fn blend_activity_counts<'a, I>(counts: I) -> Rgba
where
    I: IntoIterator<Item = (&'a ActivityType, u32)>,
{
    let weighted: Vec<(Rgba, f64)> = counts
        .into_iter()
        .map(|(kind, count)| (activity_color(kind), count as f64))
        .collect();
    blend_colors(&weighted).unwrap_or(EMPTY_BLEND_COLOR)
}

// ============================================================================
// Census overlay scales
// ============================================================================

fn parse_scale(hexes: &[&str]) -> Vec<Rgba> {
    hexes.iter().filter_map(|h| Rgba::from_hex(h)).collect()
}

/// Median age, light salmon to dark red.
pub static AGE_SCALE: Lazy<Vec<Rgba>> = Lazy::new(|| {
    parse_scale(&[
        "#FFA07A", "#FA8072", "#E9967A", "#F08080", "#CD5C5C", "#DC143C", "#B22222", "#8B0000",
    ])
});

/// Population density, pale to deep blue.
pub static DENSITY_SCALE: Lazy<Vec<Rgba>> = Lazy::new(|| {
    parse_scale(&[
        "#E6F3FF", "#C6E2FF", "#95CAFF", "#69B3FF", "#429CFF", "#1C85FF", "#0066CC", "#004C99",
    ])
});

/// Median income, pale to deep green.
pub static INCOME_SCALE: Lazy<Vec<Rgba>> = Lazy::new(|| {
    parse_scale(&[
        "#E6FFE6", "#C6FFC6", "#95FF95", "#69FF69", "#42FF42", "#1CFF1C", "#00CC00", "#009900",
    ])
});

/// Step of `scale` for `value`: `floor(value / max * (len - 1))`, clamped.
pub fn scale_color(scale: &[Rgba], value: f64, max: f64) -> Option<Rgba> {
    let last = scale.len().checked_sub(1)?;
    let ratio = if max > 0.0 && value.is_finite() { value / max } else { 0.0 };
    let index = (ratio * last as f64).floor().clamp(0.0, last as f64) as usize;
    scale.get(index).copied()
}
