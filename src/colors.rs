//! Cluster colors and readable foregrounds.
//!
//! Every known cluster has a fixed color and icon. Unknown clusters share a
//! neutral slate gray and get no icon. Foreground (text) colors are picked
//! from the background's weighted luminance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Color for clusters outside the known table.
pub const FALLBACK_COLOR: &str = "#64748b";

/// Hover background used when a cluster color cannot be decoded.
pub const FALLBACK_HOVER_BACKGROUND: &str = "rgba(31, 119, 180, 0.9)";

/// Luminance threshold in thousandths (186 * 1000).
const LUMINANCE_THRESHOLD: u32 = 186_000;

const CLUSTER_TABLE: &[(&str, &str, &str)] = &[
    ("Self-Regulation", "#1f77b4", "🎯"),
    ("Awareness", "#84cc16", "🌿"),
    ("Buddhism & Spirituality", "#f59e0b", "🕉️"),
    ("Concentration & Flow", "#ef4444", "🎯"),
    ("Practice, Retreat, & Meta", "#a855f7", "🏛️"),
    ("Anxiety & Mental Health", "#22c55e", "💚"),
    ("Meditation & Mindfulness", "#17becf", "🧘"),
];

/// Names of all clusters with a fixed style, in table order.
pub fn known_clusters() -> impl Iterator<Item = &'static str> {
    CLUSTER_TABLE.iter().map(|(name, _, _)| *name)
}

/// Color and icon for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStyle {
    pub cluster: String,
    pub color: String,
    pub icon: Option<String>,
}

/// Foreground color readable on a given background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contrast {
    Black,
    White,
}

impl Contrast {
    pub fn as_str(&self) -> &'static str {
        match self {
            Contrast::Black => "black",
            Contrast::White => "white",
        }
    }
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorScheme;

impl ColorScheme {
    /// Look up the style for a cluster label.
    pub fn resolve(cluster: &str) -> ClusterStyle {
        match CLUSTER_TABLE.iter().find(|(name, _, _)| *name == cluster) {
            Some((_, color, icon)) => ClusterStyle {
                cluster: cluster.to_string(),
                color: color.to_string(),
                icon: Some(icon.to_string()),
            },
            None => ClusterStyle {
                cluster: cluster.to_string(),
                color: FALLBACK_COLOR.to_string(),
                icon: None,
            },
        }
    }

    /// Black on light backgrounds, white on dark ones.
    ///
    /// Black iff `0.299R + 0.587G + 0.114B > 186`. Input that cannot be
    /// decoded is treated as a light background.
    pub fn contrast_color(hex: &str) -> Contrast {
        match parse_hex(hex) {
            Some((r, g, b)) => {
                let luminance = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
                if luminance > LUMINANCE_THRESHOLD {
                    Contrast::Black
                } else {
                    Contrast::White
                }
            }
            None => Contrast::Black,
        }
    }

    /// Translucent hover box background for a cluster color.
    pub fn hover_background(hex: &str) -> String {
        match parse_hex(hex) {
            Some((r, g, b)) => format!("rgba({}, {}, {}, 0.9)", r, g, b),
            None => FALLBACK_HOVER_BACKGROUND.to_string(),
        }
    }

    /// Edge color for a sentiment in [-1, 1]: red through amber to green.
    pub fn sentiment_color(sentiment: f64) -> String {
        let s = if sentiment.is_finite() {
            sentiment.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        hsl_to_hex(60.0 + s * 60.0, 0.7, 0.5)
    }
}

/// Decode `#RRGGBB`, `RRGGBB` or `#RGB`.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some((
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some((short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

/// Convert HSL (hue in degrees, saturation and lightness in 0..1) to hex.
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let h = ((h % 360.0) + 360.0) % 360.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", to_byte(r), to_byte(g), to_byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_cluster() {
        let style = ColorScheme::resolve("Awareness");
        assert_eq!(style.color, "#84cc16");
        assert_eq!(style.icon.as_deref(), Some("🌿"));
    }

    #[test]
    fn test_resolve_unknown_cluster() {
        let style = ColorScheme::resolve("Gardening");
        assert_eq!(style.color, FALLBACK_COLOR);
        assert_eq!(style.icon, None);
        assert_eq!(style.cluster, "Gardening");
    }

    #[test]
    fn test_contrast_extremes() {
        assert_eq!(ColorScheme::contrast_color("#FFFFFF"), Contrast::Black);
        assert_eq!(ColorScheme::contrast_color("#000000"), Contrast::White);
        assert_eq!(ColorScheme::contrast_color("fff"), Contrast::Black);
    }

    #[test]
    fn test_contrast_threshold_is_strict() {
        // grey 186 sits exactly on the threshold
        assert_eq!(ColorScheme::contrast_color("#bababa"), Contrast::White);
        assert_eq!(ColorScheme::contrast_color("#bbbbbb"), Contrast::Black);
    }

    #[test]
    fn test_contrast_for_cluster_colors() {
        assert_eq!(ColorScheme::contrast_color("#1f77b4"), Contrast::White);
        assert_eq!(ColorScheme::contrast_color("#84cc16"), Contrast::White);
        assert_eq!(ColorScheme::contrast_color("#f59e0b"), Contrast::White);
    }

    #[test]
    fn test_undecodable_color_is_black() {
        assert_eq!(ColorScheme::contrast_color("teal"), Contrast::Black);
        assert_eq!(ColorScheme::contrast_color("#12345"), Contrast::Black);
        assert_eq!(ColorScheme::contrast_color("#ééé"), Contrast::Black);
    }

    #[test]
    fn test_hover_background() {
        assert_eq!(ColorScheme::hover_background("#84cc16"), "rgba(132, 204, 22, 0.9)");
        assert_eq!(ColorScheme::hover_background("bogus"), FALLBACK_HOVER_BACKGROUND);
    }

    #[test]
    fn test_sentiment_color_endpoints() {
        assert_eq!(ColorScheme::sentiment_color(-1.0), hsl_to_hex(0.0, 0.7, 0.5));
        assert_eq!(ColorScheme::sentiment_color(1.0), hsl_to_hex(120.0, 0.7, 0.5));
        assert_eq!(ColorScheme::sentiment_color(f64::NAN), ColorScheme::sentiment_color(0.0));
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_hex(0.0, 1.0, 0.5), "#ff0000");
        assert_eq!(hsl_to_hex(120.0, 1.0, 0.5), "#00ff00");
        assert_eq!(hsl_to_hex(240.0, 1.0, 0.5), "#0000ff");
    }
}
