//! # Color Resolution
//!
//! Turns the configured color mode into a concrete [`Palette`]:
//!
//! ```text
//! ColorMode::Cursor  ──► [cursor color]            (1 entry, from the host)
//! ColorMode::Rainbow ──► RAINBOW                   (6 entries, constant)
//! ColorMode::Custom  ──► settings.colors, in order (duplicates kept)
//! ```
//!
//! Accepted color strings: CSS keywords (case-insensitive), `#rgb`, `#rgba`,
//! `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()` and `hsl()`/`hsla()` functional
//! notation. Alpha is always discarded, particles carry their own opacity.
//!
//! The palette is recomputed on every spawn. It is a handful of string
//! parses and must follow the cursor color as the host changes it.

use serde::{Deserialize, Serialize};

use crate::css_names::CSS_COLORS;
use crate::error::{ColorError, ColorResult};

/// An opaque 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a color from its channels.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a color from a packed `0xRRGGBB` value.
    #[inline]
    #[must_use]
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    /// Returns the channels as an array.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Formats as lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parses any supported color string.
    ///
    /// # Errors
    ///
    /// Returns a [`ColorError`] naming the offending input when the string is
    /// not a known keyword, a well-formed hex color or an `rgb()`/`hsl()`
    /// function.
    pub fn parse(input: &str) -> ColorResult<Self> {
        let trimmed = input.trim();
        if let Some(digits) = trimmed.strip_prefix('#') {
            return parse_hex(digits).ok_or_else(|| ColorError::InvalidHex(input.to_string()));
        }

        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("rgb") {
            return parse_rgb_function(&lowered)
                .ok_or_else(|| ColorError::InvalidFunction(input.to_string()));
        }
        if lowered.starts_with("hsl") {
            return parse_hsl_function(&lowered)
                .ok_or_else(|| ColorError::InvalidFunction(input.to_string()));
        }

        CSS_COLORS
            .binary_search_by(|(name, _)| (*name).cmp(lowered.as_str()))
            .map(|index| Self::from_u32(CSS_COLORS[index].1))
            .map_err(|_| ColorError::UnknownName(input.to_string()))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_hex(digits: &str) -> Option<Rgb> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

    match digits.len() {
        3 | 4 => Some(Rgb::new(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 | 8 => Some(Rgb::new(byte(0)?, byte(2)?, byte(4)?)),
        _ => None,
    }
}

/// Splits `name(a, b, c)` or `name(a b c / d)` into its arguments.
fn function_args<'a>(
    lowered: &'a str,
    name: &str,
    alpha_name: &str,
) -> Option<impl Iterator<Item = &'a str>> {
    let body = lowered
        .strip_prefix(alpha_name)
        .or_else(|| lowered.strip_prefix(name))?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some(
        body.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty()),
    )
}

fn parse_rgb_function(lowered: &str) -> Option<Rgb> {
    let mut parts = function_args(lowered, "rgb", "rgba")?;

    let mut channel = || -> Option<u8> {
        let part = parts.next()?;
        let value = match part.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? / 100.0 * 255.0,
            None => part.parse::<f64>().ok()?,
        };
        if !value.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let channel = value.round().clamp(0.0, 255.0) as u8;
        Some(channel)
    };

    Some(Rgb::new(channel()?, channel()?, channel()?))
}

/// `hsl(h, s%, l%)` with the hue in degrees (`deg` suffix optional).
fn parse_hsl_function(lowered: &str) -> Option<Rgb> {
    let mut parts = function_args(lowered, "hsl", "hsla")?;

    let hue = parts.next()?;
    let hue: f64 = hue.strip_suffix("deg").unwrap_or(hue).parse().ok()?;
    let mut percent = || -> Option<f64> {
        let value: f64 = parts.next()?.strip_suffix('%')?.parse().ok()?;
        Some((value / 100.0).clamp(0.0, 1.0))
    };
    let saturation = percent()?;
    let lightness = percent()?;
    if !hue.is_finite() || !saturation.is_finite() || !lightness.is_finite() {
        return None;
    }

    let hue = hue.rem_euclid(360.0);
    let chroma = saturation * lightness.min(1.0 - lightness);
    let channel = |n: f64| -> u8 {
        let k = (n + hue / 30.0) % 12.0;
        let value = lightness - chroma * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let channel = (value * 255.0).round().clamp(0.0, 255.0) as u8;
        channel
    };
    Some(Rgb::new(channel(0.0), channel(8.0), channel(4.0)))
}

/// How particle colors are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Use the terminal's current cursor color.
    Cursor,
    /// Use the user's `colors` list.
    #[default]
    Custom,
    /// Use the fixed rainbow sweep.
    Rainbow,
}

impl ColorMode {
    /// Parses a mode keyword. Unknown keywords yield `None`.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "cursor" => Some(Self::Cursor),
            "custom" => Some(Self::Custom),
            "rainbow" => Some(Self::Rainbow),
            _ => None,
        }
    }

    /// Returns the configuration keyword for this mode.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Custom => "custom",
            Self::Rainbow => "rainbow",
        }
    }
}

/// The fixed rainbow sweep, violet to red.
pub const RAINBOW: [Rgb; 6] = [
    Rgb::from_u32(0xA8_00FF),
    Rgb::from_u32(0x00_79FF),
    Rgb::from_u32(0x00_F11D),
    Rgb::from_u32(0xFF_EF00),
    Rgb::from_u32(0xFF_7F00),
    Rgb::from_u32(0xFF_0900),
];

/// An ordered list of resolved colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette(Vec<Rgb>);

impl Palette {
    /// Wraps already-resolved colors.
    #[must_use]
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self(colors)
    }

    /// The rainbow palette.
    #[must_use]
    pub fn rainbow() -> Self {
        Self(RAINBOW.to_vec())
    }

    /// Number of colors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the palette holds no colors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Color for the `index`-th particle of a burst, cycling through the list.
    /// Returns `None` only for an empty palette.
    #[inline]
    #[must_use]
    pub fn cycle(&self, index: usize) -> Option<Rgb> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0[index % self.0.len()])
        }
    }

    /// The colors in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Rgb] {
        &self.0
    }
}

impl From<Vec<Rgb>> for Palette {
    fn from(colors: Vec<Rgb>) -> Self {
        Self(colors)
    }
}

/// Resolves the palette for a spawn.
///
/// `cursor_color` is only consulted in [`ColorMode::Cursor`] and `custom` only
/// in [`ColorMode::Custom`].
///
/// # Errors
///
/// Any unparsable color is returned as-is so the user sees their typo.
/// Cursor mode without a cursor color yields [`ColorError::MissingCursorColor`].
pub fn resolve<S: AsRef<str>>(
    mode: ColorMode,
    custom: &[S],
    cursor_color: Option<&str>,
) -> ColorResult<Palette> {
    match mode {
        ColorMode::Cursor => {
            let color = cursor_color.ok_or(ColorError::MissingCursorColor)?;
            Ok(Palette(vec![Rgb::parse(color)?]))
        }
        ColorMode::Rainbow => Ok(Palette::rainbow()),
        ColorMode::Custom => custom
            .iter()
            .map(|c| Rgb::parse(c.as_ref()))
            .collect::<ColorResult<Vec<_>>>()
            .map(Palette),
    }
}
