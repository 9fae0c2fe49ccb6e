#![forbid(unsafe_code)]

//! RGBA colors, parsing, and palette downgrades.
//!
//! Colors are stored as straight-alpha `0xRRGGBBAA`. Alpha 0 means "no color":
//! the terminal default for foregrounds, and "let whatever is underneath show"
//! for backgrounds during compositing.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct PackedRgba(pub u32);

/// The xterm default palette for the 16 ANSI colors.
pub const ANSI16_PALETTE: [PackedRgba; 16] = [
    PackedRgba::rgb(0, 0, 0),
    PackedRgba::rgb(205, 0, 0),
    PackedRgba::rgb(0, 205, 0),
    PackedRgba::rgb(205, 205, 0),
    PackedRgba::rgb(0, 0, 238),
    PackedRgba::rgb(205, 0, 205),
    PackedRgba::rgb(0, 205, 205),
    PackedRgba::rgb(229, 229, 229),
    PackedRgba::rgb(127, 127, 127),
    PackedRgba::rgb(255, 0, 0),
    PackedRgba::rgb(0, 255, 0),
    PackedRgba::rgb(255, 255, 0),
    PackedRgba::rgb(92, 92, 255),
    PackedRgba::rgb(255, 0, 255),
    PackedRgba::rgb(0, 255, 255),
    PackedRgba::rgb(255, 255, 255),
];

const ANSI16_NAMES: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "white",
    "brightblack",
    "brightred",
    "brightgreen",
    "brightyellow",
    "brightblue",
    "brightmagenta",
    "brightcyan",
    "brightwhite",
];

impl PackedRgba {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = ANSI16_PALETTE[0];
    pub const RED: Self = ANSI16_PALETTE[1];
    pub const GREEN: Self = ANSI16_PALETTE[2];
    pub const YELLOW: Self = ANSI16_PALETTE[3];
    pub const BLUE: Self = ANSI16_PALETTE[4];
    pub const MAGENTA: Self = ANSI16_PALETTE[5];
    pub const CYAN: Self = ANSI16_PALETTE[6];
    pub const WHITE: Self = ANSI16_PALETTE[7];
    pub const GRAY: Self = ANSI16_PALETTE[8];
    pub const BRIGHT_RED: Self = ANSI16_PALETTE[9];
    pub const BRIGHT_GREEN: Self = ANSI16_PALETTE[10];
    pub const BRIGHT_YELLOW: Self = ANSI16_PALETTE[11];
    pub const BRIGHT_BLUE: Self = ANSI16_PALETTE[12];
    pub const BRIGHT_MAGENTA: Self = ANSI16_PALETTE[13];
    pub const BRIGHT_CYAN: Self = ANSI16_PALETTE[14];
    pub const BRIGHT_WHITE: Self = ANSI16_PALETTE[15];

    /// Opaque RGB.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// True when alpha is zero.
    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.a() == 0
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a() == 255
    }

    #[inline]
    const fn div_round_u8(numer: u64, denom: u64) -> u8 {
        let v = (numer + (denom / 2)) / denom;
        if v > 255 { 255 } else { v as u8 }
    }

    /// Porter-Duff source-over: `self` drawn on top of `dst`.
    ///
    /// Works in exact rationals over straight alpha and rounds once at the end.
    pub fn over(self, dst: Self) -> Self {
        let s_a = self.a() as u64;
        if s_a == 255 {
            return self;
        }
        if s_a == 0 {
            return dst;
        }

        let d_a = dst.a() as u64;
        let inv_s_a = 255 - s_a;
        let numer_a = 255 * s_a + d_a * inv_s_a;
        if numer_a == 0 {
            return Self::TRANSPARENT;
        }

        let channel = |s: u8, d: u8| {
            Self::div_round_u8(
                (s as u64) * s_a * 255 + (d as u64) * d_a * inv_s_a,
                numer_a,
            )
        };
        Self::rgba(
            channel(self.r(), dst.r()),
            channel(self.g(), dst.g()),
            channel(self.b(), dst.b()),
            Self::div_round_u8(numer_a, 255),
        )
    }

    /// Scale alpha by `opacity`, clamped to `[0.0, 1.0]`. NaN counts as 0.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        let a = ((self.a() as f32) * opacity).round().clamp(0.0, 255.0) as u8;
        Self::rgba(self.r(), self.g(), self.b(), a)
    }

    /// The same color with full alpha.
    #[inline]
    pub const fn opaque(self) -> Self {
        Self::rgb(self.r(), self.g(), self.b())
    }

    /// Nearest xterm 256-palette index.
    pub fn to_ansi256(self) -> u8 {
        let (r, g, b) = (self.r(), self.g(), self.b());
        if let Some(idx) = self.exact_ansi16() {
            return idx;
        }
        if r == g && g == b {
            if r < 8 {
                return 16;
            }
            if r > 248 {
                return 231;
            }
            return 232 + ((r - 8) / 10).min(23);
        }
        16 + 36 * cube_index(r) + 6 * cube_index(g) + cube_index(b)
    }

    /// Nearest of the 16 ANSI colors (0-7 normal, 8-15 bright).
    pub fn to_ansi16(self) -> u8 {
        if let Some(idx) = self.exact_ansi16() {
            return idx;
        }
        let mut best = 0u8;
        let mut best_dist = u64::MAX;
        for (idx, candidate) in ANSI16_PALETTE.iter().enumerate() {
            let dist = weighted_distance(self, *candidate);
            if dist < best_dist {
                best = idx as u8;
                best_dist = dist;
            }
        }
        best
    }

    /// RGB value of an xterm 256-palette index.
    pub fn from_ansi256(index: u8) -> Self {
        const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
        match index {
            0..=15 => ANSI16_PALETTE[index as usize],
            16..=231 => {
                let i = index - 16;
                Self::rgb(
                    LEVELS[(i / 36) as usize],
                    LEVELS[((i / 6) % 6) as usize],
                    LEVELS[(i % 6) as usize],
                )
            }
            _ => {
                let gray = 8 + 10 * (index - 232);
                Self::rgb(gray, gray, gray)
            }
        }
    }

    fn exact_ansi16(self) -> Option<u8> {
        let opaque = self.opaque();
        ANSI16_PALETTE
            .iter()
            .position(|c| *c == opaque)
            .map(|i| i as u8)
    }
}

// Cube levels are [0, 95, 135, 175, 215, 255]; thresholds are the midpoints.
fn cube_index(v: u8) -> u8 {
    if v < 48 {
        0
    } else if v < 115 {
        1
    } else {
        (v - 35) / 40
    }
}

fn weighted_distance(a: PackedRgba, b: PackedRgba) -> u64 {
    let dr = a.r() as i64 - b.r() as i64;
    let dg = a.g() as i64 - b.g() as i64;
    let db = a.b() as i64 - b.b() as i64;
    (2126 * dr * dr + 7152 * dg * dg + 722 * db * db) as u64
}

/// A color string that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError {
    input: String,
}

impl ParseColorError {
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color {:?}", self.input)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for PackedRgba {
    type Err = ParseColorError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)`, the 16 ANSI names (with or without `bright-`
    /// separators, `gray`/`grey` for bright black), and
    /// `transparent`/`none`/`default`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError {
            input: s.to_string(),
        };
        let raw = s.trim().to_ascii_lowercase();

        if let Some(hex) = raw.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }
        if let Some(args) = raw
            .strip_prefix("rgba(")
            .or_else(|| raw.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_fn(args).ok_or_else(err);
        }

        let name: String = raw.chars().filter(|c| *c != '-' && *c != '_').collect();
        match name.as_str() {
            "transparent" | "none" | "default" => return Ok(Self::TRANSPARENT),
            "gray" | "grey" => return Ok(Self::GRAY),
            _ => {}
        }
        ANSI16_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| ANSI16_PALETTE[i])
            .ok_or_else(err)
    }
}

fn parse_hex(hex: &str) -> Option<PackedRgba> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(PackedRgba::rgb(
            nibble(0)? * 17,
            nibble(1)? * 17,
            nibble(2)? * 17,
        )),
        6 => Some(PackedRgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(PackedRgba::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_fn(args: &str) -> Option<PackedRgba> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<u16>().ok().map(|v| v.min(255) as u8);
    match parts.as_slice() {
        [r, g, b] => Some(PackedRgba::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha = a.parse::<f32>().ok()?;
            let alpha = if alpha <= 1.0 {
                (alpha.max(0.0) * 255.0).round() as u8
            } else {
                alpha.min(255.0) as u8
            };
            Some(PackedRgba::rgba(channel(r)?, channel(g)?, channel(b)?, alpha))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_round_trip() {
        let c = PackedRgba::rgba(1, 2, 3, 4);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (1, 2, 3, 4));
        assert!(PackedRgba::TRANSPARENT.is_transparent());
        assert!(PackedRgba::BLUE.is_opaque());
    }

    #[test]
    fn over_with_opaque_source_replaces() {
        assert_eq!(PackedRgba::RED.over(PackedRgba::BLUE), PackedRgba::RED);
    }

    #[test]
    fn over_with_transparent_source_keeps_destination() {
        assert_eq!(
            PackedRgba::TRANSPARENT.over(PackedRgba::BLUE),
            PackedRgba::BLUE
        );
    }

    #[test]
    fn half_alpha_blends_midway() {
        let src = PackedRgba::rgba(255, 255, 255, 128);
        let out = src.over(PackedRgba::rgb(0, 0, 0));
        assert_eq!(out.a(), 255);
        assert!((127..=129).contains(&out.r()));
    }

    #[test]
    fn with_opacity_scales_alpha() {
        assert_eq!(PackedRgba::WHITE.with_opacity(0.5).a(), 128);
        assert_eq!(PackedRgba::WHITE.with_opacity(2.0).a(), 255);
        assert_eq!(PackedRgba::WHITE.with_opacity(f32::NAN).a(), 0);
    }

    #[test]
    fn parse_hex_forms() {
        assert_eq!("#f00".parse(), Ok(PackedRgba::rgb(255, 0, 0)));
        assert_eq!("#102030".parse(), Ok(PackedRgba::rgb(16, 32, 48)));
        assert_eq!("#10203080".parse(), Ok(PackedRgba::rgba(16, 32, 48, 128)));
        assert!("#12".parse::<PackedRgba>().is_err());
        assert!("#gggggg".parse::<PackedRgba>().is_err());
    }

    #[test]
    fn parse_names() {
        assert_eq!("blue".parse(), Ok(PackedRgba::BLUE));
        assert_eq!(" Bright-Red ".parse(), Ok(PackedRgba::BRIGHT_RED));
        assert_eq!("grey".parse(), Ok(PackedRgba::GRAY));
        assert_eq!("none".parse(), Ok(PackedRgba::TRANSPARENT));
        let err = "chartreuse-ish".parse::<PackedRgba>().unwrap_err();
        assert_eq!(err.input(), "chartreuse-ish");
        assert!(err.to_string().contains("chartreuse-ish"));
    }

    #[test]
    fn parse_rgb_function() {
        assert_eq!("rgb(1, 2, 3)".parse(), Ok(PackedRgba::rgb(1, 2, 3)));
        assert_eq!("rgba(1,2,3,0.5)".parse(), Ok(PackedRgba::rgba(1, 2, 3, 128)));
        assert_eq!("rgb(300,0,0)".parse(), Ok(PackedRgba::rgb(255, 0, 0)));
        assert!("rgb(1,2)".parse::<PackedRgba>().is_err());
    }

    #[test]
    fn palette_colors_map_to_their_index() {
        assert_eq!(PackedRgba::BLUE.to_ansi16(), 4);
        assert_eq!(PackedRgba::BLUE.to_ansi256(), 4);
        assert_eq!(PackedRgba::BRIGHT_WHITE.to_ansi16(), 15);
    }

    #[test]
    fn rgb_to_256_rules() {
        assert_eq!(PackedRgba::rgb(8, 8, 8).to_ansi256(), 232);
        assert_eq!(PackedRgba::rgb(18, 18, 18).to_ansi256(), 233);
        assert_eq!(PackedRgba::rgb(250, 250, 250).to_ansi256(), 231);
        assert_eq!(PackedRgba::rgb(255, 0, 1).to_ansi256(), 196);
    }

    #[test]
    fn ansi256_decodes_cube_and_ramp() {
        assert_eq!(PackedRgba::from_ansi256(4), PackedRgba::BLUE);
        assert_eq!(PackedRgba::from_ansi256(196), PackedRgba::rgb(255, 0, 0));
        assert_eq!(PackedRgba::from_ansi256(232), PackedRgba::rgb(8, 8, 8));
        assert_eq!(PackedRgba::from_ansi256(255), PackedRgba::rgb(238, 238, 238));
    }

    #[test]
    fn rgb_to_16_picks_nearest() {
        assert_eq!(PackedRgba::rgb(250, 10, 10).to_ansi16(), 9);
        assert_eq!(PackedRgba::rgb(10, 10, 10).to_ansi16(), 0);
    }
}
