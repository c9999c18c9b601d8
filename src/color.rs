use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0},
    combinator::{eof, opt},
    number::complete::double,
    sequence::{delimited, terminated, tuple},
    IResult,
};
use serde::{Serialize, Serializer};
use std::fmt;

/// Saturation used for generated heat and label colors
pub const SATURATION: f64 = 0.95;
/// Lightness used for generated heat and label colors
pub const LIGHTNESS: f64 = 0.55;

/// An RGB color with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    /// Color from a packed 0xRRGGBB integer
    pub fn from_hex_value(value: u32) -> Self {
        Self::from_rgb8(
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }

    /// Color from hue, saturation and lightness, all in 0..=1. Hue wraps.
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self::new(l, l, l);
        }

        let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self::new(
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    }

    /// Hue, saturation and lightness of this color
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        if max == min {
            return (0.0, 0.0, l);
        }

        let d = max - min;
        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == self.r {
            (self.g - self.b) / d + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / d + 2.0
        } else {
            (self.r - self.g) / d + 4.0
        };
        (h / 6.0, s, l)
    }

    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        (
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        )
    }

    pub fn to_hex_string(&self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Linear blend, `t = 0` is self
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
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

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

// === Color Parsing ===

/// Parse a color string: `#rrggbb`, `#rgb`, `0xrrggbb`, `rgb(r, g, b)`,
/// `hsl(h, s%, l%)` or a named color
pub fn parse_color(color_str: &str) -> Option<Color> {
    let color_str = color_str.trim();

    if let Some(hex) = color_str.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    if let Some(hex) = color_str
        .strip_prefix("0x")
        .or_else(|| color_str.strip_prefix("0X"))
    {
        return parse_hex_color(hex);
    }
    if let Ok((_, color)) = functional_color(color_str) {
        return Some(color);
    }

    named_color(&color_str.to_lowercase())
}

/// Parse hex digits (RRGGBB or RGB)
fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::from_rgb8(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(Color::from_rgb8(r, g, b))
        }
        _ => None,
    }
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// A number optionally followed by `%`; percentages come back divided by 100
fn component(input: &str) -> IResult<&str, f64> {
    let (input, value) = ws(double)(input)?;
    let (input, percent) = opt(ws(char('%')))(input)?;
    Ok((input, if percent.is_some() { value / 100.0 } else { value }))
}

fn triple(input: &str) -> IResult<&str, (f64, f64, f64)> {
    let (input, _) = ws(char('('))(input)?;
    let (input, (a, _, b, _, c)) =
        tuple((component, char(','), component, char(','), component))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, (a, b, c)))
}

/// `rgb(255, 0, 0)` or `hsl(120, 50%, 50%)`
fn functional_color(input: &str) -> IResult<&str, Color> {
    let (input, kind) = ws(alt((tag_no_case("rgb"), tag_no_case("hsl"))))(input)?;
    let (input, (a, b, c)) = terminated(triple, eof)(input)?;

    let color = if kind.eq_ignore_ascii_case("rgb") {
        Color::new(a / 255.0, b / 255.0, c / 255.0)
    } else {
        // hue in degrees; saturation and lightness as fractions (or percentages)
        Color::from_hsl(a / 360.0, b, c)
    };
    Ok((input, color))
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "white" => Color::from_rgb8(255, 255, 255),
        "black" => Color::from_rgb8(0, 0, 0),
        "red" => Color::from_rgb8(255, 0, 0),
        "green" => Color::from_rgb8(0, 128, 0),
        "blue" => Color::from_rgb8(0, 0, 255),
        "yellow" => Color::from_rgb8(255, 255, 0),
        "cyan" => Color::from_rgb8(0, 255, 255),
        "magenta" => Color::from_rgb8(255, 0, 255),
        "orange" => Color::from_rgb8(255, 165, 0),
        "purple" => Color::from_rgb8(128, 0, 128),
        "pink" => Color::from_rgb8(255, 192, 203),
        "brown" => Color::from_rgb8(139, 69, 19),
        "gray" | "grey" => Color::from_rgb8(128, 128, 128),
        _ => return None,
    };
    Some(color)
}

/// True if the text is written in one of the explicit color notations
/// (named colors excluded, they read as labels)
pub fn is_color_notation(value: &str) -> bool {
    let value = value.trim();
    let has_prefix = value.starts_with('#')
        || value.starts_with("0x")
        || value.starts_with("0X")
        || value.to_lowercase().starts_with("rgb")
        || value.to_lowercase().starts_with("hsl");
    has_prefix && parse_color(value).is_some()
}

/// Heat color for `t` in 0..=1: 1 is hot (red), 0 is cold (blue-purple)
pub fn heat_color(t: f64, hue_offset: f64) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    Color::from_hsl((1.0 - t) * 0.65 + hue_offset, SATURATION, LIGHTNESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_color("#FF0000"), Some(Color::from_rgb8(255, 0, 0)));
        assert_eq!(parse_color("#00ff00"), Some(Color::from_rgb8(0, 255, 0)));
        assert_eq!(parse_color("#F00"), Some(Color::from_rgb8(255, 0, 0)));
        assert_eq!(parse_color("0x0000ff"), Some(Color::from_rgb8(0, 0, 255)));
        assert_eq!(parse_color("#GG0000"), None);
        assert_eq!(parse_color("#ff00"), None);
    }

    #[test]
    fn test_parse_rgb_and_hsl() {
        assert_eq!(parse_color("rgb(255, 0, 0)"), Some(Color::from_rgb8(255, 0, 0)));
        assert_eq!(parse_color("RGB(0,128,0)"), Some(Color::from_rgb8(0, 128, 0)));
        let green = parse_color("hsl(120, 100%, 50%)").unwrap();
        assert_eq!(green.to_rgb8(), (0, 255, 0));
        assert_eq!(parse_color("rgb(1, 2)"), None);
        assert_eq!(parse_color("rgb(1, 2, 3) trailing"), None);
    }

    #[test]
    fn test_parse_named_color() {
        assert_eq!(parse_color("White"), Some(Color::WHITE));
        assert_eq!(parse_color("setosa"), None);
    }

    #[test]
    fn test_hsl_round_trip() {
        let c = Color::from_rgb8(200, 40, 90);
        let (h, s, l) = c.to_hsl();
        let back = Color::from_hsl(h, s, l);
        assert_eq!(back.to_rgb8(), (200, 40, 90));
    }

    #[test]
    fn test_hue_wraps() {
        assert_eq!(Color::from_hsl(1.25, 1.0, 0.5), Color::from_hsl(0.25, 1.0, 0.5));
    }

    #[test]
    fn test_heat_color_endpoints() {
        let (hot, _, _) = heat_color(1.0, 0.0).to_hsl();
        let (cold, s, l) = heat_color(0.0, 0.0).to_hsl();
        assert_abs_diff_eq!(hot, 0.0, epsilon = 1e-2);
        assert_abs_diff_eq!(cold, 0.65, epsilon = 1e-2);
        assert_abs_diff_eq!(s, SATURATION, epsilon = 1e-2);
        assert_abs_diff_eq!(l, LIGHTNESS, epsilon = 1e-2);
    }

    #[test]
    fn test_color_notation() {
        assert!(is_color_notation("#abc"));
        assert!(is_color_notation("rgb(1,2,3)"));
        assert!(!is_color_notation("red"));
        assert!(!is_color_notation("#nothex"));
        assert!(!is_color_notation("12"));
    }

    #[test]
    fn test_serialize_as_hex() {
        let json = serde_json::to_string(&Color::from_rgb8(255, 128, 0)).unwrap();
        assert_eq!(json, "\"#ff8000\"");
    }
}
