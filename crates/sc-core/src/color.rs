//! RGBA colors and the color-string parser.
//!
//! Accepts the forms a properties panel or color picker hands us:
//! `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
//! `rgba(r, g, b, a)` and the names `black`, `white`, `transparent`.
//! Built on `winnow` 0.7.

use crate::error::SceneError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use winnow::ascii::{digit1, space0};
use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// 8-bit RGBA color. Equality is exact, which the theme remap relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a user-supplied color string.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidColor`] if the string is not one of the
    /// accepted forms.
    pub fn parse(input: &str) -> Result<Self, SceneError> {
        let lowered = input.trim().to_ascii_lowercase();
        let mut rest = lowered.as_str();
        match parse_color.parse_next(&mut rest) {
            Ok(color) if rest.trim().is_empty() => Ok(color),
            _ => Err(SceneError::InvalidColor(input.to_string())),
        }
    }

    /// Parse hex digits (`rgb`, `rgba`, `rrggbb`, `rrggbbaa`), `#` optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let nibble = |i: usize| hex_val(bytes[i]);
        let byte = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        match bytes.len() {
            3 => Some(Self::rgb(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            4 => Some(Self::rgba(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
                nibble(3)? * 17,
            )),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Lowercase `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ─── Parsers ─────────────────────────────────────────────────────────────

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

fn parse_color(input: &mut &str) -> ModalResult<Color> {
    alt((parse_hex_color, parse_functional_color, parse_named_color)).parse_next(input)
}

fn parse_hex_color(input: &mut &str) -> ModalResult<Color> {
    let _ = '#'.parse_next(input)?;
    let digits: &str = take_while(3..=8, |c: char| c.is_ascii_hexdigit()).parse_next(input)?;
    Color::from_hex(digits).ok_or_else(backtrack)
}

fn parse_named_color(input: &mut &str) -> ModalResult<Color> {
    alt((
        "black".value(Color::BLACK),
        "white".value(Color::WHITE),
        "transparent".value(Color::TRANSPARENT),
    ))
    .parse_next(input)
}

/// `rgb(r, g, b)` or `rgba(r, g, b, a)` with `a` in `[0, 1]`.
fn parse_functional_color(input: &mut &str) -> ModalResult<Color> {
    let name: &str = alt(("rgba", "rgb")).parse_next(input)?;
    skip_space(input);
    let _ = '('.parse_next(input)?;
    skip_space(input);
    let r = parse_channel(input)?;
    parse_separator(input)?;
    let g = parse_channel(input)?;
    parse_separator(input)?;
    let b = parse_channel(input)?;
    let a = if name == "rgba" {
        parse_separator(input)?;
        parse_alpha(input)?
    } else {
        255
    };
    skip_space(input);
    let _ = ')'.parse_next(input)?;
    Ok(Color::rgba(r, g, b, a))
}

fn parse_channel(input: &mut &str) -> ModalResult<u8> {
    let digits: &str = digit1.parse_next(input)?;
    digits
        .parse::<u16>()
        .ok()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(backtrack)
}

fn parse_alpha(input: &mut &str) -> ModalResult<u8> {
    let digits: &str =
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.').parse_next(input)?;
    let value: f32 = digits.parse().map_err(|_| backtrack())?;
    if !(0.0..=1.0).contains(&value) {
        return Err(backtrack());
    }
    Ok((value * 255.0).round() as u8)
}

fn parse_separator(input: &mut &str) -> ModalResult<()> {
    skip_space(input);
    let _ = ','.parse_next(input)?;
    skip_space(input);
    Ok(())
}

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    let _: Result<&str, ErrMode<ContextError>> = space0.parse_next(input);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::parse("#000").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("#000000").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("#FFFFFF").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("#ff000080").unwrap(), Color::rgba(255, 0, 0, 128));
        assert_eq!(Color::parse("#f008").unwrap(), Color::rgba(255, 0, 0, 136));
    }

    #[test]
    fn parses_functional_forms() {
        assert_eq!(
            Color::parse("rgb(34, 34, 34)").unwrap(),
            Color::rgb(34, 34, 34)
        );
        assert_eq!(
            Color::parse("RGBA(255,0,0,0.5)").unwrap(),
            Color::rgba(255, 0, 0, 128)
        );
    }

    #[test]
    fn parses_names() {
        assert_eq!(Color::parse(" White ").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("transparent").unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "#12", "#12345", "#gggggg", "rgb(1,2)", "rgb(256,0,0)", "red", "#fff trailing"] {
            assert!(
                matches!(Color::parse(bad), Err(SceneError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn hex_output_is_lowercase() {
        assert_eq!(Color::rgb(0x6C, 0x5C, 0xE7).to_hex(), "#6c5ce7");
        assert_eq!(Color::rgba(255, 0, 0, 128).to_hex(), "#ff000080");
    }
}
