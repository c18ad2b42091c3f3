//! Text grammars for tile planes.
//!
//! The viewer moves tile planes around as strings, so each grammar must
//! be a total inverse of its own parse on valid tiles: for any plane,
//! `parse(serialize(p)) == p`.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

// ── TileSerializer ───────────────────────────────────────────────

/// A reversible text encoding for a single tile plane.
///
/// Rows are separated by newlines. `parse` returns the flat row-major
/// samples together with the row width, and guarantees a non-empty
/// plane with uniform row lengths.
pub trait TileSerializer {
    /// Render one plane as text.
    fn serialize(&self, samples: &[i32], width: usize) -> String;

    /// Parse one plane; returns `(samples, width)`.
    fn parse(&self, text: &str) -> Result<(Vec<i32>, usize), CodecError>;
}

/// The serializer the viewer panels render with.
pub fn default_serializer() -> &'static dyn TileSerializer {
    &IntegerSerializer
}

// ── IntegerSerializer ────────────────────────────────────────────

/// Decimal signed integers, samples separated by spaces or commas.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerSerializer;

impl TileSerializer for IntegerSerializer {
    fn serialize(&self, samples: &[i32], width: usize) -> String {
        rows(samples, width)
            .map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse(&self, text: &str) -> Result<(Vec<i32>, usize), CodecError> {
        parse_rows(text, |token| {
            token
                .parse::<i32>()
                .map_err(|_| CodecError::Format(format!("invalid integer sample '{token}'")))
        })
    }
}

// ── HexSerializer ────────────────────────────────────────────────

/// Eight hex digits (four byte pairs) per sample, two's complement.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexSerializer;

impl TileSerializer for HexSerializer {
    fn serialize(&self, samples: &[i32], width: usize) -> String {
        rows(samples, width)
            .map(|row| {
                row.iter()
                    .map(|&v| format!("{:08x}", v as u32))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parse(&self, text: &str) -> Result<(Vec<i32>, usize), CodecError> {
        parse_rows(text, |token| {
            if token.len() != 8 {
                return Err(CodecError::Format(format!(
                    "hex sample '{token}' must be 8 digits"
                )));
            }
            u32::from_str_radix(token, 16)
                .map(|v| v as i32)
                .map_err(|_| CodecError::Format(format!("invalid hex sample '{token}'")))
        })
    }
}

// ── Shared row parsing ───────────────────────────────────────────

fn rows(samples: &[i32], width: usize) -> impl Iterator<Item = &[i32]> {
    samples.chunks(width.max(1))
}

fn parse_rows(
    text: &str,
    parse_token: impl Fn(&str) -> Result<i32, CodecError>,
) -> Result<(Vec<i32>, usize), CodecError> {
    let mut samples = Vec::new();
    let mut width = 0usize;

    for line in text.lines() {
        let tokens: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            continue;
        }
        if width == 0 {
            width = tokens.len();
        } else if tokens.len() != width {
            return Err(CodecError::Format(format!(
                "ragged row: {} samples, expected {width}",
                tokens.len()
            )));
        }
        for token in tokens {
            samples.push(parse_token(token)?);
        }
    }

    if samples.is_empty() {
        return Err(CodecError::Format("empty plane".into()));
    }
    Ok((samples, width))
}

// ── DataFormat ───────────────────────────────────────────────────

/// Wire-level sample format selector carried in requests.
///
/// The fixed-point variants parse with the integer grammar and then
/// normalise by an arithmetic right shift of the fractional width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataFormat {
    #[default]
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "hex")]
    Hex,
    #[serde(rename = "fixedpoint-11.5")]
    FixedPoint11_5,
    #[serde(rename = "fixedpoint-12.4")]
    FixedPoint12_4,
}

impl DataFormat {
    /// Fractional bits shifted away after parsing.
    pub fn shift(self) -> u32 {
        match self {
            DataFormat::Integer | DataFormat::Hex => 0,
            DataFormat::FixedPoint11_5 => 5,
            DataFormat::FixedPoint12_4 => 4,
        }
    }

    /// The serializer that reads this format's plane text.
    pub fn serializer(self) -> &'static dyn TileSerializer {
        match self {
            DataFormat::Hex => &HexSerializer,
            _ => &IntegerSerializer,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
