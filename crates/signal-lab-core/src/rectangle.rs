//! # Rectangle
//!
//! An immutable value object with validated dimensions.
//!
//! Construction runs three checks, each over both inputs before the next
//! starts: both are integers, then both are strictly positive, then both fit
//! in 32 bits. Within a check `length` goes first. Once built, a rectangle
//! never changes.
//!
//! Traversal is exposed through [`Rectangle::iter`], which hands out a fresh
//! [`Dimensions`] cursor every time. The cursor borrows the rectangle and owns
//! its own position, so any number of traversals may run side by side (or on
//! different threads) without seeing each other's progress.

use crate::error::{Dimension, InvalidDimension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::iter::FusedIterator;
use std::num::NonZeroU32;

/// Length used when a caller does not supply one.
pub const DEFAULT_LENGTH: i64 = 10;

/// Width used when a caller does not supply one.
pub const DEFAULT_WIDTH: i64 = 5;

// =============================================================================
// RECTANGLE
// =============================================================================

/// A rectangle with strictly positive integer sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    length: NonZeroU32,
    width: NonZeroU32,
}

impl Rectangle {
    /// Build a rectangle from integer dimensions.
    pub fn new(length: i64, width: i64) -> Result<Self, InvalidDimension> {
        Self::validate(
            Integral::from_int(Dimension::Length, i128::from(length)),
            Integral::from_int(Dimension::Width, i128::from(width)),
        )
    }

    /// Build a rectangle from decimal strings such as query parameters.
    ///
    /// Surrounding whitespace, a leading `+` and single underscores between
    /// digits (`1_000`) are accepted.
    pub fn parse(length: &str, width: &str) -> Result<Self, InvalidDimension> {
        let length = Integral::from_text(Dimension::Length, length)?;
        let width = Integral::from_text(Dimension::Width, width)?;
        Self::validate(length, width)
    }

    /// Build a rectangle from JSON values.
    ///
    /// Only JSON integers are accepted. Strings, booleans, `null` and every
    /// float (including `7.0`) are rejected as not being integers.
    pub fn from_json(length: &Value, width: &Value) -> Result<Self, InvalidDimension> {
        let length = Integral::from_json(Dimension::Length, length)?;
        let width = Integral::from_json(Dimension::Width, width)?;
        Self::validate(length, width)
    }

    /// Positivity for both sides, then range for both sides.
    fn validate(length: Integral, width: Integral) -> Result<Self, InvalidDimension> {
        length.check_positive()?;
        width.check_positive()?;
        Ok(Self {
            length: length.into_nonzero()?,
            width: width.into_nonzero()?,
        })
    }

    #[must_use]
    pub fn length(&self) -> u32 {
        self.length.get()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width.get()
    }

    /// `length * width`. Cannot overflow.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.length()) * u64::from(self.width())
    }

    /// `2 * (length + width)`. Cannot overflow.
    #[must_use]
    pub fn perimeter(&self) -> u64 {
        2 * (u64::from(self.length()) + u64::from(self.width()))
    }

    /// Start a new traversal over the two dimensions.
    ///
    /// Each call returns an independent cursor positioned at the start.
    #[must_use]
    pub fn iter(&self) -> Dimensions<'_> {
        Dimensions {
            rectangle: self,
            cursor: Cursor::Start,
        }
    }

    /// Collect the traversal and both measurements into one report.
    #[must_use]
    pub fn report(&self) -> RectangleReport {
        RectangleReport {
            iterable_values: self.iter().collect(),
            area: self.area(),
            perimeter: self.perimeter(),
        }
    }
}

impl<'a> IntoIterator for &'a Rectangle {
    type Item = DimensionRecord;
    type IntoIter = Dimensions<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An input that passed the integer check but not yet the sign or range
/// checks.
#[derive(Debug)]
struct Integral {
    dimension: Dimension,
    shown: String,
    positive: bool,
    /// `None` when the magnitude does not fit in `u32`.
    magnitude: Option<u32>,
}

impl Integral {
    fn from_int(dimension: Dimension, value: i128) -> Self {
        Self {
            dimension,
            shown: value.to_string(),
            positive: value > 0,
            magnitude: u32::try_from(value.unsigned_abs()).ok(),
        }
    }

    fn from_text(dimension: Dimension, raw: &str) -> Result<Self, InvalidDimension> {
        let trimmed = raw.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        if !is_digit_run(body) {
            return Err(InvalidDimension::NotInteger {
                dimension,
                input: raw.to_string(),
            });
        }

        let digits: String = body.chars().filter(|c| *c != '_').collect();
        let zero = digits.bytes().all(|b| b == b'0');
        Ok(Self {
            dimension,
            shown: trimmed.to_string(),
            positive: !negative && !zero,
            // Only digits remain, so parsing fails on overflow alone.
            magnitude: digits.parse::<u32>().ok(),
        })
    }

    fn from_json(dimension: Dimension, value: &Value) -> Result<Self, InvalidDimension> {
        let integer = match value {
            Value::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from)),
            _ => None,
        };

        integer
            .map(|v| Self::from_int(dimension, v))
            .ok_or_else(|| InvalidDimension::NotInteger {
                dimension,
                input: value.to_string(),
            })
    }

    fn check_positive(&self) -> Result<(), InvalidDimension> {
        if self.positive {
            Ok(())
        } else {
            Err(InvalidDimension::NotPositive {
                dimension: self.dimension,
                input: self.shown.clone(),
            })
        }
    }

    fn into_nonzero(self) -> Result<NonZeroU32, InvalidDimension> {
        let Self {
            dimension,
            shown,
            magnitude,
            ..
        } = self;
        magnitude
            .and_then(NonZeroU32::new)
            .ok_or(InvalidDimension::TooLarge {
                dimension,
                input: shown,
                max: u32::MAX,
            })
    }
}

/// ASCII digits, optionally grouped by single underscores (`1_000`).
fn is_digit_run(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.first().is_some_and(u8::is_ascii_digit)
        && bytes.last().is_some_and(u8::is_ascii_digit)
        && bytes.iter().all(|b| b.is_ascii_digit() || *b == b'_')
        && !s.contains("__")
}

// =============================================================================
// TRAVERSAL
// =============================================================================

/// One step of a rectangle traversal.
///
/// Serializes as a single-key object: `{"length": 7}` or `{"width": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionRecord {
    Length(u32),
    Width(u32),
}

impl DimensionRecord {
    /// Which dimension this record describes.
    #[must_use]
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Length(_) => Dimension::Length,
            Self::Width(_) => Dimension::Width,
        }
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        match self {
            Self::Length(v) | Self::Width(v) => *v,
        }
    }
}

/// Position of a traversal. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Start,
    EmittedLength,
    EmittedWidth,
    Done,
}

/// A bounded traversal over a rectangle's dimensions.
///
/// Yields `length` then `width`, then `None` forever.
#[derive(Debug, Clone)]
pub struct Dimensions<'a> {
    rectangle: &'a Rectangle,
    cursor: Cursor,
}

impl Dimensions<'_> {
    fn remaining(&self) -> usize {
        match self.cursor {
            Cursor::Start => 2,
            Cursor::EmittedLength => 1,
            Cursor::EmittedWidth | Cursor::Done => 0,
        }
    }
}

impl Iterator for Dimensions<'_> {
    type Item = DimensionRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Cursor::Start => {
                self.cursor = Cursor::EmittedLength;
                Some(DimensionRecord::Length(self.rectangle.length()))
            }
            Cursor::EmittedLength => {
                self.cursor = Cursor::EmittedWidth;
                Some(DimensionRecord::Width(self.rectangle.width()))
            }
            Cursor::EmittedWidth => {
                self.cursor = Cursor::Done;
                None
            }
            Cursor::Done => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Dimensions<'_> {}

impl FusedIterator for Dimensions<'_> {}

// =============================================================================
// REPORT
// =============================================================================

/// The traversal and measurements of a rectangle, as served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectangleReport {
    pub iterable_values: Vec<DimensionRecord>,
    pub area: u64,
    pub perimeter: u64,
}

// =============================================================================
// TESTS
// =============================================================================
