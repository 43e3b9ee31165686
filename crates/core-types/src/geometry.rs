use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Axis-aligned rectangle in image-pixel coordinates.
///
/// Ordering is canonical (`y`, then `x`, then size) so that sets of
/// rectangles iterate top-to-bottom, left-to-right regardless of how they
/// were collected.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Intersects the rectangle with `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the rectangle is left inside the bounds.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let left = i64::from(self.x).max(0);
        let top = i64::from(self.y).max(0);
        let right = (i64::from(self.x) + i64::from(self.width)).min(i64::from(width));
        let bottom = (i64::from(self.y) + i64::from(self.height)).min(i64::from(height));
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    fn sort_key(&self) -> (i32, i32, u32, u32) {
        (self.y, self.x, self.width, self.height)
    }
}

impl Ord for Rect {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Rect {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Rect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts.as_slice() else {
            return Err(CoreError::InvalidRect(format!(
                "expected x,y,width,height but got '{s}'"
            )));
        };
        let int = |v: &str| {
            v.parse::<u32>()
                .map_err(|err| CoreError::InvalidRect(format!("'{v}': {err}")))
        };
        let x = i32::try_from(int(x)?).map_err(|err| CoreError::InvalidRect(err.to_string()))?;
        let y = i32::try_from(int(y)?).map_err(|err| CoreError::InvalidRect(err.to_string()))?;
        Ok(Rect::new(x, y, int(w)?, int(h)?))
    }
}

/// Where an ignored rectangle came from.
#[cfg_attr(
    feature = "serde-full",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum IgnoreStrategy {
    /// Bounds of resolved UI elements.
    Element,
    /// Raw regions declared by the caller.
    Area,
}

impl IgnoreStrategy {
    /// Fixed processing order; element ignores are always masked first.
    pub const ORDERED: [IgnoreStrategy; 2] = [IgnoreStrategy::Element, IgnoreStrategy::Area];

    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreStrategy::Element => "ELEMENT",
            IgnoreStrategy::Area => "AREA",
        }
    }
}

impl fmt::Display for IgnoreStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangles to erase before diffing, grouped by origin.
pub type IgnoreMap = BTreeMap<IgnoreStrategy, BTreeSet<Rect>>;
