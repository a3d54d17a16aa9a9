//! Lanes, slots and slot positions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static SLOT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^C(\d+)-(\d+)$").expect("valid slot id regex"));

/// Physical truck-loading line. Always positive.
pub type Lane = u32;

/// Number of pallets one slot can hold.
pub const SLOT_CAPACITY: usize = 2;

/// Location inside a lane, rendered as `C<lane>-<index>`.
///
/// Ordering is by lane, then index, which is also the rendering order used by
/// layout consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotId {
    pub lane: Lane,
    pub index: u32,
}

impl SlotId {
    pub fn new(lane: Lane, index: u32) -> Self {
        Self { lane, index }
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}-{}", self.lane, self.index)
    }
}

/// Rejected slot identifier text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotIdParseError(pub String);

impl Display for SlotIdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid slot id `{}`; expected C<lane>-<index>", self.0)
    }
}

impl Error for SlotIdParseError {}

impl FromStr for SlotId {
    type Err = SlotIdParseError;

    /// Accepts `C<lane>-<index>` with both numbers positive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || SlotIdParseError(trimmed.to_string());
        let caps = SLOT_ID_RE.captures(trimmed).ok_or_else(invalid)?;
        let lane: Lane = caps[1].parse().map_err(|_| invalid())?;
        let index: u32 = caps[2].parse().map_err(|_| invalid())?;
        if lane == 0 || index == 0 {
            return Err(invalid());
        }
        Ok(Self { lane, index })
    }
}

impl TryFrom<String> for SlotId {
    type Error = SlotIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotId> for String {
    fn from(value: SlotId) -> Self {
        value.to_string()
    }
}

/// One of the two pallet places inside a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SlotPosition {
    First,
    Second,
}

impl SlotPosition {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            _ => None,
        }
    }
}

impl Display for SlotPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl From<SlotPosition> for u8 {
    fn from(value: SlotPosition) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for SlotPosition {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("slot position must be 1 or 2, got {value}"))
    }
}
