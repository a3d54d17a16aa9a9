//! Pallet-to-slot placement.
//!
//! # Responsibility
//! - Read a pallet ordinal out of a scanned pallet code.
//! - Pair consecutive ordinals into one slot and pick a free position.
//!
//! # Invariants
//! - Pure functions: the result depends only on the arguments.
//! - A slot never receives a third pallet; a full slot is an error, not a
//!   search for another slot.

use crate::layout::catalog::LayoutCatalog;
use crate::model::scan::AssignmentIndex;
use crate::model::scan::Placement;
use crate::model::slot::{Lane, SlotId, SlotPosition, SLOT_CAPACITY};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static TRAILING_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,3})$").expect("valid trailing digits regex"));
static PREFIXED_DIGITS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:PALLET|PLT|P)[_-]?(\d{2,3})").expect("valid pallet prefix regex")
});

/// Why a pallet could not be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// No extraction rule produced an ordinal.
    UnparsablePalletCode(String),
    /// The layout has no lanes (typically: no layout loaded yet).
    NoLaneAvailable,
    /// The resolved lane has no slots.
    NoSlotAvailable { lane: Lane },
    /// The resolved slot already holds two pallets.
    SlotFull { slot: SlotId },
}

impl PlacementError {
    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnparsablePalletCode(_) => "unparsable_pallet_code",
            Self::NoLaneAvailable => "no_lane_available",
            Self::NoSlotAvailable { .. } => "no_slot_available",
            Self::SlotFull { .. } => "slot_full",
        }
    }
}

impl Display for PlacementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnparsablePalletCode(code) => {
                write!(f, "cannot read a pallet number from `{code}`")
            }
            Self::NoLaneAvailable => write!(f, "layout has no lanes; load a layout first"),
            Self::NoSlotAvailable { lane } => write!(f, "lane C{lane} has no slots"),
            Self::SlotFull { slot } => {
                write!(f, "slot {slot} already holds {SLOT_CAPACITY} pallets")
            }
        }
    }
}

impl Error for PlacementError {}

/// Extracts the pallet ordinal from a scanned pallet code.
///
/// Rules, first match wins:
/// 1. two or three digits ending the code;
/// 2. two or three digits after `PALLET`, `PLT` or `P` (any case), with an
///    optional `_`/`-` separator;
/// 3. the last three characters if all digits, else the last two, else the
///    last one.
pub fn extract_pallet_ordinal(code: &str) -> Result<u32, PlacementError> {
    let trimmed = code.trim();
    let unparsable = || PlacementError::UnparsablePalletCode(trimmed.to_string());

    if let Some(caps) = TRAILING_DIGITS_RE.captures(trimmed) {
        return caps[1].parse().map_err(|_| unparsable());
    }
    if let Some(caps) = PREFIXED_DIGITS_RE.captures(trimmed) {
        return caps[1].parse().map_err(|_| unparsable());
    }

    let chars: Vec<char> = trimmed.chars().collect();
    for width in [3usize, 2, 1] {
        if chars.len() < width {
            continue;
        }
        let tail = &chars[chars.len() - width..];
        if tail.iter().all(char::is_ascii_digit) {
            let digits: String = tail.iter().collect();
            return digits.parse().map_err(|_| unparsable());
        }
    }

    Err(unparsable())
}

/// Slot that pallet `ordinal` belongs to on `lane`.
///
/// Ordinals pair up: (1, 2) share index 1, (3, 4) index 2, and so on.
pub fn compute_slot_id(ordinal: u32, lane: Lane) -> SlotId {
    // Same as floor((ordinal - 1) / 2) + 1 without underflow at 0.
    SlotId::new(lane, ordinal.div_ceil(2))
}

/// Picks the slot and position for pallet `ordinal` on `lane`.
///
/// Falls back to the lane's first slot when the computed slot is not part of
/// the layout.
pub fn assign(
    lane: Lane,
    ordinal: u32,
    catalog: &LayoutCatalog,
    existing: &AssignmentIndex,
) -> Result<Placement, PlacementError> {
    let candidate = compute_slot_id(ordinal, lane);
    let slot = if catalog.contains(&candidate) {
        candidate
    } else {
        catalog
            .first_slot(lane)
            .ok_or(PlacementError::NoSlotAvailable { lane })?
    };

    let occupants = existing.get(&slot).map(Vec::as_slice).unwrap_or_default();
    if occupants.len() >= SLOT_CAPACITY {
        return Err(PlacementError::SlotFull { slot });
    }

    let first_taken = occupants
        .iter()
        .any(|assignment| assignment.position == SlotPosition::First);
    let position = if first_taken {
        SlotPosition::Second
    } else {
        SlotPosition::First
    };

    Ok(Placement { slot, position })
}
