//! Packing-list backed manifest.
//!
//! # Invariants
//! - A blank pallet or box cell repeats the value of the row above.
//! - Pallets keep the order in which the packing list first mentions them.
//! - Truck ranges are inclusive; bounds compare numerically when the pallet
//!   and both bounds are numbers, as text otherwise.

use crate::manifest::{Manifest, PalletSummary};
use crate::model::scan::TruckKey;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug)]
pub enum ManifestError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read manifest: {err}"),
            Self::Parse(err) => write!(f, "cannot parse manifest: {err}"),
            Self::Invalid(message) => write!(f, "invalid manifest: {message}"),
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Shipment line: a truck and the inclusive pallet range it carries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TruckRange {
    pub truck: String,
    pub first_pallet: String,
    pub last_pallet: String,
}

/// One serial line of the packing list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackingRow {
    #[serde(default)]
    pub pallet: Option<String>,
    pub serial: String,
    #[serde(default, rename = "box")]
    pub box_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(default, rename = "truck")]
    trucks: Vec<TruckRange>,
    #[serde(default, rename = "row")]
    rows: Vec<PackingRow>,
}

#[derive(Debug, Clone, Default)]
pub struct PackingManifest {
    trucks: Vec<(TruckKey, TruckRange)>,
    pallets: Vec<PalletSummary>,
}

impl PackingManifest {
    pub fn new(trucks: Vec<TruckRange>, rows: Vec<PackingRow>) -> Result<Self, ManifestError> {
        let pallets = group_rows(rows)?;
        let trucks = trucks
            .into_iter()
            .map(|range| (TruckKey::new(&range.truck), range))
            .filter(|(key, _)| !key.as_str().is_empty())
            .collect();
        Ok(Self { trucks, pallets })
    }

    /// Parses a TOML document made of `[[truck]]` and `[[row]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, ManifestError> {
        let document: ManifestDocument = toml::from_str(content).map_err(ManifestError::Parse)?;
        Self::new(document.trucks, document.rows)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(ManifestError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Every pallet of the packing list, regardless of truck.
    pub fn pallets(&self) -> &[PalletSummary] {
        &self.pallets
    }
}

impl Manifest for PackingManifest {
    fn trucks(&self) -> Vec<TruckKey> {
        let mut seen = BTreeSet::new();
        self.trucks
            .iter()
            .filter(|(key, _)| seen.insert(key.clone()))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn truck_pallets(&self, truck: &TruckKey) -> Vec<PalletSummary> {
        let Some((_, range)) = self.trucks.iter().find(|(key, _)| key == truck) else {
            return Vec::new();
        };
        self.pallets
            .iter()
            .filter(|pallet| in_range(&pallet.pallet, range))
            .cloned()
            .collect()
    }
}

fn group_rows(rows: Vec<PackingRow>) -> Result<Vec<PalletSummary>, ManifestError> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, (PalletSummary, BTreeSet<String>)> = HashMap::new();
    let mut current_pallet: Option<String> = None;
    let mut current_box: Option<String> = None;

    for (line, row) in rows.into_iter().enumerate() {
        if let Some(pallet) = non_blank(row.pallet) {
            current_pallet = Some(pallet);
        }
        if let Some(box_number) = non_blank(row.box_number) {
            current_box = Some(box_number);
        }
        let pallet = current_pallet.clone().ok_or_else(|| {
            ManifestError::Invalid(format!("row {} has no pallet number to inherit", line + 1))
        })?;
        let serial = row.serial.trim().to_string();
        if serial.is_empty() {
            return Err(ManifestError::Invalid(format!(
                "row {} has an empty serial",
                line + 1
            )));
        }

        let (summary, boxes) = grouped.entry(pallet.clone()).or_insert_with(|| {
            order.push(pallet.clone());
            (
                PalletSummary {
                    pallet: pallet.clone(),
                    first_serial: serial.clone(),
                    last_serial: serial.clone(),
                    box_count: 0,
                },
                BTreeSet::new(),
            )
        });
        summary.last_serial = serial;
        if let Some(box_number) = &current_box {
            boxes.insert(box_number.clone());
        }
        summary.box_count = boxes.len();
    }

    Ok(order
        .into_iter()
        .filter_map(|pallet| grouped.remove(&pallet).map(|(summary, _)| summary))
        .collect())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn in_range(pallet: &str, range: &TruckRange) -> bool {
    let first = range.first_pallet.trim();
    let last = range.last_pallet.trim();
    match (
        pallet.parse::<f64>(),
        first.parse::<f64>(),
        last.parse::<f64>(),
    ) {
        (Ok(value), Ok(low), Ok(high)) => low <= value && value <= high,
        _ => first <= pallet && pallet <= last,
    }
}
