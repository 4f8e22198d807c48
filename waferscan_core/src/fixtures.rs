//! Fixture catalog: the fixed wafer/defect records the simulation cycles over.
//!
//! Fixtures stand in for real sensor input. They are defined once at process
//! start, never mutated, and referenced by wafer id. Lookups degrade to safe
//! defaults instead of failing: an out-of-range wafer id resolves to the
//! first fixture, and unrecognized category/severity codes deserialize to an
//! explicit `Unknown` variant with its own display label and color.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Defect classification assigned by the (simulated) inspection step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectCategory {
    Particle,
    Scratch,
    Residue,
    Bridging,
    Misalignment,
    EtchResidue,
    /// Fallback for codes outside the fixed set. Renders with a default label.
    #[serde(other)]
    Unknown,
}

impl DefectCategory {
    /// Display label for the summary panel and defect table.
    pub fn label(&self) -> &'static str {
        match self {
            DefectCategory::Particle => "particle",
            DefectCategory::Scratch => "scratch",
            DefectCategory::Residue => "residue",
            DefectCategory::Bridging => "bridging",
            DefectCategory::Misalignment => "misalignment",
            DefectCategory::EtchResidue => "etch_residue",
            DefectCategory::Unknown => "unknown",
        }
    }
}

/// Ordinal defect priority used for marker color and emphasis selection.
///
/// Variants are declared lowest-first so the derived `Ord` ranks
/// `Critical > High > Medium > Low > Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fallback for codes outside the fixed set. Renders gray.
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

// Manual impl because `#[serde(other)]` must sit on the last variant, while
// `Unknown` must stay first so the derived `Ord` ranks it lowest.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Ok(match code.as_str() {
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Unknown,
        })
    }
}

impl Severity {
    /// Display label for the summary panel and defect table.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Unknown => "unknown",
        }
    }

    /// Marker color (RGBA) for the schematic renderer.
    pub fn color(&self) -> [u8; 4] {
        match self {
            Severity::Critical => [239, 68, 68, 255], // Red
            Severity::High => [249, 115, 22, 255],    // Orange
            Severity::Medium => [245, 158, 11, 255],  // Amber
            Severity::Low => [250, 204, 21, 255],     // Yellow
            Severity::Unknown => [148, 163, 184, 255], // Gray fallback
        }
    }
}

/// A single defect descriptor within a wafer fixture.
///
/// Coordinates are fixture-relative pixel positions inside the wafer drawing
/// area (0..2R on each axis); `size_um` is the display radius labeled "um".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefectRecord {
    pub x: f64,
    pub y: f64,
    pub category: DefectCategory,
    pub severity: Severity,
    pub size_um: f64,
}

impl DefectRecord {
    pub fn new(x: f64, y: f64, category: DefectCategory, severity: Severity, size_um: f64) -> Self {
        Self {
            x,
            y,
            category,
            severity,
            size_um,
        }
    }
}

/// A predefined, immutable wafer record used in place of real sensor input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaferFixture {
    /// Wafer identifier, 1..=N.
    pub id: u32,
    /// Defects revealed when a scan of this wafer completes.
    pub defects: Vec<DefectRecord>,
}

/// Errors loading a custom fixture catalog.
///
/// The built-in catalog never errors; these cover the file/parse seam only.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse fixture catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("fixture catalog is empty")]
    Empty,
}

/// Fixed, ordered collection of wafer fixtures.
///
/// Guaranteed non-empty by construction, which is what lets [`get`] fall
/// back to the first fixture instead of failing.
///
/// [`get`]: FixtureCatalog::get
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureCatalog {
    wafers: Vec<WaferFixture>,
}

impl FixtureCatalog {
    /// Creates a catalog from explicit fixtures. Fails only when empty.
    pub fn new(wafers: Vec<WaferFixture>) -> Result<Self, CatalogError> {
        if wafers.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { wafers })
    }

    /// The canned catalog the dashboard ships with.
    ///
    /// Wafer 1 carries severities [high, medium, low] and wafer 2
    /// [critical, medium]; the yield-rate tests key off these.
    pub fn builtin() -> Self {
        use DefectCategory::*;
        use Severity::*;

        Self {
            wafers: vec![
                WaferFixture {
                    id: 1,
                    defects: vec![
                        DefectRecord::new(120.0, 90.0, Particle, High, 8.0),
                        DefectRecord::new(190.0, 160.0, Scratch, Medium, 12.0),
                        DefectRecord::new(80.0, 210.0, Residue, Low, 6.0),
                    ],
                },
                WaferFixture {
                    id: 2,
                    defects: vec![
                        DefectRecord::new(150.0, 140.0, Bridging, Critical, 10.0),
                        DefectRecord::new(220.0, 200.0, Misalignment, Medium, 7.0),
                    ],
                },
                WaferFixture {
                    id: 3,
                    defects: vec![
                        DefectRecord::new(100.0, 100.0, EtchResidue, Medium, 9.0),
                        DefectRecord::new(170.0, 60.0, Particle, Low, 5.0),
                        DefectRecord::new(210.0, 180.0, Scratch, High, 11.0),
                        DefectRecord::new(60.0, 150.0, Residue, Low, 4.0),
                    ],
                },
                WaferFixture {
                    id: 4,
                    defects: vec![DefectRecord::new(140.0, 230.0, Particle, Critical, 14.0)],
                },
            ],
        }
    }

    /// Loads a custom catalog from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path)?;
        let catalog: FixtureCatalog = serde_json::from_str(&data)?;
        if catalog.wafers.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    /// Number of wafers in the catalog.
    pub fn len(&self) -> usize {
        self.wafers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wafers.is_empty()
    }

    /// All wafers, in catalog order.
    pub fn wafers(&self) -> &[WaferFixture] {
        &self.wafers
    }

    /// Looks up a wafer by id, falling back to the first fixture when the id
    /// is outside the catalog range. Defined degradation, not an error.
    pub fn get(&self, id: u32) -> &WaferFixture {
        self.wafers
            .iter()
            .find(|w| w.id == id)
            .unwrap_or(&self.wafers[0])
    }

    /// The wafer id that follows `id`, wrapping back to the first wafer
    /// after the last: `(id mod N) + 1`.
    pub fn next_id(&self, id: u32) -> u32 {
        (id % self.wafers.len() as u32) + 1
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
