use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow stage of a deal (M01..M25)
///
/// The declaration order is the canonical progression order and is what every
/// stage selection control lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageCode {
    M01, M02, M03, M04, M05,
    M06, M07, M08, M09, M10,
    M11, M12, M13, M14, M15,
    M16, M17, M18, M19, M20,
    M21, M22, M23, M24, M25,
}

/// Font weight used when a stage label is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weight {
    Normal,
    Bold,
}

/// Display styling for a stage
///
/// `color` is a terminal color name (see `cli::output`), `hex` is the fill used
/// in SVG charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageStyle {
    pub color: &'static str,
    pub hex: &'static str,
    pub weight: Weight,
}

const NEUTRAL_STYLE: StageStyle = StageStyle { color: "bright_black", hex: "#9ca3af", weight: Weight::Normal };

/// Business phase a stage belongs to; drives the factory/logistics views
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePhase {
    Sales,
    Contract,
    Factory,
    Settlement,
    Logistics,
    Closed,
}

impl StagePhase {
    pub const ALL: [StagePhase; 6] = [
        StagePhase::Sales,
        StagePhase::Contract,
        StagePhase::Factory,
        StagePhase::Settlement,
        StagePhase::Logistics,
        StagePhase::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StagePhase::Sales => "sales",
            StagePhase::Contract => "contract",
            StagePhase::Factory => "factory",
            StagePhase::Settlement => "settlement",
            StagePhase::Logistics => "logistics",
            StagePhase::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" => Some(StagePhase::Sales),
            "contract" => Some(StagePhase::Contract),
            "factory" => Some(StagePhase::Factory),
            "settlement" => Some(StagePhase::Settlement),
            "logistics" => Some(StagePhase::Logistics),
            "closed" => Some(StagePhase::Closed),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StagePhase::Sales => "Sales",
            StagePhase::Contract => "Contract",
            StagePhase::Factory => "Factory",
            StagePhase::Settlement => "Settlement",
            StagePhase::Logistics => "Logistics",
            StagePhase::Closed => "Closed",
        }
    }

    /// Stages of this phase in canonical order
    pub fn stages(&self) -> Vec<StageCode> {
        StageCode::ALL.iter().copied().filter(|s| s.phase() == *self).collect()
    }
}

impl StageCode {
    pub const ALL: [StageCode; 25] = [
        StageCode::M01, StageCode::M02, StageCode::M03, StageCode::M04, StageCode::M05,
        StageCode::M06, StageCode::M07, StageCode::M08, StageCode::M09, StageCode::M10,
        StageCode::M11, StageCode::M12, StageCode::M13, StageCode::M14, StageCode::M15,
        StageCode::M16, StageCode::M17, StageCode::M18, StageCode::M19, StageCode::M20,
        StageCode::M21, StageCode::M22, StageCode::M23, StageCode::M24, StageCode::M25,
    ];

    pub const INITIAL: StageCode = StageCode::M01;

    /// 1-based position in the canonical progression
    pub fn ordinal(&self) -> usize {
        *self as usize + 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageCode::M01 => "M01", StageCode::M02 => "M02", StageCode::M03 => "M03",
            StageCode::M04 => "M04", StageCode::M05 => "M05", StageCode::M06 => "M06",
            StageCode::M07 => "M07", StageCode::M08 => "M08", StageCode::M09 => "M09",
            StageCode::M10 => "M10", StageCode::M11 => "M11", StageCode::M12 => "M12",
            StageCode::M13 => "M13", StageCode::M14 => "M14", StageCode::M15 => "M15",
            StageCode::M16 => "M16", StageCode::M17 => "M17", StageCode::M18 => "M18",
            StageCode::M19 => "M19", StageCode::M20 => "M20", StageCode::M21 => "M21",
            StageCode::M22 => "M22", StageCode::M23 => "M23", StageCode::M24 => "M24",
            StageCode::M25 => "M25",
        }
    }

    /// Parse a stage code such as "M07" or "m7"
    pub fn from_code(s: &str) -> Option<Self> {
        let s = s.trim();
        let digits = s.strip_prefix('M').or_else(|| s.strip_prefix('m'))?;
        if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let n: usize = digits.parse().ok()?;
        if (1..=Self::ALL.len()).contains(&n) {
            Some(Self::ALL[n - 1])
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageCode::M01 => "Inquiry received",
            StageCode::M02 => "Specification review",
            StageCode::M03 => "Sample requested",
            StageCode::M04 => "Sample in production",
            StageCode::M05 => "Sample shipped",
            StageCode::M06 => "Sample approved",
            StageCode::M07 => "Quote requested",
            StageCode::M08 => "Quote sent",
            StageCode::M09 => "Quote accepted",
            StageCode::M10 => "Purchase order received",
            StageCode::M11 => "Deposit invoiced",
            StageCode::M12 => "Deposit received",
            StageCode::M13 => "Artwork preparation",
            StageCode::M14 => "Artwork approved",
            StageCode::M15 => "Production scheduled",
            StageCode::M16 => "In production",
            StageCode::M17 => "Quality inspection",
            StageCode::M18 => "Production complete",
            StageCode::M19 => "Balance invoiced",
            StageCode::M20 => "Balance received",
            StageCode::M21 => "Shipment booked",
            StageCode::M22 => "In transit",
            StageCode::M23 => "Customs clearance",
            StageCode::M24 => "Delivered",
            StageCode::M25 => "Closed",
        }
    }

    pub fn phase(&self) -> StagePhase {
        match self.ordinal() {
            1..=9 => StagePhase::Sales,
            10..=14 => StagePhase::Contract,
            15..=18 => StagePhase::Factory,
            19..=20 => StagePhase::Settlement,
            21..=24 => StagePhase::Logistics,
            _ => StagePhase::Closed,
        }
    }

    pub fn style(&self) -> StageStyle {
        // Milestones that move money or goods are bold
        let weight = match self {
            StageCode::M09 | StageCode::M10 | StageCode::M12 | StageCode::M18
            | StageCode::M20 | StageCode::M24 | StageCode::M25 => Weight::Bold,
            _ => Weight::Normal,
        };
        let (color, hex) = match self.phase() {
            StagePhase::Sales => ("blue", "#3b82f6"),
            StagePhase::Contract => ("cyan", "#06b6d4"),
            StagePhase::Factory => ("yellow", "#f59e0b"),
            StagePhase::Settlement => ("magenta", "#a855f7"),
            StagePhase::Logistics => ("green", "#22c55e"),
            StagePhase::Closed => ("bright_black", "#6b7280"),
        };
        StageStyle { color, hex, weight }
    }

    pub fn color(&self) -> &'static str {
        self.style().color
    }

    pub fn weight(&self) -> Weight {
        self.style().weight
    }
}

impl fmt::Display for StageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageCode::from_code(s).ok_or_else(|| {
            format!("Invalid stage: '{}'. Stage must be one of M01 through M25.", s)
        })
    }
}

/// Stage strings from the pre-M-code scheme: (raw value, label, closest stage)
const LEGACY_STAGES: &[(&str, &str, Option<StageCode>)] = &[
    ("new", "New inquiry", Some(StageCode::M01)),
    ("inquiry", "Inquiry", Some(StageCode::M01)),
    ("sampling", "Sampling", Some(StageCode::M04)),
    ("quoting", "Quoting", Some(StageCode::M08)),
    ("ordered", "Order confirmed", Some(StageCode::M10)),
    ("production", "In production", Some(StageCode::M16)),
    ("inspection", "Inspection", Some(StageCode::M17)),
    ("shipping", "Shipping", Some(StageCode::M22)),
    ("shipped", "Shipped", Some(StageCode::M22)),
    ("delivered", "Delivered", Some(StageCode::M24)),
    ("completed", "Completed", Some(StageCode::M25)),
    ("on_hold", "On hold", None),
    ("lost", "Lost", None),
    ("cancelled", "Cancelled", None),
];

fn legacy_entry(raw: &str) -> Option<&'static (&'static str, &'static str, Option<StageCode>)> {
    let key = raw.trim();
    LEGACY_STAGES.iter().find(|(k, _, _)| k.eq_ignore_ascii_case(key))
}

/// Stored stage value: either a canonical code or a legacy free-text string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageValue {
    Canonical(StageCode),
    Legacy(String),
}

impl StageValue {
    /// Classify a raw stored value. Never fails.
    pub fn parse(raw: &str) -> Self {
        match StageCode::from_code(raw) {
            Some(code) => StageValue::Canonical(code),
            None => StageValue::Legacy(raw.to_string()),
        }
    }

    pub fn code(&self) -> Option<StageCode> {
        match self {
            StageValue::Canonical(code) => Some(*code),
            StageValue::Legacy(_) => None,
        }
    }

    /// Raw value as persisted
    pub fn as_stored(&self) -> &str {
        match self {
            StageValue::Canonical(code) => code.as_str(),
            StageValue::Legacy(raw) => raw.as_str(),
        }
    }

    pub fn label(&self) -> String {
        resolve_label(self)
    }

    pub fn style(&self) -> StageStyle {
        match self {
            StageValue::Canonical(code) => code.style(),
            StageValue::Legacy(raw) => legacy_entry(raw)
                .and_then(|(_, _, mapped)| *mapped)
                .map(|code| code.style())
                .unwrap_or(NEUTRAL_STYLE),
        }
    }

    pub fn phase(&self) -> Option<StagePhase> {
        match self {
            StageValue::Canonical(code) => Some(code.phase()),
            StageValue::Legacy(raw) => legacy_entry(raw)
                .and_then(|(_, _, mapped)| *mapped)
                .map(|code| code.phase()),
        }
    }
}

impl From<StageCode> for StageValue {
    fn from(code: StageCode) -> Self {
        StageValue::Canonical(code)
    }
}

impl fmt::Display for StageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

/// Two-tier label lookup: canonical label, then legacy table, then the raw string
pub fn resolve_label(value: &StageValue) -> String {
    match value {
        StageValue::Canonical(code) => code.label().to_string(),
        StageValue::Legacy(raw) => {
            if let Some((_, label, _)) = legacy_entry(raw) {
                return label.to_string();
            }
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                "-".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Label for a raw stored string
pub fn label_for(raw: &str) -> String {
    resolve_label(&StageValue::parse(raw))
}
