// ── Link domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Confidence of a link derived from neighbor discovery.
pub const DISCOVERY_CONFIDENCE: f64 = 0.9;

/// Confidence of a link derived from an active PPP session.
pub const SESSION_CONFIDENCE: f64 = 1.0;

/// Link classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkKind {
    /// Wired connection between two known routers.
    Backbone,
    /// Point-to-point wireless.
    Ptp,
    /// Point-to-multipoint wireless.
    Ptmp,
    /// PPPoE session terminated on the source router.
    Pppoe,
    Unknown,
}

impl LinkKind {
    /// Preference when the two ends of one pair classify it differently.
    /// A station facing an ap-bridge is part of a multipoint sector.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Ptmp => 3,
            Self::Ptp => 2,
            Self::Backbone => 1,
            Self::Pppoe | Self::Unknown => 0,
        }
    }
}

/// An inferred relationship between two routers (or a router and a PPP
/// user). Regenerated on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Identity of the source router.
    pub source_device: String,
    /// Management address of the source router.
    pub source_address: String,
    pub source_interface: String,
    /// Identity of the peer router, or the PPP username for session links.
    pub destination_device: String,
    pub destination_address: Option<String>,
    pub destination_interface: Option<String>,
    pub kind: LinkKind,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub evidence: String,
}
