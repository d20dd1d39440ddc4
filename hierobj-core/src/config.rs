use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::consts::DUPLICATE_IOU_THRESHOLD;

/// Rule used to pick one parent when several candidates qualify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The candidate registered first (lowest index) wins.
    #[default]
    FirstRegistered,
    /// Candidates are ranked by containment, center containment and IoM;
    /// the best ranked wins, registry order breaking exact ties.
    BestOverlap,
    /// A parent is only assigned when exactly one candidate qualifies.
    Unambiguous,
}

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct HierarchyConfig {
    /// IoU above which two same-class annotations are duplicates.
    pub duplicate_iou_threshold: f64,
    pub tie_break: TieBreak,
    /// Leave duplicate children unassigned and never pick a duplicate parent.
    pub skip_duplicates: bool,
    /// Include per-class overlap lists when serializing records.
    pub overlap_info: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            duplicate_iou_threshold: DUPLICATE_IOU_THRESHOLD,
            tie_break: TieBreak::default(),
            skip_duplicates: false,
            overlap_info: true,
        }
    }
}
