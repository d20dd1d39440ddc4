use std::cmp::Ordering;

use serde::Serialize;

use crate::analysis::bbox::Bbox;

/// How one annotation overlaps another one of a given class.
///
/// Entries are directional: `self` is the record owning the entry and
/// `other` is the record at `index` in the class list the entry is filed
/// under.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Overlap {
    /// Index of the other record within its image+class list.
    pub index: usize,
    /// This box lies entirely within the other box.
    pub self_inside_other: bool,
    /// This box's center lies within the other box.
    pub center_of_self: bool,
    /// The other box lies entirely within this box.
    pub other_inside_self: bool,
    /// The other box's center lies within this box.
    pub center_of_other: bool,
    pub intersection: f64,
    pub iou: f64,
    pub iom: f64,
}

impl Overlap {
    /// Measures `this` against `other`, returning `None` when the boxes do
    /// not intersect with positive area.
    pub fn between(this: &Bbox, other: &Bbox, index: usize) -> Option<Self> {
        let intersection = this.intersection(other);
        if intersection <= 0.0 {
            return None;
        }

        Some(Self {
            index,
            self_inside_other: other.contains(this),
            center_of_self: other.contains_center(this),
            other_inside_self: this.contains(other),
            center_of_other: this.contains_center(other),
            intersection,
            iou: this.iou(other),
            iom: this.iom(other),
        })
    }
}

/// Return a copy sorted by IoU, largest first.
///
/// The sort is stable, so entries with equal IoU keep their input order.
pub fn sort_iou<'a>(overlaps: impl IntoIterator<Item = &'a Overlap>) -> Vec<Overlap> {
    let mut sorted: Vec<Overlap> = overlaps.into_iter().copied().collect();
    sorted.sort_by(|a, b| b.iou.partial_cmp(&a.iou).unwrap_or(Ordering::Equal));
    sorted
}

/// Return a copy sorted for parent selection: fully inside first, then
/// center inside, then by IoM, largest first.
///
/// The sort is stable, so ties keep their input order.
pub fn sort_for_parent<'a>(overlaps: impl IntoIterator<Item = &'a Overlap>) -> Vec<Overlap> {
    let mut sorted: Vec<Overlap> = overlaps.into_iter().copied().collect();
    sorted.sort_by(|a, b| {
        b.self_inside_other
            .cmp(&a.self_inside_other)
            .then(b.center_of_self.cmp(&a.center_of_self))
            .then(b.iom.partial_cmp(&a.iom).unwrap_or(Ordering::Equal))
    });
    sorted
}
