use tracing::*;

use crate::{
    analysis::overlap::Overlap,
    error::HierError,
    layout::registry::{RecordKey, Registry},
};

/// Measure the record at `key` against every other record of class `label`
/// in the same image.
///
/// Only intersecting pairs produce an entry; entries come in ascending index
/// order of the other record. The record itself is skipped when `label` is
/// its own class.
pub fn compute_overlaps(
    registry: &Registry,
    key: &RecordKey,
    label: &str,
) -> Result<Vec<Overlap>, HierError> {
    let record = registry.try_get(key)?;
    let same_class = record.label() == label;

    let overlaps = registry
        .class(record.image_id(), label)
        .iter()
        .filter(|other| !(same_class && other.index() == record.index()))
        .filter_map(|other| Overlap::between(record.bbox_ref(), other.bbox_ref(), other.index()))
        .collect();

    Ok(overlaps)
}

/// Compute and store `overlap[label]` on the record at `key`, replacing any
/// earlier list for that class.
pub fn resolve_overlap(
    registry: &mut Registry,
    key: &RecordKey,
    label: &str,
) -> Result<(), HierError> {
    let overlaps = compute_overlaps(registry, key, label)?;
    if let Some(record) = registry.get_mut(key) {
        record.set_overlap(label, overlaps);
    }
    Ok(())
}

/// Store overlap lists for every record against every class of its image.
pub fn find_overlapping_objects(registry: &mut Registry) -> Result<(), HierError> {
    let mut pending = Vec::new();
    for key in registry.keys() {
        let labels: Vec<String> = registry.labels(&key.image_id).map(str::to_string).collect();
        for label in labels {
            let overlaps = compute_overlaps(registry, &key, &label)?;
            pending.push((key.clone(), label, overlaps));
        }
    }

    let entries: usize = pending.iter().map(|(_, _, overlaps)| overlaps.len()).sum();
    for (key, label, overlaps) in pending {
        if let Some(record) = registry.get_mut(&key) {
            record.set_overlap(&label, overlaps);
        }
    }

    debug!("stored {} overlap entries", entries);
    Ok(())
}

/// Flag duplicate annotations in every image+class list.
///
/// Two records are linked when their IoU is above `threshold`; a duplicate
/// cluster is a connected group of links. Its lowest index is the canonical
/// record (`duplicate == false`), every other member is a duplicate, even
/// when it only reaches the canonical record through other duplicates.
pub fn find_duplicates(registry: &mut Registry, threshold: f64) {
    let images: Vec<String> = registry.images().map(str::to_string).collect();
    let mut flagged = 0;

    for image_id in &images {
        let labels: Vec<String> = registry.labels(image_id).map(str::to_string).collect();
        for label in &labels {
            let Some(records) = registry.class_mut(image_id, label) else {
                continue;
            };

            let mut clusters = MinUnionFind::new(records.len());
            for (i, a) in records.iter().enumerate() {
                for (j, b) in records.iter().enumerate().skip(i + 1) {
                    if a.bbox_ref().iou(b.bbox_ref()) > threshold {
                        clusters.union(i, j);
                    }
                }
            }

            for (i, record) in records.iter_mut().enumerate() {
                let duplicate = clusters.find(i) != i;
                flagged += usize::from(duplicate);
                record.set_duplicate(duplicate);
            }
        }
    }

    debug!("flagged {} duplicate records", flagged);
}

/// Union-find whose root is always the smallest member.
struct MinUnionFind {
    parent: Vec<usize>,
}

impl MinUnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        let (low, high) = if root_x < root_y {
            (root_x, root_y)
        } else {
            (root_y, root_x)
        };
        self.parent[high] = low;
    }
}
