use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    analysis::overlap::{Overlap, sort_for_parent},
    config::{HierarchyConfig, TieBreak},
    error::HierError,
    layout::registry::{RecordKey, Registry},
    resolve::overlap::{find_duplicates, find_overlapping_objects, resolve_overlap},
};

/// One level of the hierarchy: records of class `child` get a parent of
/// class `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyPair {
    pub child: String,
    pub parent: String,
}

impl HierarchyPair {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }
}

impl From<(&str, &str)> for HierarchyPair {
    fn from((child, parent): (&str, &str)) -> Self {
        Self::new(child, parent)
    }
}

/// Parses `child:parent`.
impl FromStr for HierarchyPair {
    type Err = HierError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.split_once(':') {
            Some((child, parent)) if !child.is_empty() && !parent.is_empty() => {
                Ok(Self::new(child, parent))
            }
            _ => Err(HierError::InvalidPair {
                text: text.to_string(),
            }),
        }
    }
}

impl fmt::Display for HierarchyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.child, self.parent)
    }
}

/// Pick a parent among the overlap entries of one child.
///
/// Parents that fully contain the child are preferred; only when there are
/// none do parents containing the child's center qualify. `overlaps` must be
/// in ascending index order.
pub fn select_parent(overlaps: &[Overlap], tie_break: TieBreak) -> Option<usize> {
    let inside: Vec<Overlap> = overlaps
        .iter()
        .filter(|o| o.self_inside_other)
        .copied()
        .collect();
    let candidates = if inside.is_empty() {
        overlaps
            .iter()
            .filter(|o| o.center_of_self)
            .copied()
            .collect()
    } else {
        inside
    };

    match tie_break {
        TieBreak::FirstRegistered => candidates.first().map(|o| o.index),
        TieBreak::BestOverlap => sort_for_parent(&candidates).first().map(|o| o.index),
        TieBreak::Unambiguous => match candidates.as_slice() {
            [only] => Some(only.index),
            _ => None,
        },
    }
}

/// Assign each record of class `child_label` at most one parent of class
/// `parent_label`, in every image.
///
/// Earlier assignments for this class pair are cleared first, so calling it
/// again yields the same links. Images missing either class are left
/// untouched. Returns the number of links made.
///
/// `skip_duplicates` relies on flags from [`find_duplicates`]; records whose
/// flag is still unresolved count as canonical and a warning is logged.
pub fn find_parent(
    registry: &mut Registry,
    child_label: &str,
    parent_label: &str,
    config: &HierarchyConfig,
) -> Result<usize, HierError> {
    let images: Vec<String> = registry.images().map(str::to_string).collect();
    let mut linked = 0;

    for image_id in &images {
        let child_count = registry.class(image_id, child_label).len();
        let parent_count = registry.class(image_id, parent_label).len();
        if child_count == 0 || parent_count == 0 {
            trace!(
                "image `{}` lacks `{}` or `{}`, skipped",
                image_id, child_label, parent_label
            );
            continue;
        }

        if config.skip_duplicates
            && has_unresolved_duplicates(registry, image_id, &[child_label, parent_label])
        {
            warn!(
                "image `{}` has unresolved duplicate flags for `{}`/`{}`, treating them as canonical",
                image_id, child_label, parent_label
            );
        }

        if let Some(children) = registry.class_mut(image_id, child_label) {
            children
                .iter_mut()
                .for_each(|child| child.clear_parent(parent_label));
        }
        if let Some(parents) = registry.class_mut(image_id, parent_label) {
            parents
                .iter_mut()
                .for_each(|parent| parent.clear_children(child_label));
        }

        let mut links = Vec::new();
        for index in 0..child_count {
            let key = RecordKey::new(image_id.as_str(), child_label, index);
            resolve_overlap(registry, &key, parent_label)?;

            let child = registry.try_get(&key)?;
            if config.skip_duplicates && child.duplicate() == Some(true) {
                continue;
            }

            let parents = registry.class(image_id, parent_label);
            let candidates: Vec<Overlap> = child
                .overlap(parent_label)
                .unwrap_or_default()
                .iter()
                .filter(|o| !(config.skip_duplicates && parents[o.index].duplicate() == Some(true)))
                .copied()
                .collect();

            if let Some(parent_index) = select_parent(&candidates, config.tie_break) {
                links.push((index, parent_index));
            }
        }

        for &(child_index, parent_index) in &links {
            if let Some(child) = registry
                .class_mut(image_id, child_label)
                .and_then(|children| children.get_mut(child_index))
            {
                child.set_parent(parent_label, parent_index);
            }
            if let Some(parent) = registry
                .class_mut(image_id, parent_label)
                .and_then(|parents| parents.get_mut(parent_index))
            {
                parent.push_child(child_label, child_index);
            }
        }
        linked += links.len();
    }

    debug!(
        "linked {} `{}` records to `{}` parents",
        linked, child_label, parent_label
    );
    Ok(linked)
}

fn has_unresolved_duplicates(registry: &Registry, image_id: &str, labels: &[&str]) -> bool {
    labels.iter().any(|label| {
        registry
            .class(image_id, label)
            .iter()
            .any(|record| record.duplicate().is_none())
    })
}

/// Full pass over the registry: overlaps, duplicates, then each pair of
/// `pairs` in order.
#[tracing::instrument(skip_all, fields(records = registry.len(), pairs = pairs.len()))]
pub fn get_hierarchy(
    registry: &mut Registry,
    pairs: &[HierarchyPair],
    config: &HierarchyConfig,
) -> Result<(), HierError> {
    find_overlapping_objects(registry)?;
    find_duplicates(registry, config.duplicate_iou_threshold);

    let mut linked = 0;
    for pair in pairs {
        linked += find_parent(registry, &pair.child, &pair.parent, config)?;
    }

    info!("hierarchy resolved with {} parent links", linked);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::HierarchyConfigBuilder, layout::record::Attributes};
    use serde_json::{Value, json};

    fn row(label: &str, x0: f64, x1: f64, y0: f64, y1: f64) -> Attributes {
        match json!({
            "ImageID": "1", "LabelName": label,
            "XMin": x0, "XMax": x1, "YMin": y0, "YMax": y1,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn entry(index: usize, inside: bool, center: bool, iom: f64) -> Overlap {
        Overlap {
            index,
            self_inside_other: inside,
            center_of_self: center,
            other_inside_self: false,
            center_of_other: false,
            intersection: 0.1,
            iou: 0.1,
            iom,
        }
    }

    #[test]
    fn test_pair_parse() {
        let pair: HierarchyPair = "Eye:Face".parse().unwrap();
        assert_eq!(pair, HierarchyPair::new("Eye", "Face"));
        assert_eq!(pair.to_string(), "Eye:Face");
        assert!("Eye".parse::<HierarchyPair>().is_err());
        assert!(":Face".parse::<HierarchyPair>().is_err());
    }

    #[test]
    fn test_select_parent_policies() {
        let overlaps = [
            entry(0, false, true, 0.9),
            entry(1, true, true, 0.4),
            entry(2, true, true, 0.8),
        ];
        assert_eq!(select_parent(&overlaps, TieBreak::FirstRegistered), Some(1));
        assert_eq!(select_parent(&overlaps, TieBreak::BestOverlap), Some(2));
        assert_eq!(select_parent(&overlaps, TieBreak::Unambiguous), None);

        // Center fallback only when nothing contains the child
        let center_only = [entry(0, false, false, 0.2), entry(3, false, true, 0.6)];
        assert_eq!(select_parent(&center_only, TieBreak::FirstRegistered), Some(3));
        assert_eq!(select_parent(&center_only, TieBreak::Unambiguous), Some(3));

        assert_eq!(select_parent(&[], TieBreak::FirstRegistered), None);
    }

    #[test]
    fn test_find_parent_first_registered_among_nested_containers() {
        let mut registry = Registry::new();
        let eye = registry.insert(row("Eye", 0.3, 0.35, 0.3, 0.35)).unwrap();
        registry.insert(row("Face", 0.0, 1.0, 0.0, 1.0)).unwrap();
        registry.insert(row("Face", 0.2, 0.5, 0.2, 0.5)).unwrap();

        let config = HierarchyConfig::default();
        let linked = find_parent(&mut registry, "Eye", "Face", &config).unwrap();
        assert_eq!(linked, 1);
        assert_eq!(registry.get(&eye).unwrap().parent("Face"), Some(0));
        // both containers stay visible for other policies
        assert_eq!(registry.get(&eye).unwrap().overlap("Face").unwrap().len(), 2);

        let faces = registry.class("1", "Face");
        assert_eq!(faces[0].children("Eye"), Some(&[0][..]));
        assert_eq!(faces[1].children("Eye"), None);
        assert!(faces[1].children_map().is_some());

        let best = HierarchyConfigBuilder::default()
            .tie_break(TieBreak::BestOverlap)
            .build()
            .unwrap();
        find_parent(&mut registry, "Eye", "Face", &best).unwrap();
        // equal IoM of 1.0, registry order decides
        assert_eq!(registry.get(&eye).unwrap().parent("Face"), Some(0));

        let strict = HierarchyConfigBuilder::default()
            .tie_break(TieBreak::Unambiguous)
            .build()
            .unwrap();
        find_parent(&mut registry, "Eye", "Face", &strict).unwrap();
        assert_eq!(registry.get(&eye).unwrap().parent("Face"), None);
        assert_eq!(registry.class("1", "Face")[0].children("Eye"), None);
    }

    #[test]
    fn test_find_parent_is_idempotent() {
        let mut registry = Registry::new();
        registry.insert(row("Object", 0.2, 0.4, 0.3, 0.5)).unwrap();
        registry.insert(row("Object", 0.1, 0.3, 0.4, 0.8)).unwrap();
        registry.insert(row("Group", 0.1, 0.5, 0.1, 0.5)).unwrap();
        let config = HierarchyConfig::default();

        find_parent(&mut registry, "Object", "Group", &config).unwrap();
        let first: Vec<_> = registry
            .iter()
            .map(|r| (r.parents().cloned(), r.children_map().cloned()))
            .collect();
        find_parent(&mut registry, "Object", "Group", &config).unwrap();
        let second: Vec<_> = registry
            .iter()
            .map(|r| (r.parents().cloned(), r.children_map().cloned()))
            .collect();
        assert_eq!(first, second);
        assert_eq!(registry.class("1", "Group")[0].children("Object"), Some(&[0][..]));
    }

    #[test]
    fn test_find_parent_skip_duplicates() {
        let mut registry = Registry::new();
        let eye = registry.insert(row("Eye", 0.3, 0.35, 0.3, 0.35)).unwrap();
        let eye_dup = registry.insert(row("Eye", 0.3, 0.35, 0.3, 0.35)).unwrap();
        registry.insert(row("Face", 0.2, 0.5, 0.2, 0.5)).unwrap();
        registry.insert(row("Face", 0.2, 0.5, 0.2, 0.5)).unwrap();

        let config = HierarchyConfigBuilder::default()
            .skip_duplicates(true)
            .build()
            .unwrap();
        get_hierarchy(&mut registry, &[HierarchyPair::new("Eye", "Face")], &config).unwrap();

        assert_eq!(registry.get(&eye).unwrap().parent("Face"), Some(0));
        assert_eq!(registry.get(&eye_dup).unwrap().parent("Face"), None);
        let faces = registry.class("1", "Face");
        assert_eq!(faces[0].children("Eye"), Some(&[0][..]));
        assert_eq!(faces[1].children("Eye"), None);
    }

    #[test]
    fn test_skip_duplicates_without_flags() {
        let mut registry = Registry::new();
        let eye = registry.insert(row("Eye", 0.3, 0.35, 0.3, 0.35)).unwrap();
        let eye_copy = registry.insert(row("Eye", 0.3, 0.35, 0.3, 0.35)).unwrap();
        registry.insert(row("Face", 0.2, 0.5, 0.2, 0.5)).unwrap();
        assert!(has_unresolved_duplicates(&registry, "1", &["Eye", "Face"]));

        let config = HierarchyConfigBuilder::default()
            .skip_duplicates(true)
            .build()
            .unwrap();
        // flags never computed: both eyes count as canonical
        assert_eq!(find_parent(&mut registry, "Eye", "Face", &config).unwrap(), 2);
        assert_eq!(registry.get(&eye_copy).unwrap().parent("Face"), Some(0));

        find_duplicates(&mut registry, config.duplicate_iou_threshold);
        assert!(!has_unresolved_duplicates(&registry, "1", &["Eye", "Face"]));
        assert_eq!(find_parent(&mut registry, "Eye", "Face", &config).unwrap(), 1);
        assert_eq!(registry.get(&eye).unwrap().parent("Face"), Some(0));
        assert_eq!(registry.get(&eye_copy).unwrap().parent("Face"), None);
    }

    #[test]
    fn test_missing_class_is_not_an_error() {
        let mut registry = Registry::new();
        let object = registry.insert(row("Object", 0.2, 0.4, 0.3, 0.5)).unwrap();
        let config = HierarchyConfig::default();

        assert_eq!(find_parent(&mut registry, "Object", "Group", &config).unwrap(), 0);
        assert_eq!(find_parent(&mut registry, "Ghost", "Object", &config).unwrap(), 0);
        assert!(registry.get(&object).unwrap().parents().is_none());
    }
}
