use indexmap::IndexMap;
use serde::Serialize;
use tracing::*;

use crate::{
    analysis::overlap::Overlap,
    error::HierError,
    layout::record::{Attributes, HierObject, ParsedRow},
};

/// Stable handle of a record: its image, its class and its position in that
/// image+class list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub image_id: String,
    pub label: String,
    pub index: usize,
}

impl RecordKey {
    pub fn new(image_id: impl Into<String>, label: impl Into<String>, index: usize) -> Self {
        Self {
            image_id: image_id.into(),
            label: label.into(),
            index,
        }
    }
}

impl From<&HierObject> for RecordKey {
    fn from(record: &HierObject) -> Self {
        Self::new(record.image_id(), record.label(), record.index())
    }
}

type ClassLists = IndexMap<String, Vec<HierObject>>;

/// All records, grouped by image id then class label, in insertion order.
///
/// Records are only ever appended, so an index handed out at registration
/// stays valid for the life of the registry. Parent and children relations
/// are stored as such indexes.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    images: IndexMap<String, ClassLists>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `attrs` and append the record to its image+class list.
    pub fn insert(&mut self, attrs: Attributes) -> Result<RecordKey, HierError> {
        let row = ParsedRow::parse(&attrs)?;
        let siblings = self
            .images
            .entry(row.image_id.clone())
            .or_default()
            .entry(row.label.clone())
            .or_default();

        let index = siblings.len();
        let key = RecordKey::new(row.image_id.as_str(), row.label.as_str(), index);
        siblings.push(HierObject::new(row, index, attrs));

        trace!("registered {:?}", key);
        Ok(key)
    }

    /// Insert every row in order, stopping at the first malformed one.
    pub fn extend<I>(&mut self, rows: I) -> Result<Vec<RecordKey>, HierError>
    where
        I: IntoIterator<Item = Attributes>,
    {
        let keys = rows
            .into_iter()
            .map(|attrs| self.insert(attrs))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("registered {} records", keys.len());
        Ok(keys)
    }

    pub fn get(&self, key: &RecordKey) -> Option<&HierObject> {
        self.class(&key.image_id, &key.label).get(key.index)
    }

    pub(crate) fn get_mut(&mut self, key: &RecordKey) -> Option<&mut HierObject> {
        self.class_mut(&key.image_id, &key.label)?.get_mut(key.index)
    }

    /// Like [`Registry::get`], failing with `UnknownRecord` for a foreign key.
    pub fn try_get(&self, key: &RecordKey) -> Result<&HierObject, HierError> {
        self.get(key).ok_or_else(|| HierError::UnknownRecord {
            image_id: key.image_id.clone(),
            label: key.label.clone(),
            index: key.index,
        })
    }

    /// Records of class `label` in image `image_id`; empty when there are none.
    pub fn class(&self, image_id: &str, label: &str) -> &[HierObject] {
        self.images
            .get(image_id)
            .and_then(|classes| classes.get(label))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn class_mut(&mut self, image_id: &str, label: &str) -> Option<&mut Vec<HierObject>> {
        self.images.get_mut(image_id)?.get_mut(label)
    }

    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    pub fn labels<'a>(&'a self, image_id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.images
            .get(image_id)
            .into_iter()
            .flat_map(|classes| classes.keys().map(String::as_str))
    }

    /// Every record, image by image and class by class, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &HierObject> {
        self.images
            .values()
            .flat_map(|classes| classes.values())
            .flatten()
    }

    pub fn keys(&self) -> Vec<RecordKey> {
        self.iter().map(RecordKey::from).collect()
    }

    pub fn len(&self) -> usize {
        self.images
            .values()
            .flat_map(|classes| classes.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The record an overlap entry of `record`, filed under class `label`,
    /// refers to.
    pub fn target(&self, record: &HierObject, label: &str, overlap: &Overlap) -> Option<&HierObject> {
        self.class(record.image_id(), label).get(overlap.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn row(image: &str, label: &str, x0: f64, x1: f64, y0: f64, y1: f64) -> Attributes {
        match json!({
            "ImageID": image, "LabelName": label,
            "XMin": x0, "XMax": x1, "YMin": y0, "YMax": y1,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_insert_assigns_class_scoped_indexes() {
        let mut registry = Registry::new();
        let a = registry.insert(row("i1", "Object", 0.2, 0.4, 0.3, 0.5)).unwrap();
        let b = registry.insert(row("i1", "Object", 0.1, 0.3, 0.4, 0.8)).unwrap();
        let c = registry.insert(row("i1", "Group", 0.1, 0.5, 0.1, 0.5)).unwrap();
        let d = registry.insert(row("i2", "Object", 0.0, 1.0, 0.0, 1.0)).unwrap();

        assert_eq!(a, RecordKey::new("i1", "Object", 0));
        assert_eq!(b.index, 1);
        assert_eq!(c.index, 0);
        assert_eq!(d.index, 0);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.class("i1", "Object").len(), 2);
        assert_eq!(registry.get(&b).unwrap().index(), 1);
        assert_eq!(registry.images().collect::<Vec<_>>(), vec!["i1", "i2"]);
        assert_eq!(registry.labels("i1").collect::<Vec<_>>(), vec!["Object", "Group"]);
    }

    #[test]
    fn test_insert_rejects_malformed_row() {
        let mut registry = Registry::new();
        let err = registry
            .insert(row("i1", "Object", 0.5, 0.4, 0.3, 0.5))
            .unwrap_err();
        assert!(err.is_malformed_input());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_extend_stops_at_first_error() {
        let mut registry = Registry::new();
        let rows = vec![
            row("i1", "Object", 0.1, 0.2, 0.1, 0.2),
            row("i1", "Object", 0.3, 0.2, 0.1, 0.2),
            row("i1", "Object", 0.1, 0.2, 0.1, 0.2),
        ];
        assert!(registry.extend(rows).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_lookups() {
        let mut registry = Registry::new();
        registry.insert(row("i1", "Object", 0.1, 0.2, 0.1, 0.2)).unwrap();

        assert!(registry.class("i1", "Group").is_empty());
        assert!(registry.class("missing", "Object").is_empty());
        assert_eq!(registry.labels("missing").count(), 0);
        let err = registry
            .try_get(&RecordKey::new("i1", "Object", 3))
            .unwrap_err();
        assert!(matches!(err, HierError::UnknownRecord { index: 3, .. }));
    }

    #[test]
    fn test_iter_and_keys_follow_registry_order() {
        let mut registry = Registry::new();
        registry.insert(row("i1", "A", 0.1, 0.2, 0.1, 0.2)).unwrap();
        registry.insert(row("i1", "B", 0.1, 0.2, 0.1, 0.2)).unwrap();
        registry.insert(row("i1", "A", 0.3, 0.4, 0.1, 0.2)).unwrap();

        let keys = registry.keys();
        assert_eq!(
            keys,
            vec![
                RecordKey::new("i1", "A", 0),
                RecordKey::new("i1", "A", 1),
                RecordKey::new("i1", "B", 0),
            ]
        );
        assert_eq!(registry.get(&keys[1]).unwrap().bbox().0, 0.3);
    }
}
