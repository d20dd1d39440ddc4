use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};
use serde_json::Value;
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::{bbox::Bbox, overlap::Overlap},
    consts::*,
    error::{HierError, JsonSnafu},
};

/// Raw attribute map of one annotation row, kept verbatim.
pub type Attributes = serde_json::Map<String, Value>;

/// The canonical fields parsed out of an annotation row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub image_id: String,
    pub label: String,
    pub bbox: Bbox,
}

impl ParsedRow {
    /// Parse an Open Images style annotation row.
    ///
    /// Coordinates may be JSON numbers or numeric strings. Boxes with
    /// `XMin > XMax` or `YMin > YMax` are rejected; zero width or height is
    /// accepted.
    pub fn parse(attrs: &Attributes) -> Result<Self, HierError> {
        let image_id = text_field(attrs, IMAGE_ID_KEY)?;
        let label = text_field(attrs, LABEL_KEY)?;
        let x0 = number_field(attrs, X_MIN_KEY)?;
        let x1 = number_field(attrs, X_MAX_KEY)?;
        let y0 = number_field(attrs, Y_MIN_KEY)?;
        let y1 = number_field(attrs, Y_MAX_KEY)?;

        if x0 > x1 {
            return Err(HierError::InvertedBox {
                axis: 'x',
                min: x0,
                max: x1,
            });
        }
        if y0 > y1 {
            return Err(HierError::InvertedBox {
                axis: 'y',
                min: y0,
                max: y1,
            });
        }

        let in_range = |v: f64| (COORD_MIN..=COORD_MAX).contains(&v);
        if ![x0, x1, y0, y1].into_iter().all(in_range) {
            warn!(
                "box of `{}` in image `{}` leaves normalized range: x {}..{} y {}..{}",
                label, image_id, x0, x1, y0, y1
            );
        }

        Ok(Self {
            image_id,
            label,
            bbox: Bbox::from_extents(x0, x1, y0, y1),
        })
    }
}

fn text_field(attrs: &Attributes, field: &str) -> Result<String, HierError> {
    match attrs.get(field) {
        None | Some(Value::Null) => Err(HierError::MissingField {
            field: field.to_string(),
        }),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(_) => Err(HierError::InvalidText {
            field: field.to_string(),
        }),
    }
}

fn number_field(attrs: &Attributes, field: &str) -> Result<f64, HierError> {
    let invalid = |value: &Value| HierError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    };

    let value = match attrs.get(field) {
        None | Some(Value::Null) => {
            return Err(HierError::MissingField {
                field: field.to_string(),
            });
        }
        Some(value) => value,
    };

    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(invalid(value)),
    }
}

/// One annotated object: a labelled box in an image plus the relations
/// computed against its siblings in the [`Registry`](crate::layout::registry::Registry).
///
/// Identity and geometry are fixed at registration. The computed fields
/// start out unresolved (`None`) and are replaced wholesale by each
/// resolution pass.
#[derive(Debug, Clone)]
pub struct HierObject {
    label: String,
    image_id: String,
    bbox: Bbox,
    index: usize,
    duplicate: Option<bool>,
    overlap: Option<BTreeMap<String, Vec<Overlap>>>,
    parent: Option<BTreeMap<String, usize>>,
    children: Option<BTreeMap<String, Vec<usize>>>,
    obj: Attributes,
}

impl HierObject {
    pub(crate) fn new(row: ParsedRow, index: usize, obj: Attributes) -> Self {
        Self {
            label: row.label,
            image_id: row.image_id,
            bbox: row.bbox,
            index,
            duplicate: None,
            overlap: None,
            parent: None,
            children: None,
            obj,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Position within the image+class list of the registry.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bbox_ref(&self) -> &Bbox {
        &self.bbox
    }

    /// Bounding box as `(x0, y0, x1, y1)`.
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        (self.bbox.min.x, self.bbox.min.y, self.bbox.max.x, self.bbox.max.y)
    }

    /// Rectangle as `(x0, y0, w, h)`.
    pub fn rect(&self) -> (f64, f64, f64, f64) {
        (self.bbox.min.x, self.bbox.min.y, self.w(), self.h())
    }

    pub fn w(&self) -> f64 {
        self.bbox.width()
    }

    pub fn h(&self) -> f64 {
        self.bbox.height()
    }

    pub fn area(&self) -> f64 {
        self.bbox.area()
    }

    pub fn xc(&self) -> f64 {
        self.bbox.center().x
    }

    pub fn yc(&self) -> f64 {
        self.bbox.center().y
    }

    /// The attribute map this record was built from.
    pub fn raw(&self) -> &Attributes {
        &self.obj
    }

    /// `None` until duplicates have been resolved for this record's class.
    pub fn duplicate(&self) -> Option<bool> {
        self.duplicate
    }

    /// Overlap entries against `label`, `None` if not computed for that class.
    pub fn overlap(&self, label: &str) -> Option<&[Overlap]> {
        self.overlap.as_ref()?.get(label).map(Vec::as_slice)
    }

    pub fn overlaps(&self) -> Option<&BTreeMap<String, Vec<Overlap>>> {
        self.overlap.as_ref()
    }

    /// Index of the assigned parent of class `label`.
    pub fn parent(&self, label: &str) -> Option<usize> {
        self.parent.as_ref()?.get(label).copied()
    }

    pub fn parents(&self) -> Option<&BTreeMap<String, usize>> {
        self.parent.as_ref()
    }

    /// Indexes of children of class `label`.
    pub fn children(&self, label: &str) -> Option<&[usize]> {
        self.children.as_ref()?.get(label).map(Vec::as_slice)
    }

    pub fn children_map(&self) -> Option<&BTreeMap<String, Vec<usize>>> {
        self.children.as_ref()
    }

    pub(crate) fn set_duplicate(&mut self, duplicate: bool) {
        self.duplicate = Some(duplicate);
    }

    pub(crate) fn set_overlap(&mut self, label: &str, overlaps: Vec<Overlap>) {
        self.overlap
            .get_or_insert_with(BTreeMap::new)
            .insert(label.to_string(), overlaps);
    }

    pub(crate) fn clear_parent(&mut self, label: &str) {
        self.parent.get_or_insert_with(BTreeMap::new).remove(label);
    }

    pub(crate) fn set_parent(&mut self, label: &str, index: usize) {
        self.parent
            .get_or_insert_with(BTreeMap::new)
            .insert(label.to_string(), index);
    }

    pub(crate) fn clear_children(&mut self, label: &str) {
        self.children.get_or_insert_with(BTreeMap::new).remove(label);
    }

    pub(crate) fn push_child(&mut self, label: &str, index: usize) {
        self.children
            .get_or_insert_with(BTreeMap::new)
            .entry(label.to_string())
            .or_default()
            .push(index);
    }

    /// JSON form of the record; `overlap_info = false` drops the overlap map.
    pub fn to_json_value(&self, overlap_info: bool) -> Result<Value, HierError> {
        serde_json::to_value(RecordJson::new(self, overlap_info))
            .context(JsonSnafu { stage: "record" })
    }
}

impl fmt::Display for HierObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x0={:5.3} x1={:5.3} y0={:5.3} y1={:5.3} lbl={} {} img={}",
            self.bbox.min.x,
            self.bbox.max.x,
            self.bbox.min.y,
            self.bbox.max.y,
            self.label,
            self.index,
            self.image_id
        )
    }
}

// Keys in alphabetical order; `obj` is RAW_ATTRIBUTES_KEY.
#[derive(Serialize)]
struct RecordJson<'a> {
    area: f64,
    children: Option<&'a BTreeMap<String, Vec<usize>>>,
    duplicate: Option<bool>,
    h: f64,
    #[serde(rename = "imageID")]
    image_id: &'a str,
    index: usize,
    label: &'a str,
    obj: &'a Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    overlap: Option<Option<&'a BTreeMap<String, Vec<Overlap>>>>,
    parent: BTreeMap<&'a str, usize>,
    w: f64,
    x0: f64,
    x1: f64,
    xc: f64,
    y0: f64,
    y1: f64,
    yc: f64,
}

impl<'a> RecordJson<'a> {
    fn new(record: &'a HierObject, overlap_info: bool) -> Self {
        let parent = record
            .parent
            .iter()
            .flatten()
            .map(|(label, index)| (label.as_str(), *index))
            .collect();

        Self {
            area: record.area(),
            children: record.children.as_ref(),
            duplicate: record.duplicate,
            h: record.h(),
            image_id: &record.image_id,
            index: record.index,
            label: &record.label,
            obj: &record.obj,
            overlap: overlap_info.then_some(record.overlap.as_ref()),
            parent,
            w: record.w(),
            x0: record.bbox.min.x,
            x1: record.bbox.max.x,
            xc: record.xc(),
            y0: record.bbox.min.y,
            y1: record.bbox.max.y,
            yc: record.yc(),
        }
    }
}

impl Serialize for HierObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RecordJson::new(self, true).serialize(serializer)
    }
}
