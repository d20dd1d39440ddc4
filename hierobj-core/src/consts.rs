/// Attribute key holding the image identifier of an annotation row.
///
/// Names follow the Open Images box annotation CSV header.
pub const IMAGE_ID_KEY: &str = "ImageID";

/// Attribute key holding the class label of an annotation row.
pub const LABEL_KEY: &str = "LabelName";

/// Attribute key holding the left edge of the normalized box.
pub const X_MIN_KEY: &str = "XMin";

/// Attribute key holding the right edge of the normalized box.
pub const X_MAX_KEY: &str = "XMax";

/// Attribute key holding the top edge of the normalized box.
pub const Y_MIN_KEY: &str = "YMin";

/// Attribute key holding the bottom edge of the normalized box.
pub const Y_MAX_KEY: &str = "YMax";

/// Key under which a serialized record keeps its original attribute map.
pub const RAW_ATTRIBUTES_KEY: &str = "obj";

/// IoU threshold above which two annotations of the same class are treated
/// as duplicates of one physical object.
///
/// The comparison is strict: a pair with IoU exactly 0.5 is not a duplicate.
pub const DUPLICATE_IOU_THRESHOLD: f64 = 0.5;

/// Lower bound of normalized image coordinates.
pub const COORD_MIN: f64 = 0.0;

/// Upper bound of normalized image coordinates.
pub const COORD_MAX: f64 = 1.0;
