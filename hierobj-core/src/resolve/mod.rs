pub mod hierarchy;
pub mod overlap;

pub use hierarchy::{HierarchyPair, find_parent, get_hierarchy, select_parent};
pub use overlap::{compute_overlaps, find_duplicates, find_overlapping_objects, resolve_overlap};
