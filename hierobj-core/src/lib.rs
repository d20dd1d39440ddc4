pub mod analysis;
pub mod config;
pub mod consts;
pub mod error;
pub mod io;
pub mod layout;
pub mod resolve;

// Re-export commonly used types
pub use config::{HierarchyConfig, HierarchyConfigBuilder, TieBreak};
pub use error::HierError;
pub use layout::{
    record::{Attributes, HierObject},
    registry::{RecordKey, Registry},
};
pub use resolve::{HierarchyPair, get_hierarchy};
