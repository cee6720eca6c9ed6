//! Layered configuration: defaults, files, environment, overrides

pub mod traits;
pub mod tree;
pub mod validation;

pub use traits::{parse_config_file, SlowGateConfig};
pub use tree::{InitialLeaf, SlowTreeConfig, DEFAULT_DELAY, DEFAULT_TREE_DEPTH};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
