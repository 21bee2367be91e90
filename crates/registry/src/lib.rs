//! Field source registry configuration.
//!
//! This crate loads and validates the document describing which upstream
//! targets back each multi-source field, the field's declared output shape,
//! and the merge policy used to reconcile answers. The document lives at
//! `<config_dir>/fanout/fields.yaml` unless `FANOUT_CONFIG_PATH` overrides it.

mod io;
mod model;
mod validation;

pub use io::{ConfigFormat, default_config_path, load_config, load_config_from_path, parse_config_str};
pub use model::{ConfigError, FanoutConfig, FieldConfig};
pub use validation::{ValidationError, validate_config, validate_field, validate_field_name, validate_target_name};
