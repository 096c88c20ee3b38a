//! Record layout construction.
//!
//! A layout is built once from the channel configuration (names, types,
//! gains, offsets) and is then immutable. Byte offsets are assigned in
//! declaration order so records are fully packed.

pub mod builder;
pub mod config;
pub mod error;

pub use builder::RecordLayout;
pub use config::{LayoutConfig, TypePolicy, split_list};
pub use error::ConfigError;
