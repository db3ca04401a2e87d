//! # Configuration Synchronisation
//!
//! Remote read, write and reset of robot configuration variables.

pub mod protocol;
pub mod registry;

pub use protocol::{respond_multi, respond_single};
pub use registry::{Access, ConfigValue, ConfigVariableDescriptor, VariableRegistry, Width};
