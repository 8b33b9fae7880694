//! Call descriptors (data), templates that build them, and the registry resolving
//! operation names to templates.
//!
//! `descriptor` holds the fully resolved request for one invocation; `template` declares
//! per-endpoint metadata (method, path template, scope, cache duration, pagination) and
//! substitutes caller arguments; `registry` maps canonical operation identifiers onto
//! [`CallFactory`] implementations; `catalog` ships the standard ESI entries.

pub mod catalog;
pub mod descriptor;
pub mod registry;
pub mod template;

pub use descriptor::*;
pub use registry::*;
pub use template::*;
