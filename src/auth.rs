//! Scope sets and bearer token state.

pub mod scope;
pub mod token;

pub use scope::*;
pub use token::*;
