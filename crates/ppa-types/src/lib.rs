//! # ppa-types
//!
//! Core types shared by the exploration crates: parameter spaces,
//! configurations, costs and the error taxonomy.

pub mod configuration;
pub mod errors;
pub mod space;

pub use configuration::*;
pub use errors::*;
pub use space::*;
