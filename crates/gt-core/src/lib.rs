//! # gt-core
//!
//! Value types shared by the gridtune crates: parameter spaces, combinations,
//! scored candidates and the error taxonomy.

pub mod candidate;
pub mod errors;
pub mod space;

pub use candidate::*;
pub use errors::*;
pub use space::*;
