//! Auth-domain token models and the pure validator.

pub mod token;

pub use token::{record::*, secret::*, validation::*};
