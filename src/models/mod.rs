pub mod common;
pub mod generation;

pub use common::*;
pub use generation::*;
