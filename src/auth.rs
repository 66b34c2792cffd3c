//! Token records and the single-flight token store.

pub mod store;
pub mod token;

pub use store::*;
pub use token::*;
