//! Call contracts for external collaborators the pipeline can be wired to.
//!
//! Nothing in this module is implemented here: these traits only fix the boundary the core
//! depends on, so platform-specific implementations (native-library bindings, compression
//! codecs) can live in downstream crates.

pub mod payload_pack;
pub mod performance;

pub use payload_pack::*;
pub use performance::*;
