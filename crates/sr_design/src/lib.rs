//! The sr_design crate.
//!
//! Everything strandrank needs to know about a design, without designing:
//!  - reaction network parsing,
//!  - the candidate design record (domains, strands, complexes, groupings),
//!  - toehold pool handling,
//!  - the folding oracle contract and a NUPACK-backed implementation.
//!

mod error;
mod design;
mod oracle;

/// Reaction network text format.
pub mod crn;

/// Toehold pools and assignments.
pub mod toeholds;

/// NUPACK command line oracle.
pub mod nupack;

pub use error::*;
pub use design::*;
pub use oracle::*;
pub use crn::Crn;
pub use crn::Reaction;
pub use nupack::NupackOracle;
