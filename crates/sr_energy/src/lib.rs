//! The sr_energy crate.
//!
//! Nearest-neighbor energetics for toehold-mediated strand displacement:
//!  - parameter tables (stacking and dangle free energies),
//!  - batched toehold binding energies (`Energetics`),
//!  - worst-case spurious binding between sequence ends (mismatch scans).
//!

mod error;
mod params;
mod sequence;
mod energetics;

/// Loop and dangle mismatch scans.
pub mod mismatch;

pub use error::*;
pub use params::*;
pub use sequence::*;
pub use energetics::*;
pub use mismatch::MismatchMode;
