//! Station lookup by name.
//!
//! The directory is built at startup from the stations the fixture
//! providers know about.

mod directory;

pub use directory::{StationDirectory, StationMatch};
