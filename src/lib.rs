// PERFPREP LIBRARY CRATE
// THE TOGGLE/PROFILE ENGINE. THE BINARY (main.rs) IS A THIN CLI OVER THIS.
// NOTHING HERE TOUCHES THE REAL MACHINE EXCEPT THROUGH host::Host AND privilege::Elevator.

pub mod config;
pub mod error;
pub mod host;
pub mod privilege;
pub mod profile;
pub mod report;
pub mod toggle;
pub mod topology;
pub mod tunables;
