//! Corpus-level drivers: mining runs, output verification and link probing.

mod coordinator;
mod ledger;
mod probe;
mod verifier;

pub use coordinator::RunCoordinator;
pub use probe::{LinkProber, ProbeLedger};
pub use verifier::{verify_outputs, VerificationReport};
