//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no stand
//! hardware attached.

mod dispatcher_tests;
mod sampling_tests;
mod sequencer_tests;
mod server_tests;
