//! Application core: command decoding, dispatch, and engine profiles.
//!
//! Everything in here is hardware-agnostic.  Interaction with valves,
//! ADCs, the network, and time goes through the **port traits** in
//! [`ports`], so the whole layer runs against mock adapters in tests.

pub mod commands;
pub mod dispatcher;
pub mod ports;
pub mod profile;
