//! Server state shared across transports.

pub mod state;

pub use state::{ServerState, ServerStateBuilder};
