// Application layer - Drives the services from a front-end
//
// The CLI in main.rs is the only front-end; the controller holds no
// terminal-specific code.

pub mod controller;

pub use controller::{BridgeController, ImportRequest};
