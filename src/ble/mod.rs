//! BLE communication module.
//!
//! This module provides the GATT peripheral that serves the distance reading
//! and a central-role scanner for checking that it is discoverable.

pub mod scanner;
pub mod server;
pub mod uuids;

pub use scanner::{DiscoveredDevice, ScanReport, VisibilityScanner, DEFAULT_SCAN_WINDOW};
pub use server::{GattServer, ADAPTER_TROUBLESHOOTING};
pub use uuids::*;
