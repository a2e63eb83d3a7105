//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants of the distance service.

use uuid::Uuid;

/// Distance Service UUID (primary).
pub const DISTANCE_SERVICE_UUID: Uuid = Uuid::from_u128(0x1234_5678_1234_5678_1234_56789abcdef0);

/// Distance Characteristic UUID (Read, Notify).
pub const DISTANCE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x1234_5678_1234_5678_1234_56789abcdef1);

/// Check if a service UUID is the distance service.
pub fn is_distance_service(uuid: &Uuid) -> bool {
    *uuid == DISTANCE_SERVICE_UUID
}
