#![allow(dead_code)]

/// Capability advertisement of a Powered Up tilt sensor (type 34), without
/// the closing SYS ACK.
pub const TILT_SENSOR: &[u8] = &[
    0x40, 0x22, 0x9D, // CMD TYPE 34
    0x49, 0x03, 0x02, 0xB7, // CMD MODES 4 / views 3
    0x52, 0x00, 0xC2, 0x01, 0x00, 0x6E, // CMD SPEED 115200
    0x5F, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x10, 0xA0, // CMD VERSION
    // mode 3
    0x9B, 0x00, 0x4C, 0x50, 0x46, 0x32, 0x2D, 0x43, 0x41, 0x4C, 0x6F,
    0x9B, 0x01, 0x00, 0x00, 0x34, 0xC2, 0x00, 0x00, 0x34, 0x42, 0xE5,
    0x9B, 0x02, 0x00, 0x00, 0xC8, 0xC2, 0x00, 0x00, 0xC8, 0x42, 0xE6,
    0x9B, 0x03, 0x00, 0x00, 0x34, 0xC2, 0x00, 0x00, 0x34, 0x42, 0xE7,
    0x93, 0x04, 0x43, 0x41, 0x4C, 0x00, 0x26,
    0x8B, 0x05, 0x10, 0x00, 0x61,
    0x93, 0x80, 0x03, 0x00, 0x03, 0x00, 0xEC,
    // mode 2
    0xA2, 0x00, 0x4C, 0x50, 0x46, 0x32, 0x2D, 0x43, 0x52, 0x41, 0x53, 0x48, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x53,
    0x9A, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC8, 0x42, 0xEE,
    0x9A, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC8, 0x42, 0xED,
    0x9A, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC8, 0x42, 0xEC,
    0x92, 0x04, 0x43, 0x4E, 0x54, 0x00, 0x30,
    0x8A, 0x05, 0x10, 0x00, 0x60,
    0x92, 0x80, 0x03, 0x00, 0x03, 0x00, 0xED,
    // mode 1
    0xA1, 0x00, 0x4C, 0x50, 0x46, 0x32, 0x2D, 0x54, 0x49, 0x4C, 0x54, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x1E,
    0x99, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x41, 0x06,
    0x99, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC8, 0x42, 0xEE,
    0x99, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x41, 0x04,
    0x91, 0x04, 0x44, 0x49, 0x52, 0x00, 0x35,
    0x89, 0x05, 0x04, 0x00, 0x77,
    0x91, 0x80, 0x01, 0x00, 0x02, 0x00, 0xED,
    // mode 0
    0xA0, 0x00, 0x4C, 0x50, 0x46, 0x32, 0x2D, 0x41, 0x4E, 0x47, 0x4C, 0x45, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x5B,
    0x98, 0x01, 0x00, 0x00, 0x34, 0xC2, 0x00, 0x00, 0x34, 0x42, 0xE6,
    0x98, 0x02, 0x00, 0x00, 0xC8, 0xC2, 0x00, 0x00, 0xC8, 0x42, 0xE5,
    0x98, 0x03, 0x00, 0x00, 0x34, 0xC2, 0x00, 0x00, 0x34, 0x42, 0xE4,
    0x90, 0x04, 0x44, 0x45, 0x47, 0x00, 0x2D,
    0x88, 0x05, 0x10, 0x00, 0x62,
    0x90, 0x80, 0x02, 0x00, 0x03, 0x00, 0xEE,
];

/// INFO NAME for mode 9 ("CALIB") with six flag bytes, from a color and
/// distance sensor.
pub const CALIB_NAME: &[u8] = &[
    0xA1, 0x20, 0x43, 0x41, 0x4C, 0x49, 0x42, 0x00, 0x40, 0x40, 0x00, 0x00, 0x04, 0x84, 0x00,
    0x00, 0x00, 0x00, 0xBB,
];

/// CMD WRITE carrying 0x17.
pub const CMD_WRITE: &[u8] = &[0x44, 0x17, 0xAC];

/// DATA for mode 0 carrying a single zero byte.
pub const DATA_MODE_0: &[u8] = &[0xC0, 0x00, 0x3F];

/// The tilt sensor advertisement closed by SYS ACK.
pub fn tilt_blob() -> Vec<u8> {
    let mut blob = TILT_SENSOR.to_vec();
    blob.push(0x04);
    blob
}
