//! Wire layout of the register map, version 1
//!
//! Every page is 100 words (200 bytes) long. Word `n` of a page is made of bytes
//! `2n` and `2n + 1`, little-endian, and 32-bit values span two consecutive words
//! with the low word first. Text fields are fixed-width, zero-padded and not
//! necessarily zero-terminated. IP addresses are stored octet by octet.
//!
//! Offsets below are word offsets relative to the page base address.

use std::time::Duration;

pub const PAGE_WORDS: u16 = 100;
pub const PAGE_BYTES: usize = PAGE_WORDS as usize * 2;
/// Coil view of a page: the low four bits of its first word
pub const PAGE_COILS: u16 = 4;

pub const GENERAL_ADDRESS: u16 = 0;
pub const HARDWARE_INTERFACE_ADDRESS: u16 = 100;
pub const SERVER_ADDRESS: u16 = 200;

pub const SIGNATURE: [u8; 4] = *b"PLBB";
pub const MEMORY_MAP_VERSION: u16 = 1;

pub const NAME_SIZE: usize = 32;
pub const WIFI_SSID_SIZE: usize = 32;
pub const WIFI_PASSWORD_SIZE: usize = 64;

/// Bound on waiting for a configuration or entity inside a register handler
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(50);

pub mod general {
    pub const COMMAND: usize = 0;
    pub const RESTART_BIT: u8 = 0;
    pub const SAVE_BIT: u8 = 1;
    pub const FLAGS: usize = 1;
    pub const CLEAR_RESTARTED_BIT: u8 = 0;
    pub const DEVICE_NAME: usize = 2;
    pub const HARDWARE_INTERFACE_INDEX: usize = 18;
    pub const SERVER_INDEX: usize = 19;

    pub const STATUS: usize = 0;
    pub const STICKY_STATUS: usize = 1;
    pub const RESTARTED_BIT: u8 = 0;
    pub const SIGNATURE: usize = 2;
    pub const VERSION: usize = 4;
    pub const HARDWARE_NAME: usize = 5;
    pub const HARDWARE_VERSION: usize = 21;
    pub const HARDWARE_UID: usize = 24;
    pub const FIRMWARE_NAME: usize = 40;
    pub const FIRMWARE_VERSION: usize = 56;
    pub const HARDWARE_INTERFACE_COUNT: usize = 59;
    pub const SERVER_COUNT: usize = 60;
}

pub mod hardware_interface {
    pub const CONTROL: usize = 0;
    pub const ENABLED_BIT: u8 = 0;
    pub const IPV4_DHCP_CLIENT_BIT: u8 = 1;
    pub const IPV6_DHCP_CLIENT_BIT: u8 = 2;
    pub const CLEAR_STICKY_STATUS: usize = 1;

    pub const UART_BAUD_RATE: usize = 2;
    pub const UART_DATA_BITS: usize = 4;
    pub const UART_PARITY: usize = 5;
    pub const UART_STOP_BITS: usize = 6;
    pub const UART_FLOW_CONTROL: usize = 7;

    pub const IPV4_ADDRESS: usize = 2;
    pub const IPV4_NETMASK: usize = 4;
    pub const IPV4_GATEWAY: usize = 6;
    pub const IPV6_GLOBAL_ADDRESS: usize = 8;

    pub const WIFI_SSID: usize = 16;
    pub const WIFI_PASSWORD: usize = 32;

    pub const STATUS: usize = 0;
    pub const CONNECTED_BIT: u8 = 0;
    pub const STICKY_STATUS: usize = 1;
    pub const TYPE: usize = 2;
    pub const NAME: usize = 3;
    pub const IPV6_LINK_LOCAL_ADDRESS: usize = 19;
}

pub mod server {
    pub const CONTROL: usize = 0;
    pub const ENABLED_BIT: u8 = 0;
    pub const CLEAR_STICKY_STATUS: usize = 1;

    pub const PORT: usize = 2;
    pub const MAX_CLIENTS: usize = 3;

    pub const MODBUS_PROTOCOL: usize = 2;
    pub const MODBUS_STATION_ADDRESS: usize = 3;
    pub const MODBUS_PORT: usize = 4;
    pub const MODBUS_MAX_CLIENTS: usize = 5;

    pub const STATUS: usize = 0;
    pub const STICKY_STATUS: usize = 1;
    pub const TYPE: usize = 2;
    pub const NAME: usize = 3;
}
