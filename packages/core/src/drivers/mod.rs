//! Capability interfaces of the live entities a configuration is bound to
//!
//! Drivers themselves live outside this crate. Configuration objects only see
//! them through these traits, behind shared `parking_lot` mutexes.

mod hardware;
mod server;

pub use hardware::{
    HardwareInterface, NetworkInterface, SharedHardwareInterface, SharedNetworkInterface,
    SharedUart, SharedWiFiStation, Uart, WiFiStation,
};
pub use server::{
    ModbusServer, ModbusTransport, NetworkServer, Server, SharedModbusServer,
    SharedNetworkServer, SharedServer,
};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter};

use crate::parameter::persisted_as_u8;

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum UartParity {
    None = 0,
    Even = 1,
    Odd = 2,
}

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum UartStopBits {
    One = 1,
    OnePointFive = 2,
    Two = 3,
}

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum UartFlowControl {
    None = 0,
    Rts = 1,
    Cts = 2,
    RtsCts = 3,
}

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ModbusProtocol {
    Rtu = 0,
    Ascii = 1,
    Tcp = 2,
}

persisted_as_u8!(UartParity, UartStopBits, UartFlowControl, ModbusProtocol);
