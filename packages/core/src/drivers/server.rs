use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;

use super::ModbusProtocol;

pub trait Server: Send {
    fn name(&self) -> String;

    fn is_enabled(&self) -> bool;

    fn enable(&mut self) -> Result<()>;

    fn disable(&mut self) -> Result<()>;
}

/// Server accepting clients over IP
pub trait NetworkServer: Server {
    fn port(&self) -> u16;
    fn set_port(&mut self, port: u16) -> Result<()>;

    fn max_clients(&self) -> u16;
    fn set_max_clients(&mut self, max_clients: u16) -> Result<()>;
}

pub trait ModbusServer: Server {
    fn protocol(&self) -> ModbusProtocol;
    fn set_protocol(&mut self, protocol: ModbusProtocol) -> Result<()>;

    fn station_address(&self) -> u8;
    fn set_station_address(&mut self, station_address: u8) -> Result<()>;

    /// Server carrying the Modbus traffic, `None` once it has been dropped
    fn base_server(&self) -> Option<ModbusTransport>;
}

/// Underlying server a Modbus server runs on
#[derive(Clone)]
pub enum ModbusTransport {
    Stream(SharedServer),
    Network(SharedNetworkServer),
}

pub type SharedServer = Arc<Mutex<dyn Server>>;
pub type SharedNetworkServer = Arc<Mutex<dyn NetworkServer>>;
pub type SharedModbusServer = Arc<Mutex<dyn ModbusServer>>;
