use anyhow::Result;
use parking_lot::Mutex;
use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use super::{UartFlowControl, UartParity, UartStopBits};

/// Any piece of hardware the device can switch on and off
pub trait HardwareInterface: Send {
    fn name(&self) -> String;

    fn is_enabled(&self) -> bool;

    fn enable(&mut self) -> Result<()>;

    fn disable(&mut self) -> Result<()>;
}

pub trait Uart: HardwareInterface {
    fn baud_rate(&self) -> u32;
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    fn data_bits(&self) -> u16;
    fn set_data_bits(&mut self, data_bits: u16) -> Result<()>;

    fn parity(&self) -> UartParity;
    fn set_parity(&mut self, parity: UartParity) -> Result<()>;

    fn stop_bits(&self) -> UartStopBits;
    fn set_stop_bits(&mut self, stop_bits: UartStopBits) -> Result<()>;

    fn flow_control(&self) -> UartFlowControl;
    fn set_flow_control(&mut self, flow_control: UartFlowControl) -> Result<()>;
}

/// IP-capable interface
///
/// Address getters return the addresses currently in use, which are the leased
/// ones while a DHCP client is running.
pub trait NetworkInterface: HardwareInterface {
    fn is_connected(&self) -> bool;

    fn is_ipv4_dhcp_client_enabled(&self) -> bool;
    fn enable_ipv4_dhcp_client(&mut self) -> Result<()>;
    fn disable_ipv4_dhcp_client(&mut self) -> Result<()>;

    fn ipv4_address(&self) -> Ipv4Addr;
    fn set_ipv4_address(&mut self, address: Ipv4Addr) -> Result<()>;

    fn ipv4_netmask(&self) -> Ipv4Addr;
    fn set_ipv4_netmask(&mut self, netmask: Ipv4Addr) -> Result<()>;

    fn ipv4_gateway(&self) -> Ipv4Addr;
    fn set_ipv4_gateway(&mut self, gateway: Ipv4Addr) -> Result<()>;

    fn is_ipv6_dhcp_client_enabled(&self) -> bool;
    fn enable_ipv6_dhcp_client(&mut self) -> Result<()>;
    fn disable_ipv6_dhcp_client(&mut self) -> Result<()>;

    fn ipv6_global_address(&self) -> Ipv6Addr;
    fn set_ipv6_global_address(&mut self, address: Ipv6Addr) -> Result<()>;

    fn ipv6_link_local_address(&self) -> Ipv6Addr;
}

pub trait WiFiStation: NetworkInterface {
    fn ssid(&self) -> String;
    fn set_ssid(&mut self, ssid: &str) -> Result<()>;

    fn password(&self) -> String;
    fn set_password(&mut self, password: &str) -> Result<()>;
}

pub type SharedHardwareInterface = Arc<Mutex<dyn HardwareInterface>>;
pub type SharedUart = Arc<Mutex<dyn Uart>>;
pub type SharedNetworkInterface = Arc<Mutex<dyn NetworkInterface>>;
pub type SharedWiFiStation = Arc<Mutex<dyn WiFiStation>>;
