use std::net::{Ipv4Addr, Ipv6Addr};

use blackbox_utils::Namespace;

use crate::{
    drivers::{NetworkInterface, SharedNetworkInterface, SharedWiFiStation, WiFiStation},
    error::Result,
    parameter::ConfigurationParameter,
};

/// IP settings shared by Ethernet, generic network interfaces and Wi-Fi stations
pub struct NetworkParameters {
    pub ipv4_dhcp_client_enabled: ConfigurationParameter<bool>,
    pub ipv4_address: ConfigurationParameter<Ipv4Addr>,
    pub ipv4_netmask: ConfigurationParameter<Ipv4Addr>,
    pub ipv4_gateway: ConfigurationParameter<Ipv4Addr>,
    pub ipv6_dhcp_client_enabled: ConfigurationParameter<bool>,
    pub ipv6_global_address: ConfigurationParameter<Ipv6Addr>,
}

impl NetworkParameters {
    pub(crate) fn from_interface<N: NetworkInterface + ?Sized>(entity: &N) -> Self {
        Self {
            ipv4_dhcp_client_enabled: ConfigurationParameter::new(
                "ip4DhcpcEn",
                entity.is_ipv4_dhcp_client_enabled(),
            ),
            ipv4_address: ConfigurationParameter::new("ip4Address", entity.ipv4_address()),
            ipv4_netmask: ConfigurationParameter::new("ip4Netmask", entity.ipv4_netmask()),
            ipv4_gateway: ConfigurationParameter::new("ip4Gateway", entity.ipv4_gateway()),
            ipv6_dhcp_client_enabled: ConfigurationParameter::new(
                "ip6DhcpcEn",
                entity.is_ipv6_dhcp_client_enabled(),
            ),
            ipv6_global_address: ConfigurationParameter::new(
                "ip6GlobAddr",
                entity.ipv6_global_address(),
            ),
        }
    }

    pub(crate) fn load(&self, namespace: &Namespace) -> Result<()> {
        self.ipv4_address.load(namespace)?;
        self.ipv4_netmask.load(namespace)?;
        self.ipv4_gateway.load(namespace)?;
        self.ipv4_dhcp_client_enabled.load(namespace)?;
        self.ipv6_global_address.load(namespace)?;
        self.ipv6_dhcp_client_enabled.load(namespace)
    }

    pub(crate) fn save(&self, namespace: &Namespace) -> Result<()> {
        self.ipv4_address.save(namespace)?;
        self.ipv4_netmask.save(namespace)?;
        self.ipv4_gateway.save(namespace)?;
        self.ipv4_dhcp_client_enabled.save(namespace)?;
        self.ipv6_global_address.save(namespace)?;
        self.ipv6_dhcp_client_enabled.save(namespace)
    }

    /// Static addresses are pushed only for families whose DHCP client is off
    pub(crate) fn apply_to<N: NetworkInterface + ?Sized>(
        &self,
        entity: &mut N,
    ) -> anyhow::Result<()> {
        if self.ipv4_dhcp_client_enabled.value() {
            entity.enable_ipv4_dhcp_client()?;
        } else {
            entity.disable_ipv4_dhcp_client()?;
            entity.set_ipv4_address(self.ipv4_address.value())?;
            entity.set_ipv4_netmask(self.ipv4_netmask.value())?;
            entity.set_ipv4_gateway(self.ipv4_gateway.value())?;
        }

        if self.ipv6_dhcp_client_enabled.value() {
            entity.enable_ipv6_dhcp_client()?;
        } else {
            entity.disable_ipv6_dhcp_client()?;
            entity.set_ipv6_global_address(self.ipv6_global_address.value())?;
        }
        Ok(())
    }

    pub fn disable_value_validation(&self) {
        self.ipv4_dhcp_client_enabled.disable_value_validation();
        self.ipv4_address.disable_value_validation();
        self.ipv4_netmask.disable_value_validation();
        self.ipv4_gateway.disable_value_validation();
        self.ipv6_dhcp_client_enabled.disable_value_validation();
        self.ipv6_global_address.disable_value_validation();
    }
}

/// Live state of a network interface, captured under its lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub connected: bool,
    pub ipv4_address: Ipv4Addr,
    pub ipv4_netmask: Ipv4Addr,
    pub ipv4_gateway: Ipv4Addr,
    pub ipv6_global_address: Ipv6Addr,
    pub ipv6_link_local_address: Ipv6Addr,
}

impl NetworkStatus {
    pub(crate) fn capture<N: NetworkInterface + ?Sized>(entity: &N) -> Self {
        Self {
            connected: entity.is_connected(),
            ipv4_address: entity.ipv4_address(),
            ipv4_netmask: entity.ipv4_netmask(),
            ipv4_gateway: entity.ipv4_gateway(),
            ipv6_global_address: entity.ipv6_global_address(),
            ipv6_link_local_address: entity.ipv6_link_local_address(),
        }
    }
}

pub struct NetworkInterfaceConfiguration {
    pub network: NetworkParameters,
    pub(crate) interface: SharedNetworkInterface,
}

impl NetworkInterfaceConfiguration {
    pub(crate) fn new(interface: SharedNetworkInterface) -> Self {
        let network = NetworkParameters::from_interface(&*interface.lock());
        Self { network, interface }
    }

    pub fn interface(&self) -> &SharedNetworkInterface {
        &self.interface
    }
}

pub struct WiFiStationConfiguration {
    pub network: NetworkParameters,
    pub ssid: ConfigurationParameter<String>,
    /// Never exposed through the register map
    pub password: ConfigurationParameter<String>,
    pub(crate) station: SharedWiFiStation,
}

impl WiFiStationConfiguration {
    pub(crate) fn new(station: SharedWiFiStation) -> Self {
        let (network, ssid, password) = {
            let entity = station.lock();
            (
                NetworkParameters::from_interface(&*entity),
                entity.ssid(),
                entity.password(),
            )
        };
        Self {
            network,
            ssid: ConfigurationParameter::new("wifiSsid", ssid),
            password: ConfigurationParameter::new("wifiPass", password),
            station,
        }
    }

    pub fn station(&self) -> &SharedWiFiStation {
        &self.station
    }

    pub(crate) fn load(&self, namespace: &Namespace) -> Result<()> {
        self.ssid.load(namespace)?;
        self.password.load(namespace)?;
        self.network.load(namespace)
    }

    pub(crate) fn save(&self, namespace: &Namespace) -> Result<()> {
        self.ssid.save(namespace)?;
        self.password.save(namespace)?;
        self.network.save(namespace)
    }

    pub(crate) fn apply_to<W: WiFiStation + ?Sized>(&self, entity: &mut W) -> anyhow::Result<()> {
        entity.set_ssid(&self.ssid.value())?;
        entity.set_password(&self.password.value())?;
        self.network.apply_to(entity)
    }

    pub fn disable_value_validation(&self) {
        self.ssid.disable_value_validation();
        self.password.disable_value_validation();
        self.network.disable_value_validation();
    }
}
