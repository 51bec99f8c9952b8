use std::sync::Arc;

use blackbox_core::{
    configuration::{HardwareInterfaceKind, NetworkParameters, NetworkStatus},
    HardwareInterfaceConfiguration,
};

use super::{update, update_enum, update_text, view_size, PageContext};
use crate::{
    area::{MemoryArea, MemoryAreaResult, MemoryType},
    buffer::PageBuffer,
    layout::{
        hardware_interface::*, HARDWARE_INTERFACE_ADDRESS, LOCK_TIMEOUT, NAME_SIZE,
        WIFI_PASSWORD_SIZE, WIFI_SSID_SIZE,
    },
};

fn selected(context: &PageContext) -> Option<Arc<HardwareInterfaceConfiguration>> {
    let index = usize::from(context.cursors.hardware_interface());
    context.black_box.hardware_interface_configuration(index)
}

// With DHCP on, a family reports the negotiated values instead of the stored ones.
fn encode_network(page: &mut PageBuffer, network: &NetworkParameters, live: Option<NetworkStatus>) {
    let ipv4_dhcp = network.ipv4_dhcp_client_enabled.value();
    page.set_bit(CONTROL, IPV4_DHCP_CLIENT_BIT, ipv4_dhcp);
    match live.filter(|_| ipv4_dhcp) {
        Some(live) => {
            page.set_ipv4(IPV4_ADDRESS, live.ipv4_address);
            page.set_ipv4(IPV4_NETMASK, live.ipv4_netmask);
            page.set_ipv4(IPV4_GATEWAY, live.ipv4_gateway);
        }
        None => {
            page.set_ipv4(IPV4_ADDRESS, network.ipv4_address.value());
            page.set_ipv4(IPV4_NETMASK, network.ipv4_netmask.value());
            page.set_ipv4(IPV4_GATEWAY, network.ipv4_gateway.value());
        }
    }

    let ipv6_dhcp = network.ipv6_dhcp_client_enabled.value();
    page.set_bit(CONTROL, IPV6_DHCP_CLIENT_BIT, ipv6_dhcp);
    let ipv6_global_address = match live.filter(|_| ipv6_dhcp) {
        Some(live) => live.ipv6_global_address,
        None => network.ipv6_global_address.value(),
    };
    page.set_ipv6(IPV6_GLOBAL_ADDRESS, ipv6_global_address);
}

fn decode_network(page: &PageBuffer, network: &NetworkParameters) {
    let ipv4_dhcp = page.bit(CONTROL, IPV4_DHCP_CLIENT_BIT);
    update(&network.ipv4_dhcp_client_enabled, ipv4_dhcp);
    if !ipv4_dhcp {
        update(&network.ipv4_address, page.ipv4(IPV4_ADDRESS));
        update(&network.ipv4_netmask, page.ipv4(IPV4_NETMASK));
        update(&network.ipv4_gateway, page.ipv4(IPV4_GATEWAY));
    }

    let ipv6_dhcp = page.bit(CONTROL, IPV6_DHCP_CLIENT_BIT);
    update(&network.ipv6_dhcp_client_enabled, ipv6_dhcp);
    if !ipv6_dhcp {
        update(&network.ipv6_global_address, page.ipv6(IPV6_GLOBAL_ADDRESS));
    }
}

fn uses_dhcp(network: &NetworkParameters) -> bool {
    network.ipv4_dhcp_client_enabled.value() || network.ipv6_dhcp_client_enabled.value()
}

/// Settings of the selected hardware interface
///
/// Writes only reach the configuration object. The live interface changes when
/// the application applies the configuration.
pub struct HardwareInterfaceControlArea {
    context: PageContext,
    memory_type: MemoryType,
}

impl HardwareInterfaceControlArea {
    pub fn new(context: PageContext, memory_type: MemoryType) -> Self {
        Self {
            context,
            memory_type,
        }
    }
}

impl MemoryArea for HardwareInterfaceControlArea {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    fn address(&self) -> u16 {
        HARDWARE_INTERFACE_ADDRESS
    }

    fn size(&self) -> u16 {
        view_size(self.memory_type)
    }

    fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult {
        let Some(configuration) = selected(&self.context) else {
            return Ok(());
        };
        let _guard = configuration.lock(Some(LOCK_TIMEOUT))?;

        page.set_bit(CONTROL, ENABLED_BIT, configuration.enabled.value());
        match configuration.kind() {
            HardwareInterfaceKind::Uart(uart) => {
                page.set_u32(UART_BAUD_RATE, uart.baud_rate.value());
                page.set_word(UART_DATA_BITS, uart.data_bits.value());
                page.set_word(UART_PARITY, u8::from(uart.parity.value()).into());
                page.set_word(UART_STOP_BITS, u8::from(uart.stop_bits.value()).into());
                page.set_word(
                    UART_FLOW_CONTROL,
                    u8::from(uart.flow_control.value()).into(),
                );
            }
            HardwareInterfaceKind::NetworkInterface(interface)
            | HardwareInterfaceKind::Ethernet(interface) => {
                let live = if uses_dhcp(&interface.network) {
                    configuration.network_status(Some(LOCK_TIMEOUT))?
                } else {
                    None
                };
                encode_network(page, &interface.network, live);
            }
            HardwareInterfaceKind::WiFiStation(station) => {
                let live = if uses_dhcp(&station.network) {
                    configuration.network_status(Some(LOCK_TIMEOUT))?
                } else {
                    None
                };
                encode_network(page, &station.network, live);
                page.set_text(WIFI_SSID, WIFI_SSID_SIZE, &station.ssid.value());
                page.fill(WIFI_PASSWORD, WIFI_PASSWORD_SIZE, 0xFF);
            }
            HardwareInterfaceKind::Generic(_) | HardwareInterfaceKind::UsbDeviceCdc(_) => {}
        }
        Ok(())
    }

    fn on_write(&self, page: &PageBuffer) -> MemoryAreaResult {
        let Some(configuration) = selected(&self.context) else {
            return Ok(());
        };
        let _guard = configuration.lock(Some(LOCK_TIMEOUT))?;

        update(&configuration.enabled, page.bit(CONTROL, ENABLED_BIT));
        match configuration.kind() {
            HardwareInterfaceKind::Uart(uart) => {
                update(&uart.baud_rate, page.u32(UART_BAUD_RATE));
                update(&uart.data_bits, page.word(UART_DATA_BITS));
                update_enum(&uart.parity, page.word(UART_PARITY));
                update_enum(&uart.stop_bits, page.word(UART_STOP_BITS));
                update_enum(&uart.flow_control, page.word(UART_FLOW_CONTROL));
            }
            HardwareInterfaceKind::NetworkInterface(interface)
            | HardwareInterfaceKind::Ethernet(interface) => {
                decode_network(page, &interface.network);
            }
            HardwareInterfaceKind::WiFiStation(station) => {
                decode_network(page, &station.network);
                update_text(&station.ssid, page.text(WIFI_SSID, WIFI_SSID_SIZE));
                // All 0xFF is what reads return, so it means "unchanged".
                if !page.is_filled(WIFI_PASSWORD, WIFI_PASSWORD_SIZE, 0xFF) {
                    update_text(
                        &station.password,
                        page.masked_text(WIFI_PASSWORD, WIFI_PASSWORD_SIZE),
                    );
                }
            }
            HardwareInterfaceKind::Generic(_) | HardwareInterfaceKind::UsbDeviceCdc(_) => {}
        }
        Ok(())
    }
}

/// Identity and live state of the selected hardware interface
pub struct HardwareInterfaceStatusArea {
    context: PageContext,
}

impl HardwareInterfaceStatusArea {
    pub fn new(context: PageContext) -> Self {
        Self { context }
    }
}

impl MemoryArea for HardwareInterfaceStatusArea {
    fn memory_type(&self) -> MemoryType {
        MemoryType::InputRegisters
    }

    fn address(&self) -> u16 {
        HARDWARE_INTERFACE_ADDRESS
    }

    fn size(&self) -> u16 {
        view_size(MemoryType::InputRegisters)
    }

    fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult {
        let Some(configuration) = selected(&self.context) else {
            return Ok(());
        };
        let _guard = configuration.lock(Some(LOCK_TIMEOUT))?;

        page.set_word(TYPE, configuration.interface_type().into());
        page.set_text(
            NAME,
            NAME_SIZE,
            &configuration.entity_name(Some(LOCK_TIMEOUT))?,
        );
        if let Some(live) = configuration.network_status(Some(LOCK_TIMEOUT))? {
            page.set_bit(STATUS, CONNECTED_BIT, live.connected);
            page.set_ipv6(IPV6_LINK_LOCAL_ADDRESS, live.ipv6_link_local_address);
        }
        Ok(())
    }
}
