use std::sync::Arc;

use blackbox_core::{configuration::ServerKind, ServerConfiguration};

use super::{update, update_enum, update_u8, view_size, PageContext};
use crate::{
    area::{MemoryArea, MemoryAreaResult, MemoryType},
    buffer::PageBuffer,
    layout::{server::*, LOCK_TIMEOUT, NAME_SIZE, SERVER_ADDRESS},
};

fn selected(context: &PageContext) -> Option<Arc<ServerConfiguration>> {
    let index = usize::from(context.cursors.server());
    context.black_box.server_configuration(index)
}

/// Settings of the selected server
pub struct ServerControlArea {
    context: PageContext,
    memory_type: MemoryType,
}

impl ServerControlArea {
    pub fn new(context: PageContext, memory_type: MemoryType) -> Self {
        Self {
            context,
            memory_type,
        }
    }
}

impl MemoryArea for ServerControlArea {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    fn address(&self) -> u16 {
        SERVER_ADDRESS
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
            ServerKind::Network(network) | ServerKind::Http(network) | ServerKind::Mdns(network) => {
                page.set_word(PORT, network.port.value());
                page.set_word(MAX_CLIENTS, network.max_clients.value());
            }
            ServerKind::Modbus(modbus) => {
                page.set_word(MODBUS_PROTOCOL, u8::from(modbus.protocol.value()).into());
                page.set_word(MODBUS_STATION_ADDRESS, modbus.station_address.value().into());
                if modbus.network_transport().is_some() {
                    page.set_word(MODBUS_PORT, modbus.port.value());
                    page.set_word(MODBUS_MAX_CLIENTS, modbus.max_clients.value());
                }
            }
            ServerKind::Generic(_) | ServerKind::Stream(_) => {}
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
            ServerKind::Network(network) | ServerKind::Http(network) | ServerKind::Mdns(network) => {
                update(&network.port, page.word(PORT));
                update(&network.max_clients, page.word(MAX_CLIENTS));
            }
            ServerKind::Modbus(modbus) => {
                update_enum(&modbus.protocol, page.word(MODBUS_PROTOCOL));
                update_u8(&modbus.station_address, page.word(MODBUS_STATION_ADDRESS));
                if modbus.network_transport().is_some() {
                    update(&modbus.port, page.word(MODBUS_PORT));
                    update(&modbus.max_clients, page.word(MODBUS_MAX_CLIENTS));
                }
            }
            ServerKind::Generic(_) | ServerKind::Stream(_) => {}
        }
        Ok(())
    }
}

/// Identity of the selected server
pub struct ServerStatusArea {
    context: PageContext,
}

impl ServerStatusArea {
    pub fn new(context: PageContext) -> Self {
        Self { context }
    }
}

impl MemoryArea for ServerStatusArea {
    fn memory_type(&self) -> MemoryType {
        MemoryType::InputRegisters
    }

    fn address(&self) -> u16 {
        SERVER_ADDRESS
    }

    fn size(&self) -> u16 {
        view_size(MemoryType::InputRegisters)
    }

    fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult {
        let Some(configuration) = selected(&self.context) else {
            return Ok(());
        };
        let _guard = configuration.lock(Some(LOCK_TIMEOUT))?;

        page.set_word(TYPE, configuration.server_type().into());
        page.set_text(
            NAME,
            NAME_SIZE,
            &configuration.entity_name(Some(LOCK_TIMEOUT))?,
        );
        Ok(())
    }
}
