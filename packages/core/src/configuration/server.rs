use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;

use blackbox_utils::{KeyValueStore, Namespace};

use super::{lock_within, Configuration, ServerType, ENABLED_KEY};
use crate::{
    drivers::{
        ModbusProtocol, ModbusServer, ModbusTransport, NetworkServer, Server, SharedModbusServer,
        SharedNetworkServer, SharedServer,
    },
    error::{Error, Result},
    parameter::ConfigurationParameter,
};

const PORT_KEY: &str = "port";
const MAX_CLIENTS_KEY: &str = "maxClients";

// Client limits are persisted as u32.
fn load_max_clients(parameter: &ConfigurationParameter<u16>, namespace: &Namespace) -> Result<()> {
    if let Some(value) = namespace.read_u32(MAX_CLIENTS_KEY)? {
        match u16::try_from(value) {
            Ok(value) => parameter.offer(namespace, value),
            Err(_) => log::warn!(
                "Ignoring stored value of {}/{}: {value} is out of range",
                namespace.name(),
                MAX_CLIENTS_KEY
            ),
        }
    }
    Ok(())
}

fn save_max_clients(parameter: &ConfigurationParameter<u16>, namespace: &Namespace) -> Result<()> {
    namespace.write_u32(MAX_CLIENTS_KEY, u32::from(parameter.value()))?;
    Ok(())
}

/// Port and client limit of servers listening on IP
pub struct NetworkServerConfiguration {
    pub port: ConfigurationParameter<u16>,
    pub max_clients: ConfigurationParameter<u16>,
    server: SharedNetworkServer,
}

impl NetworkServerConfiguration {
    fn new(server: SharedNetworkServer) -> Self {
        let (port, max_clients) = {
            let entity = server.lock();
            (entity.port(), entity.max_clients())
        };
        Self {
            port: ConfigurationParameter::new(PORT_KEY, port),
            max_clients: ConfigurationParameter::new(MAX_CLIENTS_KEY, max_clients),
            server,
        }
    }

    pub fn server(&self) -> &SharedNetworkServer {
        &self.server
    }

    fn load(&self, namespace: &Namespace) -> Result<()> {
        self.port.load(namespace)?;
        load_max_clients(&self.max_clients, namespace)
    }

    fn save(&self, namespace: &Namespace) -> Result<()> {
        self.port.save(namespace)?;
        save_max_clients(&self.max_clients, namespace)
    }

    fn apply_to<S: NetworkServer + ?Sized>(&self, entity: &mut S) -> anyhow::Result<()> {
        entity.set_port(self.port.value())?;
        entity.set_max_clients(self.max_clients.value())
    }

    pub fn disable_value_validation(&self) {
        self.port.disable_value_validation();
        self.max_clients.disable_value_validation();
    }
}

/// Modbus server settings
///
/// `port` and `max_clients` mirror the network transport underneath. They only
/// accept the transport's values at construction time and stay at zero, accepting
/// nothing, when the transport is a stream.
pub struct ModbusServerConfiguration {
    pub protocol: ConfigurationParameter<ModbusProtocol>,
    pub station_address: ConfigurationParameter<u8>,
    pub port: ConfigurationParameter<u16>,
    pub max_clients: ConfigurationParameter<u16>,
    server: SharedModbusServer,
    network_transport: Option<SharedNetworkServer>,
}

impl ModbusServerConfiguration {
    fn new(server: SharedModbusServer) -> Self {
        let (protocol, station_address, transport) = {
            let entity = server.lock();
            (
                entity.protocol(),
                entity.station_address(),
                entity.base_server(),
            )
        };
        let network_transport = match transport {
            Some(ModbusTransport::Network(transport)) => Some(transport),
            Some(ModbusTransport::Stream(_)) | None => None,
        };

        let port = ConfigurationParameter::new(PORT_KEY, 0);
        let max_clients = ConfigurationParameter::new(MAX_CLIENTS_KEY, 0);
        if let Some(transport) = &network_transport {
            let (live_port, live_max_clients) = {
                let entity = transport.lock();
                (entity.port(), entity.max_clients())
            };
            port.set_valid_values(vec![live_port]);
            max_clients.set_valid_values(vec![live_max_clients]);
            // Both values were just whitelisted.
            let _ = port.set_value(live_port);
            let _ = max_clients.set_value(live_max_clients);
        }

        Self {
            protocol: ConfigurationParameter::new("protocol", protocol),
            station_address: ConfigurationParameter::new("staAddress", station_address),
            port,
            max_clients,
            server,
            network_transport,
        }
    }

    pub fn server(&self) -> &SharedModbusServer {
        &self.server
    }

    pub fn network_transport(&self) -> Option<&SharedNetworkServer> {
        self.network_transport.as_ref()
    }

    fn load(&self, namespace: &Namespace) -> Result<()> {
        self.protocol.load(namespace)?;
        self.station_address.load(namespace)?;
        if self.network_transport.is_some() {
            self.port.load(namespace)?;
            load_max_clients(&self.max_clients, namespace)?;
        }
        Ok(())
    }

    fn save(&self, namespace: &Namespace) -> Result<()> {
        self.protocol.save(namespace)?;
        self.station_address.save(namespace)?;
        self.port.save(namespace)?;
        save_max_clients(&self.max_clients, namespace)
    }

    fn apply_to<M: ModbusServer + ?Sized>(&self, entity: &mut M) -> anyhow::Result<()> {
        entity.set_protocol(self.protocol.value())?;
        entity.set_station_address(self.station_address.value())?;
        if let Some(transport) = &self.network_transport {
            let mut transport = transport.lock();
            transport.set_port(self.port.value())?;
            transport.set_max_clients(self.max_clients.value())?;
        }
        Ok(())
    }

    /// Opens protocol and station address; the transport mirror stays pinned
    pub fn disable_value_validation(&self) {
        self.protocol.disable_value_validation();
        self.station_address.disable_value_validation();
    }
}

/// Type-specific part of a server configuration
pub enum ServerKind {
    Generic(SharedServer),
    Stream(SharedServer),
    Network(NetworkServerConfiguration),
    Http(NetworkServerConfiguration),
    Mdns(NetworkServerConfiguration),
    Modbus(ModbusServerConfiguration),
}

impl ServerKind {
    /// Modbus servers are classified by their transport before anything else.
    pub fn server_type(&self) -> ServerType {
        match self {
            ServerKind::Modbus(configuration) if configuration.network_transport.is_some() => {
                ServerType::NetworkModbusServer
            }
            ServerKind::Modbus(_) => ServerType::StreamModbusServer,
            ServerKind::Http(_) => ServerType::HttpServer,
            ServerKind::Mdns(_) => ServerType::MdnsServer,
            ServerKind::Network(_) => ServerType::NetworkServer,
            ServerKind::Stream(_) => ServerType::StreamServer,
            ServerKind::Generic(_) => ServerType::Unknown,
        }
    }

    /// Port/client-limit body, for kinds that carry one
    pub fn network(&self) -> Option<&NetworkServerConfiguration> {
        match self {
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => Some(configuration),
            _ => None,
        }
    }

    fn is_entity_enabled(&self) -> bool {
        match self {
            ServerKind::Generic(entity) | ServerKind::Stream(entity) => entity.lock().is_enabled(),
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => configuration.server.lock().is_enabled(),
            ServerKind::Modbus(configuration) => configuration.server.lock().is_enabled(),
        }
    }
}

fn switch<S: Server + ?Sized>(entity: &mut S, enabled: bool) -> anyhow::Result<()> {
    if enabled {
        entity.enable()
    } else {
        entity.disable()
    }
}

pub struct ServerConfiguration {
    namespace: String,
    lock: Mutex<()>,
    pub enabled: ConfigurationParameter<bool>,
    kind: ServerKind,
}

impl ServerConfiguration {
    fn with_kind(namespace: impl Into<String>, kind: ServerKind) -> Self {
        let enabled = ConfigurationParameter::new(ENABLED_KEY, kind.is_entity_enabled());
        Self {
            namespace: namespace.into(),
            lock: Mutex::new(()),
            enabled,
            kind,
        }
    }

    pub fn generic(server: SharedServer, namespace: impl Into<String>) -> Self {
        Self::with_kind(namespace, ServerKind::Generic(server))
    }

    pub fn stream(server: SharedServer, namespace: impl Into<String>) -> Self {
        Self::with_kind(namespace, ServerKind::Stream(server))
    }

    pub fn network(server: SharedNetworkServer, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            ServerKind::Network(NetworkServerConfiguration::new(server)),
        )
    }

    pub fn http(server: SharedNetworkServer, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            ServerKind::Http(NetworkServerConfiguration::new(server)),
        )
    }

    pub fn mdns(server: SharedNetworkServer, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            ServerKind::Mdns(NetworkServerConfiguration::new(server)),
        )
    }

    pub fn modbus(server: SharedModbusServer, namespace: impl Into<String>) -> Self {
        Self::with_kind(
            namespace,
            ServerKind::Modbus(ModbusServerConfiguration::new(server)),
        )
    }

    pub fn kind(&self) -> &ServerKind {
        &self.kind
    }

    pub fn server_type(&self) -> ServerType {
        self.kind.server_type()
    }

    pub fn lock(&self, timeout: Option<Duration>) -> Result<MutexGuard<'_, ()>> {
        lock_within(&self.lock, timeout, &self.namespace)
    }

    /// Name reported by the live server
    pub fn entity_name(&self, timeout: Option<Duration>) -> Result<String> {
        let target = &self.namespace;
        Ok(match &self.kind {
            ServerKind::Generic(entity) | ServerKind::Stream(entity) => {
                lock_within(entity, timeout, target)?.name()
            }
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => {
                lock_within(&configuration.server, timeout, target)?.name()
            }
            ServerKind::Modbus(configuration) => {
                lock_within(&configuration.server, timeout, target)?.name()
            }
        })
    }

    pub fn disable_value_validation(&self) {
        self.enabled.disable_value_validation();
        match &self.kind {
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => configuration.disable_value_validation(),
            ServerKind::Modbus(configuration) => configuration.disable_value_validation(),
            ServerKind::Generic(_) | ServerKind::Stream(_) => {}
        }
    }

    fn push_to_entity(&self) -> anyhow::Result<()> {
        let enabled = self.enabled.value();
        match &self.kind {
            ServerKind::Generic(entity) | ServerKind::Stream(entity) => {
                switch(&mut *entity.lock(), enabled)
            }
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => {
                let mut entity = configuration.server.lock();
                configuration.apply_to(&mut *entity)?;
                switch(&mut *entity, enabled)
            }
            ServerKind::Modbus(configuration) => {
                let mut entity = configuration.server.lock();
                configuration.apply_to(&mut *entity)?;
                switch(&mut *entity, enabled)
            }
        }
    }
}

impl Configuration for ServerConfiguration {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn load(&self, store: &dyn KeyValueStore) -> Result<()> {
        let _guard = self.lock.lock();
        let namespace = Namespace::new(store, &self.namespace);
        match &self.kind {
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => configuration.load(&namespace)?,
            ServerKind::Modbus(configuration) => configuration.load(&namespace)?,
            ServerKind::Generic(_) | ServerKind::Stream(_) => {}
        }
        self.enabled.load(&namespace)
    }

    fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        self.save_within(store, None)
    }

    fn save_within(&self, store: &dyn KeyValueStore, timeout: Option<Duration>) -> Result<()> {
        let _guard = self.lock(timeout)?;
        let namespace = Namespace::new(store, &self.namespace);
        match &self.kind {
            ServerKind::Network(configuration)
            | ServerKind::Http(configuration)
            | ServerKind::Mdns(configuration) => configuration.save(&namespace)?,
            ServerKind::Modbus(configuration) => configuration.save(&namespace)?,
            ServerKind::Generic(_) | ServerKind::Stream(_) => {}
        }
        self.enabled.save(&namespace)
    }

    fn apply(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.push_to_entity()
            .map_err(|err| Error::driver(self.namespace.clone(), err))?;
        log::debug!(
            "Applied {} configuration {} (enabled: {})",
            self.server_type(),
            self.namespace,
            self.enabled.value()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Journal, MockModbusServer, MockTcpServer};
    use blackbox_utils::MemoryStore;

    #[test]
    fn test_modbus_type_follows_transport() {
        let journal = Journal::default();
        let tcp = MockTcpServer::shared(&journal, 502);

        let network = ServerConfiguration::modbus(
            MockModbusServer::shared(&journal, Some(ModbusTransport::Network(tcp.clone()))),
            "nwMbSrv",
        );
        let stream = ServerConfiguration::modbus(
            MockModbusServer::shared(&journal, Some(ModbusTransport::Stream(tcp))),
            "uartMbSrv",
        );
        let detached = ServerConfiguration::modbus(MockModbusServer::shared(&journal, None), "x");

        assert_eq!(network.server_type(), ServerType::NetworkModbusServer);
        assert_eq!(stream.server_type(), ServerType::StreamModbusServer);
        assert_eq!(detached.server_type(), ServerType::StreamModbusServer);
    }

    #[test]
    fn test_modbus_port_is_pinned_to_network_transport() {
        let journal = Journal::default();
        let tcp = MockTcpServer::shared(&journal, 502);
        let configuration = ServerConfiguration::modbus(
            MockModbusServer::shared(&journal, Some(ModbusTransport::Network(tcp))),
            "nwMbSrv",
        );
        configuration.disable_value_validation();
        let ServerKind::Modbus(modbus) = configuration.kind() else {
            panic!("expected modbus kind");
        };

        assert_eq!(modbus.port.value(), 502);
        assert_eq!(modbus.max_clients.value(), 4);
        assert!(modbus.port.set_value(503).is_err());
        assert!(modbus.port.set_value(502).is_ok());
        assert!(modbus.station_address.set_value(17).is_ok());
    }

    #[test]
    fn test_modbus_port_is_inert_on_stream_transport() {
        let journal = Journal::default();
        let configuration = ServerConfiguration::modbus(
            MockModbusServer::shared(&journal, None),
            "uartMbSrv",
        );
        configuration.disable_value_validation();
        let ServerKind::Modbus(modbus) = configuration.kind() else {
            panic!("expected modbus kind");
        };

        assert_eq!(modbus.port.value(), 0);
        assert!(modbus.port.set_value(0).is_err());
        assert!(modbus.max_clients.set_value(1).is_err());

        configuration.apply().unwrap();
        let journal = journal.lock();
        assert!(!journal.contains(&"port".to_string()));
    }

    #[test]
    fn test_modbus_apply_disables_after_fields() {
        let journal = Journal::default();
        let tcp = MockTcpServer::shared(&journal, 502);
        let entity = MockModbusServer::shared(&journal, Some(ModbusTransport::Network(tcp)));
        let configuration = ServerConfiguration::modbus(entity.clone(), "nwMbSrv");
        configuration.disable_value_validation();
        let ServerKind::Modbus(modbus) = configuration.kind() else {
            panic!("expected modbus kind");
        };
        modbus.protocol.set_value(ModbusProtocol::Ascii).unwrap();
        modbus.station_address.set_value(8).unwrap();
        configuration.enabled.set_value(false).unwrap();

        configuration.apply().unwrap();

        assert_eq!(
            *journal.lock(),
            vec!["protocol", "station_address", "port", "max_clients", "disable"]
        );
        let entity = entity.lock();
        assert!(!entity.enabled);
        assert_eq!(entity.protocol, ModbusProtocol::Ascii);
        assert_eq!(entity.station_address, 8);
    }

    #[test]
    fn test_network_server_round_trip_keeps_client_limit_width() {
        let journal = Journal::default();
        let store = MemoryStore::new();

        let saved = ServerConfiguration::http(MockTcpServer::shared(&journal, 80), "http");
        saved.disable_value_validation();
        let network = saved.kind().network().unwrap();
        network.port.set_value(8080).unwrap();
        network.max_clients.set_value(12).unwrap();
        saved.save(&store).unwrap();

        assert_eq!(
            Namespace::new(&store, "http").read_u32(MAX_CLIENTS_KEY).unwrap(),
            Some(12)
        );

        let loaded = ServerConfiguration::http(MockTcpServer::shared(&journal, 80), "http");
        loaded.disable_value_validation();
        loaded.load(&store).unwrap();
        let network = loaded.kind().network().unwrap();
        assert_eq!(network.port.value(), 8080);
        assert_eq!(network.max_clients.value(), 12);
        assert_eq!(loaded.server_type(), ServerType::HttpServer);
    }
}
