use std::sync::Arc;

use blackbox_core::BlackBox;

use crate::{
    area::MemoryType,
    map::MemoryMap,
    pages::{
        GeneralControlArea, GeneralStatusArea, HardwareInterfaceControlArea,
        HardwareInterfaceStatusArea, PageContext, SelectionCursors, ServerControlArea,
        ServerStatusArea,
    },
};

/// Exposes a [`BlackBox`] as a register map
///
/// Three pages (general, selected hardware interface, selected server) at word
/// addresses 0, 100 and 200, each with holding registers, a coil view of the
/// low four bits of the first word and input registers.
pub struct RegisterMapGateway {
    context: PageContext,
    memory_map: Arc<MemoryMap>,
}

impl RegisterMapGateway {
    pub fn new(black_box: Arc<BlackBox>) -> Self {
        let context = PageContext {
            black_box,
            cursors: Arc::new(SelectionCursors::default()),
        };
        let memory_map = MemoryMap::new();
        for view in [MemoryType::HoldingRegisters, MemoryType::Coils] {
            memory_map.add_area(Arc::new(GeneralControlArea::new(context.clone(), view)));
            memory_map.add_area(Arc::new(HardwareInterfaceControlArea::new(
                context.clone(),
                view,
            )));
            memory_map.add_area(Arc::new(ServerControlArea::new(context.clone(), view)));
        }
        memory_map.add_area(Arc::new(GeneralStatusArea::new(context.clone())));
        memory_map.add_area(Arc::new(HardwareInterfaceStatusArea::new(context.clone())));
        memory_map.add_area(Arc::new(ServerStatusArea::new(context.clone())));

        Self {
            context,
            memory_map: Arc::new(memory_map),
        }
    }

    pub fn memory_map(&self) -> &Arc<MemoryMap> {
        &self.memory_map
    }

    pub fn black_box(&self) -> &Arc<BlackBox> {
        &self.context.black_box
    }

    pub fn selected_hardware_interface(&self) -> u16 {
        self.context.cursors.hardware_interface()
    }

    pub fn selected_server(&self) -> u16 {
        self.context.cursors.server()
    }

    /// Clamped like a register write
    pub fn select_hardware_interface(&self, index: u16) -> u16 {
        let count = self.context.black_box.hardware_interface_count();
        self.context.cursors.select_hardware_interface(index, count)
    }

    pub fn select_server(&self, index: u16) -> u16 {
        let count = self.context.black_box.server_count();
        self.context.cursors.select_server(index, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        area::MemoryAreaError,
        layout::{general, HARDWARE_INTERFACE_ADDRESS, PAGE_WORDS, SERVER_ADDRESS},
    };
    use blackbox_core::{FirmwareInfo, Version};
    use blackbox_utils::{KeyValueStore, MemoryStore, Namespace, StoredValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway() -> (RegisterMapGateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let firmware = FirmwareInfo {
            name: "blackbox".to_string(),
            version: Version::new(1, 2, 3),
        };
        let black_box = Arc::new(BlackBox::new(store.clone(), firmware));
        black_box.set_restart_handler(|| {});
        (RegisterMapGateway::new(black_box), store)
    }

    fn name_words(name: &str) -> Vec<u16> {
        let mut bytes = name.as_bytes().to_vec();
        bytes.resize(32, 0);
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn test_status_page_identifies_the_map() {
        let (gateway, store) = gateway();
        store
            .write("plbbHwInfo", "name", StoredValue::Str("board".into()))
            .unwrap();
        store
            .write("plbbHwInfo", "verMajor", StoredValue::U16(4))
            .unwrap();

        let words = gateway
            .memory_map()
            .read_registers(MemoryType::InputRegisters, 0, PAGE_WORDS)
            .unwrap();
        let at = |offset: usize| words[offset];

        assert_eq!(at(general::STICKY_STATUS), 1);
        assert_eq!(
            [at(general::SIGNATURE), at(general::SIGNATURE + 1)],
            [u16::from_le_bytes(*b"PL"), u16::from_le_bytes(*b"BB")]
        );
        assert_eq!(at(general::VERSION), 1);
        assert_eq!(at(general::HARDWARE_NAME), u16::from_le_bytes(*b"bo"));
        assert_eq!(at(general::HARDWARE_VERSION), 4);
        assert_eq!(at(general::FIRMWARE_NAME), u16::from_le_bytes(*b"bl"));
        assert_eq!(
            &words[general::FIRMWARE_VERSION..general::FIRMWARE_VERSION + 3],
            &[1, 2, 3]
        );
        assert_eq!(at(general::HARDWARE_INTERFACE_COUNT), 0);
        assert_eq!(at(general::SERVER_COUNT), 0);
    }

    #[test]
    fn test_device_name_write_and_read_back() {
        let (gateway, _) = gateway();
        let map = gateway.memory_map();

        map.write_registers(general::DEVICE_NAME as u16, &name_words("press-7"))
            .unwrap();
        assert_eq!(gateway.black_box().device_name(), "press-7");
        assert_eq!(
            map.read_registers(MemoryType::HoldingRegisters, general::DEVICE_NAME as u16, 16)
                .unwrap(),
            name_words("press-7")
        );
        assert_eq!(
            map.read_registers(MemoryType::HoldingRegisters, 0, 2).unwrap(),
            vec![0, 0]
        );
    }

    #[test]
    fn test_clear_restarted_flag_register() {
        let (gateway, _) = gateway();
        let map = gateway.memory_map();

        // Only the command bits of word 0 have a coil view.
        assert!(matches!(
            map.write_coils(16, &[true]),
            Err(MemoryAreaError::IllegalAddress { address: 16, count: 1 })
        ));
        assert_eq!(map.read_bits(MemoryType::Coils, 0, 4).unwrap(), vec![false; 4]);
        assert!(gateway.black_box().restarted_flag());

        map.write_registers(general::FLAGS as u16, &[1]).unwrap();
        assert!(!gateway.black_box().restarted_flag());
        assert_eq!(
            map.read_registers(MemoryType::InputRegisters, general::STICKY_STATUS as u16, 1)
                .unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_save_command_persists_and_restart_runs_once() {
        let (gateway, store) = gateway();
        let restarts = Arc::new(AtomicUsize::new(0));
        let counter = restarts.clone();
        gateway.black_box().set_restart_handler(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        gateway.black_box().set_device_name("line-a");

        gateway.memory_map().write_registers(0, &[0b11]).unwrap();

        assert_eq!(restarts.load(Ordering::SeqCst), 1);
        let namespace = Namespace::new(store.as_ref(), "plbbConfig");
        assert_eq!(
            namespace.read_string("devName").unwrap().as_deref(),
            Some("line-a")
        );
    }

    #[test]
    fn test_empty_registry_pages_read_zero_and_ignore_writes() {
        let (gateway, _) = gateway();
        let map = gateway.memory_map();

        for (memory_type, address) in [
            (MemoryType::HoldingRegisters, HARDWARE_INTERFACE_ADDRESS),
            (MemoryType::InputRegisters, HARDWARE_INTERFACE_ADDRESS),
            (MemoryType::HoldingRegisters, SERVER_ADDRESS),
            (MemoryType::InputRegisters, SERVER_ADDRESS),
        ] {
            let words = map.read_registers(memory_type, address, PAGE_WORDS).unwrap();
            assert!(words.iter().all(|word| *word == 0));
        }
        map.write_registers(HARDWARE_INTERFACE_ADDRESS, &[1, 0, 7]).unwrap();
        map.write_registers(general::HARDWARE_INTERFACE_INDEX as u16, &[3, 3])
            .unwrap();
        assert_eq!(gateway.selected_hardware_interface(), 0);
        assert_eq!(gateway.selected_server(), 0);
    }

    #[test]
    fn test_writes_past_the_last_page_are_illegal() {
        let (gateway, _) = gateway();
        assert!(matches!(
            gateway.memory_map().write_registers(300, &[0]),
            Err(MemoryAreaError::IllegalAddress { .. })
        ));
    }
}
