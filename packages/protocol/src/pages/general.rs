use blackbox_core::Version;

use super::{saturating_count, view_size, PageContext};
use crate::{
    area::{MemoryArea, MemoryAreaResult, MemoryType},
    buffer::PageBuffer,
    layout::{
        self, general::*, GENERAL_ADDRESS, LOCK_TIMEOUT, MEMORY_MAP_VERSION, NAME_SIZE,
    },
};

fn set_version(page: &mut PageBuffer, offset: usize, version: Version) {
    page.set_words(offset, &[version.major, version.minor, version.patch]);
}

/// Device name, selection cursors and device commands
pub struct GeneralControlArea {
    context: PageContext,
    memory_type: MemoryType,
}

impl GeneralControlArea {
    pub fn new(context: PageContext, memory_type: MemoryType) -> Self {
        Self {
            context,
            memory_type,
        }
    }
}

impl MemoryArea for GeneralControlArea {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    fn address(&self) -> u16 {
        GENERAL_ADDRESS
    }

    fn size(&self) -> u16 {
        view_size(self.memory_type)
    }

    // Command words always read back as zero.
    fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult {
        let PageContext { black_box, cursors } = &self.context;
        page.set_text(DEVICE_NAME, NAME_SIZE, &black_box.device_name());
        page.set_word(HARDWARE_INTERFACE_INDEX, cursors.hardware_interface());
        page.set_word(SERVER_INDEX, cursors.server());
        Ok(())
    }

    fn on_write(&self, page: &PageBuffer) -> MemoryAreaResult {
        let PageContext { black_box, cursors } = &self.context;

        // A failed save is reported after the rest of the page, restart included.
        let saved = if page.bit(COMMAND, SAVE_BIT) {
            log::info!("Save command received over the register map");
            black_box.save_all_configurations_within(Some(LOCK_TIMEOUT))
        } else {
            Ok(())
        };

        if page.bit(FLAGS, CLEAR_RESTARTED_BIT) {
            black_box.clear_restarted_flag();
        }

        match page.text(DEVICE_NAME, NAME_SIZE) {
            Some(name) if name != black_box.device_name() => {
                log::info!("Device name set to {name:?}");
                black_box.set_device_name(name);
            }
            Some(_) => {}
            None => log::debug!("Ignoring device name that is not valid UTF-8"),
        }

        cursors.select_hardware_interface(
            page.word(HARDWARE_INTERFACE_INDEX),
            black_box.hardware_interface_count(),
        );
        cursors.select_server(page.word(SERVER_INDEX), black_box.server_count());

        if page.bit(COMMAND, RESTART_BIT) {
            black_box.restart();
        }
        Ok(saved?)
    }
}

/// Identity and counters of the device
pub struct GeneralStatusArea {
    context: PageContext,
}

impl GeneralStatusArea {
    pub fn new(context: PageContext) -> Self {
        Self { context }
    }
}

impl MemoryArea for GeneralStatusArea {
    fn memory_type(&self) -> MemoryType {
        MemoryType::InputRegisters
    }

    fn address(&self) -> u16 {
        GENERAL_ADDRESS
    }

    fn size(&self) -> u16 {
        view_size(MemoryType::InputRegisters)
    }

    fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult {
        let black_box = &self.context.black_box;

        page.set_bit(STICKY_STATUS, RESTARTED_BIT, black_box.restarted_flag());
        page.set_bytes(SIGNATURE, &layout::SIGNATURE);
        page.set_word(VERSION, MEMORY_MAP_VERSION);

        let hardware = black_box.hardware_info()?;
        page.set_text(HARDWARE_NAME, NAME_SIZE, &hardware.name);
        set_version(page, HARDWARE_VERSION, hardware.version);
        page.set_text(HARDWARE_UID, NAME_SIZE, &hardware.uid);

        let firmware = black_box.firmware_info();
        page.set_text(FIRMWARE_NAME, NAME_SIZE, &firmware.name);
        set_version(page, FIRMWARE_VERSION, firmware.version);

        page.set_word(
            HARDWARE_INTERFACE_COUNT,
            saturating_count(black_box.hardware_interface_count()),
        );
        page.set_word(SERVER_COUNT, saturating_count(black_box.server_count()));
        Ok(())
    }
}
