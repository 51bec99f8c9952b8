//! Register handlers of the three pages
//!
//! Each page has a control area (holding registers plus a coil view of the
//! low bits of its first word) and a read-only status area (input registers).

mod general;
mod hardware_interface;
mod server;

pub use general::{GeneralControlArea, GeneralStatusArea};
pub use hardware_interface::{HardwareInterfaceControlArea, HardwareInterfaceStatusArea};
pub use server::{ServerControlArea, ServerStatusArea};

use std::sync::{
    atomic::{AtomicU16, Ordering},
    Arc,
};

use blackbox_core::{BlackBox, ConfigurationParameter};

use crate::{
    area::MemoryType,
    layout::{PAGE_COILS, PAGE_WORDS},
};

/// Which hardware interface and server the per-entity pages project
#[derive(Debug, Default)]
pub struct SelectionCursors {
    hardware_interface: AtomicU16,
    server: AtomicU16,
}

impl SelectionCursors {
    pub fn hardware_interface(&self) -> u16 {
        self.hardware_interface.load(Ordering::SeqCst)
    }

    pub fn server(&self) -> u16 {
        self.server.load(Ordering::SeqCst)
    }

    pub fn select_hardware_interface(&self, index: u16, count: usize) -> u16 {
        select(&self.hardware_interface, index, count)
    }

    pub fn select_server(&self, index: u16, count: usize) -> u16 {
        select(&self.server, index, count)
    }
}

// Clamped to the last element; an empty collection leaves the cursor alone.
fn select(cursor: &AtomicU16, index: u16, count: usize) -> u16 {
    if count == 0 {
        return cursor.load(Ordering::SeqCst);
    }
    let last = u16::try_from(count - 1).unwrap_or(u16::MAX);
    let index = index.min(last);
    cursor.store(index, Ordering::SeqCst);
    index
}

/// State every page handler works against
#[derive(Clone)]
pub struct PageContext {
    pub black_box: Arc<BlackBox>,
    pub cursors: Arc<SelectionCursors>,
}

pub(crate) fn view_size(memory_type: MemoryType) -> u16 {
    if memory_type.is_bit_view() {
        PAGE_COILS
    } else {
        PAGE_WORDS
    }
}

/// Offer a decoded register value, dropping it if the validator says no
pub(crate) fn update<T>(parameter: &ConfigurationParameter<T>, value: T)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    if parameter.value() == value {
        return;
    }
    if let Err(err) = parameter.set_value(value) {
        log::debug!("Dropping register write: {err}");
    }
}

pub(crate) fn update_enum<T>(parameter: &ConfigurationParameter<T>, word: u16)
where
    T: TryFrom<u8> + Clone + PartialEq + Send + Sync + 'static,
{
    match u8::try_from(word).ok().and_then(|raw| T::try_from(raw).ok()) {
        Some(value) => update(parameter, value),
        None => log::debug!(
            "Dropping register write of {}: {word} is not a known value",
            parameter.key()
        ),
    }
}

pub(crate) fn update_u8(parameter: &ConfigurationParameter<u8>, word: u16) {
    match u8::try_from(word) {
        Ok(value) => update(parameter, value),
        Err(_) => log::debug!(
            "Dropping register write of {}: {word} does not fit a byte",
            parameter.key()
        ),
    }
}

pub(crate) fn update_text(parameter: &ConfigurationParameter<String>, text: Option<String>) {
    match text {
        Some(value) => update(parameter, value),
        None => log::debug!(
            "Dropping register write of {}: not valid UTF-8",
            parameter.key()
        ),
    }
}

pub(crate) fn saturating_count(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_clamped() {
        let cursors = SelectionCursors::default();
        assert_eq!(cursors.select_hardware_interface(5, 2), 1);
        assert_eq!(cursors.hardware_interface(), 1);

        assert_eq!(cursors.select_hardware_interface(7, 0), 1);
        assert_eq!(cursors.hardware_interface(), 1);

        assert_eq!(cursors.select_server(0, 3), 0);
        assert_eq!(cursors.server(), 0);
    }

    #[test]
    fn test_update_keeps_value_on_rejection() {
        let parameter = ConfigurationParameter::new("dataBits", 8u16);
        parameter.set_valid_values(vec![7, 8]);

        update(&parameter, 9);
        assert_eq!(parameter.value(), 8);
        update(&parameter, 7);
        assert_eq!(parameter.value(), 7);
    }

    #[test]
    fn test_update_u8_drops_wide_words() {
        let parameter = ConfigurationParameter::new("staAddress", 1u8);
        parameter.disable_value_validation();

        update_u8(&parameter, 300);
        assert_eq!(parameter.value(), 1);
        update_u8(&parameter, 17);
        assert_eq!(parameter.value(), 17);
    }
}
