use derive_more::{Display, Error};

use crate::buffer::PageBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MemoryType {
    #[display("coils")]
    Coils,
    #[display("discrete inputs")]
    DiscreteInputs,
    #[display("holding registers")]
    HoldingRegisters,
    #[display("input registers")]
    InputRegisters,
}

impl MemoryType {
    pub fn is_bit_view(self) -> bool {
        matches!(self, MemoryType::Coils | MemoryType::DiscreteInputs)
    }
}

#[derive(Debug, Display, Error)]
pub enum MemoryAreaError {
    /// A configuration or entity could not be locked in time
    #[display("memory area is busy")]
    InvalidState,
    #[display("no memory area covers {count} item(s) at address {address}")]
    IllegalAddress { address: u16, count: u16 },
    #[display("memory area is read-only")]
    ReadOnly,
    #[display("configuration failure: {_0}")]
    Configuration(blackbox_core::Error),
}

impl From<blackbox_core::Error> for MemoryAreaError {
    fn from(err: blackbox_core::Error) -> Self {
        match err {
            blackbox_core::Error::LockTimeout { .. } => MemoryAreaError::InvalidState,
            err => MemoryAreaError::Configuration(err),
        }
    }
}

pub type MemoryAreaResult<T = ()> = Result<T, MemoryAreaError>;

/// One (page, view) binding of the register map
///
/// `on_read` fills a zeroed page buffer, `on_write` consumes the page after the
/// written words have been overlaid on a fresh read.
pub trait MemoryArea: Send + Sync {
    fn memory_type(&self) -> MemoryType;

    /// First address, in words for register views and bits for bit views
    fn address(&self) -> u16;

    /// Length, in the same unit as [`MemoryArea::address`]
    fn size(&self) -> u16;

    fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult;

    fn on_write(&self, _page: &PageBuffer) -> MemoryAreaResult {
        Err(MemoryAreaError::ReadOnly)
    }

    fn contains(&self, address: u16, count: u16) -> bool {
        let start = u32::from(self.address());
        let end = start + u32::from(self.size());
        let first = u32::from(address);
        count > 0 && first >= start && first + u32::from(count) <= end
    }
}
