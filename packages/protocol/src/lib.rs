//! Register map of the BlackBox configuration plane
//!
//! The [`RegisterMapGateway`] projects a [`blackbox_core::BlackBox`] onto three
//! fixed pages of Modbus-addressable memory. [`transport::process_frame`] serves
//! RTU or TCP frames from it.

pub mod area;
pub mod buffer;
pub mod gateway;
pub mod layout;
pub mod map;
pub mod pages;
pub mod transport;

pub use area::{MemoryArea, MemoryAreaError, MemoryAreaResult, MemoryType};
pub use buffer::PageBuffer;
pub use gateway::RegisterMapGateway;
pub use map::MemoryMap;
pub use pages::SelectionCursors;
pub use transport::process_frame;
