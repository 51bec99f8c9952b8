use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::{
    area::{MemoryArea, MemoryAreaError, MemoryAreaResult, MemoryType},
    buffer::PageBuffer,
};

/// Dispatches transport requests to the memory areas that cover them
///
/// Every request gets its own page buffer. Writes run read-modify-write under a
/// map-wide write lock so two partial writes to one page cannot interleave.
#[derive(Default)]
pub struct MemoryMap {
    areas: RwLock<Vec<Arc<dyn MemoryArea>>>,
    write_lock: Mutex<()>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_area(&self, area: Arc<dyn MemoryArea>) {
        log::debug!(
            "Registering {} area at {} ({} items)",
            area.memory_type(),
            area.address(),
            area.size()
        );
        self.areas.write().push(area);
    }

    pub fn areas(&self) -> Vec<Arc<dyn MemoryArea>> {
        self.areas.read().clone()
    }

    fn find(
        &self,
        memory_type: MemoryType,
        address: u16,
        count: u16,
    ) -> MemoryAreaResult<(Arc<dyn MemoryArea>, usize)> {
        let area = self
            .areas
            .read()
            .iter()
            .find(|area| area.memory_type() == memory_type && area.contains(address, count))
            .cloned()
            .ok_or(MemoryAreaError::IllegalAddress { address, count })?;
        let offset = usize::from(address - area.address());
        Ok((area, offset))
    }

    fn read_page(area: &dyn MemoryArea) -> MemoryAreaResult<PageBuffer> {
        let mut page = PageBuffer::new();
        area.on_read(&mut page)?;
        Ok(page)
    }

    fn count_of(address: u16, len: usize) -> MemoryAreaResult<u16> {
        u16::try_from(len).map_err(|_| MemoryAreaError::IllegalAddress {
            address,
            count: u16::MAX,
        })
    }

    /// Read `count` words of a register view
    pub fn read_registers(
        &self,
        memory_type: MemoryType,
        address: u16,
        count: u16,
    ) -> MemoryAreaResult<Vec<u16>> {
        let (area, offset) = self.find(memory_type, address, count)?;
        let page = Self::read_page(&*area)?;
        Ok(page.words(offset, usize::from(count)))
    }

    /// Read `count` bits of a bit view
    pub fn read_bits(
        &self,
        memory_type: MemoryType,
        address: u16,
        count: u16,
    ) -> MemoryAreaResult<Vec<bool>> {
        let (area, offset) = self.find(memory_type, address, count)?;
        let page = Self::read_page(&*area)?;
        Ok((offset..offset + usize::from(count))
            .map(|index| page.coil(index))
            .collect())
    }

    pub fn write_registers(&self, address: u16, values: &[u16]) -> MemoryAreaResult {
        let count = Self::count_of(address, values.len())?;
        let (area, offset) = self.find(MemoryType::HoldingRegisters, address, count)?;

        let _guard = self.write_lock.lock();
        let mut page = Self::read_page(&*area)?;
        page.set_words(offset, values);
        area.on_write(&page)
    }

    pub fn write_coils(&self, address: u16, values: &[bool]) -> MemoryAreaResult {
        let count = Self::count_of(address, values.len())?;
        let (area, offset) = self.find(MemoryType::Coils, address, count)?;

        let _guard = self.write_lock.lock();
        let mut page = Self::read_page(&*area)?;
        for (index, value) in values.iter().enumerate() {
            page.set_coil(offset + index, *value);
        }
        area.on_write(&page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scratch {
        memory_type: MemoryType,
        address: u16,
        size: u16,
        page: Mutex<PageBuffer>,
        writes: Mutex<usize>,
    }

    impl Scratch {
        fn new(memory_type: MemoryType, address: u16, size: u16) -> Arc<Self> {
            Arc::new(Self {
                memory_type,
                address,
                size,
                page: Mutex::new(PageBuffer::new()),
                writes: Mutex::new(0),
            })
        }
    }

    impl MemoryArea for Scratch {
        fn memory_type(&self) -> MemoryType {
            self.memory_type
        }

        fn address(&self) -> u16 {
            self.address
        }

        fn size(&self) -> u16 {
            self.size
        }

        fn on_read(&self, page: &mut PageBuffer) -> MemoryAreaResult {
            *page = self.page.lock().clone();
            Ok(())
        }

        fn on_write(&self, page: &PageBuffer) -> MemoryAreaResult {
            if self.memory_type == MemoryType::InputRegisters {
                return Err(MemoryAreaError::ReadOnly);
            }
            *self.page.lock() = page.clone();
            *self.writes.lock() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_partial_write_keeps_other_words() {
        let map = MemoryMap::new();
        let area = Scratch::new(MemoryType::HoldingRegisters, 100, 100);
        area.page.lock().set_word(0, 0xAAAA);
        area.page.lock().set_word(5, 0x5555);
        map.add_area(area.clone());

        map.write_registers(103, &[1, 2]).unwrap();

        let page = area.page.lock();
        assert_eq!(page.word(0), 0xAAAA);
        assert_eq!(page.words(3, 3), vec![1, 2, 0x5555]);
        drop(page);
        assert_eq!(map.read_registers(MemoryType::HoldingRegisters, 103, 2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_requests_must_fit_one_area() {
        let map = MemoryMap::new();
        map.add_area(Scratch::new(MemoryType::HoldingRegisters, 0, 100));
        map.add_area(Scratch::new(MemoryType::HoldingRegisters, 100, 100));

        assert!(matches!(
            map.read_registers(MemoryType::HoldingRegisters, 99, 2),
            Err(MemoryAreaError::IllegalAddress { address: 99, count: 2 })
        ));
        assert!(map.read_registers(MemoryType::HoldingRegisters, 100, 100).is_ok());
        assert!(matches!(
            map.read_registers(MemoryType::HoldingRegisters, 100, 0),
            Err(MemoryAreaError::IllegalAddress { .. })
        ));
        assert!(matches!(
            map.read_registers(MemoryType::InputRegisters, 0, 1),
            Err(MemoryAreaError::IllegalAddress { .. })
        ));
        assert!(matches!(
            map.write_registers(200, &[0]),
            Err(MemoryAreaError::IllegalAddress { .. })
        ));
    }

    #[test]
    fn test_coil_writes_touch_single_bits() {
        let map = MemoryMap::new();
        let area = Scratch::new(MemoryType::Coils, 100, 4);
        area.page.lock().set_word(0, 0x8000);
        map.add_area(area.clone());

        map.write_coils(101, &[true]).unwrap();
        assert_eq!(area.page.lock().word(0), 0x8002);
        assert_eq!(
            map.read_bits(MemoryType::Coils, 100, 3).unwrap(),
            vec![false, true, false]
        );
        assert!(map.write_coils(102, &[true; 3]).is_err());
        assert_eq!(*area.writes.lock(), 1);
    }

    #[test]
    fn test_register_writes_only_reach_holding_registers() {
        let map = MemoryMap::new();
        let inputs = Scratch::new(MemoryType::InputRegisters, 0, 100);
        let holdings = Scratch::new(MemoryType::HoldingRegisters, 0, 100);
        map.add_area(inputs.clone());
        map.add_area(holdings.clone());

        map.write_registers(0, &[1]).unwrap();
        assert_eq!(*inputs.writes.lock(), 0);
        assert_eq!(*holdings.writes.lock(), 1);
        assert_eq!(map.areas().len(), 2);
    }
}
