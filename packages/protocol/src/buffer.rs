use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};

use crate::layout::{PAGE_BYTES, PAGE_WORDS};

/// One page of the register map, built field by field
///
/// Field accessors take word offsets from [`crate::layout`] and panic when a
/// field does not fit inside the page, which only a wrong layout constant can
/// cause. Transport-facing ranges are validated by [`crate::MemoryMap`] first.
#[derive(Clone, PartialEq, Eq)]
pub struct PageBuffer {
    bytes: [u8; PAGE_BYTES],
}

impl Default for PageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBuffer")
            .field("bytes", &format_args!("{:02x?}", &self.bytes[..]))
            .finish()
    }
}

impl PageBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; PAGE_BYTES],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    fn range(offset: usize, len: usize) -> std::ops::Range<usize> {
        let start = offset * 2;
        start..start + len
    }

    pub fn word(&self, offset: usize) -> u16 {
        let range = Self::range(offset, 2);
        u16::from_le_bytes([self.bytes[range.start], self.bytes[range.start + 1]])
    }

    pub fn set_word(&mut self, offset: usize, value: u16) {
        let range = Self::range(offset, 2);
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
    }

    /// 32-bit value spanning `offset` and `offset + 1`
    pub fn u32(&self, offset: usize) -> u32 {
        let range = Self::range(offset, 4);
        let mut raw = [0; 4];
        raw.copy_from_slice(&self.bytes[range]);
        u32::from_le_bytes(raw)
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) {
        let range = Self::range(offset, 4);
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
    }

    pub fn bit(&self, offset: usize, bit: u8) -> bool {
        self.word(offset) & (1 << bit) != 0
    }

    pub fn set_bit(&mut self, offset: usize, bit: u8, value: bool) {
        let word = self.word(offset);
        let word = if value {
            word | (1 << bit)
        } else {
            word & !(1 << bit)
        };
        self.set_word(offset, word);
    }

    pub fn field(&self, offset: usize, size: usize) -> &[u8] {
        &self.bytes[Self::range(offset, size)]
    }

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes[Self::range(offset, bytes.len())].copy_from_slice(bytes);
    }

    pub fn fill(&mut self, offset: usize, size: usize, value: u8) {
        self.bytes[Self::range(offset, size)].fill(value);
    }

    pub fn is_filled(&self, offset: usize, size: usize, value: u8) -> bool {
        self.field(offset, size).iter().all(|byte| *byte == value)
    }

    /// Write text into a fixed-width field, truncated to `size` bytes on a
    /// character boundary
    pub fn set_text(&mut self, offset: usize, size: usize, value: &str) {
        let field = &mut self.bytes[Self::range(offset, size)];
        field.fill(0);
        let len = (0..=value.len().min(size))
            .rev()
            .find(|len| value.is_char_boundary(*len))
            .unwrap_or(0);
        field[..len].copy_from_slice(&value.as_bytes()[..len]);
    }

    fn text_until(&self, offset: usize, size: usize, terminators: &[u8]) -> Option<String> {
        let field = self.field(offset, size);
        let len = field
            .iter()
            .position(|byte| terminators.contains(byte))
            .unwrap_or(size);
        std::str::from_utf8(&field[..len]).ok().map(str::to_owned)
    }

    /// Text of a fixed-width field, up to the first zero byte or the field end
    ///
    /// `None` when the bytes are not valid UTF-8.
    pub fn text(&self, offset: usize, size: usize) -> Option<String> {
        self.text_until(offset, size, &[0])
    }

    /// Like [`PageBuffer::text`], also ending at the first 0xFF byte
    ///
    /// Write-only fields read back as 0xFF, so a partial write leaves the
    /// remainder of the field in that state.
    pub fn masked_text(&self, offset: usize, size: usize) -> Option<String> {
        self.text_until(offset, size, &[0, 0xFF])
    }

    pub fn ipv4(&self, offset: usize) -> Ipv4Addr {
        let mut octets = [0; 4];
        octets.copy_from_slice(self.field(offset, 4));
        Ipv4Addr::from(octets)
    }

    pub fn set_ipv4(&mut self, offset: usize, address: Ipv4Addr) {
        self.bytes[Self::range(offset, 4)].copy_from_slice(&address.octets());
    }

    pub fn ipv6(&self, offset: usize) -> Ipv6Addr {
        let mut octets = [0; 16];
        octets.copy_from_slice(self.field(offset, 16));
        Ipv6Addr::from(octets)
    }

    pub fn set_ipv6(&mut self, offset: usize, address: Ipv6Addr) {
        self.bytes[Self::range(offset, 16)].copy_from_slice(&address.octets());
    }

    /// Register view: `count` words starting at `offset`
    pub fn words(&self, offset: usize, count: usize) -> Vec<u16> {
        (offset..offset + count).map(|index| self.word(index)).collect()
    }

    pub fn set_words(&mut self, offset: usize, values: &[u16]) {
        for (index, value) in values.iter().enumerate() {
            self.set_word(offset + index, *value);
        }
    }

    /// Coil view: coil `n` is bit `n % 16` of word `n / 16`
    pub fn coil(&self, index: usize) -> bool {
        self.bit(index / 16, (index % 16) as u8)
    }

    pub fn set_coil(&mut self, index: usize, value: bool) {
        self.set_bit(index / 16, (index % 16) as u8, value);
    }
}

const _: () = assert!(PAGE_BYTES == PAGE_WORDS as usize * 2);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_are_little_endian() {
        let mut page = PageBuffer::new();
        page.set_word(1, 0x1234);
        page.set_u32(2, 115200);

        assert_eq!(&page.as_bytes()[2..4], &[0x34, 0x12]);
        assert_eq!(page.words(2, 2), vec![0xC200, 0x0001]);
        assert_eq!(page.u32(2), 115200);
    }

    #[test]
    fn test_text_is_trimmed_at_first_zero_or_field_end() {
        let mut page = PageBuffer::new();
        page.set_text(2, 32, "device");
        assert_eq!(page.text(2, 32).as_deref(), Some("device"));

        let long = "x".repeat(40);
        page.set_text(2, 32, &long);
        assert_eq!(page.text(2, 32), Some("x".repeat(32)));
        assert_eq!(page.word(18), 0);

        page.set_text(2, 32, "ab");
        assert_eq!(page.field(2, 4), b"ab\0\0");
    }

    #[test]
    fn test_truncated_text_keeps_whole_characters() {
        let mut page = PageBuffer::new();
        page.set_text(2, 4, "abcé");
        assert_eq!(page.field(2, 4), b"abc\0");
        assert_eq!(page.text(2, 4).as_deref(), Some("abc"));
    }

    #[test]
    fn test_invalid_utf8_text_is_rejected() {
        let mut page = PageBuffer::new();
        page.set_bytes(2, &[b'a', 0xC3, 0x28, 0]);
        assert_eq!(page.text(2, 4), None);
    }

    #[test]
    fn test_masked_text_stops_at_fill_byte() {
        let mut page = PageBuffer::new();
        page.fill(2, 16, 0xFF);
        page.set_bytes(2, b"secret12");

        assert_eq!(page.masked_text(2, 16).as_deref(), Some("secret12"));
        assert_eq!(page.text(2, 16), None);

        page.fill(2, 16, 0xFF);
        assert_eq!(page.masked_text(2, 16).as_deref(), Some(""));
    }

    #[test]
    fn test_addresses_are_stored_octet_by_octet() {
        let mut page = PageBuffer::new();
        page.set_ipv4(2, Ipv4Addr::new(8, 7, 6, 5));
        assert_eq!(page.field(2, 4), &[8, 7, 6, 5]);
        assert_eq!(page.u32(2), u32::from_le_bytes([8, 7, 6, 5]));

        let address: Ipv6Addr = "fe80::1".parse().unwrap();
        page.set_ipv6(8, address);
        assert_eq!(page.ipv6(8), address);
        assert_eq!(page.field(8, 2), &[0xfe, 0x80]);
    }

    #[test]
    fn test_coils_map_to_low_words() {
        let mut page = PageBuffer::new();
        page.set_coil(16, true);
        assert_eq!(page.word(1), 1);
        assert!(page.bit(1, 0));

        page.set_coil(1, true);
        assert_eq!(page.word(0), 2);
        page.set_coil(1, false);
        assert!(!page.is_zeroed());
        assert_eq!(page.word(0), 0);
    }
}
