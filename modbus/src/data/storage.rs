use super::{helpers, MAX_DATA_SIZE};

use smallvec::SmallVec;

/// Inline payload buffer. Register words are kept in host byte order and
/// swapped to big-endian only when a frame is written.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStorage {
    buffer: SmallVec<[u8; MAX_DATA_SIZE]>,
}

impl DataStorage {
    pub fn raw(bytes: &[u8]) -> DataStorage {
        let len = std::cmp::min(bytes.len(), MAX_DATA_SIZE);
        DataStorage {
            buffer: SmallVec::from_slice(&bytes[..len]),
        }
    }

    pub fn raw_empty(size: usize) -> DataStorage {
        let mut buffer = SmallVec::new();
        buffer.resize(std::cmp::min(size, MAX_DATA_SIZE), 0);
        DataStorage { buffer }
    }

    /// Packs bits LSB first.
    pub fn coils(coils: &[bool]) -> DataStorage {
        let nobjs = std::cmp::min(coils.len(), MAX_DATA_SIZE * 8);
        let mut data = DataStorage::raw_empty(helpers::get_coils_len(nobjs as u16));
        helpers::pack_bits(&coils[..nobjs], data.get_mut());
        data
    }

    pub fn registers(registers: &[u16]) -> DataStorage {
        let nobjs = std::cmp::min(registers.len(), MAX_DATA_SIZE / 2);
        let mut buffer = SmallVec::new();
        for value in &registers[..nobjs] {
            buffer.extend_from_slice(&value.to_ne_bytes());
        }
        DataStorage { buffer }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn get(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn get_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[..]
    }

    pub fn get_u8(&self, idx: usize) -> Option<u8> {
        self.buffer.get(idx).copied()
    }

    pub fn get_bit(&self, idx: usize) -> Option<bool> {
        helpers::get_bit(self.get(), idx)
    }

    pub fn get_word_bit(&self, idx: usize) -> Option<bool> {
        helpers::get_word_bit(self.get(), idx)
    }

    pub fn get_u16(&self, idx: usize) -> Option<u16> {
        let start = idx * 2;
        let bytes = self.buffer.get(start..start + 2)?;
        Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }

    pub fn registers_count(&self) -> usize {
        self.len() / 2
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_coils() {
        let input = [true, false, false, false, true, false, false, false];

        let data = DataStorage::coils(&input[0..1]);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get_bit(0), Some(true));
        assert_eq!(data.get_u8(0), Some(0x1));
        assert!(data.get_u16(0).is_none());

        let data = DataStorage::coils(&input[..]);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get_u8(0), Some(0x1 | 0x10));
    }

    #[test]
    fn data_registers() {
        let input = [1u16, 2, 3, 0xFFFF];
        let data = DataStorage::registers(&input[..]);
        assert_eq!(data.len(), 8);
        assert_eq!(data.registers_count(), 4);
        assert_eq!(data.get_u16(0), Some(0x1));
        assert_eq!(data.get_u16(3), Some(0xFFFF));
        assert!(data.get_u16(4).is_none());
    }

    #[test]
    fn data_raw() {
        let data = DataStorage::raw(&[1u8, 2, 3, 4]);
        assert_eq!(data.len(), 4);
        assert_eq!(data.get_u8(1), Some(0x2));
        assert!(data.get_u8(4).is_none());

        let data = DataStorage::raw(&[0u8; 300]);
        assert_eq!(data.len(), MAX_DATA_SIZE);
    }
}
