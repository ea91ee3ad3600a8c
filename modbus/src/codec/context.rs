use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Buf;
use std::io::{Cursor, Write};

pub(crate) struct ReadCtx<'a> {
    pub buffer: &'a [u8],
    pub cursor: Cursor<&'a [u8]>,
}

impl<'a> ReadCtx<'a> {
    pub fn new(buffer: &'a [u8]) -> ReadCtx<'a> {
        ReadCtx {
            buffer,
            cursor: Cursor::new(buffer),
        }
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.cursor.read_u8().ok()
    }

    pub fn read_u16_be(&mut self) -> Option<u16> {
        self.cursor.read_u16::<BigEndian>().ok()
    }

    pub fn read_bytes(&mut self, size: usize) -> Option<&'a [u8]> {
        self.is_enough(size)?;
        let start = self.processed();
        self.cursor.advance(size);
        Some(&self.buffer[start..start + size])
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn processed(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn is_enough(&self, size: usize) -> Option<bool> {
        if self.remaining() >= size {
            Some(true)
        } else {
            None
        }
    }
}

pub(crate) struct WriteCtx<'a> {
    pub cursor: Cursor<&'a mut [u8]>,
}

impl<'a> WriteCtx<'a> {
    pub fn new(buffer: &'a mut [u8]) -> WriteCtx<'a> {
        WriteCtx {
            cursor: Cursor::new(buffer),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Option<()> {
        self.cursor.write_u8(value).ok()
    }

    pub fn write_u16_be(&mut self, value: u16) -> Option<()> {
        self.cursor.write_u16::<BigEndian>(value).ok()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Option<()> {
        self.is_enough(bytes.len())?;
        self.cursor.write_all(bytes).ok()
    }

    /// Host-order words to big-endian.
    pub fn write_data_u16_be(&mut self, values: &[u8]) -> Option<()> {
        if values.len() % 2 != 0 {
            return None;
        }
        for pair in values.chunks_exact(2) {
            let value = u16::from_ne_bytes([pair[0], pair[1]]);
            self.cursor.write_u16::<BigEndian>(value).ok()?;
        }
        Some(())
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.processed()
    }

    pub fn processed(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn buffer(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn is_enough(&self, size: usize) -> Option<bool> {
        if self.remaining() >= size {
            Some(true)
        } else {
            None
        }
    }
}
