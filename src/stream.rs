//! Read-only view over a loaded script's byte buffer with a single cursor.
//!
//! The cursor is the script's program counter: it starts at offset 0 and
//! advances monotonically as opcodes and operands are read, except where a
//! jump rewrites it. All reads are bounds-checked; running off the end of
//! the buffer is [`ScriptError::StreamUnderrun`], never a panic.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ScriptError;

/// A script's instruction buffer plus program counter.
#[derive(Debug, Clone, Default)]
pub struct InstructionStream {
    buffer: Vec<u8>,
    cursor: usize,
}

impl InstructionStream {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Move the cursor back to the first byte.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Rewrite the cursor to an absolute offset, validating bounds.
    pub fn jump(&mut self, target: usize) -> Result<(), ScriptError> {
        if target >= self.buffer.len() {
            return Err(ScriptError::JumpOutOfRange {
                target,
                len: self.buffer.len(),
            });
        }
        self.cursor = target;
        Ok(())
    }

    fn ensure(&self, need: usize) -> Result<(), ScriptError> {
        if self.cursor + need > self.buffer.len() {
            return Err(ScriptError::StreamUnderrun {
                cursor: self.cursor,
                len: self.buffer.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ScriptError> {
        self.ensure(1)?;
        let b = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(b)
    }

    pub fn read_i8(&mut self) -> Result<i8, ScriptError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, ScriptError> {
        self.ensure(2)?;
        let v = LittleEndian::read_u16(&self.buffer[self.cursor..self.cursor + 2]);
        self.cursor += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16, ScriptError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, ScriptError> {
        self.ensure(4)?;
        let v = LittleEndian::read_u32(&self.buffer[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32, ScriptError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32, ScriptError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a length-prefixed string (u8 length, then that many bytes).
    /// A NUL terminator inside the payload ends the string early.
    pub fn read_string(&mut self) -> Result<String, ScriptError> {
        let len = self.read_u8()? as usize;
        self.ensure(len)?;
        let raw = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;

        let text = raw
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| *b as char)
            .collect();
        Ok(text)
    }
}
