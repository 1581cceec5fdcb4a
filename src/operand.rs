//! Operand decoding: the "argument reader" and "variable reader/writer"
//! primitives that custom handlers build on.
//!
//! Operands are tag-prefixed little-endian values. Each operand consumes
//! exactly its encoded width, regardless of its value, so a handler that
//! reads its declared operand count can never desynchronize the cursor.

use arrayvec::ArrayVec;

use crate::error::ScriptError;
use crate::script::Script;

/// i32 immediate.
pub const TAG_I32: u8 = 0x01;
/// Global (shared-table) variable reference, u16 index.
pub const TAG_GLOBAL_VAR: u8 = 0x02;
/// Local variable reference, u16 index.
pub const TAG_LOCAL_VAR: u8 = 0x03;
/// i8 immediate.
pub const TAG_I8: u8 = 0x04;
/// i16 immediate.
pub const TAG_I16: u8 = 0x05;
/// f32 immediate.
pub const TAG_F32: u8 = 0x06;
/// Length-prefixed string immediate.
pub const TAG_STRING: u8 = 0x0e;

/// Most operands a single handler may request in one call.
pub const MAX_ARGS: usize = 16;

/// Decoded operand values for one handler invocation.
pub type ArgBuffer = ArrayVec<Value, MAX_ARGS>;

/// A typed script value: operands decode to these, and local/shared
/// variable slots store them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    String(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

/// A reference to a writable variable slot, as encoded in the stream.
///
/// Whether a `Local` reference actually lands in the script's private
/// storage or in the shared table is decided by the script's storage flag;
/// see [`Script::read_var`] and [`Script::write_var`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Global(u16),
    Local(u16),
}

/// The engine-wide shared variable table.
///
/// This is explicit owned state, not a process singleton: two engines never
/// observe each other's globals.
#[derive(Debug, Default)]
pub struct GlobalStore {
    slots: Vec<Value>,
}

impl GlobalStore {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![Value::Int(0); len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&Value, ScriptError> {
        self.slots
            .get(index as usize)
            .ok_or(ScriptError::VariableOutOfRange {
                index,
                len: self.slots.len(),
            })
    }

    pub fn set(&mut self, index: u16, value: Value) -> Result<(), ScriptError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(ScriptError::VariableOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }
}

/// Decode one value operand, loading variable references through the
/// script's storage indirection.
pub fn read_value_arg(script: &mut Script, globals: &GlobalStore) -> Result<Value, ScriptError> {
    let offset = script.stream().cursor();
    let tag = script.stream_mut().read_u8()?;

    match tag {
        TAG_I32 => Ok(Value::Int(script.stream_mut().read_i32()?)),
        TAG_I8 => Ok(Value::Int(script.stream_mut().read_i8()? as i32)),
        TAG_I16 => Ok(Value::Int(script.stream_mut().read_i16()? as i32)),
        TAG_F32 => Ok(Value::Float(script.stream_mut().read_f32()?)),
        TAG_STRING => Ok(Value::String(script.stream_mut().read_string()?)),
        TAG_GLOBAL_VAR => {
            let index = script.stream_mut().read_u16()?;
            script.read_var(VarRef::Global(index), globals)
        }
        TAG_LOCAL_VAR => {
            let index = script.stream_mut().read_u16()?;
            script.read_var(VarRef::Local(index), globals)
        }
        other => Err(ScriptError::BadOperand { tag: other, offset }),
    }
}

/// Decode `count` value operands into an argument buffer.
pub fn read_value_args(
    script: &mut Script,
    globals: &GlobalStore,
    count: usize,
) -> Result<ArgBuffer, ScriptError> {
    if count > MAX_ARGS {
        return Err(ScriptError::ArgumentOverflow {
            requested: count,
            limit: MAX_ARGS,
        });
    }

    let mut args = ArgBuffer::new();
    for _ in 0..count {
        args.push(read_value_arg(script, globals)?);
    }
    Ok(args)
}

/// Decode an operand that must be a variable reference, returning the slot
/// a handler may write its result into.
pub fn read_variable_arg(script: &mut Script) -> Result<VarRef, ScriptError> {
    let offset = script.stream().cursor();
    let tag = script.stream_mut().read_u8()?;

    match tag {
        TAG_GLOBAL_VAR => Ok(VarRef::Global(script.stream_mut().read_u16()?)),
        TAG_LOCAL_VAR => Ok(VarRef::Local(script.stream_mut().read_u16()?)),
        other => Err(ScriptError::BadOperand { tag: other, offset }),
    }
}
