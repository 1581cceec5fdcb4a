//! Error taxonomy for the script engine.
//!
//! Every variant here is fatal *for the script that raised it* and nothing
//! more: the scheduler converts these into a log line plus deactivation of
//! the offending script, and the remaining scripts keep running.

/// Errors raised while loading or executing a single script.
#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    /// No custom handler and the external provider returned nothing.
    #[error("no handler for opcode {opcode:#06x}")]
    UnresolvedOpcode { opcode: u16 },

    /// The cursor would advance past the end of the instruction buffer.
    #[error("instruction stream underrun: cursor=0x{cursor:X}, len=0x{len:X}")]
    StreamUnderrun { cursor: usize, len: usize },

    /// A jump tried to land outside the instruction buffer.
    #[error("jump target out of range: 0x{target:X}, len=0x{len:X}")]
    JumpOutOfRange { target: usize, len: usize },

    /// Call-style opcode exceeded the fixed return-address stack.
    #[error("call stack overflow (limit={limit})")]
    CallStackOverflow { limit: usize },

    /// Return-style opcode with no saved return address.
    #[error("call stack underflow")]
    CallStackUnderflow,

    /// A variable reference resolved past the end of its storage.
    #[error("variable index out of range: {index} (len={len})")]
    VariableOutOfRange { index: u16, len: usize },

    /// Unknown or unexpected operand type tag in the instruction stream.
    #[error("malformed operand tag {tag:#04x} at 0x{offset:X}")]
    BadOperand { tag: u8, offset: usize },

    /// A handler asked for more operands than the argument buffer holds.
    #[error("too many operands requested: {requested} (limit={limit})")]
    ArgumentOverflow { requested: usize, limit: usize },

    /// An external handler reported a failure of its own.
    #[error("handler failed for opcode {opcode:#06x}: {msg}")]
    HandlerFailed { opcode: u16, msg: String },
}
