//! A cooperative runtime for mission-script bytecode.
//!
//! Scripts are flat byte buffers of opcode words followed by tag-prefixed
//! operands. The [`Engine`] dispatches each instruction to either its own
//! [`custom`] opcode set or a host-supplied [`HandlerProvider`]; the
//! [`Scheduler`] advances a collection of scripts cooperatively, one
//! execution block per script per tick.
//!
//! The crate has no opinion about where bytecode comes from or what the
//! host's opcodes do. It owns the dispatch loop, the operand decoding, the
//! compound-condition state machine, the per-script wait/suspend model and
//! the engine-wide stores (shared variables, mutex variables).

pub mod condition;
pub mod custom;
pub mod engine;
pub mod error;
pub mod operand;
pub mod resolver;
pub mod scheduler;
pub mod script;
pub mod stream;
pub mod testing;

pub use condition::{ConditionAccumulator, ConditionSink};
pub use custom::{CustomHandler, CustomRegistry, MutexStore, NoTouch, Services, ZoneInput};
pub use engine::Engine;
pub use error::ScriptError;
pub use operand::{
    read_value_arg, read_value_args, read_variable_arg, ArgBuffer, GlobalStore, Value, VarRef,
};
pub use resolver::{ExecOutcome, HandlerProvider, NullProvider, Resolved, ScriptAlias};
pub use scheduler::Scheduler;
pub use script::{Script, ScriptTime};
pub use stream::InstructionStream;
