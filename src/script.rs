//! One loaded script program and its runtime state.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use arrayvec::ArrayVec;

use crate::condition::ConditionAccumulator;
use crate::error::ScriptError;
use crate::operand::{GlobalStore, Value, VarRef};
use crate::stream::InstructionStream;

/// Engine time. Monotonically non-decreasing; supplied by the embedder.
pub type ScriptTime = u32;

/// Fixed capacity of the call/return-address stack.
pub const CALL_STACK_LIMIT: usize = 8;

/// Number of private local variable slots per script.
pub const LOCAL_COUNT: usize = 40;

static ANON_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fallback name for scripts loaded from anonymous byte sources. A script
/// keeps this name until something renames it.
fn anonymous_name() -> String {
    format!("magic{}", ANON_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Where a variable reference actually lands after the storage flag is
/// taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Private(u16),
    Shared(u16),
}

/// A loaded script: instruction stream, call stack, local storage,
/// condition state and scheduling state.
///
/// The script exclusively owns its instruction buffer and call stack; the
/// scheduler exclusively owns the collection of scripts.
#[derive(Debug)]
pub struct Script {
    name: String,
    stream: InstructionStream,
    call_stack: ArrayVec<usize, CALL_STACK_LIMIT>,
    locals: Vec<Value>,

    /// When set, `Local` variable references resolve into the engine-wide
    /// shared table instead of the private slots.
    uses_shared_storage: bool,

    condition: ConditionAccumulator,

    /// Sign bit of the opcode word currently being executed. Overwritten
    /// on every fetch, so it can never leak into the next instruction.
    invert_return: bool,

    activation_time: ScriptTime,
    active: bool,
}

impl Script {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            stream: InstructionStream::new(bytes),
            call_stack: ArrayVec::new(),
            locals: vec![Value::Int(0); LOCAL_COUNT],
            uses_shared_storage: false,
            condition: ConditionAccumulator::default(),
            invert_return: false,
            activation_time: 0,
            active: true,
        }
    }

    /// Load a script file. The logical name is the file stem, with a
    /// generated fallback when the path has none.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("reading script {}", path.display()))?;

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_owned)
            .unwrap_or_else(anonymous_name);

        log::info!("loaded script '{}' ({} bytes)", name, bytes.len());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream(&self) -> &InstructionStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut InstructionStream {
        &mut self.stream
    }

    pub fn condition(&self) -> &ConditionAccumulator {
        &self.condition
    }

    pub fn condition_mut(&mut self) -> &mut ConditionAccumulator {
        &mut self.condition
    }

    pub fn invert_return(&self) -> bool {
        self.invert_return
    }

    pub(crate) fn set_invert_return(&mut self, invert: bool) {
        self.invert_return = invert;
    }

    /// Fold a conditional instruction's raw outcome through the script's
    /// own accumulator, honouring the captured invert flag.
    pub fn update_condition(&mut self, raw: bool) {
        let invert = self.invert_return;
        self.condition.update(invert, raw);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mark the script dead. Takes effect at the next scheduler pass.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn activation_time(&self) -> ScriptTime {
        self.activation_time
    }

    /// Defer the script's next execution slice until `time`.
    pub fn sleep_until(&mut self, time: ScriptTime) {
        self.activation_time = time;
    }

    pub fn uses_shared_storage(&self) -> bool {
        self.uses_shared_storage
    }

    /// Switch `Local` variable references between private slots and the
    /// shared table.
    pub fn set_shared_storage(&mut self, shared: bool) {
        self.uses_shared_storage = shared;
    }

    /// Push a return address for a call-style opcode.
    pub fn push_return_address(&mut self, address: usize) -> Result<(), ScriptError> {
        self.call_stack
            .try_push(address)
            .map_err(|_| ScriptError::CallStackOverflow {
                limit: CALL_STACK_LIMIT,
            })
    }

    /// Pop the return address for a return-style opcode.
    pub fn pop_return_address(&mut self) -> Result<usize, ScriptError> {
        self.call_stack.pop().ok_or(ScriptError::CallStackUnderflow)
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// The single indirection through which every variable reference
    /// resolves; this is where the shared-storage flag takes effect.
    fn resolve_slot(&self, var: VarRef) -> Slot {
        match var {
            VarRef::Global(index) => Slot::Shared(index),
            VarRef::Local(index) if self.uses_shared_storage => Slot::Shared(index),
            VarRef::Local(index) => Slot::Private(index),
        }
    }

    pub fn read_var(&self, var: VarRef, globals: &GlobalStore) -> Result<Value, ScriptError> {
        match self.resolve_slot(var) {
            Slot::Shared(index) => globals.get(index).cloned(),
            Slot::Private(index) => self
                .locals
                .get(index as usize)
                .cloned()
                .ok_or(ScriptError::VariableOutOfRange {
                    index,
                    len: self.locals.len(),
                }),
        }
    }

    pub fn write_var(
        &mut self,
        var: VarRef,
        value: Value,
        globals: &mut GlobalStore,
    ) -> Result<(), ScriptError> {
        match self.resolve_slot(var) {
            Slot::Shared(index) => globals.set(index, value),
            Slot::Private(index) => {
                let len = self.locals.len();
                let slot = self
                    .locals
                    .get_mut(index as usize)
                    .ok_or(ScriptError::VariableOutOfRange { index, len })?;
                *slot = value;
                Ok(())
            }
        }
    }

    /// Return the script to its freshly-loaded state without touching the
    /// instruction buffer.
    pub fn reset(&mut self) {
        self.stream.rewind();
        self.call_stack.clear();
        self.locals.fill(Value::Int(0));
        self.condition.reset();
        self.invert_return = false;
        self.activation_time = 0;
        self.active = true;
    }
}
