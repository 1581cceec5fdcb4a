//! In-crate test harness: a bytecode assembler and a scripted provider
//! standing in for a real host opcode table.
//!
//! These live in the crate proper (not under `#[cfg(test)]`) so the
//! integration tests in `tests/` can drive the engine without a host.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use crate::operand::{
    read_value_arg, GlobalStore, TAG_F32, TAG_GLOBAL_VAR, TAG_I16, TAG_I32, TAG_I8, TAG_LOCAL_VAR,
    TAG_STRING,
};
use crate::resolver::{ExecOutcome, HandlerProvider, Resolved, EXTERNAL_TABLE_LIMIT};
use crate::script::{Script, ScriptTime};

/// Builds instruction buffers the way a compiler would emit them: opcode
/// words and tag-prefixed operands, all little-endian.
#[derive(Debug, Default)]
pub struct BytecodeWriter {
    bytes: Vec<u8>,
}

impl BytecodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an opcode word, sign bit included if the caller set one.
    pub fn op(mut self, word: u16) -> Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, word);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub fn int_arg(mut self, value: i32) -> Self {
        self.bytes.push(TAG_I32);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn byte_arg(mut self, value: i8) -> Self {
        self.bytes.push(TAG_I8);
        self.bytes.push(value as u8);
        self
    }

    pub fn short_arg(mut self, value: i16) -> Self {
        self.bytes.push(TAG_I16);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn float_arg(mut self, value: f32) -> Self {
        self.bytes.push(TAG_F32);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn string_arg(mut self, value: &str) -> Self {
        self.bytes.push(TAG_STRING);
        self.bytes.push(value.len() as u8);
        self.bytes.extend_from_slice(value.as_bytes());
        self
    }

    pub fn global_arg(mut self, index: u16) -> Self {
        self.bytes.push(TAG_GLOBAL_VAR);
        self.bytes.extend_from_slice(&index.to_le_bytes());
        self
    }

    pub fn local_arg(mut self, index: u16) -> Self {
        self.bytes.push(TAG_LOCAL_VAR);
        self.bytes.extend_from_slice(&index.to_le_bytes());
        self
    }

    /// Append raw bytes, for deliberately malformed streams.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// `wait(ms)`: sleep, end the block.
pub const OP_WAIT: u16 = 0x0001;
/// `terminate()`: deactivate, end the block.
pub const OP_TERMINATE: u16 = 0x004e;
/// `if(param)`: open a compound condition from the encoded parameter.
pub const OP_IF: u16 = 0x00d6;
/// `cond(value)`: a conditional whose raw outcome is its argument's
/// truthiness, folded through the script's accumulator.
pub const OP_COND: u16 = 0x0100;

const DEFAULT_HANDLER: u32 = u32::MAX;
const ALIAS_SEED: u64 = 0x5ead_0000;

/// A small scripted stand-in for a host opcode table.
///
/// It knows four concrete opcodes and, like the historical tables, routes
/// everything at or above [`EXTERNAL_TABLE_LIMIT`] to one default handler
/// (a no-op that keeps the block running). Default-handler resolutions
/// carry an alias, and execution checks it came back unmodified.
pub struct TableProvider {
    /// The clock `wait` adds its delay to. A real host reads its own
    /// timer; here the tests drive it by hand through [`clock`](Self::clock).
    clock: Arc<AtomicU32>,
    resolve_calls: Arc<AtomicUsize>,
    /// Empty on purpose: this provider's opcodes take immediates only.
    scratch: GlobalStore,
}

impl TableProvider {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(AtomicU32::new(0)),
            resolve_calls: Arc::new(AtomicUsize::new(0)),
            scratch: GlobalStore::default(),
        }
    }

    pub fn set_now(&self, now: ScriptTime) {
        self.clock.store(now, Ordering::Relaxed);
    }

    /// Shared handle to the provider's clock, usable after the provider
    /// has been boxed into an engine.
    pub fn clock(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.clock)
    }

    /// Shared counter of [`resolve`](HandlerProvider::resolve) calls, for
    /// asserting that custom opcodes never reach the provider.
    pub fn resolve_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resolve_calls)
    }

    fn alias_for(opcode: u16) -> u64 {
        ALIAS_SEED | opcode as u64
    }
}

impl Default for TableProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerProvider for TableProvider {
    fn resolve(&self, opcode: u16) -> Option<Resolved> {
        self.resolve_calls.fetch_add(1, Ordering::Relaxed);

        match opcode {
            OP_WAIT | OP_TERMINATE | OP_IF | OP_COND => Some(Resolved {
                handler: opcode as u32,
                alias: None,
            }),
            _ if opcode >= EXTERNAL_TABLE_LIMIT => Some(Resolved {
                handler: DEFAULT_HANDLER,
                alias: Some(Self::alias_for(opcode)),
            }),
            _ => None,
        }
    }

    fn execute(
        &mut self,
        resolved: &Resolved,
        script: &mut Script,
        opcode: u16,
    ) -> anyhow::Result<ExecOutcome> {
        if resolved.handler == DEFAULT_HANDLER {
            // The alias attached at resolution must come back untouched.
            anyhow::ensure!(
                resolved.alias == Some(Self::alias_for(opcode)),
                "alias for opcode {opcode:#06x} was modified in transit: {:?}",
                resolved.alias
            );
            return Ok(ExecOutcome::Continue);
        }

        match opcode {
            OP_WAIT => {
                let delay = read_value_arg(script, &self.scratch)?
                    .as_int()
                    .unwrap_or(0)
                    .max(0) as ScriptTime;
                let now = self.clock.load(Ordering::Relaxed);
                script.sleep_until(now.saturating_add(delay));
                Ok(ExecOutcome::BlockDone)
            }
            OP_TERMINATE => {
                script.deactivate();
                Ok(ExecOutcome::BlockDone)
            }
            OP_IF => {
                let param = read_value_arg(script, &self.scratch)?.as_int().unwrap_or(0);
                script.condition_mut().begin_encoded(param as u8);
                Ok(ExecOutcome::Continue)
            }
            OP_COND => {
                let raw = read_value_arg(script, &self.scratch)?.truthy();
                script.update_condition(raw);
                Ok(ExecOutcome::Continue)
            }
            other => anyhow::bail!("no table entry for opcode {other:#06x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn writer_emits_little_endian_words_and_tagged_operands() {
        let bytes = BytecodeWriter::new()
            .op(0x8001)
            .int_arg(258)
            .string_arg("hi")
            .finish();

        assert_eq!(
            bytes,
            vec![0x01, 0x80, TAG_I32, 0x02, 0x01, 0, 0, TAG_STRING, 2, b'h', b'i']
        );
    }

    #[test]
    fn provider_resolves_its_table_and_the_default_band() {
        let provider = TableProvider::new();

        assert!(provider.resolve(OP_WAIT).is_some());
        assert!(provider.resolve(0x0200).is_none());

        let above = provider.resolve(EXTERNAL_TABLE_LIMIT).unwrap();
        assert_eq!(above.handler, DEFAULT_HANDLER);
        assert!(above.alias.is_some());

        assert_eq!(provider.resolve_calls().load(Ordering::Relaxed), 3);
    }

    #[test]
    fn wait_sleeps_relative_to_the_provider_clock() {
        let mut provider = TableProvider::new();
        provider.set_now(100);

        let bytes = BytecodeWriter::new().int_arg(30).finish();
        let mut script = Script::from_bytes("s", bytes);

        let resolved = provider.resolve(OP_WAIT).unwrap();
        let outcome = provider.execute(&resolved, &mut script, OP_WAIT).unwrap();

        assert_eq!(outcome, ExecOutcome::BlockDone);
        assert_eq!(script.activation_time(), 130);
    }

    #[test]
    fn tampered_alias_is_rejected() {
        let mut provider = TableProvider::new();
        let mut script = Script::from_bytes("s", vec![]);

        let mut resolved = provider.resolve(0x0b00).unwrap();
        resolved.alias = Some(0xdead_beef);

        assert!(provider.execute(&resolved, &mut script, 0x0b00).is_err());
    }
}
