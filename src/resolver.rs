//! Handler abstractions for opcode dispatch.
//!
//! Two handler sources exist: the engine's own custom registry (see
//! [`crate::custom`]) and an external provider owned by the host. The
//! custom registry is always consulted first; the provider is the fallback
//! for everything else. How the provider locates its handlers (computed
//! table offsets, a default handler above some threshold, host-ABI pointer
//! adjustment) is entirely its business; the engine only sees the
//! contract below.

use crate::script::Script;

/// What a handler tells the dispatch loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Keep executing instructions in the current block.
    Continue,
    /// The current execution slice is over; yield back to the scheduler.
    BlockDone,
}

/// Opaque alias value a provider may attach to a resolved handler.
///
/// Some hosts pass an address-adjusted view of the script structure to
/// their table handlers. The engine never inspects or modifies this value;
/// it only hands the whole [`Resolved`] entry back on execution.
pub type ScriptAlias = u64;

/// A provider's answer to a resolution query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Provider-specific handler key.
    pub handler: u32,
    /// Alias to pass back with the call, untouched.
    pub alias: Option<ScriptAlias>,
}

/// Conventional boundary of the host's computed handler table: opcodes at
/// or above this historically resolve to one shared default handler. Only
/// providers care about this value; the engine does not branch on it.
pub const EXTERNAL_TABLE_LIMIT: u16 = 0xa8c;

/// The host's native opcode table, seen from the engine side.
pub trait HandlerProvider {
    /// Map an opcode to a handler. `None` is fatal for the asking script.
    fn resolve(&self, opcode: u16) -> Option<Resolved>;

    /// Run a previously resolved handler. The zero/non-zero return of the
    /// host's native handlers maps onto [`ExecOutcome`].
    fn execute(
        &mut self,
        resolved: &Resolved,
        script: &mut Script,
        opcode: u16,
    ) -> anyhow::Result<ExecOutcome>;
}

/// A provider with no handlers at all. Useful for engines that run purely
/// on custom opcodes, and as the default in tests.
#[derive(Debug, Default)]
pub struct NullProvider;

impl HandlerProvider for NullProvider {
    fn resolve(&self, _opcode: u16) -> Option<Resolved> {
        None
    }

    fn execute(
        &mut self,
        _resolved: &Resolved,
        _script: &mut Script,
        opcode: u16,
    ) -> anyhow::Result<ExecOutcome> {
        anyhow::bail!("NullProvider cannot execute opcode {opcode:#06x}")
    }
}
