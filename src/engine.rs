//! The dispatch loop: fetch, resolve, execute.

use crate::custom::{CustomRegistry, Services};
use crate::error::ScriptError;
use crate::resolver::{ExecOutcome, HandlerProvider};
use crate::script::Script;

/// The interpreter core: custom registry, external provider and the
/// engine-owned services that custom handlers run against.
pub struct Engine {
    custom: CustomRegistry,
    provider: Box<dyn HandlerProvider>,
    pub services: Services,
}

impl Engine {
    /// An engine with the standard custom opcode set.
    pub fn new(provider: impl HandlerProvider + 'static) -> Self {
        Self::with_registry(CustomRegistry::standard(), provider)
    }

    pub fn with_registry(custom: CustomRegistry, provider: impl HandlerProvider + 'static) -> Self {
        Self {
            custom,
            provider: Box::new(provider),
            services: Services::default(),
        }
    }

    pub fn custom_registry(&self) -> &CustomRegistry {
        &self.custom
    }

    pub fn custom_registry_mut(&mut self) -> &mut CustomRegistry {
        &mut self.custom
    }

    /// Run one execution slice: instructions execute back to back until a
    /// handler signals the end of the block (typically a wait). This is
    /// the script's only suspension point; there is no preemption.
    pub fn run_block(&mut self, script: &mut Script) -> Result<(), ScriptError> {
        while self.run_next_instruction(script)? == ExecOutcome::Continue {}
        Ok(())
    }

    /// Fetch and execute a single instruction.
    pub fn run_next_instruction(&mut self, script: &mut Script) -> Result<ExecOutcome, ScriptError> {
        let word = script.stream_mut().read_u16()?;

        // The sign bit asks for the conditional result to be inverted; the
        // operation itself does not change.
        let opcode = word & 0x7fff;
        script.set_invert_return(word & 0x8000 != 0);

        // Custom handlers own the whole instruction and never end the
        // block; a hit here means the provider is not consulted at all.
        if let Some(handler) = self.custom.get(opcode) {
            handler.call(&mut self.services, script)?;
            return Ok(ExecOutcome::Continue);
        }

        let resolved = self
            .provider
            .resolve(opcode)
            .ok_or(ScriptError::UnresolvedOpcode { opcode })?;

        // `resolved` (alias included) goes back to the provider untouched.
        self.provider
            .execute(&resolved, script, opcode)
            .map_err(|e| ScriptError::HandlerFailed {
                opcode,
                msg: format!("{e:#}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::custom::mutex::SET_MUTEX_VAR;
    use crate::resolver::NullProvider;
    use crate::testing::BytecodeWriter;

    use super::*;

    #[test]
    fn opcode_word_splits_into_opcode_and_invert_bit() {
        let mut engine = Engine::new(NullProvider);

        let bytes = BytecodeWriter::new()
            .op(SET_MUTEX_VAR | 0x8000)
            .int_arg(1)
            .int_arg(2)
            .finish();
        let mut script = Script::from_bytes("s", bytes);

        engine.run_next_instruction(&mut script).unwrap();
        assert!(script.invert_return());
        assert_eq!(engine.services.mutex_vars.get(1), Some(2));
    }

    #[test]
    fn missing_handler_is_an_unresolved_opcode() {
        let mut engine = Engine::new(NullProvider);
        let bytes = BytecodeWriter::new().op(0x0123).finish();
        let mut script = Script::from_bytes("s", bytes);

        assert!(matches!(
            engine.run_next_instruction(&mut script),
            Err(ScriptError::UnresolvedOpcode { opcode: 0x0123 })
        ));
    }

    #[test]
    fn running_off_the_buffer_end_underruns() {
        let mut engine = Engine::new(NullProvider);
        let mut script = Script::from_bytes("s", vec![0x01]);

        assert!(matches!(
            engine.run_next_instruction(&mut script),
            Err(ScriptError::StreamUnderrun { .. })
        ));
    }
}
