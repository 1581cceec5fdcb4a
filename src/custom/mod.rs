//! The engine's own opcode implementations.
//!
//! These are consulted before the external provider and fully own operand
//! consumption for their instructions. By convention they are simple
//! single-instruction operations and never terminate the current block.

pub mod mutex;
pub mod stubs;
pub mod zone;

use std::collections::HashMap;

use crate::condition::ConditionSink;
use crate::error::ScriptError;
use crate::operand::GlobalStore;
use crate::script::Script;

pub use mutex::MutexStore;
pub use zone::{NoTouch, ZoneInput};

/// One engine-native instruction implementation.
///
/// A handler must consume exactly the operands it declares so the cursor
/// stays synchronized with the instruction stream.
pub trait CustomHandler: Send + Sync {
    fn call(&self, services: &mut Services, script: &mut Script) -> Result<(), ScriptError>;
}

/// Engine-owned state and capabilities that custom handlers execute
/// against.
pub struct Services {
    /// Shared variable table (also the backing store for scripts flagged
    /// to use shared storage).
    pub globals: GlobalStore,

    /// Keyed mutex-variable store, engine-wide, last-write-wins.
    pub mutex_vars: MutexStore,

    /// Touch-zone capability supplied by the embedder.
    pub zones: Box<dyn ZoneInput>,

    /// When set, conditional outcomes are delegated to the host instead of
    /// the script's own accumulator.
    pub condition_sink: Option<Box<dyn ConditionSink>>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            globals: GlobalStore::default(),
            mutex_vars: MutexStore::default(),
            zones: Box::new(NoTouch),
            condition_sink: None,
        }
    }
}

impl Services {
    /// Route a conditional outcome either to the host sink or to the
    /// script's own accumulator. Exactly one of the two paths runs.
    pub fn apply_condition(&mut self, script: &mut Script, raw: bool) {
        match self.condition_sink.as_mut() {
            Some(sink) => sink.apply_condition(script, raw),
            None => script.update_condition(raw),
        }
    }
}

/// Registry of custom opcode implementations, keyed by the 15-bit opcode.
#[derive(Default)]
pub struct CustomRegistry {
    handlers: HashMap<u16, Box<dyn CustomHandler>>,
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with every handler this engine ships: mutex variables,
    /// touch-zone queries and the structural stubs.
    pub fn standard() -> Self {
        let mut registry = Self::new();

        registry.register(mutex::SET_MUTEX_VAR, mutex::SetMutexVar);
        registry.register(mutex::GET_MUTEX_VAR, mutex::GetMutexVar);
        registry.register(zone::IS_ZONE_PRESSED, zone::IsZonePressed);
        registry.register(zone::GET_ZONE_STATE, zone::GetZoneState);
        stubs::register_all(&mut registry);

        registry
    }

    pub fn register(&mut self, opcode: u16, handler: impl CustomHandler + 'static) {
        if self.handlers.insert(opcode, Box::new(handler)).is_some() {
            log::warn!("replacing existing custom handler for opcode {opcode:#06x}");
        }
    }

    pub fn get(&self, opcode: u16) -> Option<&dyn CustomHandler> {
        self.handlers.get(&opcode).map(Box::as_ref)
    }

    pub fn contains(&self, opcode: u16) -> bool {
        self.handlers.contains_key(&opcode)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Opcodes with a registered handler, in no particular order.
    pub fn opcodes(&self) -> impl Iterator<Item = u16> + '_ {
        self.handlers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use crate::operand::TAG_I32;

    use super::*;

    /// Reports every zone as pressed.
    struct EveryZone;

    impl ZoneInput for EveryZone {
        fn test_zone(&self, _zone: u8) -> bool {
            true
        }
    }

    /// Records every raw flag it is handed.
    struct RecordingSink(Rc<RefCell<Vec<bool>>>);

    impl ConditionSink for RecordingSink {
        fn apply_condition(&mut self, _script: &mut Script, raw: bool) {
            self.0.borrow_mut().push(raw);
        }
    }

    fn zone_script(zone: i32) -> Script {
        let mut bytes = Vec::new();
        for value in [0, zone] {
            bytes.push(TAG_I32);
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        Script::from_bytes("s", bytes)
    }

    #[test]
    fn installed_sink_takes_the_condition_instead_of_the_script() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut services = Services {
            zones: Box::new(EveryZone),
            condition_sink: Some(Box::new(RecordingSink(Rc::clone(&seen)))),
            ..Services::default()
        };

        let mut script = zone_script(3);
        zone::IsZonePressed.call(&mut services, &mut script).unwrap();

        // The sink saw the raw flag and the script's own accumulator
        // never moved.
        assert_eq!(*seen.borrow(), vec![true]);
        assert!(!script.condition().result());
        assert!(script.condition().is_idle());
    }

    #[test]
    fn without_a_sink_the_script_accumulator_takes_the_condition() {
        let mut services = Services {
            zones: Box::new(EveryZone),
            ..Services::default()
        };

        let mut script = zone_script(3);
        zone::IsZonePressed.call(&mut services, &mut script).unwrap();

        assert!(script.condition().result());
    }

    #[test]
    fn standard_registry_covers_the_engine_opcode_set() {
        let registry = CustomRegistry::standard();

        for opcode in [
            mutex::SET_MUTEX_VAR,
            mutex::GET_MUTEX_VAR,
            zone::IS_ZONE_PRESSED,
            zone::GET_ZONE_STATE,
        ] {
            assert!(registry.contains(opcode), "missing {opcode:#06x}");
        }

        // All stubs present too.
        for opcode in stubs::STUB_OPCODES {
            assert!(registry.contains(opcode), "missing stub {opcode:#06x}");
        }
    }
}
