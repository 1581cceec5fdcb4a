//! Mutex-variable opcodes: a numeric key/value store shared by every
//! script in the engine, used by scripts to coordinate with each other.

use std::collections::HashMap;

use crate::error::ScriptError;
use crate::operand::{read_value_arg, read_value_args, read_variable_arg, Value};
use crate::script::Script;

use super::{CustomHandler, Services};

pub const SET_MUTEX_VAR: u16 = 0x0ddc;
pub const GET_MUTEX_VAR: u16 = 0x0ddd;

/// Engine-owned keyed store. Last write wins per key; insertion order is
/// irrelevant. Single-threaded by construction, so no locking.
#[derive(Debug, Default)]
pub struct MutexStore {
    vars: HashMap<u32, u32>,
}

impl MutexStore {
    pub fn set(&mut self, key: u32, value: u32) {
        self.vars.insert(key, value);
    }

    pub fn get(&self, key: u32) -> Option<u32> {
        self.vars.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// `set_mutex_var(key, value)`
pub struct SetMutexVar;

impl CustomHandler for SetMutexVar {
    fn call(&self, services: &mut Services, script: &mut Script) -> Result<(), ScriptError> {
        let args = read_value_args(script, &services.globals, 2)?;

        let key = args[0].as_int().unwrap_or(0) as u32;
        let value = args[1].as_int().unwrap_or(0) as u32;
        services.mutex_vars.set(key, value);
        Ok(())
    }
}

/// `get_mutex_var(destination, key)` writes the stored value into the
/// destination variable, or 0 when the key was never set.
pub struct GetMutexVar;

impl CustomHandler for GetMutexVar {
    fn call(&self, services: &mut Services, script: &mut Script) -> Result<(), ScriptError> {
        let destination = read_variable_arg(script)?;
        let key = read_value_arg(script, &services.globals)?
            .as_int()
            .unwrap_or(0) as u32;

        let value = services.mutex_vars.get(key).unwrap_or(0);
        script.write_var(destination, Value::Int(value as i32), &mut services.globals)
    }
}
