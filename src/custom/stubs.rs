//! Structurally-satisfied stub opcodes.
//!
//! These instructions exist in the source opcode set but have no behaviour
//! in this engine (most poke at host process internals that a portable
//! runtime cannot reproduce). A stub still consumes its declared operands
//! so the cursor never desynchronizes; it just has no other effect. This
//! is deliberate policy, not missing work.

use crate::error::ScriptError;
use crate::operand::{read_value_args, read_variable_arg};
use crate::script::Script;

use super::{CustomHandler, CustomRegistry, Services};

pub const GET_LABEL_ADDRESS: u16 = 0x0dd0;
pub const GET_FUNCTION_ADDRESS_BY_NAME: u16 = 0x0dd1;
pub const CONTEXT_CALL_FUNCTION: u16 = 0x0dd2;
pub const CONTEXT_SET_REG: u16 = 0x0dd3;
pub const CONTEXT_GET_REG: u16 = 0x0dd4;
pub const GET_GAME_VERSION: u16 = 0x0dd6;
pub const GET_IMAGE_BASE: u16 = 0x0dd7;
pub const READ_MEMORY: u16 = 0x0dd8;
pub const WRITE_MEMORY: u16 = 0x0dd9;

/// Every stubbed opcode, in registration order.
pub const STUB_OPCODES: [u16; 9] = [
    GET_LABEL_ADDRESS,
    GET_FUNCTION_ADDRESS_BY_NAME,
    CONTEXT_CALL_FUNCTION,
    CONTEXT_SET_REG,
    CONTEXT_GET_REG,
    GET_GAME_VERSION,
    GET_IMAGE_BASE,
    READ_MEMORY,
    WRITE_MEMORY,
];

macro_rules! stub_opcode {
    ($handler:ident, $name:literal, values: $values:expr, dests: $dests:expr) => {
        pub struct $handler;

        impl CustomHandler for $handler {
            fn call(
                &self,
                services: &mut Services,
                script: &mut Script,
            ) -> Result<(), ScriptError> {
                // Operands must be consumed even without behaviour, or the
                // cursor would land inside this instruction's encoding.
                let _ = read_value_args(script, &services.globals, $values)?;
                for _ in 0..$dests {
                    let _ = read_variable_arg(script)?;
                }
                log::warn!(concat!($name, " is a stub"));
                Ok(())
            }
        }
    };
}

stub_opcode!(GetLabelAddress, "get_label_address", values: 1, dests: 1);
stub_opcode!(GetFunctionAddressByName, "get_function_address_by_name", values: 1, dests: 1);
stub_opcode!(ContextCallFunction, "context_call_function", values: 4, dests: 0);
stub_opcode!(ContextSetReg, "context_set_reg", values: 2, dests: 0);
stub_opcode!(ContextGetReg, "context_get_reg", values: 1, dests: 1);
stub_opcode!(GetGameVersion, "get_game_version", values: 0, dests: 1);
stub_opcode!(GetImageBase, "get_image_base", values: 0, dests: 1);
stub_opcode!(ReadMemory, "read_memory", values: 3, dests: 1);
stub_opcode!(WriteMemory, "write_memory", values: 4, dests: 0);

pub(super) fn register_all(registry: &mut CustomRegistry) {
    registry.register(GET_LABEL_ADDRESS, GetLabelAddress);
    registry.register(GET_FUNCTION_ADDRESS_BY_NAME, GetFunctionAddressByName);
    registry.register(CONTEXT_CALL_FUNCTION, ContextCallFunction);
    registry.register(CONTEXT_SET_REG, ContextSetReg);
    registry.register(CONTEXT_GET_REG, ContextGetReg);
    registry.register(GET_GAME_VERSION, GetGameVersion);
    registry.register(GET_IMAGE_BASE, GetImageBase);
    registry.register(READ_MEMORY, ReadMemory);
    registry.register(WRITE_MEMORY, WriteMemory);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::operand::{TAG_I32, TAG_LOCAL_VAR};

    use super::*;

    #[test]
    fn stubs_consume_exactly_their_declared_operands() {
        // read_memory: three values then one destination, followed by a
        // sentinel byte the stub must not touch.
        let mut bytes = Vec::new();
        for value in [0x1000, 4, 0] {
            bytes.push(TAG_I32);
            bytes.extend_from_slice(&(value as i32).to_le_bytes());
        }
        bytes.push(TAG_LOCAL_VAR);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.push(0x5a);

        let mut services = Services::default();
        let mut script = Script::from_bytes("s", bytes);
        ReadMemory.call(&mut services, &mut script).unwrap();

        assert_eq!(script.stream().remaining(), 1);
        assert_eq!(script.stream_mut().read_u8().unwrap(), 0x5a);
    }

    #[test]
    fn value_only_stub_leaves_no_trailing_operands() {
        let mut bytes = Vec::new();
        for value in [1, 2, 3, 4] {
            bytes.push(TAG_I32);
            bytes.extend_from_slice(&(value as i32).to_le_bytes());
        }

        let mut services = Services::default();
        let mut script = Script::from_bytes("s", bytes);
        WriteMemory.call(&mut services, &mut script).unwrap();
        assert_eq!(script.stream().remaining(), 0);
    }
}
