//! Touch-zone query opcodes.
//!
//! The zone layout itself (screen regions, input tracking) belongs to the
//! embedder; the engine only consumes it through [`ZoneInput`]. Valid zone
//! indices are strictly 1..=9; anything else is logged and reads as "not
//! pressed", never an error.

use crate::error::ScriptError;
use crate::operand::{read_value_args, read_variable_arg, ArgBuffer, Value};
use crate::script::Script;

use super::{CustomHandler, Services};

pub const IS_ZONE_PRESSED: u16 = 0x00e1;
pub const GET_ZONE_STATE: u16 = 0x0de0;

pub const ZONE_MIN: i32 = 1;
pub const ZONE_MAX: i32 = 9;

/// Touch-zone capability supplied by the embedder.
pub trait ZoneInput: Send + Sync {
    /// Whether the given zone (1..=9) is currently touched.
    fn test_zone(&self, zone: u8) -> bool;
}

/// Default capability: no touch input at all.
#[derive(Debug, Default)]
pub struct NoTouch;

impl ZoneInput for NoTouch {
    fn test_zone(&self, _zone: u8) -> bool {
        false
    }
}

/// Validate the zone index found at `index` in the argument buffer and
/// query it. Out-of-range indices read as false.
fn zone_state(services: &Services, args: &ArgBuffer, index: usize) -> bool {
    let zone = args.get(index).and_then(Value::as_int).unwrap_or(-1);

    if (ZONE_MIN..=ZONE_MAX).contains(&zone) {
        services.zones.test_zone(zone as u8)
    } else {
        log::warn!("ignoring invalid touch zone {zone}");
        false
    }
}

/// `is_zone_pressed(_, zone)` folds the zone's state through the
/// condition path, so the opcode's sign bit inverts it as usual.
pub struct IsZonePressed;

impl CustomHandler for IsZonePressed {
    fn call(&self, services: &mut Services, script: &mut Script) -> Result<(), ScriptError> {
        let args = read_value_args(script, &services.globals, 2)?;
        let state = zone_state(services, &args, 1);
        services.apply_condition(script, state);
        Ok(())
    }
}

/// `get_zone_state(destination, zone, _)` writes 1/0 into the
/// destination variable instead of touching the condition state.
pub struct GetZoneState;

impl CustomHandler for GetZoneState {
    fn call(&self, services: &mut Services, script: &mut Script) -> Result<(), ScriptError> {
        let destination = read_variable_arg(script)?;
        let args = read_value_args(script, &services.globals, 2)?;
        let state = zone_state(services, &args, 0);
        script.write_var(destination, Value::Int(state as i32), &mut services.globals)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::operand::{VarRef, TAG_I32, TAG_LOCAL_VAR};

    use super::*;

    /// Reports a fixed set of zones as pressed.
    pub(crate) struct FixedZones(pub &'static [u8]);

    impl ZoneInput for FixedZones {
        fn test_zone(&self, zone: u8) -> bool {
            self.0.contains(&zone)
        }
    }

    fn int_arg(bytes: &mut Vec<u8>, value: i32) {
        bytes.push(TAG_I32);
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn pressed_script(zone: i32) -> Script {
        let mut bytes = Vec::new();
        int_arg(&mut bytes, 0); // unused first operand
        int_arg(&mut bytes, zone);
        Script::from_bytes("s", bytes)
    }

    #[test]
    fn pressed_zone_sets_the_condition_flag() {
        let mut services = Services {
            zones: Box::new(FixedZones(&[5])),
            ..Services::default()
        };

        let mut script = pressed_script(5);
        IsZonePressed.call(&mut services, &mut script).unwrap();
        assert!(script.condition().result());

        let mut script = pressed_script(6);
        IsZonePressed.call(&mut services, &mut script).unwrap();
        assert!(!script.condition().result());
    }

    #[test]
    fn zone_indices_0_and_10_read_as_false() {
        // Both boundaries are invalid: the valid range is strictly 1..=9.
        let mut services = Services {
            zones: Box::new(FixedZones(&[1, 2, 3, 4, 5, 6, 7, 8, 9])),
            ..Services::default()
        };

        for zone in [0, 10] {
            let mut script = pressed_script(zone);
            IsZonePressed.call(&mut services, &mut script).unwrap();
            assert!(!script.condition().result(), "zone {zone} must read false");
        }
    }

    #[test]
    fn get_zone_state_writes_into_the_destination_variable() {
        let mut services = Services {
            zones: Box::new(FixedZones(&[2])),
            ..Services::default()
        };

        let mut bytes = Vec::new();
        bytes.push(TAG_LOCAL_VAR);
        bytes.extend_from_slice(&4u16.to_le_bytes());
        int_arg(&mut bytes, 2); // zone operand comes first here
        int_arg(&mut bytes, 0);

        let mut script = Script::from_bytes("s", bytes);
        GetZoneState.call(&mut services, &mut script).unwrap();

        assert_eq!(
            script
                .read_var(VarRef::Local(4), &services.globals)
                .unwrap(),
            Value::Int(1)
        );
        // The condition state is untouched by the variable-writing form.
        assert!(!script.condition().result());
    }

    #[test]
    fn inverted_opcode_word_negates_the_query() {
        let mut services = Services::default(); // nothing pressed

        let mut script = pressed_script(3);
        script.set_invert_return(true);
        IsZonePressed.call(&mut services, &mut script).unwrap();
        assert!(script.condition().result());
    }
}
