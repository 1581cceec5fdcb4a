//! Compound `IF` condition accumulator.
//!
//! The source bytecode expresses `IF a AND b AND c` (or the `OR` form) as a
//! sequence of independent conditional instructions. Each one reports a raw
//! boolean, and this state machine folds them into the single result that
//! later branch instructions test.
//!
//! The numeric bands are part of the on-disk encoding and are reproduced
//! exactly: `count` 0 means no compound condition, 1..=8 is an AND chain
//! counting down, 21..=27 is an OR chain counting down and resetting at 21.
//! Anything outside those bands is a defensive no-op region in the original
//! encoding, so updates there are ignored (and logged at trace level).

use crate::script::Script;

/// Inclusive AND band of `count` values.
pub const AND_BAND: std::ops::RangeInclusive<u16> = 1..=8;

/// Inclusive OR band of `count` values.
pub const OR_BAND: std::ops::RangeInclusive<u16> = 21..=27;

/// Per-script compound-condition state.
#[derive(Debug, Clone, Default)]
pub struct ConditionAccumulator {
    count: u16,
    result: bool,
}

impl ConditionAccumulator {
    /// Outcome of the most recently completed conditional evaluation.
    pub fn result(&self) -> bool {
        self.result
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    /// True when no compound condition is in progress.
    pub fn is_idle(&self) -> bool {
        self.count == 0
    }

    /// Start a compound condition. `count` comes verbatim from the
    /// instruction stream, so malformed bytecode can place it outside the
    /// defined bands; such values are stored unchanged and make every
    /// subsequent [`update`](Self::update) a no-op.
    ///
    /// Entering the AND band primes the running result to `true`, the OR
    /// band to `false` (the identity of the respective fold).
    pub fn begin(&mut self, count: u16) {
        self.count = count;
        if AND_BAND.contains(&count) {
            self.result = true;
        } else if OR_BAND.contains(&count) {
            self.result = false;
        } else if count != 0 {
            log::trace!("compound condition opened outside the defined bands: {count}");
        }
    }

    /// Start a compound condition from the encoded parameter byte of an
    /// `IF` instruction: 0 opens a single condition (the accumulator stays
    /// idle and the next term lands directly in `result`), 1..=7 opens an
    /// AND chain of `param + 1` terms, 21..=27 an OR chain of `param - 19`
    /// terms. The stored count is `param + 1` for both chained forms.
    ///
    /// Note that the largest encodable OR form (param 27) stores count 28,
    /// which sits just past the defined OR band and therefore falls into
    /// the defensive no-op region.
    pub fn begin_encoded(&mut self, param: u8) {
        match param {
            0 => self.begin(0),
            1..=7 => self.begin(param as u16 + 1),
            21..=27 => self.begin(param as u16 + 1),
            other => {
                // Preserved verbatim so the no-op band stays observable.
                self.begin(other as u16);
            }
        }
    }

    /// Fold one conditional instruction's outcome into the running result.
    ///
    /// `invert` is the sign bit captured from this instruction's opcode
    /// word; it negates only this term and never persists.
    pub fn update(&mut self, invert: bool, raw: bool) {
        let effective = raw != invert;

        if self.count == 0 {
            self.result = effective;
        } else if AND_BAND.contains(&self.count) {
            self.result &= effective;
            if self.count == *AND_BAND.start() {
                self.count = 0;
            } else {
                self.count -= 1;
            }
        } else if OR_BAND.contains(&self.count) {
            self.result |= effective;
            if self.count == *OR_BAND.start() {
                self.count = 0;
            } else {
                self.count -= 1;
            }
        } else {
            log::trace!(
                "ignoring condition update with count {} outside the defined bands",
                self.count
            );
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.result = false;
    }
}

/// Host-side condition sink.
///
/// Deployments layered over a host that owns the compare-flag state machine
/// install one of these instead of using the script's own accumulator. An
/// engine uses exactly one of the two paths, never both.
pub trait ConditionSink {
    fn apply_condition(&mut self, script: &mut Script, raw: bool);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn single_condition_overwrites_result() {
        let mut cond = ConditionAccumulator::default();
        cond.update(false, true);
        assert!(cond.result());
        cond.update(false, false);
        assert!(!cond.result());
        assert!(cond.is_idle());
    }

    #[test]
    fn and_chain_folds_and_returns_to_idle() {
        let mut cond = ConditionAccumulator::default();
        cond.begin(3);

        for (i, raw) in [true, false, true].into_iter().enumerate() {
            cond.update(false, raw);
            // Count decrements by exactly one per term.
            assert_eq!(cond.count(), [2, 1, 0][i]);
        }

        assert!(!cond.result());
        assert!(cond.is_idle());
    }

    #[test]
    fn and_chain_of_all_true_terms_passes() {
        let mut cond = ConditionAccumulator::default();
        cond.begin(2);
        cond.update(false, true);
        cond.update(false, true);
        assert!(cond.result());
        assert!(cond.is_idle());
    }

    #[test]
    fn or_band_start_resets_after_first_term() {
        let mut cond = ConditionAccumulator::default();
        cond.begin(21);
        cond.update(false, true);
        assert!(cond.result());
        assert_eq!(cond.count(), 0);
    }

    #[test]
    fn or_chain_counts_down_through_the_band() {
        let mut cond = ConditionAccumulator::default();
        cond.begin(23);
        cond.update(false, false);
        assert_eq!(cond.count(), 22);
        assert!(!cond.result());
        cond.update(false, true);
        assert_eq!(cond.count(), 21);
        cond.update(false, false);
        assert_eq!(cond.count(), 0);
        assert!(cond.result());
    }

    #[test]
    fn invert_applies_to_one_term_only() {
        let mut cond = ConditionAccumulator::default();
        cond.begin(2);
        cond.update(true, false); // effective true
        cond.update(false, true); // unaffected by the previous invert
        assert!(cond.result());
    }

    #[test]
    fn out_of_band_count_makes_updates_no_ops() {
        let mut cond = ConditionAccumulator::default();
        cond.update(false, true);
        cond.begin(15);

        cond.update(false, false);
        cond.update(true, true);

        // Neither the count nor the result moved.
        assert_eq!(cond.count(), 15);
        assert!(cond.result());
    }

    #[test]
    fn encoded_parameters_map_to_band_counts() {
        let mut cond = ConditionAccumulator::default();

        cond.begin_encoded(0);
        assert_eq!(cond.count(), 0);

        cond.begin_encoded(1); // AND of two terms
        assert_eq!(cond.count(), 2);

        cond.begin_encoded(7); // AND of eight terms
        assert_eq!(cond.count(), 8);

        cond.begin_encoded(21); // OR of two terms
        assert_eq!(cond.count(), 22);

        // The largest OR form encodes to 28, one past the band: it is
        // stored verbatim and later updates become no-ops.
        cond.begin_encoded(27);
        assert_eq!(cond.count(), 28);
        cond.update(false, true);
        assert_eq!(cond.count(), 28);
    }
}
