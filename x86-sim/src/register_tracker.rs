//! C11 — maps architectural sub-register writes to physical-register names
//! across aliasing register units.
//!
//! Grounded on `x86-model::register`'s register-unit model: each of the 16
//! GPRs is [`x86_model::NUM_REGISTER_UNITS_PER_GPR`] units wide, and a write
//! at a given [`SubRegisterWidth`] touches exactly the units that width
//! aliases (§9 "Register-unit aliasing" of spec.md). The tracker itself is
//! nothing more than a flat `name` per unit, the representation spec.md's
//! design notes call out as the natural one.

use x86_model::{Register, RegisterUnit, SubRegisterWidth, NUM_REGISTER_UNITS_PER_GPR};

const NUM_UNITS: usize = 16 * NUM_REGISTER_UNITS_PER_GPR;

/// A physical-register name, or `0` meaning "not in flight" — i.e. the unit
/// currently holds the committed architectural value.
pub type PhysRegName = u32;

/// Tracks, per register unit, which in-flight physical register currently
/// supplies its value.
///
/// `name == 0` is reserved to mean "committed" (not renamed); allocators
/// hand out names starting at `num_architectural_regs + 1` per spec.md §4.6,
/// which for sixteen GPRs is `17`.
#[derive(Debug, Clone)]
pub struct RegisterNameTracker {
    units: [PhysRegName; NUM_UNITS],
}

impl Default for RegisterNameTracker {
    fn default() -> Self {
        Self { units: [0; NUM_UNITS] }
    }
}

impl RegisterNameTracker {
    /// A freshly reset tracker: every unit reports "committed".
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `name` to every unit that a write of `reg` at `width` touches.
    ///
    /// A 32/64-bit write zero-extends into the whole architectural
    /// register, so it clears (overwrites with the same new name) every
    /// unit, including ones an 8/16-bit write would have left alone.
    pub fn set_name(&mut self, reg: Register, width: SubRegisterWidth, name: PhysRegName) {
        let base = reg.unit_base();
        for &unit in reg.units(width) {
            self.units[base + unit] = name;
        }
    }

    /// The set of non-zero (in-flight) names visible across `reg`'s units at
    /// the given width, deduplicated. Empty once every touched unit has been
    /// committed.
    pub fn get_name_deps(&self, reg: Register, width: SubRegisterWidth) -> Vec<PhysRegName> {
        let base = reg.unit_base();
        let mut names: Vec<PhysRegName> = reg
            .units(width)
            .iter()
            .map(|&unit| self.units[base + unit])
            .filter(|&name| name != 0)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Marks `name` as committed wherever it currently appears, i.e. once
    /// its defining micro-op has retired and the value is visible in the
    /// architectural register file.
    pub fn commit(&mut self, name: PhysRegName) {
        for unit in self.units.iter_mut() {
            if *unit == name {
                *unit = 0;
            }
        }
    }

    /// Clears every unit back to "committed". Used between independent
    /// simulation runs that must not observe each other's renaming state.
    pub fn reset(&mut self) {
        self.units = [0; NUM_UNITS];
    }

    /// Raw unit index a given register/width pair would read or write, for
    /// callers (tests, debug dumps) that want to inspect tracker state
    /// directly rather than through a register handle.
    pub fn unit_index(reg: Register, unit: RegisterUnit) -> usize {
        reg.unit_base() + unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x86_model::Register::{Rax, Rcx};
    use SubRegisterWidth::*;

    #[test]
    fn super_register_write_is_visible_through_any_covering_name_query() {
        let mut tracker = RegisterNameTracker::new();
        tracker.set_name(Rax, Bits64, 17);
        assert_eq!(tracker.get_name_deps(Rax, Bits8), vec![17]);
        assert_eq!(tracker.get_name_deps(Rax, Bits32), vec![17]);
    }

    #[test]
    fn disjoint_register_is_unaffected() {
        let mut tracker = RegisterNameTracker::new();
        tracker.set_name(Rax, Bits64, 17);
        assert!(tracker.get_name_deps(Rcx, Bits64).is_empty());
    }

    #[test]
    fn eax_write_clears_upper_unit_but_ax_write_does_not() {
        // AX/AL/AH only ever touch unit 0; writing EAX zero-extends and
        // touches every unit including unit 2 (bits 32..64).
        let mut tracker = RegisterNameTracker::new();
        tracker.set_name(Rax, Bits64, 5);
        assert_eq!(tracker.get_name_deps(Rax, Bits32), vec![5]);

        tracker.set_name(Rax, Bits16, 6);
        // AX write only touches unit 0; unit 2's name (from the 64-bit
        // write) is still visible through a wider query.
        assert_eq!(tracker.get_name_deps(Rax, Bits64), vec![5, 6]);

        tracker.set_name(Rax, Bits32, 7);
        // EAX write zero-extends: every unit now reports 7.
        assert_eq!(tracker.get_name_deps(Rax, Bits64), vec![7]);
    }

    #[test]
    fn commit_clears_matching_units_only() {
        let mut tracker = RegisterNameTracker::new();
        tracker.set_name(Rax, Bits64, 9);
        tracker.set_name(Rcx, Bits64, 10);
        tracker.commit(9);
        assert!(tracker.get_name_deps(Rax, Bits64).is_empty());
        assert_eq!(tracker.get_name_deps(Rcx, Bits64), vec![10]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = RegisterNameTracker::new();
        tracker.set_name(Rax, Bits64, 1);
        tracker.reset();
        assert!(tracker.get_name_deps(Rax, Bits64).is_empty());
    }
}
