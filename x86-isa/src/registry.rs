//! The transform registry (C4): an ordered list of [`Transform`]s, run in
//! priority order against an [`InstructionSet`], with a
//! first-error-wins-but-keep-going status policy.
//!
//! Grounded on the `REGISTER_INSTRUCTION_SET_TRANSFORM(Name, Priority)`
//! macro pattern seen throughout `cleanup_instruction_set_encoding.cc`: each
//! transform is registered once with a numeric priority, and the pipeline
//! runner sorts and executes them in priority order, low to high.

use tracing::debug;

use crate::error::{Result, Status};
use crate::instruction_set::InstructionSet;

/// A single named, prioritized instruction-set cleanup transform.
pub trait Transform {
    /// A unique, human-readable name, used to break priority ties
    /// deterministically and to tag log messages.
    fn name(&self) -> &'static str;

    /// Transforms registered with a lower priority run first. Ties are
    /// broken by `name`, so that two transforms accidentally registered with
    /// the same priority still run in a stable, reproducible order.
    fn priority(&self) -> i32;

    /// Applies this transform to `instruction_set` in place.
    fn run(&self, instruction_set: &mut InstructionSet) -> Result<()>;
}

/// Accumulates the first non-OK status seen across a sequence of fallible
/// steps, without short-circuiting the sequence itself.
///
/// Mirrors `exegesis::util::status_util`'s `UpdateStatus`-style combinator:
/// callers that need "run everything, but remember the first problem" don't
/// have to hand-roll an `Option<Status>` at every call site.
#[derive(Debug, Default)]
pub struct StatusAccumulator {
    first_error: Option<Status>,
}

impl StatusAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `result` if it is an error and no error has been recorded
    /// yet.
    pub fn update(&mut self, result: Result<()>) {
        if let Err(status) = result {
            if self.first_error.is_none() {
                self.first_error = Some(status);
            }
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.first_error {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

/// An ordered collection of transforms, run front to back against an
/// instruction set.
#[derive(Default)]
pub struct Registry {
    transforms: Vec<Box<dyn Transform>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `transform`, re-sorting the registry by
    /// `(priority, name)` so iteration order stays correct regardless of
    /// registration order.
    pub fn register(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
        self.transforms.sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.name().cmp(b.name())));
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Runs every registered transform, in order, against `instruction_set`.
    /// Every transform runs even if an earlier one failed; the first error
    /// is what gets returned.
    pub fn run_all(&self, instruction_set: &mut InstructionSet) -> Result<()> {
        let mut status = StatusAccumulator::new();
        for transform in &self.transforms {
            debug!(transform = transform.name(), priority = transform.priority(), "running cleanup transform");
            status.update(transform.run(instruction_set));
        }
        status.into_result()
    }

    pub fn names_in_order(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|transform| transform.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(&'static str, i32);
    impl Transform for Noop {
        fn name(&self) -> &'static str {
            self.0
        }
        fn priority(&self) -> i32 {
            self.1
        }
        fn run(&self, _instruction_set: &mut InstructionSet) -> Result<()> {
            Ok(())
        }
    }

    struct Failing(&'static str, i32);
    impl Transform for Failing {
        fn name(&self) -> &'static str {
            self.0
        }
        fn priority(&self) -> i32 {
            self.1
        }
        fn run(&self, _instruction_set: &mut InstructionSet) -> Result<()> {
            Err(Status::internal(self.0))
        }
    }

    #[test]
    fn runs_in_priority_then_name_order() {
        let mut registry = Registry::new();
        registry.register(Box::new(Noop("b", 1)));
        registry.register(Box::new(Noop("a", 1)));
        registry.register(Box::new(Noop("z", 0)));
        assert_eq!(registry.names_in_order(), vec!["z", "a", "b"]);
    }

    #[test]
    fn keeps_running_after_first_failure_and_returns_it() {
        let mut registry = Registry::new();
        registry.register(Box::new(Failing("first", 0)));
        registry.register(Box::new(Failing("second", 1)));
        let mut instruction_set = InstructionSet::default();
        let result = registry.run_all(&mut instruction_set);
        assert_eq!(result.unwrap_err().message, "first");
    }
}
