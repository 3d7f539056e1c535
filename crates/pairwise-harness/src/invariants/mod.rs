//! Invariant checking over published view history.
//!
//! Invariants are properties that must hold across every sequence of
//! coordination rounds, whatever the peers report. They run against a
//! [`ViewHistory`]: the views one or both peers received, in round order.
//!
//! # Usage
//!
//! ```ignore
//! let mut history = ViewHistory::default();
//! history.record(Role::Client, views.client);
//! InvariantRegistry::standard().assert_all(&history, "after round 3");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    EpochMonotonicity, EpochTracksStateChange, PairStateMonotonicity, ViewMetadataConsistency,
};
pub use snapshot::{ViewHistory, ViewLineage};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property that must hold over any view history.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against recorded history.
    fn check(&self, history: &ViewHistory) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every view invariant:
    ///
    /// - [`EpochMonotonicity`]: epochs never decrease
    /// - [`PairStateMonotonicity`]: published states never regress
    /// - [`EpochTracksStateChange`]: epoch moves by one exactly when state does
    /// - [`ViewMetadataConsistency`]: `_coordinator` counts match the body
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(EpochMonotonicity);
        registry.add(PairStateMonotonicity);
        registry.add(EpochTracksStateChange);
        registry.add(ViewMetadataConsistency);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants. Returns every violation found.
    pub fn check_all(&self, history: &ViewHistory) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(history).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation on failure.
    pub fn assert_all(&self, history: &ViewHistory, context: &str) {
        if let Err(violations) = self.check_all(history) {
            let messages: Vec<_> = violations.iter().map(|v| v.to_string()).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
