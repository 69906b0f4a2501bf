//! Internal consistency faults of the rewrite system.
//!
//! Every variant here indicates a bug in completion or in its caller, never a
//! property of the input requirements. Running out of iterations or depth is
//! not an error; see [`crate::CompletionResult`].

use crate::common::RuleId;
use thiserror::Error;

/// Result type for rewrite system operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `initialize` was called twice.
    #[error("rewrite system is already initialized")]
    AlreadyInitialized,

    /// Completion was requested before `initialize`.
    #[error("rewrite system has not been initialized")]
    NotInitialized,

    /// A rule whose left hand side does not exceed its right hand side.
    #[error("rule {lhs} => {rhs} is not oriented: the left hand side must be greater")]
    MisorientedRule { lhs: String, rhs: String },

    /// A rule was deleted twice.
    #[error("rule {0} was already deleted")]
    RuleAlreadyDeleted(RuleId),

    /// A rewrite step names a rule that does not exist.
    #[error("rule {0} does not exist")]
    UnknownRule(RuleId),

    /// A rewrite step expected a pattern that is not present in the term.
    #[error("expected {expected} at offset {offset} of {term}")]
    StepMismatch {
        term: String,
        offset: usize,
        expected: String,
    },

    /// A concrete type adjustment applied to a term whose last symbol has no
    /// substitutions.
    #[error("symbol {0} has no substitutions")]
    MissingSubstitutions(String),

    /// An inverse concrete type adjustment found a substitution without the
    /// expected prefix.
    #[error("substitution {substitution} does not begin with {prefix}")]
    PrefixMismatch {
        substitution: String,
        prefix: String,
    },

    /// Two live rules with the same left hand side.
    #[error("duplicate rewrite rule for {0}")]
    DuplicateRule(String),

    /// A bounded index was constructed from an out-of-range value.
    #[error("{what} {value} exceeds the maximum of {max}")]
    IndexOverflow {
        what: &'static str,
        value: usize,
        max: usize,
    },

    /// A rule violates the structural shape of requirement terms.
    #[error("invalid rule {rule}: {reason}")]
    InvalidRule { rule: String, reason: &'static str },

    /// Rules are never built from empty terms.
    #[error("rewrite rules cannot have an empty side")]
    EmptyTerm,

    /// Merging two symbols that are not same-named associated types.
    #[error("cannot merge {lhs} with {rhs}")]
    InvalidMerge { lhs: String, rhs: String },

    /// Replaying a homotopy generator did not return to its basepoint.
    #[error("homotopy generator based at {basepoint} ends at {end}")]
    HomotopyGeneratorMismatch { basepoint: String, end: String },
}
