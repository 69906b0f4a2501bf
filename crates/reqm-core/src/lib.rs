//! A rewrite system over requirement terms.
//!
//! Requirements between generic parameters, associated types and protocols
//! are encoded as rules between terms. Completion makes the system
//! confluent, so that two terms name the same type exactly when they
//! simplify to the same normal form.

pub mod common;
pub mod completion;
pub mod context;
pub mod error;
pub mod merge;
pub mod name;
pub mod options;
pub mod parse;
pub mod property_map;
pub mod protocol_graph;
pub mod rewrite_path;
pub mod rule;
pub mod symbol;
pub mod system;
pub mod term;
pub mod trie;
pub mod types;
pub mod verify;

pub use common::{RuleId, StepOffset};
pub use completion::CompletionResult;
pub use context::RewriteContext;
pub use error::{Error, Result};
pub use merge::MergedAssociatedType;
pub use name::Identifier;
pub use options::RewriteOptions;
pub use property_map::{Conflict, PropertyBag, PropertyMap, PropertyMapBuilder};
pub use protocol_graph::{Protocol, ProtocolGraph};
pub use rewrite_path::{AppliedRewriteStep, HomotopyGenerator, RewritePath, RewriteStep, StepKind};
pub use rule::Rule;
pub use symbol::{Symbol, SymbolKind};
pub use system::RewriteSystem;
pub use term::{MutableTerm, Term};
pub use types::{GenericParam, LayoutConstraint, PatternType};
