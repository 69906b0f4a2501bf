//! Building the property map from a completed rewrite system.
//!
//! A rule `X.[p] => X` where `[p]` is a protocol, layout, superclass or
//! concrete type symbol states that `X` has the property `[p]`. The property
//! map collects these per key `X`. Unifying two properties of one key can
//! prove new equations, which are fed back into the rewrite system.

use crate::completion::CompletionResult;
use crate::error::{Error, Result};
use crate::protocol_graph::Protocol;
use crate::symbol::Symbol;
use crate::system::RewriteSystem;
use crate::term::{MutableTerm, Term};
use crate::types::LayoutConstraint;
use derive_new::new;
use elegance::{Printer, Render};
use reqm_support::{dump_to_str, print_block, State, PP};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, warn};

/// Receives the property rules of a completed rewrite system.
pub trait PropertyMapBuilder {
    /// Forget every property added so far.
    fn clear(&mut self);

    /// Record that `key` has `property`. Equations proven while doing so are
    /// pushed onto `induced`.
    fn add_property(
        &mut self,
        key: Term,
        property: Symbol,
        system: &RewriteSystem<'_>,
        induced: &mut Vec<(MutableTerm, MutableTerm)>,
    ) -> Result<()>;
}

/// The properties of one key.
#[derive(new, Clone, PartialEq, Eq, Debug)]
pub struct PropertyBag {
    pub key: Term,
    #[new(default)]
    pub conforms_to: Vec<Protocol>,
    #[new(default)]
    pub layout: Option<LayoutConstraint>,
    #[new(default)]
    pub superclass: Option<Symbol>,
    #[new(default)]
    pub concrete_type: Option<Symbol>,
}

impl Display for PropertyBag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {{", self.key)?;
        if !self.conforms_to.is_empty() {
            write!(f, " conforms_to: [")?;
            for (i, protocol) in self.conforms_to.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{protocol}")?;
            }
            write!(f, "]")?;
        }
        if let Some(layout) = &self.layout {
            write!(f, " layout: {layout}")?;
        }
        if let Some(superclass) = &self.superclass {
            write!(f, " superclass: {superclass}")?;
        }
        if let Some(concrete_type) = &self.concrete_type {
            write!(f, " concrete_type: {concrete_type}")?;
        }
        write!(f, " }}")
    }
}

/// Two properties of the same key that cannot both hold.
#[derive(new, Clone, PartialEq, Eq, Debug)]
pub struct Conflict {
    pub key: Term,
    pub existing: Symbol,
    pub property: Symbol,
}

impl Display for Conflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} conflicts with {}", self.key, self.existing, self.property)
    }
}

#[derive(Clone, Debug, Default)]
pub struct PropertyMap {
    bags: Vec<PropertyBag>,
    index: HashMap<Term, usize>,
    conflicts: Vec<Conflict>,
}

/// Store `property` in `slot`, or unify it with the symbol already there.
/// Returns the existing symbol if the two cannot be unified.
fn unify(
    slot: &mut Option<Symbol>,
    property: Symbol,
    induced: &mut Vec<(MutableTerm, MutableTerm)>,
) -> Option<Symbol> {
    match slot {
        None => {
            *slot = Some(property);
            None
        }
        Some(existing) => {
            if existing.pattern() != property.pattern()
                || existing.substitutions().len() != property.substitutions().len()
            {
                return Some(existing.clone());
            }
            for (lhs, rhs) in existing
                .substitutions()
                .iter()
                .zip(property.substitutions())
            {
                if lhs != rhs {
                    induced.push((MutableTerm::from(lhs), MutableTerm::from(rhs)));
                }
            }
            None
        }
    }
}

impl PropertyMap {
    pub fn new() -> PropertyMap {
        PropertyMap::default()
    }

    pub fn bags(&self) -> &[PropertyBag] {
        &self.bags
    }

    pub fn lookup(&self, key: &[Symbol]) -> Option<&PropertyBag> {
        self.index.get(key).map(|index| &self.bags[*index])
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    fn bag_index(&mut self, key: &Term) -> usize {
        if let Some(index) = self.index.get(key) {
            return *index;
        }
        let index = self.bags.len();
        self.bags.push(PropertyBag::new(key.clone()));
        self.index.insert(key.clone(), index);
        index
    }

    fn record_conflict(&mut self, key: Term, existing: Symbol, property: Symbol) {
        warn!(%key, %existing, %property, "conflicting requirements");
        self.conflicts.push(Conflict::new(key, existing, property));
    }

    pub fn dump(&self) {
        reqm_support::dump(self);
    }
}

impl PropertyMapBuilder for PropertyMap {
    fn clear(&mut self) {
        self.bags.clear();
        self.index.clear();
        self.conflicts.clear();
    }

    fn add_property(
        &mut self,
        key: Term,
        property: Symbol,
        system: &RewriteSystem<'_>,
        induced: &mut Vec<(MutableTerm, MutableTerm)>,
    ) -> Result<()> {
        let index = self.bag_index(&key);
        let bag = &mut self.bags[index];
        let conflict = match &property {
            Symbol::Protocol(protocol) => {
                if !bag.conforms_to.contains(protocol) {
                    bag.conforms_to.push(protocol.clone());
                }
                None
            }
            Symbol::Layout(layout) => match &bag.layout {
                None => {
                    bag.layout = Some(layout.clone());
                    None
                }
                Some(existing) if existing == layout => None,
                Some(existing) => Some(Symbol::Layout(existing.clone())),
            },
            Symbol::Superclass { .. } => {
                let property = system.simplify_substitutions(&property)?;
                unify(&mut bag.superclass, property, induced)
            }
            Symbol::ConcreteType { .. } => {
                let property = system.simplify_substitutions(&property)?;
                unify(&mut bag.concrete_type, property, induced)
            }
            _ => {
                return Err(Error::InvalidRule {
                    rule: format!("{key}.{property} => {key}"),
                    reason: "not a property rule",
                })
            }
        };
        if let Some(existing) = conflict {
            self.record_conflict(key, existing, property);
        }
        Ok(())
    }
}

impl PP for PropertyMap {
    fn print<R: Render>(
        &self,
        _st: State,
        p: &mut Printer<R>,
    ) -> std::result::Result<(), R::Error> {
        print_block(p, "Property map", self.bags.iter().map(ToString::to_string))?;
        if !self.conflicts.is_empty() {
            p.hard_break()?;
            print_block(p, "Conflicts", self.conflicts.iter().map(ToString::to_string))?;
        }
        Ok(())
    }
}

impl Display for PropertyMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&dump_to_str(self))
    }
}

impl RewriteSystem<'_> {
    /// Complete the system, then feed its property rules into `map`. Rules
    /// induced by the map are added and the process repeats until the map
    /// induces nothing new. The iteration budget is shared by every round of
    /// completion.
    pub fn build_property_map<M: PropertyMapBuilder>(
        &mut self,
        map: &mut M,
        max_iterations: usize,
        max_depth: usize,
    ) -> Result<(CompletionResult, usize)> {
        let mut iterations = 0;
        loop {
            let (result, used) = self.compute_confluent_completion(
                max_iterations.saturating_sub(iterations),
                max_depth,
            )?;
            iterations += used;
            if result != CompletionResult::Success {
                return Ok((result, iterations));
            }

            self.simplify_rewrite_system()?;

            // Shorter keys first, rule order within a length.
            let mut properties: Vec<(Term, Symbol)> = self
                .rules()
                .filter(|(_, rule)| !rule.is_deleted())
                .filter_map(|(_, rule)| {
                    rule.property()
                        .map(|property| (rule.rhs().clone(), property.clone()))
                })
                .collect();
            properties.sort_by_key(|(key, _)| key.len());

            map.clear();
            let mut induced = Vec::new();
            for (key, property) in properties {
                map.add_property(key, property, self, &mut induced)?;
            }

            let mut progress = false;
            for (lhs, rhs) in induced {
                progress |= self.add_rule(lhs, rhs, None)?;
            }
            if !progress {
                debug!(iterations, "built property map");
                return Ok((CompletionResult::Success, iterations));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_term;
    use crate::{ProtocolGraph, RewriteContext};

    fn t(ctx: &RewriteContext, text: &str) -> MutableTerm {
        MutableTerm::from(&parse_term(ctx, text).unwrap())
    }

    fn graph() -> ProtocolGraph {
        let mut graph = ProtocolGraph::new();
        graph.add_protocol(Protocol::new("P"), vec![]);
        graph.add_protocol(Protocol::new("Q"), vec![]);
        graph
    }

    #[test]
    fn test_conformances_and_layout() {
        let ctx = RewriteContext::new();
        let mut system = RewriteSystem::new(&ctx);
        let rules = vec![
            (t(&ctx, "τ_0_0.[P]"), t(&ctx, "τ_0_0")),
            (t(&ctx, "τ_0_0.[Q]"), t(&ctx, "τ_0_0")),
            (t(&ctx, "τ_0_0.[layout: AnyObject]"), t(&ctx, "τ_0_0")),
            (t(&ctx, "τ_0_1.[Q]"), t(&ctx, "τ_0_1")),
        ];
        system.initialize(rules, graph()).unwrap();
        let mut map = PropertyMap::new();
        let result = system.build_property_map(&mut map, 100, 10).unwrap();
        assert_eq!(result.0, CompletionResult::Success);

        let key = parse_term(&ctx, "τ_0_0").unwrap();
        let bag = map.lookup(&key).unwrap();
        assert_eq!(bag.conforms_to, vec![Protocol::new("P"), Protocol::new("Q")]);
        assert_eq!(bag.layout, Some(LayoutConstraint::new("AnyObject")));
        assert_eq!(
            bag.to_string(),
            "τ_0_0 => { conforms_to: [P, Q] layout: AnyObject }"
        );
        assert_eq!(map.bags().len(), 2);
        assert!(map.conflicts().is_empty());
    }

    #[test]
    fn test_concrete_types_induce_same_type_rules() {
        let ctx = RewriteContext::new();
        let mut system = RewriteSystem::new(&ctx);
        let rules = vec![
            (
                t(&ctx, "τ_0_0.[concrete: Array<τ_0_0> with <τ_0_1>]"),
                t(&ctx, "τ_0_0"),
            ),
            (
                t(&ctx, "τ_0_0.[concrete: Array<τ_0_0> with <τ_0_2>]"),
                t(&ctx, "τ_0_0"),
            ),
        ];
        system.initialize(rules, graph()).unwrap();
        let mut map = PropertyMap::new();
        let result = system.build_property_map(&mut map, 100, 10).unwrap();
        assert_eq!(result.0, CompletionResult::Success);
        let lhs = parse_term(&ctx, "τ_0_2").unwrap();
        let rhs = parse_term(&ctx, "τ_0_1").unwrap();
        assert!(system.are_equivalent(&lhs, &rhs).unwrap());
        assert!(map.conflicts().is_empty());
    }

    #[test]
    fn test_conflicting_concrete_types() {
        let ctx = RewriteContext::new();
        let mut system = RewriteSystem::new(&ctx);
        let rules = vec![
            (t(&ctx, "τ_0_0.[concrete: Int]"), t(&ctx, "τ_0_0")),
            (t(&ctx, "τ_0_0.[concrete: String]"), t(&ctx, "τ_0_0")),
        ];
        system.initialize(rules, graph()).unwrap();
        let mut map = PropertyMap::new();
        system.build_property_map(&mut map, 100, 10).unwrap();
        assert_eq!(map.conflicts().len(), 1);
        assert!(map.to_string().contains("Conflicts: {"));
    }
}
