//! Symbols, the letters of the term alphabet, and their total order.

use crate::context::RewriteContext;
use crate::error::Result;
use crate::name::Identifier;
use crate::protocol_graph::{Protocol, ProtocolGraph};
use crate::term::{compare_terms, MutableTerm, Term};
use crate::types::{GenericParam, LayoutConstraint, PatternType};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// The kinds of symbol, in order of precedence.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum SymbolKind {
    AssociatedType,
    GenericParam,
    Name,
    Protocol,
    Layout,
    Superclass,
    ConcreteType,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Symbol {
    /// An associated type declared by one or more protocols. More than one
    /// protocol means the symbol was produced by merging.
    AssociatedType {
        protocols: Rc<[Protocol]>,
        name: Identifier,
    },
    GenericParam(GenericParam),
    /// An unresolved member type name.
    Name(Identifier),
    /// Conformance to a protocol.
    Protocol(Protocol),
    Layout(LayoutConstraint),
    Superclass {
        pattern: Rc<PatternType>,
        substitutions: Rc<[Term]>,
    },
    ConcreteType {
        pattern: Rc<PatternType>,
        substitutions: Rc<[Term]>,
    },
}

impl Symbol {
    pub fn associated_type<T: Into<Identifier>>(protocols: Vec<Protocol>, name: T) -> Symbol {
        Symbol::AssociatedType {
            protocols: Rc::from(protocols),
            name: name.into(),
        }
    }

    pub fn generic_param(depth: u32, index: u32) -> Symbol {
        Symbol::GenericParam(GenericParam::new(depth, index))
    }

    pub fn name<T: Into<Identifier>>(name: T) -> Symbol {
        Symbol::Name(name.into())
    }

    pub fn protocol<T: Into<Identifier>>(name: T) -> Symbol {
        Symbol::Protocol(Protocol::new(name))
    }

    pub fn layout<T: Into<Identifier>>(name: T) -> Symbol {
        Symbol::Layout(LayoutConstraint::new(name))
    }

    pub fn superclass(pattern: PatternType, substitutions: Vec<Term>) -> Symbol {
        Symbol::Superclass {
            pattern: Rc::new(pattern),
            substitutions: Rc::from(substitutions),
        }
    }

    pub fn concrete_type(pattern: PatternType, substitutions: Vec<Term>) -> Symbol {
        Symbol::ConcreteType {
            pattern: Rc::new(pattern),
            substitutions: Rc::from(substitutions),
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::AssociatedType { .. } => SymbolKind::AssociatedType,
            Symbol::GenericParam(_) => SymbolKind::GenericParam,
            Symbol::Name(_) => SymbolKind::Name,
            Symbol::Protocol(_) => SymbolKind::Protocol,
            Symbol::Layout(_) => SymbolKind::Layout,
            Symbol::Superclass { .. } => SymbolKind::Superclass,
            Symbol::ConcreteType { .. } => SymbolKind::ConcreteType,
        }
    }

    /// Protocol, layout, superclass and concrete type symbols describe a
    /// property of the type named by the term preceding them.
    pub fn is_property(&self) -> bool {
        self.kind() >= SymbolKind::Protocol
    }

    pub fn is_superclass_or_concrete_type(&self) -> bool {
        matches!(
            self,
            Symbol::Superclass { .. } | Symbol::ConcreteType { .. }
        )
    }

    /// The declared name of an associated type symbol.
    pub fn associated_type_name(&self) -> Option<&Identifier> {
        match self {
            Symbol::AssociatedType { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn protocols(&self) -> &[Protocol] {
        match self {
            Symbol::AssociatedType { protocols, .. } => protocols,
            Symbol::Protocol(protocol) => std::slice::from_ref(protocol),
            _ => &[],
        }
    }

    pub fn pattern(&self) -> Option<&PatternType> {
        match self {
            Symbol::Superclass { pattern, .. } | Symbol::ConcreteType { pattern, .. } => {
                Some(pattern)
            }
            _ => None,
        }
    }

    pub fn substitutions(&self) -> &[Term] {
        match self {
            Symbol::Superclass { substitutions, .. }
            | Symbol::ConcreteType { substitutions, .. } => substitutions,
            _ => &[],
        }
    }

    /// The symbol order: kind first, then a per-kind structural comparison.
    pub fn compare(&self, other: &Symbol, graph: &ProtocolGraph) -> Ordering {
        let kind = self.kind().cmp(&other.kind());
        if kind != Ordering::Equal {
            return kind;
        }
        match (self, other) {
            (
                Symbol::AssociatedType {
                    protocols: lhs_protos,
                    name: lhs_name,
                },
                Symbol::AssociatedType {
                    protocols: rhs_protos,
                    name: rhs_name,
                },
            ) => {
                // A merged symbol is smaller than any of its constituents.
                let count = rhs_protos.len().cmp(&lhs_protos.len());
                if count != Ordering::Equal {
                    return count;
                }
                for (lhs, rhs) in lhs_protos.iter().zip(rhs_protos.iter()) {
                    let order = graph.compare_protocols(lhs, rhs);
                    if order != Ordering::Equal {
                        return order;
                    }
                }
                lhs_name.cmp(rhs_name)
            }
            (Symbol::GenericParam(lhs), Symbol::GenericParam(rhs)) => lhs.cmp(rhs),
            (Symbol::Name(lhs), Symbol::Name(rhs)) => lhs.cmp(rhs),
            (Symbol::Protocol(lhs), Symbol::Protocol(rhs)) => graph.compare_protocols(lhs, rhs),
            (Symbol::Layout(lhs), Symbol::Layout(rhs)) => lhs.cmp(rhs),
            (
                Symbol::Superclass {
                    pattern: lhs_pattern,
                    substitutions: lhs_subs,
                },
                Symbol::Superclass {
                    pattern: rhs_pattern,
                    substitutions: rhs_subs,
                },
            )
            | (
                Symbol::ConcreteType {
                    pattern: lhs_pattern,
                    substitutions: lhs_subs,
                },
                Symbol::ConcreteType {
                    pattern: rhs_pattern,
                    substitutions: rhs_subs,
                },
            ) => {
                let count = lhs_subs.len().cmp(&rhs_subs.len());
                if count != Ordering::Equal {
                    return count;
                }
                for (lhs, rhs) in lhs_subs.iter().zip(rhs_subs.iter()) {
                    let order = compare_terms(lhs, rhs, graph);
                    if order != Ordering::Equal {
                        return order;
                    }
                }
                lhs_pattern.cmp(rhs_pattern)
            }
            _ => Ordering::Equal,
        }
    }

    /// Rebuild a superclass or concrete type symbol with every substitution
    /// replaced by `f`. Other symbols are returned unchanged.
    pub fn transform_concrete_substitutions<F>(&self, mut f: F) -> Result<Symbol>
    where
        F: FnMut(&Term) -> Result<Term>,
    {
        let transform = |substitutions: &[Term], f: &mut F| -> Result<Rc<[Term]>> {
            let mut result = Vec::with_capacity(substitutions.len());
            for term in substitutions {
                result.push(f(term)?);
            }
            Ok(Rc::from(result))
        };
        Ok(match self {
            Symbol::Superclass {
                pattern,
                substitutions,
            } => Symbol::Superclass {
                pattern: pattern.clone(),
                substitutions: transform(substitutions, &mut f)?,
            },
            Symbol::ConcreteType {
                pattern,
                substitutions,
            } => Symbol::ConcreteType {
                pattern: pattern.clone(),
                substitutions: transform(substitutions, &mut f)?,
            },
            _ => self.clone(),
        })
    }

    /// Prepend `prefix` to every substitution of a superclass or concrete
    /// type symbol.
    pub fn prepend_prefix_to_concrete_substitutions(
        &self,
        prefix: &[Symbol],
        ctx: &RewriteContext,
    ) -> Symbol {
        if prefix.is_empty() {
            return self.clone();
        }
        let result = self.transform_concrete_substitutions(|term| {
            let mut prefixed = MutableTerm::from(prefix);
            prefixed.extend_from_slice(term);
            Ok(ctx.term(&prefixed))
        });
        // The transform above never fails.
        result.unwrap_or_else(|_| self.clone())
    }
}

fn write_substitutions(f: &mut Formatter<'_>, substitutions: &[Term]) -> fmt::Result {
    if substitutions.is_empty() {
        return Ok(());
    }
    write!(f, " with <")?;
    for (i, term) in substitutions.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{term}")?;
    }
    write!(f, ">")
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::AssociatedType { protocols, name } => {
                write!(f, "[")?;
                for (i, protocol) in protocols.iter().enumerate() {
                    if i != 0 {
                        write!(f, "&")?;
                    }
                    write!(f, "{protocol}")?;
                }
                write!(f, ":{name}]")
            }
            Symbol::GenericParam(param) => write!(f, "{param}"),
            Symbol::Name(name) => write!(f, "{name}"),
            Symbol::Protocol(protocol) => write!(f, "[{protocol}]"),
            Symbol::Layout(layout) => write!(f, "[layout: {layout}]"),
            Symbol::Superclass {
                pattern,
                substitutions,
            } => {
                write!(f, "[superclass: {pattern}")?;
                write_substitutions(f, substitutions)?;
                write!(f, "]")
            }
            Symbol::ConcreteType {
                pattern,
                substitutions,
            } => {
                write!(f, "[concrete: {pattern}")?;
                write_substitutions(f, substitutions)?;
                write!(f, "]")
            }
        }
    }
}
