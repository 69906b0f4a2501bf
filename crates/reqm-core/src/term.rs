use crate::protocol_graph::ProtocolGraph;
use crate::symbol::Symbol;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// The shortlex order: longer terms are greater, terms of equal length
/// compare symbol by symbol.
pub fn compare_terms(lhs: &[Symbol], rhs: &[Symbol], graph: &ProtocolGraph) -> Ordering {
    let len = lhs.len().cmp(&rhs.len());
    if len != Ordering::Equal {
        return len;
    }
    for (l, r) in lhs.iter().zip(rhs.iter()) {
        let order = l.compare(r, graph);
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

fn write_symbols(f: &mut Formatter<'_>, symbols: &[Symbol]) -> fmt::Result {
    for (i, symbol) in symbols.iter().enumerate() {
        if i != 0 {
            write!(f, ".")?;
        }
        write!(f, "{symbol}")?;
    }
    Ok(())
}

/// An immutable term. Terms are built through a
/// [`RewriteContext`](crate::RewriteContext), which shares one allocation
/// between equal terms.
#[derive(Clone, Debug)]
pub struct Term(Rc<[Symbol]>);

impl Term {
    pub(crate) fn from_rc(symbols: Rc<[Symbol]>) -> Term {
        Term(symbols)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    pub fn compare(&self, other: &[Symbol], graph: &ProtocolGraph) -> Ordering {
        compare_terms(self, other, graph)
    }

    /// Whether two terms share the same allocation.
    pub fn ptr_eq(&self, other: &Term) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.symbols() == other.symbols()
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbols().hash(state)
    }
}

impl Deref for Term {
    type Target = [Symbol];
    fn deref(&self) -> &[Symbol] {
        &self.0
    }
}

impl Borrow<[Symbol]> for Term {
    fn borrow(&self) -> &[Symbol] {
        &self.0
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_symbols(f, self)
    }
}

/// An owned, editable term.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct MutableTerm(Vec<Symbol>);

impl MutableTerm {
    pub fn new() -> MutableTerm {
        MutableTerm(Vec::new())
    }

    pub fn compare(&self, other: &[Symbol], graph: &ProtocolGraph) -> Ordering {
        compare_terms(self, other, graph)
    }

    /// Replace the `len` symbols starting at `offset` with `replacement`.
    pub fn rewrite_subterm(&mut self, offset: usize, len: usize, replacement: &[Symbol]) {
        self.0
            .splice(offset..offset + len, replacement.iter().cloned());
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.0
    }
}

impl Deref for MutableTerm {
    type Target = Vec<Symbol>;
    fn deref(&self) -> &Vec<Symbol> {
        &self.0
    }
}

impl DerefMut for MutableTerm {
    fn deref_mut(&mut self) -> &mut Vec<Symbol> {
        &mut self.0
    }
}

impl From<&[Symbol]> for MutableTerm {
    fn from(symbols: &[Symbol]) -> MutableTerm {
        MutableTerm(symbols.to_vec())
    }
}

impl From<&Term> for MutableTerm {
    fn from(term: &Term) -> MutableTerm {
        MutableTerm(term.to_vec())
    }
}

impl From<Vec<Symbol>> for MutableTerm {
    fn from(symbols: Vec<Symbol>) -> MutableTerm {
        MutableTerm(symbols)
    }
}

impl FromIterator<Symbol> for MutableTerm {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> MutableTerm {
        MutableTerm(iter.into_iter().collect())
    }
}

impl Display for MutableTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_symbols(f, self)
    }
}
