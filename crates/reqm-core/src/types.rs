use crate::name::Identifier;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// A generic parameter, identified by its depth and index. Printed `τ_d_i`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GenericParam {
    pub depth: u32,
    pub index: u32,
}

impl GenericParam {
    pub fn new(depth: u32, index: u32) -> GenericParam {
        GenericParam { depth, index }
    }
}

impl Display for GenericParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "τ_{}_{}", self.depth, self.index)
    }
}

/// A layout constraint such as `AnyObject`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LayoutConstraint(Identifier);

impl LayoutConstraint {
    pub fn new<T: Into<Identifier>>(name: T) -> LayoutConstraint {
        LayoutConstraint(name.into())
    }

    pub fn name(&self) -> &Identifier {
        &self.0
    }
}

impl Display for LayoutConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The structure of a superclass or concrete type, with every type parameter
/// abstracted out into a numbered hole. Hole `i` stands for the `i`-th
/// substitution of the enclosing symbol.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PatternType {
    Nominal {
        name: Identifier,
        args: Rc<[PatternType]>,
    },
    Substitution(u32),
}

impl PatternType {
    pub fn nominal<T: Into<Identifier>>(name: T, args: Vec<PatternType>) -> PatternType {
        PatternType::Nominal {
            name: name.into(),
            args: Rc::from(args),
        }
    }

    /// The number of holes, which is one more than the largest hole index.
    pub fn substitution_count(&self) -> usize {
        match self {
            PatternType::Nominal { args, .. } => args
                .iter()
                .map(PatternType::substitution_count)
                .max()
                .unwrap_or(0),
            PatternType::Substitution(i) => *i as usize + 1,
        }
    }
}

impl Display for PatternType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Nominal { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i != 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            PatternType::Substitution(i) => write!(f, "τ_0_{i}"),
        }
    }
}
