use std::{
    fmt::{Display, Formatter},
    hash::Hash,
    rc::Rc,
};

/// An identifier: the name of a protocol, associated type, layout or nominal
/// type. Cloning is a reference count bump.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(text: &str) -> Identifier {
        Identifier(Rc::from(text))
    }

    pub fn str(&self) -> &str {
        let Identifier(str) = self;
        str
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.str().fmt(f)
    }
}

impl From<Rc<str>> for Identifier {
    fn from(s: Rc<str>) -> Identifier {
        Identifier(s)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier(Rc::from(s))
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Identifier {
        Identifier(Rc::from(s))
    }
}
