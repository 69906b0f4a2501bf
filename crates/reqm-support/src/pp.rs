use elegance::{Io, Printer, Render};

pub const INDENT: isize = 2;

const COLUMNS: usize = 80;

/// Printer state threaded through `PP::print`.
#[derive(Clone, Copy, Default)]
pub struct State;

impl State {
    pub fn new() -> Self {
        Self
    }
}

pub trait PP {
    fn print<R: Render>(&self, st: State, p: &mut Printer<R>) -> Result<(), R::Error>;
}

impl<T: PP> PP for std::rc::Rc<T> {
    fn print<R: Render>(&self, st: State, p: &mut Printer<R>) -> Result<(), R::Error> {
        self.as_ref().print(st, p)
    }
}

impl<T: PP> PP for &T {
    fn print<R: Render>(&self, st: State, p: &mut Printer<R>) -> Result<(), R::Error> {
        (*self).print(st, p)
    }
}

/// Print a titled block, one `- item` line per entry:
///
/// ```text
/// Title: {
///   - first
///   - second
/// }
/// ```
pub fn print_block<R, I>(p: &mut Printer<R>, title: &str, items: I) -> Result<(), R::Error>
where
    R: Render,
    I: IntoIterator<Item = String>,
{
    p.igroup(INDENT, |p| {
        p.text_owned(format!("{title}: {{"))?;
        for item in items {
            p.hard_break()?;
            p.text_owned(format!("- {item}"))?;
        }
        Ok(())
    })?;
    p.hard_break()?;
    p.text("}")
}

pub fn dump<T: PP>(x: &T) {
    let mut p = Printer::new(Io(std::io::stdout()), COLUMNS);
    let st = State::new();
    let _ = x.print(st, &mut p);
    let _ = p.hard_break();
    let _ = p.finish();
}

pub fn dump_to_str<T: PP>(x: &T) -> String {
    let mut p = Printer::new(String::new(), COLUMNS);
    let st = State::new();
    let _ = x.print(st, &mut p);
    p.finish().unwrap_or_default()
}
