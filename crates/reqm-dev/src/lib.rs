use anyhow::{anyhow, bail, Context as _, Error};
use reqm_core::parse::{parse_equation, parse_rule, parse_term};
use reqm_core::{
    CompletionResult, MutableTerm, PropertyMap, Protocol, ProtocolGraph, RewriteContext,
    RewriteOptions, RewritePath, RewriteSystem, Term,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Default)]
pub struct Document {
    /// Each command with the line it was read from.
    commands: Vec<(usize, Command)>,
}

impl Document {
    pub fn new() -> Document {
        Document { commands: vec![] }
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().map(|(_, command)| command)
    }
}

#[derive(Clone, Debug)]
pub enum Command {
    Protocol(Protocol, Vec<Protocol>),
    Rule(Term, Term),
    Complete {
        max_iterations: Option<usize>,
        max_depth: Option<usize>,
    },
    Simplify(Term),
    Equal(Term, Term),
    Distinct(Term, Term),
    Dump,
    Properties,
    Verify,
    /// A line that failed to parse, reported when the document runs.
    Error(String),
}

/// The immutable state.
#[derive(Clone, Debug, Default)]
pub struct Context {
    pub path: Option<PathBuf>,
    pub options: RewriteOptions,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn set_path(&mut self, path: PathBuf) -> &mut Context {
        self.path = Some(path);
        self
    }

    pub fn set_options(&mut self, options: RewriteOptions) -> &mut Context {
        self.options = options;
        self
    }

    fn file_name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<input>".to_owned(),
        }
    }
}

/// The mutable state.
pub struct State<'ctx> {
    context: Context,
    terms: &'ctx RewriteContext,
    protocols: ProtocolGraph,
    /// Rules read before the rewrite system was first used.
    rules: Vec<(MutableTerm, MutableTerm)>,
    system: Option<RewriteSystem<'ctx>>,
    error_occurred: bool,
}

impl<'ctx> State<'ctx> {
    pub fn new(context: Context, terms: &'ctx RewriteContext) -> State<'ctx> {
        State {
            context,
            terms,
            protocols: ProtocolGraph::new(),
            rules: Vec::new(),
            system: None,
            error_occurred: false,
        }
    }

    /// The rewrite system, built from the rules read so far on first use.
    fn system(&mut self) -> Result<&mut RewriteSystem<'ctx>> {
        if self.system.is_none() {
            let mut system = RewriteSystem::new(self.terms);
            let rules = std::mem::take(&mut self.rules);
            debug!(rules = rules.len(), "building rewrite system");
            system.initialize(rules, self.protocols.clone())?;
            self.system = Some(system);
        }
        self.system
            .as_mut()
            .ok_or_else(|| anyhow!("rewrite system unavailable"))
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn p_protocol(text: &str) -> Result<Protocol> {
    if !is_identifier(text) {
        bail!("invalid protocol name `{text}`");
    }
    Ok(Protocol::new(text))
}

/// #protocol <name> [: <name>, ...]
fn p_cmd_protocol(args: &str) -> Result<Command> {
    let (name, inherited) = args.split_once(':').unwrap_or((args, ""));
    let protocol = p_protocol(name.trim())?;
    let inherited = inherited
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(p_protocol)
        .collect::<Result<Vec<_>>>()?;
    Ok(Command::Protocol(protocol, inherited))
}

/// #complete [<max-iterations> [<max-depth>]]
fn p_cmd_complete(args: &str) -> Result<Command> {
    let mut args = args.split_whitespace();
    let max_iterations = args.next().map(str::parse::<usize>).transpose()?;
    let max_depth = args.next().map(str::parse::<usize>).transpose()?;
    if args.next().is_some() {
        bail!("too many arguments to #complete");
    }
    Ok(Command::Complete {
        max_iterations,
        max_depth,
    })
}

fn p_cmd_no_args(args: &str, command: Command) -> Result<Command> {
    if !args.is_empty() {
        bail!("unexpected arguments `{args}`");
    }
    Ok(command)
}

pub fn p_command(terms: &RewriteContext, line: &str) -> Result<Command> {
    let (keyword, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args = args.trim();
    match keyword {
        "#protocol" => p_cmd_protocol(args),
        "#rule" => {
            let (lhs, rhs) = parse_rule(terms, args)?;
            Ok(Command::Rule(lhs, rhs))
        }
        "#complete" => p_cmd_complete(args),
        "#simplify" => Ok(Command::Simplify(parse_term(terms, args)?)),
        "#equal" => {
            let (lhs, rhs) = parse_equation(terms, args)?;
            Ok(Command::Equal(lhs, rhs))
        }
        "#distinct" => {
            let (lhs, rhs) = parse_equation(terms, args)?;
            Ok(Command::Distinct(lhs, rhs))
        }
        "#dump" => p_cmd_no_args(args, Command::Dump),
        "#properties" => p_cmd_no_args(args, Command::Properties),
        "#verify" => p_cmd_no_args(args, Command::Verify),
        _ => bail!("unknown command `{keyword}`"),
    }
}

/// One command per line. Blank lines and lines starting with `//` are
/// skipped. A line that does not parse becomes a `Command::Error`.
pub fn p_document(terms: &RewriteContext, input: &str) -> Document {
    let mut doc = Document::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let command = p_command(terms, line)
            .with_context(|| format!("`{line}`"))
            .unwrap_or_else(|err| Command::Error(format!("{err:#}")));
        doc.commands.push((index + 1, command));
    }
    doc
}

pub fn run_file<P: AsRef<Path>>(path: P, options: RewriteOptions, out: &mut impl Write) -> Result<()> {
    // Load the file.
    let Ok(contents) = fs::read_to_string(&path) else {
        bail!("Could not open file: {}", path.as_ref().display());
    };

    // Build the context.
    let mut ctx = Context::new();
    ctx.set_path(PathBuf::from(path.as_ref()));
    ctx.set_options(options);

    run_source(ctx, &contents, out)
}

pub fn run_source(ctx: Context, contents: &str, out: &mut impl Write) -> Result<()> {
    let terms = RewriteContext::new();
    let doc = p_document(&terms, contents);
    run_document(ctx, &terms, &doc, out)
}

pub fn run_document(
    ctx: Context,
    terms: &RewriteContext,
    doc: &Document,
    out: &mut impl Write,
) -> Result<()> {
    let mut state = State::new(ctx, terms);

    for (line, cmd) in &doc.commands {
        if let Err(err) = run_command(&mut state, cmd, out) {
            error!(line, %err, "command failed");
            writeln!(out, "{}:{line}: error: {err:#}", state.context.file_name())?;
            state.error_occurred = true;
        }
    }

    if state.error_occurred {
        Err(Error::msg("Error occurred during execution."))
    } else {
        Ok(())
    }
}

pub fn run_command(state: &mut State<'_>, cmd: &Command, out: &mut impl Write) -> Result<()> {
    match cmd {
        Command::Protocol(protocol, inherited) => run_protocol(state, protocol, inherited),
        Command::Rule(lhs, rhs) => run_rule(state, lhs, rhs),
        Command::Complete {
            max_iterations,
            max_depth,
        } => run_complete(state, *max_iterations, *max_depth, out),
        Command::Simplify(term) => run_simplify(state, term, out),
        Command::Equal(lhs, rhs) => run_equal(state, lhs, rhs, true, out),
        Command::Distinct(lhs, rhs) => run_equal(state, lhs, rhs, false, out),
        Command::Dump => {
            let system = state.system()?;
            writeln!(out, "{system}")?;
            Ok(())
        }
        Command::Properties => run_properties(state, out),
        Command::Verify => run_verify(state, out),
        Command::Error(message) => bail!("{message}"),
    }
}

fn run_protocol(state: &mut State<'_>, protocol: &Protocol, inherited: &[Protocol]) -> Result<()> {
    if state.system.is_some() {
        bail!("protocol {protocol} declared after the rewrite system was built");
    }
    state
        .protocols
        .add_protocol(protocol.clone(), inherited.to_vec());
    Ok(())
}

fn run_rule(state: &mut State<'_>, lhs: &Term, rhs: &Term) -> Result<()> {
    let lhs = MutableTerm::from(lhs);
    let rhs = MutableTerm::from(rhs);
    match &mut state.system {
        Some(system) => {
            system.add_rule(lhs, rhs, None)?;
        }
        None => state.rules.push((lhs, rhs)),
    }
    Ok(())
}

fn run_complete(
    state: &mut State<'_>,
    max_iterations: Option<usize>,
    max_depth: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let options = state.context.options;
    let max_iterations = max_iterations.unwrap_or(options.max_iterations);
    let max_depth = max_depth.unwrap_or(options.max_depth);
    let system = state.system()?;
    let (result, iterations) = system.compute_confluent_completion(max_iterations, max_depth)?;
    writeln!(out, "completion: {result} after {iterations} iterations")?;
    Ok(())
}

fn run_simplify(state: &mut State<'_>, term: &Term, out: &mut impl Write) -> Result<()> {
    let system = state.system()?;
    let mut simplified = MutableTerm::from(term);
    let mut path = RewritePath::new();
    system.simplify(&mut simplified, Some(&mut path))?;
    writeln!(out, "{term} => {simplified}")?;
    if !path.is_empty() {
        writeln!(out, "  {}", path.dump(term, system)?)?;
    }
    Ok(())
}

fn run_equal(
    state: &mut State<'_>,
    lhs: &Term,
    rhs: &Term,
    expected: bool,
    out: &mut impl Write,
) -> Result<()> {
    let system = state.system()?;
    let equivalent = system.are_equivalent(lhs, rhs)?;
    match (equivalent, expected) {
        (true, true) => writeln!(out, "{lhs} == {rhs}")?,
        (false, false) => writeln!(out, "{lhs} != {rhs}")?,
        (false, true) => bail!("{lhs} and {rhs} are not equivalent"),
        (true, false) => bail!("{lhs} and {rhs} are equivalent"),
    }
    Ok(())
}

fn run_properties(state: &mut State<'_>, out: &mut impl Write) -> Result<()> {
    let options = state.context.options;
    let system = state.system()?;
    let mut map = PropertyMap::new();
    let (result, _) =
        system.build_property_map(&mut map, options.max_iterations, options.max_depth)?;
    if result != CompletionResult::Success {
        writeln!(out, "property map incomplete: {result}")?;
    }
    writeln!(out, "{map}")?;
    Ok(())
}

fn run_verify(state: &mut State<'_>, out: &mut impl Write) -> Result<()> {
    let system = state.system()?;
    system.verify_rewrite_rules()?;
    system.verify_homotopy_generators()?;
    writeln!(
        out,
        "verified {} rules and {} homotopy generators",
        system.len(),
        system.homotopy_generators().len()
    )?;
    Ok(())
}
