//! A parser for the printed form of terms.
//!
//! ```text
//! term    ::= symbol ('.' symbol)*
//! symbol  ::= τ_d_i | name | '[' bracket ']'
//! bracket ::= 'layout' ':' name
//!           | ('superclass' | 'concrete') ':' pattern ('with' '<' term (',' term)* '>')?
//!           | name ('&' name)* (':' name)?
//! pattern ::= τ_0_i | name ('<' pattern (',' pattern)* '>')?
//! ```

use crate::context::RewriteContext;
use crate::name::Identifier;
use crate::protocol_graph::Protocol;
use crate::symbol::Symbol;
use crate::term::{MutableTerm, Term};
use crate::types::{GenericParam, LayoutConstraint, PatternType};
use logos::{Lexer, Logos};
use std::num::ParseIntError;
use std::ops::Range;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Default, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid token at {0:?}")]
    InvalidToken(Range<usize>),
    #[error("invalid integer: {0}")]
    InvalidInteger(String),
    #[error("expected a symbol")]
    MissingSymbol,
    #[error("expected a name")]
    MissingName,
    #[error("expected ']'")]
    MissingRBracket,
    #[error("expected '<'")]
    MissingLAngle,
    #[error("expected '>'")]
    MissingRAngle,
    #[error("expected ':'")]
    MissingColon,
    #[error("expected '=>'")]
    MissingArrow,
    #[error("expected '=='")]
    MissingEquals,
    #[error("expected a type pattern")]
    MissingPattern,
    #[error("pattern substitutions have depth 0, found depth {0}")]
    PatternDepth(u32),
    #[error("unexpected input after the end")]
    TrailingInput,
    #[default]
    #[error("parse error")]
    Other,
}

impl ParseError {
    fn from_lexer(lex: &mut Lexer<'_, Token>) -> Self {
        ParseError::InvalidToken(lex.span())
    }
}

impl From<ParseIntError> for ParseError {
    fn from(err: ParseIntError) -> Self {
        use std::num::IntErrorKind::*;
        match err.kind() {
            PosOverflow | NegOverflow => ParseError::InvalidInteger("overflow error".to_owned()),
            _ => ParseError::InvalidInteger("other error".to_owned()),
        }
    }
}

type ParseResult<T> = std::result::Result<T, ParseError>;

fn lex_generic_param(lex: &mut Lexer<'_, Token>) -> ParseResult<GenericParam> {
    let text = &lex.slice()["τ_".len()..];
    let (depth, index) = text
        .split_once('_')
        .ok_or_else(|| ParseError::InvalidToken(lex.span()))?;
    Ok(GenericParam::new(depth.parse()?, index.parse()?))
}

#[derive(Logos, Clone, Debug, Eq, PartialEq, Hash)]
#[logos(error(ParseError, ParseError::from_lexer))]
#[logos(skip r"\p{Whitespace}+")]
pub enum Token {
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token(":")]
    Colon,
    #[token("&")]
    Amp,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("=>")]
    Arrow,
    #[token("==")]
    Equals,
    #[regex(r"τ_[0-9]+_[0-9]+", lex_generic_param)]
    GenericParam(GenericParam),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

struct State<'input, 'ctx> {
    ctx: &'ctx RewriteContext,
    lexer: Lexer<'input, Token>,
    /// The current token. We support single token peeking.
    token: Option<ParseResult<Token>>,
}

impl<'input, 'ctx> State<'input, 'ctx> {
    fn new(ctx: &'ctx RewriteContext, input: &'input str) -> State<'input, 'ctx> {
        let mut lexer = Token::lexer(input);
        let token = lexer.next();
        State { ctx, lexer, token }
    }

    fn peek_token(&self) -> Option<ParseResult<Token>> {
        self.token.clone()
    }

    fn advance_token(&mut self) {
        self.token = self.lexer.next();
    }
}

fn p_token_opt(state: &mut State, token: Token) -> ParseResult<Option<()>> {
    match state.peek_token() {
        Some(Err(err)) => Err(err),
        Some(Ok(t)) if t == token => {
            state.advance_token();
            Ok(Some(()))
        }
        _ => Ok(None),
    }
}

fn p_token(state: &mut State, token: Token, err: ParseError) -> ParseResult<()> {
    match p_token_opt(state, token)? {
        Some(()) => Ok(()),
        None => Err(err),
    }
}

fn p_ident_opt(state: &mut State) -> ParseResult<Option<String>> {
    match state.peek_token() {
        Some(Err(err)) => Err(err),
        Some(Ok(Token::Ident(name))) => {
            state.advance_token();
            Ok(Some(name))
        }
        _ => Ok(None),
    }
}

fn p_ident(state: &mut State) -> ParseResult<String> {
    p_ident_opt(state)?.ok_or(ParseError::MissingName)
}

fn p_eof(state: &mut State) -> ParseResult<()> {
    match state.peek_token() {
        None => Ok(()),
        Some(Err(err)) => Err(err),
        Some(Ok(_)) => Err(ParseError::TrailingInput),
    }
}

/// Parse a comma separated list, after the opening '<', through the '>'.
fn p_angle_list<'input, 'ctx, T>(
    state: &mut State<'input, 'ctx>,
    f: fn(&mut State<'input, 'ctx>) -> ParseResult<T>,
) -> ParseResult<Vec<T>> {
    let mut items = vec![f(state)?];
    while let Some(()) = p_token_opt(state, Token::Comma)? {
        items.push(f(state)?);
    }
    p_token(state, Token::RAngle, ParseError::MissingRAngle)?;
    Ok(items)
}

fn p_pattern(state: &mut State) -> ParseResult<PatternType> {
    match state.peek_token() {
        Some(Err(err)) => Err(err),
        Some(Ok(Token::GenericParam(param))) => {
            if param.depth != 0 {
                return Err(ParseError::PatternDepth(param.depth));
            }
            state.advance_token();
            Ok(PatternType::Substitution(param.index))
        }
        Some(Ok(Token::Ident(name))) => {
            state.advance_token();
            let args = match p_token_opt(state, Token::LAngle)? {
                Some(()) => p_angle_list(state, p_pattern)?,
                None => Vec::new(),
            };
            Ok(PatternType::nominal(name, args))
        }
        _ => Err(ParseError::MissingPattern),
    }
}

/// Parse the pattern and substitutions of a superclass or concrete type.
fn p_concrete(state: &mut State) -> ParseResult<(PatternType, Vec<Term>)> {
    let pattern = p_pattern(state)?;
    let mut substitutions = Vec::new();
    if let Some(Ok(Token::Ident(keyword))) = state.peek_token() {
        if keyword == "with" {
            state.advance_token();
            p_token(state, Token::LAngle, ParseError::MissingLAngle)?;
            substitutions = p_angle_list(state, p_term)?;
        }
    }
    Ok((pattern, substitutions))
}

/// Parse the inside of a bracketed symbol, after the '['.
fn p_bracket(state: &mut State) -> ParseResult<Symbol> {
    let first = p_ident(state)?;
    let keyword = matches!(first.as_str(), "layout" | "superclass" | "concrete");
    if keyword {
        if let Some(()) = p_token_opt(state, Token::Colon)? {
            let symbol = match first.as_str() {
                "layout" => Symbol::Layout(LayoutConstraint::new(p_ident(state)?)),
                "superclass" => {
                    let (pattern, substitutions) = p_concrete(state)?;
                    Symbol::superclass(pattern, substitutions)
                }
                _ => {
                    let (pattern, substitutions) = p_concrete(state)?;
                    Symbol::concrete_type(pattern, substitutions)
                }
            };
            p_token(state, Token::RBracket, ParseError::MissingRBracket)?;
            return Ok(symbol);
        }
    }

    let mut protocols = vec![Protocol::new(first)];
    while let Some(()) = p_token_opt(state, Token::Amp)? {
        protocols.push(Protocol::new(p_ident(state)?));
    }
    let symbol = match p_token_opt(state, Token::Colon)? {
        Some(()) => Symbol::AssociatedType {
            protocols: Rc::from(protocols),
            name: Identifier::from(p_ident(state)?),
        },
        None if protocols.len() == 1 => Symbol::Protocol(protocols.remove(0)),
        None => return Err(ParseError::MissingColon),
    };
    p_token(state, Token::RBracket, ParseError::MissingRBracket)?;
    Ok(symbol)
}

fn p_symbol(state: &mut State) -> ParseResult<Symbol> {
    match state.peek_token() {
        Some(Err(err)) => Err(err),
        Some(Ok(Token::GenericParam(param))) => {
            state.advance_token();
            Ok(Symbol::GenericParam(param))
        }
        Some(Ok(Token::Ident(name))) => {
            state.advance_token();
            Ok(Symbol::name(name))
        }
        Some(Ok(Token::LBracket)) => {
            state.advance_token();
            p_bracket(state)
        }
        _ => Err(ParseError::MissingSymbol),
    }
}

fn p_term(state: &mut State) -> ParseResult<Term> {
    let mut symbols = MutableTerm::new();
    symbols.push(p_symbol(state)?);
    while let Some(()) = p_token_opt(state, Token::Dot)? {
        symbols.push(p_symbol(state)?);
    }
    Ok(state.ctx.term(&symbols))
}

pub fn parse_term(ctx: &RewriteContext, input: &str) -> ParseResult<Term> {
    let mut state = State::new(ctx, input);
    let term = p_term(&mut state)?;
    p_eof(&mut state)?;
    Ok(term)
}

pub fn parse_symbol(ctx: &RewriteContext, input: &str) -> ParseResult<Symbol> {
    let mut state = State::new(ctx, input);
    let symbol = p_symbol(&mut state)?;
    p_eof(&mut state)?;
    Ok(symbol)
}

pub fn parse_pattern_type(input: &str) -> ParseResult<PatternType> {
    let ctx = RewriteContext::new();
    let mut state = State::new(&ctx, input);
    let pattern = p_pattern(&mut state)?;
    p_eof(&mut state)?;
    Ok(pattern)
}

/// Parse `lhs => rhs`.
pub fn parse_rule(ctx: &RewriteContext, input: &str) -> ParseResult<(Term, Term)> {
    let mut state = State::new(ctx, input);
    let lhs = p_term(&mut state)?;
    p_token(&mut state, Token::Arrow, ParseError::MissingArrow)?;
    let rhs = p_term(&mut state)?;
    p_eof(&mut state)?;
    Ok((lhs, rhs))
}

/// Parse `lhs == rhs`.
pub fn parse_equation(ctx: &RewriteContext, input: &str) -> ParseResult<(Term, Term)> {
    let mut state = State::new(ctx, input);
    let lhs = p_term(&mut state)?;
    p_token(&mut state, Token::Equals, ParseError::MissingEquals)?;
    let rhs = p_term(&mut state)?;
    p_eof(&mut state)?;
    Ok((lhs, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) {
        let ctx = RewriteContext::new();
        let term = parse_term(&ctx, input);
        assert!(term.is_ok(), "failed to parse {input}: {term:?}");
        assert_eq!(term.unwrap().to_string(), input);
    }

    #[test]
    fn test_parse_names() {
        let ctx = RewriteContext::new();
        let term = parse_term(&ctx, "a.b.c").unwrap();
        assert_eq!(
            term.symbols(),
            &[Symbol::name("a"), Symbol::name("b"), Symbol::name("c")]
        );
    }

    #[test]
    fn test_parse_symbols() {
        let ctx = RewriteContext::new();
        assert_eq!(
            parse_symbol(&ctx, "τ_1_2").unwrap(),
            Symbol::generic_param(1, 2)
        );
        assert_eq!(parse_symbol(&ctx, "[P]").unwrap(), Symbol::protocol("P"));
        assert_eq!(
            parse_symbol(&ctx, "[P:T]").unwrap(),
            Symbol::associated_type(vec![Protocol::new("P")], "T")
        );
        assert_eq!(
            parse_symbol(&ctx, "[layout: AnyObject]").unwrap(),
            Symbol::layout("AnyObject")
        );
        assert_eq!(parse_symbol(&ctx, "[layout]").unwrap(), Symbol::protocol("layout"));
    }

    #[test]
    fn test_printed_forms_roundtrip() {
        roundtrip("τ_0_0.[P1&P2:T].[Q]");
        roundtrip("τ_0_0.[layout: _Trivial]");
        roundtrip("τ_0_0.[superclass: Base]");
        roundtrip("τ_0_0.[concrete: Array<τ_0_0> with <τ_0_1.[P:Element]>]");
        roundtrip("τ_0_0.[concrete: Dictionary<τ_0_0, Array<τ_0_1>> with <τ_0_1, τ_0_2>]");
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            parse_pattern_type("Pair<τ_0_1, Int>").unwrap(),
            PatternType::nominal(
                "Pair",
                vec![PatternType::Substitution(1), PatternType::nominal("Int", vec![])]
            )
        );
        assert_eq!(
            parse_pattern_type("Array<τ_1_0>"),
            Err(ParseError::PatternDepth(1))
        );
        let ctx = RewriteContext::new();
        assert_eq!(
            parse_term(&ctx, "a.[concrete: Array<τ_2_0>]"),
            Err(ParseError::PatternDepth(2))
        );
    }

    #[test]
    fn test_parse_rule_and_equation() {
        let ctx = RewriteContext::new();
        let (lhs, rhs) = parse_rule(&ctx, "a.b => c").unwrap();
        assert_eq!(lhs.to_string(), "a.b");
        assert_eq!(rhs.to_string(), "c");
        let (lhs, rhs) = parse_equation(&ctx, "τ_0_0.[P:T] == τ_0_1").unwrap();
        assert_eq!(lhs.to_string(), "τ_0_0.[P:T]");
        assert_eq!(rhs.to_string(), "τ_0_1");
        assert_eq!(parse_rule(&ctx, "a.b c"), Err(ParseError::MissingArrow));
    }

    #[test]
    fn test_parse_errors() {
        let ctx = RewriteContext::new();
        assert_eq!(parse_term(&ctx, ""), Err(ParseError::MissingSymbol));
        assert_eq!(parse_term(&ctx, "a."), Err(ParseError::MissingSymbol));
        assert_eq!(parse_term(&ctx, "[P"), Err(ParseError::MissingRBracket));
        assert_eq!(parse_term(&ctx, "[P&Q]"), Err(ParseError::MissingColon));
        assert_eq!(parse_term(&ctx, "a b"), Err(ParseError::TrailingInput));
        assert!(matches!(
            parse_term(&ctx, "a.$"),
            Err(ParseError::InvalidToken(_))
        ));
    }
}
