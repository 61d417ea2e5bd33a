// SPDX-License-Identifier: Apache-2.0
//! Parser for the textual model language.
//!
//! A model is a sequence of declarations, any number per line, `#` starting
//! a comment:
//!
//! ```text
//! system:name
//! event:a
//! clock:1:x
//! int:1:0:10:0:i
//! process:P
//! location:P:l0{initial: : invariant: x<=1 : labels: goal}
//! edge:P:l0:l1:a{provided: x>=2 && i<3 : do: x=0; i=i+1}
//! sync:P@a:Q@a?
//! ```
//!
//! Guards are `&&`-conjunctions of clock comparisons and integer
//! comparisons; `do:` sequences are `;`-separated assignments. A trailing
//! `?` marks a weak (broadcast) synchronization participant.

use std::fmt;

use thiserror::Error;

use tempo_core::bound::Cmp;
use tempo_core::model::{
    ActionDecl, ClockDecl, CmpOp, ConstraintDecl, EdgeDecl, EventDecl, IntExpr, IntGuardDecl,
    IntVarDecl, LocationDecl, ProcessDecl, SyncConstraintDecl, SyncDecl, SystemDecl,
};

/// Parse errors, with the offending declaration or expression echoed back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A declaration does not match any known form.
    #[error("malformed declaration `{0}`")]
    BadDeclaration(String),
    /// An attribute key is not known for this declaration kind.
    #[error("unknown attribute `{key}` in `{decl}`")]
    UnknownAttribute {
        /// The attribute key.
        key: String,
        /// The enclosing declaration.
        decl: String,
    },
    /// A guard or assignment expression does not parse.
    #[error("malformed expression `{0}`")]
    BadExpression(String),
    /// A number does not fit a 64-bit integer.
    #[error("numeric literal out of range: `{0}`")]
    BadNumber(String),
    /// A clock was compared against a non-constant expression.
    #[error("clock compared against non-constant expression in `{0}`")]
    NonConstantClockBound(String),
    /// A clock was assigned a value other than zero.
    #[error("clock can only be reset to 0 in `{0}`")]
    BadClockReset(String),
    /// Unbalanced braces in the input.
    #[error("unbalanced braces in model input")]
    UnbalancedBraces,
}

/// Parses a whole model file into a [`SystemDecl`].
pub fn parse_model(input: &str) -> Result<SystemDecl, ParseError> {
    // strip comments line-wise, keep everything else verbatim
    let stripped: String = input
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");

    let chunks = split_declarations(&stripped)?;

    // first pass: collect clock and integer variable names so guard atoms
    // can be classified
    let mut clocks: Vec<String> = Vec::new();
    let mut ints: Vec<String> = Vec::new();
    for chunk in &chunks {
        let (head, _) = split_braces(chunk)?;
        let fields: Vec<&str> = head.split(':').map(str::trim).collect();
        match fields.first().copied() {
            Some("clock") if fields.len() == 3 => {
                collect_flat_names(fields[2], fields[1], &mut clocks)?;
            }
            Some("int") if fields.len() == 6 => {
                collect_flat_names(fields[5], fields[1], &mut ints)?;
            }
            _ => {}
        }
    }
    let names = Names {
        clocks: &clocks,
        ints: &ints,
    };

    let mut decl = SystemDecl::default();
    for chunk in &chunks {
        parse_declaration(chunk, &names, &mut decl)?;
    }
    Ok(decl)
}

fn collect_flat_names(name: &str, size: &str, out: &mut Vec<String>) -> Result<(), ParseError> {
    let size: u32 = size.parse().map_err(|_| ParseError::BadNumber(size.to_owned()))?;
    if size <= 1 {
        out.push(name.to_owned());
    } else {
        for i in 0..size {
            out.push(format!("{name}[{i}]"));
        }
    }
    Ok(())
}

struct Names<'a> {
    clocks: &'a [String],
    ints: &'a [String],
}

impl Names<'_> {
    fn is_clock(&self, name: &str) -> bool {
        self.clocks.iter().any(|c| c == name)
    }

    fn is_int(&self, name: &str) -> bool {
        self.ints.iter().any(|i| i == name)
    }
}

const KEYWORDS: [&str; 8] = [
    "system", "event", "clock", "int", "process", "location", "edge", "sync",
];

/// Splits the input into declaration chunks: a declaration starts with a
/// keyword at a word boundary outside braces and runs to the next such
/// start.
fn split_declarations(input: &str) -> Result<Vec<String>, ParseError> {
    let bytes = input.as_bytes();
    let mut starts = Vec::new();
    let mut depth: i32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::UnbalancedBraces);
                }
            }
            _ => {
                if depth == 0 && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
                    for kw in KEYWORDS {
                        if input[i..].starts_with(kw)
                            && input[i + kw.len()..].starts_with(':')
                        {
                            starts.push(i);
                            break;
                        }
                    }
                }
            }
        }
        i += 1;
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedBraces);
    }
    let mut chunks = Vec::new();
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(input.len());
        let chunk = input[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_owned());
        }
    }
    Ok(chunks)
}

/// Splits a declaration into its head and optional brace content.
fn split_braces(chunk: &str) -> Result<(&str, Option<&str>), ParseError> {
    match chunk.find('{') {
        None => Ok((chunk.trim(), None)),
        Some(open) => {
            let close = chunk.rfind('}').ok_or(ParseError::UnbalancedBraces)?;
            if close < open {
                return Err(ParseError::UnbalancedBraces);
            }
            Ok((chunk[..open].trim(), Some(&chunk[open + 1..close])))
        }
    }
}

/// Splits an attribute block into `(key, value)` pairs. Tokens between
/// colons are keys when they match a known attribute name; everything else
/// extends the current value.
fn parse_attributes(
    content: &str,
    known: &[&str],
    decl: &str,
) -> Result<Vec<(String, String)>, ParseError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in content.split(':') {
        let trimmed = token.trim();
        if known.contains(&trimmed) {
            pairs.push((trimmed.to_owned(), String::new()));
        } else if let Some(last) = pairs.last_mut() {
            if !trimmed.is_empty() && !last.1.is_empty() {
                last.1.push(':');
            }
            last.1.push_str(trimmed);
        } else if !trimmed.is_empty() {
            return Err(ParseError::UnknownAttribute {
                key: trimmed.to_owned(),
                decl: decl.to_owned(),
            });
        }
    }
    Ok(pairs)
}

fn parse_declaration(
    chunk: &str,
    names: &Names<'_>,
    decl: &mut SystemDecl,
) -> Result<(), ParseError> {
    let (head, body) = split_braces(chunk)?;
    let fields: Vec<&str> = head.split(':').map(str::trim).collect();
    let bad = || ParseError::BadDeclaration(chunk.to_owned());
    match fields.first().copied() {
        Some("system") if fields.len() == 2 => {
            decl.name = fields[1].to_owned();
        }
        Some("event") if fields.len() == 2 => {
            decl.events.push(EventDecl {
                name: fields[1].to_owned(),
            });
        }
        Some("clock") if fields.len() == 3 => {
            decl.clocks.push(ClockDecl {
                name: fields[2].to_owned(),
                size: fields[1].parse().map_err(|_| ParseError::BadNumber(fields[1].to_owned()))?,
            });
        }
        Some("int") if fields.len() == 6 => {
            decl.intvars.push(IntVarDecl {
                name: fields[5].to_owned(),
                size: fields[1].parse().map_err(|_| ParseError::BadNumber(fields[1].to_owned()))?,
                min: parse_i64(fields[2])?,
                max: parse_i64(fields[3])?,
                init: parse_i64(fields[4])?,
            });
        }
        Some("process") if fields.len() == 2 => {
            decl.processes.push(ProcessDecl {
                name: fields[1].to_owned(),
            });
        }
        Some("location") if fields.len() == 3 => {
            let mut loc = LocationDecl {
                process: fields[1].to_owned(),
                name: fields[2].to_owned(),
                ..Default::default()
            };
            if let Some(body) = body {
                let known = ["initial", "committed", "urgent", "labels", "invariant"];
                for (key, value) in parse_attributes(body, &known, chunk)? {
                    match key.as_str() {
                        "initial" => loc.initial = true,
                        "committed" => loc.committed = true,
                        "urgent" => loc.urgent = true,
                        "labels" => {
                            loc.labels = value
                                .split(',')
                                .map(str::trim)
                                .filter(|s| !s.is_empty())
                                .map(str::to_owned)
                                .collect();
                        }
                        "invariant" => {
                            let (clocks, ints) = parse_guard(&value, names)?;
                            if !ints.is_empty() {
                                return Err(ParseError::BadExpression(value));
                            }
                            loc.invariant = clocks;
                        }
                        _ => return Err(bad()),
                    }
                }
            }
            decl.locations.push(loc);
        }
        Some("edge") if fields.len() == 5 => {
            let mut edge = EdgeDecl {
                process: fields[1].to_owned(),
                src: fields[2].to_owned(),
                tgt: fields[3].to_owned(),
                event: fields[4].to_owned(),
                guard: Vec::new(),
                int_guard: Vec::new(),
                actions: Vec::new(),
            };
            if let Some(body) = body {
                let known = ["provided", "do"];
                for (key, value) in parse_attributes(body, &known, chunk)? {
                    match key.as_str() {
                        "provided" => {
                            let (clocks, ints) = parse_guard(&value, names)?;
                            edge.guard = clocks;
                            edge.int_guard = ints;
                        }
                        "do" => {
                            edge.actions = parse_actions(&value, names)?;
                        }
                        _ => return Err(bad()),
                    }
                }
            }
            decl.edges.push(edge);
        }
        Some("sync") if fields.len() >= 3 => {
            let mut constraints = Vec::new();
            for item in &fields[1..] {
                let (item, weak) = match item.strip_suffix('?') {
                    Some(stripped) => (stripped, true),
                    None => (*item, false),
                };
                let (process, event) = item.split_once('@').ok_or_else(bad)?;
                constraints.push(SyncConstraintDecl {
                    process: process.trim().to_owned(),
                    event: event.trim().to_owned(),
                    weak,
                });
            }
            decl.syncs.push(SyncDecl { constraints });
        }
        _ => return Err(bad()),
    }
    Ok(())
}

fn parse_i64(s: &str) -> Result<i64, ParseError> {
    s.trim()
        .parse()
        .map_err(|_| ParseError::BadNumber(s.to_owned()))
}

/// Parses an `&&`-conjunction of clock and integer comparisons.
fn parse_guard(
    input: &str,
    names: &Names<'_>,
) -> Result<(Vec<ConstraintDecl>, Vec<IntGuardDecl>), ParseError> {
    let mut clocks = Vec::new();
    let mut ints = Vec::new();
    for atom in input.split("&&") {
        let atom = atom.trim();
        if atom.is_empty() {
            continue;
        }
        parse_atom(atom, names, &mut clocks, &mut ints)?;
    }
    Ok((clocks, ints))
}

fn parse_atom(
    atom: &str,
    names: &Names<'_>,
    clocks: &mut Vec<ConstraintDecl>,
    ints: &mut Vec<IntGuardDecl>,
) -> Result<(), ParseError> {
    let (lhs_str, op, rhs_str) = split_comparison(atom)?;
    let lhs = Expr::parse(lhs_str)?;
    let rhs = Expr::parse(rhs_str)?;

    let lhs_clocks = lhs.clock_form(names);
    let rhs_clocks = rhs.clock_form(names);
    match (lhs_clocks, rhs_clocks) {
        (Some(l), Some(r)) if l.has_clock() || r.has_clock() => {
            // clock atom: (l.x - l.y) - (r.x - r.y) op (r.c - l.c)
            let diff = ClockSide::combine(&l, &r).ok_or_else(|| {
                ParseError::BadExpression(atom.to_owned())
            })?;
            push_clock_constraints(diff, op, atom, clocks)?;
        }
        _ => {
            if lhs.mentions_clock(names) || rhs.mentions_clock(names) {
                return Err(ParseError::NonConstantClockBound(atom.to_owned()));
            }
            ints.push(int_guard(lhs, op.int_op(), rhs, names)?);
        }
    }
    Ok(())
}

fn int_guard(
    lhs: Expr,
    op: CmpOp,
    rhs: Expr,
    names: &Names<'_>,
) -> Result<IntGuardDecl, ParseError> {
    Ok(IntGuardDecl {
        lhs: lhs.into_int_expr(names)?,
        op,
        rhs: rhs.into_int_expr(names)?,
    })
}

/// A comparison operator of the surface syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl RelOp {
    fn int_op(self) -> CmpOp {
        match self {
            Self::Lt => CmpOp::Lt,
            Self::Le => CmpOp::Le,
            Self::Eq => CmpOp::Eq,
            Self::Ne => CmpOp::Ne,
            Self::Ge => CmpOp::Ge,
            Self::Gt => CmpOp::Gt,
        }
    }
}

fn split_comparison(atom: &str) -> Result<(&str, RelOp, &str), ParseError> {
    for (symbol, op) in [
        ("<=", RelOp::Le),
        (">=", RelOp::Ge),
        ("==", RelOp::Eq),
        ("!=", RelOp::Ne),
        ("<", RelOp::Lt),
        (">", RelOp::Gt),
    ] {
        if let Some(pos) = atom.find(symbol) {
            let lhs = &atom[..pos];
            let rhs = &atom[pos + symbol.len()..];
            return Ok((lhs, op, rhs));
        }
    }
    Err(ParseError::BadExpression(atom.to_owned()))
}

/// One side of a clock comparison in normal form `x - y + c`.
#[derive(Debug, Clone, Default)]
struct ClockSide {
    x: Option<String>,
    y: Option<String>,
    c: i64,
}

impl ClockSide {
    fn has_clock(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// Normalizes `l op r` into `(x - y) op c` by moving clocks left and
    /// constants right; fails when more than one clock remains per side.
    fn combine(l: &ClockSide, r: &ClockSide) -> Option<(Option<String>, Option<String>, i64)> {
        // l.x - l.y op r.x - r.y  =>  (l.x with r.y) - (l.y with r.x)
        let pos = match (&l.x, &r.y) {
            (Some(_), Some(_)) => return None,
            (Some(x), None) => Some(x.clone()),
            (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        };
        let neg = match (&l.y, &r.x) {
            (Some(_), Some(_)) => return None,
            (Some(y), None) => Some(y.clone()),
            (None, Some(y)) => Some(y.clone()),
            (None, None) => None,
        };
        Some((pos, neg, r.c - l.c))
    }
}

fn push_clock_constraints(
    (x, y, value): (Option<String>, Option<String>, i64),
    op: RelOp,
    atom: &str,
    out: &mut Vec<ConstraintDecl>,
) -> Result<(), ParseError> {
    let mut push = |x: Option<String>, y: Option<String>, cmp: Cmp, value: i64| {
        out.push(ConstraintDecl { x, y, cmp, value });
    };
    match op {
        RelOp::Lt => push(x, y, Cmp::Lt, value),
        RelOp::Le => push(x, y, Cmp::Le, value),
        RelOp::Gt => push(y, x, Cmp::Lt, -value),
        RelOp::Ge => push(y, x, Cmp::Le, -value),
        RelOp::Eq => {
            push(x.clone(), y.clone(), Cmp::Le, value);
            push(y, x, Cmp::Le, -value);
        }
        RelOp::Ne => return Err(ParseError::BadExpression(atom.to_owned())),
    }
    Ok(())
}

/// A parsed arithmetic expression before clock/integer classification.
#[derive(Debug, Clone)]
enum Expr {
    Const(i64),
    Name(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    fn parse(input: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(input)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.sum()?;
        if parser.pos != parser.tokens.len() {
            return Err(ParseError::BadExpression(input.trim().to_owned()));
        }
        Ok(expr)
    }

    fn mentions_clock(&self, names: &Names<'_>) -> bool {
        match self {
            Self::Const(_) => false,
            Self::Name(n) => names.is_clock(n),
            Self::Add(a, b) | Self::Sub(a, b) | Self::Mul(a, b) => {
                a.mentions_clock(names) || b.mentions_clock(names)
            }
            Self::Neg(a) => a.mentions_clock(names),
        }
    }

    /// Views the expression as `x - y + c` over clocks; `None` when it is
    /// not of that shape.
    fn clock_form(&self, names: &Names<'_>) -> Option<ClockSide> {
        fn one_of(a: Option<String>, b: Option<String>) -> Option<Option<String>> {
            match (a, b) {
                (Some(_), Some(_)) => None,
                (Some(x), None) | (None, Some(x)) => Some(Some(x)),
                (None, None) => Some(None),
            }
        }
        match self {
            Self::Const(c) => Some(ClockSide {
                c: *c,
                ..Default::default()
            }),
            Self::Name(n) if names.is_clock(n) => Some(ClockSide {
                x: Some(n.clone()),
                ..Default::default()
            }),
            Self::Name(_) => None,
            Self::Sub(a, b) => {
                let a = a.clock_form(names)?;
                let b = b.clock_form(names)?;
                Some(ClockSide {
                    x: one_of(a.x, b.y)?,
                    y: one_of(a.y, b.x)?,
                    c: a.c - b.c,
                })
            }
            Self::Add(a, b) => {
                let a = a.clock_form(names)?;
                let b = b.clock_form(names)?;
                Some(ClockSide {
                    x: one_of(a.x, b.x)?,
                    y: one_of(a.y, b.y)?,
                    c: a.c + b.c,
                })
            }
            Self::Neg(a) => {
                let a = a.clock_form(names)?;
                Some(ClockSide {
                    x: a.y,
                    y: a.x,
                    c: -a.c,
                })
            }
            Self::Mul(_, _) => None,
        }
    }

    fn into_int_expr(self, names: &Names<'_>) -> Result<IntExpr<String>, ParseError> {
        Ok(match self {
            Self::Const(c) => IntExpr::Const(c),
            Self::Name(n) => {
                if !names.is_int(&n) {
                    return Err(ParseError::BadExpression(n));
                }
                IntExpr::Var(n)
            }
            Self::Add(a, b) => IntExpr::Add(
                Box::new(a.into_int_expr(names)?),
                Box::new(b.into_int_expr(names)?),
            ),
            Self::Sub(a, b) => IntExpr::Sub(
                Box::new(a.into_int_expr(names)?),
                Box::new(b.into_int_expr(names)?),
            ),
            Self::Mul(a, b) => IntExpr::Mul(
                Box::new(a.into_int_expr(names)?),
                Box::new(b.into_int_expr(names)?),
            ),
            Self::Neg(a) => IntExpr::Neg(Box::new(a.into_int_expr(names)?)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Name(String),
    Plus,
    Minus,
    Star,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(n) => write!(f, "{n}"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            c if c.is_ascii_digit() => {
                let mut end = i;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = j;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &input[i..=end];
                tokens.push(Token::Number(
                    text.parse().map_err(|_| ParseError::BadNumber(text.to_owned()))?,
                ));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = i;
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '[' || d == ']' {
                        end = j;
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(input[i..=end].to_owned()));
            }
            _ => return Err(ParseError::BadExpression(input.trim().to_owned())),
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn sum(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.product()?;
        while let Some(op) = self.peek().cloned() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.product()?));
                }
                Token::Minus => {
                    self.pos += 1;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.product()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while self.peek() == Some(&Token::Star) {
            self.pos += 1;
            lhs = Expr::Mul(Box::new(lhs), Box::new(self.unary()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Some(Token::Minus) => Ok(Expr::Neg(Box::new(self.unary()?))),
            Some(Token::Number(n)) => Ok(Expr::Const(n)),
            Some(Token::Name(n)) => Ok(Expr::Name(n)),
            Some(Token::Open) => {
                let inner = self.sum()?;
                match self.bump() {
                    Some(Token::Close) => Ok(inner),
                    other => Err(ParseError::BadExpression(
                        other.map_or_else(String::new, |t| t.to_string()),
                    )),
                }
            }
            other => Err(ParseError::BadExpression(
                other.map_or_else(String::new, |t| t.to_string()),
            )),
        }
    }
}

/// Parses a `;`-separated assignment sequence.
fn parse_actions(input: &str, names: &Names<'_>) -> Result<Vec<ActionDecl>, ParseError> {
    let mut actions = Vec::new();
    for stmt in input.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        let (lhs, rhs) = stmt
            .split_once('=')
            .ok_or_else(|| ParseError::BadExpression(stmt.to_owned()))?;
        let lhs = lhs.trim();
        let rhs_expr = Expr::parse(rhs)?;
        if names.is_clock(lhs) {
            match rhs_expr {
                Expr::Const(0) => actions.push(ActionDecl::ResetClock {
                    clock: lhs.to_owned(),
                }),
                _ => return Err(ParseError::BadClockReset(stmt.to_owned())),
            }
        } else {
            actions.push(ActionDecl::SetInt {
                var: lhs.to_owned(),
                expr: rhs_expr.into_int_expr(names)?,
            });
        }
    }
    Ok(actions)
}
