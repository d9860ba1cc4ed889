//! Recursive-descent parser for the generic transfer-function formula.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | '@' digits | 'x' | 'y' | '(' expr ')'
//! ```
//!
//! Coefficients `@0 .. @{n-1}` must be contiguous from zero. The variables
//! are then bound positionally after them: `x` is slot `n`, `y` is slot
//! `n + 1`. `Formula::substituted` renders the string with that
//! substitution applied, which is the form the external fit engine reads.
//!
//! Formulas are capped at `MAX_TOKENS` tokens and `MAX_DEPTH` levels of
//! nesting, which bounds the recursion of both the parser and the tree.

use crate::error::ModelError;

/// Most tokens a formula may contain.
pub const MAX_TOKENS: usize = 1024;

/// Deepest nesting of parentheses and unary signs.
pub const MAX_DEPTH: usize = 128;

/// Compiled expression tree. `Slot(i)` reads the i-th bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Slot(usize),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, slots: &[f64]) -> f64 {
        match self {
            Expr::Number(v) => *v,
            Expr::Slot(i) => slots.get(*i).copied().unwrap_or(f64::NAN),
            Expr::Neg(e) => -e.eval(slots),
            Expr::Add(a, b) => a.eval(slots) + b.eval(slots),
            Expr::Sub(a, b) => a.eval(slots) - b.eval(slots),
            Expr::Mul(a, b) => a.eval(slots) * b.eval(slots),
            Expr::Div(a, b) => a.eval(slots) / b.eval(slots),
        }
    }

    /// Largest slot index referenced, if any.
    pub fn max_slot(&self) -> Option<usize> {
        match self {
            Expr::Number(_) => None,
            Expr::Slot(i) => Some(*i),
            Expr::Neg(e) => e.max_slot(),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.max_slot().max(b.max_slot())
            }
        }
    }
}

/// A parsed formula with its coefficient count and variable slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    substituted: String,
    expr: Expr,
    n_coeffs: usize,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ModelError> {
        let tokens = tokenize(source)?;
        if tokens.len() > MAX_TOKENS {
            return Err(invalid(
                source,
                format!("formula has {} tokens, at most {MAX_TOKENS} allowed", tokens.len()),
            ));
        }

        let mut indices: Vec<usize> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                Tok::Coeff(i) => Some(i),
                _ => None,
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Err(invalid(source, "formula has no @N coefficients"));
        }
        if let Some((pos, &idx)) = indices.iter().enumerate().find(|&(pos, &idx)| pos != idx) {
            return Err(invalid(
                source,
                format!("coefficient indices must be contiguous from @0; @{pos} is missing before @{idx}"),
            ));
        }
        let n_coeffs = indices.len();

        let mut parser = Parser {
            source,
            tokens: &tokens,
            pos: 0,
            depth: 0,
            n_coeffs,
        };
        let expr = parser.expr()?;
        if let Some(t) = tokens.get(parser.pos) {
            return Err(invalid(
                source,
                format!("unexpected '{}' at offset {}", &source[t.start..t.end], t.start),
            ));
        }

        let substituted = substitute(source, &tokens, n_coeffs);
        Ok(Self {
            source: source.to_string(),
            substituted,
            expr,
            n_coeffs,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Formula text with `x` and `y` replaced by their slot references.
    pub fn substituted(&self) -> &str {
        &self.substituted
    }

    pub fn n_coeffs(&self) -> usize {
        self.n_coeffs
    }

    pub fn x_slot(&self) -> usize {
        self.n_coeffs
    }

    pub fn y_slot(&self) -> usize {
        self.n_coeffs + 1
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate with explicit coefficients and mapped coordinates.
    pub fn eval(&self, coeffs: &[f64], x: f64, y: f64) -> Result<f64, ModelError> {
        if coeffs.len() != self.n_coeffs {
            return Err(invalid(
                &self.source,
                format!("expected {} coefficients, got {}", self.n_coeffs, coeffs.len()),
            ));
        }
        let mut slots = Vec::with_capacity(self.n_coeffs + 2);
        slots.extend_from_slice(coeffs);
        slots.push(x);
        slots.push(y);
        Ok(self.expr.eval(&slots))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Number(f64),
    Coeff(usize),
    X,
    Y,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: Tok,
    start: usize,
    end: usize,
}

fn invalid(formula: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidFormula {
        formula: formula.to_string(),
        reason: reason.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ModelError> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'*' => Tok::Star,
            b'/' => Tok::Slash,
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            b'@' => {
                let digits_start = i + 1;
                let mut j = digits_start;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j == digits_start {
                    return Err(invalid(source, format!("'@' without index at offset {start}")));
                }
                let idx = source[digits_start..j]
                    .parse::<usize>()
                    .map_err(|e| invalid(source, format!("bad coefficient index: {e}")))?;
                out.push(Token {
                    kind: Tok::Coeff(idx),
                    start,
                    end: j,
                });
                i = j;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let j = scan_number(bytes, i);
                let value = source[i..j]
                    .parse::<f64>()
                    .map_err(|_| invalid(source, format!("bad number '{}'", &source[i..j])))?;
                out.push(Token {
                    kind: Tok::Number(value),
                    start,
                    end: j,
                });
                i = j;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut j = i;
                while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                    j += 1;
                }
                let kind = match &source[i..j] {
                    "x" => Tok::X,
                    "y" => Tok::Y,
                    other => {
                        return Err(invalid(
                            source,
                            format!("unsupported identifier '{other}' (only x, y and @N allowed)"),
                        ));
                    }
                };
                out.push(Token { kind, start, end: j });
                i = j;
                continue;
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(invalid(
                    source,
                    format!("unsupported character '{ch}' at offset {i}"),
                ));
            }
        };
        out.push(Token {
            kind,
            start,
            end: i + 1,
        });
        i += 1;
    }
    if out.is_empty() {
        return Err(invalid(source, "formula is empty"));
    }
    Ok(out)
}

/// End offset of a decimal literal with optional exponent starting at `i`.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            return j;
        }
    }
    i
}

fn substitute(source: &str, tokens: &[Token], n_coeffs: usize) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut last = 0;
    for t in tokens {
        let slot = match t.kind {
            Tok::X => n_coeffs,
            Tok::Y => n_coeffs + 1,
            _ => continue,
        };
        out.push_str(&source[last..t.start]);
        out.push_str(&format!("@{slot}"));
        last = t.end;
    }
    out.push_str(&source[last..]);
    out
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    n_coeffs: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    fn descend(&mut self) -> Result<(), ModelError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(invalid(
                self.source,
                format!("formula nests deeper than {MAX_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ModelError> {
        let mut lhs = self.term()?;
        while let Some(op @ (Tok::Plus | Tok::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = match op {
                Tok::Plus => Expr::Add(Box::new(lhs), Box::new(rhs)),
                _ => Expr::Sub(Box::new(lhs), Box::new(rhs)),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ModelError> {
        let mut lhs = self.unary()?;
        while let Some(op @ (Tok::Star | Tok::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = match op {
                Tok::Star => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ModelError> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Tok::Plus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ModelError> {
        let at = self.pos;
        match self.bump() {
            Some(Tok::Number(v)) => Ok(Expr::Number(v)),
            Some(Tok::Coeff(i)) => Ok(Expr::Slot(i)),
            Some(Tok::X) => Ok(Expr::Slot(self.n_coeffs)),
            Some(Tok::Y) => Ok(Expr::Slot(self.n_coeffs + 1)),
            Some(Tok::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err(invalid(self.source, "unbalanced parenthesis")),
                }
            }
            Some(_) => {
                let t = self.tokens[at];
                Err(invalid(
                    self.source,
                    format!(
                        "unexpected '{}' at offset {}",
                        &self.source[t.start..t.end],
                        t.start
                    ),
                ))
            }
            None => Err(invalid(self.source, "unexpected end of formula")),
        }
    }
}
