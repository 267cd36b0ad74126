//! Recalculation for the formula shapes the plan compiler emits.
//!
//! This is a small interpreter, not a spreadsheet engine: it covers
//! arithmetic, comparisons, `&`, cell and range references (including whole
//! columns such as `B:B`), and the functions `SUM AVERAGE MIN MAX COUNT
//! COUNTA COUNTIF COUNTIFS SUMIF SUMIFS AVERAGEIF IF IFERROR ABS ROUND`.
//! Anything else evaluates to `#NAME?`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use sheetplan_common::{CellError, CellErrorKind, CellValue, column_index};

/// Read access to the cells a formula may reference.
pub trait CellSource {
    fn value_at(&self, row: u32, col: u32) -> CellValue;

    /// Height used when a whole-column reference (`B:B`) is expanded.
    fn used_rows(&self) -> u32;
}

/// Evaluate `formula` (with or without the leading `=`) against `source`.
pub fn evaluate(formula: &str, source: &dyn CellSource) -> CellValue {
    let body = formula.trim().strip_prefix('=').unwrap_or(formula.trim());
    let expr = match tokenize(body).and_then(|tokens| Parser::new(tokens).parse()) {
        Ok(expr) => expr,
        Err(msg) => return error(CellErrorKind::Name, msg),
    };
    match (Evaluator { source }).eval(&expr) {
        Val::Scalar(v) => v,
        Val::Range(cells) => cells.into_iter().next().unwrap_or_default(),
        Val::Criterion(_) => error(CellErrorKind::Value, "criterion outside a function"),
    }
}

fn error(kind: CellErrorKind, msg: impl Into<String>) -> CellValue {
    CellValue::Error(CellError::new(kind).with_message(msg))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn from_prefix(s: &str) -> Option<(CmpOp, &str)> {
        for (prefix, op) in [
            (">=", CmpOp::Ge),
            ("<=", CmpOp::Le),
            ("<>", CmpOp::Ne),
            (">", CmpOp::Gt),
            ("<", CmpOp::Lt),
            ("=", CmpOp::Eq),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return Some((op, rest));
            }
        }
        None
    }

    fn holds(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Eq => ord == Equal,
            CmpOp::Ne => ord != Equal,
            CmpOp::Lt => ord == Less,
            CmpOp::Le => ord != Greater,
            CmpOp::Gt => ord == Greater,
            CmpOp::Ge => ord != Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Word(String),
    Op(char),
    Cmp(CmpOp),
    LParen,
    RParen,
    Comma,
    Colon,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            ',' => {
                out.push(Token::Comma);
                i += 1;
            }
            ':' => {
                out.push(Token::Colon);
                i += 1;
            }
            '+' | '-' | '*' | '/' | '&' | '^' => {
                out.push(Token::Op(c));
                i += 1;
            }
            '=' => {
                out.push(Token::Cmp(CmpOp::Eq));
                i += 1;
            }
            '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('<', Some('>')) => (CmpOp::Ne, 2),
                    ('<', Some('=')) => (CmpOp::Le, 2),
                    ('>', Some('=')) => (CmpOp::Ge, 2),
                    ('<', _) => (CmpOp::Lt, 1),
                    _ => (CmpOp::Gt, 1),
                };
                out.push(Token::Cmp(op));
                i += width;
            }
            '"' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string literal".into()),
                        Some('"') if chars.get(i + 1) == Some(&'"') => {
                            text.push('"');
                            i += 2;
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                out.push(Token::Text(text));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let n = raw
                    .parse::<f64>()
                    .map_err(|_| format!("bad number `{raw}`"))?;
                out.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '$' || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric()
                        || chars[i] == '$'
                        || chars[i] == '_'
                        || chars[i] == '.')
                {
                    i += 1;
                }
                out.push(Token::Word(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Cell { row: u32, col: u32 },
    Range(RangeRef),
    Criterion(CmpOp, Box<Expr>),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RangeRef {
    start_col: u32,
    end_col: u32,
    /// `None` for whole-column references.
    rows: Option<(u32, u32)>,
}

static REF_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})(?:\$?([0-9]+))?$").expect("reference regex")
});

/// `(col, Some(row))` for `B7`, `(col, None)` for a bare column `B`.
fn parse_ref_part(word: &str) -> Option<(u32, Option<u32>)> {
    let caps = REF_PART.captures(word)?;
    let col = column_index(&caps[1].to_ascii_uppercase())?;
    let row = match caps.get(2) {
        Some(m) => Some(m.as_str().parse::<u32>().ok().filter(|r| *r > 0)?),
        None => None,
    };
    Some((col, row))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, String> {
        let expr = self.expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(t) => Err(format!("unexpected trailing token {t:?}")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: Token) -> Result<(), String> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            other => Err(format!("expected {want:?}, found {other:?}")),
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let left = self.concat()?;
        if let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.concat()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, String> {
        let mut left = self.additive()?;
        while self.peek() == Some(&Token::Op('&')) {
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Binary('&', Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut left = self.power()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.power()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn power(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        while self.peek() == Some(&Token::Op('^')) {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary('^', Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Word(word)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.call(word.to_ascii_uppercase());
                }
                if word.eq_ignore_ascii_case("TRUE") {
                    return Ok(Expr::Bool(true));
                }
                if word.eq_ignore_ascii_case("FALSE") {
                    return Ok(Expr::Bool(false));
                }
                self.reference(&word)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }

    fn reference(&mut self, word: &str) -> Result<Expr, String> {
        let (col, row) =
            parse_ref_part(word).ok_or_else(|| format!("unknown name `{word}`"))?;
        if self.peek() != Some(&Token::Colon) {
            let row = row.ok_or_else(|| format!("column `{word}` needs a range"))?;
            return Ok(Expr::Cell { row, col });
        }
        self.pos += 1;
        let end_word = match self.next() {
            Some(Token::Word(w)) => w,
            // `B2:B10` lexes the end as a word; `B:B` too.
            other => return Err(format!("bad range end {other:?}")),
        };
        let (end_col, end_row) =
            parse_ref_part(&end_word).ok_or_else(|| format!("bad range end `{end_word}`"))?;
        let rows = match (row, end_row) {
            (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
            (None, None) => None,
            _ => return Err(format!("mixed range `{word}:{end_word}`")),
        };
        Ok(Expr::Range(RangeRef {
            start_col: col.min(end_col),
            end_col: col.max(end_col),
            rows,
        }))
    }

    fn call(&mut self, name: String) -> Result<Expr, String> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(Expr::Call(name, args));
        }
        loop {
            args.push(self.argument()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => return Err(format!("expected `,` or `)`, found {other:?}")),
            }
        }
        Ok(Expr::Call(name, args))
    }

    /// Arguments may be bare criteria such as `>10`.
    fn argument(&mut self) -> Result<Expr, String> {
        if let Some(Token::Cmp(op)) = self.peek().cloned() {
            self.pos += 1;
            let operand = self.concat()?;
            return Ok(Expr::Criterion(op, Box::new(operand)));
        }
        self.expr()
    }
}

/// Condition applied to each cell by the `*IF`/`*IFS` family.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    op: CmpOp,
    operand: CellValue,
}

impl Criterion {
    /// Read `">10"`, `"<>North"`, `"X"` or a plain value as a criterion.
    pub fn from_value(value: &CellValue) -> Self {
        if let Some((op, rest)) = value.as_text().and_then(CmpOp::from_prefix) {
            let operand = match rest.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(rest.to_string()),
            };
            return Criterion { op, operand };
        }
        Criterion {
            op: CmpOp::Eq,
            operand: value.clone(),
        }
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        match (&self.operand, self.op) {
            (CellValue::Text(t), CmpOp::Eq) if t.is_empty() => cell.is_blank(),
            (CellValue::Text(t), CmpOp::Ne) if t.is_empty() => !cell.is_blank(),
            (operand, op) => match operand.as_number() {
                Some(n) => match (op, cell.coerce_number()) {
                    (CmpOp::Eq | CmpOp::Ne, Some(c)) => op.holds(c.total_cmp(&n)),
                    (CmpOp::Ne, None) => true,
                    (_, Some(c)) if cell.is_numeric() => op.holds(c.total_cmp(&n)),
                    _ => false,
                },
                None => {
                    if matches!(op, CmpOp::Eq | CmpOp::Ne) {
                        op.holds(cell.normalized().cmp(&operand.normalized()))
                    } else if matches!(cell, CellValue::Text(_)) {
                        op.holds(cell.normalized().cmp(&operand.normalized()))
                    } else {
                        false
                    }
                }
            },
        }
    }
}

enum Val {
    Scalar(CellValue),
    Range(Vec<CellValue>),
    Criterion(Criterion),
}

struct Evaluator<'a> {
    source: &'a dyn CellSource,
}

fn serial_date(d: &NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (*d - epoch).num_days() as f64
}

fn to_number(v: &CellValue) -> Result<f64, CellValue> {
    match v {
        CellValue::Empty => Ok(0.0),
        CellValue::Int(i) => Ok(*i as f64),
        CellValue::Number(n) => Ok(*n),
        CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::Date(d) => Ok(serial_date(d)),
        CellValue::Text(s) if s.trim().is_empty() => Ok(0.0),
        CellValue::Text(_) => v
            .coerce_number()
            .ok_or_else(|| error(CellErrorKind::Value, format!("`{v}` is not a number"))),
        CellValue::Error(_) => Err(v.clone()),
    }
}

fn number(n: f64) -> CellValue {
    if n.is_finite() {
        CellValue::from_number(n)
    } else {
        error(CellErrorKind::Num, "result is not finite")
    }
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Val {
        match expr {
            Expr::Number(n) => Val::Scalar(CellValue::from_number(*n)),
            Expr::Text(s) => Val::Scalar(CellValue::Text(s.clone())),
            Expr::Bool(b) => Val::Scalar(CellValue::Boolean(*b)),
            Expr::Cell { row, col } => Val::Scalar(self.source.value_at(*row, *col)),
            Expr::Range(r) => Val::Range(self.expand(r)),
            Expr::Criterion(op, operand) => {
                let operand = self.scalar(operand);
                Val::Criterion(Criterion {
                    op: *op,
                    operand: match operand {
                        CellValue::Text(ref s) => match s.trim().parse::<f64>() {
                            Ok(n) => CellValue::Number(n),
                            Err(_) => operand,
                        },
                        other => other,
                    },
                })
            }
            Expr::Neg(inner) => Val::Scalar(match to_number(&self.scalar(inner)) {
                Ok(n) => number(-n),
                Err(e) => e,
            }),
            Expr::Binary(op, l, r) => Val::Scalar(self.binary(*op, l, r)),
            Expr::Compare(op, l, r) => {
                let (l, r) = (self.scalar(l), self.scalar(r));
                if let CellValue::Error(_) = l {
                    return Val::Scalar(l);
                }
                if let CellValue::Error(_) = r {
                    return Val::Scalar(r);
                }
                let ord = match (l.as_number(), r.as_number()) {
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    _ => l.normalized().cmp(&r.normalized()),
                };
                Val::Scalar(CellValue::Boolean(op.holds(ord)))
            }
            Expr::Call(name, args) => Val::Scalar(self.call(name, args)),
        }
    }

    fn scalar(&self, expr: &Expr) -> CellValue {
        match self.eval(expr) {
            Val::Scalar(v) => v,
            Val::Range(cells) if cells.len() == 1 => cells.into_iter().next().unwrap_or_default(),
            Val::Range(_) => error(CellErrorKind::Value, "range used where a value was expected"),
            Val::Criterion(_) => error(CellErrorKind::Value, "criterion used as a value"),
        }
    }

    fn expand(&self, r: &RangeRef) -> Vec<CellValue> {
        let (start, end) = r.rows.unwrap_or((1, self.source.used_rows()));
        let mut out = Vec::new();
        for row in start..=end {
            for col in r.start_col..=r.end_col {
                out.push(self.source.value_at(row, col));
            }
        }
        out
    }

    fn binary(&self, op: char, l: &Expr, r: &Expr) -> CellValue {
        let (l, r) = (self.scalar(l), self.scalar(r));
        if op == '&' {
            for v in [&l, &r] {
                if let CellValue::Error(_) = v {
                    return v.clone();
                }
            }
            return CellValue::Text(format!("{l}{r}"));
        }
        let (a, b) = match (to_number(&l), to_number(&r)) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return e,
        };
        match op {
            '+' => number(a + b),
            '-' => number(a - b),
            '*' => number(a * b),
            '/' if b == 0.0 => error(CellErrorKind::Div, "division by zero"),
            '/' => number(a / b),
            '^' => number(a.powf(b)),
            _ => error(CellErrorKind::Value, format!("unknown operator `{op}`")),
        }
    }

    /// Flatten arguments into the numeric cells they hold. Text inside
    /// ranges is skipped; scalar arguments must coerce.
    fn numbers(&self, args: &[Expr]) -> Result<Vec<f64>, CellValue> {
        let mut out = Vec::new();
        for arg in args {
            match self.eval(arg) {
                Val::Range(cells) => {
                    for cell in cells {
                        match cell {
                            CellValue::Error(_) => return Err(cell),
                            other => out.extend(other.as_number()),
                        }
                    }
                }
                Val::Scalar(v) => out.push(to_number(&v)?),
                Val::Criterion(_) => {
                    return Err(error(CellErrorKind::Value, "criterion used as a value"));
                }
            }
        }
        Ok(out)
    }

    fn cells(&self, expr: &Expr) -> Vec<CellValue> {
        match self.eval(expr) {
            Val::Range(cells) => cells,
            Val::Scalar(v) => vec![v],
            Val::Criterion(_) => Vec::new(),
        }
    }

    fn criterion(&self, expr: &Expr) -> Criterion {
        match self.eval(expr) {
            Val::Criterion(c) => c,
            Val::Scalar(v) => Criterion::from_value(&v),
            Val::Range(cells) => Criterion::from_value(&cells.into_iter().next().unwrap_or_default()),
        }
    }

    /// Indices of the cells satisfying every `(range, criterion)` pair.
    fn matching(&self, pairs: &[Expr]) -> Result<Vec<usize>, CellValue> {
        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Err(error(CellErrorKind::Value, "criteria must come in pairs"));
        }
        let mut selected: Option<Vec<usize>> = None;
        for pair in pairs.chunks(2) {
            let cells = self.cells(&pair[0]);
            let crit = self.criterion(&pair[1]);
            let hits: Vec<usize> = cells
                .iter()
                .enumerate()
                .filter(|(_, c)| crit.matches(c))
                .map(|(i, _)| i)
                .collect();
            selected = Some(match selected {
                None => hits,
                Some(prev) => prev.into_iter().filter(|i| hits.contains(i)).collect(),
            });
        }
        Ok(selected.unwrap_or_default())
    }

    fn pick_sum(&self, target: &Expr, idx: &[usize]) -> (f64, usize) {
        let cells = self.cells(target);
        idx.iter()
            .filter_map(|i| cells.get(*i).and_then(CellValue::as_number))
            .fold((0.0, 0), |(s, n), v| (s + v, n + 1))
    }

    fn call(&self, name: &str, args: &[Expr]) -> CellValue {
        let arity = |min: usize, max: usize| -> Result<(), CellValue> {
            if args.len() < min || args.len() > max {
                Err(error(
                    CellErrorKind::Value,
                    format!("{name} takes {min}..={max} arguments, got {}", args.len()),
                ))
            } else {
                Ok(())
            }
        };
        let result: Result<CellValue, CellValue> = (|| match name {
            "SUM" => Ok(number(self.numbers(args)?.iter().sum())),
            "AVERAGE" => {
                let ns = self.numbers(args)?;
                if ns.is_empty() {
                    return Err(error(CellErrorKind::Div, "AVERAGE of no numbers"));
                }
                Ok(number(ns.iter().sum::<f64>() / ns.len() as f64))
            }
            "MIN" => Ok(number(
                self.numbers(args)?.into_iter().reduce(f64::min).unwrap_or(0.0),
            )),
            "MAX" => Ok(number(
                self.numbers(args)?.into_iter().reduce(f64::max).unwrap_or(0.0),
            )),
            "COUNT" => Ok(CellValue::Int(
                args.iter()
                    .flat_map(|a| self.cells(a))
                    .filter(CellValue::is_numeric)
                    .count() as i64,
            )),
            "COUNTA" => Ok(CellValue::Int(
                args.iter()
                    .flat_map(|a| self.cells(a))
                    .filter(|c| !matches!(c, CellValue::Empty))
                    .count() as i64,
            )),
            "COUNTIF" => {
                arity(2, 2)?;
                Ok(CellValue::Int(self.matching(args)?.len() as i64))
            }
            "COUNTIFS" => Ok(CellValue::Int(self.matching(args)?.len() as i64)),
            "SUMIF" => {
                arity(2, 3)?;
                let idx = self.matching(&args[..2])?;
                let target = args.get(2).unwrap_or(&args[0]);
                Ok(number(self.pick_sum(target, &idx).0))
            }
            "SUMIFS" => {
                if args.is_empty() {
                    return Err(error(CellErrorKind::Value, "SUMIFS needs a sum range"));
                }
                let idx = self.matching(&args[1..])?;
                Ok(number(self.pick_sum(&args[0], &idx).0))
            }
            "AVERAGEIF" => {
                arity(2, 3)?;
                let idx = self.matching(&args[..2])?;
                let target = args.get(2).unwrap_or(&args[0]);
                let (sum, n) = self.pick_sum(target, &idx);
                if n == 0 {
                    return Err(error(CellErrorKind::Div, "AVERAGEIF matched nothing"));
                }
                Ok(number(sum / n as f64))
            }
            "IFERROR" => {
                arity(2, 2)?;
                match self.scalar(&args[0]) {
                    CellValue::Error(_) => Ok(self.scalar(&args[1])),
                    v => Ok(v),
                }
            }
            "IF" => {
                arity(2, 3)?;
                let cond = to_number(&self.scalar(&args[0]))?;
                if cond != 0.0 {
                    Ok(self.scalar(&args[1]))
                } else {
                    Ok(args
                        .get(2)
                        .map(|e| self.scalar(e))
                        .unwrap_or(CellValue::Boolean(false)))
                }
            }
            "ABS" => {
                arity(1, 1)?;
                Ok(number(to_number(&self.scalar(&args[0]))?.abs()))
            }
            "ROUND" => {
                arity(1, 2)?;
                let n = to_number(&self.scalar(&args[0]))?;
                let digits = match args.get(1) {
                    Some(e) => to_number(&self.scalar(e))? as i32,
                    None => 0,
                };
                let scale = 10f64.powi(digits);
                Ok(number((n * scale).round() / scale))
            }
            other => Err(error(CellErrorKind::Name, format!("unknown function `{other}`"))),
        })();
        result.unwrap_or_else(|e| e)
    }
}
