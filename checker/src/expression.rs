//! A small expression evaluator for `trigger.expression` (§3, §4.C
//! "Expression" rule). The original evaluates these with a general-purpose
//! expression-language library (`govaluate`) against a small fixed set of
//! variables (`t1`, `t2`, ..., `PREV_STATE`, `WARN_VALUE`, `ERROR_VALUE`,
//! the state literals, comparison/logical/ternary operators). No
//! equivalent crate is part of this workspace's dependency stack, so this
//! module hand-rolls a recursive-descent parser over that same constrained
//! grammar rather than pulling in a general-purpose scripting engine for a
//! handful of operators.
//!
//! Grammar (highest to lowest precedence):
//! `primary := number | ident | '(' expr ')'`
//! `unary := '!' unary | '-' unary | primary`
//! `mul := unary (('*' | '/') unary)*`
//! `add := mul (('+' | '-') mul)*`
//! `cmp := add (('>' | '>=' | '<' | '<=' | '==' | '!=') add)?`
//! `and := cmp ('&&' cmp)*`
//! `or := and ('||' and)*`
//! `ternary := or ('?' ternary ':' ternary)?`

use shared::types::State;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
    State(State),
}

impl Value {
    fn as_num(&self) -> Result<f64, String> {
        match self {
            | Value::Num(n) => Ok(*n),
            | other => Err(format!("expected a number, got {other:?}")),
        }
    }

    fn as_bool(&self) -> Result<bool, String> {
        match self {
            | Value::Bool(b) => Ok(*b),
            | Value::Num(n) => Ok(*n != 0.0),
            | other => Err(format!("expected a boolean, got {other:?}")),
        }
    }
}

/// The variables an expression rule may reference.
pub struct ExpressionValues {
    pub main: Option<f64>,
    pub additional: Vec<Option<f64>>,
    pub prev_state: State,
    pub warn_value: Option<f64>,
    pub error_value: Option<f64>,
}

pub fn evaluate(expr: &str, values: &ExpressionValues) -> Result<State, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let ast = parser.parse_ternary()?;
    if parser.pos != tokens.len() {
        return Err(format!(
            "unexpected trailing tokens in expression \"{expr}\""
        ));
    }
    match ast.eval(values)? {
        | Value::State(s) => Ok(s),
        | other => Err(format!(
            "expression \"{expr}\" must evaluate to a state, got {other:?}"
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    QMark,
    Colon,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            | '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            | ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            | '?' => {
                tokens.push(Token::QMark);
                i += 1;
            }
            | ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            | '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(match c {
                    | '+' => "+",
                    | '-' => "-",
                    | '*' => "*",
                    | _ => "/",
                }));
                i += 1;
            }
            | '>' | '<' | '=' | '!' | '&' | '|' => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let (op, len) = match two.as_str() {
                    | ">=" => (">=", 2),
                    | "<=" => ("<=", 2),
                    | "==" => ("==", 2),
                    | "!=" => ("!=", 2),
                    | "&&" => ("&&", 2),
                    | "||" => ("||", 2),
                    | _ => match c {
                        | '>' => (">", 1),
                        | '<' => ("<", 1),
                        | '!' => ("!", 1),
                        | other => {
                            return Err(format!(
                                "unexpected character '{other}' in expression"
                            ));
                        }
                    },
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            | c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit() || chars[i] == '.')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number literal \"{text}\""))?;
                tokens.push(Token::Num(num));
            }
            | c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(text));
            }
            | other => {
                return Err(format!(
                    "unexpected character '{other}' in expression"
                ));
            }
        }
    }
    Ok(tokens)
}

enum Ast {
    Num(f64),
    Ident(String),
    Unary(&'static str, Box<Ast>),
    Binary(&'static str, Box<Ast>, Box<Ast>),
    Ternary(Box<Ast>, Box<Ast>, Box<Ast>),
}

impl Ast {
    fn eval(&self, values: &ExpressionValues) -> Result<Value, String> {
        match self {
            | Ast::Num(n) => Ok(Value::Num(*n)),
            | Ast::Ident(name) => resolve_ident(name, values),
            | Ast::Unary("!", inner) => {
                Ok(Value::Bool(!inner.eval(values)?.as_bool()?))
            }
            | Ast::Unary("-", inner) => {
                Ok(Value::Num(-inner.eval(values)?.as_num()?))
            }
            | Ast::Unary(op, _) => Err(format!("unknown unary operator {op}")),
            | Ast::Binary(op, lhs, rhs) => eval_binary(op, lhs, rhs, values),
            | Ast::Ternary(cond, a, b) => {
                if cond.eval(values)?.as_bool()? {
                    a.eval(values)
                } else {
                    b.eval(values)
                }
            }
        }
    }
}

fn eval_binary(
    op: &str,
    lhs: &Ast,
    rhs: &Ast,
    values: &ExpressionValues,
) -> Result<Value, String> {
    match op {
        | "&&" => {
            Ok(Value::Bool(
                lhs.eval(values)?.as_bool()? && rhs.eval(values)?.as_bool()?,
            ))
        }
        | "||" => {
            Ok(Value::Bool(
                lhs.eval(values)?.as_bool()? || rhs.eval(values)?.as_bool()?,
            ))
        }
        | "+" | "-" | "*" | "/" => {
            let l = lhs.eval(values)?.as_num()?;
            let r = rhs.eval(values)?.as_num()?;
            Ok(Value::Num(match op {
                | "+" => l + r,
                | "-" => l - r,
                | "*" => l * r,
                | _ => l / r,
            }))
        }
        | "==" | "!=" => {
            let l = lhs.eval(values)?;
            let r = rhs.eval(values)?;
            let equal = l == r;
            Ok(Value::Bool(if op == "==" { equal } else { !equal }))
        }
        | ">" | ">=" | "<" | "<=" => {
            let l = lhs.eval(values)?.as_num()?;
            let r = rhs.eval(values)?.as_num()?;
            Ok(Value::Bool(match op {
                | ">" => l > r,
                | ">=" => l >= r,
                | "<" => l < r,
                | _ => l <= r,
            }))
        }
        | other => Err(format!("unknown binary operator {other}")),
    }
}

fn resolve_ident(
    name: &str,
    values: &ExpressionValues,
) -> Result<Value, String> {
    if let Some(state) = parse_state_literal(name) {
        return Ok(Value::State(state));
    }
    match name {
        | "PREV_STATE" => Ok(Value::State(values.prev_state)),
        | "WARN_VALUE" => values
            .warn_value
            .map(Value::Num)
            .ok_or_else(|| "WARN_VALUE is not set on this trigger".to_owned()),
        | "ERROR_VALUE" => values
            .error_value
            .map(Value::Num)
            .ok_or_else(|| "ERROR_VALUE is not set on this trigger".to_owned()),
        | "t1" => values
            .main
            .map(Value::Num)
            .ok_or_else(|| "t1 has no value at this step".to_owned()),
        | other if other.starts_with('t') => {
            let index: usize = other[1..]
                .parse()
                .map_err(|_| format!("unknown identifier \"{other}\""))?;
            values
                .additional
                .get(index.wrapping_sub(2))
                .copied()
                .flatten()
                .map(Value::Num)
                .ok_or_else(|| format!("{other} has no value at this step"))
        }
        | other => Err(format!("unknown identifier \"{other}\"")),
    }
}

fn parse_state_literal(name: &str) -> Option<State> {
    match name {
        | "OK" => Some(State::Ok),
        | "WARN" => Some(State::Warn),
        | "ERROR" => Some(State::Error),
        | "NODATA" => Some(State::NoData),
        | "EXCEPTION" => Some(State::Exception),
        | _ => None,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_ternary(&mut self) -> Result<Ast, String> {
        let cond = self.parse_or()?;
        if matches!(self.peek(), Some(Token::QMark)) {
            self.pos += 1;
            let a = self.parse_ternary()?;
            match self.advance() {
                | Some(Token::Colon) => {}
                | _ => return Err("expected ':' in ternary expression".into()),
            }
            let b = self.parse_ternary()?;
            return Ok(Ast::Ternary(Box::new(cond), Box::new(a), Box::new(b)));
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Ast, String> {
        let mut lhs = self.parse_and()?;
        while self.eat_op("||") {
            let rhs = self.parse_and()?;
            lhs = Ast::Binary("||", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Ast, String> {
        let mut lhs = self.parse_cmp()?;
        while self.eat_op("&&") {
            let rhs = self.parse_cmp()?;
            lhs = Ast::Binary("&&", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Ast, String> {
        let lhs = self.parse_add()?;
        for op in [">=", "<=", "==", "!=", ">", "<"] {
            if self.eat_op(op) {
                let rhs = self.parse_add()?;
                return Ok(Ast::Binary(op, Box::new(lhs), Box::new(rhs)));
            }
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Ast, String> {
        let mut lhs = self.parse_mul()?;
        loop {
            if self.eat_op("+") {
                let rhs = self.parse_mul()?;
                lhs = Ast::Binary("+", Box::new(lhs), Box::new(rhs));
            } else if self.eat_op("-") {
                let rhs = self.parse_mul()?;
                lhs = Ast::Binary("-", Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Ast, String> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.eat_op("*") {
                let rhs = self.parse_unary()?;
                lhs = Ast::Binary("*", Box::new(lhs), Box::new(rhs));
            } else if self.eat_op("/") {
                let rhs = self.parse_unary()?;
                lhs = Ast::Binary("/", Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Ast, String> {
        if self.eat_op("!") {
            return Ok(Ast::Unary("!", Box::new(self.parse_unary()?)));
        }
        if self.eat_op("-") {
            return Ok(Ast::Unary("-", Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Ast, String> {
        match self.advance() {
            | Some(Token::Num(n)) => Ok(Ast::Num(*n)),
            | Some(Token::Ident(name)) => Ok(Ast::Ident(name.clone())),
            | Some(Token::LParen) => {
                let inner = self.parse_ternary()?;
                match self.advance() {
                    | Some(Token::RParen) => Ok(inner),
                    | _ => Err("expected closing ')'".into()),
                }
            }
            | other => Err(format!("unexpected token {other:?} in expression")),
        }
    }
}
