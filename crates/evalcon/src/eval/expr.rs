#![forbid(unsafe_code)]

//! Expression-only evaluator.
//!
//! Source text is tokenized up front and then evaluated in a single
//! recursive-descent pass, lowest precedence first:
//!
//! ```text
//! program     := expression? ";"?
//! expression  := or
//! or          := and ("||" and)*
//! and         := equality ("&&" equality)*
//! equality    := relational (("===" | "!==" | "==" | "!=") relational)*
//! relational  := additive (("<" | "<=" | ">" | ">=") additive)*
//! additive    := term (("+" | "-") term)*
//! term        := unary (("*" | "/" | "%") unary)*
//! unary       := ("-" | "+" | "!" | "typeof") unary | postfix
//! postfix     := primary ("." ident | "[" expression "]")*
//! primary     := number | string | ident | "(" expression ")"
//!              | "[" (expression ",")* "]" | "{" (key (":" expression)? ",")* "}"
//! ```
//!
//! Identifiers resolve against the scope, prototype chain included. The
//! right operand of a short-circuited `&&` / `||` is parsed but not
//! evaluated. A runtime failure stops evaluation but parsing continues, so a
//! syntax error anywhere in the text wins over a runtime error.

use super::Evaluator;
use crate::value::{ErrorValue, ObjectRef, Value, format_number};

/// Nesting depth past which evaluation fails with a `RangeError`.
const MAX_NESTING: usize = 64;

/// Longest match first.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "(",
    ")", "[", "]", "{", "}", ",", ":", ".", ";",
];

type Eval<T> = Result<T, Value>;

/// Evaluates a restricted, side-effect free expression language with the
/// scope as its global environment.
///
/// ```
/// use evalcon::{Evaluator, ExprEvaluator, Value};
///
/// let scope = Value::object([("x", Value::from(20))]);
/// let result = ExprEvaluator::new().evaluate("x * 2 + 2", &scope);
/// assert_eq!(result.unwrap().to_display_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, source: &str, scope: &Value) -> Result<Value, Value> {
        let tokens = tokenize(source)?;
        Parser {
            tokens,
            pos: 0,
            scope,
            nesting: 0,
            skipping: 0,
            raised: None,
        }
        .program()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Number(_) => "Unexpected number".to_owned(),
            Self::Str(_) => "Unexpected string".to_owned(),
            Self::Ident(name) => format!("Unexpected identifier '{name}'"),
            Self::Punct(punct) => format!("Unexpected token '{punct}'"),
        }
    }
}

fn syntax_error(message: impl Into<String>) -> Value {
    Value::from(ErrorValue::syntax(message))
}

fn invalid_token() -> Value {
    syntax_error("Invalid or unexpected token")
}

fn unexpected(token: Option<&Token>) -> Value {
    syntax_error(token.map_or_else(|| "Unexpected end of input".to_owned(), Token::describe))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(source: &str) -> Eval<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source.trim_start();
    while let Some(c) = rest.chars().next() {
        let consumed = if c.is_ascii_digit()
            || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit()))
        {
            let (number, len) = lex_number(rest)?;
            tokens.push(Token::Number(number));
            len
        } else if c == '"' || c == '\'' {
            let (text, len) = lex_string(rest, c)?;
            tokens.push(Token::Str(text));
            len
        } else if is_ident_start(c) {
            let len = rest
                .find(|c: char| !is_ident_continue(c))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..len].to_owned()));
            len
        } else if let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            tokens.push(Token::Punct(*punct));
            punct.len()
        } else {
            return Err(invalid_token());
        };
        rest = rest[consumed..].trim_start();
    }
    Ok(tokens)
}

fn lex_number(rest: &str) -> Eval<(f64, usize)> {
    let bytes = rest.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };
    let mut end = digits_from(0);
    if bytes.get(end) == Some(&b'.') {
        end = digits_from(end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_end = digits_from(end + 1 + sign);
        if exponent_end == end + 1 + sign {
            return Err(invalid_token());
        }
        end = exponent_end;
    }
    if rest[end..].starts_with(is_ident_continue) {
        return Err(invalid_token());
    }
    let number = rest[..end].parse().map_err(|_| invalid_token())?;
    Ok((number, end))
}

fn lex_string(rest: &str, quote: char) -> Eval<(String, usize)> {
    let mut text = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((index, c)) = chars.next() {
        match c {
            _ if c == quote => return Ok((text, index + c.len_utf8())),
            '\n' | '\r' => break,
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            }
            _ => text.push(c),
        }
    }
    Err(invalid_token())
}

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    scope: &'s Value,
    nesting: usize,
    /// Depth of short-circuited operands currently being parsed.
    skipping: usize,
    /// First runtime failure; evaluation stops once set.
    raised: Option<Value>,
}

impl Parser<'_> {
    fn program(mut self) -> Eval<Value> {
        let value = if self.peek().is_none() || self.at(";") {
            Value::Undefined
        } else {
            self.expression()?
        };
        self.eat(";");
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        match self.raised {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn unexpected(&self) -> Value {
        unexpected(self.peek())
    }

    fn at(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn eat(&mut self, punct: &str) -> bool {
        let found = self.at(punct);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_any(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        let op = match self.peek() {
            Some(Token::Punct(p)) if ops.contains(p) => *p,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn expect(&mut self, punct: &str) -> Eval<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Run one evaluation step unless evaluation is off.
    fn run(&mut self, step: impl FnOnce() -> Eval<Value>) -> Value {
        if self.skipping > 0 || self.raised.is_some() {
            return Value::Undefined;
        }
        step().unwrap_or_else(|error| {
            self.raised = Some(error);
            Value::Undefined
        })
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Eval<Value>) -> Eval<Value> {
        if self.nesting >= MAX_NESTING {
            return Err(Value::from(ErrorValue::new(
                "RangeError",
                "Maximum call stack size exceeded",
            )));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn skipped_if(&mut self, skip: bool, parse: fn(&mut Self) -> Eval<Value>) -> Eval<Value> {
        if skip {
            self.skipping += 1;
        }
        let result = parse(self);
        if skip {
            self.skipping -= 1;
        }
        result
    }

    fn expression(&mut self) -> Eval<Value> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Eval<Value> {
        let mut left = self.logical_and()?;
        while self.eat("||") {
            let short = left.is_truthy();
            let right = self.skipped_if(short, Self::logical_and)?;
            if !short {
                left = right;
            }
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Eval<Value> {
        let mut left = self.equality()?;
        while self.eat("&&") {
            let short = !left.is_truthy();
            let right = self.skipped_if(short, Self::equality)?;
            if !short {
                left = right;
            }
        }
        Ok(left)
    }

    fn equality(&mut self) -> Eval<Value> {
        let mut left = self.relational()?;
        while let Some(op) = self.eat_any(&["===", "!==", "==", "!="]) {
            let right = self.relational()?;
            left = self.run(|| {
                Ok(Value::Bool(match op {
                    "===" => left.strict_equals(&right),
                    "!==" => !left.strict_equals(&right),
                    "==" => loose_equals(&left, &right),
                    _ => !loose_equals(&left, &right),
                }))
            });
        }
        Ok(left)
    }

    fn relational(&mut self) -> Eval<Value> {
        let mut left = self.additive()?;
        while let Some(op) = self.eat_any(&["<=", ">=", "<", ">"]) {
            let right = self.additive()?;
            left = self.run(|| Ok(compare(op, &left, &right)));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Eval<Value> {
        let mut left = self.term()?;
        while let Some(op) = self.eat_any(&["+", "-"]) {
            let right = self.term()?;
            left = self.run(|| Ok(arithmetic(op, &left, &right)));
        }
        Ok(left)
    }

    fn term(&mut self) -> Eval<Value> {
        let mut left = self.unary()?;
        while let Some(op) = self.eat_any(&["*", "/", "%"]) {
            let right = self.unary()?;
            left = self.run(|| Ok(arithmetic(op, &left, &right)));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Eval<Value> {
        if let Some(op) = self.eat_any(&["-", "+", "!"]) {
            let operand = self.nested(Self::unary)?;
            return Ok(self.run(|| {
                Ok(match op {
                    "-" => Value::Number(-operand.to_number()),
                    "+" => Value::Number(operand.to_number()),
                    _ => Value::Bool(!operand.is_truthy()),
                })
            }));
        }
        if matches!(self.peek(), Some(Token::Ident(name)) if name == "typeof") {
            self.pos += 1;
            return self.type_of();
        }
        self.postfix()
    }

    /// `typeof` of an undeclared bare identifier is `"undefined"`, not an error.
    fn type_of(&mut self) -> Eval<Value> {
        let bare = match (self.peek(), self.tokens.get(self.pos + 1)) {
            (Some(Token::Ident(name)), next)
                if !is_keyword(name)
                    && !matches!(next, Some(Token::Punct("." | "["))) =>
            {
                Some(name.clone())
            }
            _ => None,
        };
        let operand = match bare {
            Some(name) => {
                self.pos += 1;
                self.scope.property(&name).unwrap_or_default()
            }
            None => self.nested(Self::unary)?,
        };
        Ok(self.run(|| Ok(Value::string(operand.type_name()))))
    }

    fn postfix(&mut self) -> Eval<Value> {
        let mut value = self.primary()?;
        loop {
            if self.eat(".") {
                let key = match self.peek() {
                    Some(Token::Ident(name)) => name.clone(),
                    _ => return Err(self.unexpected()),
                };
                self.pos += 1;
                value = self.run(|| member(&value, &key));
            } else if self.eat("[") {
                let key = self.nested(Self::expression)?;
                self.expect("]")?;
                value = self.run(|| member(&value, &key.to_display_string()));
            } else {
                return Ok(value);
            }
        }
    }

    fn primary(&mut self) -> Eval<Value> {
        match self.next_token() {
            Some(Token::Number(n)) => Ok(Value::Number(n)),
            Some(Token::Str(text)) => Ok(Value::String(text)),
            Some(Token::Ident(name)) => Ok(self.identifier(&name)),
            Some(Token::Punct("(")) => {
                let value = self.nested(Self::expression)?;
                self.expect(")")?;
                Ok(value)
            }
            Some(Token::Punct("[")) => self.nested(Self::array_literal),
            Some(Token::Punct("{")) => self.nested(Self::object_literal),
            token => Err(unexpected(token.as_ref())),
        }
    }

    fn identifier(&mut self, name: &str) -> Value {
        match name {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            "undefined" => Value::Undefined,
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            "this" => self.scope.clone(),
            _ => {
                let scope = self.scope;
                self.run(|| {
                    scope.property(name).ok_or_else(|| {
                        Value::from(ErrorValue::reference(format!("{name} is not defined")))
                    })
                })
            }
        }
    }

    /// Called after the opening `[`.
    fn array_literal(&mut self) -> Eval<Value> {
        let mut items = Vec::new();
        while !self.eat("]") {
            items.push(self.expression()?);
            if !self.eat(",") {
                self.expect("]")?;
                break;
            }
        }
        Ok(Value::array(items))
    }

    /// Called after the opening `{`.
    fn object_literal(&mut self) -> Eval<Value> {
        let object = ObjectRef::new();
        while !self.eat("}") {
            let (key, shorthand) = match self.next_token() {
                Some(Token::Ident(name)) => (name, true),
                Some(Token::Str(text)) => (text, false),
                Some(Token::Number(n)) => (format_number(n), false),
                token => return Err(unexpected(token.as_ref())),
            };
            let value = if self.eat(":") {
                self.expression()?
            } else if shorthand && (self.at(",") || self.at("}")) {
                self.identifier(&key)
            } else {
                return Err(self.unexpected());
            };
            object.set(key, value);
            if !self.eat(",") {
                self.expect("}")?;
                break;
            }
        }
        Ok(Value::Object(object))
    }
}

/// Words that never resolve against the scope.
fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "true" | "false" | "null" | "undefined" | "NaN" | "Infinity" | "this" | "typeof"
    )
}

fn member(object: &Value, key: &str) -> Eval<Value> {
    if object.is_nullish() {
        return Err(Value::from(ErrorValue::type_error(format!(
            "Cannot read properties of {object} (reading '{key}')"
        ))));
    }
    Ok(object.property(key).unwrap_or_default())
}

/// Containers convert to their display string when an operator needs a
/// primitive.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_)
        | Value::Object(_)
        | Value::Error(_)
        | Value::Element(_)
        | Value::Function { .. } => Value::String(value.to_display_string()),
        other => other.clone(),
    }
}

fn arithmetic(op: &str, left: &Value, right: &Value) -> Value {
    if op == "+" {
        let (left, right) = (to_primitive(left), to_primitive(right));
        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            let mut text = left.to_display_string();
            text.push_str(&right.to_display_string());
            return Value::String(text);
        }
        return Value::Number(left.to_number() + right.to_number());
    }
    let (a, b) = (left.to_number(), right.to_number());
    Value::Number(match op {
        "-" => a - b,
        "*" => a * b,
        "/" => a / b,
        _ => a % b,
    })
}

fn compare(op: &str, left: &Value, right: &Value) -> Value {
    let ordering = match (to_primitive(left), to_primitive(right)) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    };
    Value::Bool(ordering.is_some_and(|ordering| match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

fn is_container(value: &Value) -> bool {
    matches!(
        value,
        Value::Array(_)
            | Value::Object(_)
            | Value::Error(_)
            | Value::Element(_)
            | Value::Function { .. }
    )
}

/// `==` semantics.
fn loose_equals(left: &Value, right: &Value) -> bool {
    if left.is_nullish() || right.is_nullish() {
        return left.is_nullish() && right.is_nullish();
    }
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        return left.strict_equals(right);
    }
    match (is_container(left), is_container(right)) {
        (true, true) => false,
        (true, false) => loose_equals(&to_primitive(left), right),
        (false, true) => loose_equals(left, &to_primitive(right)),
        (false, false) => {
            if matches!(left, Value::Symbol(_)) || matches!(right, Value::Symbol(_)) {
                return false;
            }
            left.to_number() == right.to_number()
        }
    }
}
