//! The expression language of template bindings: literals, property paths
//! and negation.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path { root: String, segments: Vec<Segment> },
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at {pos}")]
    Unexpected { ch: char, pos: usize },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

impl Expr {
    pub fn parse(src: &str) -> Result<Expr, ExprError> {
        let mut p = Cursor { src, pos: 0 };
        p.skip_ws();
        if p.peek().is_none() {
            return Err(ExprError::Empty);
        }
        let expr = p.unary()?;
        p.skip_ws();
        match p.peek() {
            None => Ok(expr),
            Some(ch) => Err(ExprError::Unexpected { ch, pos: p.pos }),
        }
    }

    /// Identifier the expression reads first, if it is a path.
    pub fn root(&self) -> Option<&str> {
        match self {
            Expr::Path { root, .. } => Some(root),
            Expr::Not(inner) => inner.root(),
            Expr::Literal(_) => None,
        }
    }

    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<Value>) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Not(inner) => Value::Bool(!is_truthy(&inner.eval(lookup))),
            Expr::Path { root, segments } => {
                let mut cur = lookup(root).unwrap_or(Value::Null);
                for seg in segments {
                    cur = match (seg, &cur) {
                        (Segment::Key(k), Value::Object(map)) => {
                            map.get(k).cloned().unwrap_or(Value::Null)
                        }
                        (Segment::Key(k), Value::Array(items)) if k == "length" => {
                            Value::from(items.len())
                        }
                        (Segment::Key(k), Value::String(s)) if k == "length" => {
                            Value::from(s.chars().count())
                        }
                        (Segment::Index(i), Value::Array(items)) => {
                            items.get(*i).cloned().unwrap_or(Value::Null)
                        }
                        _ => Value::Null,
                    };
                }
                cur
            }
        }
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn unexpected(&self) -> ExprError {
        match self.peek() {
            Some(ch) => ExprError::Unexpected { ch, pos: self.pos },
            None => ExprError::UnexpectedEnd,
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        self.skip_ws();
        if self.peek() == Some('!') {
            self.bump();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                Ok(Expr::Literal(Value::String(self.string(q)?)))
            }
            Some(ch) if ch.is_ascii_digit() || ch == '-' => self.number(),
            Some(ch) if is_ident_start(ch) => {
                let ident = self.ident();
                match ident.as_str() {
                    "true" => return Ok(Expr::Literal(Value::Bool(true))),
                    "false" => return Ok(Expr::Literal(Value::Bool(false))),
                    "null" | "undefined" => return Ok(Expr::Literal(Value::Null)),
                    _ => {}
                }
                let segments = self.segments()?;
                Ok(Expr::Path {
                    root: ident,
                    segments,
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn segments(&mut self) -> Result<Vec<Segment>, ExprError> {
        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    if !self.peek().is_some_and(is_ident_start) {
                        return Err(self.unexpected());
                    }
                    segments.push(Segment::Key(self.ident()));
                }
                Some('[') => {
                    self.bump();
                    self.skip_ws();
                    let seg = match self.peek() {
                        Some(q @ ('"' | '\'')) => {
                            self.bump();
                            Segment::Key(self.string(q)?)
                        }
                        Some(ch) if ch.is_ascii_digit() => {
                            let start = self.pos;
                            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                                self.bump();
                            }
                            let n = self.src[start..self.pos]
                                .parse()
                                .map_err(|_| ExprError::Unexpected { ch, pos: start })?;
                            Segment::Index(n)
                        }
                        _ => return Err(self.unexpected()),
                    };
                    self.skip_ws();
                    if self.bump() != Some(']') {
                        return Err(ExprError::UnexpectedEnd);
                    }
                    segments.push(seg);
                }
                _ => return Ok(segments),
            }
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn string(&mut self, quote: char) -> Result<String, ExprError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ExprError::UnterminatedString),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(ExprError::UnterminatedString),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Expr, ExprError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.bump();
        }
        let raw = &self.src[start..self.pos];
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Expr::Literal(Value::from(n)));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or(ExprError::Unexpected { ch: '-', pos: start })
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

/// Splits call arguments on top-level commas.
pub fn split_args(args: &str) -> Vec<&str> {
    if args.trim().is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let (mut depth, mut quote, mut start) = (0i32, None, 0);
    for (i, ch) in args.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                out.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&args[start..]);
    out
}

pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a value as shown by an interpolation.
pub fn to_display(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(v).unwrap_or_default()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_arguments_at_top_level() {
        assert_eq!(split_args("a, 'x,y', b[0]"), vec!["a", " 'x,y'", " b[0]"]);
        assert!(split_args("  ").is_empty());
    }

    #[test]
    fn parses_paths_and_literals() {
        assert_eq!(Expr::parse(" 'hi' ").unwrap(), Expr::Literal(json!("hi")));
        assert_eq!(Expr::parse("42").unwrap(), Expr::Literal(json!(42)));
        assert_eq!(Expr::parse("-1.5").unwrap(), Expr::Literal(json!(-1.5)));
        let e = Expr::parse("user.tags[0]").unwrap();
        assert_eq!(e.root(), Some("user"));
        assert_eq!(
            e,
            Expr::Path {
                root: "user".into(),
                segments: vec![Segment::Key("tags".into()), Segment::Index(0)],
            }
        );
    }

    #[test]
    fn reports_syntax_errors() {
        assert_eq!(Expr::parse("   "), Err(ExprError::Empty));
        assert_eq!(Expr::parse("'open"), Err(ExprError::UnterminatedString));
        assert!(matches!(
            Expr::parse("a + b"),
            Err(ExprError::Unexpected { ch: '+', .. })
        ));
        assert!(Expr::parse("a.").is_err());
    }

    #[test]
    fn evaluates_against_lookup() {
        let data = json!({ "user": { "name": "ada", "tags": ["x", "y"] }, "ok": false });
        let lookup = |k: &str| data.get(k).cloned();
        assert_eq!(Expr::parse("user.name").unwrap().eval(&lookup), json!("ada"));
        assert_eq!(Expr::parse("user.tags.length").unwrap().eval(&lookup), json!(2));
        assert_eq!(Expr::parse("user['tags'][1]").unwrap().eval(&lookup), json!("y"));
        assert_eq!(Expr::parse("!ok").unwrap().eval(&lookup), json!(true));
        assert_eq!(Expr::parse("missing.deep").unwrap().eval(&lookup), Value::Null);
    }

    #[test]
    fn display_forms() {
        assert_eq!(to_display(&Value::Null), "");
        assert_eq!(to_display(&json!(3)), "3");
        assert_eq!(to_display(&json!("a")), "a");
        assert!(to_display(&json!({"a": 1})).contains("\"a\": 1"));
    }
}
