//! Measure expression grammar.
//!
//! ```text
//! expr   = name [ "(" [ param *( "," param ) ] ")" ] [ "@" value ]
//! param  = ident "=" value
//! value  = int / float / string / bool / map
//! string = "'" chars "'" / DQUOTE chars DQUOTE
//! bool   = "true" / "false" / "True" / "False"
//! map    = "{" [ int ":" int *( "," int ":" int ) ] "}"
//! ```
//!
//! This module only checks syntax. Name lookup and parameter binding
//! happen in [`MeasureRegistry::parse`](crate::MeasureRegistry::parse).

use std::collections::BTreeMap;

use crate::error::{ParseError, ParseErrorKind};
use crate::value::Value;

/// A syntactically valid, not yet resolved, measure expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawExpr {
    pub name: String,
    pub params: Vec<(String, Value)>,
    pub at: Option<Value>,
}

pub(crate) fn parse_expr(input: &str) -> Result<RawExpr, ParseError> {
    let mut cursor = Cursor { input, pos: 0 };
    cursor.skip_ws();
    if cursor.at_end() {
        return Err(ParseError {
            input: input.to_string(),
            kind: ParseErrorKind::Empty,
        });
    }

    let name = cursor.ident()?;
    cursor.skip_ws();

    let mut params = Vec::new();
    if cursor.eat('(') {
        cursor.skip_ws();
        if !cursor.eat(')') {
            loop {
                cursor.skip_ws();
                let key = cursor.ident()?;
                cursor.skip_ws();
                cursor.expect('=')?;
                cursor.skip_ws();
                let value = cursor.value()?;
                params.push((key, value));
                cursor.skip_ws();
                if cursor.eat(')') {
                    break;
                }
                cursor.expect(',')?;
            }
        }
        cursor.skip_ws();
    }

    let at = if cursor.eat('@') {
        cursor.skip_ws();
        if cursor.at_end() {
            return Err(cursor.error("expected a value after '@'"));
        }
        Some(cursor.value()?)
    } else {
        None
    };

    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing input"));
    }

    Ok(RawExpr { name, params, at })
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
            Err(self.error(&format!("expected '{expected}', found {found}")))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, reason: &str) -> ParseError {
        ParseError {
            input: self.input.to_string(),
            kind: ParseErrorKind::Syntax {
                position: self.pos,
                reason: reason.to_string(),
            },
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return Err(self.error("expected an identifier")),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some('\'' | '"') => self.string().map(Value::Str),
            Some('{') => self.map().map(Value::Map),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let word = self.ident()?;
                match word.as_str() {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    _ => {
                        self.pos = start;
                        Err(self.error(&format!(
                            "unexpected word '{word}'; quote string values"
                        )))
                    }
                }
            }
            Some(c) => Err(self.error(&format!("unexpected character '{c}'"))),
            None => Err(self.error("expected a value")),
        }
    }

    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') || self.peek() == Some('+') {
            self.bump();
        }
        let mut is_float = false;
        self.digits();
        if self.eat('.') {
            is_float = true;
            self.digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
            self.digits();
        }

        let input = self.input;
        let text = &input[start..self.pos];
        let parsed = if is_float {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>().ok().map(Value::Int)
        };
        if let Some(value) = parsed {
            return Ok(value);
        }
        self.pos = start;
        Err(self.error(&format!("invalid number '{text}'")))
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn int(&mut self) -> Result<i64, ParseError> {
        match self.number()? {
            Value::Int(v) => Ok(v),
            _ => Err(self.error("expected an integer")),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let Some(quote) = self.bump() else {
            return Err(self.error("expected a string"));
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn map(&mut self) -> Result<BTreeMap<i64, i64>, ParseError> {
        self.expect('{')?;
        let mut map = BTreeMap::new();
        self.skip_ws();
        if self.eat('}') {
            return Ok(map);
        }
        loop {
            self.skip_ws();
            let key = self.int()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.int()?;
            map.insert(key, value);
            self.skip_ws();
            if self.eat('}') {
                return Ok(map);
            }
            self.expect(',')?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_position(input: &str) -> usize {
        match parse_expr(input).unwrap_err().kind {
            ParseErrorKind::Syntax { position, .. } => position,
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn bare_name() {
        let expr = parse_expr("AP").unwrap();
        assert_eq!(expr.name, "AP");
        assert!(expr.params.is_empty());
        assert_eq!(expr.at, None);
    }

    #[test]
    fn params_and_at() {
        let expr = parse_expr("nDCG(dcg='exp-log2', judged_only=True)@20").unwrap();
        assert_eq!(expr.name, "nDCG");
        assert_eq!(
            expr.params,
            vec![
                ("dcg".to_string(), Value::from("exp-log2")),
                ("judged_only".to_string(), Value::Bool(true)),
            ]
        );
        assert_eq!(expr.at, Some(Value::Int(20)));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_expr("IPrec@0.2").unwrap().at, Some(Value::Float(0.2)));
        assert_eq!(parse_expr("X@1e-3").unwrap().at, Some(Value::Float(0.001)));
        assert_eq!(parse_expr("X(rel=-1)").unwrap().params[0].1, Value::Int(-1));
    }

    #[test]
    fn maps() {
        let expr = parse_expr("nDCG(gains={0:0, 1:2,2:5})").unwrap();
        let expected: BTreeMap<i64, i64> = [(0, 0), (1, 2), (2, 5)].into_iter().collect();
        assert_eq!(expr.params[0].1, Value::Map(expected));
        assert_eq!(parse_expr("X(g={})").unwrap().params[0].1, Value::Map(BTreeMap::new()));
    }

    #[test]
    fn escaped_strings() {
        let expr = parse_expr(r#"X(s="a\"b")"#).unwrap();
        assert_eq!(expr.params[0].1, Value::from("a\"b"));
    }

    #[test]
    fn empty_is_its_own_kind() {
        assert_eq!(parse_expr("  ").unwrap_err().kind, ParseErrorKind::Empty);
    }

    #[test]
    fn syntax_errors_carry_positions() {
        assert_eq!(syntax_position("P@"), 2);
        assert_eq!(syntax_position("P(rel=2"), 7);
        assert_eq!(syntax_position("P(rel=2)@10x"), 11);
        assert_eq!(syntax_position("P(dcg=log2)"), 6);
        assert_eq!(syntax_position("@10"), 0);
        assert_eq!(syntax_position("X(s='open)"), 10);
    }
}
