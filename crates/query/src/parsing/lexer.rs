//! Query text lexer.
//!
//! The lexer is a fallible iterator over tokens. Keywords are matched
//! case-insensitively, identifiers are case-sensitive and use maximal munch
//! (an identifier may contain `-`, so `not-1` is a single identifier).
//! Timestamp, uuid, oid and base64 literals each have a dedicated token
//! class; their internal structure is validated when the literal is
//! converted, so the lexer only has to recognize the shape.

use crate::error::{Error, Result};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    True,
    False,
    Null,
    Nil,
    TruePredicate,
    FalsePredicate,
    Any,
    Some,
    All,
    None,
    In,
    Between,
    Like,
    Contains,
    BeginsWith,
    EndsWith,
    Subquery,
    Sort,
    Distinct,
    Limit,
    Asc,
    Ascending,
    Desc,
    Descending,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Keyword> {
        Some(match ident.to_ascii_uppercase().as_str() {
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "NULL" => Keyword::Null,
            "NIL" => Keyword::Nil,
            "TRUEPREDICATE" => Keyword::TruePredicate,
            "FALSEPREDICATE" => Keyword::FalsePredicate,
            "ANY" => Keyword::Any,
            "SOME" => Keyword::Some,
            "ALL" => Keyword::All,
            "NONE" => Keyword::None,
            "IN" => Keyword::In,
            "BETWEEN" => Keyword::Between,
            "LIKE" => Keyword::Like,
            "CONTAINS" => Keyword::Contains,
            "BEGINSWITH" => Keyword::BeginsWith,
            "ENDSWITH" => Keyword::EndsWith,
            "SUBQUERY" => Keyword::Subquery,
            "SORT" => Keyword::Sort,
            "DISTINCT" => Keyword::Distinct,
            "LIMIT" => Keyword::Limit,
            "ASC" => Keyword::Asc,
            "ASCENDING" => Keyword::Ascending,
            "DESC" => Keyword::Desc,
            "DESCENDING" => Keyword::Descending,
            _ => return Option::None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "NULL",
            Keyword::Nil => "NIL",
            Keyword::TruePredicate => "TRUEPREDICATE",
            Keyword::FalsePredicate => "FALSEPREDICATE",
            Keyword::Any => "ANY",
            Keyword::Some => "SOME",
            Keyword::All => "ALL",
            Keyword::None => "NONE",
            Keyword::In => "IN",
            Keyword::Between => "BETWEEN",
            Keyword::Like => "LIKE",
            Keyword::Contains => "CONTAINS",
            Keyword::BeginsWith => "BEGINSWITH",
            Keyword::EndsWith => "ENDSWITH",
            Keyword::Subquery => "SUBQUERY",
            Keyword::Sort => "SORT",
            Keyword::Distinct => "DISTINCT",
            Keyword::Limit => "LIMIT",
            Keyword::Asc => "ASC",
            Keyword::Ascending => "ASCENDING",
            Keyword::Desc => "DESC",
            Keyword::Descending => "DESCENDING",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Integer literal, including hex and an optional leading sign.
    Number(String),
    /// Floating point literal, including an optional leading sign.
    Float(String),
    /// `inf` / `infinity`, negated or not.
    Infinity(bool),
    NaN,
    /// Quoted string, unescaped.
    String(String),
    /// `B64"..."` payload, still encoded.
    Base64(String),
    /// Timestamp body: either `<sec>:<nanos>` or `Y-M-D@H:M:S[:ns]`.
    Timestamp(String),
    /// `uuid(...)` body.
    Uuid(String),
    /// `oid(...)` body.
    ObjectId(String),
    /// `$<digits>` positional argument, digits only.
    Argument(String),
    /// `$<identifier>` subquery variable, without the `$`.
    Variable(String),
    /// `@<identifier>` keypath attribute (`@links`, `@count`, ...).
    AtIdent(String),
    Ident(String),
    Keyword(Keyword),
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Bang,
    And,
    Or,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    /// `[c]` case-insensitivity flag.
    CaseFlag,
    Comma,
    Dot,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(s) | Token::Float(s) => f.write_str(s),
            Token::Infinity(true) => f.write_str("-inf"),
            Token::Infinity(false) => f.write_str("inf"),
            Token::NaN => f.write_str("NaN"),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Base64(s) => write!(f, "B64\"{}\"", s),
            Token::Timestamp(s) => write!(f, "T{}", s),
            Token::Uuid(s) => write!(f, "uuid({})", s),
            Token::ObjectId(s) => write!(f, "oid({})", s),
            Token::Argument(s) => write!(f, "${}", s),
            Token::Variable(s) => write!(f, "${}", s),
            Token::AtIdent(s) => write!(f, "@{}", s),
            Token::Ident(s) => f.write_str(s),
            Token::Keyword(k) => write!(f, "{}", k),
            Token::Equal => f.write_str("=="),
            Token::NotEqual => f.write_str("!="),
            Token::Less => f.write_str("<"),
            Token::LessEqual => f.write_str("<="),
            Token::Greater => f.write_str(">"),
            Token::GreaterEqual => f.write_str(">="),
            Token::Bang => f.write_str("!"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::OpenBrace => f.write_str("{"),
            Token::CloseBrace => f.write_str("}"),
            Token::OpenBracket => f.write_str("["),
            Token::CloseBracket => f.write_str("]"),
            Token::CaseFlag => f.write_str("[c]"),
            Token::Comma => f.write_str(","),
            Token::Dot => f.write_str("."),
        }
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        self.chars.peek().filter(|&&c| predicate(c))?;
        self.chars.next()
    }

    fn next_is(&mut self, expected: char) -> bool {
        self.next_if(|c| c == expected).is_some()
    }

    fn collect_while(&mut self, out: &mut String, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.next_if(&predicate) {
            out.push(c);
        }
    }

    fn scan(&mut self) -> Result<Option<Token>> {
        while self.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&c) = self.chars.peek() else {
            return Ok(Option::None);
        };
        let token = match c {
            '"' | '\'' => self.scan_string()?,
            '0'..='9' => match self.try_scan_date_timestamp() {
                Some(ts) => ts,
                Option::None => self.scan_number(false)?,
            },
            '.' => {
                self.chars.next();
                if self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_fraction(".".to_string())?
                } else {
                    Token::Dot
                }
            }
            '-' => {
                self.chars.next();
                match self.chars.peek() {
                    Some(d) if d.is_ascii_digit() => self.scan_number(true)?,
                    Some('.') => {
                        self.chars.next();
                        if self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                            self.scan_fraction("-.".to_string())?
                        } else {
                            return Err(Error::Syntax("unexpected character '-'".into()));
                        }
                    }
                    Some(a) if a.is_ascii_alphabetic() => {
                        let mut word = String::new();
                        self.collect_while(&mut word, |c| c.is_ascii_alphabetic());
                        match word.to_ascii_lowercase().as_str() {
                            "inf" | "infinity" => Token::Infinity(true),
                            "nan" => Token::NaN,
                            _ => {
                                return Err(Error::Syntax(format!("unexpected '-{}'", word)));
                            }
                        }
                    }
                    _ => return Err(Error::Syntax("unexpected character '-'".into())),
                }
            }
            '$' => {
                self.chars.next();
                match self.chars.peek() {
                    Some(d) if d.is_ascii_digit() => {
                        let mut digits = String::new();
                        self.collect_while(&mut digits, |c| c.is_ascii_digit());
                        Token::Argument(digits)
                    }
                    Some(a) if a.is_ascii_alphabetic() || *a == '_' => {
                        let mut name = String::new();
                        self.collect_while(&mut name, ident_char);
                        Token::Variable(name)
                    }
                    _ => return Err(Error::Syntax("expected index or name after '$'".into())),
                }
            }
            '@' => {
                self.chars.next();
                if !self.chars.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                    return Err(Error::Syntax("expected attribute name after '@'".into()));
                }
                let mut name = String::new();
                self.collect_while(&mut name, |c| c.is_ascii_alphanumeric() || c == '_');
                Token::AtIdent(name)
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_word()?,
            _ => {
                self.chars.next();
                match c {
                    '=' => {
                        if self.next_is('=') {
                            Token::Equal
                        } else if self.next_is('>') {
                            Token::GreaterEqual
                        } else if self.next_is('<') {
                            Token::LessEqual
                        } else {
                            Token::Equal
                        }
                    }
                    '!' => {
                        if self.next_is('=') {
                            Token::NotEqual
                        } else {
                            Token::Bang
                        }
                    }
                    '<' => {
                        if self.next_is('=') {
                            Token::LessEqual
                        } else if self.next_is('>') {
                            Token::NotEqual
                        } else {
                            Token::Less
                        }
                    }
                    '>' => {
                        if self.next_is('=') {
                            Token::GreaterEqual
                        } else {
                            Token::Greater
                        }
                    }
                    '&' => {
                        if self.next_is('&') {
                            Token::And
                        } else {
                            return Err(Error::Syntax("unexpected character '&'".into()));
                        }
                    }
                    '|' => {
                        if self.next_is('|') {
                            Token::Or
                        } else {
                            return Err(Error::Syntax("unexpected character '|'".into()));
                        }
                    }
                    '(' => Token::OpenParen,
                    ')' => Token::CloseParen,
                    '{' => Token::OpenBrace,
                    '}' => Token::CloseBrace,
                    '[' => {
                        // [c] is the case-insensitivity flag; anything else
                        // opens a dictionary element subscript.
                        let mut probe = self.chars.clone();
                        if probe.next() == Some('c') && probe.next() == Some(']') {
                            self.chars.next();
                            self.chars.next();
                            Token::CaseFlag
                        } else {
                            Token::OpenBracket
                        }
                    }
                    ']' => Token::CloseBracket,
                    ',' => Token::Comma,
                    other => {
                        return Err(Error::Syntax(format!("unexpected character '{}'", other)));
                    }
                }
            }
        };
        Ok(Option::Some(token))
    }

    /// Identifier, keyword, or one of the word-prefixed literal forms:
    /// `B64"..."`, `uuid(...)`, `oid(...)`, `T<sec>:<nanos>`.
    fn scan_word(&mut self) -> Result<Token> {
        let mut word = String::new();
        self.collect_while(&mut word, ident_char);

        if word == "B64" {
            if let Some(quote) = self.next_if(|c| c == '"' || c == '\'') {
                let mut payload = String::new();
                loop {
                    match self.chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => payload.push(c),
                        Option::None => {
                            return Err(Error::Syntax("unterminated base64 literal".into()));
                        }
                    }
                }
                return Ok(Token::Base64(payload));
            }
        }

        let lowered = word.to_ascii_lowercase();
        if (lowered == "uuid" || lowered == "oid") && self.chars.peek() == Some(&'(') {
            self.chars.next();
            let mut body = String::new();
            loop {
                match self.chars.next() {
                    Some(')') => break,
                    Some(c) => body.push(c),
                    Option::None => {
                        return Err(Error::Syntax(format!("unterminated {} literal", lowered)));
                    }
                }
            }
            return Ok(if lowered == "uuid" {
                Token::Uuid(body)
            } else {
                Token::ObjectId(body)
            });
        }

        // T<sec>:<nanos> relative timestamps. The identifier part must be a
        // 'T' followed by an optionally signed integer.
        if self.chars.peek() == Some(&':') && is_t_seconds(&word) {
            self.chars.next();
            let mut body = word[1..].to_string();
            body.push(':');
            if self.next_is('-') {
                body.push('-');
            }
            let len_before = body.len();
            self.collect_while(&mut body, |c| c.is_ascii_digit());
            if body.len() == len_before {
                return Err(Error::Syntax(format!("bad timestamp literal 'T{}'", body)));
            }
            return Ok(Token::Timestamp(body));
        }

        if let Some(keyword) = Keyword::from_ident(&word) {
            return Ok(Token::Keyword(keyword));
        }
        match lowered.as_str() {
            "inf" | "infinity" => Ok(Token::Infinity(false)),
            "nan" => Ok(Token::NaN),
            _ => Ok(Token::Ident(word)),
        }
    }

    fn scan_string(&mut self) -> Result<Token> {
        let quote = self.chars.next().unwrap();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => break,
                Some('\\') => match self.chars.next() {
                    Some('"') => out.push('"'),
                    Some('\'') => out.push('\''),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('b') => out.push('\u{0008}'),
                    Some('f') => out.push('\u{000c}'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('0') => out.push('\0'),
                    Some('u') => {
                        let mut hex = String::new();
                        for _ in 0..4 {
                            match self.next_if(|c| c.is_ascii_hexdigit()) {
                                Some(c) => hex.push(c),
                                Option::None => {
                                    return Err(Error::Syntax(
                                        "expected 4 hex digits in unicode escape".into(),
                                    ));
                                }
                            }
                        }
                        let code = u32::from_str_radix(&hex, 16).expect("hex digits");
                        match char::from_u32(code) {
                            Some(c) => out.push(c),
                            Option::None => {
                                return Err(Error::Syntax(format!(
                                    "invalid unicode escape '\\u{}'",
                                    hex
                                )));
                            }
                        }
                    }
                    Some(other) => {
                        return Err(Error::Syntax(format!("invalid escape '\\{}'", other)));
                    }
                    Option::None => return Err(Error::Syntax("unterminated string".into())),
                },
                Some(c) => out.push(c),
                Option::None => return Err(Error::Syntax("unterminated string".into())),
            }
        }
        Ok(Token::String(out))
    }

    /// Integer or float, after any leading sign has been consumed.
    fn scan_number(&mut self, negative: bool) -> Result<Token> {
        let mut text = if negative { "-".to_string() } else { String::new() };
        self.collect_while(&mut text, |c| c.is_ascii_digit());

        // hex integers: 0x...
        if (text.ends_with('0')) && self.chars.peek().is_some_and(|c| *c == 'x' || *c == 'X') {
            let digits_len = text.trim_start_matches('-').len();
            if digits_len == 1 {
                let x = self.chars.next().unwrap();
                text.push(x);
                let len_before = text.len();
                self.collect_while(&mut text, |c| c.is_ascii_hexdigit());
                if text.len() == len_before {
                    return Err(Error::Syntax(format!("bad hex literal '{}'", text)));
                }
                return Ok(Token::Number(text));
            }
        }

        if self.chars.peek() == Some(&'.') {
            let mut probe = self.chars.clone();
            probe.next();
            // a fraction, or a trailing dot as in "10."; but "1.prop" is a
            // path, so only consume the dot when no identifier follows
            let fraction = match probe.peek_char() {
                Some(c) if c.is_ascii_digit() => true,
                Some(c) if ident_char(c) => false,
                _ => true,
            };
            if fraction {
                self.chars.next();
                text.push('.');
                return self.scan_fraction(text);
            }
        }
        if matches!(self.chars.peek(), Some('e') | Some('E')) {
            return self.scan_exponent(text);
        }
        Ok(Token::Number(text))
    }

    /// Fraction digits and optional exponent; `text` holds everything up to
    /// and including the decimal point.
    fn scan_fraction(&mut self, mut text: String) -> Result<Token> {
        self.collect_while(&mut text, |c| c.is_ascii_digit());
        if matches!(self.chars.peek(), Some('e') | Some('E')) {
            return self.scan_exponent(text);
        }
        Ok(Token::Float(text))
    }

    fn scan_exponent(&mut self, mut text: String) -> Result<Token> {
        text.push(self.chars.next().unwrap());
        if let Some(sign) = self.next_if(|c| c == '+' || c == '-') {
            text.push(sign);
        }
        let len_before = text.len();
        self.collect_while(&mut text, |c| c.is_ascii_digit());
        if text.len() == len_before {
            return Err(Error::Syntax(format!("bad float literal '{}'", text)));
        }
        Ok(Token::Float(text))
    }

    /// Absolute timestamps: `Y-M-D@H:M:S` with an optional `:nanos` tail.
    /// Scanned with lookahead so plain numbers are unaffected.
    fn try_scan_date_timestamp(&mut self) -> Option<Token> {
        fn component(probe: &mut Peekable<Chars<'_>>, text: &mut String, sep: char) -> bool {
            let mut any = false;
            while let Some(&c) = probe.peek() {
                if c.is_ascii_digit() {
                    text.push(probe.next().unwrap());
                    any = true;
                } else {
                    break;
                }
            }
            if !any {
                return false;
            }
            if sep != '\0' {
                if probe.peek() == Some(&sep) {
                    text.push(probe.next().unwrap());
                    return true;
                }
                return false;
            }
            true
        }

        let mut probe = self.chars.clone();
        let mut text = String::new();
        let shape = component(&mut probe, &mut text, '-')
            && component(&mut probe, &mut text, '-')
            && component(&mut probe, &mut text, '@')
            && component(&mut probe, &mut text, ':')
            && component(&mut probe, &mut text, ':')
            && component(&mut probe, &mut text, '\0');
        if !shape {
            return Option::None;
        }
        // optional nanosecond component
        if probe.peek() == Some(&':') {
            let mut tail_probe = probe.clone();
            let mut tail = String::from(":");
            tail_probe.next();
            if tail_probe.peek() == Some(&'-') {
                tail.push(tail_probe.next().unwrap());
            }
            let mut any = false;
            while let Some(&c) = tail_probe.peek() {
                if c.is_ascii_digit() {
                    tail.push(tail_probe.next().unwrap());
                    any = true;
                } else {
                    break;
                }
            }
            if any {
                probe = tail_probe;
                text.push_str(&tail);
            }
        }
        // commit: advance the real iterator past the matched text
        for _ in 0..text.chars().count() {
            self.chars.next();
        }
        Some(Token::Timestamp(text))
    }
}

/// Continuation character of an identifier. `-` is included, matching the
/// original grammar, so `T2017-12-04` is a valid property name.
fn ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// `T` followed by an optionally signed integer (the seconds part of a
/// relative timestamp once a ':' follows).
fn is_t_seconds(word: &str) -> bool {
    let Some(rest) = word.strip_prefix('T') else {
        return false;
    };
    let digits = rest.strip_prefix('-').unwrap_or(rest);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

trait PeekChar {
    fn peek_char(&mut self) -> Option<char>;
}

impl PeekChar for Peekable<Chars<'_>> {
    fn peek_char(&mut self) -> Option<char> {
        self.peek().copied()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Result<Vec<Token>> {
        Lexer::new(input).collect()
    }

    #[test]
    fn operators_and_synonyms() {
        assert_eq!(
            lex("= == != <> < <= =< > >= =>").unwrap(),
            vec![
                Token::Equal,
                Token::Equal,
                Token::NotEqual,
                Token::NotEqual,
                Token::Less,
                Token::LessEqual,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::GreaterEqual,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(lex("001").unwrap(), vec![Token::Number("001".into())]);
        assert_eq!(lex("-1").unwrap(), vec![Token::Number("-1".into())]);
        assert_eq!(lex("0x0").unwrap(), vec![Token::Number("0x0".into())]);
        assert_eq!(
            lex("-0X398235fcAb").unwrap(),
            vec![Token::Number("-0X398235fcAb".into())]
        );
        assert_eq!(lex("10.").unwrap(), vec![Token::Float("10.".into())]);
        assert_eq!(lex("-.034").unwrap(), vec![Token::Float("-.034".into())]);
        assert_eq!(lex("1e-3").unwrap(), vec![Token::Float("1e-3".into())]);
        assert!(lex("0x").is_err());
    }

    #[test]
    fn identifiers_may_contain_dashes() {
        assert_eq!(
            lex("__-__.Z-9").unwrap(),
            vec![
                Token::Ident("__-__".into()),
                Token::Dot,
                Token::Ident("Z-9".into())
            ]
        );
        // maximal munch: not-1 is an identifier, not a negation
        assert_eq!(lex("not-1").unwrap(), vec![Token::Ident("not-1".into())]);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            lex("BeGiNsWiTh and TRUEPREDICATE").unwrap(),
            vec![
                Token::Keyword(Keyword::BeginsWith),
                Token::Keyword(Keyword::And),
                Token::Keyword(Keyword::TruePredicate),
            ]
        );
        // but a longer identifier is not a keyword
        assert_eq!(
            lex("truepredicates").unwrap(),
            vec![Token::Ident("truepredicates".into())]
        );
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            lex(r#""a\tb""#).unwrap(),
            vec![Token::String("a\tb".into())]
        );
        assert_eq!(lex(r"'A'").unwrap(), vec![Token::String("A".into())]);
        assert!(lex(r"'\a'").is_err());
        assert!(lex("\"unterminated").is_err());
    }

    #[test]
    fn timestamps() {
        assert_eq!(lex("T399:0").unwrap(), vec![Token::Timestamp("399:0".into())]);
        assert_eq!(
            lex("2017-12-01@12:07:53:505").unwrap(),
            vec![Token::Timestamp("2017-12-01@12:07:53:505".into())]
        );
        // T399 without a colon is an ordinary identifier
        assert_eq!(lex("T399").unwrap(), vec![Token::Ident("T399".into())]);
        // and so is a column named like a date
        assert_eq!(
            lex("T2017-12-04").unwrap(),
            vec![Token::Ident("T2017-12-04".into())]
        );
    }

    #[test]
    fn word_literals() {
        assert_eq!(
            lex("uuid(3b241101-e2bb-4255-8caf-4136c566a962)").unwrap(),
            vec![Token::Uuid("3b241101-e2bb-4255-8caf-4136c566a962".into())]
        );
        assert_eq!(
            lex("oid(61f0289d2f34b2a47e0b1e3c)").unwrap(),
            vec![Token::ObjectId("61f0289d2f34b2a47e0b1e3c".into())]
        );
        assert_eq!(lex("B64\"YWJj\"").unwrap(), vec![Token::Base64("YWJj".into())]);
        assert_eq!(lex("-inf").unwrap(), vec![Token::Infinity(true)]);
        assert_eq!(lex("NAN").unwrap(), vec![Token::NaN]);
    }

    #[test]
    fn arguments_and_variables() {
        assert_eq!(lex("$0").unwrap(), vec![Token::Argument("0".into())]);
        assert_eq!(lex("$002").unwrap(), vec![Token::Argument("002".into())]);
        assert_eq!(lex("$x").unwrap(), vec![Token::Variable("x".into())]);
        assert!(lex("$-1").is_err());
        assert!(lex("$ ").is_err());
    }

    #[test]
    fn case_flag_vs_subscript() {
        assert_eq!(lex("[c]").unwrap(), vec![Token::CaseFlag]);
        assert_eq!(
            lex("['c']").unwrap(),
            vec![
                Token::OpenBracket,
                Token::String("c".into()),
                Token::CloseBracket
            ]
        );
    }

    #[test]
    fn single_ampersand_is_an_error() {
        assert!(lex("a & b").is_err());
        assert!(lex("a | b").is_err());
    }
}
