//! Recursive-descent query parser.
//!
//! Produces a purely syntactic [`ParsedQuery`]; resolving names against a
//! schema, expanding aliases and binding arguments is the binder's second
//! pass, so syntax errors and semantic errors stay distinguishable.

use std::iter::Peekable;

use super::ast::{
    AggNode, CompareOpNode, DescriptorNode, ExprNode, Literal, ParsedQuery, PathElem, PathNode,
    PredicateNode, QuantifierNode,
};
use super::lexer::{Keyword, Lexer, Token};
use crate::error::{Error, Result};

pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl Parser<'_> {
    /// Parses the input string into a query AST. The entire string must be
    /// consumed.
    pub fn parse(query: &str) -> Result<ParsedQuery> {
        let mut parser = Parser {
            lexer: Lexer::new(query).peekable(),
        };
        let predicate = parser.parse_or()?;
        let mut descriptors = Vec::new();
        while let Some(descriptor) = parser.maybe_parse_descriptor()? {
            descriptors.push(descriptor);
        }
        if let Some(token) = parser.lexer.next().transpose()? {
            return Err(Error::Syntax(format!("unexpected token {}", token)));
        }
        Ok(ParsedQuery {
            predicate,
            descriptors,
        })
    }

    /// Fetches the next token, or errors if none is found.
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .transpose()?
            .ok_or_else(|| Error::Syntax("unexpected end of input".into()))
    }

    /// Peeks the next token if any, transposed for convenience.
    fn peek(&mut self) -> Result<Option<&Token>> {
        self.lexer
            .peek()
            .map(|r| r.as_ref().map_err(|err| err.clone()))
            .transpose()
    }

    /// Returns the next token if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().ok()?.filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes the next token if it is the given token, returning true.
    fn next_is(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    /// Consumes the next token if it's the expected token, or errors.
    fn expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Syntax(format!(
                "expected token {}, found {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// The next identifier, also accepting keywords used as property names.
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            Token::Keyword(keyword) => Ok(keyword.as_str().to_ascii_lowercase()),
            token => Err(Error::Syntax(format!("expected identifier, got {}", token))),
        }
    }

    // ---- predicates ----

    fn parse_or(&mut self) -> Result<PredicateNode> {
        let mut lhs = self.parse_and()?;
        while self
            .next_if(|t| matches!(t, Token::Or | Token::Keyword(Keyword::Or)))
            .is_some()
        {
            let rhs = self.parse_and()?;
            lhs = PredicateNode::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<PredicateNode> {
        let mut lhs = self.parse_atom()?;
        while self
            .next_if(|t| matches!(t, Token::And | Token::Keyword(Keyword::And)))
            .is_some()
        {
            let rhs = self.parse_atom()?;
            lhs = PredicateNode::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<PredicateNode> {
        match self.peek()? {
            Some(Token::Bang) | Some(Token::Keyword(Keyword::Not)) => {
                self.next()?;
                Ok(PredicateNode::Not(Box::new(self.parse_atom()?)))
            }
            Some(Token::OpenParen) => {
                self.next()?;
                let predicate = self.parse_or()?;
                self.expect(Token::CloseParen)?;
                Ok(predicate)
            }
            Some(Token::Keyword(Keyword::TruePredicate)) => {
                self.next()?;
                Ok(PredicateNode::True)
            }
            Some(Token::Keyword(Keyword::FalsePredicate)) => {
                self.next()?;
                Ok(PredicateNode::False)
            }
            Some(_) => self.parse_comparison(),
            None => Err(Error::Syntax("unexpected end of input".into())),
        }
    }

    fn parse_comparison(&mut self) -> Result<PredicateNode> {
        let lhs = self.parse_expr()?;

        if self.next_is(Token::Keyword(Keyword::Between)) {
            self.expect(Token::OpenBrace)?;
            let lo = self.parse_literal()?;
            self.expect(Token::Comma)?;
            let hi = self.parse_literal()?;
            self.expect(Token::CloseBrace)?;
            return Ok(PredicateNode::Between { expr: lhs, lo, hi });
        }

        let op = match self.next()? {
            Token::Equal => CompareOpNode::Equal,
            Token::NotEqual => CompareOpNode::NotEqual,
            Token::Greater => CompareOpNode::Greater,
            Token::GreaterEqual => CompareOpNode::GreaterEqual,
            Token::Less => CompareOpNode::Less,
            Token::LessEqual => CompareOpNode::LessEqual,
            Token::Keyword(Keyword::Contains) => CompareOpNode::Contains,
            Token::Keyword(Keyword::BeginsWith) => CompareOpNode::BeginsWith,
            Token::Keyword(Keyword::EndsWith) => CompareOpNode::EndsWith,
            Token::Keyword(Keyword::Like) => CompareOpNode::Like,
            Token::Keyword(Keyword::In) => CompareOpNode::In,
            token => {
                return Err(Error::Syntax(format!(
                    "expected comparison operator, found {}",
                    token
                )));
            }
        };
        let case_insensitive = self.next_is(Token::CaseFlag);
        let rhs = self.parse_expr()?;
        Ok(PredicateNode::Compare {
            op,
            case_insensitive,
            lhs,
            rhs,
        })
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<ExprNode> {
        match self.peek()? {
            Some(Token::OpenBrace) => {
                self.next()?;
                let mut elements = Vec::new();
                if !self.next_is(Token::CloseBrace) {
                    loop {
                        elements.push(self.parse_literal()?);
                        if !self.next_is(Token::Comma) {
                            break;
                        }
                    }
                    self.expect(Token::CloseBrace)?;
                }
                Ok(ExprNode::List(elements))
            }
            Some(Token::Keyword(Keyword::Subquery)) => {
                self.next()?;
                if self.peek()? == Some(&Token::OpenParen) {
                    self.parse_subquery()
                } else {
                    // a property that happens to be named "subquery"
                    Ok(ExprNode::Path(self.parse_keypath(Some("subquery".into()))?))
                }
            }
            Some(&Token::Keyword(quant))
                if matches!(
                    quant,
                    Keyword::Any | Keyword::Some | Keyword::All | Keyword::None
                ) =>
            {
                let quantifier = match quant {
                    Keyword::All => QuantifierNode::All,
                    Keyword::None => QuantifierNode::None,
                    _ => QuantifierNode::Any,
                };
                self.next()?;
                match self.peek()? {
                    Some(Token::Ident(_))
                    | Some(Token::Keyword(_))
                    | Some(Token::AtIdent(_))
                    | Some(Token::Variable(_)) => {
                        let mut path = self.parse_keypath(None)?;
                        path.quantifier = Some(quantifier);
                        Ok(ExprNode::Path(path))
                    }
                    // the keyword itself was the head of a keypath
                    _ => Ok(ExprNode::Path(self.parse_keypath(Some(
                        match quantifier {
                            QuantifierNode::Any => "any".into(),
                            QuantifierNode::All => "all".into(),
                            QuantifierNode::None => "none".into(),
                        },
                    ))?)),
                }
            }
            Some(Token::Ident(_)) | Some(Token::Keyword(_)) | Some(Token::AtIdent(_))
            | Some(Token::Variable(_)) => {
                // keywords that are literals, not keypath heads
                if let Some(token) =
                    self.next_if(|t| matches!(t, Token::Keyword(Keyword::True | Keyword::False | Keyword::Null | Keyword::Nil)))
                {
                    return Ok(ExprNode::Literal(match token {
                        Token::Keyword(Keyword::True) => Literal::Bool(true),
                        Token::Keyword(Keyword::False) => Literal::Bool(false),
                        _ => Literal::Null,
                    }));
                }
                Ok(ExprNode::Path(self.parse_keypath(None)?))
            }
            Some(_) => Ok(ExprNode::Literal(self.parse_literal()?)),
            None => Err(Error::Syntax("unexpected end of input".into())),
        }
    }

    /// `SUBQUERY(path, $var, predicate).@count`; the opening paren has been
    /// peeked but not consumed.
    fn parse_subquery(&mut self) -> Result<ExprNode> {
        self.expect(Token::OpenParen)?;
        let path = self.parse_keypath(None)?;
        self.expect(Token::Comma)?;
        let var = match self.next()? {
            Token::Variable(name) => name,
            token => {
                return Err(Error::Syntax(format!(
                    "expected subquery variable, found {}",
                    token
                )));
            }
        };
        self.expect(Token::Comma)?;
        let predicate = self.parse_or()?;
        self.expect(Token::CloseParen)?;
        self.expect(Token::Dot)?;
        match self.next()? {
            Token::AtIdent(attr) if attr == "count" || attr == "size" => {}
            token => {
                return Err(Error::Syntax(format!(
                    "a subquery must be followed by '.@count', found {}",
                    token
                )));
            }
        }
        Ok(ExprNode::Subquery {
            path,
            var,
            predicate: Box::new(predicate),
        })
    }

    /// A keypath: dot-separated property names, `@links` backlink elements,
    /// dictionary subscripts, ended by an optional aggregate attribute.
    fn parse_keypath(&mut self, first: Option<String>) -> Result<PathNode> {
        let mut path = PathNode {
            quantifier: None,
            elems: Vec::new(),
            agg: None,
        };
        if let Some(first) = first {
            path.elems.push(PathElem::Prop(first));
            if !self.next_is(Token::Dot) {
                return Ok(path);
            }
        }
        loop {
            match self.next()? {
                Token::Ident(name) => path.elems.push(PathElem::Prop(name)),
                Token::Keyword(keyword) => {
                    path.elems
                        .push(PathElem::Prop(keyword.as_str().to_ascii_lowercase()));
                }
                Token::Variable(name) => path.elems.push(PathElem::Var(name)),
                Token::AtIdent(attr) if attr == "links" => {
                    self.expect(Token::Dot)?;
                    match self.next()? {
                        Token::AtIdent(count) if count == "count" || count == "size" => {
                            path.elems.push(PathElem::BacklinkAll);
                            path.agg = Some(AggNode::Count);
                            return Ok(path);
                        }
                        Token::Ident(class) => {
                            self.expect(Token::Dot)?;
                            let prop = self.next_ident()?;
                            path.elems.push(PathElem::Backlink { class, prop });
                        }
                        token => {
                            return Err(Error::Syntax(format!(
                                "an identifier must follow @links, found {}",
                                token
                            )));
                        }
                    }
                }
                Token::AtIdent(attr) => {
                    path.agg = Some(self.parse_aggregate(&attr)?);
                    return Ok(path);
                }
                token => {
                    return Err(Error::Syntax(format!(
                        "expected keypath element, found {}",
                        token
                    )));
                }
            }
            // dictionary element subscript
            if self.peek()? == Some(&Token::OpenBracket) {
                self.next()?;
                let key = match self.next()? {
                    Token::String(key) => key,
                    token => {
                        return Err(Error::Syntax(format!(
                            "expected quoted dictionary key, found {}",
                            token
                        )));
                    }
                };
                self.expect(Token::CloseBracket)?;
                path.elems.push(PathElem::DictKey(key));
            }
            if !self.next_is(Token::Dot) {
                return Ok(path);
            }
        }
    }

    /// Aggregate attribute at the end of a keypath. `@min/@max/@sum/@avg`
    /// may name a property on the linked objects; `@count/@size/@type` end
    /// the path unconditionally.
    fn parse_aggregate(&mut self, attr: &str) -> Result<AggNode> {
        let takes_target = matches!(attr, "min" | "max" | "sum" | "avg");
        let target = if takes_target && self.next_is(Token::Dot) {
            Some(self.next_ident()?)
        } else {
            None
        };
        let agg = match attr {
            "min" => AggNode::Min(target),
            "max" => AggNode::Max(target),
            "sum" => AggNode::Sum(target),
            "avg" => AggNode::Avg(target),
            "count" => AggNode::Count,
            "size" => AggNode::Size,
            "type" => AggNode::Type,
            other => {
                return Err(Error::Syntax(format!("unknown keypath attribute '@{}'", other)));
            }
        };
        // @count and friends must end the keypath
        if self.peek()? == Some(&Token::Dot) {
            return Err(Error::Syntax(format!(
                "'@{}' must end the keypath",
                attr
            )));
        }
        Ok(agg)
    }

    // ---- literals ----

    fn parse_literal(&mut self) -> Result<Literal> {
        let token = self.next()?;
        Self::literal_from(token)
    }

    fn literal_from(token: Token) -> Result<Literal> {
        Ok(match token {
            Token::Number(text) => Literal::Int(text),
            Token::Float(text) => Literal::Float(text),
            Token::Infinity(negative) => Literal::Infinity(negative),
            Token::NaN => Literal::NaN,
            Token::String(s) => Literal::String(s),
            Token::Base64(payload) => Literal::Base64(payload),
            Token::Timestamp(body) => Literal::Timestamp(parse_timestamp(&body)?),
            Token::Uuid(body) => Literal::Uuid(
                uuid::Uuid::parse_str(&body)
                    .map_err(|_| Error::Syntax(format!("bad uuid literal '{}'", body)))?,
            ),
            Token::ObjectId(body) => Literal::ObjectId(
                tether_store::ObjectId::parse(&body)
                    .ok_or_else(|| Error::Syntax(format!("bad object id literal '{}'", body)))?,
            ),
            Token::Argument(digits) => Literal::Arg(
                digits
                    .parse::<usize>()
                    .map_err(|_| Error::Syntax(format!("bad argument index '${}'", digits)))?,
            ),
            Token::Keyword(Keyword::True) => Literal::Bool(true),
            Token::Keyword(Keyword::False) => Literal::Bool(false),
            Token::Keyword(Keyword::Null) | Token::Keyword(Keyword::Nil) => Literal::Null,
            token => {
                return Err(Error::Syntax(format!("expected literal, found {}", token)));
            }
        })
    }

    // ---- descriptors ----

    fn maybe_parse_descriptor(&mut self) -> Result<Option<DescriptorNode>> {
        let keyword = match self.peek()? {
            Some(Token::Keyword(k @ (Keyword::Sort | Keyword::Distinct | Keyword::Limit))) => *k,
            _ => return Ok(None),
        };
        self.next()?;
        self.expect(Token::OpenParen)?;
        let descriptor = match keyword {
            Keyword::Sort => {
                let mut keys = Vec::new();
                loop {
                    let path = self.parse_descriptor_path()?;
                    let ascending = match self.next()? {
                        Token::Keyword(Keyword::Asc) | Token::Keyword(Keyword::Ascending) => true,
                        Token::Keyword(Keyword::Desc) | Token::Keyword(Keyword::Descending) => false,
                        token => {
                            return Err(Error::Syntax(format!(
                                "expected sort direction, found {}",
                                token
                            )));
                        }
                    };
                    keys.push((path, ascending));
                    if !self.next_is(Token::Comma) {
                        break;
                    }
                }
                DescriptorNode::Sort(keys)
            }
            Keyword::Distinct => {
                let mut paths = Vec::new();
                loop {
                    paths.push(self.parse_descriptor_path()?);
                    if !self.next_is(Token::Comma) {
                        break;
                    }
                }
                DescriptorNode::Distinct(paths)
            }
            _ => {
                let limit = match self.next()? {
                    Token::Number(text) => text
                        .parse::<usize>()
                        .map_err(|_| Error::Syntax(format!("bad limit '{}'", text)))?,
                    token => {
                        return Err(Error::Syntax(format!(
                            "expected a limit count, found {}",
                            token
                        )));
                    }
                };
                DescriptorNode::Limit(limit)
            }
        };
        self.expect(Token::CloseParen)?;
        Ok(Some(descriptor))
    }

    fn parse_descriptor_path(&mut self) -> Result<Vec<String>> {
        let mut path = vec![self.next_ident()?];
        while self.next_is(Token::Dot) {
            path.push(self.next_ident()?);
        }
        Ok(path)
    }
}

/// Timestamp literal bodies: either `<sec>:<nanos>` relative to the epoch,
/// or `Y-M-D@H:M:S[:ns]`. Nanoseconds must not be negative.
fn parse_timestamp(body: &str) -> Result<chrono::NaiveDateTime> {
    let bad = || Error::Syntax(format!("bad timestamp literal '{}'", body));
    if let Some(at) = body.find('@') {
        let (date, time) = body.split_at(at);
        let time = &time[1..];
        let date_parts: Vec<&str> = date.split('-').collect();
        let time_parts: Vec<&str> = time.split(':').collect();
        if date_parts.len() != 3 || !(time_parts.len() == 3 || time_parts.len() == 4) {
            return Err(bad());
        }
        let num = |s: &str| -> Result<u32> { s.parse::<u32>().map_err(|_| bad()) };
        let year = date_parts[0].parse::<i32>().map_err(|_| bad())?;
        let month = num(date_parts[1])?;
        let day = num(date_parts[2])?;
        let hour = num(time_parts[0])?;
        let minute = num(time_parts[1])?;
        let second = num(time_parts[2])?;
        let nanos = if time_parts.len() == 4 {
            num(time_parts[3])?
        } else {
            0
        };
        chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_nano_opt(hour, minute, second, nanos))
            .ok_or_else(bad)
    } else {
        let (sec, nanos) = body.split_once(':').ok_or_else(bad)?;
        let sec = sec.parse::<i64>().map_err(|_| bad())?;
        let nanos = nanos.parse::<u32>().map_err(|_| bad())?;
        if nanos >= 1_000_000_000 {
            return Err(bad());
        }
        chrono::DateTime::from_timestamp(sec, nanos)
            .map(|dt| dt.naive_utc())
            .ok_or_else(bad)
    }
}
