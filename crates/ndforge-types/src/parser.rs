//! Recursive descent parser for type text
//!
//! ## Grammar
//!
//! ```text
//! <type>      ::= "!" <fixed-chain> | <fixed-chain> | <var-chain>
//!               | "..." "*" <type> | <dtype>
//! <fixed-chain> ::= <fixed-dim> "*" ( <fixed-chain> | <dtype> )
//! <fixed-dim> ::= <integer> | <Symbol> | "fixed" "(" "shape" "=" <integer> ")"
//! <var-chain> ::= "var" [ "(" "offsets" "=" "[" <integer> {"," <integer>} "]" ")" ] "*"
//!                 ( <var-chain> | <dtype> )
//! <dtype>     ::= <primitive> | <Kind> | <TypeVar>
//!               | "(" [ <type> { "," <type> } [","] ] ")"
//!               | "{" [ <name> ":" <type> { "," <name> ":" <type> } [","] ] "}"
//! <function>  ::= <params> "->" <params>
//! <params>    ::= "void" | "(" [ <type> {"," <type>} ] ")" | <type> { "," <type> }
//! ```
//!
//! A capitalized name followed by `*` is a symbolic dimension; a capitalized
//! name in element position is a type variable unless it names a kind.
//!
//! ## Examples
//!
//! ```
//! use ndforge_types::{parse, Order};
//!
//! let c = parse("2 * 2 * long").unwrap();
//! let f = parse("!2 * 2 * long").unwrap();
//! assert_eq!(c.shape().unwrap(), f.shape().unwrap());
//! assert_eq!(f.chain_order(), Some(Order::ColumnMajor));
//! assert_eq!(c.to_string(), "2 * 2 * int64");
//! ```

use crate::descriptor::{Field, Order, TypeDescriptor};
use crate::error::{Result, TypeError};
use crate::lexer::{tokenize, Spanned, Token};
use crate::primitive::{Kind, Primitive};
use std::fmt;

/// Parsed function signature text: `params -> returns`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<TypeDescriptor>,
    pub returns: Vec<TypeDescriptor>,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor]) -> fmt::Result {
            if items.is_empty() {
                return f.write_str("void");
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }
        list(f, &self.params)?;
        f.write_str(" -> ")?;
        list(f, &self.returns)
    }
}

/// Parse a single type
pub fn parse(input: &str) -> Result<TypeDescriptor> {
    let mut parser = Parser::new(input)?;
    let ty = parser.parse_type()?;
    parser.finish()?;
    Ok(ty)
}

/// Parse a function signature such as `N * M * T, N * M * T -> T`
pub fn parse_function(input: &str) -> Result<FunctionType> {
    let mut parser = Parser::new(input)?;
    let params = parser.parse_params(true)?;
    parser.expect(Token::Arrow, "`->`")?;
    let returns = parser.parse_params(false)?;
    parser.finish()?;
    Ok(FunctionType { params, returns })
}

/// Parser state
pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    end: usize,
    var_depth: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        Ok(Parser {
            tokens: tokenize(input)?,
            position: 0,
            end: input.len(),
            var_depth: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset).map(|s| &s.token)
    }

    /// Byte offset of the current token, or the end of input
    fn here(&self) -> usize {
        self.tokens.get(self.position).map_or(self.end, |s| s.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|s| s.token.clone());
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> TypeError {
        let found = match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        };
        TypeError::grammar(self.here(), format!("expected {}, found {}", expected, found))
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<()> {
        if self.peek() == Some(&token) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn finish(&self) -> Result<()> {
        if self.position < self.tokens.len() {
            Err(self.unexpected("end of input"))
        } else {
            Ok(())
        }
    }

    fn is_fixed_dim_start(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::Number(_)), _) => true,
            (Some(Token::Name(name)), Some(Token::LParen)) if name == "fixed" => true,
            (Some(Token::Name(name)), Some(Token::Star)) => is_symbol(name) && Kind::from_name(name).is_none(),
            _ => false,
        }
    }

    fn is_var_start(&self) -> bool {
        matches!(
            (self.peek(), self.peek_at(1)),
            (Some(Token::Name(name)), Some(Token::Star | Token::LParen)) if name == "var"
        )
    }

    pub fn parse_type(&mut self) -> Result<TypeDescriptor> {
        match self.peek() {
            Some(Token::Bang) => {
                if self.var_depth > 0 {
                    return Err(TypeError::grammar(
                        self.here(),
                        "column-major order is not allowed below a var dimension",
                    ));
                }
                self.position += 1;
                if !self.is_fixed_dim_start() {
                    return Err(self.unexpected("a fixed dimension after `!`"));
                }
                self.parse_fixed_chain(Order::ColumnMajor)
            }
            Some(Token::Ellipsis) => {
                self.position += 1;
                self.expect(Token::Star, "`*`")?;
                if self.peek() == Some(&Token::Ellipsis) {
                    return Err(TypeError::grammar(
                        self.here(),
                        "at most one ellipsis is allowed per dimension chain",
                    ));
                }
                let element = self.parse_type()?;
                Ok(TypeDescriptor::EllipsisDim {
                    element: Box::new(element),
                })
            }
            _ if self.is_fixed_dim_start() => self.parse_fixed_chain(Order::RowMajor),
            _ if self.is_var_start() => {
                let start = self.here();
                let ty = self.parse_var_chain()?;
                ty.validate().map_err(|err| match err {
                    TypeError::InvalidDescriptor(message) => TypeError::grammar(start, message),
                    other => other,
                })?;
                Ok(ty)
            }
            _ => self.parse_dtype(),
        }
    }

    fn reject_chain_continuation(&self, chain: &str) -> Result<()> {
        match self.peek() {
            Some(Token::Bang) => Err(TypeError::grammar(
                self.here(),
                "`!` must lead its dimension chain",
            )),
            Some(Token::Ellipsis) => Err(TypeError::grammar(
                self.here(),
                "an ellipsis must lead its dimension chain",
            )),
            _ if (chain == "fixed" && self.is_var_start()) || (chain == "var" && self.is_fixed_dim_start()) => {
                Err(TypeError::grammar(
                    self.here(),
                    "fixed and var dimensions cannot be mixed in one chain",
                ))
            }
            _ => Ok(()),
        }
    }

    fn parse_fixed_chain(&mut self, order: Order) -> Result<TypeDescriptor> {
        let dim = match self.advance() {
            Some(Token::Name(name)) if name == "fixed" => Some(Token::Number(self.parse_fixed_shape()?)),
            other => other,
        };
        self.expect(Token::Star, "`*`")?;

        let element = if self.is_fixed_dim_start() {
            self.parse_fixed_chain(order)?
        } else {
            self.reject_chain_continuation("fixed")?;
            self.parse_dtype()?
        };
        let element = Box::new(element);

        match dim {
            Some(Token::Number(count)) => Ok(TypeDescriptor::FixedDim { count, order, element }),
            Some(Token::Name(name)) => Ok(TypeDescriptor::SymbolicDim { name, order, element }),
            _ => Err(self.unexpected("a fixed dimension")),
        }
    }

    fn parse_var_chain(&mut self) -> Result<TypeDescriptor> {
        self.position += 1; // var
        let offsets = if self.peek() == Some(&Token::LParen) {
            self.position += 1;
            Some(self.parse_offsets()?)
        } else {
            None
        };
        self.expect(Token::Star, "`*`")?;

        self.var_depth += 1;
        let element = if self.is_var_start() {
            self.parse_var_chain()
        } else {
            self.reject_chain_continuation("var").and_then(|()| self.parse_dtype())
        };
        self.var_depth -= 1;

        Ok(TypeDescriptor::VarDim {
            offsets: offsets.map(Into::into),
            element: Box::new(element?),
        })
    }

    /// `(shape=3)` after `fixed`
    fn parse_fixed_shape(&mut self) -> Result<usize> {
        self.expect(Token::LParen, "`(`")?;
        match self.peek() {
            Some(Token::Name(name)) if name == "shape" => self.position += 1,
            _ => return Err(self.unexpected("`shape`")),
        }
        self.expect(Token::Equals, "`=`")?;
        let count = match self.peek() {
            Some(Token::Number(n)) => *n,
            _ => return Err(self.unexpected("a dimension size")),
        };
        self.position += 1;
        self.expect(Token::RParen, "`)`")?;
        Ok(count)
    }

    /// `offsets=[0, 2, 5])` after the opening parenthesis
    fn parse_offsets(&mut self) -> Result<Vec<usize>> {
        match self.peek() {
            Some(Token::Name(name)) if name == "offsets" => self.position += 1,
            _ => return Err(self.unexpected("`offsets`")),
        }
        self.expect(Token::Equals, "`=`")?;
        self.expect(Token::LBracket, "`[`")?;

        let mut offsets = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Number(n)) => {
                    offsets.push(*n);
                    self.position += 1;
                }
                _ => return Err(self.unexpected("an offset")),
            }
            match self.peek() {
                Some(Token::Comma) => self.position += 1,
                Some(Token::RBracket) => break,
                _ => return Err(self.unexpected("`,` or `]`")),
            }
        }
        self.expect(Token::RBracket, "`]`")?;
        self.expect(Token::RParen, "`)`")?;
        Ok(offsets)
    }

    fn parse_dtype(&mut self) -> Result<TypeDescriptor> {
        let position = self.here();
        match self.peek().cloned() {
            Some(Token::Name(name)) => {
                self.position += 1;
                if let Some(primitive) = Primitive::from_name(&name) {
                    Ok(TypeDescriptor::Primitive(primitive))
                } else if let Some(kind) = Kind::from_name(&name) {
                    Ok(TypeDescriptor::Kind(kind))
                } else if is_symbol(&name) {
                    Ok(TypeDescriptor::TypeVar(name))
                } else {
                    Err(TypeError::grammar(position, format!("unknown type name `{}`", name)))
                }
            }
            Some(Token::LParen) => {
                self.position += 1;
                let members = self.parse_sequence(Token::RParen, |parser| parser.parse_type())?;
                Ok(TypeDescriptor::Tuple(members))
            }
            Some(Token::LBrace) => {
                self.position += 1;
                let fields = self.parse_sequence(Token::RBrace, |parser| {
                    let name = match parser.peek() {
                        Some(Token::Name(name)) => name.clone(),
                        _ => return Err(parser.unexpected("a field name")),
                    };
                    parser.position += 1;
                    parser.expect(Token::Colon, "`:`")?;
                    Ok(Field::new(name, parser.parse_type()?))
                })?;
                Ok(TypeDescriptor::Record(fields))
            }
            _ => Err(self.unexpected("an element type")),
        }
    }

    /// Comma-separated items up to `close`, trailing comma allowed
    fn parse_sequence<T>(&mut self, close: Token, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&close) {
                self.position += 1;
                return Ok(items);
            }
            items.push(item(self)?);
            match self.peek() {
                Some(Token::Comma) => self.position += 1,
                Some(token) if *token == close => {}
                _ => return Err(self.unexpected(&format!("`,` or {}", close))),
            }
        }
    }

    /// Parameter or return list of a function type
    fn parse_params(&mut self, before_arrow: bool) -> Result<Vec<TypeDescriptor>> {
        if matches!(self.peek(), Some(Token::Name(name)) if name == "void") {
            self.position += 1;
            return Ok(Vec::new());
        }
        if self.peek() == Some(&Token::LParen) && self.is_parenthesized_list(before_arrow) {
            self.position += 1;
            return self.parse_sequence(Token::RParen, |parser| parser.parse_type());
        }

        let mut params = vec![self.parse_type()?];
        while self.peek() == Some(&Token::Comma) {
            self.position += 1;
            params.push(self.parse_type()?);
        }
        Ok(params)
    }

    /// Whether the parenthesis at the cursor closes right before `->`
    /// (parameters) or at end of input (returns)
    fn is_parenthesized_list(&self, before_arrow: bool) -> bool {
        let mut depth = 0usize;
        for (i, spanned) in self.tokens[self.position..].iter().enumerate() {
            match spanned.token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        let next = self.tokens.get(self.position + i + 1).map(|s| &s.token);
                        return if before_arrow {
                            next == Some(&Token::Arrow)
                        } else {
                            next.is_none()
                        };
                    }
                }
                _ => {}
            }
        }
        false
    }
}

fn is_symbol(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}
