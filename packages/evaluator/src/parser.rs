use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, unquote, Token};
use crate::value::Value;

/// Deepest expression nesting accepted. Parentheses, unary operators, operator chains and
/// postfix chains all count, so evaluation depth stays bounded too.
pub const MAX_NESTING: usize = 64;

/// Parse a complete expression source.
pub fn parse(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;

    if let Some((token, span)) = parser.peek() {
        return Err(ParseError::unexpected_token(
            span.start,
            "end of expression",
            token.to_string(),
        ));
    }

    Ok(expr)
}

/// Recursive-descent parser for binding expressions
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    source_len: usize,
    nesting: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
            nesting: 0,
        })
    }

    /// Parse an expression with full operator precedence
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let expr = self.parse_conditional_expression()?;
        self.nesting -= 1;
        Ok(expr)
    }

    /// Parse `test ? consequent : alternate` (lowest precedence)
    fn parse_conditional_expression(&mut self) -> ParseResult<Expr> {
        let test = self.parse_or_expression()?;

        if !self.match_token(Token::Question) {
            return Ok(test);
        }

        let consequent = self.parse_expression()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_expression()?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_or_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expression()?;
        let mut chained = 0;

        while self.match_token(Token::Or) {
            self.enter()?;
            chained += 1;
            let right = self.parse_and_expression()?;
            left = binary(left, BinaryOp::Or, right);
        }

        self.nesting -= chained;
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality_expression()?;
        let mut chained = 0;

        while self.match_token(Token::And) {
            self.enter()?;
            chained += 1;
            let right = self.parse_equality_expression()?;
            left = binary(left, BinaryOp::And, right);
        }

        self.nesting -= chained;
        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison_expression()?;
        let mut chained = 0;

        while let Some(op) = self.match_equality_op() {
            self.enter()?;
            chained += 1;
            let right = self.parse_comparison_expression()?;
            left = binary(left, op, right);
        }

        self.nesting -= chained;
        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive_expression()?;
        let mut chained = 0;

        while let Some(op) = self.match_comparison_op() {
            self.enter()?;
            chained += 1;
            let right = self.parse_additive_expression()?;
            left = binary(left, op, right);
        }

        self.nesting -= chained;
        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative_expression()?;
        let mut chained = 0;

        while let Some(op) = self.match_additive_op() {
            self.enter()?;
            chained += 1;
            let right = self.parse_multiplicative_expression()?;
            left = binary(left, op, right);
        }

        self.nesting -= chained;
        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary_expression()?;
        let mut chained = 0;

        while let Some(op) = self.match_multiplicative_op() {
            self.enter()?;
            chained += 1;
            let right = self.parse_unary_expression()?;
            left = binary(left, op, right);
        }

        self.nesting -= chained;
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expr> {
        let operator = if self.match_token(Token::Bang) {
            UnaryOp::Not
        } else if self.match_token(Token::Minus) {
            UnaryOp::Negate
        } else {
            return self.parse_postfix_expression();
        };

        self.enter()?;
        let operand = self.parse_unary_expression()?;
        self.nesting -= 1;
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    /// Member access, indexing and calls: `a.b[c](d)`
    fn parse_postfix_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_expression()?;
        let mut chained = 0;

        loop {
            if self.check(&Token::Dot)
                || self.check(&Token::LBracket)
                || self.check(&Token::LParen)
            {
                self.enter()?;
                chained += 1;
            }

            if self.match_token(Token::Dot) {
                let property = self.expect_property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.match_token(Token::LParen) {
                let arguments = self.parse_arguments(Token::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                break;
            }
        }

        self.nesting -= chained;
        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expr> {
        let Some((token, span)) = self.advance().cloned() else {
            return Err(ParseError::unexpected_eof(self.source_len));
        };

        match token {
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Undefined => Ok(Expr::Undefined),
            Token::Number(n) => n
                .parse::<f64>()
                .map(|n| Expr::Literal(Value::Number(n)))
                .map_err(|_| ParseError::unexpected_token(span.start, "number", n)),
            Token::String(s) => Ok(Expr::Literal(Value::String(unquote(s)))),
            Token::Ident(name) => Ok(Expr::Identifier(name.to_string())),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => Ok(Expr::Array(self.parse_arguments(Token::RBracket)?)),
            other => Err(ParseError::unexpected_token(
                span.start,
                "expression",
                other.to_string(),
            )),
        }
    }

    /// Parse a comma separated list up to (and including) `close`.
    fn parse_arguments(&mut self, close: Token<'src>) -> ParseResult<Vec<Expr>> {
        let mut arguments = Vec::new();

        while !self.check(&close) && !self.is_at_end() {
            arguments.push(self.parse_expression()?);

            if !self.match_token(Token::Comma) {
                break;
            }
        }

        self.expect(close)?;
        Ok(arguments)
    }

    // Helper methods for matching operators

    fn match_equality_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::StrictEquals) {
            Some(BinaryOp::StrictEquals)
        } else if self.match_token(Token::StrictNotEquals) {
            Some(BinaryOp::StrictNotEquals)
        } else if self.match_token(Token::EqualsEquals) {
            Some(BinaryOp::Equals)
        } else if self.match_token(Token::NotEquals) {
            Some(BinaryOp::NotEquals)
        } else {
            None
        }
    }

    fn match_comparison_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::LessThanEquals) {
            Some(BinaryOp::LessThanOrEqual)
        } else if self.match_token(Token::GreaterThanEquals) {
            Some(BinaryOp::GreaterThanOrEqual)
        } else if self.match_token(Token::LAngle) {
            Some(BinaryOp::LessThan)
        } else if self.match_token(Token::RAngle) {
            Some(BinaryOp::GreaterThan)
        } else {
            None
        }
    }

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Plus) {
            Some(BinaryOp::Add)
        } else if self.match_token(Token::Minus) {
            Some(BinaryOp::Subtract)
        } else {
            None
        }
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Star) {
            Some(BinaryOp::Multiply)
        } else if self.match_token(Token::Slash) {
            Some(BinaryOp::Divide)
        } else if self.match_token(Token::Percent) {
            Some(BinaryOp::Remainder)
        } else {
            None
        }
    }

    // Helper methods

    fn enter(&mut self) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(ParseError::too_deep(self.current_pos(), MAX_NESTING));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_pos(&self) -> usize {
        self.peek()
            .map(|(_, span)| span.start)
            .unwrap_or(self.source_len)
    }

    fn check(&self, token: &Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(&token) {
            self.advance();
            return Ok(());
        }

        match self.peek() {
            Some((found, _)) => Err(ParseError::unexpected_token(
                self.current_pos(),
                token.to_string(),
                found.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }

    /// Property names after `.` may be keywords (`item.null` is unusual but valid).
    fn expect_property_name(&mut self) -> ParseResult<String> {
        let pos = self.current_pos();
        match self.advance().map(|(t, _)| t.clone()) {
            Some(Token::Ident(name)) => Ok(name.to_string()),
            Some(keyword @ (Token::True | Token::False | Token::Null | Token::Undefined)) => {
                Ok(keyword.to_string())
            }
            Some(other) => Err(ParseError::unexpected_token(
                pos,
                "property name",
                other.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}
