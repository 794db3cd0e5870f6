//! Recursive descent parser for the selection language.

use crate::selection::ast::*;
use crate::selection::error::{SelectionError, Span};
use crate::selection::keywords;
use crate::selection::token::*;

/// Parser state wrapping a token stream.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    input: String,
    /// End of the last consumed token
    prev_end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<SpannedToken>, input: String) -> Self {
        Self {
            tokens,
            pos: 0,
            input,
            prev_end: 0,
        }
    }

    pub fn parse(mut self) -> Result<Expr, SelectionError> {
        if self.at_eof() {
            return Err(self.error("Empty selection expression", self.current_span()));
        }
        let expr = self.parse_or()?;
        self.require(&expr, Kind::Boolean, 0)?;
        if !self.at_eof() {
            return Err(self.error(
                format!("Unexpected token {:?}", self.current().token),
                self.current_span(),
            ));
        }
        Ok(expr)
    }

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn at_eof(&self) -> bool {
        self.current().token == Token::Eof
    }

    fn advance(&mut self) {
        self.prev_end = self.current_span().1;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> SelectionError {
        SelectionError::parser(message, span, &self.input)
    }

    fn expect(&mut self, expected: &Token) -> Result<SpannedToken, SelectionError> {
        let tok = self.current().clone();
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(expected) {
            self.advance();
            Ok(tok)
        } else {
            Err(self.error(
                format!("Expected {:?}, found {:?}", expected, tok.token),
                tok.span,
            ))
        }
    }

    /// Check that `expr`, which started at byte `start`, can be used where a
    /// value of kind `wanted` is needed.
    fn require(&self, expr: &Expr, wanted: Kind, start: usize) -> Result<(), SelectionError> {
        let kind = expr.kind();
        if kind == wanted || kind == Kind::Unknown {
            return Ok(());
        }
        let message = match wanted {
            Kind::Boolean => "Expected a boolean expression, found a value",
            _ => "Expected a value, found a boolean expression",
        };
        Err(self.error(message, (start, self.prev_end)))
    }

    /// Parse with `parse` and check the result has kind `wanted`.
    fn operand(
        &mut self,
        wanted: Kind,
        parse: fn(&mut Self) -> Result<Expr, SelectionError>,
    ) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let expr = parse(self)?;
        self.require(&expr, wanted, start)?;
        Ok(expr)
    }

    // or_expr = and_expr ("or" and_expr)*
    fn parse_or(&mut self) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let mut left = self.parse_and()?;
        while self.current().token == Token::Or {
            self.require(&left, Kind::Boolean, start)?;
            self.advance();
            let right = self.operand(Kind::Boolean, Self::parse_and)?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // and_expr = not_expr ("and" not_expr)*
    fn parse_and(&mut self) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let mut left = self.parse_not()?;
        while self.current().token == Token::And {
            self.require(&left, Kind::Boolean, start)?;
            self.advance();
            let right = self.operand(Kind::Boolean, Self::parse_not)?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // not_expr = "not" not_expr | comparison
    fn parse_not(&mut self) -> Result<Expr, SelectionError> {
        if self.current().token == Token::Not {
            self.advance();
            let inner = self.operand(Kind::Boolean, Self::parse_not)?;
            Ok(Expr::Not(Box::new(inner)))
        } else {
            self.parse_comparison()
        }
    }

    fn cmp_op(&self) -> Option<CmpOp> {
        match self.current().token {
            Token::Gt => Some(CmpOp::Gt),
            Token::Lt => Some(CmpOp::Lt),
            Token::Ge => Some(CmpOp::Ge),
            Token::Le => Some(CmpOp::Le),
            Token::Eq => Some(CmpOp::Eq),
            Token::Ne => Some(CmpOp::Ne),
            _ => None,
        }
    }

    // comparison = arith (cmp_op arith)? | property short_operand
    fn parse_comparison(&mut self) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let lhs = self.parse_arith()?;

        if let Some(op) = self.cmp_op() {
            self.require(&lhs, Kind::Value, start)?;
            self.advance();
            let rhs = self.operand(Kind::Value, Self::parse_arith)?;
            if self.current().token.is_comparison() {
                return Err(self.error("Comparisons can not be chained", self.current_span()));
            }
            return Ok(make_comparison(op, lhs, rhs));
        }

        if !matches!(lhs, Expr::Property(_)) {
            return Ok(lhs);
        }
        // `name O` is a short form of `name == O`. A sign after the property
        // is always subtraction, so the operand starts with a number.
        let rhs = match &self.current().token {
            Token::Ident(value) | Token::Str(value) => {
                let rhs = Expr::Str(value.clone());
                self.advance();
                rhs
            }
            Token::Number(_) => self.operand(Kind::Value, Self::parse_arith)?,
            _ => return Ok(lhs),
        };
        Ok(make_comparison(CmpOp::Eq, lhs, rhs))
    }

    fn additive_op(&self) -> Option<ArithOp> {
        match self.current().token {
            Token::Plus => Some(ArithOp::Add),
            Token::Minus => Some(ArithOp::Sub),
            _ => None,
        }
    }

    fn multiplicative_op(&self) -> Option<ArithOp> {
        match self.current().token {
            Token::Star => Some(ArithOp::Mul),
            Token::Slash => Some(ArithOp::Div),
            _ => None,
        }
    }

    // arith = term (("+" | "-") term)*
    fn parse_arith(&mut self) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let mut left = self.parse_term()?;
        while let Some(op) = self.additive_op() {
            self.require(&left, Kind::Value, start)?;
            self.advance();
            let right = self.operand(Kind::Value, Self::parse_term)?;
            left = Expr::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    // term = factor (("*" | "/") factor)*
    fn parse_term(&mut self) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let mut left = self.parse_factor()?;
        while let Some(op) = self.multiplicative_op() {
            self.require(&left, Kind::Value, start)?;
            self.advance();
            let right = self.operand(Kind::Value, Self::parse_factor)?;
            left = Expr::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    // factor = "-" factor | power
    fn parse_factor(&mut self) -> Result<Expr, SelectionError> {
        if self.current().token == Token::Minus {
            self.advance();
            let inner = self.operand(Kind::Value, Self::parse_factor)?;
            Ok(Expr::Neg(Box::new(inner)))
        } else {
            self.parse_power()
        }
    }

    // power = atom ("^" factor)?
    fn parse_power(&mut self) -> Result<Expr, SelectionError> {
        let start = self.current_span().0;
        let base = self.parse_atom()?;
        if self.current().token != Token::Hat {
            return Ok(base);
        }
        self.require(&base, Kind::Value, start)?;
        self.advance();
        let exponent = self.operand(Kind::Value, Self::parse_factor)?;
        Ok(Expr::Binary {
            op: ArithOp::Pow,
            lhs: Box::new(base),
            rhs: Box::new(exponent),
        })
    }

    // atom = NUMBER | STRING | "(" expression ")" | IDENT "(" slots ")" | IDENT
    fn parse_atom(&mut self) -> Result<Expr, SelectionError> {
        let tok = self.current().clone();
        match tok.token {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Token::Str(value) => {
                self.advance();
                Ok(Expr::Str(value))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                self.advance();
                if self.current().token == Token::LParen {
                    return self.parse_call(name);
                }
                Ok(match name.as_str() {
                    keywords::ALL => Expr::Bool(true),
                    keywords::NONE => Expr::Bool(false),
                    _ if keywords::is_builtin_property(&name) => {
                        Expr::Property(Accessor::new(name, 1))
                    }
                    _ => Expr::Str(name),
                })
            }
            Token::Variable(_) => Err(self.error(
                "Atom variables can only be used as function arguments",
                tok.span,
            )),
            Token::Eof => Err(self.error("Expected expression, found end of input", tok.span)),
            other => Err(self.error(format!("Expected expression, found {:?}", other), tok.span)),
        }
    }

    // property_call = IDENT "(" slot ("," slot)* ")"
    fn parse_call(&mut self, name: String) -> Result<Expr, SelectionError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_slot()?);
            match self.current().token {
                Token::Comma => self.advance(),
                Token::RParen => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(self.error(
                        format!("Expected ',' or ')' in call to '{}'", name),
                        self.current_span(),
                    ))
                }
            }
        }
        if args.len() == 1 && keywords::function_arity(&name).is_none() {
            Ok(Expr::Property(Accessor::new(name, args[0])))
        } else {
            Ok(Expr::Function { name, args })
        }
    }

    // slot = INT | "#" INT
    fn parse_slot(&mut self) -> Result<usize, SelectionError> {
        let tok = self.current().clone();
        let slot = match tok.token {
            Token::Variable(slot) => slot,
            Token::Number(value) if value.fract() == 0.0 && value >= 0.0 && value.is_finite() => {
                value as usize
            }
            Token::Number(value) => {
                return Err(self.error(
                    format!("Expected a positive integer atom index, found {}", value),
                    tok.span,
                ))
            }
            other => {
                return Err(self.error(
                    format!("Expected an atom index, found {:?}", other),
                    tok.span,
                ))
            }
        };
        if slot == 0 {
            return Err(self.error("Atom indexes start at 1", tok.span));
        }
        self.advance();
        Ok(slot)
    }
}

/// Build a comparison node, turning `property == "string"` into a string test.
fn make_comparison(op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
    match (op, lhs, rhs) {
        (CmpOp::Eq | CmpOp::Ne, Expr::Property(property), Expr::Str(value))
        | (CmpOp::Eq | CmpOp::Ne, Expr::Str(value), Expr::Property(property)) => {
            Expr::StringTest {
                property,
                value,
                equals: op == CmpOp::Eq,
            }
        }
        (op, lhs, rhs) => Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

/// Parse a selection expression string (without context header) into an AST.
pub fn parse_selection(input: &str) -> Result<Expr, SelectionError> {
    let tokens = tokenize(input)?;
    let parser = Parser::new(tokens, input.to_string());
    parser.parse()
}
