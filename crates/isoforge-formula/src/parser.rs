//! Shunting-yard parser producing [`Node`] trees
//!
//! Operands and pending operators live on two explicit stacks shared by all
//! recursion levels. Parenthesized groups and call arguments recurse into
//! [`Parser::parse_until`], which only reduces operators and consumes operands
//! pushed at its own level.

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::error::ParseError;
use crate::lexer::{Lexer, Symbol, Token, TokenKind};

/// Parse formula text into an AST
///
/// Empty or whitespace-only input is the empty formula and yields `Ok(None)`.
pub fn parse(text: &str) -> Result<Option<Node>, ParseError> {
    let mut lexer = Lexer::new(text);
    lexer.advance()?;
    if *lexer.current() == Token::End {
        return Ok(None);
    }

    let mut parser = Parser {
        lexer,
        operators: Vec::new(),
        output: Vec::new(),
    };
    parser.parse_until(Stop::EndOfInput).map(Some)
}

/// Operator waiting on the operator stack
#[derive(Debug, Clone, Copy)]
enum Pending {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl Pending {
    fn precedence(self) -> u32 {
        match self {
            Pending::Unary(_) => 2000,
            Pending::Binary(BinaryOp::Add | BinaryOp::Sub) => 2,
            Pending::Binary(BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod) => 3,
        }
    }

    fn is_right_associative(self) -> bool {
        matches!(self, Pending::Unary(_))
    }

    fn symbol(self) -> &'static str {
        match self {
            Pending::Unary(op) => op.symbol(),
            Pending::Binary(op) => op.symbol(),
        }
    }
}

/// What ends the expression being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    EndOfInput,
    /// A comma or closing parenthesis (or end of input, which the caller rejects)
    Argument,
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    operators: Vec<Pending>,
    output: Vec<Node>,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.lexer.offset())
    }

    fn at_stop(&self, stop: Stop) -> bool {
        match self.lexer.current() {
            Token::End => true,
            Token::Comma | Token::RightParen => stop == Stop::Argument,
            _ => false,
        }
    }

    fn parse_until(&mut self, stop: Stop) -> Result<Node, ParseError> {
        let operator_base = self.operators.len();
        let output_base = self.output.len();

        while !self.at_stop(stop) {
            match self.lexer.current().clone() {
                Token::Number(value) => {
                    self.output.push(Node::Constant(value));
                    self.lexer.advance()?;
                }
                Token::Identifier(name) => {
                    self.lexer.advance()?;
                    if *self.lexer.current() == Token::LeftParen {
                        let args = self.parse_arguments()?;
                        self.output.push(Node::Call { name, args });
                    } else {
                        self.output.push(Node::Variable(name));
                    }
                }
                Token::LeftParen => {
                    self.lexer.advance()?;
                    let inner = self.parse_until(Stop::Argument)?;
                    match self.lexer.current() {
                        Token::RightParen => {}
                        Token::Comma => return Err(self.error("Tuples not supported")),
                        _ => {
                            return Err(
                                self.error("Mismatched parens, missing a closing parens")
                            );
                        }
                    }
                    self.output.push(inner);
                    self.lexer.advance()?;
                }
                Token::Op(symbol) => {
                    let op = self.classify_operator(symbol)?;
                    while let Some(&top) = self.operators.last()
                        && self.operators.len() > operator_base
                        && (top.precedence() > op.precedence()
                            || (top.precedence() == op.precedence()
                                && !op.is_right_associative()))
                    {
                        self.operators.pop();
                        self.reduce(top, output_base)?;
                    }
                    self.operators.push(op);
                    self.lexer.advance()?;
                }
                Token::RightParen => return Err(self.error("Mismatched parens")),
                Token::Comma => return Err(self.error("Tuples not supported")),
                Token::End => break,
            }
        }

        while self.operators.len() > operator_base {
            if let Some(op) = self.operators.pop() {
                self.reduce(op, output_base)?;
            }
        }

        match self.output.len() - output_base {
            0 => Err(self.error("Expected an expression")),
            1 => self
                .output
                .pop()
                .ok_or_else(|| self.error("Expected an expression")),
            _ => Err(self.error("Missing operator between operands")),
        }
    }

    /// Parse `( arg (, arg)* )`; the current token is the opening parenthesis
    fn parse_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.lexer.advance()?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_until(Stop::Argument)?);
            match self.lexer.current() {
                Token::RightParen => {
                    self.lexer.advance()?;
                    return Ok(args);
                }
                Token::Comma => self.lexer.advance()?,
                _ => return Err(self.error("Mismatched parens, missing a closing parens")),
            }
        }
    }

    fn classify_operator(&self, symbol: Symbol) -> Result<Pending, ParseError> {
        let unary = matches!(
            self.lexer.previous(),
            TokenKind::End | TokenKind::Op | TokenKind::LeftParen | TokenKind::Comma
        );

        Ok(match (unary, symbol) {
            (true, Symbol::Plus) => Pending::Unary(UnaryOp::Plus),
            (true, Symbol::Minus) => Pending::Unary(UnaryOp::Minus),
            (true, _) => {
                return Err(self.error(format!(
                    "Missing operand for the {} operator in the expression",
                    symbol.as_str()
                )));
            }
            (false, Symbol::Plus) => Pending::Binary(BinaryOp::Add),
            (false, Symbol::Minus) => Pending::Binary(BinaryOp::Sub),
            (false, Symbol::Star) => Pending::Binary(BinaryOp::Mul),
            (false, Symbol::Slash) => Pending::Binary(BinaryOp::Div),
            (false, Symbol::Percent) => Pending::Binary(BinaryOp::Mod),
        })
    }

    fn pop_operand(&mut self, op: Pending, output_base: usize) -> Result<Node, ParseError> {
        if self.output.len() <= output_base {
            return Err(self.error(format!(
                "Missing operand for the {} operator in the expression",
                op.symbol()
            )));
        }
        self.output
            .pop()
            .ok_or_else(|| self.error("Missing operand"))
    }

    fn reduce(&mut self, op: Pending, output_base: usize) -> Result<(), ParseError> {
        let node = match op {
            Pending::Unary(unary) => {
                let operand = self.pop_operand(op, output_base)?;
                Node::unary(unary, operand)
            }
            Pending::Binary(binary) => {
                let right = self.pop_operand(op, output_base)?;
                let left = self.pop_operand(op, output_base)?;
                Node::binary(binary, left, right)
            }
        };
        self.output.push(node);
        Ok(())
    }
}
