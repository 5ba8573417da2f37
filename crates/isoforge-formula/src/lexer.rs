//! Tokenizer for formula source text
//!
//! The lexer is pull-based: [`Lexer::advance`] classifies the next token and
//! remembers the kind of the one before it, which the parser needs to tell
//! unary operators from binary ones.

use crate::error::ParseError;
use std::fmt;

/// Operator symbols recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

impl Symbol {
    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::Plus => "+",
            Symbol::Minus => "-",
            Symbol::Star => "*",
            Symbol::Slash => "/",
            Symbol::Percent => "%",
        }
    }
}

/// Operator table searched by prefix. Longer spellings must come first.
const OPERATORS: [(&str, Symbol); 5] = [
    ("+", Symbol::Plus),
    ("-", Symbol::Minus),
    ("*", Symbol::Star),
    ("/", Symbol::Slash),
    ("%", Symbol::Percent),
];

/// A single token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// End of input
    End,
    Op(Symbol),
    Number(f32),
    /// Lower-cased identifier
    Identifier(String),
    LeftParen,
    RightParen,
    Comma,
}

/// Payload-free token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    End,
    Op,
    Number,
    Identifier,
    LeftParen,
    RightParen,
    Comma,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::End => TokenKind::End,
            Token::Op(_) => TokenKind::Op,
            Token::Number(_) => TokenKind::Number,
            Token::Identifier(_) => TokenKind::Identifier,
            Token::LeftParen => TokenKind::LeftParen,
            Token::RightParen => TokenKind::RightParen,
            Token::Comma => TokenKind::Comma,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::End => write!(f, "end of input"),
            Token::Op(symbol) => write!(f, "{}", symbol.as_str()),
            Token::Number(value) => write!(f, "{}", value),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Streaming tokenizer over trimmed source text
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    token_start: usize,
    current: Token,
    previous: TokenKind,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned before the first token
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.trim(),
            pos: 0,
            token_start: 0,
            current: Token::End,
            previous: TokenKind::End,
        }
    }

    /// The token produced by the last call to [`advance`](Self::advance)
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Kind of the token before the current one (`End` at start of input)
    pub fn previous(&self) -> TokenKind {
        self.previous
    }

    /// Byte offset where the current token starts
    pub fn offset(&self) -> usize {
        self.token_start
    }

    /// Read the next token, skipping trailing whitespace after it
    pub fn advance(&mut self) -> Result<(), ParseError> {
        self.previous = self.current.kind();
        self.token_start = self.pos;

        let Some(c) = self.peek() else {
            self.current = Token::End;
            return Ok(());
        };

        self.current = if c.is_ascii_digit() || c == '.' {
            self.read_number()?
        } else if c == '(' {
            self.pos += 1;
            Token::LeftParen
        } else if c == ')' {
            self.pos += 1;
            Token::RightParen
        } else if c == ',' {
            self.pos += 1;
            Token::Comma
        } else if let Some((text, symbol)) = self.match_operator() {
            self.pos += text.len();
            Token::Op(symbol)
        } else {
            self.read_identifier()
        };

        self.skip_whitespace();
        Ok(())
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn match_operator(&self) -> Option<(&'static str, Symbol)> {
        let rest = self.rest();
        OPERATORS
            .iter()
            .find(|(text, _)| rest.starts_with(text))
            .copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek()
            && c.is_whitespace()
        {
            self.pos += c.len_utf8();
        }
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        let mut seen_point = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' {
                if seen_point {
                    return Err(ParseError::new(
                        format!("Invalid number: '{}.'", &self.input[start..self.pos]),
                        start,
                    ));
                }
                seen_point = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f32>()
            .map(Token::Number)
            .map_err(|_| ParseError::new(format!("Invalid number: '{}'", text), start))
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | ',') || self.match_operator().is_some()
            {
                break;
            }
            self.pos += c.len_utf8();
        }
        Token::Identifier(self.input[start..self.pos].to_lowercase())
    }
}
