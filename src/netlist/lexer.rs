//! Lexer (tokenizer) for instance netlists.

use crate::error::{Result, TopoSeqError};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in a netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Any run of characters other than whitespace and parentheses
    /// (instance names, net names, model names, parameters)
    Word,
    /// Open parenthesis '('
    OpenParen,
    /// Close parenthesis ')'
    CloseParen,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    /// Whether the current line has produced a token yet
    line_started: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            line_started: false,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let Some(&ch) = self.chars.peek() else {
            return Ok(self.make(TokenKind::Eof, String::new(), self.line, self.column));
        };

        let line = self.line;
        let column = self.column;
        self.line_started = ch != '\n';

        let token = match ch {
            '\n' => {
                self.advance();
                self.make(TokenKind::Newline, "\n".to_string(), line, column)
            }
            '(' => {
                self.advance();
                self.make(TokenKind::OpenParen, "(".to_string(), line, column)
            }
            ')' => {
                self.advance();
                self.make(TokenKind::CloseParen, ")".to_string(), line, column)
            }
            _ if ch.is_control() => {
                return Err(TopoSeqError::lexer(
                    line,
                    column,
                    format!("unexpected control character {:?}", ch),
                ));
            }
            _ => {
                let text = self.read_word();
                self.make(TokenKind::Word, text, line, column)
            }
        };

        Ok(token)
    }

    fn make(&self, kind: TokenKind, text: String, line: usize, column: usize) -> Token {
        Token {
            kind,
            text,
            line,
            column,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '*' && !self.line_started {
                // Comment line: skip until end of line
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch.is_control() {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }
}
