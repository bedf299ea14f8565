//! Parser for instance netlists.

use tracing::debug;

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{Result, TopoSeqError};

/// Parser for instance netlists.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(lexer: Lexer<'a>) -> Result<Self> {
        let mut lexer = lexer;
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<NetlistAst> {
        let mut ast = NetlistAst::new();

        while self.current.kind != TokenKind::Eof {
            // Skip empty lines
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
                continue;
            }

            match self.parse_line()? {
                Some(instance) => ast.instances.push(instance),
                None => ast.skipped_lines += 1,
            }

            // Consume newline or EOF
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(TopoSeqError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn skip_line(&mut self) -> Result<()> {
        while !matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof) {
            self.advance()?;
        }
        Ok(())
    }

    /// Parse one line. Lines that do not start with `NAME (` are skipped.
    fn parse_line(&mut self) -> Result<Option<InstanceDef>> {
        let line = self.current.line;
        if self.current.kind != TokenKind::Word {
            debug!(line, "skipping netlist line");
            self.skip_line()?;
            return Ok(None);
        }
        let name = self.current.text.clone();
        self.advance()?;

        if self.current.kind != TokenKind::OpenParen {
            debug!(line, name = %name, "skipping netlist line");
            self.skip_line()?;
            return Ok(None);
        }
        self.advance()?;

        let mut nets = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::Word => {
                    nets.push(self.current.text.clone());
                    self.advance()?;
                }
                TokenKind::CloseParen => {
                    self.advance()?;
                    break;
                }
                TokenKind::OpenParen => {
                    return Err(TopoSeqError::parse(line, format!("nested '(' in instance '{}'", name)));
                }
                TokenKind::Newline | TokenKind::Eof => {
                    return Err(TopoSeqError::parse(line, format!("unclosed '(' in instance '{}'", name)));
                }
            }
        }

        let model = self.expect(TokenKind::Word).map_err(|_| {
            TopoSeqError::invalid_instance(&name, line, "missing model name after net list")
        })?;

        // Trailing parameters (w=..., l=...) do not affect topology
        self.skip_line()?;

        Ok(Some(InstanceDef {
            name,
            nets,
            model: model.text,
            line,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instance() {
        let ast = super::super::parse("MM9 (VOUT1 net12 VSS VSS) nmos4").unwrap();
        assert_eq!(ast.instances.len(), 1);
        let inst = &ast.instances[0];
        assert_eq!(inst.name, "MM9");
        assert_eq!(inst.nets, vec!["VOUT1", "net12", "VSS", "VSS"]);
        assert_eq!(inst.model, "nmos4");
        assert_eq!(inst.line, 1);
    }

    #[test]
    fn test_parse_skips_other_lines() {
        let input = "* comment\nsubckt amp VIN1 VOUT1\nR0 (VIN1 VOUT1) resistor r=1k\nends amp\n";
        let ast = super::super::parse(input).unwrap();
        assert_eq!(ast.instances.len(), 1);
        assert_eq!(ast.instances[0].line, 3);
        assert_eq!(ast.skipped_lines, 2);
        assert_eq!(ast.net_names(), vec!["VIN1", "VOUT1"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            super::super::parse("MM1 (a b c d nmos4\nR0 (a b) resistor"),
            Err(TopoSeqError::ParseError { line: 1, .. })
        ));
        assert!(matches!(
            super::super::parse("MM1 (a b c d)\n"),
            Err(TopoSeqError::InvalidInstance { line: 1, .. })
        ));
    }
}
