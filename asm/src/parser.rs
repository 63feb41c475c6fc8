//! Hand-written recursive-descent parser (§4.3). One token of lookahead on
//! the mnemonic's [`octo16::Shape`] resolves every operand alternative, so
//! the grammar needs no backtracking.

use octo16::{Mnemonic, Shape};

use crate::ast::{Operand, Statement, StatementKind};
use crate::error::{ParseError, RangeError};
use crate::lexer::{Directive, Token, TokenKind};

pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>, ParseErr> {
    Parser { tokens, pos: 0 }.program()
}

#[derive(Clone, Debug)]
pub enum ParseErr {
    Parse(ParseError),
    Range(RangeError),
}

impl From<ParseError> for ParseErr {
    fn from(e: ParseError) -> Self {
        ParseErr::Parse(e)
    }
}

impl From<RangeError> for ParseErr {
    fn from(e: RangeError) -> Self {
        ParseErr::Range(e)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        ParseError {
            found: if token.lexeme.is_empty() {
                "<eof>".to_string()
            } else {
                token.lexeme.clone()
            },
            line: token.line,
            column: token.column,
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseErr> {
        let token = self.advance();
        if token.kind == TokenKind::Newline {
            Ok(())
        } else {
            Err(self.unexpected(&token).into())
        }
    }

    fn program(&mut self) -> Result<Vec<Statement>, ParseErr> {
        let mut statements = Vec::new();
        while self.pos < self.tokens.len() - 1 {
            if self.peek().kind == TokenKind::Newline {
                self.advance();
                continue;
            }
            let line = self.peek().line;

            // A label may be followed by an instruction on the same line
            // (`loop: add r1, r2`), so consume as many as appear before
            // falling through to the rest of the statement grammar. A label
            // whose text happens to match a mnemonic keyword (`sub:`) is
            // still a label: the colon disambiguates it.
            while matches!(
                self.peek().kind.clone(),
                TokenKind::Identifier(_) | TokenKind::Mnemonic(_)
            ) && matches!(self.peek2().map(|t| &t.kind), Some(TokenKind::Colon))
            {
                let name = self.peek().lexeme.clone();
                self.advance();
                self.advance();
                statements.push(Statement {
                    kind: StatementKind::Label(name),
                    line,
                });
            }
            if self.peek().kind == TokenKind::Newline {
                self.advance();
                continue;
            }

            let kind = self.statement()?;
            self.expect_newline()?;
            statements.push(Statement { kind, line });
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<StatementKind, ParseErr> {
        match self.peek().kind.clone() {
            TokenKind::Identifier(name) => {
                if matches!(
                    self.peek2().map(|t| &t.kind),
                    Some(TokenKind::Directive(Directive::Equ))
                ) {
                    self.advance();
                    self.advance();
                    let value = self.word()?;
                    Ok(StatementKind::Equ(name, value))
                } else {
                    let token = self.advance();
                    Err(self.unexpected(&token).into())
                }
            }
            TokenKind::Mnemonic(m) => self.instruction(m),
            TokenKind::Directive(Directive::DefB) => self.defb(),
            TokenKind::Directive(Directive::DefN) => self.defn(),
            _ => {
                let token = self.advance();
                Err(self.unexpected(&token).into())
            }
        }
    }

    fn instruction(&mut self, mnemonic: Mnemonic) -> Result<StatementKind, ParseErr> {
        self.advance();
        let operands = match mnemonic.shape() {
            Shape::None => Vec::new(),
            Shape::AluBinary | Shape::Move => {
                let dest = self.register()?;
                self.comma()?;
                let src = self.register_or_word_or_ident()?;
                vec![Operand::Register(dest), src]
            }
            Shape::AluUnary => {
                let dest = self.register()?;
                vec![Operand::Register(dest)]
            }
            Shape::Load => {
                let dest = self.register()?;
                self.comma()?;
                let addr = self.word_or_ident_or_indirect()?;
                vec![Operand::Register(dest), addr]
            }
            Shape::Store => {
                let addr = self.word_or_ident_or_indirect()?;
                self.comma()?;
                let src = self.register()?;
                vec![addr, Operand::Register(src)]
            }
            Shape::BranchTarget | Shape::CallTarget => {
                vec![self.word_or_ident_or_indirect()?]
            }
        };
        Ok(StatementKind::Instruction(mnemonic, operands))
    }

    fn defb(&mut self) -> Result<StatementKind, ParseErr> {
        self.advance();
        let mut bytes = vec![self.byte()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            bytes.push(self.byte()?);
        }
        Ok(StatementKind::DefB(bytes))
    }

    fn defn(&mut self) -> Result<StatementKind, ParseErr> {
        self.advance();
        let value = self.byte()?;
        self.comma()?;
        let count = self.word()?;
        Ok(StatementKind::DefN(value, count))
    }

    fn comma(&mut self) -> Result<(), ParseErr> {
        let token = self.advance();
        if token.kind == TokenKind::Comma {
            Ok(())
        } else {
            Err(self.unexpected(&token).into())
        }
    }

    fn register(&mut self) -> Result<u8, ParseErr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Register(idx) => Ok(idx),
            _ => Err(self.unexpected(&token).into()),
        }
    }

    fn register_or_word_or_ident(&mut self) -> Result<Operand, ParseErr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Register(idx) => Ok(Operand::Register(idx)),
            TokenKind::Number(n) => Ok(Operand::Word(checked_width(n.value, 16, &token)?)),
            TokenKind::Identifier(name) => Ok(Operand::Identifier(name)),
            // A label reference can lex as a mnemonic keyword (`sub`) when
            // the label's name shadows one; only a label name is legal here
            // once the register/number alternatives are ruled out.
            TokenKind::Mnemonic(_) => Ok(Operand::Identifier(token.lexeme.clone())),
            _ => Err(self.unexpected(&token).into()),
        }
    }

    fn word_or_ident_or_indirect(&mut self) -> Result<Operand, ParseErr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Operand::Word(checked_width(n.value, 16, &token)?)),
            TokenKind::Identifier(name) => Ok(Operand::Identifier(name)),
            TokenKind::IndirectRegister(idx) => Ok(Operand::IndirectRegister(idx)),
            TokenKind::Mnemonic(_) => Ok(Operand::Identifier(token.lexeme.clone())),
            _ => Err(self.unexpected(&token).into()),
        }
    }

    fn byte(&mut self) -> Result<u8, ParseErr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(checked_width(n.value, 8, &token)? as u8),
            _ => Err(self.unexpected(&token).into()),
        }
    }

    fn word(&mut self) -> Result<u16, ParseErr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => checked_width(n.value, 16, &token),
            _ => Err(self.unexpected(&token).into()),
        }
    }
}

fn checked_width(value: u32, width: u32, token: &Token) -> Result<u16, ParseErr> {
    let max = if width == 8 { 0xFF } else { 0xFFFF };
    if value > max {
        return Err(RangeError {
            value,
            width,
            line: token.line,
            column: token.column,
        }
        .into());
    }
    Ok(value as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(src: &str) -> Vec<Statement> {
        parse(&lex(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_alu_binary() {
        let stmts = parse_source("add r1, r2\n");
        assert_eq!(
            stmts[0].kind,
            StatementKind::Instruction(
                Mnemonic::ADD,
                vec![Operand::Register(1), Operand::Register(2)]
            )
        );
    }

    #[test]
    fn parses_label_and_equ() {
        let stmts = parse_source("foo equ 0x00AA\nloop:\nbra loop\n");
        assert_eq!(
            stmts[0].kind,
            StatementKind::Equ("foo".to_string(), 0x00AA)
        );
        assert_eq!(stmts[1].kind, StatementKind::Label("loop".to_string()));
    }

    #[test]
    fn parses_store_operand_order() {
        let stmts = parse_source("stw @r1, r2\n");
        assert_eq!(
            stmts[0].kind,
            StatementKind::Instruction(
                Mnemonic::STW,
                vec![Operand::IndirectRegister(1), Operand::Register(2)]
            )
        );
    }

    #[test]
    fn rejects_out_of_range_word() {
        let err = parse(&lex("mov r0, 0x10000\n").unwrap()).unwrap_err();
        assert!(matches!(err, ParseErr::Range(_)));
    }

    #[test]
    fn rejects_unexpected_token() {
        assert!(parse(&lex("add r1, :\n").unwrap()).is_err());
    }
}
