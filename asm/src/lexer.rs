//! Hand-written lexer (§4.2). Strips `;` comments, tracks line/column for
//! diagnostics, and tags mnemonics/directives as keywords ahead of the
//! generic identifier rule.

use octo16::Mnemonic;

use crate::error::LexError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Base {
    Binary,
    Octal,
    Hex,
    Decimal,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NumberLit {
    pub value: u32,
    pub base: Base,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Directive {
    Equ,
    DefB,
    DefN,
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    Mnemonic(Mnemonic),
    Directive(Directive),
    Register(u8),
    IndirectRegister(u8),
    Number(NumberLit),
    Identifier(String),
    Comma,
    Colon,
    Newline,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: u32,
    column: u32,
}

pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(&(start, ch)) = self.chars.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                ';' => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '\n' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        lexeme: "\n".to_string(),
                        line: self.line - 1,
                        column: self.column,
                    });
                }
                ',' => {
                    self.advance();
                    tokens.push(self.simple(TokenKind::Comma, ","));
                }
                ':' => {
                    self.advance();
                    tokens.push(self.simple(TokenKind::Colon, ":"));
                }
                '@' => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    let ident = self.take_word();
                    let idx = parse_register(&ident).ok_or_else(|| LexError {
                        lexeme: format!("@{}", ident),
                        line,
                        column,
                    })?;
                    tokens.push(Token {
                        kind: TokenKind::IndirectRegister(idx),
                        lexeme: format!("@{}", ident),
                        line,
                        column,
                    });
                }
                c if c.is_ascii_digit() => {
                    tokens.push(self.take_number()?);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    tokens.push(self.take_word_token());
                }
                _ => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    return Err(LexError {
                        lexeme: ch.to_string(),
                        line,
                        column,
                    });
                }
            }
            let _ = start;
        }
        tokens.push(Token {
            kind: TokenKind::Newline,
            lexeme: String::new(),
            line: self.line,
            column: self.column,
        });
        Ok(tokens)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn simple(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            line: self.line,
            column: self.column - 1,
        }
    }

    fn take_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn take_word_token(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let word = self.take_word();
        let kind = match word.as_str() {
            "equ" => TokenKind::Directive(Directive::Equ),
            "defb" => TokenKind::Directive(Directive::DefB),
            "defn" => TokenKind::Directive(Directive::DefN),
            _ => {
                if let Some(idx) = parse_register(&word) {
                    TokenKind::Register(idx)
                } else if let Some(m) = Mnemonic::from_keyword(&word) {
                    TokenKind::Mnemonic(m)
                } else {
                    TokenKind::Identifier(word.clone())
                }
            }
        };
        Token {
            kind,
            lexeme: word,
            line,
            column,
        }
    }

    fn take_number(&mut self) -> Result<Token, LexError> {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();
        let (base, digits_start) = if self.peek_is('0') {
            let checkpoint = self.chars.clone();
            lexeme.push(self.advance().unwrap());
            match self.chars.peek().map(|&(_, c)| c) {
                Some('b') => {
                    lexeme.push(self.advance().unwrap());
                    (Base::Binary, lexeme.len())
                }
                Some('o') => {
                    lexeme.push(self.advance().unwrap());
                    (Base::Octal, lexeme.len())
                }
                Some('x') => {
                    lexeme.push(self.advance().unwrap());
                    (Base::Hex, lexeme.len())
                }
                _ => {
                    self.chars = checkpoint;
                    lexeme.clear();
                    (Base::Decimal, 0)
                }
            }
        } else {
            (Base::Decimal, 0)
        };

        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let digits = &lexeme[digits_start..];
        let radix = match base {
            Base::Binary => 2,
            Base::Octal => 8,
            Base::Hex => 16,
            Base::Decimal => 10,
        };
        let value = u32::from_str_radix(digits, radix).map_err(|_| LexError {
            lexeme: lexeme.clone(),
            line,
            column,
        })?;

        Ok(Token {
            kind: TokenKind::Number(NumberLit { value, base }),
            lexeme,
            line,
            column,
        })
    }

    fn peek_is(&mut self, expected: char) -> bool {
        matches!(self.chars.peek(), Some(&(_, c)) if c == expected)
    }
}

fn parse_register(word: &str) -> Option<u8> {
    let rest = word.strip_prefix('r')?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let idx: u8 = rest.parse().ok()?;
    if idx <= 15 {
        Some(idx)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Newline)
            .collect()
    }

    #[test]
    fn lexes_add_instruction() {
        assert_eq!(
            kinds("add r1, r2"),
            vec![
                TokenKind::Mnemonic(Mnemonic::ADD),
                TokenKind::Register(1),
                TokenKind::Comma,
                TokenKind::Register(2),
            ]
        );
    }

    #[test]
    fn lexes_hex_and_indirect_register() {
        assert_eq!(
            kinds("ldw r3, @r4"),
            vec![
                TokenKind::Mnemonic(Mnemonic::LDW),
                TokenKind::Register(3),
                TokenKind::Comma,
                TokenKind::IndirectRegister(4),
            ]
        );
        assert_eq!(
            kinds("mov r0, 0x1234"),
            vec![
                TokenKind::Mnemonic(Mnemonic::MOV),
                TokenKind::Register(0),
                TokenKind::Comma,
                TokenKind::Number(NumberLit {
                    value: 0x1234,
                    base: Base::Hex
                }),
            ]
        );
    }

    #[test]
    fn strips_comments() {
        assert_eq!(kinds("nop ; a comment\n"), vec![TokenKind::Mnemonic(Mnemonic::NOP)]);
    }

    #[test]
    fn rejects_unrecognizable_lexeme() {
        assert!(lex("add r1, #").is_err());
    }

    #[test]
    fn identifiers_take_precedence_after_keywords() {
        assert_eq!(
            kinds("loop: bra loop"),
            vec![
                TokenKind::Identifier("loop".to_string()),
                TokenKind::Colon,
                TokenKind::Mnemonic(Mnemonic::BRA),
                TokenKind::Identifier("loop".to_string()),
            ]
        );
    }
}
