//! Hand-written lexer for the VarAction2 expression language.
//!
//! Spaces and tabs are discarded; newlines are significant because one
//! statement spans exactly one line.
//
//  Lexical items:
//
//      Name     ::= [A-Za-z_][A-Za-z0-9_]*
//      Number   ::= [0-9]+           (decimal, fits in i64 before range checks)
//      Symbols  ::= + - * & | ^ << >> = , ( ) [ ]
//      Newline  ::= '\n'+            (statement separator, emitted as a token)

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number(i64),
    Newline,
    Add,
    Sub,
    Mul,
    BinAnd,
    BinOr,
    BinXor,
    Shl,
    Shr,
    Assign,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            finished: false,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self, first: char) -> String {
        let mut id = String::new();
        id.push(first);
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_', &mut id);
        id
    }

    fn read_number(&mut self, first: char) -> Result<i64, String> {
        let mut num = String::new();
        num.push(first);
        self.consume_while(|c| c.is_ascii_digit(), &mut num);
        num.parse::<i64>()
            .map_err(|_| format!("number too large: {num}"))
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            line: self.line,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some(&c) = self.chars.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.chars.next();
            } else {
                break;
            }
        }

        let ch = match self.chars.next() {
            Some(c) => c,
            None => {
                self.finished = true;
                return Some(Ok(self.token(TokenKind::Eof)));
            }
        };

        let res = match ch {
            '\n' => {
                let tok = self.token(TokenKind::Newline);
                self.line += 1;
                while self.peek_char() == Some('\n') {
                    self.chars.next();
                    self.line += 1;
                }
                Ok(tok)
            }
            '+' => Ok(self.token(TokenKind::Add)),
            '-' => Ok(self.token(TokenKind::Sub)),
            '*' => Ok(self.token(TokenKind::Mul)),
            '&' => Ok(self.token(TokenKind::BinAnd)),
            '|' => Ok(self.token(TokenKind::BinOr)),
            '^' => Ok(self.token(TokenKind::BinXor)),
            '=' => Ok(self.token(TokenKind::Assign)),
            ',' => Ok(self.token(TokenKind::Comma)),
            '(' => Ok(self.token(TokenKind::LParen)),
            ')' => Ok(self.token(TokenKind::RParen)),
            '[' => Ok(self.token(TokenKind::LBracket)),
            ']' => Ok(self.token(TokenKind::RBracket)),
            '<' => {
                if self.peek_char() == Some('<') {
                    self.chars.next();
                    Ok(self.token(TokenKind::Shl))
                } else {
                    Err(format!("unexpected character `<` at line {}", self.line))
                }
            }
            '>' => {
                if self.peek_char() == Some('>') {
                    self.chars.next();
                    Ok(self.token(TokenKind::Shr))
                } else {
                    Err(format!("unexpected character `>` at line {}", self.line))
                }
            }
            c if c.is_ascii_digit() => self
                .read_number(c)
                .map(|n| self.token(TokenKind::Number(n))),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.read_name(c);
                Ok(self.token(TokenKind::Name(name)))
            }
            c => Err(format!("unexpected character `{c}` at line {}", self.line)),
        };

        Some(res)
    }
}
