//! Parser that consumes the lexer and builds expression trees.
//!
//! One statement per line, each either a bare expression or an assignment
//! `TEMP[n] = expr` / `PERM[n] = expr`. Binary-operator precedence, lowest
//! first: `<< >>`, `|`, `^`, `&`, `+ -`, `*`. Unary minus applies to numeric
//! literals and binds tighter than any binary operator.

use anyhow::{Result, anyhow, bail};

use super::lexer::{Lexer, Token, TokenKind};
use super::{Node, Op};

/// Parse a whole program into one AST root per statement.
pub fn parse_code(src: &str) -> Result<Vec<Node>> {
    let mut parser = Parser::new(src)?;
    parser.parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Result<Self> {
        let tokens: Result<Vec<_>, String> = Lexer::new(src).collect();
        let tokens = tokens.map_err(|e| anyhow!("lex: {e}"))?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn next(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn unexpected(&self) -> anyhow::Error {
        anyhow!(
            "syntax error at `{:?}` line {}",
            self.tokens[self.pos].kind,
            self.line()
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if *self.peek() == kind {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse(&mut self) -> Result<Vec<Node>> {
        let mut roots = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.next();
                }
                _ => {
                    roots.push(self.parse_statement()?);
                    match self.peek() {
                        TokenKind::Newline => {
                            self.next();
                        }
                        TokenKind::Eof => {}
                        _ => return Err(self.unexpected()),
                    }
                }
            }
        }
        Ok(roots)
    }

    fn parse_statement(&mut self) -> Result<Node> {
        let expr = self.parse_expr(0)?;
        if *self.peek() != TokenKind::Assign {
            return Ok(expr);
        }
        // Assignment target must be a plain storage read.
        let line = self.line();
        self.next();
        let rhs = self.parse_expr(0)?;
        match expr {
            Node::Temp(register) => Ok(rhs.store_temp(register)),
            Node::Perm(register) => Ok(rhs.store_perm(register)),
            other => bail!("invalid assignment target `{other}` at line {line}"),
        }
    }

    /// Precedence climbing; `min_level` is the lowest binding level accepted.
    fn parse_expr(&mut self, min_level: u8) -> Result<Node> {
        let mut lhs = self.parse_primary()?;
        loop {
            let (op, level) = match self.peek() {
                TokenKind::Shl => (Op::Shl, 1),
                TokenKind::Shr => (Op::Shr, 1),
                TokenKind::BinOr => (Op::Or, 2),
                TokenKind::BinXor => (Op::Xor, 3),
                TokenKind::BinAnd => (Op::And, 4),
                TokenKind::Add => (Op::Add, 5),
                TokenKind::Sub => (Op::Sub, 5),
                TokenKind::Mul => (Op::Mul, 6),
                _ => break,
            };
            if level < min_level {
                break;
            }
            self.next();
            // Left associative: the right side only accepts tighter levels.
            let rhs = self.parse_expr(level + 1)?;
            lhs = Node::op(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.next() {
            TokenKind::Number(n) => self.literal(n),
            TokenKind::Sub => match self.next() {
                TokenKind::Number(n) => self.literal(-n),
                _ => {
                    self.pos -= 1;
                    Err(self.unexpected())
                }
            },
            TokenKind::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Name(name) => match self.peek() {
                TokenKind::LParen => self.parse_call(&name),
                TokenKind::LBracket => self.parse_storage(&name),
                _ => Ok(Node::Var(name)),
            },
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    fn literal(&self, n: i64) -> Result<Node> {
        if n < i32::MIN as i64 || n > u32::MAX as i64 {
            bail!("literal {n} out of 32-bit range at line {}", self.line());
        }
        Ok(Node::Value(n as i32))
    }

    /// `call(N)` or a named two-argument operator.
    fn parse_call(&mut self, name: &str) -> Result<Node> {
        let line = self.line();
        self.expect(TokenKind::LParen)?;
        if name == "call" {
            let sub = match self.next() {
                TokenKind::Number(n) if (0..256).contains(&n) => n as u8,
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
            };
            self.expect(TokenKind::RParen)?;
            return Ok(Node::Call(sub));
        }

        let op = match name {
            "min" => Op::Min,
            "max" => Op::Max,
            "minu" => Op::MinU,
            "maxu" => Op::MaxU,
            "rot" => Op::Rot,
            "cmp" => Op::Cmp,
            "cmpu" => Op::CmpU,
            _ => bail!("unknown function `{name}` at line {line}"),
        };
        let a = self.parse_expr(0)?;
        self.expect(TokenKind::Comma)?;
        let b = self.parse_expr(0)?;
        self.expect(TokenKind::RParen)?;
        Ok(Node::op(op, a, b))
    }

    /// `TEMP[n]` / `PERM[n]` storage reads.
    fn parse_storage(&mut self, name: &str) -> Result<Node> {
        let line = self.line();
        self.expect(TokenKind::LBracket)?;
        let register = match self.next() {
            TokenKind::Number(n) if (0..256).contains(&n) => n as u8,
            _ => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
        };
        self.expect(TokenKind::RBracket)?;
        match name {
            "TEMP" => Ok(Node::Temp(register)),
            "PERM" => Ok(Node::Perm(register)),
            _ => bail!("unknown storage `{name}` at line {line}"),
        }
    }
}
