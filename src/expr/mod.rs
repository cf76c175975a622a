//! VarAction2 expression AST.
//!
//! A `Node` is an immutable expression tree built either directly or by the
//! parser in `expr::parser`. The compiler in `expr::compiler` lowers a tree
//! into the two-operand instruction chain embedded in Action-2 records, and
//! `decode::varaction2` rebuilds trees from compiled chains.

pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod vars;

use std::fmt;

use serde::Serialize;

/// VarAction2 operator bytes as consumed by the game engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Op {
    Add,
    Sub,
    Min,
    Max,
    MinU,
    MaxU,
    Mul,
    And,
    Or,
    Xor,
    /// Store into temporary register b, result is a.
    StoreTemp,
    /// Chain restart: discard a, continue with b.
    Rst,
    /// Store into persistent register b, result is a.
    StorePerm,
    Rot,
    Cmp,
    CmpU,
    Shl,
    ShrU,
    Shr,
}

impl Op {
    pub fn code(self) -> u8 {
        match self {
            Op::Add => 0x00,
            Op::Sub => 0x01,
            Op::Min => 0x02,
            Op::Max => 0x03,
            Op::MinU => 0x04,
            Op::MaxU => 0x05,
            Op::Mul => 0x0A,
            Op::And => 0x0B,
            Op::Or => 0x0C,
            Op::Xor => 0x0D,
            Op::StoreTemp => 0x0E,
            Op::Rst => 0x0F,
            Op::StorePerm => 0x10,
            Op::Rot => 0x11,
            Op::Cmp => 0x12,
            Op::CmpU => 0x13,
            Op::Shl => 0x14,
            Op::ShrU => 0x15,
            Op::Shr => 0x16,
        }
    }

    pub fn from_code(code: u8) -> Option<Op> {
        Some(match code {
            0x00 => Op::Add,
            0x01 => Op::Sub,
            0x02 => Op::Min,
            0x03 => Op::Max,
            0x04 => Op::MinU,
            0x05 => Op::MaxU,
            0x0A => Op::Mul,
            0x0B => Op::And,
            0x0C => Op::Or,
            0x0D => Op::Xor,
            0x0E => Op::StoreTemp,
            0x0F => Op::Rst,
            0x10 => Op::StorePerm,
            0x11 => Op::Rot,
            0x12 => Op::Cmp,
            0x13 => Op::CmpU,
            0x14 => Op::Shl,
            0x15 => Op::ShrU,
            0x16 => Op::Shr,
            _ => return None,
        })
    }

    /// Display priority; higher binds tighter.
    fn priority(self) -> u8 {
        match self {
            Op::Rst => 1,
            Op::StoreTemp | Op::StorePerm => 2,
            Op::And | Op::Or | Op::Xor | Op::Shl | Op::ShrU | Op::Shr => 4,
            Op::Add | Op::Sub => 5,
            Op::Mul => 6,
            Op::Min | Op::Max | Op::MinU | Op::MaxU | Op::Rot | Op::Cmp | Op::CmpU => 7,
        }
    }

    /// Whether the right operand needs parentheses at equal priority
    /// (non-commutative infix forms).
    fn brackets_rhs(self) -> bool {
        matches!(
            self,
            Op::Sub
                | Op::And
                | Op::Or
                | Op::Xor
                | Op::StoreTemp
                | Op::StorePerm
                | Op::Shl
                | Op::ShrU
                | Op::Shr
        )
    }

    fn render(self, a: &str, b: &str) -> String {
        match self {
            Op::Add => format!("{a} + {b}"),
            Op::Sub => format!("{a} - {b}"),
            Op::Min => format!("min({a}, {b})"),
            Op::Max => format!("max({a}, {b})"),
            Op::MinU => format!("minu({a}, {b})"),
            Op::MaxU => format!("maxu({a}, {b})"),
            Op::Mul => format!("{a} * {b}"),
            Op::And => format!("{a} & {b}"),
            Op::Or => format!("{a} | {b}"),
            Op::Xor => format!("{a} ^ {b}"),
            Op::StoreTemp => format!("TEMP[{b}] = {a}"),
            Op::Rst => format!("{a}; {b}"),
            Op::StorePerm => format!("PERM[{b}] = {a}"),
            Op::Rot => format!("rot({a}, {b})"),
            Op::Cmp => format!("cmp({a}, {b})"),
            Op::CmpU => format!("cmpu({a}, {b})"),
            Op::Shl => format!("{a} << {b}"),
            Op::ShrU => format!("{a} u>> {b}"),
            Op::Shr => format!("{a} >> {b}"),
        }
    }
}

/// One expression tree node. Each node exclusively owns its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// 32-bit literal.
    Value(i32),
    /// Named global or tile variable, resolved through `vars::lookup`.
    Var(String),
    /// Raw variable read the decoder could not map back to a name.
    RawVar {
        var: u8,
        param: u8,
        shift: u8,
        and_mask: u32,
    },
    /// Variable read with a divide (type 1) or modulo (type 2) adjustment.
    /// Only the decoder produces this; the language has no form for it.
    Adjusted {
        var: u8,
        param: u8,
        shift: u8,
        and_mask: u32,
        adjust_type: u8,
        add: u32,
        divmod: u32,
    },
    /// Temporary (session-scoped) register read.
    Temp(u8),
    /// Persistent register read.
    Perm(u8),
    /// Subroutine call into another Action-2 chain.
    Call(u8),
    /// Binary operation.
    Expr { op: Op, a: Box<Node>, b: Box<Node> },
}

impl Node {
    pub fn op(op: Op, a: Node, b: Node) -> Node {
        Node::Expr {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn store_temp(self, register: u8) -> Node {
        Node::op(Op::StoreTemp, self, Node::Value(register as i32))
    }

    pub fn store_perm(self, register: u8) -> Node {
        Node::op(Op::StorePerm, self, Node::Value(register as i32))
    }

    fn format(&self, parent_priority: u8) -> String {
        match self {
            Node::Value(v) => v.to_string(),
            Node::Var(name) => name.clone(),
            Node::RawVar {
                var,
                param,
                shift,
                and_mask,
            } => format!("var(0x{var:02x}, param={param}, shift={shift}, mask=0x{and_mask:08x})"),
            Node::Adjusted {
                var,
                param,
                shift,
                and_mask,
                adjust_type,
                add,
                divmod,
            } => {
                let op = if *adjust_type == 1 { "div" } else { "mod" };
                format!(
                    "var(0x{var:02x}, param={param}, shift={shift}, mask=0x{and_mask:08x}, \
                     add={add}, {op}={divmod})"
                )
            }
            Node::Temp(r) => format!("TEMP[{r}]"),
            Node::Perm(r) => format!("PERM[{r}]"),
            Node::Call(sub) => format!("call({sub})"),
            Node::Expr { op, a, b } => {
                let prio = op.priority();
                let ares = a.format(prio - 1);
                let bres = b.format(if op.brackets_rhs() { prio } else { prio - 1 });
                let res = op.render(&ares, &bres);
                if prio <= parent_priority {
                    format!("({res})")
                } else {
                    res
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_codes_round_trip() {
        for code in 0u8..=0x16 {
            if let Some(op) = Op::from_code(code) {
                assert_eq!(op.code(), code);
            }
        }
        assert_eq!(Op::from_code(0x17), None);
    }

    #[test]
    fn test_format_precedence() {
        let test_cases = vec![
            (
                Node::op(
                    Op::Mul,
                    Node::op(Op::Add, Node::Var("a".into()), Node::Var("b".into())),
                    Node::Var("c".into()),
                ),
                "(a + b) * c",
            ),
            (
                Node::op(
                    Op::Add,
                    Node::Var("a".into()),
                    Node::op(Op::Mul, Node::Var("b".into()), Node::Var("c".into())),
                ),
                "a + b * c",
            ),
            (
                Node::op(
                    Op::Sub,
                    Node::Var("a".into()),
                    Node::op(Op::Sub, Node::Var("b".into()), Node::Var("c".into())),
                ),
                "a - (b - c)",
            ),
            (
                Node::op(Op::Min, Node::Var("tile_slope".into()), Node::Value(1)).store_temp(132),
                "TEMP[132] = min(tile_slope, 1)",
            ),
            (
                Node::op(
                    Op::And,
                    Node::op(Op::Cmp, Node::Var("tile_slope".into()), Node::Value(30)),
                    Node::Value(1),
                ),
                "cmp(tile_slope, 30) & 1",
            ),
        ];

        for (node, expected) in test_cases {
            assert_eq!(node.to_string(), expected);
        }
    }
}
