//! Lowers expression trees into VarAction2 instruction chains.
//!
//! The target machine evaluates one binary instruction at a time: a left
//! operand accumulated so far, an operator byte, and one immediate-like right
//! operand (variable read, register read, constant or subroutine call). A
//! compound right operand therefore has to be evaluated first and spilled
//! into a scratch register, one register per nesting level, before the
//! enclosing operation reads it back.
//!
//! Every instruction carries a "continue chain" bit in its shift byte; the
//! final pass clears it on the last instruction to terminate the chain.

use anyhow::{Result, bail};

use super::vars;
use super::{Node, Op};

/// Variable id used for constant operands.
pub const VAR_CONSTANT: u8 = 0x1A;
/// Variable id reading persistent storage; the register is the parameter.
pub const VAR_PERM: u8 = 0x7C;
/// Variable id reading temporary storage; the register is the parameter.
pub const VAR_TEMP: u8 = 0x7D;
/// Variable id invoking a subroutine; the target is the parameter.
pub const VAR_CALL: u8 = 0x7E;
/// "More instructions follow" bit in the shift byte.
pub const FLAG_MORE: u8 = 0x20;
/// First scratch register used for spilling compound right operands.
pub const SPILL_BASE: u8 = 0x80;

impl Node {
    /// Compile one node.
    ///
    /// Returns `(is_immediate_like, bytes)`: immediate-like encodings are
    /// fixed-size operand fragments an enclosing binary op can chain onto
    /// directly; anything else is a full instruction sequence whose result
    /// must be spilled before use. `register` is the next free scratch
    /// register, handed down one deeper per spill level.
    pub fn compile(&self, register: u8, shift: u8, and_mask: u32) -> Result<(bool, Vec<u8>)> {
        assert!(shift < 0x20, "shift out of range: {shift}");
        match self {
            Node::Value(value) => {
                let adjusted = ((*value as u32) >> shift) & and_mask;
                let mut res = vec![VAR_CONSTANT, FLAG_MORE];
                res.extend(adjusted.to_le_bytes());
                Ok((true, res))
            }
            Node::Var(name) => {
                let def = match vars::lookup(name) {
                    Some(def) => def,
                    None => bail!("unknown variable `{name}`"),
                };
                let and_mask = and_mask & (vars::size_mask(def.size) >> shift);
                let shift = shift + def.start;
                assert!(shift < 0x20, "shift out of range for `{name}`: {shift}");
                let mut res = vec![def.var];
                if let Some(param) = def.param {
                    res.push(param);
                }
                res.push(FLAG_MORE | shift);
                res.extend(and_mask.to_le_bytes());
                Ok((true, res))
            }
            Node::RawVar {
                var,
                param,
                shift: var_shift,
                and_mask: var_mask,
            } => {
                // Re-emit a decoded raw operand verbatim.
                assert!(*var_shift < 0x20, "shift out of range: {var_shift}");
                let mut res = vec![*var];
                if (0x60..0x80).contains(var) {
                    res.push(*param);
                }
                res.push(FLAG_MORE | var_shift);
                res.extend(var_mask.to_le_bytes());
                Ok((true, res))
            }
            Node::Adjusted { var, .. } => {
                bail!("operand with divide/modulo adjustment on var {var:#04x} cannot be re-encoded")
            }
            Node::Temp(r) => Ok((true, operand(VAR_TEMP, *r, shift, and_mask))),
            Node::Perm(r) => Ok((true, operand(VAR_PERM, *r, shift, and_mask))),
            Node::Call(sub) => Ok((true, operand(VAR_CALL, *sub, shift, and_mask))),
            Node::Expr { op, a, b } => {
                let (b_immediate, b_code) = b.compile(register, shift, and_mask)?;
                if b_immediate {
                    // Direct two-term instruction: [left chain][op][operand].
                    let (_, a_code) = a.compile(register, shift, and_mask)?;
                    let mut res = a_code;
                    res.push(op.code());
                    res.extend(b_code);
                    return Ok((false, res));
                }

                // Compound right side: evaluate it first, spill into the
                // scratch register, restart the chain for the left side one
                // register deeper, then combine reading the spill back.
                let next = match register.checked_add(1) {
                    Some(next) => next,
                    None => bail!("expression too deep, out of scratch registers"),
                };
                let mut res = b_code;
                res.push(Op::StoreTemp.code());
                res.extend([VAR_CONSTANT, FLAG_MORE]);
                res.extend((register as u32).to_le_bytes());
                res.push(Op::Rst.code());
                res.extend(a.compile(next, shift, and_mask)?.1);
                res.extend([op.code(), VAR_TEMP, register, FLAG_MORE]);
                res.extend(u32::MAX.to_le_bytes());
                Ok((false, res))
            }
        }
    }
}

/// Register-style operand fragment: var id, parameter, shift byte, mask.
fn operand(var: u8, param: u8, shift: u8, and_mask: u32) -> Vec<u8> {
    let mut res = vec![var, param, FLAG_MORE | shift];
    res.extend(and_mask.to_le_bytes());
    res
}

/// Compile a sequence of top-level statements into one terminated chain.
///
/// Statements are joined by chain-restart markers; the result of the last
/// one is the chain's value.
pub fn compile_chain(roots: &[Node]) -> Result<Vec<u8>> {
    if roots.is_empty() {
        bail!("empty expression chain");
    }
    let mut code = Vec::new();
    for (i, root) in roots.iter().enumerate() {
        if i > 0 {
            code.push(Op::Rst.code());
        }
        code.extend(root.compile(SPILL_BASE, 0, u32::MAX)?.1);
    }
    // The shift byte of the last instruction sits in front of its 4-byte
    // mask; clearing the continue bit there ends the chain.
    let last = code.len() - 5;
    code[last] &= !FLAG_MORE;
    Ok(code)
}
