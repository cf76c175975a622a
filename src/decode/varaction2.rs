//! Rebuilds expression trees from compiled VarAction2 chains.
//!
//! The chain is linear, so reconstruction folds left: each operator byte
//! combines the tree so far with the next operand leaf. Chain-restart
//! operators split the chain back into separate statements. Spilled
//! subexpressions come back as the explicit register stores the compiler
//! emitted; no attempt is made to undo the spilling.

use anyhow::{Result, bail};

use super::reader::Reader;
use crate::actions::{Action, Feature, GroupRef, Range};
use crate::expr::{Node, Op, compiler, vars};

/// Operand width of a variational record, taken from its kind byte. The
/// and-mask, the divide/modulo values and the range bounds are all stored
/// at this width; the encoder only ever emits the dword form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    Byte,
    Word,
    Dword,
}

impl OperandWidth {
    fn read(self, r: &mut Reader) -> Result<u32> {
        Ok(match self {
            OperandWidth::Byte => r.byte()? as u32,
            OperandWidth::Word => r.word()? as u32,
            OperandWidth::Dword => r.dword()?,
        })
    }

    fn full_mask(self) -> u32 {
        match self {
            OperandWidth::Byte => 0xFF,
            OperandWidth::Word => 0xFFFF,
            OperandWidth::Dword => u32::MAX,
        }
    }
}

/// Decode one full variational record body (everything after the
/// `[0x02, feature, set_id, kind]` header).
pub fn decode_record(
    feature: Feature,
    set_id: u8,
    related: bool,
    width: OperandWidth,
    r: &mut Reader,
) -> Result<Action> {
    let code = decode_chain(r, width)?;
    let nranges = r.byte()?;
    let mut ranges = Vec::with_capacity(nranges as usize);
    for _ in 0..nranges {
        let target = GroupRef::from_wire(r.word()?);
        let low = width.read(r)?;
        let high = width.read(r)?;
        ranges.push(Range { low, high, target });
    }
    let default = GroupRef::from_wire(r.word()?);
    Ok(Action::VarAction2 {
        feature,
        set_id,
        related,
        code,
        ranges,
        default,
    })
}

/// Decode an instruction chain into one tree per statement.
pub fn decode_chain(r: &mut Reader, width: OperandWidth) -> Result<Vec<Node>> {
    let mut statements = Vec::new();
    let (first, mut more) = adjust(r, width)?;
    let mut current = first;
    while more {
        let code = r.byte()?;
        let op = match Op::from_code(code) {
            Some(op) => op,
            None => bail!("unknown operator {code:#04x} at offset {}", r.pos() - 1),
        };
        let (leaf, cont) = adjust(r, width)?;
        more = cont;
        if op == Op::Rst {
            statements.push(current);
            current = leaf;
        } else {
            current = Node::op(op, current, leaf);
        }
    }
    statements.push(current);
    Ok(statements)
}

/// One operand: variable id, optional parameter, shift byte, and-mask, and
/// for non-zero adjust types the add and divide/modulo values. Returns the
/// leaf and whether the chain continues.
fn adjust(r: &mut Reader, width: OperandWidth) -> Result<(Node, bool)> {
    let var = r.byte()?;
    let param = if (0x60..0x80).contains(&var) {
        r.byte()?
    } else {
        0
    };
    let shift_byte = r.byte()?;
    let more = shift_byte & compiler::FLAG_MORE != 0;
    let shift = shift_byte & 0x1F;
    let and_mask = width.read(r)?;
    let adjust_type = shift_byte >> 6;
    if adjust_type != 0 {
        // Divide or modulo post-processing; no named form exists, so the
        // operand is kept verbatim.
        let add = width.read(r)?;
        let divmod = width.read(r)?;
        let node = Node::Adjusted {
            var,
            param,
            shift,
            and_mask,
            adjust_type,
            add,
            divmod,
        };
        return Ok((node, more));
    }

    let full = width.full_mask();
    let node = match var {
        compiler::VAR_CONSTANT if shift == 0 => Node::Value(and_mask as i32),
        compiler::VAR_TEMP if shift == 0 && and_mask == full => Node::Temp(param),
        compiler::VAR_PERM if shift == 0 && and_mask == full => Node::Perm(param),
        compiler::VAR_CALL if shift == 0 && and_mask == full => Node::Call(param),
        _ => match vars::reverse_lookup(var, param, shift, and_mask) {
            Some(name) => Node::Var(name.into()),
            None => Node::RawVar {
                var,
                param,
                shift,
                and_mask,
            },
        },
    };
    Ok((node, more))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_code;

    fn round_trip(src: &str) -> Vec<Node> {
        let roots = parse_code(src).expect("parse ok");
        let code = compiler::compile_chain(&roots).expect("compile ok");
        let mut r = Reader::new(&code);
        let back = decode_chain(&mut r, OperandWidth::Dword).expect("decode ok");
        assert!(r.at_end(), "chain not fully consumed");
        back
    }

    #[test]
    fn test_single_variable() {
        let back = round_trip("tile_slope");
        assert_eq!(back, vec![Node::Var("tile_slope".into())]);
    }

    #[test]
    fn test_statements_split_at_restart() {
        let back = round_trip("TEMP[0] = tile_slope\nTEMP[0] + 1");
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].to_string(), "TEMP[0] = tile_slope");
        assert_eq!(back[1].to_string(), "TEMP[0] + 1");
    }

    #[test]
    fn test_spill_comes_back_as_explicit_store() {
        // owner * (tile_slope + 2) compiles through a scratch register; the
        // decoded text shows that register instead of the nested form.
        let back = round_trip("owner * (tile_slope + 2)");
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].to_string(), "TEMP[128] = tile_slope + 2");
        assert_eq!(back[1].to_string(), "owner * TEMP[128]");
    }

    #[test]
    fn test_unmappable_read_becomes_raw_var() {
        // Var 0x5F is not in the name table.
        let code = [0x5F, 0x04, 0x0F, 0x00, 0x00, 0x00];
        let mut r = Reader::new(&code);
        let back = decode_chain(&mut r, OperandWidth::Dword).unwrap();
        assert_eq!(
            back,
            vec![Node::RawVar {
                var: 0x5F,
                param: 0,
                shift: 4,
                and_mask: 0x0F,
            }]
        );
    }

    #[test]
    fn test_divmod_adjust_decodes_verbatim() {
        // Shift byte 0x40 selects adjust type 1; add and divisor follow the
        // and-mask at operand width.
        let code = [
            0x1A, 0x40, 0x0F, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00,
        ];
        let mut r = Reader::new(&code);
        let back = decode_chain(&mut r, OperandWidth::Dword).unwrap();
        assert!(r.at_end(), "chain not fully consumed");
        assert_eq!(
            back,
            vec![Node::Adjusted {
                var: 0x1A,
                param: 0,
                shift: 0,
                and_mask: 0x0F,
                adjust_type: 1,
                add: 3,
                divmod: 7,
            }]
        );
    }

    #[test]
    fn test_word_width_record() {
        // Kind 0x85 body: constant operand, one range, all values stored as
        // words instead of dwords.
        let body = [
            0x1A, 0x00, 0x34, 0x12, // constant 0x1234, chain ends
            0x01, // one range
            0x05, 0x00, 0x00, 0x00, 0x0A, 0x00, // group 5 for 0..=10
            0x02, 0x00, // default group 2
        ];
        let mut r = Reader::new(&body);
        let back = decode_record(Feature::Train, 3, false, OperandWidth::Word, &mut r).unwrap();
        assert!(r.at_end());
        assert_eq!(
            back,
            Action::VarAction2 {
                feature: Feature::Train,
                set_id: 3,
                related: false,
                code: vec![Node::Value(0x1234)],
                ranges: vec![Range {
                    low: 0,
                    high: 10,
                    target: GroupRef::Group(5),
                }],
                default: GroupRef::Group(2),
            }
        );
    }

    #[test]
    fn test_full_record_round_trip() {
        let action = Action::VarAction2 {
            feature: Feature::Object,
            set_id: 5,
            related: true,
            code: parse_code("min(tile_slope, 1)").unwrap(),
            ranges: vec![Range {
                low: 1,
                high: 1,
                target: GroupRef::Group(2),
            }],
            default: GroupRef::Callback(0x10),
        };
        let bytes = action.encode().unwrap();
        assert_eq!(&bytes[..4], &[0x02, 0x0F, 5, 0x8A]);
        let mut r = Reader::new(&bytes[4..]);
        let back = decode_record(Feature::Object, 5, true, OperandWidth::Dword, &mut r).unwrap();
        assert!(r.at_end());
        assert_eq!(back, action);
    }
}
