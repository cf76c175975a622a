//! Pseudo-sprite action records.
//!
//! The set of record kinds is fixed by the container format, so actions are
//! one closed tagged union rather than a trait hierarchy; `encode` pattern
//! matches exhaustively. Records that reference other records (VarAction2
//! chains, sprite-group maps) take already-constructed identifiers; no
//! forward-reference fixup happens here.

pub mod layout;
pub mod props;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::expr::{Node, compiler};
use layout::SpriteLayout;
use props::PropValue;

/// Feature categories addressed by actions 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Feature {
    Train,
    House,
    Global,
    IndustryTile,
    Industry,
    Cargo,
    Object,
    AirportTile,
}

impl Feature {
    pub fn code(self) -> u8 {
        match self {
            Feature::Train => 0x00,
            Feature::House => 0x07,
            Feature::Global => 0x08,
            Feature::IndustryTile => 0x09,
            Feature::Industry => 0x0A,
            Feature::Cargo => 0x0B,
            Feature::Object => 0x0F,
            Feature::AirportTile => 0x11,
        }
    }

    pub fn from_code(code: u8) -> Option<Feature> {
        Some(match code {
            0x00 => Feature::Train,
            0x07 => Feature::House,
            0x08 => Feature::Global,
            0x09 => Feature::IndustryTile,
            0x0A => Feature::Industry,
            0x0B => Feature::Cargo,
            0x0F => Feature::Object,
            0x11 => Feature::AirportTile,
            _ => return None,
        })
    }

    /// Features whose Action-2 records hold sprite layouts.
    pub fn has_layouts(self) -> bool {
        matches!(
            self,
            Feature::House | Feature::IndustryTile | Feature::Object | Feature::AirportTile
        )
    }
}

/// Target of a VarAction2 range or an Action-3 map: either another sprite
/// group or a literal callback result (bit 15 set on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupRef {
    Group(u16),
    Callback(u16),
}

impl GroupRef {
    pub fn wire(self) -> u16 {
        match self {
            GroupRef::Group(id) => id & 0x7FFF,
            GroupRef::Callback(value) => value | 0x8000,
        }
    }

    pub fn from_wire(word: u16) -> GroupRef {
        if word & 0x8000 != 0 {
            GroupRef::Callback(word & 0x7FFF)
        } else {
            GroupRef::Group(word)
        }
    }
}

/// One dispatch range of a VarAction2 record. Ranges are unsigned on the
/// wire; a range straddling the signed zero boundary must be split by the
/// caller into two unsigned ranges before it gets here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub low: u32,
    pub high: u32,
    pub target: GroupRef,
}

/// Parameter patch entry for Action 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamPatch {
    pub param: u8,
    pub size: u8,
    pub offset: u16,
}

/// Arithmetic performed on GRF parameters by Action D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamOperation {
    Assign,
    Add,
    Sub,
    MulU,
    MulS,
    ShiftU,
    ShiftS,
    And,
    Or,
    DivU,
    DivS,
    ModU,
    ModS,
}

impl ParamOperation {
    pub fn code(self) -> u8 {
        match self {
            ParamOperation::Assign => 0x00,
            ParamOperation::Add => 0x01,
            ParamOperation::Sub => 0x02,
            ParamOperation::MulU => 0x03,
            ParamOperation::MulS => 0x04,
            ParamOperation::ShiftU => 0x05,
            ParamOperation::ShiftS => 0x06,
            ParamOperation::And => 0x07,
            ParamOperation::Or => 0x08,
            ParamOperation::DivU => 0x09,
            ParamOperation::DivS => 0x0A,
            ParamOperation::ModU => 0x0B,
            ParamOperation::ModS => 0x0C,
        }
    }

    pub fn from_code(code: u8) -> Option<ParamOperation> {
        use ParamOperation::*;
        Some(match code {
            0x00 => Assign,
            0x01 => Add,
            0x02 => Sub,
            0x03 => MulU,
            0x04 => MulS,
            0x05 => ShiftU,
            0x06 => ShiftS,
            0x07 => And,
            0x08 => Or,
            0x09 => DivU,
            0x0A => DivS,
            0x0B => ModU,
            0x0C => ModS,
            _ => return None,
        })
    }
}

/// One node of the nested Action-14 metadata tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Chunk {
    Container { id: [u8; 4], children: Vec<Chunk> },
    Binary { id: [u8; 4], data: Vec<u8> },
    Text { id: [u8; 4], lang: u8, text: String },
}

impl Chunk {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Chunk::Container { id, children } => {
                out.push(b'C');
                out.extend_from_slice(id);
                for child in children {
                    child.encode(out);
                }
                out.push(0);
            }
            Chunk::Binary { id, data } => {
                out.push(b'B');
                out.extend_from_slice(id);
                out.extend((data.len() as u16).to_le_bytes());
                out.extend_from_slice(data);
            }
            Chunk::Text { id, lang, text } => {
                out.push(b'T');
                out.extend_from_slice(id);
                out.push(*lang);
                out.extend_from_slice(text.as_bytes());
                out.push(0);
            }
        }
    }
}

/// Every pseudo-sprite record kind this toolkit reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Action {
    /// Action 0: property table for a run of feature ids.
    Properties {
        feature: Feature,
        first_id: u16,
        count: u8,
        props: Vec<(String, PropValue)>,
    },
    /// Action 1: declare sprite sets for the following real sprites.
    SpriteSet {
        feature: Feature,
        set_count: u8,
        sprite_count: u16,
    },
    /// Action 2, entry count 0: fixed ground + building sprite layout.
    BasicLayout {
        feature: Feature,
        set_id: u8,
        ground: u32,
        building: u32,
        xofs: i8,
        yofs: i8,
        extent: (u8, u8, u8),
    },
    /// Action 2, flag form: advanced sprite layout.
    AdvancedLayout {
        feature: Feature,
        set_id: u8,
        layout: SpriteLayout,
    },
    /// Action 2, vehicle form: sprite-set lists for the loaded and loading
    /// cargo states of features without tile layouts.
    SpriteGroups {
        feature: Feature,
        set_id: u8,
        loaded: Vec<u16>,
        loading: Vec<u16>,
    },
    /// Action 2, variational form: a compiled expression chain plus
    /// dispatch ranges.
    VarAction2 {
        feature: Feature,
        set_id: u8,
        related: bool,
        code: Vec<Node>,
        ranges: Vec<Range>,
        default: GroupRef,
    },
    /// Action 3: map feature ids onto sprite groups.
    Map {
        feature: Feature,
        ids: Vec<u8>,
        maps: Vec<(u8, GroupRef)>,
        default: GroupRef,
    },
    /// Action 4: string table.
    Strings {
        feature: Feature,
        lang: u8,
        first_id: u16,
        strings: Vec<String>,
    },
    /// Action 5: replace new-graphics sprites.
    ReplaceNew {
        set_type: u8,
        count: u16,
        offset: Option<u16>,
    },
    /// Action 6: patch following record bytes from GRF parameters.
    PatchParams { params: Vec<ParamPatch> },
    /// Action 8: GRF id, name and description.
    Description {
        grfid: [u8; 4],
        name: String,
        description: String,
    },
    /// Action A: replace base-set sprites.
    ReplaceOld { sets: Vec<(u16, u8)> },
    /// Action D: arithmetic on GRF parameters.
    ParamOp {
        target: u8,
        operation: ParamOperation,
        source1: u8,
        source2: u8,
        value: Option<u32>,
    },
    /// Action 14: nested chunked metadata.
    Info { chunks: Vec<Chunk> },
}

impl Action {
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Action::Properties {
                feature,
                first_id,
                count,
                props,
            } => {
                let mut res = vec![0x00, feature.code(), props.len() as u8, *count, 0xFF];
                res.extend(first_id.to_le_bytes());
                for (name, value) in props {
                    let (code, fmt) = props::lookup(*feature, name)?;
                    res.push(code);
                    res.extend(props::encode_value(fmt, value)?);
                }
                Ok(res)
            }
            Action::SpriteSet {
                feature,
                set_count,
                sprite_count,
            } => {
                let mut res = vec![0x01, feature.code(), *set_count, 0xFF];
                res.extend(sprite_count.to_le_bytes());
                Ok(res)
            }
            Action::BasicLayout {
                feature,
                set_id,
                ground,
                building,
                xofs,
                yofs,
                extent,
            } => {
                if !feature.has_layouts() {
                    bail!("feature {feature:?} takes no sprite layouts");
                }
                let mut res = vec![0x02, feature.code(), *set_id, 0x00];
                res.extend(ground.to_le_bytes());
                res.extend(building.to_le_bytes());
                res.extend([*xofs as u8, *yofs as u8]);
                res.extend([extent.0, extent.1, extent.2]);
                Ok(res)
            }
            Action::AdvancedLayout {
                feature,
                set_id,
                layout,
            } => {
                if !feature.has_layouts() {
                    bail!("feature {feature:?} takes no sprite layouts");
                }
                let mut res = vec![0x02, feature.code(), *set_id, layout.count_byte()?];
                layout.encode(&mut res)?;
                Ok(res)
            }
            Action::SpriteGroups {
                feature,
                set_id,
                loaded,
                loading,
            } => {
                if feature.has_layouts() {
                    bail!("feature {feature:?} takes sprite layouts, not state lists");
                }
                // The loaded count doubles as the kind byte, so its high bit
                // must stay clear.
                if loaded.len() > 0x7F || loading.len() > 0xFF {
                    bail!("too many sprite-set entries: {}/{}", loaded.len(), loading.len());
                }
                let mut res = vec![
                    0x02,
                    feature.code(),
                    *set_id,
                    loaded.len() as u8,
                    loading.len() as u8,
                ];
                for set in loaded.iter().chain(loading) {
                    res.extend(set.to_le_bytes());
                }
                Ok(res)
            }
            Action::VarAction2 {
                feature,
                set_id,
                related,
                code,
                ranges,
                default,
            } => {
                let kind = if *related { 0x8A } else { 0x89 };
                let mut res = vec![0x02, feature.code(), *set_id, kind];
                res.extend(compiler::compile_chain(code)?);
                if ranges.len() > 0xFF {
                    bail!("too many dispatch ranges: {}", ranges.len());
                }
                res.push(ranges.len() as u8);
                for range in ranges {
                    if range.low > range.high {
                        bail!(
                            "range {:#x}..{:#x} is inverted as unsigned; split signed \
                             ranges at zero before encoding",
                            range.low,
                            range.high
                        );
                    }
                    res.extend(range.target.wire().to_le_bytes());
                    res.extend(range.low.to_le_bytes());
                    res.extend(range.high.to_le_bytes());
                }
                res.extend(default.wire().to_le_bytes());
                Ok(res)
            }
            Action::Map {
                feature,
                ids,
                maps,
                default,
            } => {
                if ids.len() > 0xFF || maps.len() > 0xFF {
                    bail!("action 3 id or map list too long");
                }
                let mut res = vec![0x03, feature.code(), ids.len() as u8];
                res.extend_from_slice(ids);
                res.push(maps.len() as u8);
                for (ctype, target) in maps {
                    res.push(*ctype);
                    res.extend(target.wire().to_le_bytes());
                }
                res.extend(default.wire().to_le_bytes());
                Ok(res)
            }
            Action::Strings {
                feature,
                lang,
                first_id,
                strings,
            } => {
                if strings.len() > 0xFF {
                    bail!("too many strings: {}", strings.len());
                }
                let mut res = vec![0x04, feature.code(), *lang, strings.len() as u8];
                if lang & 0x80 != 0 {
                    res.extend(first_id.to_le_bytes());
                } else {
                    if *first_id > 0xFF {
                        bail!("string id {first_id} needs the generic-strings language bit");
                    }
                    res.push(*first_id as u8);
                }
                for s in strings {
                    res.extend_from_slice(s.as_bytes());
                    res.push(0);
                }
                Ok(res)
            }
            Action::ReplaceNew {
                set_type,
                count,
                offset,
            } => {
                if set_type & 0xF0 != 0 {
                    bail!("set type {set_type:#x} collides with the offset marker bits");
                }
                let mut res = vec![0x05];
                res.push(set_type | if offset.is_some() { 0x80 } else { 0 });
                res.push(0xFF);
                res.extend(count.to_le_bytes());
                if let Some(offset) = offset {
                    res.extend(props::encode_extended_byte(*offset));
                }
                Ok(res)
            }
            Action::PatchParams { params } => {
                let mut res = vec![0x06];
                for p in params {
                    if p.param == 0xFF {
                        bail!("parameter 0xFF is the terminator");
                    }
                    res.push(p.param);
                    res.push(p.size);
                    res.extend(props::encode_extended_byte(p.offset));
                }
                res.push(0xFF);
                Ok(res)
            }
            Action::Description {
                grfid,
                name,
                description,
            } => {
                let mut res = vec![0x08, 0x08];
                res.extend_from_slice(grfid);
                res.extend_from_slice(name.as_bytes());
                res.push(0);
                res.extend_from_slice(description.as_bytes());
                res.push(0);
                Ok(res)
            }
            Action::ReplaceOld { sets } => {
                if sets.len() > 0xFF {
                    bail!("too many replacement sets: {}", sets.len());
                }
                let mut res = vec![0x0A, sets.len() as u8];
                for (first, num) in sets {
                    res.push(*num);
                    res.extend(first.to_le_bytes());
                }
                Ok(res)
            }
            Action::ParamOp {
                target,
                operation,
                source1,
                source2,
                value,
            } => {
                let needs_value = *source1 == 0xFF || *source2 == 0xFF;
                if needs_value != value.is_some() {
                    bail!("literal value required exactly when a source is 0xFF");
                }
                let mut res = vec![0x0D, *target, operation.code(), *source1, *source2];
                if let Some(value) = value {
                    res.extend(value.to_le_bytes());
                }
                Ok(res)
            }
            Action::Info { chunks } => {
                let mut res = vec![0x14];
                for chunk in chunks {
                    chunk.encode(&mut res);
                }
                res.push(0);
                Ok(res)
            }
        }
    }
}
