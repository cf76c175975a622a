//! Best-effort container decoder.
//!
//! Decoding never gives up on the file as a whole: a record that cannot be
//! understood is reported as a diagnostic and kept as an opaque entry, and
//! the walk continues with the next record. Only a missing or foreign file
//! header is a hard error.

pub mod reader;
pub mod varaction2;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::actions::{Action, Chunk, Feature, GroupRef, ParamOperation, ParamPatch, props};
use crate::actions::layout::{
    CHILD_MARKER, FLAG_BB_XY_OFFSET, FLAG_BB_Z_OFFSET, FLAG_CHILD_X_OFFSET, FLAG_CHILD_Y_OFFSET,
    FLAG_CUSTOM_PALETTE, FLAG_DODRAW, FLAG_PALETTE_OFFSET, FLAG_PALETTE_VAR10, FLAG_SPRITE_OFFSET,
    FLAG_SPRITE_VAR10, LayoutEntry, LayoutSprite, SpriteLayout, SpriteRegisters,
};
use crate::actions::props::PropValue;
use crate::grf::{MAGIC, RECORD_PSEUDO, RECORD_SPRITE_REF};
use reader::Reader;
use varaction2::OperandWidth;

/// One entry of the pseudo-sprite section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodedRecord {
    /// Leading capability record every container opens with.
    Preamble(u32),
    Action(Action),
    SpriteRef(u32),
    /// Record the decoder could not interpret; the payload is kept verbatim.
    Unknown { action: u8, payload: Vec<u8> },
}

/// Header of one real sprite; pixel payloads are summarised by length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedSprite {
    pub id: u32,
    pub zoom: u8,
    pub width: u16,
    pub height: u16,
    pub xofs: i16,
    pub yofs: i16,
    pub data_len: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct DecodedGrf {
    pub container_version: u8,
    pub records: Vec<DecodedRecord>,
    pub sprites: Vec<DecodedSprite>,
    pub diagnostics: Vec<String>,
}

/// Decode a whole container image.
pub fn decode(data: &[u8]) -> Result<DecodedGrf> {
    let mut res = DecodedGrf::default();
    if data.len() >= MAGIC.len() && data[..MAGIC.len()] == MAGIC {
        res.container_version = 2;
    } else if data.len() >= 2 {
        // Legacy containers open straight with a 2-byte record length.
        res.container_version = 1;
        decode_legacy(data, &mut res);
        return Ok(res);
    } else {
        bail!("not a container: {} bytes", data.len());
    }

    let mut r = Reader::new(data);
    r.bytes(MAGIC.len())?;
    let data_offset = r.dword()?;
    let compression = r.byte()?;
    if compression != 0 {
        res.diagnostics
            .push(format!("unexpected stream compression byte {compression:#04x}"));
    }

    loop {
        let len = r.dword()? as usize;
        if len == 0 {
            break;
        }
        let kind = r.byte()?;
        match kind {
            RECORD_PSEUDO if res.records.is_empty() && len == 4 => {
                let mut body = Reader::new(r.bytes(len)?);
                res.records.push(DecodedRecord::Preamble(body.dword()?));
            }
            RECORD_PSEUDO => {
                let payload = r.bytes(len)?;
                match decode_pseudo(payload) {
                    Ok(action) => res.records.push(DecodedRecord::Action(action)),
                    Err(e) => {
                        res.diagnostics
                            .push(format!("record {}: {e}", res.records.len()));
                        res.records.push(DecodedRecord::Unknown {
                            action: payload.first().copied().unwrap_or(0),
                            payload: payload.to_vec(),
                        });
                    }
                }
            }
            RECORD_SPRITE_REF => {
                let mut body = Reader::new(r.bytes(len)?);
                res.records.push(DecodedRecord::SpriteRef(body.dword()?));
            }
            other => {
                res.diagnostics.push(format!(
                    "record {}: unknown framing type {other:#04x}",
                    res.records.len()
                ));
                let payload = r.bytes(len)?.to_vec();
                res.records.push(DecodedRecord::Unknown {
                    action: other,
                    payload,
                });
            }
        }
    }

    // The declared offset spans the compression byte through the section
    // terminator; the check is informative only, the walk above already
    // found the end.
    let walked = r.pos() - 14;
    if data_offset as usize != walked {
        res.diagnostics.push(format!(
            "declared data offset {data_offset} does not match walked offset {walked}"
        ));
    }

    // Real-sprite section.
    loop {
        if r.remaining() < 4 {
            res.diagnostics.push("missing data-section terminator".into());
            break;
        }
        let id = r.dword()?;
        if id == 0 {
            break;
        }
        let size = r.dword()? as usize;
        let kind = r.byte()?;
        if kind != 0x04 {
            res.diagnostics
                .push(format!("sprite {id}: unsupported encoding {kind:#04x}"));
            r.bytes(size.saturating_sub(1))?;
            continue;
        }
        if size < 10 {
            bail!("sprite {id}: record size {size} below header size");
        }
        let zoom = r.byte()?;
        let height = r.word()?;
        let width = r.word()?;
        let xofs = r.word()? as i16;
        let yofs = r.word()? as i16;
        let data_len = size - 10;
        r.bytes(data_len)?;
        res.sprites.push(DecodedSprite {
            id,
            zoom,
            width,
            height,
            xofs,
            yofs,
            data_len,
        });
    }

    if !r.at_end() {
        res.diagnostics
            .push(format!("{} trailing bytes after final terminator", r.remaining()));
    }
    Ok(res)
}

fn decode_legacy(data: &[u8], res: &mut DecodedGrf) {
    if let Err(e) = legacy_walk(data, res) {
        res.diagnostics.push(format!("legacy walk stopped: {e}"));
    }
}

/// Generation-1 walk: 2-byte length framing, pseudo records tagged 0xFF,
/// real sprites inline. A sprite stored without the in-file-size flag can
/// only be skipped by decompressing it, which is out of scope here.
fn legacy_walk(data: &[u8], res: &mut DecodedGrf) -> Result<()> {
    let mut r = Reader::new(data);
    loop {
        let len = r.word()? as usize;
        if len == 0 {
            break;
        }
        let info = r.byte()?;
        if info == 0xFF {
            let payload = r.bytes(len)?;
            match decode_pseudo(payload) {
                Ok(action) => res.records.push(DecodedRecord::Action(action)),
                Err(e) => {
                    res.diagnostics
                        .push(format!("record {}: {e}", res.records.len()));
                    res.records.push(DecodedRecord::Unknown {
                        action: payload.first().copied().unwrap_or(0),
                        payload: payload.to_vec(),
                    });
                }
            }
        } else if info & 0x02 != 0 {
            // Length covers the 8-byte sprite header; the pixel data is
            // stored with its in-file size and can be stepped over.
            let height = r.byte()? as u16;
            let width = r.word()?;
            let xofs = r.word()? as i16;
            let yofs = r.word()? as i16;
            let data_len = len.saturating_sub(8);
            r.bytes(data_len)?;
            res.sprites.push(DecodedSprite {
                id: 0,
                zoom: 0,
                width,
                height,
                xofs,
                yofs,
                data_len,
            });
        } else {
            bail!("tile-compressed sprite at offset {}", r.pos());
        }
    }
    // A checksum dword follows the terminator.
    if r.remaining() != 4 {
        res.diagnostics
            .push(format!("{} trailing bytes after terminator", r.remaining()));
    }
    Ok(())
}

/// Decode one pseudo-sprite payload into an action.
pub fn decode_pseudo(payload: &[u8]) -> Result<Action> {
    let mut r = Reader::new(payload);
    let action = match r.byte()? {
        0x00 => decode_properties(&mut r)?,
        0x01 => {
            let feature = feature(&mut r)?;
            let set_count = r.byte()?;
            let sprite_count = r.extended_byte()?;
            Action::SpriteSet {
                feature,
                set_count,
                sprite_count,
            }
        }
        0x02 => decode_action2(&mut r)?,
        0x03 => decode_map(&mut r)?,
        0x04 => decode_strings(&mut r)?,
        0x05 => {
            let kind = r.byte()?;
            let count = r.extended_byte()?;
            let offset = if kind & 0x80 != 0 {
                Some(r.extended_byte()?)
            } else {
                None
            };
            Action::ReplaceNew {
                set_type: kind & 0x7F,
                count,
                offset,
            }
        }
        0x06 => {
            let mut params = Vec::new();
            loop {
                let param = r.byte()?;
                if param == 0xFF {
                    break;
                }
                let size = r.byte()?;
                let offset = r.extended_byte()?;
                params.push(ParamPatch {
                    param,
                    size,
                    offset,
                });
            }
            Action::PatchParams { params }
        }
        0x08 => {
            let version = r.byte()?;
            if version < 2 {
                bail!("unsupported format version {version}");
            }
            let grfid = r.bytes(4)?.try_into()?;
            let name = String::from_utf8_lossy(&r.string()?).into_owned();
            let description = String::from_utf8_lossy(&r.string()?).into_owned();
            Action::Description {
                grfid,
                name,
                description,
            }
        }
        0x0A => {
            let n = r.byte()?;
            let mut sets = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let num = r.byte()?;
                let first = r.word()?;
                sets.push((first, num));
            }
            Action::ReplaceOld { sets }
        }
        0x0D => {
            let target = r.byte()?;
            let code = r.byte()?;
            let operation = match ParamOperation::from_code(code) {
                Some(op) => op,
                None => bail!("unknown parameter operation {code:#04x}"),
            };
            let source1 = r.byte()?;
            let source2 = r.byte()?;
            let value = if source1 == 0xFF || source2 == 0xFF {
                Some(r.dword()?)
            } else {
                None
            };
            Action::ParamOp {
                target,
                operation,
                source1,
                source2,
                value,
            }
        }
        0x14 => Action::Info {
            chunks: decode_chunks(&mut r)?,
        },
        other => bail!("action {other:#04x} not supported"),
    };
    if !r.at_end() {
        bail!("{} trailing bytes in record", r.remaining());
    }
    Ok(action)
}

fn feature(r: &mut Reader) -> Result<Feature> {
    let code = r.byte()?;
    match Feature::from_code(code) {
        Some(f) => Ok(f),
        None => bail!("unknown feature {code:#04x}"),
    }
}

fn decode_properties(r: &mut Reader) -> Result<Action> {
    let feature = feature(r)?;
    let nprops = r.byte()?;
    let count = r.byte()?;
    let first_id = r.extended_byte()?;
    let mut props = Vec::with_capacity(nprops as usize);
    for _ in 0..nprops {
        let code = r.byte()?;
        let (name, fmt) = match props::by_code(feature, code) {
            Some(entry) => entry,
            None => bail!("unknown {feature:?} property {code:#04x}"),
        };
        let value = match fmt {
            props::PropFormat::Byte => PropValue::Int(r.byte()? as u32),
            props::PropFormat::Word => PropValue::Int(r.word()? as u32),
            props::PropFormat::Dword => PropValue::Int(r.dword()?),
            props::PropFormat::ExtByte => PropValue::Int(r.extended_byte()? as u32),
            props::PropFormat::Label => PropValue::Label(r.bytes(4)?.try_into()?),
            props::PropFormat::ByteList => {
                let n = r.byte()? as usize;
                PropValue::Bytes(r.bytes(n)?.to_vec())
            }
        };
        props.push((name.to_string(), value));
    }
    Ok(Action::Properties {
        feature,
        first_id,
        count,
        props,
    })
}

fn decode_action2(r: &mut Reader) -> Result<Action> {
    let feature = feature(r)?;
    let set_id = r.byte()?;
    let kind = r.byte()?;
    // Variational forms are recognised for every feature; the kind byte
    // carries the operand width and whether the related object is read.
    if kind & 0x80 != 0 {
        let width = match kind {
            0x81 | 0x82 => OperandWidth::Byte,
            0x85 | 0x86 => OperandWidth::Word,
            0x89 | 0x8A => OperandWidth::Dword,
            other => bail!("variational record kind {other:#04x} not supported"),
        };
        return varaction2::decode_record(feature, set_id, kind & 0x02 != 0, width, r);
    }
    if !feature.has_layouts() {
        // Vehicle-style record: the kind byte doubles as the first count.
        let n_loading = r.byte()? as usize;
        let mut loaded = Vec::with_capacity(kind as usize);
        for _ in 0..kind {
            loaded.push(r.word()?);
        }
        let mut loading = Vec::with_capacity(n_loading);
        for _ in 0..n_loading {
            loading.push(r.word()?);
        }
        return Ok(Action::SpriteGroups {
            feature,
            set_id,
            loaded,
            loading,
        });
    }
    match kind {
        0x00 => {
            let ground = r.dword()?;
            let building = r.dword()?;
            let xofs = r.byte()? as i8;
            let yofs = r.byte()? as i8;
            let extent = (r.byte()?, r.byte()?, r.byte()?);
            Ok(Action::BasicLayout {
                feature,
                set_id,
                ground,
                building,
                xofs,
                yofs,
                extent,
            })
        }
        n @ 0x40..=0x7F => {
            let layout = decode_layout(r, (n & 0x3F) as usize)?;
            Ok(Action::AdvancedLayout {
                feature,
                set_id,
                layout,
            })
        }
        other => bail!("sprite-group form {other:#04x} not supported"),
    }
}

fn decode_layout(r: &mut Reader, entries: usize) -> Result<SpriteLayout> {
    let ground = decode_layout_sprite(r)?;
    let ground = LayoutSprite {
        regs: decode_regs(r, ground.2, false)?,
        sprite: ground.0,
        pal: ground.1,
    };
    let mut res = SpriteLayout {
        ground,
        entries: Vec::with_capacity(entries),
    };
    for _ in 0..entries {
        let (sprite, pal, flags) = decode_layout_sprite(r)?;
        let xofs = r.byte()?;
        let yofs = r.byte()?;
        let zofs = r.byte()?;
        let entry = if zofs == CHILD_MARKER {
            LayoutEntry::Child {
                sprite: LayoutSprite {
                    sprite,
                    pal,
                    regs: decode_regs(r, flags, false)?,
                },
                xofs: xofs as i8,
                yofs: yofs as i8,
            }
        } else {
            let extent = (r.byte()?, r.byte()?, r.byte()?);
            LayoutEntry::Parent {
                sprite: LayoutSprite {
                    sprite,
                    pal,
                    regs: decode_regs(r, flags, true)?,
                },
                offset: (xofs, yofs, zofs),
                extent,
            }
        };
        res.entries.push(entry);
    }
    Ok(res)
}

fn decode_layout_sprite(r: &mut Reader) -> Result<(u16, u16, u16)> {
    Ok((r.word()?, r.word()?, r.word()?))
}

/// Inverse of the flag-driven register encoding; reads the optional bytes
/// in the same order the encoder writes them.
fn decode_regs(r: &mut Reader, flags: u16, is_parent: bool) -> Result<SpriteRegisters> {
    let mut regs = SpriteRegisters {
        custom_palette: flags & FLAG_CUSTOM_PALETTE != 0,
        ..Default::default()
    };
    if flags & FLAG_DODRAW != 0 {
        regs.dodraw = Some(r.byte()?);
    }
    if flags & FLAG_SPRITE_OFFSET != 0 {
        regs.sprite_offset = Some(r.byte()?);
    }
    if flags & FLAG_PALETTE_OFFSET != 0 {
        regs.palette_offset = Some(r.byte()?);
    }
    if is_parent {
        if flags & FLAG_BB_XY_OFFSET != 0 {
            regs.offset_x = Some(r.byte()?);
            regs.offset_y = Some(r.byte()?);
        }
        if flags & FLAG_BB_Z_OFFSET != 0 {
            regs.offset_z = Some(r.byte()?);
        }
    } else {
        if flags & FLAG_CHILD_X_OFFSET != 0 {
            regs.offset_x = Some(r.byte()?);
        }
        if flags & FLAG_CHILD_Y_OFFSET != 0 {
            regs.offset_y = Some(r.byte()?);
        }
    }
    if flags & FLAG_SPRITE_VAR10 != 0 {
        regs.sprite_var10 = Some(r.byte()?);
    }
    if flags & FLAG_PALETTE_VAR10 != 0 {
        regs.palette_var10 = Some(r.byte()?);
    }
    Ok(regs)
}

fn decode_map(r: &mut Reader) -> Result<Action> {
    let feature = feature(r)?;
    let n_ids = r.byte()? as usize;
    let ids = r.bytes(n_ids)?.to_vec();
    let n_maps = r.byte()? as usize;
    let mut maps = Vec::with_capacity(n_maps);
    for _ in 0..n_maps {
        let ctype = r.byte()?;
        maps.push((ctype, GroupRef::from_wire(r.word()?)));
    }
    let default = GroupRef::from_wire(r.word()?);
    Ok(Action::Map {
        feature,
        ids,
        maps,
        default,
    })
}

fn decode_strings(r: &mut Reader) -> Result<Action> {
    let feature = feature(r)?;
    let lang = r.byte()?;
    let count = r.byte()?;
    let first_id = if lang & 0x80 != 0 {
        r.word()?
    } else {
        r.byte()? as u16
    };
    let mut strings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        strings.push(String::from_utf8_lossy(&r.string()?).into_owned());
    }
    Ok(Action::Strings {
        feature,
        lang,
        first_id,
        strings,
    })
}

fn decode_chunks(r: &mut Reader) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    loop {
        match r.byte()? {
            0 => return Ok(chunks),
            b'C' => {
                let id = r.bytes(4)?.try_into()?;
                chunks.push(Chunk::Container {
                    id,
                    children: decode_chunks(r)?,
                });
            }
            b'B' => {
                let id = r.bytes(4)?.try_into()?;
                let len = r.word()? as usize;
                chunks.push(Chunk::Binary {
                    id,
                    data: r.bytes(len)?.to_vec(),
                });
            }
            b'T' => {
                let id = r.bytes(4)?.try_into()?;
                let lang = r.byte()?;
                let text = String::from_utf8_lossy(&r.string()?).into_owned();
                chunks.push(Chunk::Text { id, lang, text });
            }
            other => bail!("unknown metadata chunk type {other:#04x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Range;
    use crate::expr::parser::parse_code;
    use crate::grf::{NewGrf, RealSprite, Zoom};

    fn pseudo_round_trip(action: Action) {
        let bytes = action.encode().unwrap();
        assert_eq!(decode_pseudo(&bytes).unwrap(), action, "bytes: {bytes:02X?}");
    }

    #[test]
    fn test_pseudo_round_trips() {
        pseudo_round_trip(Action::Properties {
            feature: Feature::Object,
            first_id: 0,
            count: 1,
            props: vec![
                ("label".into(), PropValue::Label(*b"ABCD")),
                ("size".into(), PropValue::Int(0x11)),
                ("intro_date".into(), PropValue::Int(736695)),
            ],
        });
        pseudo_round_trip(Action::Map {
            feature: Feature::Object,
            ids: vec![0, 1],
            maps: vec![(0xFF, GroupRef::Group(3))],
            default: GroupRef::Callback(0),
        });
        pseudo_round_trip(Action::Strings {
            feature: Feature::Object,
            lang: 0x7F,
            first_id: 0xC5,
            strings: vec!["A Name".into()],
        });
        pseudo_round_trip(Action::ReplaceNew {
            set_type: 0x0D,
            count: 16,
            offset: Some(2),
        });
        pseudo_round_trip(Action::PatchParams {
            params: vec![ParamPatch {
                param: 0,
                size: 4,
                offset: 9,
            }],
        });
        pseudo_round_trip(Action::ReplaceOld {
            sets: vec![(1420, 8)],
        });
        pseudo_round_trip(Action::ParamOp {
            target: 0x10,
            operation: ParamOperation::Assign,
            source1: 0xFF,
            source2: 0xFE,
            value: Some(7),
        });
    }

    #[test]
    fn test_varaction2_round_trip_through_record() {
        pseudo_round_trip(Action::VarAction2 {
            feature: Feature::Object,
            set_id: 1,
            related: false,
            code: parse_code("TEMP[0] = tile_slope\nmin(TEMP[0], 3)").unwrap(),
            ranges: vec![Range {
                low: 0,
                high: 2,
                target: GroupRef::Group(9),
            }],
            default: GroupRef::Callback(0x401),
        });
    }

    #[test]
    fn test_byte_width_variational_record() {
        // Kind 0x81 stores the and-mask and the default-only range table at
        // byte width.
        let payload = [0x02, 0x0F, 0x00, 0x81, 0x41, 0x00, 0x1F, 0x00, 0x01, 0x00];
        let action = decode_pseudo(&payload).unwrap();
        assert_eq!(
            action,
            Action::VarAction2 {
                feature: Feature::Object,
                set_id: 0,
                related: false,
                code: vec![crate::expr::Node::RawVar {
                    var: 0x41,
                    param: 0,
                    shift: 0,
                    and_mask: 0x1F,
                }],
                ranges: vec![],
                default: GroupRef::Group(1),
            }
        );
    }

    #[test]
    fn test_vehicle_state_lists() {
        // For features without tile layouts the kind byte is the first
        // sprite-set count, not a layout or variational marker.
        let payload = [0x02, 0x00, 0x00, 0x01, 0x01, 0x03, 0x00, 0x04, 0x00];
        assert_eq!(
            decode_pseudo(&payload).unwrap(),
            Action::SpriteGroups {
                feature: Feature::Train,
                set_id: 0,
                loaded: vec![3],
                loading: vec![4],
            }
        );
        pseudo_round_trip(Action::SpriteGroups {
            feature: Feature::Train,
            set_id: 7,
            loaded: vec![1, 2],
            loading: vec![],
        });
    }

    #[test]
    fn test_layout_round_trip() {
        use crate::actions::layout;
        pseudo_round_trip(Action::AdvancedLayout {
            feature: Feature::Object,
            set_id: 0,
            layout: SpriteLayout {
                ground: LayoutSprite {
                    sprite: 0x5405,
                    pal: 0,
                    regs: SpriteRegisters::default(),
                },
                entries: vec![
                    LayoutEntry::Parent {
                        sprite: LayoutSprite {
                            sprite: 42,
                            pal: 0,
                            regs: SpriteRegisters {
                                sprite_offset: Some(0x80),
                                offset_x: Some(1),
                                offset_y: Some(2),
                                ..Default::default()
                            },
                        },
                        offset: (0, 0, 0),
                        extent: (16, 16, 32),
                    },
                    LayoutEntry::Child {
                        sprite: LayoutSprite {
                            sprite: 43,
                            pal: 0x84,
                            regs: SpriteRegisters {
                                custom_palette: true,
                                ..Default::default()
                            },
                        },
                        xofs: -3,
                        yofs: 0,
                    },
                ],
            },
        });
        pseudo_round_trip(Action::BasicLayout {
            feature: Feature::Object,
            set_id: 1,
            ground: layout::sprite_ref(0x3F4, 0, 0, false, false),
            building: layout::sprite_ref(0, 0, 0, false, true),
            xofs: 0,
            yofs: 0,
            extent: (16, 16, 10),
        });
    }

    #[test]
    fn test_unknown_action_is_soft() {
        // Action 7 exists in the wild but is outside this toolkit.
        let mut grf = NewGrf::new(*b"TST\x01", "n", "d").unwrap();
        grf.add(&Action::SpriteSet {
            feature: Feature::Object,
            set_count: 1,
            sprite_count: 1,
        })
        .unwrap();
        let mut bytes = grf.to_bytes();
        // Patch the sprite-set record into an unknown action byte.
        let pos = bytes
            .windows(2)
            .position(|w| w == [0xFF, 0x01])
            .expect("sprite-set record present");
        bytes[pos + 1] = 0x07;

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.container_version, 2);
        assert!(
            decoded
                .diagnostics
                .iter()
                .any(|d| d.contains("not supported")),
            "diagnostics: {:?}",
            decoded.diagnostics
        );
        assert!(matches!(
            decoded.records.last(),
            Some(DecodedRecord::Unknown { action: 0x07, .. })
        ));
    }

    #[test]
    fn test_full_container_walk() {
        let mut grf = NewGrf::new(*b"TST\x01", "Name", "Desc").unwrap();
        grf.add(&Action::SpriteSet {
            feature: Feature::Object,
            set_count: 1,
            sprite_count: 1,
        })
        .unwrap();
        let id = grf
            .add_sprites(vec![RealSprite {
                zoom: Zoom::Normal,
                height: 1,
                width: 3,
                xofs: 0,
                yofs: 0,
                data: vec![9, 9, 9],
            }])
            .unwrap();

        let decoded = decode(&grf.to_bytes()).unwrap();
        assert!(decoded.diagnostics.is_empty(), "{:?}", decoded.diagnostics);
        assert_eq!(decoded.records.len(), 5);
        assert_eq!(decoded.records[0], DecodedRecord::Preamble(2));
        assert!(matches!(
            decoded.records[2],
            DecodedRecord::Action(Action::Description { .. })
        ));
        assert_eq!(decoded.records[4], DecodedRecord::SpriteRef(id));
        assert_eq!(decoded.sprites.len(), 1);
        assert_eq!(decoded.sprites[0].id, id);
        assert_eq!(decoded.sprites[0].data_len, 3);
    }

    #[test]
    fn test_legacy_detection() {
        let decoded = decode(&[0x04, 0x00, 0xFF, 0x02]).unwrap();
        assert_eq!(decoded.container_version, 1);
        assert!(!decoded.diagnostics.is_empty());
    }

    #[test]
    fn test_truncated_container_is_hard_error() {
        let mut grf_bytes = NewGrf::new(*b"TST\x01", "n", "d").unwrap().to_bytes();
        grf_bytes.truncate(20);
        assert!(decode(&grf_bytes).is_err());
    }

    #[test]
    fn test_offset_mismatch_is_reported() {
        let mut bytes = NewGrf::new(*b"TST\x01", "n", "d").unwrap().to_bytes();
        bytes[10] = bytes[10].wrapping_add(1);
        let decoded = decode(&bytes).unwrap();
        assert!(
            decoded
                .diagnostics
                .iter()
                .any(|d| d.contains("data offset")),
            "{:?}",
            decoded.diagnostics
        );
    }
}
