//! Action-0 property tables and wire formats.
//!
//! Each feature category carries a closed table mapping symbolic property
//! names onto `(code, format)` pairs mirroring the documented record layout.
//! Unknown names are caller bugs, reported as hard errors.

use anyhow::{Result, bail};
use serde::Serialize;

use super::Feature;

/// Wire format of one property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropFormat {
    /// 1-byte integer.
    Byte,
    /// 2-byte integer.
    Word,
    /// 4-byte integer.
    Dword,
    /// 4-byte label such as a class or cargo label.
    Label,
    /// Extended byte: 1 byte below 0xFF, otherwise 0xFF plus a word.
    ExtByte,
    /// Length-prefixed byte string (at most 255 bytes).
    ByteList,
}

/// A property value supplied by the caller; the table's format decides how
/// it is put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropValue {
    Int(u32),
    Label([u8; 4]),
    Bytes(Vec<u8>),
}

type PropTable = &'static [(u8, &'static str, PropFormat)];

use PropFormat::*;

const OBJECT_PROPS: PropTable = &[
    (0x08, "label", Label),
    (0x09, "class_name_id", Word),
    (0x0A, "name_id", Word),
    (0x0B, "climate", Byte),
    (0x0C, "size", Byte),
    (0x0D, "build_cost_factor", Byte),
    (0x0E, "intro_date", Dword),
    (0x0F, "eol_date", Dword),
    (0x10, "flags", Word),
    (0x11, "anim_info", Word),
    (0x12, "anim_speed", Byte),
    (0x13, "anim_trigger", Word),
    (0x14, "removal_cost_factor", Byte),
    (0x15, "cb_flags", Word),
    (0x16, "building_height", Byte),
    (0x17, "num_views", Byte),
    (0x18, "num_objects", Byte),
];

const TRAIN_PROPS: PropTable = &[
    (0x05, "track_type", Byte),
    (0x08, "ai_special_flag", Byte),
    (0x09, "max_speed", Word),
    (0x0B, "power", Word),
    (0x0D, "running_cost_factor", Byte),
    (0x0E, "running_cost_base", Dword),
    (0x12, "sprite_id", Byte),
    (0x13, "dual_headed", Byte),
    (0x14, "cargo_capacity", Byte),
    (0x15, "cargo_type", Byte),
    (0x16, "weight", Byte),
    (0x17, "cost_factor", Byte),
    (0x18, "ai_engine_rank", Byte),
    (0x19, "engine_class", Byte),
    (0x1A, "sort_purchase_list", ExtByte),
    (0x1B, "extra_power_per_wagon", Word),
    (0x1C, "refit_cost", Byte),
    (0x1D, "refittable_cargo_types", Dword),
    (0x1E, "cb_flags", Byte),
    (0x1F, "tractive_effort", Byte),
    (0x20, "air_drag", Byte),
    (0x21, "shorten_by", Byte),
    (0x22, "visual_effect", Byte),
    (0x23, "extra_weight_per_wagon", Byte),
    (0x24, "weight_high", Byte),
    (0x25, "bitmask_var42", Byte),
    (0x26, "retire_early", Byte),
    (0x27, "misc_flags", Byte),
    (0x28, "refittable_cargo_classes", Word),
    (0x29, "non_refittable_cargo_classes", Word),
    (0x2A, "intro_date_long", Dword),
    (0x2B, "cargo_age_period", Word),
    (0x2C, "cargo_allow_refit", ByteList),
    (0x2D, "cargo_disallow_refit", ByteList),
    (0x2E, "curve_speed_mod", Word),
];

const INDUSTRY_PROPS: PropTable = &[
    (0x08, "substitute_type", Byte),
    (0x09, "override_type", Byte),
    (0x0B, "life_type", Byte),
    (0x0C, "closure_msg", Word),
    (0x0D, "production_increase_msg", Word),
    (0x0E, "production_decrease_msg", Word),
    (0x0F, "fund_cost_multiplier", Byte),
    (0x12, "production_multiplier_1", Byte),
    (0x13, "production_multiplier_2", Byte),
    (0x14, "minimal_cargo", Byte),
    (0x17, "map_colour", Byte),
    (0x18, "special_flags", Dword),
    (0x19, "new_random_sound", Word),
    (0x1A, "conflicting_types", Dword),
    (0x1B, "random_prob", Byte),
];

const CARGO_PROPS: PropTable = &[
    (0x08, "bit_number", Byte),
    (0x09, "type_name_id", Word),
    (0x0A, "unit_name_id", Word),
    (0x0B, "units_of_cargo_id", Word),
    (0x0C, "tons_of_cargo_id", Word),
    (0x0D, "abbreviation_id", Word),
    (0x0E, "icon_sprite", Word),
    (0x0F, "unit_weight", Byte),
    (0x10, "penalty_lower", Byte),
    (0x11, "penalty_upper", Byte),
    (0x12, "base_price", Dword),
    (0x13, "station_list_colour", Byte),
    (0x14, "graph_colour", Byte),
    (0x15, "is_freight", Byte),
    (0x16, "classes", Word),
    (0x17, "label", Label),
];

const GLOBAL_PROPS: PropTable = &[
    (0x08, "cost_base_multiplier", Byte),
    (0x09, "cargo_table", Label),
    (0x0A, "currency_name_id", Word),
    (0x0B, "currency_multiplier", Dword),
    (0x0C, "currency_options", Word),
    (0x0D, "currency_symbol", Dword),
    (0x0E, "currency_euro_date", Word),
];

fn table(feature: Feature) -> Result<PropTable> {
    Ok(match feature {
        Feature::Object => OBJECT_PROPS,
        Feature::Train => TRAIN_PROPS,
        Feature::Industry => INDUSTRY_PROPS,
        Feature::Cargo => CARGO_PROPS,
        Feature::Global => GLOBAL_PROPS,
        other => bail!("no property table for feature {other:?}"),
    })
}

/// Resolve a symbolic property name for a feature.
pub fn lookup(feature: Feature, name: &str) -> Result<(u8, PropFormat)> {
    let props = table(feature)?;
    match props.iter().find(|(_, n, _)| *n == name) {
        Some((code, _, fmt)) => Ok((*code, *fmt)),
        None => bail!("unknown {feature:?} property `{name}`"),
    }
}

/// Reverse lookup used by the decoder.
pub fn by_code(feature: Feature, code: u8) -> Option<(&'static str, PropFormat)> {
    let props = table(feature).ok()?;
    props
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, fmt)| (*name, *fmt))
}

/// Serialise one value according to its wire format.
pub fn encode_value(fmt: PropFormat, value: &PropValue) -> Result<Vec<u8>> {
    Ok(match (fmt, value) {
        (Byte, PropValue::Int(v)) => {
            if *v > 0xFF {
                bail!("value {v} does not fit a byte property");
            }
            vec![*v as u8]
        }
        (Word, PropValue::Int(v)) => {
            if *v > 0xFFFF {
                bail!("value {v} does not fit a word property");
            }
            (*v as u16).to_le_bytes().to_vec()
        }
        (Dword, PropValue::Int(v)) => v.to_le_bytes().to_vec(),
        (Label, PropValue::Label(l)) => l.to_vec(),
        (Label, PropValue::Int(v)) => v.to_le_bytes().to_vec(),
        (ExtByte, PropValue::Int(v)) => {
            if *v > 0xFFFF {
                bail!("value {v} does not fit an extended byte");
            }
            encode_extended_byte(*v as u16)
        }
        (ByteList, PropValue::Bytes(bytes)) => {
            if bytes.len() > 0xFF {
                bail!("byte list too long: {} bytes", bytes.len());
            }
            let mut res = vec![bytes.len() as u8];
            res.extend_from_slice(bytes);
            res
        }
        (fmt, value) => bail!("value {value:?} does not match format {fmt:?}"),
    })
}

/// Variable-width count: a literal byte below 0xFF, otherwise the 3-byte
/// escape form. The boundary value 0xFF itself must use the escape.
pub fn encode_extended_byte(value: u16) -> Vec<u8> {
    if value < 0xFF {
        vec![value as u8]
    } else {
        let mut res = vec![0xFF];
        res.extend(value.to_le_bytes());
        res
    }
}

/// Object size byte: y extent in the high nibble, x in the low.
pub fn object_size(x: u8, y: u8) -> u8 {
    (y << 4) | x
}
