//! Fixed name table for VarAction2 global/tile variables.
//!
//! Each entry maps a symbolic name onto the raw variable id plus the bit
//! range holding the value; `param` is the extra operand byte required by
//! 60+x variables. The table is closed, mirroring the documented format
//! fields, so a missed lookup on the encode side is always a caller bug.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarDef {
    pub var: u8,
    pub start: u8,
    pub size: u8,
    pub param: Option<u8>,
}

const fn v(var: u8, start: u8, size: u8) -> VarDef {
    VarDef {
        var,
        start,
        size,
        param: None,
    }
}

const fn vp(var: u8, start: u8, size: u8, param: u8) -> VarDef {
    VarDef {
        var,
        start,
        size,
        param: Some(param),
    }
}

pub const GLOBAL_VARS: &[(&str, VarDef)] = &[
    ("current_month", v(0x02, 0, 8)),
    ("current_day_of_month", v(0x02, 8, 5)),
    ("is_leapyear", v(0x02, 15, 1)),
    ("current_day_of_year", v(0x02, 16, 9)),
    ("traffic_side", v(0x06, 4, 1)),
    ("animation_counter", v(0x0A, 0, 16)),
    ("current_callback", v(0x0C, 0, 16)),
    ("extra_callback_info1", v(0x10, 0, 32)),
    ("game_mode", v(0x12, 0, 8)),
    ("extra_callback_info2", v(0x18, 0, 32)),
    ("display_options", v(0x1B, 0, 6)),
    ("last_computed_result", v(0x1C, 0, 32)),
    ("snowline_height", v(0x20, 0, 8)),
    ("difficulty_level", v(0x22, 0, 8)),
    ("current_date", v(0x23, 0, 32)),
    ("current_year", v(0x24, 0, 32)),
    // Object feature variables.
    ("relative_x", v(0x40, 0, 8)),
    ("relative_y", v(0x40, 8, 8)),
    ("relative_pos", v(0x40, 0, 16)),
    ("terrain_type", v(0x41, 0, 3)),
    ("tile_slope", v(0x41, 8, 5)),
    ("build_date", v(0x42, 0, 32)),
    ("animation_frame", v(0x43, 0, 8)),
    ("company_colour", v(0x43, 0, 8)),
    ("owner", v(0x44, 0, 8)),
    ("town_manhattan_dist", v(0x45, 0, 16)),
    ("town_zone", v(0x45, 16, 8)),
    ("town_euclidean_dist", v(0x46, 0, 16)),
    ("view", v(0x48, 0, 8)),
    ("random_bits", v(0x5F, 8, 8)),
    ("tile_height", vp(0x62, 16, 8, 0)),
];

pub fn lookup(name: &str) -> Option<VarDef> {
    GLOBAL_VARS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, def)| *def)
}

/// Mask covering `size` low bits.
pub fn size_mask(size: u8) -> u32 {
    if size >= 32 {
        u32::MAX
    } else {
        (1u32 << size) - 1
    }
}

/// Best-effort reverse lookup used by the decoder: matches only when the
/// operand encodes exactly one table entry's bit range. A miss is not an
/// error; callers fall back to a raw variable node.
pub fn reverse_lookup(var: u8, param: u8, shift: u8, and_mask: u32) -> Option<&'static str> {
    GLOBAL_VARS.iter().find_map(|(name, def)| {
        let matches = def.var == var
            && def.start == shift
            && and_mask == size_mask(def.size)
            && def.param.unwrap_or(param) == param;
        matches.then_some(*name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_idempotent() {
        let first = lookup("tile_slope").unwrap();
        let second = lookup("tile_slope").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, v(0x41, 8, 5));
        assert_eq!(lookup("no_such_variable"), None);
    }

    #[test]
    fn test_reverse_lookup() {
        // Every table entry decodes back to one of the names sharing its
        // exact (var, start, size) triple.
        for (name, def) in GLOBAL_VARS {
            let found = reverse_lookup(
                def.var,
                def.param.unwrap_or(0),
                def.start,
                size_mask(def.size),
            )
            .unwrap();
            let found_def = lookup(found).unwrap();
            assert_eq!(
                (found_def.var, found_def.start, found_def.size),
                (def.var, def.start, def.size),
                "mismatch for {name}"
            );
        }
        // An operand not covered by the table stays unresolved.
        assert_eq!(reverse_lookup(0x41, 0, 8, 0xffff), None);
    }
}
