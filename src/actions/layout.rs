//! Advanced sprite-layout descriptors for Action-2 records.
//!
//! A layout is a ground sprite plus up to 63 child or parent sprites. Each
//! sprite carries a flag word; the set bits strictly determine which optional
//! register-driven bytes follow in the stream. There is no length prefix,
//! so encoder and decoder must agree on the flag-to-field mapping.

use anyhow::{Result, bail};
use serde::Serialize;

// Flag bits. The 0x10/0x20 pair is overloaded: bounding-box offsets for
// parent sprites, child position offsets for child sprites.
pub const FLAG_DODRAW: u16 = 0x01;
pub const FLAG_SPRITE_OFFSET: u16 = 0x02;
pub const FLAG_PALETTE_OFFSET: u16 = 0x04;
pub const FLAG_CUSTOM_PALETTE: u16 = 0x08;
pub const FLAG_BB_XY_OFFSET: u16 = 0x10;
pub const FLAG_BB_Z_OFFSET: u16 = 0x20;
pub const FLAG_CHILD_X_OFFSET: u16 = 0x10;
pub const FLAG_CHILD_Y_OFFSET: u16 = 0x20;
pub const FLAG_SPRITE_VAR10: u16 = 0x40;
pub const FLAG_PALETTE_VAR10: u16 = 0x80;

/// Child sprites use 0x80 in the z-offset slot to mark themselves.
pub const CHILD_MARKER: u8 = 0x80;

/// Optional register-driven fields of one layout sprite. `None` means the
/// field is absent and its flag bit stays clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpriteRegisters {
    /// Draw the sprite only when this register is non-zero.
    pub dodraw: Option<u8>,
    /// Register added to the sprite index.
    pub sprite_offset: Option<u8>,
    /// Register added to the palette.
    pub palette_offset: Option<u8>,
    /// Palette comes from an Action-1 set (flag only, no payload byte).
    pub custom_palette: bool,
    /// Registers offsetting the bounding box (parent) or child position.
    pub offset_x: Option<u8>,
    pub offset_y: Option<u8>,
    /// Register offsetting the bounding-box z position (parent only).
    pub offset_z: Option<u8>,
    /// Resolve the sprite with a fixed value in variable 10.
    pub sprite_var10: Option<u8>,
    /// Resolve the palette with a fixed value in variable 10.
    pub palette_var10: Option<u8>,
}

impl SpriteRegisters {
    pub fn flags(&self, is_parent: bool) -> u16 {
        let mut flags = 0;
        if self.dodraw.is_some() {
            flags |= FLAG_DODRAW;
        }
        if self.sprite_offset.is_some() {
            flags |= FLAG_SPRITE_OFFSET;
        }
        if self.palette_offset.is_some() {
            flags |= FLAG_PALETTE_OFFSET;
        }
        if self.custom_palette {
            flags |= FLAG_CUSTOM_PALETTE;
        }
        if is_parent {
            if self.offset_x.is_some() || self.offset_y.is_some() {
                flags |= FLAG_BB_XY_OFFSET;
            }
            if self.offset_z.is_some() {
                flags |= FLAG_BB_Z_OFFSET;
            }
        } else {
            if self.offset_x.is_some() {
                flags |= FLAG_CHILD_X_OFFSET;
            }
            if self.offset_y.is_some() {
                flags |= FLAG_CHILD_Y_OFFSET;
            }
        }
        if self.sprite_var10.is_some() {
            flags |= FLAG_SPRITE_VAR10;
        }
        if self.palette_var10.is_some() {
            flags |= FLAG_PALETTE_VAR10;
        }
        flags
    }

    /// Append the optional bytes in wire order.
    fn encode(&self, is_parent: bool, out: &mut Vec<u8>) -> Result<()> {
        if let Some(r) = self.dodraw {
            out.push(r);
        }
        if let Some(r) = self.sprite_offset {
            out.push(r);
        }
        if let Some(r) = self.palette_offset {
            out.push(r);
        }
        if is_parent {
            match (self.offset_x, self.offset_y) {
                (Some(x), Some(y)) => out.extend([x, y]),
                (None, None) => {}
                _ => bail!("parent bounding-box offsets need both x and y registers"),
            }
            if let Some(z) = self.offset_z {
                out.push(z);
            }
        } else {
            if self.offset_z.is_some() {
                bail!("child sprites have no z offset register");
            }
            if let Some(x) = self.offset_x {
                out.push(x);
            }
            if let Some(y) = self.offset_y {
                out.push(y);
            }
        }
        if let Some(v) = self.sprite_var10 {
            out.push(v);
        }
        if let Some(v) = self.palette_var10 {
            out.push(v);
        }
        Ok(())
    }
}

/// Sprite-and-palette pair with its optional registers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutSprite {
    pub sprite: u16,
    pub pal: u16,
    pub regs: SpriteRegisters,
}

impl LayoutSprite {
    fn encode(&self, is_parent: bool, out: &mut Vec<u8>) -> Result<()> {
        out.extend(self.sprite.to_le_bytes());
        out.extend(self.pal.to_le_bytes());
        out.extend(self.regs.flags(is_parent).to_le_bytes());
        Ok(())
    }
}

/// One non-ground entry: either a child sprite glued onto the previous
/// bounding box, or a parent sprite with its own 3D extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LayoutEntry {
    Child {
        sprite: LayoutSprite,
        xofs: i8,
        yofs: i8,
    },
    Parent {
        sprite: LayoutSprite,
        offset: (u8, u8, u8),
        extent: (u8, u8, u8),
    },
}

/// Ground sprite plus building entries; at most 63 entries fit the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpriteLayout {
    pub ground: LayoutSprite,
    pub entries: Vec<LayoutEntry>,
}

impl SpriteLayout {
    /// Entry-count byte for the Action-2 record: 0x40 marks the flag-word
    /// form, the low bits carry the entry count.
    pub fn count_byte(&self) -> Result<u8> {
        if self.entries.len() >= 0x40 {
            bail!("sprite layout has {} entries, limit is 63", self.entries.len());
        }
        Ok(0x40 | self.entries.len() as u8)
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        self.ground.encode(false, out)?;
        self.ground.regs.encode(false, out)?;
        for entry in &self.entries {
            match entry {
                LayoutEntry::Child { sprite, xofs, yofs } => {
                    sprite.encode(false, out)?;
                    out.extend([*xofs as u8, *yofs as u8, CHILD_MARKER]);
                    sprite.regs.encode(false, out)?;
                }
                LayoutEntry::Parent {
                    sprite,
                    offset,
                    extent,
                } => {
                    if offset.2 == CHILD_MARKER {
                        bail!("parent z offset 0x80 collides with the child marker");
                    }
                    sprite.encode(true, out)?;
                    out.extend([offset.0, offset.1, offset.2]);
                    out.extend([extent.0, extent.1, extent.2]);
                    sprite.regs.encode(true, out)?;
                }
            }
        }
        Ok(())
    }
}

/// Sprite reference word used by basic layouts: sprite index plus draw mode,
/// recolour table and transparency bits.
pub fn sprite_ref(id: u16, mode: u8, recolour: u16, draw_in_transparent: bool, use_last: bool) -> u32 {
    let mut word = id as u32;
    word |= (mode as u32) << 14;
    word |= (recolour as u32) << 16;
    if draw_in_transparent {
        word |= 1 << 30;
    }
    if use_last {
        word |= 1 << 31;
    }
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_follow_presence() {
        let regs = SpriteRegisters {
            dodraw: Some(0x80),
            sprite_offset: Some(0x81),
            ..Default::default()
        };
        assert_eq!(regs.flags(false), FLAG_DODRAW | FLAG_SPRITE_OFFSET);
        assert_eq!(SpriteRegisters::default().flags(false), 0);

        let bb = SpriteRegisters {
            offset_x: Some(1),
            offset_y: Some(2),
            offset_z: Some(3),
            ..Default::default()
        };
        assert_eq!(bb.flags(true), FLAG_BB_XY_OFFSET | FLAG_BB_Z_OFFSET);
    }

    #[test]
    fn test_encode_child_and_parent() {
        let layout = SpriteLayout {
            ground: LayoutSprite {
                sprite: 0x1234,
                pal: 0,
                regs: SpriteRegisters {
                    sprite_offset: Some(0x80),
                    ..Default::default()
                },
            },
            entries: vec![
                LayoutEntry::Parent {
                    sprite: LayoutSprite {
                        sprite: 42,
                        pal: 0,
                        regs: SpriteRegisters::default(),
                    },
                    offset: (0, 0, 0),
                    extent: (16, 16, 48),
                },
                LayoutEntry::Child {
                    sprite: LayoutSprite {
                        sprite: 43,
                        pal: 0,
                        regs: SpriteRegisters {
                            dodraw: Some(0x82),
                            ..Default::default()
                        },
                    },
                    xofs: -1,
                    yofs: 2,
                },
            ],
        };
        assert_eq!(layout.count_byte().unwrap(), 0x42);

        let mut out = Vec::new();
        layout.encode(&mut out).unwrap();
        assert_eq!(
            out,
            vec![
                0x34, 0x12, 0x00, 0x00, 0x02, 0x00, // ground + flags
                0x80, // ground sprite-offset register
                42, 0, 0, 0, 0, 0, // parent sprite, no flags
                0, 0, 0, 16, 16, 48, // offset + extent
                43, 0, 0, 0, 0x01, 0x00, // child sprite, dodraw flag
                0xFF, 2, 0x80, // xofs -1, yofs 2, child marker
                0x82, // dodraw register
            ]
        );
    }

    #[test]
    fn test_too_many_entries() {
        let layout = SpriteLayout {
            ground: LayoutSprite::default(),
            entries: vec![
                LayoutEntry::Child {
                    sprite: LayoutSprite::default(),
                    xofs: 0,
                    yofs: 0,
                };
                64
            ],
        };
        assert!(layout.count_byte().is_err());
    }

    #[test]
    fn test_sprite_ref_bits() {
        assert_eq!(sprite_ref(0, 0, 0, false, true), 1 << 31);
        assert_eq!(sprite_ref(5, 1, 0, false, false), 5 | (1 << 14));
        assert_eq!(sprite_ref(0, 0, 3, true, false), (3 << 16) | (1 << 30));
    }
}
