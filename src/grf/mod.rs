//! Container assembly and serialisation.
//!
//! A file is a fixed header, a pseudo-sprite section, and a real-sprite data
//! section. Pseudo records are framed `[len:u32][type:u8][payload]`; type
//! 0xFF carries action bytes inline and type 0xFD carries the id of a real
//! sprite stored in the data section. Both sections end with a zero dword.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::actions::{Action, Chunk};

pub const MAGIC: [u8; 10] = [0x00, 0x00, b'G', b'R', b'F', 0x82, 0x0D, 0x0A, 0x1A, 0x0A];

/// Pseudo record type carrying action bytes.
pub const RECORD_PSEUDO: u8 = 0xFF;
/// Pseudo record type referencing a real sprite by id.
pub const RECORD_SPRITE_REF: u8 = 0xFD;

/// Zoom level byte of a real sprite record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Zoom {
    Out4x,
    Normal,
    Out2x,
    Out8x,
    Out16x,
    Out32x,
}

impl Zoom {
    pub fn code(self) -> u8 {
        match self {
            Zoom::Out4x => 0,
            Zoom::Normal => 1,
            Zoom::Out2x => 2,
            Zoom::Out8x => 3,
            Zoom::Out16x => 4,
            Zoom::Out32x => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Zoom> {
        Some(match code {
            0 => Zoom::Out4x,
            1 => Zoom::Normal,
            2 => Zoom::Out2x,
            3 => Zoom::Out8x,
            4 => Zoom::Out16x,
            5 => Zoom::Out32x,
            _ => return None,
        })
    }
}

/// One image at one zoom level. `data` is raw 8bpp pixel data, stored
/// uncompressed in the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealSprite {
    pub zoom: Zoom,
    pub height: u16,
    pub width: u16,
    pub xofs: i16,
    pub yofs: i16,
    pub data: Vec<u8>,
}

enum PseudoSprite {
    Data(Vec<u8>),
    SpriteRef(u32),
}

/// An in-memory file under construction. Records are kept in insertion
/// order; the constructor seeds the mandatory preamble so callers only add
/// content records.
pub struct NewGrf {
    pseudo: Vec<PseudoSprite>,
    real: Vec<(u32, Vec<RealSprite>)>,
    next_sprite_id: u32,
}

impl NewGrf {
    pub fn new(grfid: [u8; 4], name: &str, description: &str) -> Result<NewGrf> {
        let mut grf = NewGrf {
            // Leading record declaring container version 2 capabilities.
            pseudo: vec![PseudoSprite::Data(vec![0x02, 0x00, 0x00, 0x00])],
            real: Vec::new(),
            next_sprite_id: 1,
        };
        grf.add(&Action::Info {
            chunks: vec![Chunk::Container {
                id: *b"INFO",
                children: vec![Chunk::Binary {
                    id: *b"PALS",
                    data: vec![b'D'],
                }],
            }],
        })?;
        grf.add(&Action::Description {
            grfid,
            name: name.into(),
            description: description.into(),
        })?;
        Ok(grf)
    }

    /// Append one action as a pseudo-sprite record.
    pub fn add(&mut self, action: &Action) -> Result<()> {
        self.pseudo.push(PseudoSprite::Data(action.encode()?));
        Ok(())
    }

    /// Append one image as a group of zoom variants sharing a sprite id.
    /// Returns the id; the reference record lands at the current position
    /// in the pseudo section, so call this where an Action 1 expects its
    /// real sprites.
    pub fn add_sprites(&mut self, sprites: Vec<RealSprite>) -> Result<u32> {
        if sprites.is_empty() {
            bail!("sprite group needs at least one zoom variant");
        }
        for (i, a) in sprites.iter().enumerate() {
            if sprites[..i].iter().any(|b| b.zoom == a.zoom) {
                bail!("duplicate zoom {:?} in sprite group", a.zoom);
            }
        }
        let id = self.next_sprite_id;
        self.next_sprite_id += 1;
        self.pseudo.push(PseudoSprite::SpriteRef(id));
        self.real.push((id, sprites));
        Ok(id)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Declared size of the pseudo-sprite section, measured from right
        // after the offset field: compression byte + framed records + the
        // 4-byte terminator.
        let mut data_offset: u32 = 5;
        for record in &self.pseudo {
            let len = match record {
                PseudoSprite::Data(data) => data.len() as u32,
                PseudoSprite::SpriteRef(_) => 4,
            };
            data_offset += len + 5;
        }

        let mut res = Vec::new();
        res.extend_from_slice(&MAGIC);
        res.extend(data_offset.to_le_bytes());
        res.push(0); // no stream compression

        for record in &self.pseudo {
            match record {
                PseudoSprite::Data(data) => {
                    res.extend((data.len() as u32).to_le_bytes());
                    res.push(RECORD_PSEUDO);
                    res.extend_from_slice(data);
                }
                PseudoSprite::SpriteRef(id) => {
                    res.extend(4u32.to_le_bytes());
                    res.push(RECORD_SPRITE_REF);
                    res.extend(id.to_le_bytes());
                }
            }
        }
        res.extend(0u32.to_le_bytes());

        for (id, sprites) in &self.real {
            for sprite in sprites {
                res.extend(id.to_le_bytes());
                res.extend((sprite.data.len() as u32 + 10).to_le_bytes());
                res.push(0x04); // uncompressed 8bpp
                res.push(sprite.zoom.code());
                res.extend(sprite.height.to_le_bytes());
                res.extend(sprite.width.to_le_bytes());
                res.extend(sprite.xofs.to_le_bytes());
                res.extend(sprite.yofs.to_le_bytes());
                res.extend_from_slice(&sprite.data);
            }
        }
        res.extend(0u32.to_le_bytes());
        res
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())
            .with_context(|| format!("writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Feature;

    fn one_sprite() -> RealSprite {
        RealSprite {
            zoom: Zoom::Normal,
            height: 2,
            width: 2,
            xofs: 0,
            yofs: -1,
            data: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_header_and_offset() {
        let grf = NewGrf::new(*b"TST\x01", "n", "d").unwrap();
        let bytes = grf.to_bytes();
        assert_eq!(&bytes[..10], &MAGIC);
        assert_eq!(bytes[14], 0, "compression byte");

        // Walk the pseudo section; the declared offset must equal the bytes
        // consumed from the compression byte through the terminator.
        let declared = u32::from_le_bytes(bytes[10..14].try_into().unwrap());
        let mut pos = 15;
        loop {
            let len = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            if len == 0 {
                break;
            }
            pos += 4 + 1 + len;
        }
        assert_eq!(declared as usize, pos + 4 - 14);
        // Only the zero terminator of the empty data section follows.
        assert_eq!(&bytes[pos + 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_preamble_records() {
        let grf = NewGrf::new(*b"TST\x01", "Name", "Desc").unwrap();
        let bytes = grf.to_bytes();

        let mut records = Vec::new();
        let mut pos = 15;
        loop {
            let len = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            if len == 0 {
                break;
            }
            assert_eq!(bytes[pos + 4], RECORD_PSEUDO);
            records.push(&bytes[pos + 5..pos + 5 + len]);
            pos += 5 + len;
        }
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], &[0x02, 0, 0, 0]);
        assert_eq!(records[1][0], 0x14);
        assert_eq!(records[2][..2], [0x08, 0x08]);
        assert_eq!(&records[2][2..6], b"TST\x01");
    }

    #[test]
    fn test_sprite_ids_and_data_section() {
        let mut grf = NewGrf::new(*b"TST\x01", "n", "d").unwrap();
        grf.add(&Action::SpriteSet {
            feature: Feature::Object,
            set_count: 1,
            sprite_count: 2,
        })
        .unwrap();
        let first = grf.add_sprites(vec![one_sprite()]).unwrap();
        let second = grf
            .add_sprites(vec![
                one_sprite(),
                RealSprite {
                    zoom: Zoom::Out2x,
                    ..one_sprite()
                },
            ])
            .unwrap();
        assert_eq!((first, second), (1, 2));

        let bytes = grf.to_bytes();
        let declared = u32::from_le_bytes(bytes[10..14].try_into().unwrap()) as usize;
        // The data section starts at the declared offset plus the header.
        let data = &bytes[declared + 14..];
        assert_eq!(u32::from_le_bytes(data[..4].try_into().unwrap()), 1);
        let size = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        assert_eq!(size, 4 + 10);
        assert_eq!(data[8], 0x04);
        assert_eq!(data[9], Zoom::Normal.code());
        // Second group holds two zoom records under one id.
        let next = &data[8 + size..];
        assert_eq!(u32::from_le_bytes(next[..4].try_into().unwrap()), 2);
    }

    #[test]
    fn test_duplicate_zoom_rejected() {
        let mut grf = NewGrf::new(*b"TST\x01", "n", "d").unwrap();
        let err = grf
            .add_sprites(vec![one_sprite(), one_sprite()])
            .unwrap_err()
            .to_string();
        assert!(err.contains("zoom"), "got: {err}");
    }
}
