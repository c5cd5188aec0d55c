//! `cmap` subtable formats 0, 6 and 10: dense glyph arrays.

use std::convert::TryFrom;

use crate::binary::read::{ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt};
use crate::binary::{U16Be, U8};
use crate::error::ParseError;
use crate::tables::cmap::CodepointSet;
use crate::GlyphId;

/// Format 0: byte encoding table. Maps the codepoints 0..=255 only.
#[derive(Clone)]
pub struct CmapSubtableFormat0<'a> {
    pub language: u16,
    glyph_ids: ReadArray<'a, U8>,
}

/// The layout of a trimmed table. Format 6 uses 16-bit header fields, format 10 32-bit ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrimmedFormat {
    Format6,
    Format10,
}

/// Formats 6 and 10: a single contiguous range of codepoints starting at `start_char_code`.
#[derive(Clone)]
pub struct CmapSubtableTrimmed<'a> {
    pub language: u32,
    pub start_char_code: u32,
    glyph_ids: ReadArray<'a, U16Be>,
}

impl ReadBinary for CmapSubtableFormat0<'_> {
    type HostType<'a> = CmapSubtableFormat0<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtableFormat0<'a>, ParseError> {
        let format = ctxt.read_u16be()?;
        ctxt.check(format == 0)?;
        let _length = ctxt.read_u16be()?;
        let language = ctxt.read_u16be()?;
        let glyph_ids = ctxt.read_array::<U8>(256)?;
        Ok(CmapSubtableFormat0 {
            language,
            glyph_ids,
        })
    }
}

impl<'a> CmapSubtableFormat0<'a> {
    pub fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        let index = usize::try_from(ch).ok()?;
        match self.glyph_ids.get_item(index)? {
            0 => None,
            glyph_id => Some(GlyphId::from(glyph_id)),
        }
    }

    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        (0u32..)
            .zip(self.glyph_ids.iter())
            .filter(|&(_, glyph_id)| glyph_id != 0)
            .for_each(|(ch, _)| out.add(ch));
    }
}

impl TrimmedFormat {
    fn format(self) -> u16 {
        match self {
            TrimmedFormat::Format6 => 6,
            TrimmedFormat::Format10 => 10,
        }
    }

    fn read_field(self, ctxt: &mut ReadCtxt<'_>) -> Result<u32, ParseError> {
        match self {
            TrimmedFormat::Format6 => Ok(u32::from(ctxt.read_u16be()?)),
            TrimmedFormat::Format10 => Ok(ctxt.read_u32be()?),
        }
    }
}

impl<'b> ReadBinaryDep for CmapSubtableTrimmed<'b> {
    type Args<'a> = TrimmedFormat;
    type HostType<'a> = CmapSubtableTrimmed<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        layout: TrimmedFormat,
    ) -> Result<CmapSubtableTrimmed<'a>, ParseError> {
        let format = ctxt.read_u16be()?;
        ctxt.check(format == layout.format())?;
        if layout == TrimmedFormat::Format10 {
            let _reserved = ctxt.read_u16be()?;
        }
        let _length = layout.read_field(ctxt)?;
        let language = layout.read_field(ctxt)?;
        let start_char_code = layout.read_field(ctxt)?;
        let count = usize::try_from(layout.read_field(ctxt)?)?;
        let glyph_ids = ctxt.read_array::<U16Be>(count)?;
        Ok(CmapSubtableTrimmed {
            language,
            start_char_code,
            glyph_ids,
        })
    }
}

impl<'a> CmapSubtableTrimmed<'a> {
    /// Number of codepoints covered, starting at `start_char_code`.
    pub fn len(&self) -> usize {
        self.glyph_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyph_ids.is_empty()
    }

    pub fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        let index = usize::try_from(ch.checked_sub(self.start_char_code)?).ok()?;
        match self.glyph_ids.get_item(index)? {
            0 => None,
            glyph_id => Some(GlyphId::from(glyph_id)),
        }
    }

    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        let start = self.start_char_code;
        for (offset, glyph_id) in (0u32..).zip(self.glyph_ids.iter()) {
            if glyph_id == 0 {
                continue;
            }
            match start.checked_add(offset) {
                Some(ch) => out.add(ch),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::writer::{self, TtfType::*};

    #[test]
    fn test_format0() {
        let mut glyph_ids = [0u8; 256];
        glyph_ids[0x20] = 3;
        glyph_ids[0xFF] = 9;
        let mut data = writer::convert(&[UInt16(0), UInt16(262), UInt16(0)]);
        data.extend_from_slice(&glyph_ids);

        let subtable = ReadScope::new(&data)
            .read::<CmapSubtableFormat0<'_>>()
            .unwrap();
        assert_eq!(subtable.map_glyph(0x20), Some(3));
        assert_eq!(subtable.map_glyph(0x21), None);
        assert_eq!(subtable.map_glyph(0xFF), Some(9));
        assert_eq!(subtable.map_glyph(0x100), None);

        let mut set = BTreeSet::new();
        subtable.collect_codepoints(&mut set);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0x20, 0xFF]);
    }

    #[test]
    fn test_format0_truncated() {
        let data = writer::convert(&[UInt16(0), UInt16(262), UInt16(0), UInt8(1)]);
        assert!(ReadScope::new(&data)
            .read::<CmapSubtableFormat0<'_>>()
            .is_err());
    }

    #[test]
    fn test_format10() {
        let data = writer::convert(&[
            UInt16(10),      // format
            UInt16(0),       // reserved
            UInt32(26),      // length
            UInt32(0),       // language
            UInt32(0x1F600), // start char code
            UInt32(3),       // num chars
            UInt16(7),
            UInt16(0),
            UInt16(8),
        ]);
        let subtable = ReadScope::new(&data)
            .read_dep::<CmapSubtableTrimmed<'_>>(TrimmedFormat::Format10)
            .unwrap();
        assert_eq!(subtable.len(), 3);
        assert_eq!(subtable.map_glyph(0x1F5FF), None);
        assert_eq!(subtable.map_glyph(0x1F600), Some(7));
        assert_eq!(subtable.map_glyph(0x1F601), None);
        assert_eq!(subtable.map_glyph(0x1F602), Some(8));
        assert_eq!(subtable.map_glyph(0x1F603), None);

        let mut set = BTreeSet::new();
        subtable.collect_codepoints(&mut set);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0x1F600, 0x1F602]);
    }

    #[test]
    fn test_format6_count_past_end() {
        let data = writer::convert(&[
            UInt16(6),
            UInt16(14),
            UInt16(0),
            UInt16(0x20),
            UInt16(100), // count
            UInt16(1),
            UInt16(2),
        ]);
        assert!(ReadScope::new(&data)
            .read_dep::<CmapSubtableTrimmed<'_>>(TrimmedFormat::Format6)
            .is_err());
    }

    #[test]
    fn test_wrong_format() {
        let data = writer::convert(&[UInt16(6), UInt16(10), UInt16(0), UInt16(0), UInt16(0)]);
        assert!(ReadScope::new(&data)
            .read_dep::<CmapSubtableTrimmed<'_>>(TrimmedFormat::Format10)
            .is_err());
    }
}
