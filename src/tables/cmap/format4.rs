//! `cmap` subtable format 4: segment mapping to delta values.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-4-segment-mapping-to-delta-values>

use std::convert::TryFrom;

use log::debug;

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadScope};
use crate::binary::{I16Be, U16Be};
use crate::error::{ParseError, WriteError};
use crate::tables::cmap::CodepointSet;
use crate::GlyphId;

/// Size of the fixed header plus the `reservedPad` field.
const HEADER_AND_PAD_SIZE: usize = 16;

/// Offset of the `endCode` array from the start of the subtable.
const END_CODES_OFFSET: usize = 14;

#[derive(Clone)]
pub struct CmapSubtableFormat4<'a> {
    pub language: u16,
    /// The length of the subtable after clamping to the available data.
    pub length: u16,
    pub seg_count_x2: u16,
    pub search_range: u16,
    pub entry_selector: u16,
    pub range_shift: u16,
    accelerator: Format4Accelerator<'a>,
}

/// The parallel arrays of a format 4 subtable, located once and reused for every lookup.
#[derive(Clone)]
pub struct Format4Accelerator<'a> {
    seg_count: usize,
    end_codes: ReadArray<'a, U16Be>,
    start_codes: ReadArray<'a, U16Be>,
    id_deltas: ReadArray<'a, I16Be>,
    id_range_offsets: ReadArray<'a, U16Be>,
    glyph_ids: ReadArray<'a, U16Be>,
}

/// Computes the binary search header fields from the segment count.
#[derive(Copy, Clone)]
pub(crate) struct Format4Calculator {
    seg_count: u16,
}

impl ReadBinary for CmapSubtableFormat4<'_> {
    type HostType<'a> = CmapSubtableFormat4<'a>;

    /// Read and sanitize a format 4 subtable.
    ///
    /// A declared `length` that runs past the end of the data is clamped to the data that is
    /// available. The segment arrays must then fit inside that length.
    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtableFormat4<'a>, ParseError> {
        let scope = ctxt.scope();
        let format = ctxt.read_u16be()?;
        ctxt.check(format == 4)?;
        let declared_length = ctxt.read_u16be()?;
        let language = ctxt.read_u16be()?;
        let seg_count_x2 = ctxt.read_u16be()?;
        let search_range = ctxt.read_u16be()?;
        let entry_selector = ctxt.read_u16be()?;
        let range_shift = ctxt.read_u16be()?;

        let available = scope.data().len();
        let length = if usize::from(declared_length) > available {
            let clamped = u16::try_from(available).unwrap_or(u16::MAX);
            debug!(
                "cmap format 4 length {} exceeds available data, clamping to {}",
                declared_length, clamped
            );
            clamped
        } else {
            declared_length
        };
        ctxt.check(HEADER_AND_PAD_SIZE + 4 * usize::from(seg_count_x2) <= usize::from(length))?;

        let table_scope = scope.offset_length(0, usize::from(length))?;
        let accelerator = Format4Accelerator::new(table_scope, usize::from(seg_count_x2 / 2))?;

        Ok(CmapSubtableFormat4 {
            language,
            length,
            seg_count_x2,
            search_range,
            entry_selector,
            range_shift,
            accelerator,
        })
    }
}

impl<'a> CmapSubtableFormat4<'a> {
    pub fn accelerator(&self) -> &Format4Accelerator<'a> {
        &self.accelerator
    }

    pub fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        self.accelerator.map_glyph(ch)
    }

    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        self.accelerator.collect_codepoints(out)
    }
}

impl<'a> Format4Accelerator<'a> {
    /// Locate the segment arrays within `scope`, which holds exactly `length` bytes of the
    /// subtable.
    ///
    /// `length` is the clamped length, so the glyph array never extends past the data.
    fn new(scope: ReadScope<'a>, seg_count: usize) -> Result<Self, ParseError> {
        let mut ctxt = scope.offset(END_CODES_OFFSET).ctxt();
        let end_codes = ctxt.read_array::<U16Be>(seg_count)?;
        let _reserved_pad = ctxt.read_u16be()?;
        let start_codes = ctxt.read_array::<U16Be>(seg_count)?;
        let id_deltas = ctxt.read_array::<I16Be>(seg_count)?;
        let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?;
        let glyph_id_bytes = scope
            .data()
            .len()
            .checked_sub(HEADER_AND_PAD_SIZE + 8 * seg_count)
            .ok_or(ParseError::BadEof)?;
        let glyph_ids = ctxt.read_array::<U16Be>(glyph_id_bytes / 2)?;

        Ok(Format4Accelerator {
            seg_count,
            end_codes,
            start_codes,
            id_deltas,
            id_range_offsets,
            glyph_ids,
        })
    }

    pub fn seg_count(&self) -> usize {
        self.seg_count
    }

    /// The `(startCode, endCode)` pair of each segment, in table order.
    pub fn segments(&self) -> impl Iterator<Item = (u16, u16)> + 'a {
        self.start_codes.iter().zip(self.end_codes.iter())
    }

    /// Look up the glyph for `ch`. Glyph 0 is never returned.
    pub fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        let segment = self.find_segment(ch)?;
        let start_code = u32::from(self.start_codes.get_item(segment)?);
        let id_delta = i32::from(self.id_deltas.get_item(segment)?);
        let id_range_offset = self.id_range_offsets.get_item(segment)?;

        let glyph_id = if id_range_offset == 0 {
            ch.wrapping_add_signed(id_delta)
        } else {
            let index = self.glyph_index(id_range_offset, segment, ch - start_code)?;
            let glyph_id = self.glyph_ids.get_item(index)?;
            if glyph_id == 0 {
                return None;
            }
            u32::from(glyph_id).wrapping_add_signed(id_delta)
        };

        // The idDelta arithmetic is modulo 65536.
        match glyph_id & 0xFFFF {
            0 => None,
            glyph_id => Some(glyph_id),
        }
    }

    /// Add every codepoint with a glyph to `out`.
    ///
    /// A trailing `[0xFFFF, 0xFFFF]` segment that maps to no glyph only terminates the table and
    /// is skipped. One that maps U+FFFF to a glyph is reported like any other segment.
    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        let mut count = self.seg_count;
        if self.has_sentinel() {
            count -= 1;
        }

        for segment in 0..count {
            let (Some(start_code), Some(end_code), Some(id_range_offset)) = (
                self.start_codes.get_item(segment),
                self.end_codes.get_item(segment),
                self.id_range_offsets.get_item(segment),
            ) else {
                return;
            };
            let (start_code, end_code) = (u32::from(start_code), u32::from(end_code));

            if id_range_offset == 0 {
                out.add_range(start_code, end_code);
                continue;
            }

            for ch in start_code..=end_code {
                let Some(glyph_id) = self
                    .glyph_index(id_range_offset, segment, ch - start_code)
                    .and_then(|index| self.glyph_ids.get_item(index))
                else {
                    break;
                };
                if glyph_id != 0 {
                    out.add(ch);
                }
            }
        }
    }

    fn has_sentinel(&self) -> bool {
        self.start_codes.last() == Some(0xFFFF)
            && self.end_codes.last() == Some(0xFFFF)
            && self.map_glyph(0xFFFF).is_none()
    }

    // Two-array binary search: a segment matches when start_code <= ch <= end_code.
    fn find_segment(&self, ch: u32) -> Option<usize> {
        let mut low = 0;
        let mut high = self.seg_count;
        while low < high {
            let mid = low + (high - low) / 2;
            if ch < u32::from(self.start_codes.get_item(mid)?) {
                high = mid;
            } else if ch > u32::from(self.end_codes.get_item(mid)?) {
                low = mid + 1;
            } else {
                return Some(mid);
            }
        }
        None
    }

    /// Index into the glyph array for the codepoint `offset` places past the start of `segment`.
    ///
    /// `id_range_offset` is measured in bytes from the segment's own entry in the
    /// idRangeOffset array, which immediately precedes the glyph array.
    fn glyph_index(&self, id_range_offset: u16, segment: usize, offset: u32) -> Option<usize> {
        let offset = usize::try_from(offset).ok()?;
        (usize::from(id_range_offset) / 2 + offset + segment).checked_sub(self.seg_count)
    }
}

impl Format4Calculator {
    /// The segment count must fit in `segCountX2`.
    pub(crate) fn new(seg_count: usize) -> Result<Self, WriteError> {
        match u16::try_from(seg_count) {
            Ok(seg_count) if seg_count <= 0x7FFF => Ok(Format4Calculator { seg_count }),
            _ => Err(WriteError::BadValue),
        }
    }

    pub(crate) fn seg_count_x2(self) -> u16 {
        2 * self.seg_count
    }

    pub(crate) fn search_range(self) -> u16 {
        2 * (1 << self.entry_selector())
    }

    pub(crate) fn entry_selector(self) -> u16 {
        self.seg_count.checked_ilog2().unwrap_or(0) as u16
    }

    pub(crate) fn range_shift(self) -> u16 {
        self.seg_count_x2().saturating_sub(self.search_range())
    }
}
