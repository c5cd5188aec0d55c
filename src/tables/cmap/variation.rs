//! `cmap` subtable format 14: Unicode Variation Sequences.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap#format-14-unicode-variation-sequences>

use std::cmp::Ordering;
use std::convert::TryFrom;

use log::debug;

use crate::binary::read::{
    ReadArray, ReadArrayIter, ReadBinary, ReadCtxt, ReadFrom, ReadScope, ReadUnchecked,
};
use crate::binary::{U16Be, U24Be, U32Be, U8};
use crate::error::ParseError;
use crate::tables::cmap::CodepointSet;
use crate::{GlyphId, UNICODE_MAX};

/// The result of looking up a variation sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlyphVariant {
    /// The sequence is not in the table.
    NotFound,
    /// The sequence maps to this glyph.
    Found(GlyphId),
    /// The sequence is rendered with the glyph the base character maps to on its own.
    UseDefault,
}

#[derive(Clone)]
pub struct CmapSubtableFormat14<'a> {
    scope: ReadScope<'a>,
    records: ReadArray<'a, VariationSelectorRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VariationSelectorRecord {
    pub var_selector: u32,
    pub default_uvs_offset: u32,
    pub non_default_uvs_offset: u32,
}

/// A range of base characters in a Default UVS table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UnicodeRange {
    pub start_unicode_value: u32,
    pub additional_count: u8,
}

/// A base character to glyph mapping in a Non-Default UVS table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UvsMapping {
    pub unicode_value: u32,
    pub glyph_id: u16,
}

impl ReadBinary for CmapSubtableFormat14<'_> {
    type HostType<'a> = CmapSubtableFormat14<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtableFormat14<'a>, ParseError> {
        let scope = ctxt.scope();
        let format = ctxt.read_u16be()?;
        ctxt.check(format == 14)?;
        let _length = ctxt.read_u32be()?;
        let num_records = usize::try_from(ctxt.read_u32be()?)?;
        let records = ctxt.read_array::<VariationSelectorRecord>(num_records)?;
        Ok(CmapSubtableFormat14 { scope, records })
    }
}

impl ReadFrom for VariationSelectorRecord {
    type ReadType = (U24Be, U32Be, U32Be);
    fn read_from(
        (var_selector, default_uvs_offset, non_default_uvs_offset): (u32, u32, u32),
    ) -> Self {
        VariationSelectorRecord {
            var_selector,
            default_uvs_offset,
            non_default_uvs_offset,
        }
    }
}

impl ReadFrom for UnicodeRange {
    type ReadType = (U24Be, U8);
    fn read_from((start_unicode_value, additional_count): (u32, u8)) -> Self {
        UnicodeRange {
            start_unicode_value,
            additional_count,
        }
    }
}

impl ReadFrom for UvsMapping {
    type ReadType = (U24Be, U16Be);
    fn read_from((unicode_value, glyph_id): (u32, u16)) -> Self {
        UvsMapping {
            unicode_value,
            glyph_id,
        }
    }
}

impl UnicodeRange {
    /// The last codepoint of the range. Not clamped.
    pub fn end(&self) -> u32 {
        self.start_unicode_value + u32::from(self.additional_count)
    }

    fn cmp_codepoint(&self, ch: u32) -> Ordering {
        if ch < self.start_unicode_value {
            Ordering::Greater
        } else if ch > self.end() {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl<'a> CmapSubtableFormat14<'a> {
    pub fn records(&self) -> ReadArrayIter<'a, VariationSelectorRecord> {
        self.records.iter()
    }

    /// Look up the glyph for `ch` followed by the variation selector `selector`.
    pub fn map_variant(&self, ch: u32, selector: u32) -> GlyphVariant {
        let Some(record) = self.find_record(selector) else {
            return GlyphVariant::NotFound;
        };

        let is_default = self.default_uvs(&record).map_or(false, |ranges| {
            ranges
                .binary_search_by(|range| range.cmp_codepoint(ch))
                .is_ok()
        });
        if is_default {
            return GlyphVariant::UseDefault;
        }

        let glyph_id = self.non_default_uvs(&record).and_then(|mappings| {
            let index = mappings
                .binary_search_by(|mapping| mapping.unicode_value.cmp(&ch))
                .ok()?;
            mappings.get_item(index)
        });
        match glyph_id {
            Some(UvsMapping { glyph_id, .. }) if glyph_id != 0 => {
                GlyphVariant::Found(GlyphId::from(glyph_id))
            }
            _ => GlyphVariant::NotFound,
        }
    }

    /// Add every variation selector in the table to `out`.
    pub fn collect_variation_selectors(&self, out: &mut impl CodepointSet) {
        self.records
            .iter()
            .for_each(|record| out.add(record.var_selector));
    }

    /// Add every base character that has a sequence with `selector` to `out`.
    pub fn collect_variation_codepoints(&self, selector: u32, out: &mut impl CodepointSet) {
        let Some(record) = self.find_record(selector) else {
            return;
        };

        if let Some(ranges) = self.default_uvs(&record) {
            for range in ranges.iter() {
                out.add_range(range.start_unicode_value, range.end().min(UNICODE_MAX));
            }
        }
        if let Some(mappings) = self.non_default_uvs(&record) {
            for mapping in mappings.iter() {
                out.add(mapping.unicode_value);
            }
        }
    }

    fn find_record(&self, selector: u32) -> Option<VariationSelectorRecord> {
        let index = self
            .records
            .binary_search_by(|record| record.var_selector.cmp(&selector))
            .ok()?;
        self.records.get_item(index)
    }

    fn default_uvs(
        &self,
        record: &VariationSelectorRecord,
    ) -> Option<ReadArray<'a, UnicodeRange>> {
        self.uvs_table(record.default_uvs_offset, "default")
    }

    fn non_default_uvs(
        &self,
        record: &VariationSelectorRecord,
    ) -> Option<ReadArray<'a, UvsMapping>> {
        self.uvs_table(record.non_default_uvs_offset, "non-default")
    }

    /// Read the UVS table at `offset`. A zero offset, or a table that does not fit, is absent.
    fn uvs_table<T: ReadUnchecked>(&self, offset: u32, kind: &str) -> Option<ReadArray<'a, T>> {
        if offset == 0 {
            return None;
        }
        let table = usize::try_from(offset)
            .map_err(ParseError::from)
            .and_then(|offset| read_uvs_array::<T>(self.scope.offset(offset).ctxt()));
        match table {
            Ok(table) => Some(table),
            Err(err) => {
                debug!("ignoring invalid {} UVS table at {}: {}", kind, offset, err);
                None
            }
        }
    }
}

fn read_uvs_array<T: ReadUnchecked>(
    mut ctxt: ReadCtxt<'_>,
) -> Result<ReadArray<'_, T>, ParseError> {
    let count = usize::try_from(ctxt.read_u32be()?)?;
    ctxt.read_array::<T>(count)
}
