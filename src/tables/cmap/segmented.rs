//! `cmap` subtable formats 12 and 13: sequential and many-to-one range mappings.
//!
//! Both formats share the same layout, a sorted list of 32-bit groups. They differ only in how
//! a group maps the codepoints it covers.

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::marker::PhantomData;

use crate::binary::read::{ReadArray, ReadArrayIter, ReadBinary, ReadCtxt, ReadFrom};
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::U32Be;
use crate::error::{ParseError, WriteError};
use crate::tables::cmap::CodepointSet;
use crate::{GlyphId, UNICODE_MAX};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MapGroup {
    pub start_char_code: u32,
    pub end_char_code: u32,
    pub start_glyph_id: u32,
}

/// How a group maps a codepoint it contains to a glyph.
pub trait GroupMapping {
    const FORMAT: u16;

    fn glyph_id(group: &MapGroup, ch: u32) -> GlyphId;
}

/// Segmented coverage: consecutive codepoints map to consecutive glyphs.
#[derive(Debug, Copy, Clone)]
pub enum SequentialMapping {}

/// Many-to-one range mappings: every codepoint in a group maps to the same glyph.
#[derive(Debug, Copy, Clone)]
pub enum ConstantMapping {}

#[derive(Clone)]
pub struct CmapSubtableLongSegmented<'a, T> {
    pub language: u32,
    groups: ReadArray<'a, MapGroup>,
    mapping: PhantomData<T>,
}

pub type CmapSubtableFormat12<'a> = CmapSubtableLongSegmented<'a, SequentialMapping>;
pub type CmapSubtableFormat13<'a> = CmapSubtableLongSegmented<'a, ConstantMapping>;

impl GroupMapping for SequentialMapping {
    const FORMAT: u16 = 12;

    fn glyph_id(group: &MapGroup, ch: u32) -> GlyphId {
        if group.start_char_code <= group.end_char_code {
            group
                .start_glyph_id
                .wrapping_add(ch.wrapping_sub(group.start_char_code))
        } else {
            0
        }
    }
}

impl GroupMapping for ConstantMapping {
    const FORMAT: u16 = 13;

    fn glyph_id(group: &MapGroup, _ch: u32) -> GlyphId {
        group.start_glyph_id
    }
}

impl ReadFrom for MapGroup {
    type ReadType = (U32Be, U32Be, U32Be);
    fn read_from((start_char_code, end_char_code, start_glyph_id): (u32, u32, u32)) -> Self {
        MapGroup {
            start_char_code,
            end_char_code,
            start_glyph_id,
        }
    }
}

impl WriteBinary for MapGroup {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, group: MapGroup) -> Result<(), WriteError> {
        U32Be::write(ctxt, group.start_char_code)?;
        U32Be::write(ctxt, group.end_char_code)?;
        U32Be::write(ctxt, group.start_glyph_id)?;

        Ok(())
    }
}

impl MapGroup {
    /// Order of this group relative to `ch`, `Equal` when the group contains it.
    fn cmp_codepoint(&self, ch: u32) -> Ordering {
        if ch < self.start_char_code {
            Ordering::Greater
        } else if ch > self.end_char_code {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl<T: GroupMapping> ReadBinary for CmapSubtableLongSegmented<'_, T> {
    type HostType<'a> = CmapSubtableLongSegmented<'a, T>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtableLongSegmented<'a, T>, ParseError> {
        let format = ctxt.read_u16be()?;
        ctxt.check(format == T::FORMAT)?;
        let _reserved = ctxt.read_u16be()?;
        let _length = ctxt.read_u32be()?;
        let language = ctxt.read_u32be()?;
        let num_groups = usize::try_from(ctxt.read_u32be()?)?;
        let groups = ctxt.read_array::<MapGroup>(num_groups)?;
        Ok(CmapSubtableLongSegmented {
            language,
            groups,
            mapping: PhantomData,
        })
    }
}

impl<'a, T: GroupMapping> CmapSubtableLongSegmented<'a, T> {
    pub fn groups(&self) -> ReadArrayIter<'a, MapGroup> {
        self.groups.iter()
    }

    pub fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        let index = self
            .groups
            .binary_search_by(|group| group.cmp_codepoint(ch))
            .ok()?;
        let group = self.groups.get_item(index)?;
        match T::glyph_id(&group, ch) {
            0 => None,
            glyph_id => Some(glyph_id),
        }
    }

    /// Add the codepoints of every group to `out`.
    ///
    /// Group ends are clamped to the last Unicode scalar value.
    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        for group in self.groups.iter() {
            out.add_range(
                group.start_char_code,
                group.end_char_code.min(UNICODE_MAX),
            );
        }
    }
}
