//! Parsing and writing of the `cmap` table.
//!
//! The `cmap` table maps character codes to glyph indices. It holds a list of encoding records,
//! each naming a platform and encoding and pointing at a subtable in one of several formats.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/cmap>

use std::collections::{BTreeSet, HashSet};
use std::convert::TryFrom;
use std::hash::BuildHasher;

use log::warn;

use crate::binary::read::{ReadArray, ReadArrayIter, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::{U16Be, U32Be};
use crate::error::ParseError;
use crate::GlyphId;

pub mod format4;
pub mod segmented;
pub mod subset;
pub mod trimmed;
pub mod variation;

pub use format4::{CmapSubtableFormat4, Format4Accelerator};
pub use segmented::{CmapSubtableFormat12, CmapSubtableFormat13, MapGroup};
pub use subset::CmapSlots;
pub use trimmed::{CmapSubtableFormat0, CmapSubtableTrimmed, TrimmedFormat};
pub use variation::{CmapSubtableFormat14, GlyphVariant, VariationSelectorRecord};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const WINDOWS: PlatformId = PlatformId(3);
    pub const CUSTOM: PlatformId = PlatformId(4);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const UNICODE_1_0: EncodingId = EncodingId(0);
    pub const UNICODE_1_1: EncodingId = EncodingId(1);
    pub const UNICODE_ISO_10646: EncodingId = EncodingId(2);
    pub const UNICODE_BMP: EncodingId = EncodingId(3);
    pub const UNICODE_FULL: EncodingId = EncodingId(4);
    pub const UNICODE_VARIATION: EncodingId = EncodingId(5);
    pub const UNICODE_FULL_REPERTOIRE: EncodingId = EncodingId(6);

    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP_UCS2: EncodingId = EncodingId(1);
    pub const WINDOWS_SHIFT_JIS: EncodingId = EncodingId(2);
    pub const WINDOWS_PRC: EncodingId = EncodingId(3);
    pub const WINDOWS_BIG5: EncodingId = EncodingId(4);
    pub const WINDOWS_WANSUNG: EncodingId = EncodingId(5);
    pub const WINDOWS_JOHAB: EncodingId = EncodingId(6);
    // pub const WINDOWS_RESERVED: EncodingId = EncodingId(7);
    // pub const WINDOWS_RESERVED: EncodingId = EncodingId(8);
    // pub const WINDOWS_RESERVED: EncodingId = EncodingId(9);
    pub const WINDOWS_UNICODE_UCS4: EncodingId = EncodingId(10);

    pub const MACINTOSH_APPLE_ROMAN: EncodingId = EncodingId(0);
}

/// How the codepoints passed to a subtable are interpreted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Encoding {
    Unicode = 1,
    /// Windows symbol encoding. Characters are usually mapped in the U+F000..U+F0FF range.
    Symbol = 2,
}

/// Unicode subtables in the order they are preferred by `Cmap::find_best_subtable`.
const UNICODE_SUBTABLE_PRIORITY: [(PlatformId, EncodingId); 8] = [
    // 32-bit subtables
    (PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_UCS4),
    (PlatformId::UNICODE, EncodingId::UNICODE_FULL_REPERTOIRE),
    (PlatformId::UNICODE, EncodingId::UNICODE_FULL),
    // 16-bit subtables
    (PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_BMP_UCS2),
    (PlatformId::UNICODE, EncodingId::UNICODE_BMP),
    (PlatformId::UNICODE, EncodingId::UNICODE_ISO_10646),
    (PlatformId::UNICODE, EncodingId::UNICODE_1_1),
    (PlatformId::UNICODE, EncodingId::UNICODE_1_0),
];

/// A growable set of codepoints that coverage queries add to.
pub trait CodepointSet {
    fn add(&mut self, codepoint: u32);

    /// Add every codepoint in the inclusive range `first..=last`.
    ///
    /// Nothing is added when `first > last`.
    fn add_range(&mut self, first: u32, last: u32) {
        if first <= last {
            (first..=last).for_each(|codepoint| self.add(codepoint));
        }
    }
}

impl CodepointSet for BTreeSet<u32> {
    fn add(&mut self, codepoint: u32) {
        self.insert(codepoint);
    }
}

impl<S: BuildHasher> CodepointSet for HashSet<u32, S> {
    fn add(&mut self, codepoint: u32) {
        self.insert(codepoint);
    }

    fn add_range(&mut self, first: u32, last: u32) {
        if first <= last {
            self.extend(first..=last);
        }
    }
}

#[derive(Clone)]
pub struct Cmap<'a> {
    pub scope: ReadScope<'a>,
    encoding_records: ReadArray<'a, EncodingRecord>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

/// A decoded `cmap` subtable.
///
/// Formats 2 and 8 are deliberately not decoded. They, and any unknown format, are represented
/// by `Unsupported` which maps nothing.
#[derive(Clone)]
pub enum CmapSubtable<'a> {
    Format0(CmapSubtableFormat0<'a>),
    Format4(CmapSubtableFormat4<'a>),
    Format6(CmapSubtableTrimmed<'a>),
    Format10(CmapSubtableTrimmed<'a>),
    Format12(CmapSubtableFormat12<'a>),
    Format13(CmapSubtableFormat13<'a>),
    Format14(CmapSubtableFormat14<'a>),
    Unsupported(u16),
}

impl ReadBinary for Cmap<'_> {
    type HostType<'a> = Cmap<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Cmap<'a>, ParseError> {
        let scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check_version(version == 0)?;
        let num_tables = usize::from(ctxt.read_u16be()?);
        let encoding_records = ctxt.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            scope,
            encoding_records,
        })
    }
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);
    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl ReadBinary for CmapSubtable<'_> {
    type HostType<'a> = CmapSubtable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtable<'a>, ParseError> {
        let format = ctxt.scope().read::<U16Be>()?;
        match format {
            0 => ctxt
                .read::<CmapSubtableFormat0<'_>>()
                .map(CmapSubtable::Format0),
            4 => ctxt
                .read::<CmapSubtableFormat4<'_>>()
                .map(CmapSubtable::Format4),
            6 => ctxt
                .read_dep::<CmapSubtableTrimmed<'_>>(TrimmedFormat::Format6)
                .map(CmapSubtable::Format6),
            10 => ctxt
                .read_dep::<CmapSubtableTrimmed<'_>>(TrimmedFormat::Format10)
                .map(CmapSubtable::Format10),
            12 => ctxt
                .read::<CmapSubtableFormat12<'_>>()
                .map(CmapSubtable::Format12),
            13 => ctxt
                .read::<CmapSubtableFormat13<'_>>()
                .map(CmapSubtable::Format13),
            14 => ctxt
                .read::<CmapSubtableFormat14<'_>>()
                .map(CmapSubtable::Format14),
            _ => Ok(CmapSubtable::Unsupported(format)),
        }
    }
}

impl<'a> Cmap<'a> {
    pub fn encoding_records(&self) -> ReadArrayIter<'a, EncodingRecord> {
        self.encoding_records.iter()
    }

    /// Find the encoding record for `platform_id` and `encoding_id`.
    ///
    /// Encoding records are required to be sorted so this is a binary search. If the table holds
    /// duplicate records for the pair any one of them may be returned.
    pub fn find_encoding_record(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        let key = (platform_id.0, encoding_id.0);
        let index = self
            .encoding_records
            .binary_search_by(|record| (record.platform_id, record.encoding_id).cmp(&key))
            .ok()?;
        self.encoding_records.get_item(index)
    }

    /// Find and read the subtable for `platform_id` and `encoding_id`.
    ///
    /// A record with a zero offset, or whose subtable fails to read, is treated as absent.
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<CmapSubtable<'a>> {
        let record = self.find_encoding_record(platform_id, encoding_id)?;
        self.subtable(&record)
    }

    /// Read the subtable pointed at by `record`.
    pub fn read_subtable(&self, record: &EncodingRecord) -> Result<CmapSubtable<'a>, ParseError> {
        if record.offset == 0 {
            return Err(ParseError::BadOffset);
        }
        let offset = usize::try_from(record.offset)?;
        self.scope.offset(offset).read::<CmapSubtable<'_>>()
    }

    fn subtable(&self, record: &EncodingRecord) -> Option<CmapSubtable<'a>> {
        if record.offset == 0 {
            return None;
        }
        match self.read_subtable(record) {
            Ok(subtable) => Some(subtable),
            Err(err) => {
                warn!(
                    "skipping invalid cmap subtable ({}, {}): {}",
                    record.platform_id, record.encoding_id, err
                );
                None
            }
        }
    }

    /// Select the subtable best suited to mapping Unicode codepoints.
    ///
    /// Full repertoire Unicode subtables are preferred over BMP only ones. A Windows symbol
    /// subtable is used only when there is no Unicode subtable.
    pub fn find_best_subtable(&self) -> Option<(Encoding, CmapSubtable<'a>)> {
        let unicode = UNICODE_SUBTABLE_PRIORITY
            .iter()
            .find_map(|&(platform_id, encoding_id)| self.find_subtable(platform_id, encoding_id));
        if let Some(subtable) = unicode {
            return Some((Encoding::Unicode, subtable));
        }

        // MS Symbol
        self.find_subtable(PlatformId::WINDOWS, EncodingId::WINDOWS_SYMBOL)
            .map(|subtable| (Encoding::Symbol, subtable))
    }

    /// The Unicode Variation Sequences subtable, if the table has one.
    pub fn variation_subtable(&self) -> Option<CmapSubtableFormat14<'a>> {
        match self.find_subtable(PlatformId::UNICODE, EncodingId::UNICODE_VARIATION)? {
            CmapSubtable::Format14(subtable) => Some(subtable),
            _ => None,
        }
    }

    /// Returns true if any encoding record points at a readable subtable in `format`.
    pub fn has_subtable_format(&self, format: u16) -> bool {
        self.encoding_records()
            .filter_map(|record| self.subtable(&record))
            .any(|subtable| subtable.format() == format)
    }
}

impl<'a> CmapSubtable<'a> {
    pub fn format(&self) -> u16 {
        match self {
            CmapSubtable::Format0(_) => 0,
            CmapSubtable::Format4(_) => 4,
            CmapSubtable::Format6(_) => 6,
            CmapSubtable::Format10(_) => 10,
            CmapSubtable::Format12(_) => 12,
            CmapSubtable::Format13(_) => 13,
            CmapSubtable::Format14(_) => 14,
            CmapSubtable::Unsupported(format) => *format,
        }
    }

    /// Look up the glyph for `ch`. Glyph 0 is never returned.
    ///
    /// The variation subtable (format 14) maps nothing on its own and always returns `None`.
    pub fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        match self {
            CmapSubtable::Format0(subtable) => subtable.map_glyph(ch),
            CmapSubtable::Format4(subtable) => subtable.map_glyph(ch),
            CmapSubtable::Format6(subtable) | CmapSubtable::Format10(subtable) => {
                subtable.map_glyph(ch)
            }
            CmapSubtable::Format12(subtable) => subtable.map_glyph(ch),
            CmapSubtable::Format13(subtable) => subtable.map_glyph(ch),
            CmapSubtable::Format14(_) | CmapSubtable::Unsupported(_) => None,
        }
    }

    /// Add every codepoint this subtable maps to `out`.
    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        match self {
            CmapSubtable::Format0(subtable) => subtable.collect_codepoints(out),
            CmapSubtable::Format4(subtable) => subtable.collect_codepoints(out),
            CmapSubtable::Format6(subtable) | CmapSubtable::Format10(subtable) => {
                subtable.collect_codepoints(out)
            }
            CmapSubtable::Format12(subtable) => subtable.collect_codepoints(out),
            CmapSubtable::Format13(subtable) => subtable.collect_codepoints(out),
            CmapSubtable::Format14(_) | CmapSubtable::Unsupported(_) => {}
        }
    }

    /// Collect the codepoints of this subtable into a new set.
    pub fn codepoints(&self) -> BTreeSet<u32> {
        let mut set = BTreeSet::new();
        self.collect_codepoints(&mut set);
        set
    }
}

pub mod owned {
    //! Owned `cmap` tables that can be written out.
    //!
    //! Several encoding records may point at the same subtable, in which case it is written once.

    use std::convert::TryFrom;

    use super::{EncodingId, MapGroup, PlatformId};
    use crate::binary::write::{WriteBinary, WriteContext};
    use crate::binary::{I16Be, U16Be, U32Be};
    use crate::error::WriteError;
    use crate::tables::cmap::format4::Format4Calculator;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Cmap {
        pub encoding_records: Vec<EncodingRecord>,
        pub subtables: Vec<CmapSubtable>,
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct EncodingRecord {
        pub platform_id: PlatformId,
        pub encoding_id: EncodingId,
        /// Index into `Cmap::subtables`
        pub subtable: usize,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CmapSubtable {
        Format4(CmapSubtableFormat4),
        Format12(CmapSubtableFormat12),
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CmapSubtableFormat4 {
        pub language: u16,
        pub end_codes: Vec<u16>,
        pub start_codes: Vec<u16>,
        pub id_deltas: Vec<i16>,
        pub id_range_offsets: Vec<u16>,
        pub glyph_id_array: Vec<u16>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CmapSubtableFormat12 {
        pub language: u32,
        pub groups: Vec<MapGroup>,
    }

    impl WriteBinary<&Self> for Cmap {
        type Output = ();

        fn write<C: WriteContext>(ctxt: &mut C, table: &Cmap) -> Result<(), WriteError> {
            let start = ctxt.bytes_written();
            U16Be::write(ctxt, 0u16)?; // version
            U16Be::write(ctxt, u16::try_from(table.encoding_records.len())?)?;

            // encoding records
            let mut placeholders = Vec::with_capacity(table.encoding_records.len());
            for record in &table.encoding_records {
                U16Be::write(ctxt, record.platform_id.0)?;
                U16Be::write(ctxt, record.encoding_id.0)?;
                placeholders.push(ctxt.placeholder::<U32Be, u32>()?);
            }

            // sub-tables
            let mut offsets = Vec::with_capacity(table.subtables.len());
            for subtable in &table.subtables {
                offsets.push(u32::try_from(ctxt.bytes_written() - start)?);
                CmapSubtable::write(ctxt, subtable)?;
            }

            for (record, placeholder) in table.encoding_records.iter().zip(placeholders) {
                let offset = offsets
                    .get(record.subtable)
                    .copied()
                    .ok_or(WriteError::BadValue)?;
                ctxt.write_placeholder(placeholder, offset)?;
            }

            Ok(())
        }
    }

    impl WriteBinary<&Self> for CmapSubtable {
        type Output = ();

        fn write<C: WriteContext>(ctxt: &mut C, table: &CmapSubtable) -> Result<(), WriteError> {
            match table {
                CmapSubtable::Format4(subtable) => CmapSubtableFormat4::write(ctxt, subtable),
                CmapSubtable::Format12(subtable) => CmapSubtableFormat12::write(ctxt, subtable),
            }
        }
    }

    impl WriteBinary<&Self> for CmapSubtableFormat4 {
        type Output = ();

        fn write<C: WriteContext>(
            ctxt: &mut C,
            table: &CmapSubtableFormat4,
        ) -> Result<(), WriteError> {
            let seg_count = table.start_codes.len();
            if table.end_codes.len() != seg_count
                || table.id_deltas.len() != seg_count
                || table.id_range_offsets.len() != seg_count
            {
                return Err(WriteError::BadValue);
            }

            let start = ctxt.bytes_written();
            let calc = Format4Calculator::new(seg_count)?;

            U16Be::write(ctxt, 4u16)?; // format
            let length = ctxt.placeholder::<U16Be, u16>()?;
            U16Be::write(ctxt, table.language)?;
            U16Be::write(ctxt, calc.seg_count_x2())?;
            U16Be::write(ctxt, calc.search_range())?;
            U16Be::write(ctxt, calc.entry_selector())?;
            U16Be::write(ctxt, calc.range_shift())?;
            ctxt.write_iter::<U16Be, _>(table.end_codes.iter().copied())?;
            U16Be::write(ctxt, 0u16)?; // reserved_pad
            ctxt.write_iter::<U16Be, _>(table.start_codes.iter().copied())?;
            ctxt.write_iter::<I16Be, _>(table.id_deltas.iter().copied())?;
            ctxt.write_iter::<U16Be, _>(table.id_range_offsets.iter().copied())?;
            ctxt.write_iter::<U16Be, _>(table.glyph_id_array.iter().copied())?;
            ctxt.write_placeholder(length, u16::try_from(ctxt.bytes_written() - start)?)?;

            Ok(())
        }
    }

    impl WriteBinary<&Self> for CmapSubtableFormat12 {
        type Output = ();

        fn write<C: WriteContext>(
            ctxt: &mut C,
            table: &CmapSubtableFormat12,
        ) -> Result<(), WriteError> {
            let start = ctxt.bytes_written();

            U16Be::write(ctxt, 12u16)?; // format
            U16Be::write(ctxt, 0u16)?; // reserved
            let length = ctxt.placeholder::<U32Be, u32>()?;
            U32Be::write(ctxt, table.language)?;
            U32Be::write(ctxt, u32::try_from(table.groups.len())?)?;
            ctxt.write_iter::<MapGroup, _>(table.groups.iter().copied())?;
            ctxt.write_placeholder(length, u32::try_from(ctxt.bytes_written() - start)?)?;

            Ok(())
        }
    }
}
