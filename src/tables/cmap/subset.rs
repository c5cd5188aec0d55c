//! Building `cmap` tables from codepoint to glyph mappings.
//!
//! The encoders take mappings sorted by codepoint, typically the mappings that survive
//! subsetting, renumbered to the glyph ids of the subset font.

use std::convert::TryFrom;

use itertools::Itertools;

use crate::error::{ParseError, ReadWriteError, WriteError};
use crate::tables::cmap::{owned, Cmap, EncodingId, MapGroup, PlatformId};
use crate::GlyphId;

/// Which of the Unicode encoding records to emit when building a table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CmapSlots {
    /// (0, 3) Unicode BMP, format 4
    pub unicode_bmp: bool,
    /// (0, 4) Unicode full repertoire, format 12
    pub unicode_full: bool,
    /// (3, 1) Windows Unicode BMP, format 4
    pub windows_bmp: bool,
    /// (3, 10) Windows Unicode full repertoire, format 12
    pub windows_full: bool,
}

/// A run of consecutive codepoints in the format 4 encoder.
struct Segment<'m> {
    mappings: &'m [(u32, u16)],
}

impl CmapSlots {
    pub const ALL: CmapSlots = CmapSlots {
        unicode_bmp: true,
        unicode_full: true,
        windows_bmp: true,
        windows_full: true,
    };

    pub const BMP_ONLY: CmapSlots = CmapSlots {
        unicode_bmp: true,
        unicode_full: false,
        windows_bmp: true,
        windows_full: false,
    };

    /// Emit the Unicode slots that are present in `cmap`.
    ///
    /// The source must have a BMP slot, and if it has any format 12 subtable it must also have a
    /// full repertoire slot. Otherwise `ParseError::UnsuitableCmap` is returned.
    pub fn from_source(cmap: &Cmap<'_>) -> Result<Self, ParseError> {
        let has = |platform_id, encoding_id| {
            cmap.find_encoding_record(platform_id, encoding_id)
                .is_some()
        };
        let slots = CmapSlots {
            unicode_bmp: has(PlatformId::UNICODE, EncodingId::UNICODE_BMP),
            unicode_full: has(PlatformId::UNICODE, EncodingId::UNICODE_FULL),
            windows_bmp: has(PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_BMP_UCS2),
            windows_full: has(PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_UCS4),
        };

        if !slots.has_bmp() {
            return Err(ParseError::UnsuitableCmap);
        }
        if cmap.has_subtable_format(12) && !slots.has_full() {
            return Err(ParseError::UnsuitableCmap);
        }
        Ok(slots)
    }

    pub fn has_bmp(&self) -> bool {
        self.unicode_bmp || self.windows_bmp
    }

    pub fn has_full(&self) -> bool {
        self.unicode_full || self.windows_full
    }
}

/// Collect `mappings`, checking that the codepoints are strictly ascending.
fn sorted_mappings(
    mappings: impl IntoIterator<Item = (u32, GlyphId)>,
) -> Result<Vec<(u32, GlyphId)>, WriteError> {
    let mappings = mappings.into_iter().collect::<Vec<_>>();
    let ascending = mappings
        .iter()
        .tuple_windows()
        .all(|((prev, _), (ch, _))| prev < ch);
    if ascending {
        Ok(mappings)
    } else {
        Err(WriteError::BadValue)
    }
}

impl<'m> Segment<'m> {
    fn start(&self) -> u16 {
        self.mappings.first().map_or(0, |&(ch, _)| ch as u16)
    }

    fn end(&self) -> u16 {
        self.mappings.last().map_or(0, |&(ch, _)| ch as u16)
    }

    /// The delta shared by every mapping in the segment, if the glyphs increase with the
    /// codepoints.
    fn id_delta(&self) -> Option<i16> {
        let (start, start_glyph) = *self.mappings.first()?;
        let consecutive = self
            .mappings
            .iter()
            .tuple_windows()
            .all(|((_, prev), (_, glyph_id))| u32::from(*prev) + 1 == u32::from(*glyph_id));
        // Deltas are modulo 0x10000
        consecutive.then(|| start_glyph.wrapping_sub(start as u16) as i16)
    }
}

impl owned::CmapSubtableFormat4 {
    /// Encode the BMP mappings of `mappings` as a format 4 subtable.
    ///
    /// Codepoints above U+FFFF are skipped. Each run of consecutive codepoints becomes a
    /// segment, which uses an id delta when its glyphs are consecutive too and the glyph id array
    /// otherwise. The `0xFFFF` terminating segment is added unless the last mapping is for U+FFFF.
    pub fn from_mappings(
        mappings: impl IntoIterator<Item = (u32, GlyphId)>,
    ) -> Result<Self, WriteError> {
        let mappings = sorted_mappings(mappings)?
            .into_iter()
            .filter(|&(ch, _)| ch <= 0xFFFF)
            .map(|(ch, glyph_id)| Ok((ch, u16::try_from(glyph_id)?)))
            .collect::<Result<Vec<_>, WriteError>>()?;

        // Final start code and endCode values must be 0xFFFF
        let sentinel = [(0xFFFF, 0)];
        let add_sentinel = mappings.last().map_or(true, |&(ch, _)| ch != 0xFFFF);
        let mut segments = mappings
            .chunk_by(|(prev, _), (ch, _)| prev + 1 == *ch)
            .map(|mappings| Segment { mappings })
            .collect::<Vec<_>>();
        if add_sentinel {
            segments.push(Segment {
                mappings: &sentinel,
            });
        }

        let seg_count = segments.len();
        let mut table = owned::CmapSubtableFormat4 {
            language: 0,
            end_codes: Vec::with_capacity(seg_count),
            start_codes: Vec::with_capacity(seg_count),
            id_deltas: Vec::with_capacity(seg_count),
            id_range_offsets: Vec::with_capacity(seg_count),
            glyph_id_array: Vec::new(),
        };

        for (index, segment) in segments.iter().enumerate() {
            table.end_codes.push(segment.end());
            table.start_codes.push(segment.start());

            let is_sentinel = add_sentinel && index + 1 == seg_count;
            match segment.id_delta() {
                // The terminating segment maps 0xFFFF to glyph 0
                _ if is_sentinel => {
                    table.id_deltas.push(1);
                    table.id_range_offsets.push(0);
                }
                Some(delta) if delta != 0 => {
                    table.id_deltas.push(delta);
                    table.id_range_offsets.push(0);
                }
                _ => {
                    // Distance in 16-bit words from this idRangeOffset entry to the first glyph
                    // of the segment in the glyph id array.
                    let words = seg_count + table.glyph_id_array.len() - index;
                    let id_range_offset =
                        u16::try_from(2 * words).map_err(|_| WriteError::BadValue)?;
                    table.id_deltas.push(0);
                    table.id_range_offsets.push(id_range_offset);
                    table
                        .glyph_id_array
                        .extend(segment.mappings.iter().map(|&(_, glyph_id)| glyph_id));
                }
            }
        }

        Ok(table)
    }
}

impl owned::CmapSubtableFormat12 {
    /// Encode `mappings` as a format 12 subtable.
    ///
    /// Consecutive codepoints that map to consecutive glyphs are merged into one group. Returns
    /// `None` when there are no mappings.
    pub fn from_mappings(
        mappings: impl IntoIterator<Item = (u32, GlyphId)>,
    ) -> Result<Option<Self>, WriteError> {
        let mappings = sorted_mappings(mappings)?;

        let mut groups: Vec<MapGroup> = Vec::new();
        for (ch, glyph_id) in mappings {
            if let Some(group) = groups.last_mut() {
                let extends = group.end_char_code.checked_add(1) == Some(ch)
                    && ch
                        .checked_sub(group.start_char_code)
                        .and_then(|offset| group.start_glyph_id.checked_add(offset))
                        == Some(glyph_id);
                if extends {
                    group.end_char_code = ch;
                    continue;
                }
            }
            groups.push(MapGroup {
                start_char_code: ch,
                end_char_code: ch,
                start_glyph_id: glyph_id,
            });
        }

        if groups.is_empty() {
            Ok(None)
        } else {
            Ok(Some(owned::CmapSubtableFormat12 {
                language: 0,
                groups,
            }))
        }
    }
}

impl owned::Cmap {
    /// Build a `cmap` table holding the encoding records selected by `slots`.
    ///
    /// The BMP records share one format 4 subtable and the full repertoire records share one
    /// format 12 subtable. The full repertoire records are left out when there are no mappings.
    pub fn from_mappings(
        mappings: impl IntoIterator<Item = (u32, GlyphId)>,
        slots: CmapSlots,
    ) -> Result<Self, WriteError> {
        let mappings = sorted_mappings(mappings)?;
        let mut subtables = Vec::new();

        let format4 = if slots.has_bmp() {
            let subtable = owned::CmapSubtableFormat4::from_mappings(mappings.iter().copied())?;
            subtables.push(owned::CmapSubtable::Format4(subtable));
            Some(subtables.len() - 1)
        } else {
            None
        };
        let format12 = if slots.has_full() {
            owned::CmapSubtableFormat12::from_mappings(mappings)?.map(|subtable| {
                subtables.push(owned::CmapSubtable::Format12(subtable));
                subtables.len() - 1
            })
        } else {
            None
        };

        // Records must be sorted by platform and encoding
        let candidates = [
            (slots.unicode_bmp, PlatformId::UNICODE, EncodingId::UNICODE_BMP, format4),
            (slots.unicode_full, PlatformId::UNICODE, EncodingId::UNICODE_FULL, format12),
            (
                slots.windows_bmp,
                PlatformId::WINDOWS,
                EncodingId::WINDOWS_UNICODE_BMP_UCS2,
                format4,
            ),
            (
                slots.windows_full,
                PlatformId::WINDOWS,
                EncodingId::WINDOWS_UNICODE_UCS4,
                format12,
            ),
        ];
        let encoding_records = candidates
            .into_iter()
            .filter_map(|(wanted, platform_id, encoding_id, subtable)| {
                wanted.then_some(subtable).flatten().map(|subtable| owned::EncodingRecord {
                    platform_id,
                    encoding_id,
                    subtable,
                })
            })
            .collect();

        Ok(owned::Cmap {
            encoding_records,
            subtables,
        })
    }

    /// Build a table for `mappings` with the Unicode slots present in `source`.
    pub fn subset(
        source: &Cmap<'_>,
        mappings: impl IntoIterator<Item = (u32, GlyphId)>,
    ) -> Result<Self, ReadWriteError> {
        let slots = CmapSlots::from_source(source)?;
        Ok(owned::Cmap::from_mappings(mappings, slots)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::binary::write::{WriteBinary, WriteBuffer};
    use crate::tables::cmap::{CmapSubtable, CmapSubtableFormat4};
    use crate::tests::format4_subtable_abij;

    fn write_format4(table: &owned::CmapSubtableFormat4) -> Vec<u8> {
        let mut buffer = WriteBuffer::new();
        owned::CmapSubtableFormat4::write(&mut buffer, table).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_format4_subtable() {
        let mappings = vec![(97, 1), (98, 2), (105, 5), (106, 4)];
        let table = owned::CmapSubtableFormat4::from_mappings(mappings).unwrap();
        let expected = owned::CmapSubtableFormat4 {
            language: 0,
            start_codes: vec![97, 105, 0xFFFF],
            end_codes: vec![98, 106, 0xFFFF],
            id_deltas: vec![-96, 0, 1],
            id_range_offsets: vec![0, 4, 0],
            glyph_id_array: vec![5, 4],
        };
        assert_eq!(table, expected);
        assert_eq!(write_format4(&table), format4_subtable_abij());
    }

    #[test]
    fn test_format4_empty() {
        let table = owned::CmapSubtableFormat4::from_mappings(Vec::new()).unwrap();
        assert_eq!(table.start_codes, vec![0xFFFF]);
        assert_eq!(table.end_codes, vec![0xFFFF]);
        assert_eq!(table.id_deltas, vec![1]);
        assert_eq!(table.id_range_offsets, vec![0]);
        assert!(table.glyph_id_array.is_empty());

        let data = write_format4(&table);
        let subtable = ReadScope::new(&data)
            .read::<CmapSubtableFormat4<'_>>()
            .unwrap();
        assert_eq!(subtable.map_glyph(0xFFFF), None);
        assert_eq!(subtable.map_glyph(0x41), None);
    }

    #[test]
    fn test_format4_maps_u_ffff() {
        let mappings = vec![(0xFFFE, 7), (0xFFFF, 8)];
        let table = owned::CmapSubtableFormat4::from_mappings(mappings).unwrap();
        // The last segment doubles as the terminating segment
        assert_eq!(table.end_codes, vec![0xFFFF]);
        assert_eq!(table.start_codes, vec![0xFFFE]);

        let data = write_format4(&table);
        let subtable = ReadScope::new(&data)
            .read::<CmapSubtableFormat4<'_>>()
            .unwrap();
        assert_eq!(subtable.map_glyph(0xFFFE), Some(7));
        assert_eq!(subtable.map_glyph(0xFFFF), Some(8));
    }

    #[test]
    fn test_format4_zero_delta_uses_glyph_array() {
        // Glyph ids equal to the codepoints give a delta of zero
        let mappings = vec![(5, 5), (6, 6)];
        let table = owned::CmapSubtableFormat4::from_mappings(mappings).unwrap();
        assert_eq!(table.id_deltas, vec![0, 1]);
        assert_eq!(table.id_range_offsets, vec![4, 0]);
        assert_eq!(table.glyph_id_array, vec![5, 6]);
    }

    #[test]
    fn test_format4_skips_astral() {
        let mappings = vec![(0x41, 3), (0x1F600, 9)];
        let table = owned::CmapSubtableFormat4::from_mappings(mappings).unwrap();
        assert_eq!(table.start_codes, vec![0x41, 0xFFFF]);
    }

    #[test]
    fn test_format4_wide_glyph() {
        let mappings = vec![(0x41, 0x10000)];
        assert_eq!(
            owned::CmapSubtableFormat4::from_mappings(mappings),
            Err(WriteError::BadValue)
        );
    }

    #[test]
    fn test_unsorted() {
        let mappings = vec![(0x42, 3), (0x41, 2)];
        assert_eq!(
            owned::CmapSubtableFormat4::from_mappings(mappings.clone()),
            Err(WriteError::BadValue)
        );
        assert_eq!(
            owned::CmapSubtableFormat12::from_mappings(mappings.clone()),
            Err(WriteError::BadValue)
        );
        let duplicate = vec![(0x41, 3), (0x41, 2)];
        assert_eq!(
            owned::Cmap::from_mappings(duplicate, CmapSlots::ALL),
            Err(WriteError::BadValue)
        );
    }

    #[test]
    fn test_format12_merges_runs() {
        let mappings = vec![(10, 100), (11, 101), (12, 102), (20, 500)];
        let table = owned::CmapSubtableFormat12::from_mappings(mappings)
            .unwrap()
            .unwrap();
        assert_eq!(
            table.groups,
            vec![
                MapGroup {
                    start_char_code: 10,
                    end_char_code: 12,
                    start_glyph_id: 100,
                },
                MapGroup {
                    start_char_code: 20,
                    end_char_code: 20,
                    start_glyph_id: 500,
                },
            ]
        );
    }

    #[test]
    fn test_format12_breaks_on_glyph_gap() {
        let mappings = vec![(10, 100), (11, 102)];
        let table = owned::CmapSubtableFormat12::from_mappings(mappings)
            .unwrap()
            .unwrap();
        assert_eq!(table.groups.len(), 2);
    }

    #[test]
    fn test_format12_empty() {
        assert_eq!(
            owned::CmapSubtableFormat12::from_mappings(Vec::new()),
            Ok(None)
        );
    }

    #[test]
    fn test_cmap_shares_subtables() {
        let mappings = vec![(0x41, 1), (0x1F600, 2)];
        let table = owned::Cmap::from_mappings(mappings, CmapSlots::ALL).unwrap();
        assert_eq!(table.subtables.len(), 2);
        let records = table
            .encoding_records
            .iter()
            .map(|record| (record.platform_id.0, record.encoding_id.0, record.subtable))
            .collect::<Vec<_>>();
        assert_eq!(records, vec![(0, 3, 0), (0, 4, 1), (3, 1, 0), (3, 10, 1)]);
    }

    #[test]
    fn test_cmap_empty_omits_format12() {
        let table = owned::Cmap::from_mappings(Vec::new(), CmapSlots::ALL).unwrap();
        assert_eq!(table.subtables.len(), 1);
        let records = table
            .encoding_records
            .iter()
            .map(|record| (record.platform_id.0, record.encoding_id.0))
            .collect::<Vec<_>>();
        assert_eq!(records, vec![(0, 3), (3, 1)]);
    }

    #[test]
    fn test_from_source() {
        let mappings = vec![(0x41, 1), (0x1F600, 2)];
        let table = owned::Cmap::from_mappings(mappings, CmapSlots::ALL).unwrap();
        let mut buffer = WriteBuffer::new();
        owned::Cmap::write(&mut buffer, &table).unwrap();
        let data = buffer.into_inner();
        let cmap = ReadScope::new(&data).read::<Cmap<'_>>().unwrap();
        assert_eq!(CmapSlots::from_source(&cmap), Ok(CmapSlots::ALL));

        // The source has a format 12 subtable, so a BMP only table is unsuitable
        let bmp_only = owned::Cmap {
            encoding_records: vec![
                owned::EncodingRecord {
                    platform_id: PlatformId::WINDOWS,
                    encoding_id: EncodingId::WINDOWS_SYMBOL,
                    subtable: 0,
                },
                owned::EncodingRecord {
                    platform_id: PlatformId::WINDOWS,
                    encoding_id: EncodingId::WINDOWS_UNICODE_BMP_UCS2,
                    subtable: 1,
                },
            ],
            subtables: table.subtables.clone(),
        };
        let mut buffer = WriteBuffer::new();
        owned::Cmap::write(&mut buffer, &bmp_only).unwrap();
        let data = buffer.into_inner();
        let cmap = ReadScope::new(&data).read::<Cmap<'_>>().unwrap();
        assert!(matches!(
            CmapSlots::from_source(&cmap),
            Err(ParseError::UnsuitableCmap)
        ));
    }

    #[test]
    fn test_subset_round_trip() {
        let source_mappings = vec![(0x41, 1), (0x42, 2)];
        let source = owned::Cmap::from_mappings(source_mappings, CmapSlots::BMP_ONLY).unwrap();
        let mut buffer = WriteBuffer::new();
        owned::Cmap::write(&mut buffer, &source).unwrap();
        let data = buffer.into_inner();
        let cmap = ReadScope::new(&data).read::<Cmap<'_>>().unwrap();

        let subset = owned::Cmap::subset(&cmap, vec![(0x42, 1)]).unwrap();
        let mut buffer = WriteBuffer::new();
        owned::Cmap::write(&mut buffer, &subset).unwrap();
        let data = buffer.into_inner();
        let cmap = ReadScope::new(&data).read::<Cmap<'_>>().unwrap();
        let subtable = cmap
            .find_subtable(PlatformId::WINDOWS, EncodingId::WINDOWS_UNICODE_BMP_UCS2)
            .unwrap();
        assert!(matches!(subtable, CmapSubtable::Format4(_)));
        assert_eq!(subtable.map_glyph(0x41), None);
        assert_eq!(subtable.map_glyph(0x42), Some(1));
    }
}
