#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};

/// A format 4 segment: start code, end code, id delta and id range offset.
pub type Segment = (u16, u16, i16, u16);

/// Assemble a `cmap` table. `records` are (platform id, encoding id, index into `subtables`)
/// and must already be sorted.
pub fn cmap(records: &[(u16, u16, usize)], subtables: &[Vec<u8>]) -> Vec<u8> {
    let mut data = Vec::new();
    let header_len = 4 + 8 * records.len();
    let mut offsets = Vec::with_capacity(subtables.len());
    let mut offset = header_len;
    for subtable in subtables {
        offsets.push(offset);
        offset += subtable.len();
    }

    data.write_u16::<BigEndian>(0).unwrap(); // version
    data.write_u16::<BigEndian>(records.len() as u16).unwrap(); // num_tables
    for &(platform_id, encoding_id, index) in records {
        data.write_u16::<BigEndian>(platform_id).unwrap();
        data.write_u16::<BigEndian>(encoding_id).unwrap();
        data.write_u32::<BigEndian>(offsets[index] as u32).unwrap();
    }
    for subtable in subtables {
        data.extend_from_slice(subtable);
    }
    data
}

/// Assemble a format 4 subtable. When `length` is `None` the actual length is written.
pub fn format4(segments: &[Segment], glyph_ids: &[u16], length: Option<u16>) -> Vec<u8> {
    let seg_count = segments.len() as u16;
    let entry_selector = if seg_count == 0 {
        0
    } else {
        15 - seg_count.leading_zeros() as u16
    };
    let search_range = 2 * (1 << entry_selector);
    let actual_length = 16 + 8 * segments.len() + 2 * glyph_ids.len();

    let mut data = Vec::new();
    data.write_u16::<BigEndian>(4).unwrap(); // format
    data.write_u16::<BigEndian>(length.unwrap_or(actual_length as u16)).unwrap();
    data.write_u16::<BigEndian>(0).unwrap(); // language
    data.write_u16::<BigEndian>(2 * seg_count).unwrap();
    data.write_u16::<BigEndian>(search_range).unwrap();
    data.write_u16::<BigEndian>(entry_selector).unwrap();
    data.write_u16::<BigEndian>((2 * seg_count).saturating_sub(search_range)).unwrap();
    for &(_, end, _, _) in segments {
        data.write_u16::<BigEndian>(end).unwrap();
    }
    data.write_u16::<BigEndian>(0).unwrap(); // reserved_pad
    for &(start, _, _, _) in segments {
        data.write_u16::<BigEndian>(start).unwrap();
    }
    for &(_, _, delta, _) in segments {
        data.write_i16::<BigEndian>(delta).unwrap();
    }
    for &(_, _, _, range_offset) in segments {
        data.write_u16::<BigEndian>(range_offset).unwrap();
    }
    for &glyph_id in glyph_ids {
        data.write_u16::<BigEndian>(glyph_id).unwrap();
    }
    data
}

/// Assemble a format 12 subtable from (start, end, start glyph) groups.
pub fn format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut data = Vec::new();
    data.write_u16::<BigEndian>(12).unwrap(); // format
    data.write_u16::<BigEndian>(0).unwrap(); // reserved
    data.write_u32::<BigEndian>(16 + 12 * groups.len() as u32).unwrap();
    data.write_u32::<BigEndian>(0).unwrap(); // language
    data.write_u32::<BigEndian>(groups.len() as u32).unwrap();
    for &(start, end, glyph_id) in groups {
        data.write_u32::<BigEndian>(start).unwrap();
        data.write_u32::<BigEndian>(end).unwrap();
        data.write_u32::<BigEndian>(glyph_id).unwrap();
    }
    data
}

/// A format 14 selector record: the selector, its default ranges as (start, additional count)
/// and its non-default mappings as (codepoint, glyph).
pub struct SelectorRecord {
    pub selector: u32,
    pub default_uvs: Vec<(u32, u8)>,
    pub non_default_uvs: Vec<(u32, u16)>,
}

/// Assemble a format 14 subtable. Empty UVS tables are written as a zero offset.
pub fn format14(records: &[SelectorRecord]) -> Vec<u8> {
    let mut tables = Vec::new();
    let mut offsets = Vec::with_capacity(records.len());
    let header_len = 10 + 11 * records.len();
    for record in records {
        let default_offset = if record.default_uvs.is_empty() {
            0
        } else {
            let offset = header_len + tables.len();
            tables.write_u32::<BigEndian>(record.default_uvs.len() as u32).unwrap();
            for &(start, additional_count) in &record.default_uvs {
                tables.write_u24::<BigEndian>(start).unwrap();
                tables.write_u8(additional_count).unwrap();
            }
            offset
        };
        let non_default_offset = if record.non_default_uvs.is_empty() {
            0
        } else {
            let offset = header_len + tables.len();
            tables.write_u32::<BigEndian>(record.non_default_uvs.len() as u32).unwrap();
            for &(unicode_value, glyph_id) in &record.non_default_uvs {
                tables.write_u24::<BigEndian>(unicode_value).unwrap();
                tables.write_u16::<BigEndian>(glyph_id).unwrap();
            }
            offset
        };
        offsets.push((default_offset, non_default_offset));
    }

    let mut data = Vec::new();
    data.write_u16::<BigEndian>(14).unwrap(); // format
    data.write_u32::<BigEndian>((header_len + tables.len()) as u32).unwrap();
    data.write_u32::<BigEndian>(records.len() as u32).unwrap();
    for (record, (default_offset, non_default_offset)) in records.iter().zip(offsets) {
        data.write_u24::<BigEndian>(record.selector).unwrap();
        data.write_u32::<BigEndian>(default_offset as u32).unwrap();
        data.write_u32::<BigEndian>(non_default_offset as u32).unwrap();
    }
    data.extend_from_slice(&tables);
    data
}
