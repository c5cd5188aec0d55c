#![warn(rust_2018_idioms)]

//! # Charmap
//!
//! Reading, lookup and writing of the OpenType `cmap` table, which maps characters to the glyphs
//! of a font.
//!
//! All subtable data is read through bounds checked views over the table bytes, so malformed
//! fonts result in missing mappings rather than out of bounds reads.
//!
//! ```
//! use charmap::charmap::Charmap;
//! use charmap::binary::write::{WriteBinary, WriteBuffer};
//! use charmap::tables::cmap::{owned, CmapSlots};
//!
//! let table = owned::Cmap::from_mappings(vec![(0x41, 1), (0x42, 2)], CmapSlots::BMP_ONLY)?;
//! let mut buffer = WriteBuffer::new();
//! owned::Cmap::write(&mut buffer, &table)?;
//!
//! let charmap = Charmap::try_new(buffer.bytes())?;
//! assert_eq!(charmap.get_nominal_glyph(0x42), Some(2));
//! assert_eq!(charmap.get_nominal_glyph(0x43), None);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Reading and writing of binary data.
pub mod binary;
pub mod charmap;
pub mod error;
pub mod size;
pub mod tables;

/// A glyph index. Glyph 0 is `.notdef` and is never returned by a lookup.
pub type GlyphId = u32;

/// The largest Unicode scalar value.
pub const UNICODE_MAX: u32 = 0x10FFFF;
