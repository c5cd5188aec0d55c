//! Character to glyph mapping for a font.
//!
//! A `Charmap` selects the best subtable of a `cmap` table once and binds the lookup strategy
//! for it, so mapping a character does not have to go through subtable selection again.

use log::warn;
use ouroboros::self_referencing;

use crate::binary::read::ReadScope;
use crate::error::ParseError;
use crate::tables::cmap::{
    Cmap, CmapSubtable, CmapSubtableFormat12, CmapSubtableFormat14, CodepointSet, Encoding,
    Format4Accelerator, GlyphVariant,
};
use crate::GlyphId;

/// First codepoint of the Private Use Area block symbol fonts map their characters to.
const SYMBOL_PUA_BASE: u32 = 0xF000;

/// The lookup strategy bound to the selected subtable.
#[derive(Clone)]
enum GlyphLookup<'a> {
    Format4(Format4Accelerator<'a>),
    Format12(CmapSubtableFormat12<'a>),
    Generic(CmapSubtable<'a>),
}

/// Maps characters to glyphs using the best subtable of a `cmap` table.
#[derive(Clone)]
pub struct Charmap<'a> {
    subtable: Option<(Encoding, GlyphLookup<'a>)>,
    variations: Option<CmapSubtableFormat14<'a>>,
}

/// A `Charmap` that owns the `cmap` table data it reads from.
#[self_referencing]
pub struct OwnedCharmap {
    data: Box<[u8]>,
    #[borrows(data)]
    #[not_covariant]
    charmap: Charmap<'this>,
}

impl<'a> GlyphLookup<'a> {
    fn new(subtable: CmapSubtable<'a>) -> Self {
        match subtable {
            CmapSubtable::Format4(subtable) => GlyphLookup::Format4(subtable.accelerator().clone()),
            CmapSubtable::Format12(subtable) => GlyphLookup::Format12(subtable),
            subtable => GlyphLookup::Generic(subtable),
        }
    }

    fn map_glyph(&self, ch: u32) -> Option<GlyphId> {
        match self {
            GlyphLookup::Format4(accelerator) => accelerator.map_glyph(ch),
            GlyphLookup::Format12(subtable) => subtable.map_glyph(ch),
            GlyphLookup::Generic(subtable) => subtable.map_glyph(ch),
        }
    }

    fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        match self {
            GlyphLookup::Format4(accelerator) => accelerator.collect_codepoints(out),
            GlyphLookup::Format12(subtable) => subtable.collect_codepoints(out),
            GlyphLookup::Generic(subtable) => subtable.collect_codepoints(out),
        }
    }
}

impl<'a> Charmap<'a> {
    /// Read the `cmap` table in `data`.
    ///
    /// A table that can't be read is logged and results in a `Charmap` that maps nothing. Use
    /// `try_new` to handle the error instead.
    pub fn new(data: &'a [u8]) -> Self {
        match Charmap::try_new(data) {
            Ok(charmap) => charmap,
            Err(err) => {
                warn!("ignoring invalid cmap table: {}", err);
                Charmap::empty()
            }
        }
    }

    pub fn try_new(data: &'a [u8]) -> Result<Self, ParseError> {
        let cmap = ReadScope::new(data).read::<Cmap<'_>>()?;
        Ok(Charmap::from_cmap(&cmap))
    }

    pub fn from_cmap(cmap: &Cmap<'a>) -> Self {
        let subtable = cmap
            .find_best_subtable()
            .map(|(encoding, subtable)| (encoding, GlyphLookup::new(subtable)));
        Charmap {
            subtable,
            variations: cmap.variation_subtable(),
        }
    }

    /// A `Charmap` that maps nothing.
    pub fn empty() -> Self {
        Charmap {
            subtable: None,
            variations: None,
        }
    }

    /// Returns true if a subtable was selected for lookups.
    pub fn has_map(&self) -> bool {
        self.subtable.is_some()
    }

    /// The encoding of the selected subtable.
    pub fn encoding(&self) -> Option<Encoding> {
        self.subtable.as_ref().map(|(encoding, _)| *encoding)
    }

    /// Map `ch` to a glyph.
    ///
    /// When the subtable uses the symbol encoding and `ch` is not mapped, characters up to
    /// U+00FF are retried at U+F000 + `ch`.
    pub fn get_nominal_glyph(&self, ch: u32) -> Option<GlyphId> {
        let (encoding, lookup) = self.subtable.as_ref()?;
        lookup.map_glyph(ch).or_else(|| match encoding {
            Encoding::Symbol if ch <= 0xFF => lookup.map_glyph(SYMBOL_PUA_BASE + ch),
            _ => None,
        })
    }

    /// Map each of `codepoints` into the corresponding slot of `glyphs`.
    ///
    /// Stops at the first codepoint without a glyph and returns the number mapped.
    pub fn get_nominal_glyphs(&self, codepoints: &[u32], glyphs: &mut [GlyphId]) -> usize {
        let mut mapped = 0;
        for (&ch, glyph) in codepoints.iter().zip(glyphs.iter_mut()) {
            match self.get_nominal_glyph(ch) {
                Some(glyph_id) => *glyph = glyph_id,
                None => break,
            }
            mapped += 1;
        }
        mapped
    }

    /// Map `ch` followed by the variation selector `selector` to a glyph.
    ///
    /// Sequences the font marks as using the default glyph map like `ch` on its own.
    pub fn get_variation_glyph(&self, ch: u32, selector: u32) -> Option<GlyphId> {
        match self.variations.as_ref()?.map_variant(ch, selector) {
            GlyphVariant::NotFound => None,
            GlyphVariant::Found(glyph_id) => Some(glyph_id),
            GlyphVariant::UseDefault => self.get_nominal_glyph(ch),
        }
    }

    /// Add every codepoint the selected subtable maps to `out`.
    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        if let Some((_, lookup)) = &self.subtable {
            lookup.collect_codepoints(out);
        }
    }

    /// Add every variation selector the font has sequences for to `out`.
    pub fn collect_variation_selectors(&self, out: &mut impl CodepointSet) {
        if let Some(variations) = &self.variations {
            variations.collect_variation_selectors(out);
        }
    }

    /// Add every base character with a sequence for `selector` to `out`.
    pub fn collect_variation_codepoints(&self, selector: u32, out: &mut impl CodepointSet) {
        if let Some(variations) = &self.variations {
            variations.collect_variation_codepoints(selector, out);
        }
    }
}

impl OwnedCharmap {
    /// Take ownership of `data` and read the `cmap` table in it.
    ///
    /// Like `Charmap::new`, an invalid table maps nothing.
    pub fn from_data(data: Box<[u8]>) -> Self {
        OwnedCharmapBuilder {
            data,
            charmap_builder: |data| Charmap::new(data),
        }
        .build()
    }

    pub fn try_from_data(data: Box<[u8]>) -> Result<Self, ParseError> {
        OwnedCharmapTryBuilder {
            data,
            charmap_builder: |data| Charmap::try_new(data),
        }
        .try_build()
    }

    pub fn has_map(&self) -> bool {
        self.with_charmap(|charmap| charmap.has_map())
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.with_charmap(|charmap| charmap.encoding())
    }

    pub fn get_nominal_glyph(&self, ch: u32) -> Option<GlyphId> {
        self.with_charmap(|charmap| charmap.get_nominal_glyph(ch))
    }

    pub fn get_nominal_glyphs(&self, codepoints: &[u32], glyphs: &mut [GlyphId]) -> usize {
        self.with_charmap(|charmap| charmap.get_nominal_glyphs(codepoints, glyphs))
    }

    pub fn get_variation_glyph(&self, ch: u32, selector: u32) -> Option<GlyphId> {
        self.with_charmap(|charmap| charmap.get_variation_glyph(ch, selector))
    }

    pub fn collect_codepoints(&self, out: &mut impl CodepointSet) {
        self.with_charmap(|charmap| charmap.collect_codepoints(out))
    }

    pub fn collect_variation_selectors(&self, out: &mut impl CodepointSet) {
        self.with_charmap(|charmap| charmap.collect_variation_selectors(out))
    }

    pub fn collect_variation_codepoints(&self, selector: u32, out: &mut impl CodepointSet) {
        self.with_charmap(|charmap| charmap.collect_variation_codepoints(selector, out))
    }

    /// The `cmap` table data.
    pub fn data(&self) -> &[u8] {
        self.borrow_data()
    }
}
