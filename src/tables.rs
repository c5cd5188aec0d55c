//! OpenType font table parsing and writing.

pub mod cmap;
