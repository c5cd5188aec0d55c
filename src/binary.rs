//! Big-endian binary types and the machinery to read and write them.
//!
//! The types in this module are uninhabited markers. They name a binary encoding (such as a
//! 16-bit big-endian unsigned integer) and are used as type arguments to the readers and writers,
//! which produce or consume the corresponding host type (`u16` in that example).

/// Read binary data
pub mod read;

/// Write binary data
pub mod write;

#[derive(Copy, Clone)]
pub enum U8 {}

#[derive(Copy, Clone)]
pub enum U16Be {}

#[derive(Copy, Clone)]
pub enum I16Be {}

#[derive(Copy, Clone)]
pub enum U24Be {}

#[derive(Copy, Clone)]
pub enum U32Be {}
