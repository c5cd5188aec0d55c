#![deny(missing_docs)]

//! Write binary data

use std::iter;
use std::marker::PhantomData;

use crate::binary::read::ReadUnchecked;
use crate::binary::{I16Be, U16Be, U24Be, U32Be, U8};
use crate::error::WriteError;

/// An in-memory buffer that implements `WriteContext`.
pub struct WriteBuffer {
    data: Vec<u8>,
}

struct WriteSlice<'a> {
    offset: usize,
    data: &'a mut [u8],
}

/// A placeholder for a value that will be filled in later using WriteContext::write_placeholder
pub struct Placeholder<T, HostType>
where
    T: WriteBinary<HostType>,
{
    offset: usize,
    length: usize,
    marker: PhantomData<T>,
    host: PhantomData<HostType>,
}

/// Trait that describes a type that can be written to a `WriteContext` in binary form.
pub trait WriteBinary<HostType = Self> {
    /// The type of the value returned by `write`.
    type Output;

    /// Write the binary representation of Self to `ctxt`.
    fn write<C: WriteContext>(ctxt: &mut C, val: HostType) -> Result<Self::Output, WriteError>;
}

/// Trait for types that can have binary data written to them.
pub trait WriteContext {
    /// Write the values yielded by an iterator into a `WriteContext`.
    fn write_iter<T, HostType>(
        &mut self,
        iter: impl Iterator<Item = HostType>,
    ) -> Result<(), WriteError>
    where
        Self: Sized,
        T: WriteBinary<HostType>,
    {
        for val in iter {
            T::write(self, val)?;
        }

        Ok(())
    }

    /// Write a slice of bytes to a `WriteContext`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError>;

    /// Write the specified number of zero bytes to the `WriteContext`.
    fn write_zeros(&mut self, count: usize) -> Result<(), WriteError>;

    /// The total number of bytes written so far.
    fn bytes_written(&self) -> usize;

    /// Return a placeholder to `T` in the context for filling in later.
    fn placeholder<T, HostType>(&mut self) -> Result<Placeholder<T, HostType>, WriteError>
    where
        T: WriteBinary<HostType> + ReadUnchecked,
    {
        let offset = self.bytes_written();
        self.write_zeros(T::SIZE)?;

        Ok(Placeholder {
            offset,
            length: T::SIZE,
            marker: PhantomData,
            host: PhantomData,
        })
    }

    /// Consumes the placeholder and writes the supplied value into it
    fn write_placeholder<T, HostType>(
        &mut self,
        placeholder: Placeholder<T, HostType>,
        val: HostType,
    ) -> Result<T::Output, WriteError>
    where
        T: WriteBinary<HostType>;
}

/// Write `T` into a `WriteBuffer` and return it
pub fn buffer<HostType, T: WriteBinary<HostType>>(
    writeable: HostType,
) -> Result<(T::Output, WriteBuffer), WriteError> {
    let mut buffer = WriteBuffer::new();
    let output = T::write(&mut buffer, writeable)?;
    Ok((output, buffer))
}

impl<T> WriteBinary<T> for U8
where
    T: Into<u8>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u8 = t.into();
        ctxt.write_bytes(&[val])
    }
}

impl<T> WriteBinary<T> for I16Be
where
    T: Into<i16>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: i16 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U16Be
where
    T: Into<u16>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u16 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U24Be
where
    T: Into<u32>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u32 = t.into();
        if val > 0xFF_FFFF {
            return Err(WriteError::BadValue);
        }
        ctxt.write_bytes(&val.to_be_bytes()[1..4])
    }
}

impl<T> WriteBinary<T> for U32Be
where
    T: Into<u32>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u32 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl WriteContext for WriteBuffer {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.data.extend(data.iter());
        Ok(())
    }

    fn write_zeros(&mut self, count: usize) -> Result<(), WriteError> {
        let zeros = iter::repeat(0).take(count);
        self.data.extend(zeros);
        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.data.len()
    }

    fn write_placeholder<T, HostType>(
        &mut self,
        placeholder: Placeholder<T, HostType>,
        val: HostType,
    ) -> Result<T::Output, WriteError>
    where
        T: WriteBinary<HostType>,
    {
        let data = self
            .data
            .get_mut(placeholder.offset..placeholder.offset + placeholder.length)
            .ok_or(WriteError::PlaceholderMismatch)?;
        let mut slice = WriteSlice { offset: 0, data };
        let output = T::write(&mut slice, val)?;
        if slice.offset != placeholder.length {
            return Err(WriteError::PlaceholderMismatch);
        }
        Ok(output)
    }
}

impl<'a> WriteContext for WriteSlice<'a> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let data_len = data.len();
        let remaining = self.data.len() - self.offset;

        if data_len <= remaining {
            let subslice = &mut self.data[self.offset..][0..data_len];
            subslice.copy_from_slice(data);
            self.offset += data_len;
            Ok(())
        } else {
            Err(WriteError::BadValue)
        }
    }

    fn write_zeros(&mut self, count: usize) -> Result<(), WriteError> {
        let end = (self.offset + count).min(self.data.len());
        for byte in &mut self.data[self.offset..end] {
            *byte = 0;
        }
        self.offset = end;

        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.offset
    }

    fn write_placeholder<T, HostType>(
        &mut self,
        _placeholder: Placeholder<T, HostType>,
        _val: HostType,
    ) -> Result<T::Output, WriteError>
    where
        T: WriteBinary<HostType>,
    {
        Err(WriteError::NotImplemented)
    }
}

impl WriteBuffer {
    /// Create a new, empty `WriteBuffer`
    pub fn new() -> Self {
        WriteBuffer { data: Vec::new() }
    }

    /// Retrieve a slice of the data held by this buffer
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the current size of the data held by this buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been written to this buffer
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume `self` and return the inner buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        WriteBuffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Record {
        platform_id: u16,
        encoding_id: u16,
    }

    impl WriteBinary<&Self> for Record {
        type Output = ();

        fn write<C: WriteContext>(ctxt: &mut C, val: &Self) -> Result<(), WriteError> {
            U16Be::write(ctxt, val.platform_id)?;
            U16Be::write(ctxt, val.encoding_id)
        }
    }

    #[test]
    fn test_basic() {
        let mut ctxt = WriteBuffer::new();
        let record = Record {
            platform_id: 3,
            encoding_id: 10,
        };

        Record::write(&mut ctxt, &record).unwrap();
        U32Be::write(&mut ctxt, 0x1Cu32).unwrap();

        assert_eq!(ctxt.bytes(), &[0, 3, 0, 10, 0, 0, 0, 0x1C])
    }

    #[test]
    fn test_write_u24be() {
        let mut ctxt = WriteBuffer::new();
        U24Be::write(&mut ctxt, 0x10203u32).unwrap();
        assert_eq!(ctxt.bytes(), &[1, 2, 3]);

        // Check out of range value
        match U24Be::write(&mut ctxt, u32::MAX) {
            Err(WriteError::BadValue) => {}
            _ => panic!("Expected WriteError::BadValue"),
        }
    }

    #[test]
    fn test_write_placeholder() {
        let mut ctxt = WriteBuffer::new();
        U8::write(&mut ctxt, 1).unwrap();
        let placeholder = ctxt.placeholder::<U16Be, u16>().unwrap();
        U8::write(&mut ctxt, 3).unwrap();
        ctxt.write_placeholder(placeholder, 2).unwrap();
        assert_eq!(ctxt.bytes(), &[1, 0, 2, 3]);
    }
}
