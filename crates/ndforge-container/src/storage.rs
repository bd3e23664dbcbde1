//! Memory regions backing a container
//!
//! Owned regions are allocated in 16-byte words so that typed views of any
//! primitive (up to `complex128`) are always aligned. Borrowed regions are
//! caller memory and are never freed by the container.

/// Alignment guaranteed for owned regions
pub const OWNED_ALIGNMENT: usize = std::mem::align_of::<u128>();

const WORD: usize = std::mem::size_of::<u128>();

/// Heap allocation with 16-byte alignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedBuffer {
    words: Vec<u128>,
    len: usize,
}

impl OwnedBuffer {
    /// Allocate `len` zeroed bytes
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0u128; len.div_ceil(WORD)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u128, u8>(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u128, u8>(&mut self.words)[..self.len]
    }
}

/// Memory a container reads and writes
#[derive(Debug)]
pub enum Region<'a> {
    Owned(OwnedBuffer),
    Borrowed(&'a mut [u8]),
}

impl<'a> Region<'a> {
    pub fn is_owned(&self) -> bool {
        matches!(self, Region::Owned(_))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Region::Owned(buffer) => buffer.as_bytes(),
            Region::Borrowed(bytes) => bytes,
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Region::Owned(buffer) => buffer.as_bytes_mut(),
            Region::Borrowed(bytes) => bytes,
        }
    }
}

impl From<OwnedBuffer> for Region<'static> {
    fn from(buffer: OwnedBuffer) -> Self {
        Region::Owned(buffer)
    }
}

impl<'a> From<&'a mut [u8]> for Region<'a> {
    fn from(bytes: &'a mut [u8]) -> Self {
        Region::Borrowed(bytes)
    }
}
