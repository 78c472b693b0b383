use crate::error::FrameError;
use std::convert::TryInto;

/// Borrow `N` bytes of `i` starting at `offset`
#[inline]
pub(crate) fn array_ref<const N: usize>(i: &[u8], offset: usize) -> Result<&[u8; N], FrameError> {
    i.get(offset..offset + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(FrameError::TooShort {
            needed: offset + N,
            len: i.len(),
        })
}

/// Read a big-endian (network order) `u16` at `offset`
#[inline]
pub(crate) fn be_u16_at(i: &[u8], offset: usize) -> Result<u16, FrameError> {
    array_ref::<2>(i, offset).map(|b| u16::from_be_bytes(*b))
}

/// Everything from `offset` to the end of `i`
#[inline]
pub(crate) fn tail(i: &[u8], offset: usize) -> Result<&[u8], FrameError> {
    i.get(offset..).ok_or(FrameError::TooShort {
        needed: offset,
        len: i.len(),
    })
}
