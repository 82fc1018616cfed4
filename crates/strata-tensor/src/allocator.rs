//! Heap memory for tensor buffers that outgrow the inline storage.
//!
//! A [`TensorAllocator`] hands out raw blocks; the provided [`TensorAllocator::alloc_array`]
//! and [`TensorAllocator::dealloc_array`] work in element counts and handle arrays of
//! zero-sized values without touching the allocator at all.

use std::{alloc::Layout, mem, ptr::NonNull};

use thiserror::Error;

/// Failures when obtaining memory for a tensor buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TensorAllocatorError {
    /// `len` values of `size` bytes each exceed the largest valid allocation.
    #[error("Capacity overflow: {len} values of {size} bytes")]
    CapacityOverflow {
        /// Requested element count.
        len: usize,
        /// Size of one element in bytes.
        size: usize,
    },

    /// The allocator could not provide `0` bytes.
    #[error("Out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    /// A zero-sized block was requested from the raw allocator.
    #[error("Zero-sized allocation")]
    ZeroSized,

    /// A null pointer was handed over as a buffer.
    #[error("Null pointer")]
    NullPointer,
}

/// The layout of `len` contiguous values of `T`.
///
/// # Errors
///
/// Returns [`TensorAllocatorError::CapacityOverflow`] if the array would not fit in
/// `isize::MAX` bytes.
pub fn array_layout<T>(len: usize) -> Result<Layout, TensorAllocatorError> {
    Layout::array::<T>(len).map_err(|_| TensorAllocatorError::CapacityOverflow {
        len,
        size: mem::size_of::<T>(),
    })
}

/// A source of heap blocks for large tensor buffers.
///
/// Implementations must be thread-safe if the tensors using them are shared across
/// threads. Only storages larger than the inline capacity call into the allocator.
pub trait TensorAllocator: Clone {
    /// Allocates a block for `layout`, which has a non-zero size.
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, TensorAllocatorError>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Self::alloc`] on an equal allocator with the same `layout`,
    /// and must not be used afterwards.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);

    /// Allocates uninitialized room for `len` values of `T`, returning the layout used.
    ///
    /// Empty arrays and arrays of zero-sized values get a dangling pointer.
    fn alloc_array<T>(&self, len: usize) -> Result<(NonNull<T>, Layout), TensorAllocatorError> {
        let layout = array_layout::<T>(len)?;
        if layout.size() == 0 {
            return Ok((NonNull::dangling(), layout));
        }
        Ok((self.alloc(layout)?.cast(), layout))
    }

    /// Releases an array obtained from [`Self::alloc_array`] or adopted with its layout.
    ///
    /// The values are not dropped.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::dealloc`].
    unsafe fn dealloc_array<T>(&self, ptr: NonNull<T>, layout: Layout) {
        if layout.size() != 0 {
            self.dealloc(ptr.cast(), layout);
        }
    }
}

/// The system allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuAllocator;

impl TensorAllocator for CpuAllocator {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, TensorAllocatorError> {
        if layout.size() == 0 {
            return Err(TensorAllocatorError::ZeroSized);
        }
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(TensorAllocatorError::OutOfMemory(layout.size()))
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_round_trip() -> Result<(), TensorAllocatorError> {
        let (ptr, layout) = CpuAllocator.alloc_array::<f64>(128)?;
        assert_eq!(layout.size(), 128 * 8);
        assert_eq!(ptr.as_ptr() as usize % mem::align_of::<f64>(), 0);
        unsafe {
            ptr.as_ptr().write(1.5);
            assert_eq!(ptr.as_ptr().read(), 1.5);
            CpuAllocator.dealloc_array(ptr, layout);
        }
        Ok(())
    }

    #[test]
    fn zero_sized_arrays_skip_the_allocator() -> Result<(), TensorAllocatorError> {
        let (ptr, layout) = CpuAllocator.alloc_array::<u32>(0)?;
        assert_eq!(ptr, NonNull::dangling());
        assert_eq!(layout.size(), 0);
        let (_, layout) = CpuAllocator.alloc_array::<()>(1000)?;
        assert_eq!(layout.size(), 0);
        assert_eq!(
            CpuAllocator.alloc(Layout::new::<()>()),
            Err(TensorAllocatorError::ZeroSized)
        );
        Ok(())
    }

    #[test]
    fn oversized_arrays_are_rejected() {
        assert_eq!(
            array_layout::<u64>(usize::MAX / 4),
            Err(TensorAllocatorError::CapacityOverflow {
                len: usize::MAX / 4,
                size: 8
            })
        );
    }
}
