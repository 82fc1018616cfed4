//! Owned tensor buffers with inline storage for small element counts.
//!
//! Buffers of up to [`INLINE_CAPACITY`] elements live inside the storage value itself and
//! never touch the allocator. Larger buffers are allocated through a [`TensorAllocator`].
//! Externally allocated memory can be adopted with [`TensorStorage::from_raw_parts`].

use std::{
    alloc::{handle_alloc_error, Layout},
    mem::ManuallyDrop,
    ptr::{self, NonNull},
};

use crate::{
    allocator::{array_layout, CpuAllocator, TensorAllocator, TensorAllocatorError},
    TensorError,
};

/// The largest element count kept inline instead of on the heap.
pub const INLINE_CAPACITY: usize = 16;

enum Buffer<T> {
    Small {
        values: [T; INLINE_CAPACITY],
        len: usize,
    },
    Large {
        ptr: NonNull<T>,
        len: usize,
        layout: Layout,
    },
}

/// An owned, contiguous buffer of tensor values.
///
/// # Thread Safety
///
/// `TensorStorage` is `Send + Sync` when `T` and the allocator are.
///
/// # Memory Management
///
/// Large buffers are released through the allocator that created or adopted them when
/// the storage is dropped. Moving a storage moves the pointer; cloning allocates a fresh
/// copy.
pub struct TensorStorage<T, A: TensorAllocator = CpuAllocator> {
    buffer: Buffer<T>,
    alloc: A,
}

fn inline_default<T: Default>() -> [T; INLINE_CAPACITY] {
    std::array::from_fn(|_| T::default())
}

impl<T, A: TensorAllocator> TensorStorage<T, A> {
    /// Creates an empty storage.
    pub fn new(alloc: A) -> Self
    where
        T: Default,
    {
        Self {
            buffer: Buffer::Small {
                values: inline_default::<T>(),
                len: 0,
            },
            alloc,
        }
    }

    /// Creates a storage holding a single value.
    pub fn scalar(value: T, alloc: A) -> Self
    where
        T: Default,
    {
        let mut values = inline_default::<T>();
        values[0] = value;
        Self {
            buffer: Buffer::Small { values, len: 1 },
            alloc,
        }
    }

    /// Creates a storage of `len` copies of `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the heap allocation fails.
    pub fn with_len(len: usize, value: T, alloc: A) -> Result<Self, TensorError>
    where
        T: Clone + Default,
    {
        if len <= INLINE_CAPACITY {
            let mut values = inline_default::<T>();
            values[..len].fill(value);
            return Ok(Self {
                buffer: Buffer::Small { values, len },
                alloc,
            });
        }
        Self::from_vec(vec![value; len], alloc)
    }

    /// Creates a storage from a vector, moving its values.
    ///
    /// Small vectors are moved into the inline buffer. Large vectors are copied into a
    /// buffer obtained from `alloc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the heap allocation fails.
    pub fn from_vec(mut value: Vec<T>, alloc: A) -> Result<Self, TensorError>
    where
        T: Default,
    {
        let len = value.len();
        if len <= INLINE_CAPACITY {
            let mut values = inline_default::<T>();
            for (slot, v) in values.iter_mut().zip(value) {
                *slot = v;
            }
            return Ok(Self {
                buffer: Buffer::Small { values, len },
                alloc,
            });
        }

        let (ptr, layout) = alloc.alloc_array::<T>(len)?;

        // SAFETY: ptr is valid for len writes, the regions don't overlap, and the vector
        // gives up ownership of its elements below.
        unsafe {
            ptr::copy_nonoverlapping(value.as_ptr(), ptr.as_ptr(), len);
            value.set_len(0);
        }

        Ok(Self {
            buffer: Buffer::Large { ptr, len, layout },
            alloc,
        })
    }

    /// Creates a storage from raw parts, taking ownership of the memory.
    ///
    /// Small buffers are copied into the inline storage and the original memory is
    /// released right away; large buffers are adopted without copying.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `ptr` holds `len` initialized values of `T` and is properly aligned
    /// - the memory was allocated by `alloc` with `Layout::array::<T>(len)`
    /// - the memory is not accessed or freed elsewhere afterwards
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize, alloc: A) -> Result<Self, TensorError>
    where
        T: Default,
    {
        let ptr = NonNull::new(ptr).ok_or(TensorError::StorageError(TensorAllocatorError::NullPointer))?;
        let layout = array_layout::<T>(len)?;
        if len > INLINE_CAPACITY {
            return Ok(Self {
                buffer: Buffer::Large { ptr, len, layout },
                alloc,
            });
        }

        let mut values = inline_default::<T>();
        for (i, slot) in values.iter_mut().take(len).enumerate() {
            *slot = ptr::read(ptr.as_ptr().add(i));
        }
        alloc.dealloc_array(ptr, layout);
        Ok(Self {
            buffer: Buffer::Small { values, len },
            alloc,
        })
    }

    /// Returns the number of values.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.buffer {
            Buffer::Small { len, .. } | Buffer::Large { len, .. } => *len,
        }
    }

    /// Returns true if the storage holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the values live in the inline buffer.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.buffer, Buffer::Small { .. })
    }

    /// Returns the allocator of the storage.
    #[inline]
    pub fn alloc(&self) -> &A {
        &self.alloc
    }

    /// Returns the storage data as a slice.
    pub fn as_slice(&self) -> &[T] {
        match &self.buffer {
            Buffer::Small { values, len } => &values[..*len],
            // SAFETY: ptr is valid for len initialized values while self is alive
            Buffer::Large { ptr, len, .. } => unsafe {
                std::slice::from_raw_parts(ptr.as_ptr(), *len)
            },
        }
    }

    /// Returns the storage data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.buffer {
            Buffer::Small { values, len } => &mut values[..*len],
            // SAFETY: ptr is valid for len initialized values and self is borrowed mutably
            Buffer::Large { ptr, len, .. } => unsafe {
                std::slice::from_raw_parts_mut(ptr.as_ptr(), *len)
            },
        }
    }

    /// Consumes the storage and returns its values as a vector.
    pub fn into_vec(self) -> Vec<T> {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again, so both fields are moved out once.
        let (buffer, alloc) = unsafe { (ptr::read(&this.buffer), ptr::read(&this.alloc)) };
        match buffer {
            Buffer::Small { values, len } => values.into_iter().take(len).collect(),
            Buffer::Large { ptr, len, layout } => {
                let mut out = Vec::with_capacity(len);
                // SAFETY: out has room for len values and ptr owns len initialized values,
                // which are moved, not dropped, before the buffer is released.
                unsafe {
                    ptr::copy_nonoverlapping(ptr.as_ptr(), out.as_mut_ptr(), len);
                    out.set_len(len);
                }
                // SAFETY: the block was allocated or adopted with this layout.
                unsafe { alloc.dealloc_array(ptr, layout) };
                out
            }
        }
    }

    /// Changes the number of values, keeping the common prefix and filling new slots with
    /// `T::default()`.
    ///
    /// Crossing [`INLINE_CAPACITY`] switches between inline and heap storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the heap allocation fails.
    pub fn resize(&mut self, new_len: usize) -> Result<(), TensorError>
    where
        T: Clone + Default,
    {
        if new_len == self.len() {
            return Ok(());
        }
        if let Buffer::Small { values, len } = &mut self.buffer {
            if new_len <= INLINE_CAPACITY {
                for slot in values.iter_mut().take(INLINE_CAPACITY).skip(new_len.min(*len)) {
                    *slot = T::default();
                }
                *len = new_len;
                return Ok(());
            }
        }
        let mut data: Vec<T> = self.as_slice().iter().take(new_len).cloned().collect();
        data.resize(new_len, T::default());
        *self = Self::from_vec(data, self.alloc.clone())?;
        Ok(())
    }
}

impl<T, A: TensorAllocator> Drop for TensorStorage<T, A> {
    fn drop(&mut self) {
        if let Buffer::Large { ptr, len, layout } = self.buffer {
            // SAFETY: the buffer owns len initialized values allocated with layout.
            unsafe {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len));
                self.alloc.dealloc_array(ptr, layout);
            }
        }
    }
}

impl<T, A> Clone for TensorStorage<T, A>
where
    T: Clone + Default,
    A: TensorAllocator,
{
    fn clone(&self) -> Self {
        let len = self.len();
        match Self::from_vec(self.as_slice().to_vec(), self.alloc.clone()) {
            Ok(storage) => storage,
            Err(_) => handle_alloc_error(array_layout::<T>(len).unwrap_or(Layout::new::<T>())),
        }
    }
}

impl<T: std::fmt::Debug, A: TensorAllocator> std::fmt::Debug for TensorStorage<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorStorage")
            .field("len", &self.len())
            .field("inline", &self.is_inline())
            .field("values", &self.as_slice())
            .finish()
    }
}

// SAFETY: the storage uniquely owns its values; sending it sends the values and allocator.
unsafe impl<T: Send, A: TensorAllocator + Send> Send for TensorStorage<T, A> {}

// SAFETY: shared access only hands out shared references to the values.
unsafe impl<T: Sync, A: TensorAllocator + Sync> Sync for TensorStorage<T, A> {}
