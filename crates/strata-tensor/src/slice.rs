/// Sentinel upper bound meaning "through the end of the axis".
pub const TO_END: usize = usize::MAX;

/// A `[from, to)` range over one axis.
///
/// Three forms exist: [`Slice`] resolves both bounds at runtime, [`SliceToEnd`] runs from a
/// runtime start to the end of the axis, and [`StaticSlice`] carries both bounds as const
/// generics so the resulting extent can stay fixed.
pub trait SliceLike {
    /// The first index covered by the slice, i.e. the offset into the source axis.
    fn start(&self) -> usize;

    /// Computes the length of the sliced axis given the full axis size.
    ///
    /// The result is clamped to the available size and is never negative.
    fn extent(&self, size: usize) -> usize;

    /// The extent when it is known without the axis size.
    fn static_extent(&self) -> Option<usize> {
        None
    }

    /// Whether both bounds are known at compile time.
    fn is_static(&self) -> bool {
        false
    }

    /// Whether slicing with this range leaves the axis unchanged for every axis size.
    fn is_no_op(&self) -> bool {
        false
    }
}

/// A runtime range `[from, to)`; `to` may be [`TO_END`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slice {
    /// Inclusive start.
    pub from: usize,
    /// Exclusive end, or [`TO_END`].
    pub to: usize,
}

impl Slice {
    /// Creates a new runtime slice.
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// The slice covering a whole axis.
    pub fn full() -> Self {
        Self { from: 0, to: TO_END }
    }
}

impl SliceLike for Slice {
    fn start(&self) -> usize {
        self.from
    }

    fn extent(&self, size: usize) -> usize {
        let size = size.min(self.to);
        size.saturating_sub(self.from)
    }
}

/// A runtime start running through the end of the axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceToEnd {
    /// Inclusive start.
    pub from: usize,
}

impl SliceToEnd {
    /// Creates a slice starting at `from`.
    pub fn new(from: usize) -> Self {
        Self { from }
    }
}

impl SliceLike for SliceToEnd {
    fn start(&self) -> usize {
        self.from
    }

    fn extent(&self, size: usize) -> usize {
        size.saturating_sub(self.from)
    }
}

/// A range whose bounds are known at compile time.
///
/// `StaticSlice<0, TO_END>` is the no-op slice.
///
/// # Example
///
/// ```rust
/// use strata_tensor::slice::{SliceLike, StaticSlice, TO_END};
///
/// assert_eq!(StaticSlice::<1, 3>.static_extent(), Some(2));
/// assert_eq!(StaticSlice::<2, TO_END>.extent(5), 3);
/// assert!(StaticSlice::<0, TO_END>.is_no_op());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticSlice<const FROM: usize, const TO: usize>;

impl<const FROM: usize, const TO: usize> StaticSlice<FROM, TO> {
    /// True exactly for the full-range slice.
    pub const IS_NO_OP: bool = FROM == 0 && TO == TO_END;
}

impl<const FROM: usize, const TO: usize> SliceLike for StaticSlice<FROM, TO> {
    fn start(&self) -> usize {
        FROM
    }

    fn extent(&self, size: usize) -> usize {
        match self.static_extent() {
            Some(extent) => extent,
            None => size.saturating_sub(FROM),
        }
    }

    fn static_extent(&self) -> Option<usize> {
        const { assert!(FROM <= TO, "static slice bounds are reversed") };
        if TO == TO_END {
            None
        } else {
            Some(TO - FROM)
        }
    }

    fn is_static(&self) -> bool {
        true
    }

    fn is_no_op(&self) -> bool {
        Self::IS_NO_OP
    }
}
