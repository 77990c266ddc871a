use std::num::NonZeroUsize;

/// A fixed-size window over an ordered result set.
///
/// Offset `o` with size `P` covers rows `o*P ..= (o+1)*P - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub size: NonZeroUsize,
}

impl Page {
    pub fn new(offset: usize, size: NonZeroUsize) -> Self {
        Self { offset, size }
    }

    pub fn first(size: NonZeroUsize) -> Self {
        Self::new(0, size)
    }

    pub fn next(&self) -> Self {
        Self::new(self.offset + 1, self.size)
    }

    pub fn is_first(&self) -> bool {
        self.offset == 0
    }

    /// Number of rows to skip before this page.
    pub fn fetch_offset(&self) -> usize {
        self.offset.saturating_mul(self.size.get())
    }

    pub fn fetch_limit(&self) -> usize {
        self.size.get()
    }
}
