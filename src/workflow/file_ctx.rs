//! Position of a file inside its batch, used for log prefixes

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCtx {
    /// 1-based position in the request
    pub index: usize,
    pub total: usize,
}

impl FileCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    /// Context for a request carrying exactly one file
    pub fn single() -> Self {
        Self::new(1, 1)
    }
}

impl Display for FileCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[file {}/{}]", self.index, self.total)
    }
}
