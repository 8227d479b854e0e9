//! Library half of `vorcheck`: the comparison pipeline and terminal rendering,
//! shared by the binary and its integration tests.

pub mod pipeline;
pub mod render;
