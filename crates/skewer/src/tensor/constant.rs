/// # Constants with reserved meanings in skewer

/// In a given tensor shape, skewer reserves the `0th` dimension for batching
pub const BATCH_DIM: usize = 0;

/// In a given tensor shape, skewer reserves the `1st` dimension for sequence
pub const SEQ_DIM: usize = 1;

/// Model outputs carry the vocabulary in the `2nd` dimension
pub const VOCAB_DIM: usize = 2;
