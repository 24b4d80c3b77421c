/// # Constants with reserved meanings in Teppan

/// In a batch tensor shape, Teppan reserves the `0th` dimension for batching
pub const BATCH_DIM: usize = 0;

/// In a batch tensor shape, Teppan reserves the `1st` dimension for sequence
pub const SEQ_DIM: usize = 1;

/// Filler written after real content when right-padding input rows
pub const DEFAULT_PAD_TOKEN: u32 = 0;
