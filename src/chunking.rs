//! Line-aligned chunk splitting for oversized inputs.
//!
//! Chunking exists purely to fit within the provider's input-size budget: a
//! chunk is a contiguous, line-aligned slice, and joining all chunks with
//! `"\n"` reproduces the original input exactly. No chunk ever splits a line.

/// Input length above which the reduce engine takes the chunked path.
pub const LONG_INPUT_THRESHOLD: usize = 100_000;

/// Target upper bound on chunk size, in characters.
pub const TARGET_CHUNK_CHARS: usize = 80_000;

/// Which path a reduction will take, as an explicit tagged choice so tests
/// can force either path deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReducePlan {
    /// Input fits in a single call.
    Direct,
    /// Input must be split; carries the line-aligned chunks.
    Chunked(Vec<String>),
}

impl ReducePlan {
    /// Plan a reduction with the reference thresholds.
    pub fn for_input(input: &str) -> Self {
        Self::with_limits(input, LONG_INPUT_THRESHOLD, TARGET_CHUNK_CHARS)
    }

    /// Plan a reduction with explicit limits.
    pub fn with_limits(input: &str, threshold: usize, max_chunk_chars: usize) -> Self {
        if input.len() <= threshold {
            ReducePlan::Direct
        } else {
            ReducePlan::Chunked(split_line_chunks(input, max_chunk_chars))
        }
    }
}

/// Split `input` into chunks of at most `max_chunk_chars`, breaking only at
/// line boundaries.
///
/// Invariants:
/// - `chunks.join("\n") == input`, byte for byte.
/// - No chunk is empty unless the input itself is empty.
/// - A single line longer than `max_chunk_chars` becomes its own oversized
///   chunk; lines are never split.
pub fn split_line_chunks(input: &str, max_chunk_chars: usize) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Option<String> = None;

    for line in input.split('\n') {
        match current.as_mut() {
            None => current = Some(line.to_string()),
            Some(chunk) if chunk.len() + 1 + line.len() <= max_chunk_chars => {
                chunk.push('\n');
                chunk.push_str(line);
            }
            Some(_) => {
                if let Some(full) = current.take() {
                    chunks.push(full);
                }
                current = Some(line.to_string());
            }
        }
    }

    if let Some(last) = current {
        chunks.push(last);
    }

    chunks
}
