use crate::backend::TokenTensor;
use crate::error::{Error, Result};
use crate::request::ScoreResult;

/// Builds the token ids the model sees for one `(context, continuation)` pair.
///
/// ```text
///          CTX      CONT
/// inp    0 1 2 3|4 5 6 7 8 9   <- last token is dropped
/// model  \               \
/// logits   1 2 3|4 5 6 7 8 9   <- the context half is discarded when scoring
/// cont_toks      4 5 6 7 8 9
/// ```
///
/// # Implementation Notes
///
/// The function:
/// 1. Concatenates context and continuation
/// 2. Keeps at most the last `max_length + 1` tokens, cropping the context from the left
/// 3. Drops the final token, since no position needs to predict past it
pub(crate) fn model_input_ids(context: &[u32], continuation: &[u32], max_length: usize) -> Vec<u32> {
    let total = context.len() + continuation.len();
    let keep = total.min(max_length + 1);
    context
        .iter()
        .chain(continuation.iter())
        .skip(total - keep)
        .take(keep.saturating_sub(1))
        .copied()
        .collect()
}

/// Keeps the trailing `max_sequence_length` tokens, dropping from the front.
pub(crate) fn trim_sequence(tokens: &[u32], max_sequence_length: usize) -> &[u32] {
    let start = tokens.len().saturating_sub(max_sequence_length);
    &tokens[start..]
}

/// Pads a single sequence on the right to match the batch sequence length.
///
/// # Parameters
///
/// * `sequence` - Tensor of shape `(seq,)` representing the sequence to pad
/// * `amount` - Number of padding tokens to add
/// * `padding_token_id` - Token id used for padding
/// * `device` - Device the padding is allocated on
///
/// Padding goes after the real tokens, so every position the scorer reads
/// (all before `input_length`) is unaffected by it under causal attention.
pub(crate) fn pad_single_sequence<T>(
    sequence: &T,
    amount: usize,
    padding_token_id: u32,
    device: &T::Device,
) -> Result<T>
where T: TokenTensor
{
    if amount == 0 {
        return Ok(sequence.clone());
    }
    let padding = T::from_ids(&vec![padding_token_id; amount], device)?;
    T::cat(&[sequence.clone(), padding])
}

/// Scores one continuation against the log-probability rows that predict it.
///
/// Row `i` holds the distribution predicting `continuation[i]`. The
/// log-probability is the sum of the entries at the actual tokens; the match
/// is greedy when the arg-max of every row is the actual token.
pub(crate) fn continuation_score(rows: &[Vec<f32>], continuation: &[u32]) -> Result<ScoreResult> {
    if rows.len() != continuation.len() {
        return Err(Error::LengthMismatch { expected: continuation.len(), got: rows.len() });
    }
    let mut log_probability = 0.0f64;
    let mut is_greedy_match = true;
    for (row, &token) in rows.iter().zip(continuation) {
        let value = row.get(token as usize).ok_or_else(|| Error::Backend(format!(
            "token {} outside vocabulary of size {}", token, row.len()
        )))?;
        log_probability += *value as f64;
        if argmax(row) != Some(token as usize) {
            is_greedy_match = false;
        }
    }
    Ok(ScoreResult { log_probability, is_greedy_match })
}

/// Index of the largest value; the first one wins ties.
fn argmax(row: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in row.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
