//! Rolling windows for documents longer than the model's context.
//!
//! A document is cut into windows whose prediction regions partition it: every
//! token is predicted by exactly one window. The first window is preceded by a
//! single prefix token so that the document's first token is scored too.
//! Later windows reuse up to `max_seq_len` earlier tokens as context.

use crate::error::{Error, Result};

/// One scoring pass over part of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Tokens fed to the model ahead of the prediction region
    pub context: Vec<u32>,
    /// Tokens whose log-probability this window contributes
    pub continuation: Vec<u32>,
}

/// Produce the overlapping rolling windows of a token list.
///
/// Each window's `context` is the full model input and its `continuation` is
/// the trailing part of the sequence the input predicts, so the two overlap in
/// all but one position. Use [`make_disjoint_window`] to split them.
///
/// # Parameters
///
/// * `tokens` - The document
/// * `prefix_token` - Stands in for the missing context of the first token
/// * `max_seq_len` - The model's context window
/// * `context_len` - Minimum tokens of context kept for every prediction after
///   the first window; must satisfy `1 <= context_len <= max_seq_len`
pub fn rolling_token_windows(
    tokens: &[u32],
    prefix_token: u32,
    max_seq_len: usize,
    context_len: usize,
) -> Result<Vec<Window>> {
    if context_len < 1 || context_len > max_seq_len {
        return Err(Error::Config(format!(
            "rolling windows need 1 <= context_len ({}) <= max_seq_len ({})",
            context_len, max_seq_len
        )));
    }
    let mut windows = Vec::new();
    if tokens.is_empty() {
        return Ok(windows);
    }

    // +1 offset, going from input to predictions
    let pred_len = max_seq_len - context_len + 1;

    let first_seq_len = max_seq_len.min(tokens.len());
    let mut context = Vec::with_capacity(first_seq_len);
    context.push(prefix_token);
    context.extend_from_slice(&tokens[..first_seq_len - 1]);
    windows.push(Window { context, continuation: tokens[..first_seq_len].to_vec() });
    let mut predicted = first_seq_len;

    while predicted < tokens.len() {
        let window_pred_len = (tokens.len() - predicted).min(pred_len);
        let window_end = predicted + window_pred_len;
        windows.push(Window {
            context: tokens[window_end - max_seq_len - 1..window_end - 1].to_vec(),
            continuation: tokens[window_end - window_pred_len..window_end].to_vec(),
        });
        predicted += window_pred_len;
    }

    Ok(windows)
}

/// Trim a window's context so it no longer overlaps its continuation.
pub fn make_disjoint_window(window: Window) -> Window {
    let Window { mut context, continuation } = window;
    let keep = context.len() - (continuation.len() - 1);
    context.truncate(keep);
    Window { context, continuation }
}

/// Rolling windows, already made disjoint, ready to become scoring requests.
pub fn disjoint_rolling_windows(
    tokens: &[u32],
    prefix_token: u32,
    max_seq_len: usize,
    context_len: usize,
) -> Result<Vec<Window>> {
    Ok(rolling_token_windows(tokens, prefix_token, max_seq_len, context_len)?
        .into_iter()
        .map(make_disjoint_window)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::operations::model_input_ids;
    use proptest::prelude::*;

    const EOT: u32 = 1000;

    #[test]
    fn test_short_document_single_window() {
        let windows = rolling_token_windows(&[1, 2, 3], EOT, 8, 1).unwrap();
        assert_eq!(windows, vec![Window { context: vec![EOT, 1, 2], continuation: vec![1, 2, 3] }]);
        let disjoint = make_disjoint_window(windows[0].clone());
        assert_eq!(disjoint.context, vec![EOT]);
        assert_eq!(disjoint.continuation, vec![1, 2, 3]);
    }

    #[test]
    fn test_long_document_windows() {
        let tokens: Vec<u32> = (0..10).collect();
        let windows = rolling_token_windows(&tokens, EOT, 4, 1).unwrap();
        assert_eq!(windows, vec![
            Window { context: vec![EOT, 0, 1, 2], continuation: vec![0, 1, 2, 3] },
            Window { context: vec![3, 4, 5, 6], continuation: vec![4, 5, 6, 7] },
            Window { context: vec![5, 6, 7, 8], continuation: vec![8, 9] },
        ]);
        let disjoint: Vec<Window> = windows.into_iter().map(make_disjoint_window).collect();
        assert_eq!(disjoint[1], Window { context: vec![3], continuation: vec![4, 5, 6, 7] });
        assert_eq!(disjoint[2], Window { context: vec![5, 6, 7], continuation: vec![8, 9] });
    }

    #[test]
    fn test_larger_context_len() {
        let tokens: Vec<u32> = (0..7).collect();
        let windows = disjoint_rolling_windows(&tokens, EOT, 4, 2).unwrap();
        // pred_len = 3: windows predict 4, then 3 tokens
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].continuation, vec![4, 5, 6]);
        assert_eq!(windows[1].context, vec![2, 3]);
    }

    #[test]
    fn test_empty_document() {
        assert!(rolling_token_windows(&[], EOT, 4, 1).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_context_len() {
        assert!(rolling_token_windows(&[1], EOT, 4, 0).is_err());
        assert!(rolling_token_windows(&[1], EOT, 4, 5).is_err());
    }

    proptest! {
        #[test]
        fn prop_continuations_partition_document(
            len in 1usize..200,
            max_seq_len in 1usize..32,
            context_len in 1usize..32,
        ) {
            prop_assume!(context_len <= max_seq_len);
            let tokens: Vec<u32> = (0..len as u32).collect();
            let windows = disjoint_rolling_windows(&tokens, EOT, max_seq_len, context_len).unwrap();
            let covered: Vec<u32> = windows.iter().flat_map(|w| w.continuation.clone()).collect();
            prop_assert_eq!(covered, tokens.clone());
            prop_assert_eq!(&windows[0].context, &vec![EOT]);
        }

        #[test]
        fn prop_model_input_is_window_input(
            len in 1usize..200,
            max_seq_len in 1usize..32,
        ) {
            let tokens: Vec<u32> = (0..len as u32).collect();
            let overlapping = rolling_token_windows(&tokens, EOT, max_seq_len, 1).unwrap();
            for window in overlapping {
                let disjoint = make_disjoint_window(window.clone());
                let fed = model_input_ids(&disjoint.context, &disjoint.continuation, max_seq_len);
                prop_assert_eq!(fed, window.context);
            }
        }
    }
}
