use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use crate::backend::host::HostLogits;
use crate::error::{Error, Result};
use super::{CausalModel, GenerationOptions, Tokenizer};

/// Word-level tokenizer over a fixed vocabulary.
///
/// A piece is a word together with the spaces before it, so
/// `"The cat"` encodes as `["The", " cat"]`.
pub struct MockTokenizer {
    vocab: Vec<String>,
    ids: HashMap<String, u32>,
    eot_token_id: u32,
}

impl MockTokenizer {
    /// Build a tokenizer; the first entry is the end-of-text token
    pub fn new(vocab: &[&str]) -> Self {
        let vocab: Vec<String> = vocab.iter().map(|s| s.to_string()).collect();
        let ids = vocab.iter().enumerate().map(|(i, s)| (s.clone(), i as u32)).collect();
        Self { vocab, ids, eot_token_id: 0 }
    }

    pub fn id(&self, piece: &str) -> u32 {
        self.ids[piece]
    }

    fn pieces(text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut in_word = false;
        for c in text.chars() {
            if c == ' ' {
                if in_word {
                    pieces.push(std::mem::take(&mut current));
                    in_word = false;
                }
                current.push(c);
            } else {
                current.push(c);
                in_word = true;
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

impl Tokenizer for MockTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Self::pieces(text)
            .into_iter()
            .map(|p| self.ids.get(&p).copied().ok_or_else(|| Error::Tokenizer(format!("unknown piece {:?}", p))))
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        tokens
            .iter()
            .map(|&t| self.vocab.get(t as usize).cloned().ok_or_else(|| Error::Tokenizer(format!("unknown id {}", t))))
            .collect()
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn eot_token_id(&self) -> u32 {
        self.eot_token_id
    }
}

/// Deterministic bigram model on the host backend.
///
/// The score at a position depends only on the token there: a scripted
/// successor gets a high logit, everything else a flat zero. Every forward
/// batch and generate call is recorded for inspection.
#[derive(Clone)]
pub struct MockModel {
    vocab_size: usize,
    max_length: usize,
    successors: HashMap<u32, u32>,
    pub forward_batches: Arc<Mutex<Vec<Vec<Vec<u32>>>>>,
    pub generate_calls: Arc<Mutex<Vec<(Vec<Vec<u32>>, usize, u32, GenerationOptions)>>>,
    fail_forward: bool,
}

impl MockModel {
    pub fn new(vocab_size: usize, max_length: usize) -> Self {
        Self {
            vocab_size,
            max_length,
            successors: HashMap::new(),
            forward_batches: Default::default(),
            generate_calls: Default::default(),
            fail_forward: false,
        }
    }

    /// Make `next` the greedy prediction after `token`
    pub fn with_successor(mut self, token: u32, next: u32) -> Self {
        self.successors.insert(token, next);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_forward = true;
        self
    }

    pub fn row(&self, token: u32) -> Vec<f32> {
        let mut row = vec![0.0; self.vocab_size];
        if let Some(&next) = self.successors.get(&token) {
            row[next as usize] = 5.0;
        }
        row
    }

    /// Log-probability of `next` following `token`
    pub fn log_prob(&self, token: u32, next: u32) -> f64 {
        let row = self.row(token);
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum_exp: f64 = row.iter().map(|&x| ((x - max) as f64).exp()).sum();
        (row[next as usize] as f64) - (max as f64 + sum_exp.ln())
    }

    fn greedy_next(&self, token: u32) -> u32 {
        self.successors.get(&token).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CausalModel<Vec<u32>> for MockModel {
    type Logits = HostLogits;

    fn device(&self) -> &() {
        &()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    async fn forward(&self, batch: Vec<Vec<u32>>) -> Result<HostLogits> {
        if self.fail_forward {
            return Err(Error::Model("out of memory".into()));
        }
        self.forward_batches.lock().unwrap().push(batch.clone());
        let seq = batch.first().map_or(0, Vec::len);
        let data = batch
            .iter()
            .flat_map(|sequence| sequence.iter().flat_map(|&t| self.row(t)))
            .collect();
        HostLogits::new([batch.len(), seq, self.vocab_size], data)
    }

    async fn generate(
        &self,
        context: Vec<Vec<u32>>,
        max_length: usize,
        eos_token_id: u32,
        options: &GenerationOptions,
    ) -> Result<Vec<Vec<u32>>> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((context.clone(), max_length, eos_token_id, options.clone()));
        Ok(context
            .into_iter()
            .map(|mut sequence| {
                while sequence.len() < max_length {
                    let next = self.greedy_next(*sequence.last().unwrap_or(&eos_token_id));
                    sequence.push(next);
                    if next == eos_token_id {
                        break;
                    }
                }
                sequence
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_pieces() {
        let tokenizer = MockTokenizer::new(&["<eot>", "The", " cat", " sat"]);
        assert_eq!(tokenizer.encode("The cat sat").unwrap(), vec![1, 2, 3]);
        assert_eq!(tokenizer.decode(&[1, 2]).unwrap(), "The cat");
        assert!(tokenizer.encode(" dog").is_err());
        assert!(tokenizer.encode("").unwrap().is_empty());
    }

    #[test]
    fn test_single_token() {
        let tokenizer = MockTokenizer::new(&["<eot>", "The", " cat"]);
        assert!(tokenizer.encode_returns_single_token(" cat").unwrap());
        assert!(!tokenizer.encode_returns_single_token("The cat").unwrap());
    }
}
