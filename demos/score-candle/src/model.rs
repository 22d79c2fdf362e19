use std::collections::HashMap;
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use skewer::model::{CausalModel, GenerationOptions, Tokenizer};
use skewer::{Error, Result};

pub const VOCAB: &[&str] = &["<|endoftext|>", "The", " cat", " sat", " on", " the", " mat", ".", " dog", " ran", " The"];

/// Splits on spaces, keeping each word's leading spaces, over [`VOCAB`].
pub struct WordTokenizer {
    ids: HashMap<&'static str, u32>,
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self { ids: VOCAB.iter().enumerate().map(|(i, w)| (*w, i as u32)).collect() }
    }
}

impl Tokenizer for WordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut tokens = Vec::new();
        let mut start = 0;
        for (i, c) in text.char_indices() {
            let boundary = (c == ' ' || c == '.') && i > start && !text[start..i].trim().is_empty();
            if boundary {
                tokens.push(self.lookup(&text[start..i])?);
                start = i;
            }
        }
        if start < text.len() {
            tokens.push(self.lookup(&text[start..])?);
        }
        Ok(tokens)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        tokens
            .iter()
            .map(|&t| VOCAB.get(t as usize).copied().ok_or_else(|| Error::Tokenizer(format!("unknown id {t}"))))
            .collect()
    }

    fn vocab_size(&self) -> usize {
        VOCAB.len()
    }

    fn eot_token_id(&self) -> u32 {
        0
    }
}

impl WordTokenizer {
    fn lookup(&self, piece: &str) -> Result<u32> {
        self.ids.get(piece).copied().ok_or_else(|| Error::Tokenizer(format!("unknown word {piece:?}")))
    }
}

/// A bigram model: the logits at a position are a row of a fixed
/// `(vocab, vocab)` transition table, picked by the token there.
pub struct BigramModel {
    device: Device,
    table: Vec<f32>,
    transitions: Tensor,
    max_length: usize,
}

impl BigramModel {
    pub fn new(device: Device, max_length: usize) -> Result<Self> {
        let v = VOCAB.len();
        let mut table = vec![0.0f32; v * v];
        // The cat sat on the mat.
        for (from, to) in [(1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 7), (7, 0), (0, 1), (10, 2)] {
            table[from * v + to] = 4.0;
        }
        table[8 * v + 9] = 4.0;
        let transitions = Tensor::from_vec(table.clone(), (v, v), &device)?;
        Ok(Self { device, table, transitions, max_length })
    }

    fn greedy_next(&self, token: u32) -> u32 {
        let v = VOCAB.len();
        let row = &self.table[token as usize * v..(token as usize + 1) * v];
        row.iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &x)| if x > best.1 { (i, x) } else { best })
            .0 as u32
    }
}

#[async_trait]
impl CausalModel<Tensor> for BigramModel {
    type Logits = Tensor;

    fn device(&self) -> &Device {
        &self.device
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    async fn forward(&self, batch: Tensor) -> Result<Tensor> {
        let (batch_size, seq_len) = batch.dims2()?;
        let rows = self.transitions.index_select(&batch.flatten_all()?, 0)?;
        Ok(rows.reshape((batch_size, seq_len, VOCAB.len()))?)
    }

    async fn generate(
        &self,
        context: Tensor,
        max_length: usize,
        eos_token_id: u32,
        _options: &GenerationOptions,
    ) -> Result<Vec<Vec<u32>>> {
        let mut sequences = context.to_vec2::<u32>()?;
        for sequence in sequences.iter_mut() {
            while sequence.len() < max_length {
                let next = self.greedy_next(sequence.last().copied().unwrap_or(eos_token_id));
                sequence.push(next);
                if next == eos_token_id {
                    break;
                }
            }
        }
        Ok(sequences)
    }
}
