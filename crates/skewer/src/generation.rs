//! # Generation Batch Path
//!
//! Free-text generation until a stop string, one request per `generate` call.
//!
//! Requests are ordered by ascending tokenized context length and restored to
//! caller order afterwards.
//!
//! ## Stop strings
//!
//! The model is only told about a single stop token: the first stop string's
//! id when it encodes to exactly one token, otherwise the end-of-text token.
//! The decoded output is then cut at the first occurrence of each stop string
//! in turn. Multi-token stop strings therefore generate past the stop point
//! and are trimmed afterwards; this approximation is intended.

use std::marker::PhantomData;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use crate::backend::TokenTensor;
use crate::error::{Error, Result};
use crate::model::{CausalModel, GenerationOptions, Tokenizer};
use crate::reorder::Reorderer;
use crate::request::GenerationRequest;
use crate::tensor::operations::trim_sequence;

/// Interpreted `gen_kwargs` of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Stop strings; `None` when the request named none
    pub until: Option<Vec<String>>,
    pub max_gen_toks: usize,
    pub options: GenerationOptions,
}

/// Validate and split a request's `gen_kwargs`.
///
/// `until` must be a string or a list of strings; an empty list counts as
/// absent. `max_gen_toks` must be a positive integer. `do_sample` must be a
/// boolean and falls back to `default_do_sample`. Every other key is kept in
/// [`GenerationOptions::extra`].
pub fn parse_gen_kwargs(
    gen_kwargs: &Value,
    default_max_gen_toks: usize,
    default_do_sample: bool,
) -> Result<GenerationParams> {
    let Value::Object(kwargs) = gen_kwargs else {
        return Err(Error::InvalidGenerationKwargs(format!(
            "expected `gen_kwargs` to be an object but got {}", gen_kwargs
        )));
    };
    let mut extra: Map<String, Value> = kwargs.clone();

    let until = match extra.remove("until") {
        None | Some(Value::Null) => None,
        Some(Value::String(stop)) => Some(vec![stop]),
        Some(Value::Array(stops)) => {
            let stops = stops
                .into_iter()
                .map(|stop| match stop {
                    Value::String(s) => Ok(s),
                    other => Err(Error::InvalidGenerationKwargs(format!(
                        "expected every `until` entry to be a string but got {}", other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            (!stops.is_empty()).then_some(stops)
        }
        Some(other) => {
            return Err(Error::InvalidGenerationKwargs(format!(
                "expected `until` to be a string or a list of strings but got {}", other
            )));
        }
    };

    let max_gen_toks = match extra.remove("max_gen_toks") {
        None | Some(Value::Null) => default_max_gen_toks,
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => n as usize,
            _ => {
                return Err(Error::InvalidGenerationKwargs(format!(
                    "expected `max_gen_toks` to be a positive integer but got {}", value
                )));
            }
        },
    };

    let do_sample = match extra.remove("do_sample") {
        None | Some(Value::Null) => default_do_sample,
        Some(Value::Bool(b)) => b,
        Some(other) => {
            return Err(Error::InvalidGenerationKwargs(format!(
                "expected `do_sample` to be a boolean but got {}", other
            )));
        }
    };

    Ok(GenerationParams {
        until,
        max_gen_toks,
        options: GenerationOptions { do_sample, extra },
    })
}

/// Cut `text` at the first occurrence of each stop string, in order.
pub fn truncate_at_stops(text: &str, until: &[String]) -> String {
    let mut text = text;
    for stop in until.iter().filter(|s| !s.is_empty()) {
        if let Some(position) = text.find(stop.as_str()) {
            text = &text[..position];
        }
    }
    text.to_string()
}

/// Runs `greedy_until` requests one at a time against a [`CausalModel`].
#[derive(Debug, Clone)]
pub struct UntilGenerator<T> {
    max_length: usize,
    max_gen_toks: usize,
    do_sample: bool,
    _marker: PhantomData<T>,
}

impl<T> UntilGenerator<T>
where T: TokenTensor
{
    pub fn new(max_length: usize, max_gen_toks: usize, do_sample: bool) -> Self {
        Self { max_length, max_gen_toks, do_sample, _marker: PhantomData }
    }

    /// Generate a continuation for every request, returned in caller order.
    ///
    /// Every request's kwargs and generation budget are checked before the
    /// first `generate` call, so a malformed request fails the whole call
    /// without any model work.
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn generate<M, K>(
        &self,
        model: &M,
        tokenizer: &K,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<String>>
    where
        M: CausalModel<T> + ?Sized,
        K: Tokenizer + ?Sized,
    {
        let prepared = requests
            .into_iter()
            .map(|request| {
                let params = parse_gen_kwargs(&request.gen_kwargs, self.max_gen_toks, self.do_sample)?;
                if params.max_gen_toks >= self.max_length {
                    return Err(Error::ContextTooLong { max_gen_toks: params.max_gen_toks, max_length: self.max_length });
                }
                let tokens = tokenizer.encode(&request.context)?;
                Ok((request.context, tokens, params))
            })
            .collect::<Result<Vec<_>>>()?;

        // shortest context first
        let re_ord = Reorderer::new(prepared, |(context, tokens, _)| (tokens.len(), context.clone()));
        let mut results = Vec::with_capacity(re_ord.len());
        for (_, tokens, params) in re_ord.reordered() {
            results.push(self.generate_one(model, tokenizer, tokens, params).await?);
        }
        re_ord.restore(results)
    }

    async fn generate_one<M, K>(
        &self,
        model: &M,
        tokenizer: &K,
        context_tokens: &[u32],
        params: &GenerationParams,
    ) -> Result<String>
    where
        M: CausalModel<T> + ?Sized,
        K: Tokenizer + ?Sized,
    {
        let until = match &params.until {
            Some(until) => until.clone(),
            None => vec![tokenizer.decode(&[tokenizer.eot_token_id()])?],
        };

        let primary_until = match tokenizer.single_token(&until[0])? {
            Some(token) => token,
            None => {
                warn!(stop = %until[0], "stop string is not a single token, generating to end of text and trimming");
                tokenizer.eot_token_id()
            }
        };

        let eot = [tokenizer.eot_token_id()];
        let context = match trim_sequence(context_tokens, self.max_length - params.max_gen_toks) {
            [] => &eot[..],
            trimmed => trimmed,
        };

        let input = T::stack(&[T::from_ids(context, model.device())?])?;
        let max_length = context.len() + params.max_gen_toks;
        debug!(context_len = context.len(), max_length, primary_until, "generating");
        let output = model
            .generate(input, max_length, primary_until, &params.options)
            .await?;
        let generated = output
            .into_iter()
            .next()
            .ok_or_else(|| Error::Model("generate returned no sequences".into()))?;
        let continuation = tokenizer.decode(generated.get(context.len()..).unwrap_or(&[]))?;

        Ok(truncate_at_stops(&continuation, &until))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::model::mock_model::{MockModel, MockTokenizer};

    const VOCAB: &[&str] = &["<eot>", "Q:", " what", " is", " it", "\n", " a", " cat", " dog", "A:", " yes"];

    fn fixtures() -> (MockTokenizer, MockModel) {
        let tokenizer = MockTokenizer::new(VOCAB);
        // " it" -> " a" -> " cat" -> "\n" -> "A:" -> " yes" -> <eot>
        let model = MockModel::new(VOCAB.len(), 64)
            .with_successor(tokenizer.id(" it"), tokenizer.id(" a"))
            .with_successor(tokenizer.id(" a"), tokenizer.id(" cat"))
            .with_successor(tokenizer.id(" cat"), tokenizer.id("\n"))
            .with_successor(tokenizer.id("\n"), tokenizer.id("A:"))
            .with_successor(tokenizer.id("A:"), tokenizer.id(" yes"))
            .with_successor(tokenizer.id(" yes"), tokenizer.id("<eot>"));
        (tokenizer, model)
    }

    #[test]
    fn test_parse_defaults() {
        let params = parse_gen_kwargs(&json!({}), 256, false).unwrap();
        assert_eq!(params.until, None);
        assert_eq!(params.max_gen_toks, 256);
        assert!(!params.options.do_sample);
        assert!(params.options.extra.is_empty());
    }

    #[test]
    fn test_parse_until_string_and_extra() {
        let params = parse_gen_kwargs(&json!({"until": "\n", "max_gen_toks": 8, "temperature": 0.5}), 256, false).unwrap();
        assert_eq!(params.until, Some(vec!["\n".to_string()]));
        assert_eq!(params.max_gen_toks, 8);
        assert_eq!(params.options.extra.get("temperature"), Some(&json!(0.5)));
    }

    #[test]
    fn test_parse_empty_until_is_absent() {
        let params = parse_gen_kwargs(&json!({"until": []}), 256, false).unwrap();
        assert_eq!(params.until, None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for kwargs in [json!("until"), json!({"until": 3}), json!({"until": ["a", 1]}), json!({"max_gen_toks": 0}), json!({"do_sample": "yes"})] {
            let err = parse_gen_kwargs(&kwargs, 256, false).unwrap_err();
            assert!(matches!(err, Error::InvalidGenerationKwargs(_)), "{kwargs}");
        }
    }

    #[test]
    fn test_truncate_at_stops() {
        let until = vec!["\n".to_string(), "A:".to_string()];
        assert_eq!(truncate_at_stops(" a cat\nA: yes", &until), " a cat");
        assert_eq!(truncate_at_stops(" a catA: yes", &until), " a cat");
        assert_eq!(truncate_at_stops(" a cat", &[String::new()]), " a cat");
    }

    #[tokio::test]
    async fn test_single_token_stop() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(64, 16, false);
        let requests = vec![GenerationRequest::new("Q: what is it", json!({"until": ["\n"]}))];
        let outputs = generator.generate(&model, &tokenizer, requests).await.unwrap();
        assert_eq!(outputs, vec![" a cat".to_string()]);

        let calls = model.generate_calls.lock().unwrap();
        let (context, max_length, eos, options) = &calls[0];
        assert_eq!(context[0].len(), 4);
        assert_eq!(*max_length, 4 + 16);
        assert_eq!(*eos, tokenizer.id("\n"));
        assert!(!options.do_sample);
    }

    #[tokio::test]
    async fn test_multi_token_stop_falls_back_to_eot() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(64, 16, false);
        let requests = vec![GenerationRequest::new("Q: what is it", json!({"until": "A: yes"}))];
        let outputs = generator.generate(&model, &tokenizer, requests).await.unwrap();
        assert_eq!(outputs, vec![" a cat\n".to_string()]);
        let calls = model.generate_calls.lock().unwrap();
        assert_eq!(calls[0].2, tokenizer.eot_token_id());
    }

    #[tokio::test]
    async fn test_default_until_is_eot() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(64, 16, false);
        let requests = vec![GenerationRequest::new("Q: what is it", json!({}))];
        let outputs = generator.generate(&model, &tokenizer, requests).await.unwrap();
        assert_eq!(outputs, vec![" a cat\nA: yes".to_string()]);
    }

    #[tokio::test]
    async fn test_context_trimmed_to_budget() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(6, 4, false);
        let requests = vec![GenerationRequest::new("Q: what is it", json!({"until": "\n"}))];
        let outputs = generator.generate(&model, &tokenizer, requests).await.unwrap();
        assert_eq!(outputs, vec![" a cat".to_string()]);
        let calls = model.generate_calls.lock().unwrap();
        assert_eq!(calls[0].0[0], vec![tokenizer.id(" is"), tokenizer.id(" it")]);
        assert_eq!(calls[0].1, 6);
    }

    #[tokio::test]
    async fn test_budget_larger_than_window_fails() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(8, 8, false);
        let requests = vec![GenerationRequest::new("Q: what is it", json!({}))];
        let err = generator.generate(&model, &tokenizer, requests).await.unwrap_err();
        assert!(matches!(err, Error::ContextTooLong { .. }));
    }

    #[tokio::test]
    async fn test_malformed_request_fails_before_generating() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(64, 16, false);
        // the valid request sorts first
        let requests = vec![
            GenerationRequest::new("Q: what is it", json!({"until": 3})),
            GenerationRequest::new(" it", json!({"until": "\n"})),
        ];
        let err = generator.generate(&model, &tokenizer, requests).await.unwrap_err();
        assert!(matches!(err, Error::InvalidGenerationKwargs(_)));
        assert!(model.generate_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_budget_fails_before_generating() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(8, 4, false);
        let requests = vec![
            GenerationRequest::new("Q: what is it", json!({"max_gen_toks": 8})),
            GenerationRequest::new(" it", json!({"until": "\n"})),
        ];
        let err = generator.generate(&model, &tokenizer, requests).await.unwrap_err();
        assert!(matches!(err, Error::ContextTooLong { max_gen_toks: 8, max_length: 8 }));
        assert!(model.generate_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shortest_context_first_and_order_restored() {
        let (tokenizer, model) = fixtures();
        let generator = UntilGenerator::<Vec<u32>>::new(64, 16, false);
        let requests = vec![
            GenerationRequest::new("Q: what is it", json!({"until": "\n"})),
            GenerationRequest::new(" it", json!({"until": "\n", "do_sample": true})),
        ];
        let outputs = generator.generate(&model, &tokenizer, requests).await.unwrap();
        assert_eq!(outputs, vec![" a cat".to_string(), " a cat".to_string()]);
        let calls = model.generate_calls.lock().unwrap();
        assert_eq!(calls[0].0[0].len(), 1);
        assert!(calls[0].3.do_sample);
        assert_eq!(calls[1].0[0].len(), 4);
    }
}
