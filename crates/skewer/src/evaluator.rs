//! # Evaluator
//!
//! String-level entry points over a model, its tokenizer and the worker
//! topology:
//!
//! * [`Evaluator::loglikelihood`] - score `(context, continuation)` string pairs
//! * [`Evaluator::loglikelihood_rolling`] - total log-likelihood of whole documents
//! * [`Evaluator::greedy_until`] - generate until a stop string
//!
//! Token-level requests can be scored directly with [`Evaluator::score`].

use std::marker::PhantomData;
use tracing::{debug, info, instrument};
use crate::backend::TokenTensor;
use crate::config::EvaluatorConfig;
use crate::distributed::{pad_to_parity, trim_padding, SingleProcess, Topology};
use crate::error::{Error, Result};
use crate::generation::UntilGenerator;
use crate::model::{CausalModel, Tokenizer};
use crate::request::{CacheKey, GenerationRequest, Request, ScoreResult};
use crate::scorer::BatchScorer;
use crate::window::disjoint_rolling_windows;

/// Each rolling window past the first keeps this many tokens of context.
const ROLLING_CONTEXT_LEN: usize = 1;

pub struct Evaluator<T, M, K, P = SingleProcess>
where
    T: TokenTensor,
    M: CausalModel<T>,
    K: Tokenizer,
    P: Topology,
{
    model: M,
    tokenizer: K,
    topology: P,
    config: EvaluatorConfig,
    max_length: usize,
    scorer: BatchScorer<T>,
    _marker: PhantomData<T>,
}

impl<T, M, K> Evaluator<T, M, K, SingleProcess>
where
    T: TokenTensor,
    M: CausalModel<T>,
    K: Tokenizer,
{
    /// Evaluator for a single worker.
    pub fn new(model: M, tokenizer: K, config: EvaluatorConfig) -> Result<Self> {
        Self::with_topology(model, tokenizer, SingleProcess, config)
    }
}

impl<T, M, K, P> Evaluator<T, M, K, P>
where
    T: TokenTensor,
    M: CausalModel<T>,
    K: Tokenizer,
    P: Topology,
{
    /// Evaluator for one worker of a data-parallel group.
    ///
    /// The context window is `config.max_length` when set, the model's own
    /// otherwise. Only the main process reports progress at `info`.
    pub fn with_topology(model: M, tokenizer: K, topology: P, config: EvaluatorConfig) -> Result<Self> {
        config.validate()?;
        let max_length = config.max_length.unwrap_or_else(|| model.max_length());
        if max_length == 0 {
            return Err(Error::Config("model reports a context window of 0 tokens".into()));
        }
        let scorer = BatchScorer::new(config.batch_size, max_length, config.padding_token_id)
            .with_progress(topology.is_main_process());
        info!(
            rank = topology.rank(),
            world_size = topology.world_size(),
            batch_size = config.batch_size,
            max_length,
            "evaluator ready"
        );
        Ok(Self { model, tokenizer, topology, config, max_length, scorer, _marker: PhantomData })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn tokenizer(&self) -> &K {
        &self.tokenizer
    }

    pub fn topology(&self) -> &P {
        &self.topology
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Context window used for truncation and rolling windows
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Score token-level requests, results in caller order.
    pub async fn score(&self, requests: Vec<Request>) -> Result<Vec<ScoreResult>> {
        self.scorer.score(&self.model, requests).await
    }

    /// Tokenize one `(context, continuation)` pair. An empty context becomes
    /// the end-of-text token.
    pub fn encode_pair(&self, context: &str, continuation: &str) -> Result<Request> {
        let context_tokens = if context.is_empty() {
            vec![self.tokenizer.eot_token_id()]
        } else {
            self.tokenizer.encode(context)?
        };
        let continuation_tokens = self.tokenizer.encode(continuation)?;
        Request::new(
            Some(CacheKey { context: context.to_string(), continuation: continuation.to_string() }),
            context_tokens,
            continuation_tokens,
        )
    }

    /// Log-probability of each continuation given its context, and whether
    /// greedy decoding would produce it.
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn loglikelihood(&self, requests: Vec<(String, String)>) -> Result<Vec<ScoreResult>> {
        let requests = requests
            .iter()
            .map(|(context, continuation)| self.encode_pair(context, continuation))
            .collect::<Result<Vec<_>>>()?;
        self.score(requests).await
    }

    /// Total log-likelihood of each document, scored with rolling windows
    /// so that every token is predicted exactly once.
    ///
    /// Every worker of the group must call this with the same number of
    /// documents; the window counts are equalized per document.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn loglikelihood_rolling(&self, documents: Vec<String>) -> Result<Vec<f64>> {
        let total = documents.len();
        let mut loglikelihoods = Vec::with_capacity(total);
        for (index, document) in documents.iter().enumerate() {
            let tokens = self.tokenizer.encode(document)?;
            loglikelihoods.push(self.score_rolling(&tokens).await?);
            if self.topology.is_main_process() {
                info!(document = index + 1, total, "scored document");
            }
        }
        Ok(loglikelihoods)
    }

    /// Rolling log-likelihood of one tokenized document.
    ///
    /// An empty document has no windows and scores `0.0`. In a multi-worker
    /// group this joins the count gather even then, padding with an
    /// end-of-text request whose result is discarded.
    pub async fn score_rolling(&self, tokens: &[u32]) -> Result<f64> {
        let eot = self.tokenizer.eot_token_id();
        let mut requests = disjoint_rolling_windows(tokens, eot, self.max_length, ROLLING_CONTEXT_LEN)?
            .into_iter()
            .map(|window| Request::new(None, window.context, window.continuation))
            .collect::<Result<Vec<_>>>()?;
        let windows = requests.len();

        let pad_amount = pad_to_parity(&mut requests, &self.topology, || Request::new(None, vec![eot], vec![eot])).await?;
        if requests.is_empty() {
            return Ok(0.0);
        }
        debug!(tokens = tokens.len(), windows, pad_amount, "scoring rolling windows");

        // progress is reported per document by the caller
        let scorer = self.scorer.clone().with_progress(false);
        let results = trim_padding(scorer.score(&self.model, requests).await?, pad_amount)?;
        Ok(results.iter().map(|r| r.log_probability).sum())
    }

    /// Generate a continuation for each request until one of its stop strings.
    pub async fn greedy_until(&self, requests: Vec<GenerationRequest>) -> Result<Vec<String>> {
        UntilGenerator::<T>::new(self.max_length, self.config.max_gen_toks, self.config.do_sample)
            .generate(&self.model, &self.tokenizer, requests)
            .await
    }
}
