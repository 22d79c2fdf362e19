mod model;

use candle_core::{Device, Tensor};
use serde_json::json;
use skewer::telemetry::init_tracing;
use skewer::{Evaluator, EvaluatorConfig, GenerationRequest};
use tracing::info;
use crate::model::{BigramModel, WordTokenizer};

#[tokio::main]
async fn main() -> skewer::Result<()> {
    init_tracing("info", false)?;

    let model = BigramModel::new(Device::Cpu, 6)?;
    let config = EvaluatorConfig::default().with_batch_size(4).with_max_gen_toks(4);
    let evaluator: Evaluator<Tensor, _, _> = Evaluator::new(model, WordTokenizer::new(), config)?;

    let pairs = vec![
        ("The cat sat on the".to_string(), " mat".to_string()),
        ("The cat sat on the".to_string(), " dog".to_string()),
        (String::new(), "The cat".to_string()),
    ];
    for ((context, continuation), result) in pairs.clone().into_iter().zip(evaluator.loglikelihood(pairs).await?) {
        info!(context = %context, continuation = %continuation, log_probability = result.log_probability, greedy = result.is_greedy_match, "loglikelihood");
    }

    let documents = vec!["The cat sat on the mat. The cat sat.".to_string(), String::new()];
    for (document, total) in documents.clone().into_iter().zip(evaluator.loglikelihood_rolling(documents).await?) {
        info!(document = %document, total, "rolling loglikelihood");
    }

    let requests = vec![
        GenerationRequest::new("The cat", json!({"until": ".", "max_gen_toks": 5})),
        GenerationRequest::new(" dog", json!({})),
    ];
    for output in evaluator.greedy_until(requests).await? {
        info!(output = %output, "generated");
    }
    Ok(())
}
