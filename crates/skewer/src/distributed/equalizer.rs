use tracing::debug;
use super::Topology;
use crate::error::{Error, Result};

/// Pads the local request list so every worker holds the same number.
///
/// Each worker gathers all local counts and appends `max(counts) - local`
/// copies of its own first request; their content is irrelevant, only the
/// count matters. A worker with no requests at all pads with `filler()`.
///
/// Single-worker groups skip the collective entirely.
///
/// # Returns
///
/// The number of requests appended, to be handed to [`trim_padding`] once
/// results are back.
pub async fn pad_to_parity<R, P, F>(requests: &mut Vec<R>, topology: &P, filler: F) -> Result<usize>
where
    R: Clone,
    P: Topology + ?Sized,
    F: FnOnce() -> Result<R>,
{
    if topology.world_size() <= 1 {
        return Ok(0);
    }
    let local = requests.len();
    let counts = topology.gather(local).await?;
    if counts.len() != topology.world_size() || counts.get(topology.rank()) != Some(&local) {
        return Err(Error::Topology(format!(
            "rank {} reported {} requests but the gather returned {:?}",
            topology.rank(), local, counts
        )));
    }
    let target = counts.iter().copied().max().unwrap_or(local);
    let pad_amount = target - local;
    if pad_amount > 0 {
        let template = match requests.first() {
            Some(first) => first.clone(),
            None => filler()?,
        };
        requests.extend(std::iter::repeat(template).take(pad_amount));
        debug!(rank = topology.rank(), local, target, pad_amount, "padded requests to worker parity");
    }
    Ok(pad_amount)
}

/// Drops the results of the `pad_amount` requests added by [`pad_to_parity`].
pub fn trim_padding<T>(mut results: Vec<T>, pad_amount: usize) -> Result<Vec<T>> {
    if pad_amount > results.len() {
        return Err(Error::LengthMismatch { expected: pad_amount, got: results.len() });
    }
    results.truncate(results.len() - pad_amount);
    Ok(results)
}
