use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::{Barrier, Mutex};
use crate::error::{Error, Result};

/// # Topology
///
/// Placement of this worker in a data-parallel group.
///
/// `gather` is a blocking collective: it returns only once every worker in
/// the group has called it, so every worker must reach each `gather` the same
/// number of times or the group deadlocks. There is no timeout.
#[async_trait]
pub trait Topology: Send + Sync {
    /// Index of this worker, `0..world_size`
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn world_size(&self) -> usize;

    /// Collect one count from every worker, indexed by rank
    async fn gather(&self, local: usize) -> Result<Vec<usize>>;

    fn is_main_process(&self) -> bool {
        self.rank() == 0
    }
}

/// A group of one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

#[async_trait]
impl Topology for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    async fn gather(&self, local: usize) -> Result<Vec<usize>> {
        Ok(vec![local])
    }
}

struct GroupState {
    slots: Mutex<Vec<usize>>,
    barrier: Barrier,
}

/// One member of an in-process worker group.
///
/// Workers run as tasks on a shared runtime and exchange counts through
/// shared slots guarded by a barrier. Useful for simulating multi-worker
/// runs deterministically.
#[derive(Clone)]
pub struct LocalWorker {
    rank: usize,
    world_size: usize,
    state: Arc<GroupState>,
}

/// Builder for a simulated group of [`LocalWorker`]s.
pub struct LocalGroup;

impl LocalGroup {
    /// Create `world_size` connected workers, ordered by rank
    pub fn new(world_size: usize) -> Result<Vec<LocalWorker>> {
        if world_size == 0 {
            return Err(Error::Topology("world size must be at least 1".into()));
        }
        let state = Arc::new(GroupState {
            slots: Mutex::new(vec![0; world_size]),
            barrier: Barrier::new(world_size),
        });
        Ok((0..world_size)
            .map(|rank| LocalWorker { rank, world_size, state: state.clone() })
            .collect())
    }
}

#[async_trait]
impl Topology for LocalWorker {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    async fn gather(&self, local: usize) -> Result<Vec<usize>> {
        self.state.slots.lock().await[self.rank] = local;
        // everyone has written
        self.state.barrier.wait().await;
        let gathered = self.state.slots.lock().await.clone();
        // everyone has read, so the next round may overwrite
        self.state.barrier.wait().await;
        Ok(gathered)
    }
}
