use std::cmp::Ordering;

use tracing::{debug, warn};

use super::types::{ChunkPriority, ProcessingOrder};

/// Batch chunks so that parents run before children.
///
/// Each round takes the ready chunks (all dependencies processed), highest
/// importance first with ties broken by index, up to `max_parallel`. When
/// nothing is ready the remaining chunks form a cycle; they are all treated
/// as ready and the ones released that way are recorded in `forced`. Every
/// round processes at least one chunk, so the loop is bounded by the chunk
/// count.
pub fn create_processing_order(priorities: &[ChunkPriority], max_parallel: usize) -> ProcessingOrder {
    let n = priorities.len();
    let max_parallel = max_parallel.max(1);
    let mut processed = vec![false; n];
    let mut remaining = n;
    let mut order = ProcessingOrder::default();

    for _ in 0..n {
        if remaining == 0 {
            break;
        }

        let mut ready: Vec<usize> = (0..n)
            .filter(|&i| !processed[i])
            .filter(|&i| priorities[i].dependencies.iter().all(|&d| processed[d]))
            .collect();

        let fallback = ready.is_empty();
        if fallback {
            ready = (0..n).filter(|&i| !processed[i]).collect();
            warn!(
                unresolved = ready.len(),
                "dependency cycle among chunks, falling back to importance order"
            );
        }

        ready.sort_by(|&a, &b| {
            priorities[b]
                .importance
                .partial_cmp(&priorities[a].importance)
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        ready.truncate(max_parallel);

        for &i in &ready {
            processed[i] = true;
        }
        remaining -= ready.len();
        if fallback {
            order.forced.extend(ready.iter().copied());
        }
        debug!(batch = order.batches.len(), chunks = ?ready, "batch scheduled");
        order.batches.push(ready);
    }

    order
}
