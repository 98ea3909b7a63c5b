/*!
 * Character-budget batching with split-on-failure recovery.
 */

use log::warn;
use std::collections::VecDeque;
use std::future::Future;

use crate::errors::{AnalysisError, ProviderError};

use super::CancellationFlag;

/// Group items into batches whose serialized size stays under `budget`.
///
/// The budget is soft: an item larger than the budget gets a batch of its own.
/// Item order is preserved.
pub fn batch_by_budget<T>(items: Vec<T>, budget: usize, size_of: impl Fn(&T) -> usize) -> Vec<Vec<T>> {
    let mut batches: Vec<Vec<T>> = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut current_size = 0;

    for item in items {
        let size = size_of(&item);
        if !current.is_empty() && current_size + size > budget {
            batches.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(item);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Run `call` over each batch; a failed batch is split in half and each half
/// retried the same way.
///
/// A single-item batch that still fails is skipped with a warning. Results
/// keep batch order. The cancellation flag is checked before every call.
pub async fn run_with_split<T, R, F, Fut>(
    batches: Vec<Vec<T>>,
    cancel: &CancellationFlag,
    mut call: F,
) -> Result<Vec<R>, AnalysisError>
where
    T: std::fmt::Debug,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<R>, (Vec<T>, ProviderError)>>,
{
    let mut queue: VecDeque<Vec<T>> = batches.into_iter().filter(|b| !b.is_empty()).collect();
    let mut results = Vec::new();

    while let Some(batch) = queue.pop_front() {
        cancel.check()?;
        match call(batch).await {
            Ok(mut batch_results) => results.append(&mut batch_results),
            Err((mut failed, error)) if failed.len() > 1 => {
                let second = failed.split_off(failed.len() / 2);
                warn!(
                    "Batch of {} items failed ({}), retrying as {} + {}",
                    failed.len() + second.len(),
                    error,
                    failed.len(),
                    second.len()
                );
                queue.push_front(second);
                queue.push_front(failed);
            }
            Err((failed, error)) => {
                warn!("Skipping item after repeated failure ({}): {:?}", error, failed);
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batchByBudget_shouldRespectSoftLimit() {
        let items = vec!["aaaa", "bbbb", "cc", "dddddddddd", "e"];
        let batches = batch_by_budget(items, 8, |s| s.len());
        assert_eq!(batches, vec![vec!["aaaa", "bbbb"], vec!["cc"], vec!["dddddddddd"], vec!["e"]]);
    }

    #[test]
    fn test_batchByBudget_empty_shouldYieldNoBatches() {
        let batches = batch_by_budget(Vec::<String>::new(), 100, |s| s.len());
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn test_runWithSplit_failingItem_shouldSplitAndSkipIt() {
        let cancel = CancellationFlag::new();
        let mut calls = Vec::new();

        let results = run_with_split(vec![vec![1, 2, 3, 4]], &cancel, |batch: Vec<i32>| {
            calls.push(batch.clone());
            async move {
                if batch.contains(&3) {
                    Err((batch, ProviderError::Timeout("slow".to_string())))
                } else {
                    Ok(batch.iter().map(|n| n * 2).collect::<Vec<_>>())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(results, vec![2, 4, 8]);
        assert_eq!(calls, vec![vec![1, 2, 3, 4], vec![1, 2], vec![3, 4], vec![3], vec![4]]);
    }

    #[tokio::test]
    async fn test_runWithSplit_cancelled_shouldStopBeforeCalling() {
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let result = run_with_split(vec![vec![1]], &cancel, |batch: Vec<i32>| async move {
            Ok::<_, (Vec<i32>, ProviderError)>(vec![batch[0]])
        })
        .await;

        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }
}
