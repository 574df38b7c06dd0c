//! Bounded batch execution with order-preserving collection.

use std::future::Future;

use futures_util::future::join_all;

use crate::error::RenderResult;

/// Run `f` over `items` in batches of `batch_size`, awaiting each batch
/// fully before starting the next.
///
/// Tasks within a batch run concurrently and may finish in any order;
/// results are slotted by item index, so the returned vector is always in
/// input order. The first error aborts the run after its batch completes.
pub async fn run_batched<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    mut f: F,
) -> RenderResult<Vec<R>>
where
    F: FnMut(usize, T) -> Fut,
    Fut: Future<Output = RenderResult<R>>,
{
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    let mut remaining = items.into_iter().enumerate();

    loop {
        let batch: Vec<(usize, Fut)> = remaining
            .by_ref()
            .take(batch_size.max(1))
            .map(|(index, item)| (index, f(index, item)))
            .collect();

        if batch.is_empty() {
            break;
        }

        let tagged = batch
            .into_iter()
            .map(|(index, fut)| async move { (index, fut.await) });

        for (index, result) in join_all(tagged).await {
            slots[index] = Some(result?);
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
