//! Complete task reads for one inspection, paging past the store's row cap.

use crate::error::{EngineError, EngineResult};
use crate::store::TaskRepo;
use crate::types::{Page, Task};
use tracing::debug;

/// Fetch every task owned by `inspection_id`.
///
/// Requests successive windows of `page_size` rows until a short page comes
/// back. Any failed page aborts the whole fetch; rows gathered so far are
/// dropped with it.
pub async fn fetch_all_tasks<S>(store: &S, inspection_id: &str, page_size: usize) -> EngineResult<Vec<Task>>
where
    S: TaskRepo + ?Sized,
{
    if page_size == 0 {
        return Err(EngineError::invalid("page_size", "Page size must be at least 1"));
    }

    let mut tasks = Vec::new();
    let mut page = Page::first(page_size);
    let mut pages = 0usize;

    loop {
        let batch = store.list_tasks(inspection_id, page).await?;
        pages += 1;
        let short = batch.len() < page_size;
        tasks.extend(batch);
        if short {
            break;
        }
        page = page.next();
    }

    debug!(
        inspection = %inspection_id,
        rows = tasks.len(),
        pages,
        "Fetched inspection tasks"
    );
    Ok(tasks)
}
