#![allow(missing_docs)]

use std::{collections::HashSet, sync::Arc};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Operation, View};
use crate::{
    backend::{BackendError, ResourceBackend},
    models::{ResourceKind, ResourceRecord},
};

/// Sending half handed to background tasks.
pub type TaskSender = mpsc::UnboundedSender<TaskResult>;
/// Receiving half drained by the frontend loop.
pub type TaskReceiver = mpsc::UnboundedReceiver<TaskResult>;

/// Create the channel background tasks post their results to.
pub fn task_channel() -> (TaskSender, TaskReceiver) {
    mpsc::unbounded_channel()
}

/// Identifies an in-flight operation; at most one may run per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub view: View,
    pub operation: Operation,
}

impl TaskKey {
    pub fn new(view: View, operation: Operation) -> Self {
        Self { view, operation }
    }
}

/// Why a load was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Entering a view or an explicit reload; selection flags are reset.
    Fresh,
    /// Refresh following a delete; flags are merged by id and the delete
    /// summary stays on the status line.
    AfterDelete { summary: String },
}

/// Result of listing a view's resources.
#[derive(Debug)]
pub struct LoadResult {
    pub view: View,
    pub origin: LoadOrigin,
    pub records: Result<Vec<ResourceRecord>, BackendError>,
}

/// Result of a bulk delete.
#[derive(Debug)]
pub struct DeleteResult {
    pub kind: ResourceKind,
    pub requested: usize,
    pub deleted_ids: Vec<String>,
    pub errors: Vec<BackendError>,
}

/// Result of a publish batch.
#[derive(Debug)]
pub struct PublishResult {
    pub requested: usize,
    pub published_ids: Vec<String>,
    pub errors: Vec<BackendError>,
}

/// Anything a background task can hand back to the console.
#[derive(Debug)]
pub enum TaskOutcome {
    Load(LoadResult),
    Delete(DeleteResult),
    Publish(PublishResult),
}

impl TaskOutcome {
    /// The in-flight slot this outcome releases.
    pub fn key(&self) -> TaskKey {
        match self {
            TaskOutcome::Load(result) => TaskKey::new(result.view, Operation::Load),
            TaskOutcome::Delete(result) => {
                TaskKey::new(View::List(result.kind), Operation::Delete)
            }
            TaskOutcome::Publish(_) => TaskKey::new(View::Publisher, Operation::Publish),
        }
    }
}

/// A finished task, stamped with the console generation that started it.
///
/// The generation changes every time the console enters or leaves a view, so
/// a result from an earlier visit to the same view can be told apart.
#[derive(Debug)]
pub struct TaskResult {
    pub generation: u64,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    /// The in-flight slot this result releases.
    pub fn key(&self) -> TaskKey {
        self.outcome.key()
    }
}

/// Registry of operations currently running in the background.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    keys: HashSet<TaskKey>,
}

impl InFlight {
    /// Claim `key`; returns `false` when it is already taken.
    pub(crate) fn try_begin(&mut self, key: TaskKey) -> bool {
        self.keys.insert(key)
    }

    pub(crate) fn finish(&mut self, key: TaskKey) {
        if !self.keys.remove(&key) {
            debug!(?key, "result for operation that was not tracked");
        }
    }

    pub(crate) fn contains(&self, key: TaskKey) -> bool {
        self.keys.contains(&key)
    }
}

pub(crate) async fn load_view(
    backend: Arc<dyn ResourceBackend>,
    view: View,
    origin: LoadOrigin,
) -> LoadResult {
    let records = backend.list(view.kind()).await.map(|records| match view {
        View::Publisher => records
            .into_iter()
            .filter(|record| !record.is_untagged_image())
            .collect(),
        View::List(_) => records,
    });
    if let Err(err) = &records {
        warn!(%view, %err, "load failed");
    }
    LoadResult {
        view,
        origin,
        records,
    }
}

pub(crate) async fn delete_records(
    backend: Arc<dyn ResourceBackend>,
    kind: ResourceKind,
    ids: Vec<String>,
) -> DeleteResult {
    let requested = ids.len();
    match backend.delete(kind, &ids).await {
        Ok(report) => DeleteResult {
            kind,
            requested,
            deleted_ids: report.succeeded,
            errors: report
                .failures
                .into_iter()
                .map(|failure| {
                    warn!(%kind, id = %failure.id, err = %failure.error, "delete failed");
                    failure.error
                })
                .collect(),
        },
        Err(err) => {
            warn!(%kind, %err, "delete aborted");
            DeleteResult {
                kind,
                requested,
                deleted_ids: Vec::new(),
                errors: vec![err],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::UNTAGGED_IMAGE;

    #[test]
    fn in_flight_admits_one_per_key() {
        let mut in_flight = InFlight::default();
        let images = TaskKey::new(View::List(ResourceKind::Images), Operation::Load);
        let publisher = TaskKey::new(View::Publisher, Operation::Load);

        assert!(in_flight.try_begin(images));
        assert!(!in_flight.try_begin(images));
        assert!(in_flight.try_begin(publisher));
        assert!(in_flight.contains(images));

        in_flight.finish(images);
        assert!(!in_flight.contains(images));
        assert!(in_flight.try_begin(images));
    }

    #[tokio::test]
    async fn publisher_load_excludes_untagged_images() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_records(
            ResourceKind::Images,
            vec![
                ResourceRecord::new("a", "web:1", ""),
                ResourceRecord::new("b", UNTAGGED_IMAGE, ""),
            ],
        );

        let publisher = load_view(backend.clone(), View::Publisher, LoadOrigin::Fresh).await;
        let titles: Vec<String> = publisher
            .records
            .map(|records| records.into_iter().map(|record| record.title).collect())
            .unwrap_or_default();
        assert_eq!(titles, vec!["web:1".to_string()]);

        let list = load_view(backend, View::List(ResourceKind::Images), LoadOrigin::Fresh).await;
        assert_eq!(list.records.map(|records| records.len()).unwrap_or(0), 2);
    }

    #[tokio::test]
    async fn unreachable_backend_fails_whole_delete() {
        let backend = Arc::new(MemoryBackend::demo());
        backend.set_available(false);
        let result = delete_records(backend, ResourceKind::Volumes, vec!["pgdata".into()]).await;
        assert_eq!(result.requested, 1);
        assert!(result.deleted_ids.is_empty());
        assert!(matches!(result.errors.as_slice(), [BackendError::Unavailable(_)]));
        assert_eq!(
            TaskOutcome::Delete(result).key(),
            TaskKey::new(View::List(ResourceKind::Volumes), Operation::Delete)
        );
    }
}
