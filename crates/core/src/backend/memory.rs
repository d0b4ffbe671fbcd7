use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BackendError, BatchReport, ResourceBackend};
use crate::models::{ImageReference, ResourceKind, ResourceRecord, UNTAGGED_IMAGE};

/// Thread-safe in-memory runtime with failure injection.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    resources: HashMap<ResourceKind, Vec<ResourceRecord>>,
    unavailable: bool,
    failing_deletes: HashSet<String>,
    failing_tags: HashSet<String>,
    failing_pushes: HashSet<String>,
    tagged: Vec<(String, String)>,
    pushed: Vec<String>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a small, plausible data set for demo mode.
    pub fn demo() -> Self {
        let backend = Self::new();
        backend.set_records(
            ResourceKind::Containers,
            (1..=14)
                .map(|n| {
                    let status = if n % 3 == 0 {
                        "Exited (0) 2 days ago"
                    } else {
                        "Up 3 hours"
                    };
                    ResourceRecord::new(
                        format!("c{n:02}a7f3e9b1d2c4"),
                        format!("demo-service-{n}"),
                        format!("ID: c{n:02}a7f3e9b1d | Status: {status}"),
                    )
                })
                .collect(),
        );
        backend.set_records(
            ResourceKind::Images,
            vec![
                ResourceRecord::new("sha256:1f0e", "nginx:1.25", "ID: 1f0e | Size: 187MB"),
                ResourceRecord::new("sha256:2b9c", "postgres:16", "ID: 2b9c | Size: 432MB"),
                ResourceRecord::new("sha256:3d4a", "myapp:dev", "ID: 3d4a | Size: 96MB"),
                ResourceRecord::new("sha256:4e11", UNTAGGED_IMAGE, "ID: 4e11 | Size: 12MB"),
            ],
        );
        backend.set_records(
            ResourceKind::Volumes,
            vec![
                ResourceRecord::new("pgdata", "pgdata", "Driver: local"),
                ResourceRecord::new("cache", "cache", "Driver: local"),
            ],
        );
        backend
    }

    /// Replace every record of `kind`.
    pub fn set_records(&self, kind: ResourceKind, records: Vec<ResourceRecord>) {
        self.inner.lock().resources.insert(kind, records);
    }

    /// Toggle whether calls fail with [`BackendError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.inner.lock().unavailable = !available;
    }

    /// Make deleting `id` fail.
    pub fn fail_delete(&self, id: impl Into<String>) {
        self.inner.lock().failing_deletes.insert(id.into());
    }

    /// Make tagging image `id` fail.
    pub fn fail_tag(&self, id: impl Into<String>) {
        self.inner.lock().failing_tags.insert(id.into());
    }

    /// Make pushing `reference` (`repository:tag`) fail.
    pub fn fail_push(&self, reference: impl Into<String>) {
        self.inner.lock().failing_pushes.insert(reference.into());
    }

    /// `(image id, reference)` pairs tagged so far.
    pub fn tagged(&self) -> Vec<(String, String)> {
        self.inner.lock().tagged.clone()
    }

    /// References pushed so far.
    pub fn pushed(&self) -> Vec<String> {
        self.inner.lock().pushed.clone()
    }

    fn ensure_available(inner: &Inner) -> Result<(), BackendError> {
        if inner.unavailable {
            return Err(BackendError::Unavailable("in-memory runtime offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceBackend for MemoryBackend {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, BackendError> {
        let inner = self.inner.lock();
        Self::ensure_available(&inner)?;
        Ok(inner.resources.get(&kind).cloned().unwrap_or_default())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        ids: &[String],
    ) -> Result<BatchReport, BackendError> {
        let mut inner = self.inner.lock();
        Self::ensure_available(&inner)?;
        let mut report = BatchReport::default();
        for id in ids {
            if inner.failing_deletes.contains(id) {
                report.record(
                    id.clone(),
                    Err(BackendError::rejected("delete", id.clone(), "resource is in use")),
                );
                continue;
            }
            let records = inner.resources.entry(kind).or_default();
            match records.iter().position(|record| &record.id == id) {
                Some(index) => {
                    records.remove(index);
                    report.record(id.clone(), Ok(()));
                }
                None => report.record(
                    id.clone(),
                    Err(BackendError::rejected("delete", id.clone(), "no such resource")),
                ),
            }
        }
        Ok(report)
    }

    async fn tag(&self, image_id: &str, target: &ImageReference) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        Self::ensure_available(&inner)?;
        if inner.failing_tags.contains(image_id) {
            return Err(BackendError::rejected("tag", image_id, "no such image"));
        }
        inner.tagged.push((image_id.to_string(), target.to_string()));
        Ok(())
    }

    async fn push(&self, target: &ImageReference) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        Self::ensure_available(&inner)?;
        let reference = target.to_string();
        if inner.failing_pushes.contains(&reference) {
            return Err(BackendError::rejected(
                "push",
                reference,
                "denied: requested access to the resource is denied",
            ));
        }
        inner.pushed.push(reference);
        Ok(())
    }

    async fn list_running(&self) -> Result<Vec<ResourceRecord>, BackendError> {
        let inner = self.inner.lock();
        Self::ensure_available(&inner)?;
        Ok(inner
            .resources
            .get(&ResourceKind::Containers)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| record.description.contains("Status: Up"))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_reports_per_item_outcomes() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        backend.set_records(
            ResourceKind::Volumes,
            vec![
                ResourceRecord::new("a", "a", ""),
                ResourceRecord::new("b", "b", ""),
            ],
        );
        backend.fail_delete("b");

        let report = backend
            .delete(ResourceKind::Volumes, &["a".to_string(), "b".to_string()])
            .await?;
        assert_eq!(report.succeeded, vec!["a".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "b");

        let remaining = backend.list(ResourceKind::Volumes).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_backend_rejects_calls() {
        let backend = MemoryBackend::demo();
        backend.set_available(false);
        let err = backend.list(ResourceKind::Images).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn running_filters_stopped_containers() -> anyhow::Result<()> {
        let backend = MemoryBackend::demo();
        let all = backend.list(ResourceKind::Containers).await?;
        let running = backend.list_running().await?;
        assert!(running.len() < all.len());
        assert!(running.iter().all(|record| record.description.contains("Up")));
        Ok(())
    }
}
