use async_trait::async_trait;
use bollard::{
    container::{ListContainersOptions, RemoveContainerOptions},
    image::{ListImagesOptions, PushImageOptions, RemoveImageOptions, TagImageOptions},
    models::{ContainerSummary, ImageSummary, Volume},
    volume::{ListVolumesOptions, RemoveVolumeOptions},
    Docker, API_DEFAULT_VERSION,
};
use chrono::DateTime;
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{BackendError, BatchReport, ResourceBackend};
use crate::models::{ImageReference, ResourceKind, ResourceRecord, UNTAGGED_IMAGE};

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Docker Engine adapter. The client is acquired lazily on first use.
pub struct DockerBackend {
    socket: Option<String>,
    client: Mutex<Option<Docker>>,
}

impl DockerBackend {
    /// Build an adapter for the given socket, or bollard's local defaults when `None`.
    pub fn new(socket: Option<String>) -> Self {
        Self {
            socket,
            client: Mutex::new(None),
        }
    }

    fn client(&self) -> Result<Docker, BackendError> {
        let mut guard = self.client.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = match self.socket.as_deref() {
            Some(path) => {
                Docker::connect_with_socket(path, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        info!(socket = self.socket.as_deref().unwrap_or("default"), "docker client acquired");
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ResourceRecord>, BackendError> {
        let client = self.client()?;
        let containers = client
            .list_containers(Some(ListContainersOptions::<String> {
                all,
                ..Default::default()
            }))
            .await?;
        Ok(containers.into_iter().map(container_record).collect())
    }

    async fn delete_one(
        &self,
        client: &Docker,
        kind: ResourceKind,
        id: &str,
    ) -> Result<(), BackendError> {
        match kind {
            ResourceKind::Containers => client
                .remove_container(
                    id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await
                .map_err(|err| BackendError::rejected("delete container", id, err)),
            ResourceKind::Images => client
                .remove_image(
                    id,
                    Some(RemoveImageOptions {
                        force: true,
                        ..Default::default()
                    }),
                    None,
                )
                .await
                .map(|_| ())
                .map_err(|err| BackendError::rejected("delete image", id, err)),
            ResourceKind::Volumes => client
                .remove_volume(id, None::<RemoveVolumeOptions>)
                .await
                .map_err(|err| BackendError::rejected("delete volume", id, err)),
        }
    }
}

#[async_trait]
impl ResourceBackend for DockerBackend {
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, BackendError> {
        match kind {
            ResourceKind::Containers => self.list_containers(true).await,
            ResourceKind::Images => {
                let client = self.client()?;
                let images = client
                    .list_images(Some(ListImagesOptions::<String> {
                        all: true,
                        ..Default::default()
                    }))
                    .await?;
                Ok(images.into_iter().map(image_record).collect())
            }
            ResourceKind::Volumes => {
                let client = self.client()?;
                let response = client
                    .list_volumes(None::<ListVolumesOptions<String>>)
                    .await?;
                Ok(response
                    .volumes
                    .unwrap_or_default()
                    .into_iter()
                    .map(volume_record)
                    .collect())
            }
        }
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        ids: &[String],
    ) -> Result<BatchReport, BackendError> {
        let client = self.client()?;
        let mut report = BatchReport::default();
        for id in ids {
            let result = self.delete_one(&client, kind, id).await;
            report.record(id.clone(), result);
        }
        Ok(report)
    }

    async fn tag(&self, image_id: &str, target: &ImageReference) -> Result<(), BackendError> {
        let client = self.client()?;
        client
            .tag_image(
                image_id,
                Some(TagImageOptions {
                    repo: target.repository.as_str(),
                    tag: target.tag.as_str(),
                }),
            )
            .await
            .map_err(|err| BackendError::rejected("tag", image_id, err))
    }

    async fn push(&self, target: &ImageReference) -> Result<(), BackendError> {
        let client = self.client()?;
        let stream = client.push_image(
            &target.repository,
            Some(PushImageOptions {
                tag: target.tag.as_str(),
            }),
            None,
        );
        futures::pin_mut!(stream);

        while let Some(progress) = stream.next().await {
            let info =
                progress.map_err(|err| BackendError::rejected("push", target.to_string(), err))?;
            if let Some(message) = info.error {
                return Err(BackendError::rejected("push", target.to_string(), message));
            }
            if let Some(status) = info.status {
                debug!(target = %target, %status, "push progress");
            }
        }
        Ok(())
    }

    async fn list_running(&self) -> Result<Vec<ResourceRecord>, BackendError> {
        self.list_containers(false).await
    }
}

fn short_id(id: &str) -> String {
    id.trim_start_matches("sha256:").chars().take(12).collect()
}

fn format_created(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|created| created.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn container_record(summary: ContainerSummary) -> ResourceRecord {
    let id = summary.id.unwrap_or_default();
    let name = summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/').to_string())
        .unwrap_or_else(|| short_id(&id));
    let description = format!(
        "ID: {} | Status: {} | Created: {}",
        short_id(&id),
        summary.status.as_deref().unwrap_or("unknown"),
        format_created(summary.created.unwrap_or_default()),
    );
    ResourceRecord::new(id, name, description)
}

fn image_record(summary: ImageSummary) -> ResourceRecord {
    let title = summary
        .repo_tags
        .first()
        .cloned()
        .unwrap_or_else(|| UNTAGGED_IMAGE.to_string());
    let description = format!(
        "ID: {} | Size: {}MB | Created: {}",
        short_id(&summary.id),
        summary.size / 1_000_000,
        format_created(summary.created),
    );
    ResourceRecord::new(summary.id, title, description)
}

fn volume_record(volume: Volume) -> ResourceRecord {
    let description = format!("Driver: {}", volume.driver);
    ResourceRecord::new(volume.name.clone(), volume.name, description)
}
