use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::selection::PaginatedSelection;
use super::tasks::PublishResult;
use crate::{
    backend::{BackendError, ResourceBackend},
    models::{ImageReference, ResourceRecord},
};

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("invalid tag regex")
});

/// Where and under which tag the wizard publishes images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    /// Registry host, e.g. `docker.io`.
    pub registry: String,
    /// Account/namespace on the registry.
    pub username: String,
    /// Tag applied to every published image.
    pub tag: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            registry: "docker.io".to_string(),
            username: String::new(),
            tag: "latest".to_string(),
        }
    }
}

impl PublishSettings {
    /// Target reference for an image listed under `title`.
    ///
    /// The base name is everything before the first `:` of the title.
    pub fn target_for(&self, title: &str) -> ImageReference {
        let base = title.split_once(':').map_or(title, |(base, _)| base);
        ImageReference::new(
            format!("{}/{}/{}", self.registry, self.username, base),
            self.tag.clone(),
        )
    }

    /// Check that every reference built from these settings is well-formed.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.registry.trim().is_empty() {
            return Err(BackendError::InvalidReference("registry is empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(BackendError::InvalidReference(
                "username is empty (set publish.username)".to_string(),
            ));
        }
        if !TAG_RE.is_match(&self.tag) {
            return Err(BackendError::InvalidReference(format!(
                "tag '{}' is not a valid image tag",
                self.tag
            )));
        }
        Ok(())
    }

    /// `registry/username`, as shown to the user.
    pub fn destination(&self) -> String {
        format!("{}/{}", self.registry, self.username)
    }
}

/// Steps of the publish wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    /// Picking images.
    SelectImages,
    /// Waiting for the user to confirm with `p`.
    Confirm,
    /// A publish task is in flight.
    Running,
}

/// State of the publish wizard.
#[derive(Debug, Clone)]
pub struct PublishWizard {
    /// Current step.
    pub step: WizardStep,
    /// Destination settings.
    pub settings: PublishSettings,
    /// Candidate images.
    pub selection: PaginatedSelection,
}

impl PublishWizard {
    /// Start at [`WizardStep::SelectImages`] with an empty image list.
    pub fn new(settings: PublishSettings, page_size: usize) -> Self {
        Self {
            step: WizardStep::SelectImages,
            settings,
            selection: PaginatedSelection::new(page_size),
        }
    }
}

/// Tag and push every image, continuing past per-image failures.
///
/// A failed tag skips the push for that image only.
pub async fn publish_images(
    backend: &dyn ResourceBackend,
    images: &[ResourceRecord],
    settings: &PublishSettings,
) -> PublishResult {
    let mut result = PublishResult {
        requested: images.len(),
        published_ids: Vec::new(),
        errors: Vec::new(),
    };

    for image in images {
        let target = settings.target_for(&image.title);
        if let Err(err) = backend.tag(&image.id, &target).await {
            warn!(image = %image.title, target = %target, %err, "tag failed; skipping push");
            result.errors.push(err);
            continue;
        }
        match backend.push(&target).await {
            Ok(()) => {
                info!(image = %image.title, target = %target, "image published");
                result.published_ids.push(image.id.clone());
            }
            Err(err) => {
                warn!(target = %target, %err, "push failed");
                result.errors.push(err);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn settings(registry: &str, username: &str, tag: &str) -> PublishSettings {
        PublishSettings {
            registry: registry.to_string(),
            username: username.to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn target_replaces_tag_and_prefixes_namespace() {
        let target = settings("docker.io", "alice", "v2").target_for("myapp:old");
        assert_eq!(target.repository, "docker.io/alice/myapp");
        assert_eq!(target.tag, "v2");
        assert_eq!(target.to_string(), "docker.io/alice/myapp:v2");
    }

    #[test]
    fn target_uses_whole_title_without_separator() {
        let target = settings("ghcr.io", "bob", "latest").target_for("tools");
        assert_eq!(target.to_string(), "ghcr.io/bob/tools:latest");
    }

    #[test]
    fn validation_rejects_incomplete_settings() {
        assert!(settings("docker.io", "alice", "v1.0-rc_1").validate().is_ok());
        assert!(settings("", "alice", "v1").validate().is_err());
        assert!(settings("docker.io", "  ", "v1").validate().is_err());
        assert!(settings("docker.io", "alice", "").validate().is_err());
        assert!(settings("docker.io", "alice", ".hidden").validate().is_err());
        assert!(settings("docker.io", "alice", "has space").validate().is_err());
    }

    #[test]
    fn defaults_point_at_docker_hub_latest() {
        let defaults = PublishSettings::default();
        assert_eq!(defaults.registry, "docker.io");
        assert_eq!(defaults.tag, "latest");
        assert!(defaults.username.is_empty());
    }

    #[tokio::test]
    async fn tag_failure_skips_push_but_not_batch() {
        let backend = MemoryBackend::new();
        backend.fail_tag("sha256:bad");
        backend.fail_push("docker.io/alice/db:v2");

        let images = vec![
            ResourceRecord::new("sha256:bad", "broken:1", ""),
            ResourceRecord::new("sha256:web", "web:1", ""),
            ResourceRecord::new("sha256:db", "db:1", ""),
        ];
        let result = publish_images(&backend, &images, &settings("docker.io", "alice", "v2")).await;

        assert_eq!(result.requested, 3);
        assert_eq!(result.published_ids, vec!["sha256:web".to_string()]);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(
            backend.pushed(),
            vec!["docker.io/alice/web:v2".to_string()]
        );
        let tagged: Vec<String> = backend.tagged().into_iter().map(|(id, _)| id).collect();
        assert_eq!(tagged, vec!["sha256:web".to_string(), "sha256:db".to_string()]);
    }
}
