//! Shared domain models.

use std::fmt;

/// The unit a list/delete operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Containers, running or stopped.
    Containers,
    /// Local images.
    Images,
    /// Named volumes.
    Volumes,
}

impl ResourceKind {
    /// Every kind, in menu order.
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Containers,
        ResourceKind::Images,
        ResourceKind::Volumes,
    ];

    /// Lower-case plural label (`containers`).
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Containers => "containers",
            ResourceKind::Images => "images",
            ResourceKind::Volumes => "volumes",
        }
    }

    /// Capitalised plural label (`Containers`).
    pub fn title(self) -> &'static str {
        match self {
            ResourceKind::Containers => "Containers",
            ResourceKind::Images => "Images",
            ResourceKind::Volumes => "Volumes",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Title the runtime reports for an image without any repository tag.
pub const UNTAGGED_IMAGE: &str = "<none>:<none>";

/// A single listed resource as produced by a backend adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Backend identity, unique within a kind.
    pub id: String,
    /// Primary display line (container name, image tag, volume name).
    pub title: String,
    /// Secondary display line.
    pub description: String,
    /// Transient UI flag; never sent to the backend.
    pub selected: bool,
}

impl ResourceRecord {
    /// Build an unselected record.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            selected: false,
        }
    }

    /// Returns the title prefixed with a checkbox reflecting the selection flag.
    pub fn checkbox_label(&self) -> String {
        let prefix = if self.selected { "[x]" } else { "[ ]" };
        format!("{prefix} {}", self.title)
    }

    /// Whether this is the untagged image placeholder.
    pub fn is_untagged_image(&self) -> bool {
        self.title == UNTAGGED_IMAGE
    }
}

/// A registry reference split into repository and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// `registry/namespace/name` part.
    pub repository: String,
    /// Tag part, without the leading colon.
    pub tag: String,
}

impl ImageReference {
    /// Build a reference from already-split parts.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
