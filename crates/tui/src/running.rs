use std::sync::Arc;

use dtop_core::{
    console::{PaginatedSelection, Pane},
    BackendError, Key, ResourceBackend, ResourceRecord,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub type RunningSnapshot = Result<Vec<ResourceRecord>, BackendError>;
pub type RunningSender = mpsc::UnboundedSender<RunningSnapshot>;
pub type RunningReceiver = mpsc::UnboundedReceiver<RunningSnapshot>;

/// Read-only snapshot of running containers.
pub struct RunningPane {
    backend: Arc<dyn ResourceBackend>,
    selection: PaginatedSelection,
    sender: RunningSender,
    refreshing: bool,
    note: String,
}

impl RunningPane {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        page_size: usize,
        sender: RunningSender,
    ) -> Self {
        Self {
            backend,
            selection: PaginatedSelection::new(page_size),
            sender,
            refreshing: false,
            note: "Not loaded yet".to_string(),
        }
    }

    pub fn selection(&self) -> &PaginatedSelection {
        &self.selection
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    /// Fetch a fresh snapshot unless one is already on its way.
    pub fn refresh(&mut self) {
        if self.refreshing {
            return;
        }
        self.refreshing = true;
        self.note = "Refreshing…".to_string();
        let backend = Arc::clone(&self.backend);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let snapshot = backend.list_running().await;
            if sender.send(snapshot).is_err() {
                debug!("running pane dropped before refresh completed");
            }
        });
    }

    pub fn apply(&mut self, snapshot: RunningSnapshot) {
        self.refreshing = false;
        match snapshot {
            Ok(records) => {
                info!(count = records.len(), "running containers refreshed");
                self.note = format!("{} running", records.len());
                self.selection.load_items(records);
            }
            Err(err) => {
                warn!(%err, "running containers refresh failed");
                self.note = format!("Error: {err}");
            }
        }
    }
}

impl Pane for RunningPane {
    fn title(&self) -> &str {
        "Running"
    }

    fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Up => self.selection.move_cursor(-1),
            Key::Down => self.selection.move_cursor(1),
            Key::PageUp => self.selection.goto_page(-1),
            Key::PageDown => self.selection.goto_page(1),
            Key::Char('r') => self.refresh(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtop_core::MemoryBackend;

    #[tokio::test]
    async fn refresh_loads_only_running_containers() {
        let backend = Arc::new(MemoryBackend::demo());
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut pane = RunningPane::new(backend, 5, sender);

        assert!(pane.handle_key(Key::Char('r')));
        assert!(pane.handle_key(Key::Char('r')));
        let snapshot = receiver.recv().await.expect("snapshot");
        pane.apply(snapshot);

        let records = pane.selection().items();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.description.contains("Status: Up")));
        assert_eq!(pane.note(), format!("{} running", records.len()));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let backend = Arc::new(MemoryBackend::demo());
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut pane = RunningPane::new(backend.clone(), 5, sender);

        pane.refresh();
        pane.apply(receiver.recv().await.expect("snapshot"));
        let before = pane.selection().total_count();

        backend.set_available(false);
        pane.refresh();
        pane.apply(receiver.recv().await.expect("snapshot"));
        assert_eq!(pane.selection().total_count(), before);
        assert!(pane.note().starts_with("Error: container runtime unavailable"));
        assert!(!pane.handle_key(Key::Enter));
    }

    #[tokio::test]
    async fn refresh_survives_a_closed_receiver() {
        let backend = Arc::new(MemoryBackend::demo());
        let (sender, receiver) = mpsc::unbounded_channel();
        drop(receiver);
        let mut pane = RunningPane::new(backend, 5, sender);

        pane.refresh();
        tokio::task::yield_now().await;
        assert_eq!(pane.note(), "Refreshing…");
        assert_eq!(pane.selection().total_count(), 0);
    }
}
