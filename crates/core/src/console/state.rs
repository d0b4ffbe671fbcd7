use std::{future::Future, sync::Arc};

use tracing::{debug, info, warn};

use super::{
    compositor::Pane,
    publish::{self, PublishSettings, PublishWizard, WizardStep},
    selection::PaginatedSelection,
    tasks::{
        self, DeleteResult, InFlight, LoadOrigin, LoadResult, PublishResult, TaskKey,
        TaskOutcome, TaskReceiver, TaskResult, TaskSender,
    },
    Key, Operation, View,
};
use crate::{
    backend::ResourceBackend,
    models::{ResourceKind, ResourceRecord},
};

/// Entries of the top-level menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    /// Open the publish wizard.
    Publisher,
    /// Open the delete list for a kind.
    Delete(ResourceKind),
}

/// Menu entries in display order.
pub const MENU_ENTRIES: [MenuEntry; 4] = [
    MenuEntry::Publisher,
    MenuEntry::Delete(ResourceKind::Containers),
    MenuEntry::Delete(ResourceKind::Images),
    MenuEntry::Delete(ResourceKind::Volumes),
];

impl MenuEntry {
    /// Short label shown in the menu.
    pub fn label(self) -> String {
        match self {
            MenuEntry::Publisher => "Publisher".to_string(),
            MenuEntry::Delete(kind) => format!("Delete {}", kind.title()),
        }
    }

    /// One-line explanation shown under the highlighted entry.
    pub fn description(self) -> &'static str {
        match self {
            MenuEntry::Publisher => "Re-tag selected images and push them to a registry",
            MenuEntry::Delete(ResourceKind::Containers) => {
                "Force-remove containers, running or not"
            }
            MenuEntry::Delete(ResourceKind::Images) => "Force-remove local images",
            MenuEntry::Delete(ResourceKind::Volumes) => "Remove named volumes",
        }
    }

    fn view(self) -> View {
        match self {
            MenuEntry::Publisher => View::Publisher,
            MenuEntry::Delete(kind) => View::List(kind),
        }
    }
}

/// The console's current mode. Only fields of the active mode exist.
#[derive(Debug, Clone)]
pub enum ConsoleMode {
    /// Top-level menu with one highlighted entry.
    Menu {
        /// Index into [`MENU_ENTRIES`].
        selected_entry: usize,
    },
    /// Delete list for one kind.
    ResourceList {
        /// Kind being listed.
        kind: ResourceKind,
        /// Listed records.
        selection: PaginatedSelection,
    },
    /// Publish wizard.
    PublishWizard(PublishWizard),
}

impl ConsoleMode {
    /// The view background results must target to be applied in this mode.
    pub fn view(&self) -> Option<View> {
        match self {
            ConsoleMode::Menu { .. } => None,
            ConsoleMode::ResourceList { kind, .. } => Some(View::List(*kind)),
            ConsoleMode::PublishWizard(_) => Some(View::Publisher),
        }
    }

    /// The record list of the active mode, if it has one.
    pub fn selection(&self) -> Option<&PaginatedSelection> {
        match self {
            ConsoleMode::Menu { .. } => None,
            ConsoleMode::ResourceList { selection, .. } => Some(selection),
            ConsoleMode::PublishWizard(wizard) => Some(&wizard.selection),
        }
    }

    fn selection_mut(&mut self) -> Option<&mut PaginatedSelection> {
        match self {
            ConsoleMode::Menu { .. } => None,
            ConsoleMode::ResourceList { selection, .. } => Some(selection),
            ConsoleMode::PublishWizard(wizard) => Some(&mut wizard.selection),
        }
    }
}

/// Static settings the console is built with.
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    /// Rows per page in every list.
    pub page_size: usize,
    /// Initial publish wizard settings.
    pub publish: PublishSettings,
}

/// The resource-management console.
///
/// Key handling and result application both run on the caller's thread;
/// background tasks only ever send a [`TaskResult`] back over the channel.
pub struct ResourceConsole {
    backend: Arc<dyn ResourceBackend>,
    settings: ConsoleSettings,
    mode: ConsoleMode,
    last_menu_entry: usize,
    status: String,
    in_flight: InFlight,
    results: TaskSender,
    generation: u64,
    queued_reload: Option<(View, String)>,
}

impl ResourceConsole {
    /// Create a console in [`ConsoleMode::Menu`]. Task results are posted to `results`.
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        settings: ConsoleSettings,
        results: TaskSender,
    ) -> Self {
        Self {
            backend,
            settings,
            mode: ConsoleMode::Menu { selected_entry: 0 },
            last_menu_entry: 0,
            status: "Ready".to_string(),
            in_flight: InFlight::default(),
            results,
            generation: 0,
            queued_reload: None,
        }
    }

    /// Current mode, for rendering.
    pub fn mode(&self) -> &ConsoleMode {
        &self.mode
    }

    /// Current status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether `operation` is running in the background for `view`.
    pub fn is_busy(&self, view: View, operation: Operation) -> bool {
        self.in_flight.contains(TaskKey::new(view, operation))
    }

    /// Handle a logical key. Returns `false` when the key means nothing in
    /// the current mode.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match self.mode {
            ConsoleMode::Menu { .. } => self.handle_menu_key(key),
            ConsoleMode::ResourceList { .. } => self.handle_list_key(key),
            ConsoleMode::PublishWizard(_) => self.handle_wizard_key(key),
        }
    }

    /// Apply every result that has arrived so far. Returns how many were applied.
    pub fn process_pending(&mut self, receiver: &mut TaskReceiver) -> usize {
        let mut processed = 0;
        while let Ok(result) = receiver.try_recv() {
            self.apply_result(result);
            processed += 1;
        }
        processed
    }

    /// Merge a finished task into the console state.
    ///
    /// Results addressed to a view other than the active one are dropped, as
    /// are delete and publish results from an earlier visit to the active view.
    /// A load from an earlier visit still lists current data and is applied as
    /// a fresh load.
    pub fn apply_result(&mut self, result: TaskResult) {
        let key = result.key();
        self.in_flight.finish(key);
        if self.mode.view() != Some(key.view) {
            info!(view = %key.view, operation = %key.operation, "discarding stale task result");
            return;
        }
        let current = result.generation == self.generation;
        match result.outcome {
            TaskOutcome::Load(mut load) => {
                if !current {
                    load.origin = LoadOrigin::Fresh;
                }
                if let Some(summary) = self.take_queued_reload(key.view) {
                    debug!(view = %key.view, "superseding load with queued reload after delete");
                    self.start_load(key.view, LoadOrigin::AfterDelete { summary });
                    return;
                }
                self.apply_load(load);
            }
            TaskOutcome::Delete(delete) if current => self.apply_delete(delete),
            TaskOutcome::Publish(publish) if current => self.apply_publish(publish),
            TaskOutcome::Delete(_) | TaskOutcome::Publish(_) => {
                info!(
                    view = %key.view,
                    operation = %key.operation,
                    generation = result.generation,
                    "discarding result from an earlier visit"
                );
            }
        }
    }

    fn handle_menu_key(&mut self, key: Key) -> bool {
        let ConsoleMode::Menu { selected_entry } = &mut self.mode else {
            return false;
        };
        match key {
            Key::Up | Key::Down => {
                if key == Key::Up {
                    *selected_entry = selected_entry.saturating_sub(1);
                } else {
                    *selected_entry = (*selected_entry + 1).min(MENU_ENTRIES.len() - 1);
                }
                if let Some(entry) = MENU_ENTRIES.get(*selected_entry) {
                    self.status = format!("Selected: {}", entry.label());
                }
                true
            }
            Key::Enter => {
                let index = *selected_entry;
                self.open_entry(index);
                true
            }
            _ => false,
        }
    }

    fn handle_list_key(&mut self, key: Key) -> bool {
        let ConsoleMode::ResourceList { kind, selection } = &mut self.mode else {
            return false;
        };
        let kind = *kind;
        match key {
            Key::Up => selection.move_cursor(-1),
            Key::Down => selection.move_cursor(1),
            Key::PageUp => selection.goto_page(-1),
            Key::PageDown => selection.goto_page(1),
            Key::Space => {
                if selection.toggle_selection_at_cursor().is_some() {
                    self.status = format!(
                        "{} items selected. Press 'd' to delete.",
                        selection.selected_count()
                    );
                }
            }
            Key::Char('d') => {
                let ids: Vec<String> = selection
                    .selected_records()
                    .map(|record| record.id.clone())
                    .collect();
                self.request_delete(kind, ids);
            }
            Key::Char('r') => self.request_reload(kind),
            Key::Char('q') | Key::Esc => self.return_to_menu(),
            _ => return false,
        }
        true
    }

    fn handle_wizard_key(&mut self, key: Key) -> bool {
        let ConsoleMode::PublishWizard(wizard) = &mut self.mode else {
            return false;
        };
        match (wizard.step, key) {
            (_, Key::Char('q') | Key::Esc) => self.return_to_menu(),
            (WizardStep::SelectImages, Key::Up) => wizard.selection.move_cursor(-1),
            (WizardStep::SelectImages, Key::Down) => wizard.selection.move_cursor(1),
            (WizardStep::SelectImages, Key::PageUp) => wizard.selection.goto_page(-1),
            (WizardStep::SelectImages, Key::PageDown) => wizard.selection.goto_page(1),
            (WizardStep::SelectImages, Key::Space) => {
                if wizard.selection.toggle_selection_at_cursor().is_some() {
                    self.status = format!(
                        "{} images selected for publishing.",
                        wizard.selection.selected_count()
                    );
                }
            }
            (WizardStep::SelectImages, Key::Enter) => {
                let count = wizard.selection.selected_count();
                if count == 0 {
                    self.status =
                        "No images selected. Press space to select images.".to_string();
                } else if let Err(err) = wizard.settings.validate() {
                    self.status = format!("Cannot publish: {err}");
                } else {
                    wizard.step = WizardStep::Confirm;
                    self.status = format!(
                        "Ready to publish {count} images to {} as :{}. Press 'p' to confirm.",
                        wizard.settings.destination(),
                        wizard.settings.tag
                    );
                }
            }
            (WizardStep::Confirm, Key::Char('p')) => self.request_publish(),
            _ => return false,
        }
        true
    }

    fn open_entry(&mut self, index: usize) {
        let Some(entry) = MENU_ENTRIES.get(index).copied() else {
            return;
        };
        self.last_menu_entry = index;
        let page_size = self.settings.page_size;
        self.next_generation();
        self.mode = match entry {
            MenuEntry::Publisher => ConsoleMode::PublishWizard(PublishWizard::new(
                self.settings.publish.clone(),
                page_size,
            )),
            MenuEntry::Delete(kind) => ConsoleMode::ResourceList {
                kind,
                selection: PaginatedSelection::new(page_size),
            },
        };

        let view = entry.view();
        self.status = match view {
            View::List(kind) => format!("Loading {kind}…"),
            View::Publisher => "Loading images for publishing…".to_string(),
        };
        if !self.start_load(view, LoadOrigin::Fresh) {
            info!(%view, "joining load already in flight");
        }
    }

    fn return_to_menu(&mut self) {
        self.next_generation();
        self.mode = ConsoleMode::Menu {
            selected_entry: self.last_menu_entry,
        };
        self.status.clear();
    }

    fn next_generation(&mut self) {
        self.generation += 1;
        self.queued_reload = None;
    }

    fn take_queued_reload(&mut self, view: View) -> Option<String> {
        if self.queued_reload.as_ref().map(|(queued, _)| *queued) != Some(view) {
            return None;
        }
        self.queued_reload.take().map(|(_, summary)| summary)
    }

    fn request_reload(&mut self, kind: ResourceKind) {
        let view = View::List(kind);
        if !self.start_load(view, LoadOrigin::Fresh) {
            self.reject_busy(view, Operation::Load);
            return;
        }
        if let Some(selection) = self.mode.selection_mut() {
            selection.reset_position();
        }
        self.status = format!("Refreshing {kind}…");
    }

    fn request_delete(&mut self, kind: ResourceKind, ids: Vec<String>) {
        if ids.is_empty() {
            self.status = "No items selected. Press space to select items.".to_string();
            return;
        }
        let view = View::List(kind);
        if !self.in_flight.try_begin(TaskKey::new(view, Operation::Delete)) {
            self.reject_busy(view, Operation::Delete);
            return;
        }

        let count = ids.len();
        info!(%kind, count, "delete requested");
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            TaskOutcome::Delete(tasks::delete_records(backend, kind, ids).await)
        });
        self.status = format!("Deleting {count} {kind}…");
    }

    fn request_publish(&mut self) {
        let key = TaskKey::new(View::Publisher, Operation::Publish);
        if self.in_flight.contains(key) {
            self.reject_busy(View::Publisher, Operation::Publish);
            return;
        }
        let ConsoleMode::PublishWizard(wizard) = &mut self.mode else {
            return;
        };
        let images: Vec<ResourceRecord> = wizard.selection.selected_records().cloned().collect();
        if images.is_empty() {
            wizard.step = WizardStep::SelectImages;
            self.status = "No images selected. Press space to select images.".to_string();
            return;
        }
        let settings = wizard.settings.clone();
        wizard.step = WizardStep::Running;
        self.in_flight.try_begin(key);

        let count = images.len();
        info!(
            count,
            destination = %settings.destination(),
            tag = %settings.tag,
            "publish requested"
        );
        self.status = format!("Publishing {count} images to {}…", settings.destination());
        let backend = Arc::clone(&self.backend);
        self.spawn(async move {
            let result = publish::publish_images(backend.as_ref(), &images, &settings).await;
            TaskOutcome::Publish(result)
        });
    }

    fn start_load(&mut self, view: View, origin: LoadOrigin) -> bool {
        if !self.in_flight.try_begin(TaskKey::new(view, Operation::Load)) {
            return false;
        }
        debug!(%view, ?origin, "load started");
        let backend = Arc::clone(&self.backend);
        self.spawn(async move { TaskOutcome::Load(tasks::load_view(backend, view, origin).await) });
        true
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        let sender = self.results.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let outcome = task.await;
            if sender.send(TaskResult { generation, outcome }).is_err() {
                debug!("console dropped before task completed");
            }
        });
    }

    fn reject_busy(&mut self, view: View, operation: Operation) {
        info!(%view, %operation, "rejected: operation already in flight");
        self.status = format!("{operation} already in progress for {view}");
    }

    fn apply_load(&mut self, result: LoadResult) {
        let LoadResult {
            view,
            origin,
            records,
        } = result;
        let kind = view.kind();
        let records = match (records, &origin) {
            (Ok(records), _) => records,
            (Err(err), LoadOrigin::AfterDelete { summary }) => {
                self.status = format!("{summary}; error reloading {kind}: {err}");
                return;
            }
            (Err(err), LoadOrigin::Fresh) => {
                self.status = format!("Error loading {kind}: {err}");
                return;
            }
        };

        let count = records.len();
        let Some(selection) = self.mode.selection_mut() else {
            return;
        };
        match origin {
            LoadOrigin::Fresh => {
                selection.load_items(records);
                self.status = match view {
                    View::List(kind) => format!("Loaded {count} {kind}"),
                    View::Publisher => format!("Loaded {count} images for publishing"),
                };
            }
            LoadOrigin::AfterDelete { summary } => {
                selection.merge_items(records);
                self.status = format!("{summary} ({count} {kind} remaining)");
            }
        }
        info!(%view, count, "load applied");
    }

    fn apply_delete(&mut self, result: DeleteResult) {
        let DeleteResult {
            kind,
            requested,
            deleted_ids,
            errors,
        } = result;
        let deleted = deleted_ids.len();
        let summary = match errors.first() {
            None => format!("Successfully deleted {deleted} {kind}"),
            Some(err) => format!("Error deleting: {err} ({deleted} of {requested} deleted)"),
        };
        if errors.is_empty() {
            info!(%kind, deleted, "delete applied");
        } else {
            warn!(%kind, deleted, failed = errors.len(), "delete partially failed");
        }
        if let Some(selection) = self.mode.selection_mut() {
            selection.deselect(&deleted_ids);
        }
        self.status = summary.clone();

        if deleted == 0 {
            return;
        }
        let view = View::List(kind);
        if self.is_busy(view, Operation::Load) {
            debug!(%view, "reload after delete queued behind running load");
            self.queued_reload = Some((view, summary));
        } else {
            self.start_load(view, LoadOrigin::AfterDelete { summary });
        }
    }

    fn apply_publish(&mut self, result: PublishResult) {
        let ConsoleMode::PublishWizard(wizard) = &mut self.mode else {
            return;
        };
        wizard.selection.deselect(&result.published_ids);
        wizard.step = WizardStep::SelectImages;
        let published = result.published_ids.len();
        self.status = match result.errors.first() {
            None => format!("Successfully published {published} images"),
            Some(err) => format!(
                "Error publishing: {err} ({published} of {} published)",
                result.requested
            ),
        };
    }
}

impl Pane for ResourceConsole {
    fn title(&self) -> &str {
        "Manage"
    }

    fn handle_key(&mut self, key: Key) -> bool {
        ResourceConsole::handle_key(self, key)
    }
}
