//! The resource-management console: mode state machine, pagination model,
//! background task orchestration and the two-pane compositor.
//!
//! Nothing here draws to a terminal. Frontends translate their input events
//! into [`Key`]s, feed them to a [`ConsoleCompositor`], drain task results
//! into the [`ResourceConsole`] and render whatever [`ResourceConsole::mode`]
//! reports.

/// Focus routing between the management console and its sibling pane.
pub mod compositor;
/// The publish wizard and its tag/push algorithm.
pub mod publish;
/// Paginated multi-selection over resource records.
pub mod selection;
/// The console state machine.
pub mod state;
/// Background task results and in-flight bookkeeping.
pub mod tasks;

use std::fmt;

use crate::models::ResourceKind;

pub use compositor::{CompositorAction, ConsoleCompositor, Focus, Pane};
pub use publish::{PublishSettings, PublishWizard, WizardStep};
pub use selection::PaginatedSelection;
pub use state::{ConsoleMode, ConsoleSettings, MenuEntry, ResourceConsole, MENU_ENTRIES};
pub use tasks::{
    task_channel, DeleteResult, LoadOrigin, LoadResult, PublishResult, TaskKey, TaskOutcome,
    TaskReceiver, TaskResult, TaskSender,
};

/// Logical keys understood by the console and compositor.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    PageUp,
    PageDown,
    Space,
    Enter,
    Esc,
    Tab,
    /// Hard quit (Ctrl-C).
    Interrupt,
    Char(char),
}

/// A view that background results can be addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// The delete list for one resource kind.
    List(ResourceKind),
    /// The publish wizard's image list.
    Publisher,
}

impl View {
    /// Resource kind listed by this view.
    pub fn kind(self) -> ResourceKind {
        match self {
            View::List(kind) => kind,
            View::Publisher => ResourceKind::Images,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::List(kind) => write!(f, "{kind}"),
            View::Publisher => f.write_str("publisher"),
        }
    }
}

/// Kinds of background operation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Delete,
    Publish,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Load => "Reload",
            Operation::Delete => "Delete",
            Operation::Publish => "Publish",
        })
    }
}
