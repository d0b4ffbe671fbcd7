use tracing::debug;

use super::Key;

/// A focusable pane hosted by the [`ConsoleCompositor`].
pub trait Pane {
    /// Title drawn on the pane's border.
    fn title(&self) -> &str;

    /// Handle a key while focused. Returns `false` if the key was not consumed.
    fn handle_key(&mut self, key: Key) -> bool;
}

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The running-containers pane.
    Running,
    /// The management console.
    Management,
}

impl Focus {
    fn toggled(self) -> Self {
        match self {
            Focus::Running => Focus::Management,
            Focus::Management => Focus::Running,
        }
    }
}

/// Outcome of routing a key through the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorAction {
    /// Something consumed the key.
    Handled,
    /// Nothing wanted it.
    Ignored,
    /// The application should exit.
    Quit,
}

/// Routes keys between the management console and a running-containers pane.
///
/// Global keys (`Tab`, `1`, `2`, `?`) are handled before the focused pane sees
/// anything; `q` only quits when the focused pane declines it, so panes can use
/// it to step back out of nested views.
pub struct ConsoleCompositor<M, R> {
    management: M,
    running: R,
    focus: Focus,
    show_help: bool,
}

impl<M: Pane, R: Pane> ConsoleCompositor<M, R> {
    /// Build a compositor with the running pane focused.
    pub fn new(management: M, running: R) -> Self {
        Self {
            management,
            running,
            focus: Focus::Running,
            show_help: false,
        }
    }

    /// Route one key.
    pub fn handle_key(&mut self, key: Key) -> CompositorAction {
        if key == Key::Interrupt {
            return CompositorAction::Quit;
        }
        if self.show_help {
            if matches!(key, Key::Esc | Key::Char('?') | Key::Char('q')) {
                self.show_help = false;
            }
            return CompositorAction::Handled;
        }

        match key {
            Key::Tab => self.focus = self.focus.toggled(),
            Key::Char('1') => self.focus = Focus::Running,
            Key::Char('2') => self.focus = Focus::Management,
            Key::Char('?') => self.show_help = true,
            _ => {
                let consumed = match self.focus {
                    Focus::Running => self.running.handle_key(key),
                    Focus::Management => self.management.handle_key(key),
                };
                return match (consumed, key) {
                    (true, _) => CompositorAction::Handled,
                    (false, Key::Char('q')) => CompositorAction::Quit,
                    (false, _) => CompositorAction::Ignored,
                };
            }
        }
        debug!(focus = ?self.focus, help = self.show_help, "compositor state changed");
        CompositorAction::Handled
    }

    /// Currently focused pane.
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Whether the help overlay is open.
    pub fn help_visible(&self) -> bool {
        self.show_help
    }

    /// The management console.
    pub fn management(&self) -> &M {
        &self.management
    }

    /// Mutable access to the management console, e.g. for applying task results.
    pub fn management_mut(&mut self) -> &mut M {
        &mut self.management
    }

    /// The running-containers pane.
    pub fn running(&self) -> &R {
        &self.running
    }

    /// Mutable access to the running-containers pane.
    pub fn running_mut(&mut self) -> &mut R {
        &mut self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        keys: Vec<Key>,
        consume_q: bool,
    }

    impl Pane for Recorder {
        fn title(&self) -> &str {
            "recorder"
        }

        fn handle_key(&mut self, key: Key) -> bool {
            self.keys.push(key);
            match key {
                Key::Char('q') => self.consume_q,
                Key::Up | Key::Down => true,
                _ => false,
            }
        }
    }

    fn compositor() -> ConsoleCompositor<Recorder, Recorder> {
        ConsoleCompositor::new(Recorder::default(), Recorder::default())
    }

    #[test]
    fn starts_with_running_focused_and_tab_toggles() {
        let mut compositor = compositor();
        assert_eq!(compositor.focus(), Focus::Running);
        assert_eq!(compositor.handle_key(Key::Tab), CompositorAction::Handled);
        assert_eq!(compositor.focus(), Focus::Management);
        compositor.handle_key(Key::Tab);
        assert_eq!(compositor.focus(), Focus::Running);
    }

    #[test]
    fn number_keys_pick_a_pane_directly() {
        let mut compositor = compositor();
        compositor.handle_key(Key::Char('2'));
        assert_eq!(compositor.focus(), Focus::Management);
        compositor.handle_key(Key::Char('2'));
        assert_eq!(compositor.focus(), Focus::Management);
        compositor.handle_key(Key::Char('1'));
        assert_eq!(compositor.focus(), Focus::Running);
        assert!(compositor.running().keys.is_empty());
        assert!(compositor.management().keys.is_empty());
    }

    #[test]
    fn keys_reach_only_the_focused_pane() {
        let mut compositor = compositor();
        assert_eq!(compositor.handle_key(Key::Down), CompositorAction::Handled);
        compositor.handle_key(Key::Char('2'));
        assert_eq!(compositor.handle_key(Key::Up), CompositorAction::Handled);
        assert_eq!(compositor.handle_key(Key::Enter), CompositorAction::Ignored);

        assert_eq!(compositor.running().keys, vec![Key::Down]);
        assert_eq!(compositor.management().keys, vec![Key::Up, Key::Enter]);
    }

    #[test]
    fn q_quits_only_when_the_pane_declines_it() {
        let mut compositor = compositor();
        compositor.management_mut().consume_q = true;
        compositor.handle_key(Key::Char('2'));
        assert_eq!(compositor.handle_key(Key::Char('q')), CompositorAction::Handled);

        compositor.handle_key(Key::Char('1'));
        assert_eq!(compositor.handle_key(Key::Char('q')), CompositorAction::Quit);
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() {
        let mut compositor = compositor();
        compositor.handle_key(Key::Char('?'));
        assert!(compositor.help_visible());

        assert_eq!(compositor.handle_key(Key::Down), CompositorAction::Handled);
        assert_eq!(compositor.handle_key(Key::Tab), CompositorAction::Handled);
        assert_eq!(compositor.focus(), Focus::Running);
        assert!(compositor.running().keys.is_empty());

        compositor.handle_key(Key::Esc);
        assert!(!compositor.help_visible());
    }

    #[test]
    fn interrupt_always_quits() {
        let mut compositor = compositor();
        compositor.handle_key(Key::Char('?'));
        assert_eq!(compositor.handle_key(Key::Interrupt), CompositorAction::Quit);
    }
}
