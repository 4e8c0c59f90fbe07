// UndoStack - Per-document history of undoable actions

use crate::action::lifecycle::Action;
use std::collections::VecDeque;

/// Default maximum number of actions to keep in history
pub const DEFAULT_UNDO_LIMIT: usize = 100;

/// LIFO of executed actions
///
/// Only successful, undoable actions are pushed. There is no redo stack:
/// redoing means running the original action again.
///
/// # Memory Management
/// Actions hold their backups in the scratch pool, so the stack is bounded.
/// When the limit is reached the oldest action is dropped, which releases its
/// scratch storage.
pub struct UndoStack {
    /// Most recent at the back
    actions: VecDeque<Action>,
    limit: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_UNDO_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(limit.min(DEFAULT_UNDO_LIMIT)),
            limit,
        }
    }

    /// Returns false when undo is disabled and the action was dropped
    pub fn push(&mut self, action: Action) -> bool {
        if self.limit == 0 {
            log::debug!("undo disabled, dropping '{}'", action.name());
            return false;
        }
        self.actions.push_back(action);
        while self.actions.len() > self.limit {
            if let Some(oldest) = self.actions.pop_front() {
                log::debug!("undo history full, dropping '{}'", oldest.name());
            }
        }
        true
    }

    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop_back()
    }

    pub fn can_undo(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Name of the action that would be undone
    pub fn undo_description(&self) -> Option<&str> {
        self.actions.back().map(Action::name)
    }

    /// Names from oldest to newest
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(Action::name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit, dropping the oldest actions if needed
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        while self.actions.len() > limit {
            self.actions.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("actions", &self.descriptions().collect::<Vec<_>>())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::crossfade::Crossfader;
    use crate::action::{ActionContext, ActionResult, Edit, EditRun, Undoable};
    use crate::sound::SoundBuffer;

    struct Noop;

    impl Edit for Noop {
        fn apply_forward(
            &mut self,
            _sound: &mut dyn SoundBuffer,
            _ctx: &mut ActionContext,
            _run: &mut EditRun<'_>,
            _prepare_for_undo: bool,
        ) -> ActionResult<()> {
            Ok(())
        }

        fn apply_backward(
            &mut self,
            _sound: &mut dyn SoundBuffer,
            _ctx: &mut ActionContext,
            _run: &mut EditRun<'_>,
        ) -> ActionResult<()> {
            Ok(())
        }

        fn query_undoable(&self, _ctx: &ActionContext) -> Undoable {
            Undoable::Yes
        }
    }

    fn action(name: &str) -> Action {
        Action::new(name, Box::new(Noop), false, Crossfader::disabled())
    }

    #[test]
    fn test_push_and_pop() {
        let mut stack = UndoStack::new();
        assert!(!stack.can_undo());

        stack.push(action("Gain"));
        stack.push(action("Delete"));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.undo_description(), Some("Delete"));

        assert_eq!(stack.pop().unwrap().name(), "Delete");
        assert_eq!(stack.pop().unwrap().name(), "Gain");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_history_limit() {
        let mut stack = UndoStack::with_limit(3);
        for i in 0..5 {
            stack.push(action(&format!("Edit {}", i)));
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(
            stack.descriptions().collect::<Vec<_>>(),
            vec!["Edit 2", "Edit 3", "Edit 4"]
        );

        stack.set_limit(1);
        assert_eq!(stack.undo_description(), Some("Edit 4"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut stack = UndoStack::with_limit(0);
        assert!(!stack.push(action("Gain")));
        assert!(stack.is_empty());

        let mut stack = UndoStack::with_limit(1);
        assert!(stack.push(action("Gain")));
    }

    #[test]
    fn test_clear() {
        let mut stack = UndoStack::new();
        stack.push(action("Gain"));
        stack.clear();
        assert!(!stack.can_undo());
    }
}
