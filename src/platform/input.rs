//! Input collection
//!
//! Host key events are mapped to [`Action`]s. Discrete presses go into an
//! [`InputQueue`] that the engine drains once at the top of each tick; held
//! keys are tracked in [`HeldInput`] and read once per tick.

use std::collections::VecDeque;

use crate::consts::INPUT_QUEUE_CAPACITY;
use crate::sim::state::Action;

/// Edge-triggered actions waiting for the next tick
#[derive(Debug, Clone)]
pub struct InputQueue {
    pending: VecDeque<Action>,
    capacity: usize,
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new(INPUT_QUEUE_CAPACITY)
    }
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue an action. Dropped (returns false) when the queue is full.
    pub fn push(&mut self, action: Action) -> bool {
        if self.pending.len() >= self.capacity {
            log::debug!("Input queue full, dropping {:?}", action);
            return false;
        }
        self.pending.push_back(action);
        true
    }

    pub fn pop(&mut self) -> Option<Action> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Continuous "is held" state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldInput {
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

impl HeldInput {
    /// -1, 0 or 1 along x
    pub fn axis(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// Apply a key transition for a movement action. Returns true if it was one.
    pub fn apply(&mut self, action: Action, down: bool) -> bool {
        match action {
            Action::MoveLeft => self.left = down,
            Action::MoveRight => self.right = down,
            Action::Fire => self.fire = down,
            _ => return false,
        }
        true
    }
}

/// Key code (`KeyboardEvent.code`) to action table
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: Vec<(&'static str, Action)>,
}

impl KeyMap {
    /// Paddle games: arrows/AD to move, space to fire
    pub fn arcade() -> Self {
        Self {
            bindings: vec![
                ("ArrowLeft", Action::MoveLeft),
                ("KeyA", Action::MoveLeft),
                ("ArrowRight", Action::MoveRight),
                ("KeyD", Action::MoveRight),
                ("Space", Action::Fire),
                ("Enter", Action::Confirm),
                ("KeyP", Action::Pause),
                ("Escape", Action::Pause),
                ("KeyQ", Action::Quit),
            ],
        }
    }

    /// Lane games: D F J K for the four lanes
    pub fn lanes() -> Self {
        Self {
            bindings: vec![
                ("KeyD", Action::Lane(0)),
                ("KeyF", Action::Lane(1)),
                ("KeyJ", Action::Lane(2)),
                ("KeyK", Action::Lane(3)),
                ("Space", Action::Confirm),
                ("Enter", Action::Confirm),
                ("KeyP", Action::Pause),
                ("Escape", Action::Pause),
                ("KeyQ", Action::Quit),
            ],
        }
    }

    pub fn action_for(&self, code: &str) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(key, _)| *key == code)
            .map(|(_, action)| *action)
    }

    pub fn bind(&mut self, code: &'static str, action: Action) {
        self.bindings.retain(|(key, _)| *key != code);
        self.bindings.push((code, action));
    }
}
