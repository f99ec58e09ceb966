use crate::commit::CommitOutcome;

/// Selection / edit state of the grid.
///
/// Editing always happens on the selected cell; there is no way to represent
/// editing one cell while another is selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GridMode {
    #[default]
    Idle,
    Selected { row: usize, col: usize },
    Editing { row: usize, col: usize, buffer: String },
}

impl GridMode {
    pub fn selected(&self) -> Option<(usize, usize)> {
        match self {
            GridMode::Idle => None,
            GridMode::Selected { row, col } | GridMode::Editing { row, col, .. } => Some((*row, *col)),
        }
    }

    pub fn editing(&self) -> Option<(usize, usize)> {
        match self {
            GridMode::Editing { row, col, .. } => Some((*row, *col)),
            _ => None,
        }
    }

    /// Edit buffer, only while editing.
    pub fn buffer(&self) -> Option<&str> {
        match self {
            GridMode::Editing { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, GridMode::Editing { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    F2,
    Tab,
    Escape,
    Delete,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Char(char),
    /// Any key the grid has no binding for.
    Other,
}

/// Discrete input delivered to the grid by the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    Click { row: usize, col: usize },
    DoubleClick { row: usize, col: usize },
    Key(Key),
    /// Editor lost focus.
    Blur,
    /// Host text input replaced the edit buffer.
    SetBuffer(String),
    ConfirmDelete,
    CancelDelete,
}

/// What a single event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ignored,
    Selected { row: usize, col: usize },
    EditStarted { row: usize, col: usize },
    BufferChanged,
    /// Edit was committed; the grid is now `Selected` at `next`.
    Committed { outcome: CommitOutcome, next: (usize, usize) },
    EditCancelled,
    DeleteRequested { row: usize },
    DeleteCancelled,
    RowDeleted { row: usize },
}
