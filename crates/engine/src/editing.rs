//! Edit mode
//!
//! Handles:
//! - Entering edit mode (Enter/F2/double-click keep content, typing overwrites)
//! - Feeding the edit buffer
//! - Leaving edit mode: commit-and-move (Enter, Tab), commit-in-place (blur),
//!   discard (Escape)

use crate::commit::CommitOutcome;
use crate::grid::Grid;
use crate::mode::{GridMode, Key, Response};

impl Grid {
    /// Enter edit mode on a selected cell. `typed` starts a "type to overwrite"
    /// edit; otherwise the buffer starts with the cell's current value.
    /// Non-editable columns stay selected.
    pub(crate) fn start_edit(&mut self, row: usize, col: usize, typed: Option<char>) -> Response {
        if self.mode.is_editing() || !self.schema().is_editable(col) {
            return Response::Ignored;
        }
        let buffer = match typed {
            Some(c) => c.to_string(),
            None => {
                let key = &self.schema().columns()[col].key;
                self.store.rows()[row].display(key)
            }
        };
        self.mode = GridMode::Editing { row, col, buffer };
        Response::EditStarted { row, col }
    }

    pub(crate) fn set_buffer(&mut self, text: String) -> Response {
        match &mut self.mode {
            GridMode::Editing { buffer, .. } => {
                *buffer = text;
                Response::BufferChanged
            }
            _ => Response::Ignored,
        }
    }

    pub(crate) fn key_editing(&mut self, key: Key) -> Response {
        let GridMode::Editing { row, col, buffer } = &mut self.mode else {
            return Response::Ignored;
        };
        let (row, col) = (*row, *col);

        match key {
            Key::Enter => {
                let next = self.next_after_enter(row, col);
                self.finish_edit(next)
            }
            Key::Tab => {
                let next = self.next_after_tab(row, col);
                self.finish_edit(next)
            }
            Key::Escape => {
                self.mode = GridMode::Selected { row, col };
                Response::EditCancelled
            }
            Key::Backspace => {
                buffer.pop();
                Response::BufferChanged
            }
            Key::Char(c) if !c.is_control() => {
                buffer.push(c);
                Response::BufferChanged
            }
            // Caret movement inside the editor belongs to the host text input.
            _ => Response::Ignored,
        }
    }

    pub(crate) fn blur(&mut self) -> Response {
        match self.mode.editing() {
            Some(cell) => self.finish_edit(cell),
            None => Response::Ignored,
        }
    }

    /// Commit the buffer, then select `next`. The transition happens whatever
    /// the commit outcome.
    fn finish_edit(&mut self, next: (usize, usize)) -> Response {
        let GridMode::Editing { row, col, buffer } = std::mem::take(&mut self.mode) else {
            return Response::Ignored;
        };
        let key = self.schema().columns()[col].key.clone();

        let outcome = match self.commit_cell(row, &key, &buffer) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("commit of ({}, {}) failed: {}", row, col, err);
                CommitOutcome::Rejected { reason: err.to_string() }
            }
        };

        self.mode = GridMode::Selected { row: next.0, col: next.1 };
        Response::Committed { outcome, next }
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::CellValue;
    use crate::commit::CommitOutcome;
    use crate::grid::Grid;
    use crate::mode::{GridEvent, GridMode, Key, Response};
    use crate::repository::SheetId;
    use crate::row::FieldMap;
    use crate::schema::{keys, ColumnSchema};

    fn grid(rows: usize) -> Grid {
        let mut grid = Grid::new(SheetId::from("s"), ColumnSchema::quantities_sheet());
        grid.append_rows(vec![FieldMap::new(); rows]);
        grid
    }

    fn col(g: &Grid, key: &str) -> usize {
        g.schema().index_of(key).unwrap()
    }

    #[test]
    fn test_enter_and_f2_keep_content() {
        let mut g = grid(1);
        let c = col(&g, keys::QUANTITY);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('7')));
        g.handle(GridEvent::Key(Key::Enter));

        assert_eq!(g.handle(GridEvent::Key(Key::F2)), Response::EditStarted { row: 0, col: c });
        assert_eq!(g.edit_buffer(), Some("7"));
        g.handle(GridEvent::Key(Key::Escape));
        assert_eq!(g.handle(GridEvent::Key(Key::Enter)), Response::EditStarted { row: 0, col: c });
        assert_eq!(g.edit_buffer(), Some("7"));
    }

    #[test]
    fn test_typing_overwrites() {
        let mut g = grid(1);
        let c = col(&g, keys::DESCRIPTION);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('a')));
        g.handle(GridEvent::Key(Key::Char('b')));
        g.handle(GridEvent::Key(Key::Backspace));
        g.handle(GridEvent::Key(Key::Char('c')));
        assert_eq!(g.edit_buffer(), Some("ac"));
    }

    #[test]
    fn test_typing_on_derived_column_is_ignored() {
        let mut g = grid(1);
        let c = col(&g, keys::TOTAL);
        g.handle(GridEvent::Click { row: 0, col: c });
        assert_eq!(g.handle(GridEvent::Key(Key::Char('5'))), Response::Ignored);
        assert_eq!(g.handle(GridEvent::Key(Key::Enter)), Response::Ignored);
        assert_eq!(g.mode(), &GridMode::Selected { row: 0, col: c });
    }

    #[test]
    fn test_escape_discards() {
        let mut g = grid(1);
        let c = col(&g, keys::QUANTITY);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('9')));
        assert_eq!(g.handle(GridEvent::Key(Key::Escape)), Response::EditCancelled);
        assert_eq!(g.rows()[0].field(keys::QUANTITY), Some(&CellValue::Number(0.0)));
        assert_eq!(g.mode(), &GridMode::Selected { row: 0, col: c });
    }

    #[test]
    fn test_enter_commits_and_moves_down() {
        let mut g = grid(2);
        let c = col(&g, keys::QUANTITY);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('3')));
        match g.handle(GridEvent::Key(Key::Enter)) {
            Response::Committed { next, .. } => assert_eq!(next, (1, c)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(g.rows()[0].field(keys::QUANTITY), Some(&CellValue::Number(3.0)));

        // Last row: stays put
        g.handle(GridEvent::Key(Key::Char('4')));
        g.handle(GridEvent::Key(Key::Enter));
        assert_eq!(g.selected(), Some((1, c)));
        assert_eq!(g.rows()[1].field(keys::QUANTITY), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_tab_wraps_to_next_row() {
        let mut g = grid(2);
        let last = g.schema().len() - 1;
        g.handle(GridEvent::Click { row: 0, col: last });
        g.handle(GridEvent::Key(Key::Enter));
        g.handle(GridEvent::Key(Key::Tab));
        assert_eq!(g.selected(), Some((1, 0)));

        g.handle(GridEvent::Click { row: 1, col: last });
        g.handle(GridEvent::Key(Key::Enter));
        g.handle(GridEvent::Key(Key::Tab));
        assert_eq!(g.selected(), Some((1, last)));
    }

    #[test]
    fn test_blur_commits_in_place() {
        let mut g = grid(2);
        let c = col(&g, keys::UNIT);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('m')));
        g.handle(GridEvent::SetBuffer("m3".into()));
        assert!(matches!(g.handle(GridEvent::Blur), Response::Committed { next: (0, _), .. }));
        assert_eq!(g.rows()[0].field(keys::UNIT), Some(&CellValue::text("m3")));
        assert_eq!(g.selected(), Some((0, c)));
    }

    #[test]
    fn test_click_abandons_edit() {
        let mut g = grid(2);
        let c = col(&g, keys::QUANTITY);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('8')));
        g.handle(GridEvent::Click { row: 1, col: c });
        assert_eq!(g.rows()[0].field(keys::QUANTITY), Some(&CellValue::Number(0.0)));
        assert_eq!(g.mode(), &GridMode::Selected { row: 1, col: c });
    }

    #[test]
    fn test_rejected_option_still_leaves_edit_mode() {
        let mut g = grid(1);
        let c = col(&g, keys::STATUS);
        g.handle(GridEvent::Click { row: 0, col: c });
        g.handle(GridEvent::Key(Key::Char('x')));
        match g.handle(GridEvent::Key(Key::Enter)) {
            Response::Committed { outcome, .. } => {
                assert!(matches!(outcome, CommitOutcome::Rejected { .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(g.rows()[0].field(keys::STATUS), Some(&CellValue::text("Not started")));
        assert_eq!(g.mode(), &GridMode::Selected { row: 0, col: c });
    }

    #[test]
    fn test_arrows_while_editing_are_ignored() {
        let mut g = grid(2);
        g.handle(GridEvent::Click { row: 0, col: 1 });
        g.handle(GridEvent::Key(Key::Char('x')));
        assert_eq!(g.handle(GridEvent::Key(Key::Down)), Response::Ignored);
        assert_eq!(g.editing(), Some((0, 1)));
    }
}
