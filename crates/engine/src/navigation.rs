//! Selection movement
//!
//! Contains:
//! - Pointer selection (click, double-click)
//! - Arrow-key movement, clamped to the grid (no wraparound)
//! - Post-commit targets for Enter and Tab

use crate::grid::Grid;
use crate::mode::{GridMode, Response};

impl Grid {
    pub(crate) fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.store.len() && col < self.schema().len()
    }

    /// Click selects the cell. An edit in progress is abandoned, not committed.
    pub(crate) fn click(&mut self, row: usize, col: usize) -> Response {
        if !self.in_bounds(row, col) {
            return Response::Ignored;
        }
        if let GridMode::Editing { row: r, col: c, .. } = &self.mode {
            log::debug!("click discarded edit of ({}, {})", r, c);
        }
        self.mode = GridMode::Selected { row, col };
        Response::Selected { row, col }
    }

    pub(crate) fn double_click(&mut self, row: usize, col: usize) -> Response {
        match self.click(row, col) {
            Response::Selected { row, col } => match self.start_edit(row, col, None) {
                Response::Ignored => Response::Selected { row, col },
                started => started,
            },
            other => other,
        }
    }

    pub(crate) fn move_selection(&mut self, dr: i32, dc: i32) -> Response {
        let GridMode::Selected { row, col } = self.mode else {
            return Response::Ignored;
        };

        let max_row = self.store.len().saturating_sub(1) as i64;
        let max_col = self.schema().len().saturating_sub(1) as i64;
        let new_row = (row as i64 + dr as i64).clamp(0, max_row) as usize;
        let new_col = (col as i64 + dc as i64).clamp(0, max_col) as usize;

        if (new_row, new_col) == (row, col) {
            return Response::Ignored;
        }
        self.mode = GridMode::Selected { row: new_row, col: new_col };
        Response::Selected { row: new_row, col: new_col }
    }

    /// Cell selected after Enter commits: one row down, or stay on the last row.
    pub(crate) fn next_after_enter(&self, row: usize, col: usize) -> (usize, usize) {
        if row + 1 < self.store.len() {
            (row + 1, col)
        } else {
            (row, col)
        }
    }

    /// Cell selected after Tab commits: next column, else first column of the
    /// next row, else stay.
    pub(crate) fn next_after_tab(&self, row: usize, col: usize) -> (usize, usize) {
        if col + 1 < self.schema().len() {
            (row, col + 1)
        } else if row + 1 < self.store.len() {
            (row + 1, 0)
        } else {
            (row, col)
        }
    }
}
