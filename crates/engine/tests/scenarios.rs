// End-to-end editing scenarios on the standard quantities sheet.

use mqt_engine::schema::keys;
use mqt_engine::{
    CellValue, ColumnSchema, CommitOutcome, FieldMap, Grid, GridEvent, GridMode, InMemoryRepository, Key,
    RemoteWrite, Response, RowId, RowRepository, SheetId, StoredRow,
};

fn sheet() -> SheetId {
    SheetId::from("mqt-42")
}

fn stored(id: &str, ordinal: i64, qty: f64, price: f64) -> StoredRow {
    let mut fields = FieldMap::new();
    fields.insert(keys::REFERENCE.into(), CellValue::text(format!("{}", ordinal + 1)));
    fields.insert(keys::DESCRIPTION.into(), CellValue::text("Excavation"));
    fields.insert(keys::UNIT.into(), CellValue::text("m3"));
    fields.insert(keys::QUANTITY.into(), CellValue::Number(qty));
    fields.insert(keys::UNIT_PRICE.into(), CellValue::Number(price));
    StoredRow { id: RowId::from(id), ordinal, fields }
}

fn loaded(rows: Vec<StoredRow>) -> (Grid, InMemoryRepository) {
    let mut repo = InMemoryRepository::new().with_sheet(sheet(), rows);
    let mut grid = Grid::new(sheet(), ColumnSchema::quantities_sheet());
    grid.load_sheet(&mut repo, sheet()).unwrap();
    (grid, repo)
}

fn col(grid: &Grid, key: &str) -> usize {
    grid.schema().index_of(key).unwrap()
}

#[test]
fn type_then_tab_commits_and_moves_right() {
    let (mut grid, mut repo) = loaded(vec![stored("a", 0, 10.0, 4.0), stored("b", 1, 2.0, 1.0)]);
    let qty = col(&grid, keys::QUANTITY);

    grid.handle(GridEvent::Click { row: 0, col: qty });
    assert_eq!(grid.handle(GridEvent::Key(Key::Char('5'))), Response::EditStarted { row: 0, col: qty });
    assert_eq!(grid.edit_buffer(), Some("5"));

    let response = grid.handle(GridEvent::Key(Key::Tab));
    assert_eq!(
        response,
        Response::Committed {
            outcome: CommitOutcome::Applied {
                value: CellValue::Number(5.0),
                recovered: false,
                remote: RemoteWrite::Queued,
            },
            next: (0, col(&grid, keys::UNIT_PRICE)),
        }
    );
    assert_eq!(grid.rows()[0].field(keys::QUANTITY), Some(&CellValue::Number(5.0)));
    assert_eq!(grid.rows()[0].number(keys::TOTAL), 20.0);
    assert_eq!(grid.mode(), &GridMode::Selected { row: 0, col: col(&grid, keys::UNIT_PRICE) });

    assert_eq!(grid.flush_pending(&mut repo), 0);
    let remote = repo.fetch_rows(&sheet()).unwrap();
    assert_eq!(remote[0].fields.get(keys::QUANTITY), Some(&CellValue::Number(5.0)));
}

#[test]
fn comma_decimal_unit_price() {
    let (mut grid, _repo) = loaded(vec![stored("a", 0, 8.0, 1.0)]);
    let price = col(&grid, keys::UNIT_PRICE);

    grid.handle(GridEvent::Click { row: 0, col: price });
    grid.handle(GridEvent::Key(Key::Enter));
    grid.handle(GridEvent::SetBuffer("12,50".into()));
    grid.handle(GridEvent::Key(Key::Enter));

    assert_eq!(grid.rows()[0].field(keys::UNIT_PRICE), Some(&CellValue::Number(12.5)));
    assert_eq!(grid.rows()[0].number(keys::TOTAL), 8.0 * 12.5);
}

#[test]
fn delete_with_confirmation_reduces_planned_total() {
    let (mut grid, mut repo) = loaded(vec![
        stored("a", 0, 10.0, 4.0),
        stored("b", 1, 3.0, 5.0),
        stored("c", 2, 1.0, 2.0),
    ]);
    let before = grid.totals().total_planned_value;
    let removed_total = grid.rows()[1].number(keys::TOTAL);

    grid.handle(GridEvent::Click { row: 1, col: 0 });
    assert_eq!(grid.handle(GridEvent::Key(Key::Delete)), Response::DeleteRequested { row: 1 });
    assert_eq!(grid.pending_delete(), Some(1));
    assert_eq!(grid.rows().len(), 3);

    assert_eq!(grid.handle(GridEvent::ConfirmDelete), Response::RowDeleted { row: 1 });
    assert_eq!(grid.rows().len(), 2);
    assert_eq!(grid.mode(), &GridMode::Idle);
    assert_eq!(grid.totals().total_planned_value, before - removed_total);

    grid.flush_pending(&mut repo);
    assert!(repo.find(&RowId::from("b")).is_none());
}

#[test]
fn delete_can_be_cancelled() {
    let (mut grid, _repo) = loaded(vec![stored("a", 0, 1.0, 1.0)]);
    grid.handle(GridEvent::Click { row: 0, col: 0 });
    grid.handle(GridEvent::Key(Key::Delete));
    assert_eq!(grid.handle(GridEvent::CancelDelete), Response::DeleteCancelled);
    assert_eq!(grid.pending_delete(), None);
    assert_eq!(grid.rows().len(), 1);
    assert_eq!(grid.handle(GridEvent::ConfirmDelete), Response::Ignored);
    assert_eq!(grid.rows().len(), 1);
}

#[test]
fn delete_without_confirmation_setting() {
    let mut grid = Grid::new(sheet(), ColumnSchema::quantities_sheet()).with_confirm_delete(false);
    grid.load_rows(vec![stored("a", 0, 1.0, 1.0), stored("b", 1, 1.0, 1.0)]);
    grid.handle(GridEvent::Click { row: 0, col: 0 });
    assert_eq!(grid.handle(GridEvent::Key(Key::Delete)), Response::RowDeleted { row: 0 });
    assert_eq!(grid.rows().len(), 1);
}

#[test]
fn unparseable_quantity_becomes_zero() {
    let (mut grid, _repo) = loaded(vec![stored("a", 0, 10.0, 4.0)]);
    let qty = col(&grid, keys::QUANTITY);

    grid.handle(GridEvent::Click { row: 0, col: qty });
    grid.handle(GridEvent::Key(Key::Char('a')));
    grid.handle(GridEvent::Key(Key::Char('b')));
    grid.handle(GridEvent::Key(Key::Char('c')));
    let response = grid.handle(GridEvent::Key(Key::Enter));

    assert!(matches!(
        response,
        Response::Committed { outcome: CommitOutcome::Applied { recovered: true, .. }, .. }
    ));
    assert_eq!(grid.rows()[0].field(keys::QUANTITY), Some(&CellValue::Number(0.0)));
    assert_eq!(grid.rows()[0].number(keys::COMPLETION_RATIO), 0.0);
    assert!(grid.notices().is_empty());
}

#[test]
fn failed_save_is_reported_once_and_not_rolled_back() {
    let (mut grid, mut repo) = loaded(vec![stored("a", 0, 10.0, 4.0)]);
    let qty = col(&grid, keys::QUANTITY);

    grid.handle(GridEvent::Click { row: 0, col: qty });
    grid.handle(GridEvent::Key(Key::Char('6')));
    grid.handle(GridEvent::Key(Key::Enter));

    repo.fail_next(mqt_engine::RepositoryError::Transient("502".into()));
    assert_eq!(grid.flush_pending(&mut repo), 1);
    assert_eq!(grid.notices().len(), 1);
    assert_eq!(grid.rows()[0].number(keys::QUANTITY), 6.0);

    // Nothing left to retry
    assert_eq!(grid.flush_pending(&mut repo), 0);
    assert_eq!(grid.notices().len(), 1);
}
