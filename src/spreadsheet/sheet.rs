use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::Row;

/// A cell read from a worksheet, positioned by 0-based indexes.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) value: CellValue,
}

/// Collects the sparse cells of one worksheet and turns them into a dense
/// matrix of rows.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells in reading order
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell, widening the data range. Empty values are not stored.
    pub(crate) fn push(&mut self, cell: Cell) {
        if cell.value.is_empty() {
            return;
        }
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Materializes the data range as rows of uniform arity.
    /// Gaps become `CellValue::Empty`; rows without any cell become empty rows.
    pub(crate) fn into_rows(mut self) -> Vec<Row> {
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) else {
            return Vec::new();
        };
        let width = col_upper - col_lower + 1;
        let mut rows: Vec<Row> = (row_lower..=row_upper)
            .map(|_| vec![CellValue::Empty; width])
            .collect();
        self.cells.sort_by_key(|cell| (cell.row, cell.col));
        for cell in self.cells {
            rows[cell.row - row_lower][cell.col - col_lower] = cell.value;
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            value: CellValue::from(value),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("", "");
        assert!(sheet.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert!(sheet.into_rows().is_empty());
    }

    #[test]
    fn sheet_bounds_skip_empty_values() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");
        push(&mut sheet, 5, 0, "");
        push(&mut sheet, 3, 2, "c");

        assert_eq!(sheet.cells.len(), 3);
        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(3));
    }

    #[test]
    fn sheet_into_rows() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 3, 2, "c");
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");

        let rows = sheet.into_rows();
        assert_eq!(rows, vec![
            vec![CellValue::from("a"), CellValue::Empty, CellValue::from("b")],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
            vec![CellValue::Empty, CellValue::from("c"), CellValue::Empty],
        ]);
    }
}
