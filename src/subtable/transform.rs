//! Ready-made repair steps for assembled tables.

use crate::spreadsheet::cell::CellValue;
use crate::subtable::StructuredTable;
use crate::subtable::Transform;
use std::sync::Arc;

/// Removes every column whose data cells are all empty.
pub(crate) fn drop_empty_columns() -> Transform {
    Arc::new(|table: StructuredTable| {
        let keep: Vec<bool> = (0..table.columns.len())
            .map(|col| table.rows.iter().any(|row| row.get(col).is_some_and(|cell| !cell.is_empty())))
            .collect();
        let columns = table.columns
            .into_iter()
            .zip(&keep)
            .filter_map(|(column, keep)| keep.then_some(column))
            .collect();
        let rows = table.rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&keep)
                    .filter_map(|(cell, keep)| keep.then_some(cell))
                    .collect()
            })
            .collect();
        StructuredTable { columns, rows }
    })
}

/// Copies the cell of the first `column` in data row `from_row` into data row `to_row`.
/// Leaves the table alone when the column or either row does not exist.
pub(crate) fn copy_cell(column: &str, from_row: usize, to_row: usize) -> Transform {
    let column = column.to_owned();
    Arc::new(move |mut table: StructuredTable| {
        let Some(col) = table.position(&column) else {
            return table;
        };
        let value: Option<CellValue> = table.rows
            .get(from_row)
            .and_then(|row| row.get(col))
            .cloned();
        if let Some((value, cell)) = value.zip(table.rows.get_mut(to_row).and_then(|row| row.get_mut(col))) {
            *cell = value;
        }
        table
    })
}

/// Applies transforms one after another.
pub(crate) fn chain(transforms: Vec<Transform>) -> Transform {
    Arc::new(move |table: StructuredTable| {
        transforms.iter().fold(table, |table, transform| transform(table))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StructuredTable {
        StructuredTable::new(
            vec!["Id".to_owned(), "Unit".to_owned(), "Val".to_owned()],
            vec![
                vec![CellValue::Empty, CellValue::Empty, CellValue::from("kg")],
                vec![CellValue::from("A7"), CellValue::from(""), CellValue::Number(3.0)],
            ],
        )
    }

    #[test]
    fn drops_all_empty_columns() {
        let result = drop_empty_columns()(table());
        assert_eq!(result.columns, vec!["Id", "Val"]);
        assert_eq!(result.rows, vec![
            vec![CellValue::Empty, CellValue::from("kg")],
            vec![CellValue::from("A7"), CellValue::Number(3.0)],
        ]);
    }

    #[test]
    fn copies_identifier_up() {
        let result = copy_cell("Id", 1, 0)(table());
        assert_eq!(result.rows[0][0], CellValue::from("A7"));
        assert_eq!(result.rows[1][0], CellValue::from("A7"));
    }

    #[test]
    fn copy_ignores_missing_targets() {
        assert_eq!(copy_cell("Code", 1, 0)(table()), table());
        assert_eq!(copy_cell("Id", 5, 0)(table()), table());
        assert_eq!(copy_cell("Id", 1, 5)(table()), table());
    }

    #[test]
    fn chain_applies_in_order() {
        let transform = chain(vec![copy_cell("Id", 1, 0), drop_empty_columns()]);
        let result = transform(table());
        assert_eq!(result.columns, vec!["Id", "Val"]);
        assert_eq!(result.rows[0], vec![CellValue::from("A7"), CellValue::from("kg")]);
        assert_eq!(chain(vec![])(table()), table());
    }
}
