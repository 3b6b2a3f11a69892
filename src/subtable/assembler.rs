use crate::subtable::AssembleError;
use crate::subtable::RawSubtableBlock;
use crate::subtable::StructuredTable;
use crate::subtable::Transform;

/// Turns a block into a structured table.
///
/// The header row becomes the column labels (order kept, duplicates allowed)
/// and every other row a data row. A data row of a different length than
/// the header fails the block instead of being padded or truncated.
/// The transform, when given, receives the table and its result is returned unchecked.
pub(crate) fn assemble(block: RawSubtableBlock, transform: Option<&Transform>) -> Result<StructuredTable, AssembleError> {
    let mut rows = block.rows.into_iter();
    let header = rows.next().ok_or(AssembleError::MissingHeader)?;
    let columns: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let rows: Vec<_> = rows.collect();
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != columns.len()) {
        return Err(AssembleError::ArityMismatch {
            row: index + 1,
            expected: columns.len(),
            found: row.len(),
        });
    }

    let table = StructuredTable::new(columns, rows);
    Ok(match transform {
        Some(transform) => transform(table),
        None => table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::cell::Row;
    use std::sync::Arc;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|value| CellValue::from(*value)).collect()
    }

    fn block(rows: Vec<Row>) -> RawSubtableBlock {
        RawSubtableBlock { rows }
    }

    #[test]
    fn header_becomes_columns() {
        let table = assemble(block(vec![
            row(&["A", "B", "C"]),
            row(&["1", "2", "3"]),
            row(&["4", "5", "6"]),
        ]), None).unwrap();
        assert_eq!(table.columns, vec!["A", "B", "C"]);
        assert_eq!(table.rows, vec![row(&["1", "2", "3"]), row(&["4", "5", "6"])]);
    }

    #[test]
    fn labels_render_cell_values() {
        let table = assemble(block(vec![vec![
            CellValue::Number(2024.0),
            CellValue::Empty,
            CellValue::from("Val"),
            CellValue::from("Val"),
        ]]), None).unwrap();
        assert_eq!(table.columns, vec!["2024", "", "Val", "Val"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn arity_mismatch() {
        let short = assemble(block(vec![row(&["A", "B", "C"]), row(&["1", "2"])]), None);
        assert_eq!(short, Err(AssembleError::ArityMismatch { row: 1, expected: 3, found: 2 }));

        let long = assemble(block(vec![
            row(&["A", "B", "C"]),
            row(&["1", "2", "3"]),
            row(&["1", "2", "3", "4"]),
        ]), None);
        assert_eq!(long, Err(AssembleError::ArityMismatch { row: 2, expected: 3, found: 4 }));

        assert_eq!(assemble(block(vec![]), None), Err(AssembleError::MissingHeader));
    }

    #[test]
    fn transform_replaces_table() {
        let transform: Transform = Arc::new(|mut table: StructuredTable| {
            table.columns.remove(1);
            for row in table.rows.iter_mut() {
                row.remove(1);
            }
            table
        });
        let table = assemble(block(vec![
            row(&["A", "B", "C"]),
            row(&["1", "2", "3"]),
        ]), Some(&transform)).unwrap();
        assert_eq!(table, StructuredTable::new(
            vec!["A".to_owned(), "C".to_owned()],
            vec![row(&["1", "3"])],
        ));
    }
}
