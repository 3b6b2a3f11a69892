use crate::spreadsheet::cell::CellValue;
use crate::subtable::CombinedTable;
use crate::subtable::StructuredTable;
use log::debug;
use log::warn;
use std::collections::HashMap;

/// Unions tables by column label, keeping first-seen column order and input row order.
///
/// Repeated labels inside one table are matched by occurrence, so the second
/// `Val` of one table lines up with the second `Val` of another.
/// Cells of columns a table does not have are left empty.
/// Merging nothing gives a table without columns or rows.
pub(crate) fn merge(tables: Vec<StructuredTable>) -> CombinedTable {
    if tables.is_empty() {
        warn!("No subtable to merge");
        return CombinedTable::default();
    }

    let mut columns = Vec::<String>::new();
    let mut positions = HashMap::<(String, usize), usize>::new();
    let mappings: Vec<Vec<usize>> = tables
        .iter()
        .map(|table| {
            let mut occurrences = HashMap::<&str, usize>::new();
            table.columns.iter().map(|label| {
                let occurrence = occurrences.entry(label.as_str()).or_default();
                let key = (label.to_owned(), *occurrence);
                *occurrence += 1;
                *positions.entry(key).or_insert_with(|| {
                    columns.push(label.to_owned());
                    columns.len() - 1
                })
            }).collect()
        })
        .collect();

    let width = columns.len();
    let mut rows = Vec::with_capacity(tables.iter().map(|table| table.rows.len()).sum());
    for (table, mapping) in tables.into_iter().zip(mappings) {
        for row in table.rows {
            let mut combined = vec![CellValue::Empty; width];
            for (value, position) in row.into_iter().zip(&mapping) {
                combined[*position] = value;
            }
            rows.push(combined);
        }
    }
    debug!("Merged {} rows into {} columns", rows.len(), width);
    CombinedTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> StructuredTable {
        StructuredTable::new(
            columns.iter().map(|column| column.to_string()).collect(),
            rows.iter().map(|row| row.iter().map(|value| CellValue::from(*value)).collect()).collect(),
        )
    }

    #[test]
    fn union_by_label() {
        let combined = merge(vec![
            table(&["A", "B"], &[&["a1", "b1"]]),
            table(&["B", "C"], &[&["b2", "c2"]]),
        ]);
        assert_eq!(combined.columns, vec!["A", "B", "C"]);
        assert_eq!(combined.rows, vec![
            vec![CellValue::from("a1"), CellValue::from("b1"), CellValue::Empty],
            vec![CellValue::Empty, CellValue::from("b2"), CellValue::from("c2")],
        ]);
    }

    #[test]
    fn keeps_row_order_and_duplicates() {
        let combined = merge(vec![
            table(&["Id"], &[&["1"], &["1"]]),
            table(&["Id"], &[&["2"]]),
            table(&["Id"], &[]),
            table(&["Id"], &[&["3"]]),
        ]);
        assert_eq!(combined.columns, vec!["Id"]);
        let ids: Vec<String> = combined.rows.iter().map(|row| row[0].to_string()).collect();
        assert_eq!(ids, vec!["1", "1", "2", "3"]);
    }

    #[test]
    fn repeated_labels_match_by_occurrence() {
        let combined = merge(vec![
            table(&["Val", "Id", "Val"], &[&["x", "1", "y"]]),
            table(&["Id", "Val"], &[&["2", "z"]]),
        ]);
        assert_eq!(combined.columns, vec!["Val", "Id", "Val"]);
        assert_eq!(combined.rows[1], vec![CellValue::from("z"), CellValue::from("2"), CellValue::Empty]);
    }

    #[test]
    fn merge_nothing() {
        let combined = merge(vec![]);
        assert!(combined.is_empty());
        assert!(combined.rows.is_empty());
    }
}
