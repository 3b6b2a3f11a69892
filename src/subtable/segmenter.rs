use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::Row;
use crate::subtable::RawSubtableBlock;

/// Partitions raw rows into subtable blocks in a single pass.
///
/// * Empty rows are skipped and never open, close or extend a block.
/// * A header row closes the open block and starts a new one.
/// * Other rows extend the open block, or are dropped before the first header.
///
/// The open block is flushed once the rows are exhausted, so trailing empty
/// rows cannot swallow the last table.
pub(crate) fn segment<I, H, E>(rows: I, is_header: H, is_empty: E) -> Vec<RawSubtableBlock>
where
    I: IntoIterator<Item = Row>,
    H: Fn(&[CellValue]) -> bool,
    E: Fn(&[CellValue]) -> bool,
{
    let mut blocks = Vec::<RawSubtableBlock>::new();
    let mut current = Vec::<Row>::new();
    for row in rows {
        if is_empty(&row) {
            continue;
        } else if is_header(&row) {
            if !current.is_empty() {
                blocks.push(RawSubtableBlock { rows: std::mem::take(&mut current) });
            }
            current.push(row);
        } else if !current.is_empty() {
            current.push(row);
        }
    }
    if !current.is_empty() {
        blocks.push(RawSubtableBlock { rows: current });
    }
    blocks
}

/// Header test: the marker appears in any cell of the row.
pub(crate) fn has_marker(marker: &CellValue) -> impl Fn(&[CellValue]) -> bool + '_ {
    move |row| row.iter().any(|cell| cell == marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::is_empty_row;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|value| CellValue::from(*value)).collect()
    }

    fn empty() -> Row {
        vec![CellValue::Empty, CellValue::Empty]
    }

    fn run(rows: Vec<Row>) -> Vec<RawSubtableBlock> {
        let marker = CellValue::from("Id");
        segment(rows, has_marker(&marker), is_empty_row)
    }

    #[test]
    fn one_block_per_header() {
        let blocks = run(vec![
            row(&["Id", "Val"]),
            row(&["1", "a"]),
            row(&["Val", "Id"]),
            row(&["2", "b"]),
            row(&["3", "c"]),
            row(&["Id", "Other"]),
            row(&["4", "d"]),
        ]);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].header(), Some(&row(&["Id", "Val"])));
        assert_eq!(blocks[1].header(), Some(&row(&["Val", "Id"])));
        assert_eq!(blocks[1].data_len(), 2);
        assert_eq!(blocks[2].rows, vec![row(&["Id", "Other"]), row(&["4", "d"])]);
    }

    #[test]
    fn empty_rows_are_neutral() {
        let dense = run(vec![
            row(&["Id", "Val"]),
            row(&["1", "a"]),
            row(&["Id", "Val"]),
            row(&["2", "b"]),
        ]);
        let sparse = run(vec![
            empty(),
            row(&["Id", "Val"]),
            empty(),
            row(&["1", "a"]),
            empty(),
            empty(),
            row(&["Id", "Val"]),
            row(&["2", "b"]),
            empty(),
        ]);
        assert_eq!(dense, sparse);
    }

    #[test]
    fn trailing_table_is_flushed_after_empty_rows() {
        let blocks = run(vec![
            row(&["Id", "Val"]),
            row(&["1", "a"]),
            row(&["Id", "Val"]),
            row(&["2", "b"]),
            row(&["3", "c"]),
            empty(),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].rows, vec![row(&["Id", "Val"]), row(&["2", "b"]), row(&["3", "c"])]);
    }

    #[test]
    fn rows_before_first_header_are_dropped() {
        let blocks = run(vec![
            row(&["Report", ""]),
            row(&["2024", "Q1"]),
            row(&["Id", "Val"]),
            row(&["1", "a"]),
        ]);
        assert_eq!(blocks, vec![RawSubtableBlock {
            rows: vec![row(&["Id", "Val"]), row(&["1", "a"])],
        }]);
    }

    #[test]
    fn adjacent_headers_keep_header_only_block() {
        let blocks = run(vec![row(&["Id", "A"]), row(&["Id", "B"]), row(&["1", "b"])]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rows, vec![row(&["Id", "A"])]);
        assert_eq!(blocks[0].data_len(), 0);
    }

    #[test]
    fn no_marker_no_blocks() {
        assert!(run(vec![row(&["a", "b"]), row(&["1", "2"])]).is_empty());
        assert!(run(vec![]).is_empty());
    }

    #[test]
    fn marker_matches_by_value() {
        let marker = CellValue::Number(0.0);
        let rows = vec![
            vec![CellValue::from("0"), CellValue::from("x")],
            vec![CellValue::from("y"), CellValue::Number(0.0)],
            vec![CellValue::from("z"), CellValue::Number(1.0)],
        ];
        let blocks = segment(rows, has_marker(&marker), is_empty_row);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].data_len(), 1);
    }
}
