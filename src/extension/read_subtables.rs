use crate::database::column::Column;
use crate::error::RustySubtableError;
use crate::extension::chunk_range;
use crate::extension::named_parameter_definitions;
use crate::extension::writer::write_to_vector;
use crate::extension::ExtractParameters;
use crate::extension::Param;
use crate::extension::PathParam;
use crate::spreadsheet::cell::Row;
use crate::subtable::directory::DirectoryProcessor;
use crate::subtable::directory::TableWriter;
use crate::subtable::options::ExtractOptions;
use crate::subtable::processor::FileProcessor;
use crate::subtable::CombinedTable;
use crate::subtable::SubtableError;
use duckdb::core::DataChunkHandle;
use duckdb::core::LogicalTypeHandle;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Sink that keeps the combined table as typed DuckDB columns.
/// A run without any subtable cannot describe a result schema and is refused.
struct ResultTableWriter {
    root: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TableWriter for ResultTableWriter {
    fn write(&mut self, table: CombinedTable) -> Result<String, RustySubtableError> {
        if table.is_empty() {
            Err(SubtableError::EmptyResult(self.root.to_owned()))?
        }
        self.columns = Column::infer(&table);
        self.rows = table.rows;
        Ok(format!("read_subtables('{}')", self.root))
    }
}

#[repr(C)]
pub(crate) struct ReadSubtablesBindData {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TryFrom<&ExtractParameters> for ReadSubtablesBindData {
    type Error = RustySubtableError;

    fn try_from(parameters: &ExtractParameters) -> Result<Self, Self::Error> {
        let options = ExtractOptions::try_from(parameters)?;
        let directory = DirectoryProcessor::new(FileProcessor::for_spreadsheets(options)?);
        let mut writer = ResultTableWriter {
            root: parameters.path.to_owned(),
            columns: Vec::new(),
            rows: Vec::new(),
        };
        directory.run(&parameters.path, &mut writer)?;
        Ok(ReadSubtablesBindData {
            columns: writer.columns,
            rows: writer.rows,
        })
    }
}

#[repr(C)]
pub(crate) struct ReadSubtablesInitData {
    /// Next chunk to emit
    index: AtomicUsize,
    /// Column projection indices for selective column reading
    projections: Vec<usize>,
}

/// `read_subtables(path, header := ...)`: the combined table of every subtable below `path`
pub(crate) struct ReadSubtablesTableFunction;

impl VTab for ReadSubtablesTableFunction {
    type InitData = ReadSubtablesInitData;
    type BindData = ReadSubtablesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = ExtractParameters::try_from(bind)?;
        let data = ReadSubtablesBindData::try_from(&parameters)?;
        for column in &data.columns {
            bind.add_result_column(column.name.as_str(), LogicalTypeHandle::from(column.kind.to_logical_type_id()));
        }
        Ok(data)
    }

    fn init(init: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        let projections = init.get_column_indices()
            .into_iter()
            .map(|index| index as usize)
            .collect::<Vec<_>>();
        Ok(ReadSubtablesInitData {
            index: AtomicUsize::new(0),
            projections,
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        let range = chunk_range(init.index.fetch_add(1, Ordering::Relaxed), bind.rows.len());
        let (lower, upper) = (range.start, range.end);
        if lower < upper {
            let mut vectors: Vec<_> = (0..init.projections.len()).map(|index| output.flat_vector(index)).collect();
            for (row, record) in bind.rows[lower..upper].iter().enumerate() {
                for (index, col) in init.projections.iter().enumerate() {
                    let column = &bind.columns[*col];
                    let value = record.get(*col).cloned().unwrap_or_default();
                    write_to_vector(column, &value, &mut vectors[index], row)?;
                }
            }
            output.set_len(upper - lower);
        } else {
            output.set_len(0);
        }
        Ok(())
    }

    fn supports_pushdown() -> bool {
        true
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![PathParam::kind()])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(named_parameter_definitions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures::write_xlsx;
    use crate::database::column::ColumnType;
    use crate::spreadsheet::cell::CellValue;

    fn parameters(path: &str) -> ExtractParameters {
        ExtractParameters {
            path: path.to_owned(),
            ..ExtractParameters::default()
        }
    }

    #[test]
    fn empty_combined_table_is_refused() {
        let mut writer = ResultTableWriter {
            root: "data".to_owned(),
            columns: Vec::new(),
            rows: Vec::new(),
        };
        let error = writer.write(CombinedTable::default()).unwrap_err();
        assert!(matches!(error, RustySubtableError::SubtableError(SubtableError::EmptyResult(_))));
    }

    #[test]
    fn bind_data_from_directory() {
        let root = tempfile::tempdir().unwrap();
        write_xlsx(&root.path().join("a.xlsx"), &[vec!["Id", "Val"], vec!["1", "a"], vec!["Id", "Val"], vec!["2", "b"]]);
        write_xlsx(&root.path().join("b.xlsx"), &[vec!["Id", "Val"], vec!["3", "c"]]);

        let mut parameters = parameters(root.path().to_str().unwrap());
        assert!(matches!(
            ReadSubtablesBindData::try_from(&parameters),
            Err(RustySubtableError::SubtableError(SubtableError::Configuration))
        ));

        parameters.header = Some(CellValue::from("Id"));
        let data = ReadSubtablesBindData::try_from(&parameters).unwrap();
        assert_eq!(data.columns, vec![
            Column { name: "Id".to_owned(), kind: ColumnType::BigInt },
            Column { name: "Val".to_owned(), kind: ColumnType::Varchar },
        ]);
        assert_eq!(data.rows.len(), 3);
    }

    #[test]
    fn no_subtable_found() {
        let root = tempfile::tempdir().unwrap();
        write_xlsx(&root.path().join("a.xlsx"), &[vec!["Name"], vec!["x"]]);
        let mut parameters = parameters(root.path().to_str().unwrap());
        parameters.header = Some(CellValue::from("Id"));
        assert!(matches!(
            ReadSubtablesBindData::try_from(&parameters),
            Err(RustySubtableError::SubtableError(SubtableError::EmptyResult(_)))
        ));
    }

    #[test]
    fn numeric_marker_matches_number_cells() {
        let root = tempfile::tempdir().unwrap();
        write_xlsx(&root.path().join("a.xlsx"), &[vec!["2024", "Val"], vec!["1", "a"]]);
        let mut parameters = parameters(root.path().to_str().unwrap());

        parameters.header = Some(CellValue::from("2024"));
        assert!(matches!(
            ReadSubtablesBindData::try_from(&parameters),
            Err(RustySubtableError::SubtableError(SubtableError::EmptyResult(_)))
        ));

        parameters.header = Some(CellValue::Number(2024.0));
        let data = ReadSubtablesBindData::try_from(&parameters).unwrap();
        assert_eq!(data.columns, vec![
            Column { name: "2024".to_owned(), kind: ColumnType::BigInt },
            Column { name: "Val".to_owned(), kind: ColumnType::Varchar },
        ]);
        assert_eq!(data.rows, vec![vec![CellValue::Number(1.0), CellValue::from("a")]]);
    }
}
