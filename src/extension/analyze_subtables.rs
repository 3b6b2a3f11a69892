use crate::error::RustySubtableError;
use crate::extension::chunk_range;
use crate::extension::named_parameter_definitions;
use crate::extension::writer::write_primitive;
use crate::extension::ExtractParameters;
use crate::extension::Param;
use crate::extension::PathParam;
use crate::subtable::directory::DirectoryProcessor;
use crate::subtable::options::ExtractOptions;
use crate::subtable::processor::FileProcessor;
use duckdb::core::DataChunkHandle;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use log::info;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// One extracted subtable: file, 1-based position in the file, labels and data row count
#[derive(Clone, Debug, PartialEq)]
struct SubtableSummary {
    file: String,
    subtable: usize,
    columns: String,
    rows: usize,
}

#[repr(C)]
pub(crate) struct AnalyzeSubtablesBindData {
    subtables: Vec<SubtableSummary>,
}

impl TryFrom<&ExtractParameters> for AnalyzeSubtablesBindData {
    type Error = RustySubtableError;

    fn try_from(parameters: &ExtractParameters) -> Result<Self, Self::Error> {
        let options = ExtractOptions::try_from(parameters)?;
        let directory = DirectoryProcessor::new(FileProcessor::for_spreadsheets(options)?);
        let files = directory.collect_files(&parameters.path)?;
        let mut subtables = Vec::new();
        for file in &files {
            let tables = directory.processor().process(file)?;
            subtables.extend(tables.into_iter().enumerate().map(|(index, table)| SubtableSummary {
                file: file.to_owned(),
                subtable: index + 1,
                columns: table.columns.join(", "),
                rows: table.rows.len(),
            }));
        }
        info!("Found {} subtables in {} files", directory.processor().extracted(), files.len());
        Ok(AnalyzeSubtablesBindData { subtables })
    }
}

#[repr(C)]
pub(crate) struct AnalyzeSubtablesInitData {
    /// Next chunk to emit
    index: AtomicUsize,
}

/// `analyze_subtables(path, header := ...)`: one row per subtable found below `path`
pub(crate) struct AnalyzeSubtablesTableFunction;

impl VTab for AnalyzeSubtablesTableFunction {
    type InitData = AnalyzeSubtablesInitData;
    type BindData = AnalyzeSubtablesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = ExtractParameters::try_from(bind)?;
        let data = AnalyzeSubtablesBindData::try_from(&parameters)?;
        bind.add_result_column("file", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("subtable", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("columns", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("rows", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(AnalyzeSubtablesInitData {
            index: AtomicUsize::new(0),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init = func.get_init_data();
        let bind = func.get_bind_data();
        let range = chunk_range(init.index.fetch_add(1, Ordering::Relaxed), bind.subtables.len());
        let (lower, upper) = (range.start, range.end);
        if lower < upper {
            let files = output.flat_vector(0);
            let mut subtables = output.flat_vector(1);
            let columns = output.flat_vector(2);
            let mut rows = output.flat_vector(3);
            for index in lower..upper {
                let summary = &bind.subtables[index];
                files.insert(index - lower, summary.file.as_str());
                write_primitive(&mut subtables, index - lower, summary.subtable as i64);
                columns.insert(index - lower, summary.columns.as_str());
                write_primitive(&mut rows, index - lower, summary.rows as i64);
            }
            output.set_len(upper - lower);
        } else {
            output.set_len(0);
        }
        Ok(())
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
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::fixtures::write_xlsx;

    #[test]
    fn summarises_each_subtable() {
        let root = tempfile::tempdir().unwrap();
        write_xlsx(&root.path().join("a.xlsx"), &[
            vec!["Id", "Val"],
            vec!["1", "a"],
            vec!["2", "b"],
            vec!["Id", "Code"],
        ]);
        write_xlsx(&root.path().join("b.xlsx"), &[vec!["Name", "Val"]]);
        let parameters = ExtractParameters {
            path: root.path().to_str().unwrap().to_owned(),
            header: Some(CellValue::from("Id")),
            ..ExtractParameters::default()
        };
        let data = AnalyzeSubtablesBindData::try_from(&parameters).unwrap();
        let file = root.path().join("a.xlsx").to_string_lossy().into_owned();
        assert_eq!(data.subtables, vec![
            SubtableSummary { file: file.to_owned(), subtable: 1, columns: "Id, Val".to_owned(), rows: 2 },
            SubtableSummary { file, subtable: 2, columns: "Id, Code".to_owned(), rows: 0 },
        ]);
    }
}
