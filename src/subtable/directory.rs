use crate::error::RustySubtableError;
use crate::helpers::reader::UnifiedReader;
use crate::subtable::merger::merge;
use crate::subtable::processor::FileProcessor;
use crate::subtable::processor::RawSheetSource;
use crate::subtable::CombinedTable;
use crate::subtable::StructuredTable;
use glob::glob;
use glob::Pattern;
use log::info;
use log::warn;
use std::path::Path;

/// Consumes the combined table of a run and tells where it went.
pub(crate) trait TableWriter {
    fn write(&mut self, table: CombinedTable) -> Result<String, RustySubtableError>;
}

/// Outcome of a complete run
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) files: usize,
    pub(crate) subtables: usize,
    pub(crate) rows: usize,
    pub(crate) destination: String,
}

/// Runs a [`FileProcessor`] over every accepted file below a root.
pub(crate) struct DirectoryProcessor<S: RawSheetSource> {
    processor: FileProcessor<S>,
}

impl<S: RawSheetSource> DirectoryProcessor<S> {
    pub(crate) fn new(processor: FileProcessor<S>) -> Self {
        Self { processor }
    }

    pub(crate) fn processor(&self) -> &FileProcessor<S> {
        &self.processor
    }

    /// Lists the files to read, in alphabetical order.
    ///
    /// The root may be a directory (walked recursively), a glob pattern,
    /// a single file or a remote URL. Files failing the extension filter
    /// are skipped with a warning.
    pub(crate) fn collect_files(&self, root: &str) -> Result<Vec<String>, RustySubtableError> {
        let candidates = if UnifiedReader::is_remote_url(root) || Path::new(root).is_file() {
            vec![root.to_owned()]
        } else {
            let pattern = if Path::new(root).is_dir() {
                format!("{}/**/*", Pattern::escape(root.trim_end_matches(['/', '\\'])))
            } else {
                root.to_owned()
            };
            let mut files = Vec::new();
            for entry in glob(&pattern)? {
                let path = entry?;
                if path.is_file() {
                    files.push(path.to_string_lossy().into_owned());
                }
            }
            files
        };

        Ok(candidates
            .into_iter()
            .filter(|file_name| {
                let accepted = self.processor.options().accepts(file_name);
                if !accepted {
                    warn!("Skip '{}': extension not in {:?}", file_name, self.processor.options().extensions);
                }
                accepted
            })
            .collect())
    }

    /// Processes the files in order and flattens their tables.
    /// The first failing file aborts the run.
    pub(crate) fn process_files(&self, files: &[String]) -> Result<Vec<StructuredTable>, RustySubtableError> {
        let mut tables = Vec::new();
        for file_name in files {
            info!("Processing '{}'", file_name);
            tables.extend(self.processor.process(file_name)?);
        }
        Ok(tables)
    }

    /// Collects, processes and merges everything below `root`.
    pub(crate) fn combine(&self, root: &str) -> Result<(usize, CombinedTable), RustySubtableError> {
        let files = self.collect_files(root)?;
        let tables = self.process_files(&files)?;
        Ok((files.len(), merge(tables)))
    }

    /// Full run: combine the tables below `root` and hand them to the writer.
    pub(crate) fn run<W: TableWriter>(&self, root: &str, writer: &mut W) -> Result<RunSummary, RustySubtableError> {
        let (files, table) = self.combine(root)?;
        let rows = table.rows.len();
        let destination = writer.write(table)?;
        let summary = RunSummary {
            files,
            subtables: self.processor.extracted(),
            rows,
            destination,
        };
        info!(
            "Extracted {} subtables ({} rows) from {} files into {}",
            summary.subtables, summary.rows, summary.files, summary.destination
        );
        Ok(summary)
    }
}
