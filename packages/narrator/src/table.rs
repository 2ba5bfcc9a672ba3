//! Reading input tables and writing the augmented output tables.
//!
//! Each group is one CSV file: `<dir>/<group>.csv`. The output keeps every
//! source column and appends [`LINK_COLUMN`].

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ColumnsConfig;
use crate::error::{PipelineError, Result};
use crate::types::Row;

/// Column holding the share link in output tables.
pub const LINK_COLUMN: &str = "Audio File Link";

/// A group's table: header row plus records, all cells as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTable {
    pub name: String,
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl GroupTable {
    /// Build a rectangular table.
    ///
    /// Records wider than the header row get placeholder headers
    /// `column_<n>` (1-based) so no cell is lost; short records are padded
    /// with empty cells.
    pub fn new(
        name: impl Into<String>,
        mut headers: Vec<String>,
        records: Vec<Vec<String>>,
    ) -> Self {
        let width = records
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        for n in headers.len()..width {
            headers.push(format!("column_{}", n + 1));
        }
        let records = records
            .into_iter()
            .map(|mut record| {
                record.resize(width, String::new());
                record
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, empty when the record is shorter than the headers.
    pub fn cell(&self, record: usize, column: usize) -> &str {
        self.records
            .get(record)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Extract the pipeline's view of each record.
    pub fn rows(&self, columns: &ColumnsConfig) -> Result<Vec<Row>> {
        let wanted = [&columns.text, &columns.title, &columns.index];
        let missing: Vec<&str> = wanted
            .iter()
            .filter(|c| self.column(c).is_none())
            .map(|c| c.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Config(format!(
                "group {} is missing column(s): {}",
                self.name,
                missing.join(", ")
            )));
        }

        let text = self.column(&columns.text).unwrap_or_default();
        let title = self.column(&columns.title).unwrap_or_default();
        let index = self.column(&columns.index).unwrap_or_default();

        Ok((0..self.len())
            .map(|position| Row {
                group: self.name.clone(),
                position,
                title: self.cell(position, title).to_string(),
                index: self.cell(position, index).to_string(),
                text: self.cell(position, text).to_string(),
            })
            .collect())
    }

    /// Copy of this table with `links` in [`LINK_COLUMN`], one per record.
    ///
    /// An existing link column (from a previous run) is overwritten in place
    /// rather than duplicated.
    pub fn with_links(&self, links: &[String]) -> GroupTable {
        debug_assert_eq!(links.len(), self.records.len());

        let mut table = self.clone();
        let column = match table.column(LINK_COLUMN) {
            Some(column) => column,
            None => {
                table.headers.push(LINK_COLUMN.to_string());
                table.headers.len() - 1
            }
        };

        for (position, record) in table.records.iter_mut().enumerate() {
            if record.len() <= column {
                record.resize(column + 1, String::new());
            }
            record[column] = links.get(position).cloned().unwrap_or_default();
        }
        table
    }

    /// Read a CSV file; the group is named after the file stem.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input_error = |source: Box<dyn std::error::Error + Send + Sync>| PipelineError::Input {
            path: path.to_path_buf(),
            source,
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| input_error("file name is not valid UTF-8".into()))?
            .to_string();

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .map_err(|e| input_error(Box::new(e)))?;

        let headers = reader
            .headers()
            .map_err(|e| input_error(Box::new(e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| input_error(Box::new(e)))?;
            records.push(record.iter().map(str::to_string).collect());
        }

        let table = Self::new(name, headers, records);
        debug!(group = %table.name, rows = table.len(), "Loaded input table");
        Ok(table)
    }

    /// Write as CSV, creating the parent directory if needed.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let persistence_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            PipelineError::Persistence {
                path: path.to_path_buf(),
                source,
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| persistence_error(Box::new(e)))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| persistence_error(Box::new(e)))?;
        writer
            .write_record(&self.headers)
            .map_err(|e| persistence_error(Box::new(e)))?;
        for record in &self.records {
            writer
                .write_record(record)
                .map_err(|e| persistence_error(Box::new(e)))?;
        }
        writer.flush().map_err(|e| persistence_error(Box::new(e)))?;
        Ok(())
    }
}

/// Where a group's augmented table is written.
pub fn output_path(output_dir: impl AsRef<Path>, group: &str) -> PathBuf {
    output_dir.as_ref().join(format!("{}.csv", group))
}

/// Load every `*.csv` in `dir`, ordered by file name.
pub fn load_tables(dir: impl AsRef<Path>) -> Result<Vec<GroupTable>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::Input {
        path: dir.to_path_buf(),
        source: Box::new(e),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();

    let tables = paths
        .iter()
        .map(GroupTable::read_csv)
        .collect::<Result<Vec<_>>>()?;

    info!(dir = %dir.display(), groups = tables.len(), "Loaded input tables");
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnsConfig {
        ColumnsConfig::default()
    }

    fn sample() -> GroupTable {
        GroupTable::new(
            "Episode1",
            vec!["title".into(), "index".into(), "text".into(), "notes".into()],
            vec![
                vec!["Intro".into(), "1".into(), "Hello".into(), "first".into()],
                vec!["Intro".into(), "2".into(), "World".into()],
            ],
        )
    }

    #[test]
    fn test_rows_follow_column_mapping() {
        let rows = sample().rows(&columns()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].position, 1);
        assert_eq!(rows[1].title, "Intro");
        assert_eq!(rows[1].index, "2");
        assert_eq!(rows[1].text, "World");
        assert_eq!(rows[0].group, "Episode1");
    }

    #[test]
    fn test_missing_columns_named_in_error() {
        let mapping = ColumnsConfig {
            text: "Narration".into(),
            title: "title".into(),
            index: "Slide".into(),
        };
        let err = sample().rows(&mapping).unwrap_err().to_string();

        assert!(err.contains("Episode1"));
        assert!(err.contains("Narration, Slide"));
    }

    #[test]
    fn test_with_links_appends_column_and_preserves_order() {
        let table = sample();
        let out = table.with_links(&["https://a".into(), String::new()]);

        assert_eq!(out.headers.last().map(String::as_str), Some(LINK_COLUMN));
        assert_eq!(out.len(), table.len());
        assert_eq!(out.records[0][0..3], table.records[0][0..3]);
        assert_eq!(out.records[0][4], "https://a");
        assert_eq!(out.records[1][4], "");
    }

    #[test]
    fn test_with_links_overwrites_previous_run() {
        let first = sample().with_links(&["https://old".into(), "https://old2".into()]);
        let second = first.with_links(&["https://new".into(), String::new()]);

        assert_eq!(second.headers.len(), first.headers.len());
        assert_eq!(second.records[0][4], "https://new");
        assert_eq!(second.records[1][4], "");
    }

    #[test]
    fn test_cells_beyond_header_survive_link_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Episode1.csv");
        std::fs::write(&path, "title,index,text\nIntro,1,Hello,extra-cell\nIntro,2,World\n")
            .unwrap();

        let table = GroupTable::read_csv(&path).unwrap();
        assert_eq!(table.headers, vec!["title", "index", "text", "column_4"]);

        let out = table.with_links(&["https://link".into(), String::new()]);
        assert_eq!(
            out.headers,
            vec!["title", "index", "text", "column_4", LINK_COLUMN]
        );
        assert_eq!(
            out.records[0],
            vec!["Intro", "1", "Hello", "extra-cell", "https://link"]
        );
        assert_eq!(out.records[1], vec!["Intro", "2", "World", "", ""]);
    }

    #[test]
    fn test_csv_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Episode1.csv"),
            "title, index ,text\nIntro,1,\"Hello, there\"\nIntro,2,World\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let tables = load_tables(dir.path()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "Episode1");
        assert_eq!(tables[0].headers, vec!["title", "index", "text"]);
        assert_eq!(tables[0].records[0][2], "Hello, there");

        let out_path = output_path(dir.path().join("out"), "Episode1");
        tables[0]
            .with_links(&["https://x".into(), String::new()])
            .write_csv(&out_path)
            .unwrap();

        let written = GroupTable::read_csv(&out_path).unwrap();
        assert_eq!(written.headers.last().map(String::as_str), Some(LINK_COLUMN));
        assert_eq!(written.len(), 2);
        assert_eq!(written.records[0][3], "https://x");
    }

    #[test]
    fn test_missing_input_dir_is_input_error() {
        let err = load_tables("/definitely/not/here").unwrap_err();
        assert!(matches!(err, PipelineError::Input { .. }));
    }
}
