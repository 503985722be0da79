//! The tabular dataset the batch reads keys from and writes fields into.

use crate::error::DatasetError;
use crate::normalize::strip_diacritics;
use crate::{ProcessingOptions, ResolutionRecord};
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    delimiter: u8,
}

impl Dataset {
    pub fn read_csv(path: &Path, delimiter: u8) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file, delimiter)?;
        info!(
            path = %path.display(),
            rows = dataset.rows.len(),
            columns = dataset.headers.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: io::Read>(reader: R, delimiter: u8) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_owned())
            .collect();
        if headers.iter().all(|header| header.is_empty()) {
            return Err(DatasetError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_owned).collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self {
            headers,
            rows,
            delimiter,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index by name, ignoring case, accents and surrounding spaces.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = column_key(name);
        self.headers
            .iter()
            .position(|header| column_key(header) == wanted)
    }

    /// Reads every row as a record. The key column must exist; missing target
    /// columns are appended empty.
    pub fn records(
        &mut self,
        options: &ProcessingOptions,
    ) -> Result<Vec<ResolutionRecord>, DatasetError> {
        let key = self
            .column(&options.key_column)
            .ok_or_else(|| DatasetError::MissingColumn(options.key_column.clone()))?;
        let name = self.ensure_column(&options.name_column);
        let id = self.ensure_column(&options.id_column);

        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| ResolutionRecord {
                row_index,
                key: row[key].trim().to_string(),
                name: row[name].trim().to_string(),
                id: row[id].trim().to_string(),
                status: None,
            })
            .collect())
    }

    /// Writes the target fields of `records` back into their rows; the name
    /// cell carries the status as a bracketed suffix.
    pub fn apply(
        &mut self,
        records: &[ResolutionRecord],
        options: &ProcessingOptions,
    ) -> Result<(), DatasetError> {
        let name = self.ensure_column(&options.name_column);
        let id = self.ensure_column(&options.id_column);

        for record in records {
            let Some(row) = self.rows.get_mut(record.row_index) else {
                continue;
            };
            row[name] = record.name_cell();
            row[id] = record.id.clone();
        }
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), DatasetError> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)?;
        info!(path = %path.display(), rows = self.rows.len(), "dataset written");
        Ok(())
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(writer);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.resize(self.headers.len(), String::new());
        }
        self.headers.len() - 1
    }
}

fn column_key(name: &str) -> String {
    strip_diacritics(name.trim()).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = "\u{feff}Resolución;Usuario;Fecha\nRS 97;;2023-01-02\n98;Ana Ruiz;2023-01-03\n";

    #[test]
    fn reads_records_and_adds_missing_columns() -> Result<(), DatasetError> {
        let mut dataset = Dataset::from_reader(SAMPLE.as_bytes(), b';')?;
        let options = ProcessingOptions::default();

        let records = dataset.records(&options)?;

        assert_eq!(dataset.headers(), ["Resolución", "Usuario", "Fecha", "Identificacion"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "RS 97");
        assert_eq!(records[1].name, "Ana Ruiz");
        assert_eq!(records[1].id, "");
        Ok(())
    }

    #[test]
    fn missing_key_column_is_fatal() -> Result<(), DatasetError> {
        let mut dataset = Dataset::from_reader("Numero,Usuario\n1,x\n".as_bytes(), b',')?;
        let result = dataset.records(&ProcessingOptions::default());
        assert!(matches!(result, Err(DatasetError::MissingColumn(column)) if column == "Resolución"));
        Ok(())
    }

    #[test]
    fn column_lookup_ignores_case_and_accents() -> Result<(), DatasetError> {
        let dataset = Dataset::from_reader(" RESOLUCION ,usuario\n".as_bytes(), b',')?;
        assert_eq!(dataset.column("Resolución"), Some(0));
        assert_eq!(dataset.column("Usuario"), Some(1));
        assert_eq!(dataset.column("Identificacion"), None);
        Ok(())
    }

    #[test]
    fn applied_records_round_trip_through_disk() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");
        let options = ProcessingOptions::default();

        let mut dataset = Dataset::from_reader(SAMPLE.as_bytes(), b';')?;
        let mut records = dataset.records(&options)?;
        records[0].name = "Luis Cano".to_string();
        records[0].id = "70111222".to_string();
        records[0].status = Some("anchor_span/slow".to_string());
        dataset.apply(&records, &options)?;
        dataset.write_csv(&path)?;

        let written = fs::read_to_string(&path)?;
        assert!(written.starts_with("Resolución;Usuario;Fecha;Identificacion\n"));
        assert!(written.contains("RS 97;Luis Cano [anchor_span/slow];2023-01-02;70111222\n"));

        let mut reread = Dataset::read_csv(&path, b';')?;
        let reread_records = reread.records(&options)?;
        assert_eq!(reread_records[0].id, "70111222");
        Ok(())
    }
}
