use crate::models::OrgCounts;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// The organizational code sheet, kept as raw CSV records so every input
/// column survives into the report.
#[derive(Debug, Clone)]
pub struct OrgCodeTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    code_index: usize,
}

impl OrgCodeTable {
    pub fn from_reader<R: Read>(reader: R, code_column: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = reader.headers()?.clone();
        let code_index = headers
            .iter()
            .position(|h| h.trim() == code_column)
            .with_context(|| format!("Column '{}' not found in organization code table", code_column))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?);
        }

        Ok(Self {
            headers,
            rows,
            code_index,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn org_codes(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(self.code_index).unwrap_or("").trim().to_string())
            .collect()
    }

    /// Appends the six count columns; `counts[i]` belongs to row `i`.
    pub fn with_counts(mut self, counts: &[OrgCounts]) -> Result<Self> {
        if counts.len() != self.rows.len() {
            anyhow::bail!(
                "Count list has {} entries but table has {} rows",
                counts.len(),
                self.rows.len()
            );
        }

        for column in OrgCounts::COLUMNS {
            self.headers.push_field(column);
        }

        for (row, tally) in self.rows.iter_mut().zip(counts) {
            for value in tally.values() {
                row.push_field(&value.to_string());
            }
        }

        Ok(self)
    }

    /// Stable ascending sort of whole rows by organizational code.
    pub fn sorted_by_code(mut self) -> Self {
        let index = self.code_index;
        self.rows.sort_by(|a, b| {
            let a = a.get(index).unwrap_or("").trim();
            let b = b.get(index).unwrap_or("").trim();
            a.cmp(b)
        });
        self
    }

    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::from_writer(out);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        self.write_to(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "Organization Code,Department Name\n\
                         B20,Chemistry\n\
                         A10,Libraries\n\
                         B20,Chemistry Annex\n";

    fn sheet() -> OrgCodeTable {
        OrgCodeTable::from_reader(SHEET.as_bytes(), "Organization Code").unwrap()
    }

    fn counts(total: usize) -> OrgCounts {
        OrgCounts {
            total,
            ..OrgCounts::default()
        }
    }

    #[test]
    fn reads_codes_in_input_order() {
        let table = sheet();
        assert_eq!(table.len(), 3);
        assert_eq!(table.org_codes(), vec!["B20", "A10", "B20"]);
    }

    #[test]
    fn missing_code_column_is_an_error() {
        let err = OrgCodeTable::from_reader("Code,Name\nA,B\n".as_bytes(), "Organization Code")
            .unwrap_err();
        assert!(err.to_string().contains("Organization Code"));
    }

    #[test]
    fn counts_must_match_row_count() {
        assert!(sheet().with_counts(&[counts(1)]).is_err());
    }

    #[test]
    fn sort_moves_counts_with_their_rows() {
        let table = sheet()
            .with_counts(&[counts(7), counts(3), counts(9)])
            .unwrap()
            .sorted_by_code();

        assert_eq!(table.headers().len(), 8);
        assert_eq!(&table.headers()[2], "total");

        let rows: Vec<(String, String, String)> = table
            .rows()
            .iter()
            .map(|r| (r[0].to_string(), r[1].to_string(), r[2].to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("A10".to_string(), "Libraries".to_string(), "3".to_string()),
                ("B20".to_string(), "Chemistry".to_string(), "7".to_string()),
                ("B20".to_string(), "Chemistry Annex".to_string(), "9".to_string()),
            ]
        );
    }

    #[test]
    fn sort_ignores_padding_around_codes() {
        let table = OrgCodeTable::from_reader(
            "Organization Code,Name\n B1,Padded\nA2,Plain\n".as_bytes(),
            "Organization Code",
        )
        .unwrap();
        assert_eq!(table.org_codes(), vec!["B1", "A2"]);

        let sorted = table.sorted_by_code();
        let names: Vec<&str> = sorted.rows().iter().map(|r| &r[1]).collect();
        assert_eq!(names, vec!["Plain", "Padded"]);
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        let once = sheet().sorted_by_code();
        let twice = once.clone().sorted_by_code();
        assert_eq!(once.rows(), twice.rows());
    }

    #[test]
    fn writes_header_and_rows_without_index() {
        let table = sheet()
            .with_counts(&[counts(1), counts(2), counts(3)])
            .unwrap()
            .sorted_by_code();

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Organization Code,Department Name,total,pgrps-tot,pgrps-faculty,pgrps-staff,pgrps-student,pgrps-dcc")
        );
        assert_eq!(lines.next(), Some("A10,Libraries,2,0,0,0,0,0"));
        assert_eq!(text.lines().count(), 4);
    }
}
