use crate::domain::model::{Dataset, ExtractedRecord, Record, ScrapeTarget, YEAR_COLUMN};
use crate::utils::error::Result;
use serde_json::Value;

/// Merges per-(year, category) extractions into one dataset, in the order
/// the fetches were made. Nothing is deduplicated.
#[derive(Debug, Default)]
pub struct DatasetAccumulator {
    dataset: Dataset,
}

impl DatasetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every record of one extraction, stamped with the target's
    /// year. Returns the number of records appended.
    pub fn append<I>(&mut self, target: &ScrapeTarget, columns: &[String], records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<ExtractedRecord>>,
    {
        let mut stamped_columns = columns.to_vec();
        stamped_columns.push(YEAR_COLUMN.to_string());

        let mut appended = 0;
        for record in records {
            let record = record?;
            let mut data: std::collections::HashMap<String, Value> = columns
                .iter()
                .cloned()
                .zip(record.cells.into_iter().map(Value::String))
                .collect();
            data.insert(YEAR_COLUMN.to_string(), Value::from(target.year));

            self.dataset.append(&stamped_columns, Record { data });
            appended += 1;
        }
        Ok(appended)
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Category, RowKind};
    use crate::utils::error::EtlError;

    fn record(cells: &[&str]) -> Result<ExtractedRecord> {
        Ok(ExtractedRecord {
            kind: RowKind::Plain,
            cells: cells.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn columns() -> Vec<String> {
        vec!["Países".to_string(), "Classificação".to_string()]
    }

    #[test]
    fn test_years_are_stamped_in_fetch_order() {
        let mut acc = DatasetAccumulator::new();
        acc.append(&ScrapeTarget::new(2020, None), &columns(), vec![record(&["Chile", ""])])
            .unwrap();
        acc.append(
            &ScrapeTarget::new(2021, None),
            &columns(),
            vec![record(&["Chile", ""]), record(&["Peru", ""])],
        )
        .unwrap();

        let dataset = acc.into_dataset();
        let years: Vec<i64> = dataset.records().iter().filter_map(|r| r.get_i64("Ano")).collect();
        assert_eq!(years, vec![2020, 2021, 2021]);
        assert_eq!(dataset.records()[2].get_str("Países"), Some("Peru"));
        assert_eq!(dataset.columns().last().map(String::as_str), Some("Ano"));
    }

    #[test]
    fn test_repeated_targets_produce_duplicates() {
        let mut acc = DatasetAccumulator::new();
        let target = ScrapeTarget::new(2022, Some(Category::new("ESPUMANTES", "subopt_02")));
        acc.append(&target, &columns(), vec![record(&["Chile", ""])]).unwrap();
        acc.append(&target, &columns(), vec![record(&["Chile", ""])]).unwrap();
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_extraction_error_propagates() {
        let mut acc = DatasetAccumulator::new();
        let failing = vec![
            record(&["Chile", ""]),
            Err(EtlError::OrphanSubItem {
                row: 2,
                label: "x".to_string(),
            }),
        ];
        assert!(acc
            .append(&ScrapeTarget::new(2022, None), &columns(), failing)
            .is_err());
    }
}
