use crate::core::locator::parse_selector;
use crate::domain::model::{
    ExtractedRecord, RawRow, RowKind, CATEGORY_COLUMN, CLASSIFICATION_COLUMN, TOTAL_LABEL,
};
use crate::domain::schema::HierarchyMarkers;
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Selector};
use std::collections::HashSet;

/// Classification carried from the most recent category row.
///
/// The pages encode a two level outline (category, sub-item) with cell
/// classes rather than nesting, so resolving a row's classification needs
/// exactly this one piece of state, threaded through the rows in document
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyState {
    current: Option<String>,
}

impl HierarchyState {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Resolves the classification of `row` and returns the state for the
    /// next row. `index` is the 1-based position of the row in the table
    /// and is only used for error reporting.
    pub fn step(&self, row: &RawRow, index: usize) -> Result<(HierarchyState, String)> {
        let label = row.cells.first().cloned().unwrap_or_default();
        match row.kind {
            RowKind::Total => Ok((self.clone(), TOTAL_LABEL.to_string())),
            RowKind::Category => Ok((
                HierarchyState {
                    current: Some(label.clone()),
                },
                label,
            )),
            RowKind::SubItem => match &self.current {
                Some(current) => Ok((self.clone(), current.clone())),
                None => Err(EtlError::OrphanSubItem { row: index, label }),
            },
            RowKind::Plain => Ok((self.clone(), String::new())),
        }
    }
}

/// Walks a located table and rebuilds the category / sub-item hierarchy.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    header: Selector,
    row: Selector,
    cell: Selector,
    footer: Selector,
    markers: HierarchyMarkers,
}

impl TableExtractor {
    pub fn new(markers: &HierarchyMarkers) -> Result<Self> {
        Ok(Self {
            header: parse_selector("th")?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
            footer: parse_selector(&markers.footer)?,
            markers: markers.clone(),
        })
    }

    pub fn header_cells(&self, table: ElementRef<'_>) -> Vec<String> {
        table.select(&self.header).map(cell_text).collect()
    }

    /// Rows after the header row, tagged with the kind their markup implies.
    /// Rows without any `td` are skipped.
    pub fn raw_rows<'a>(&'a self, table: ElementRef<'a>) -> impl Iterator<Item = RawRow> + 'a {
        let footer_rows: HashSet<_> = table
            .select(&self.footer)
            .next()
            .map(|footer| footer.select(&self.row).map(|row| row.id()).collect())
            .unwrap_or_default();

        table.select(&self.row).skip(1).filter_map(move |row| {
            let cells: Vec<ElementRef<'a>> = row.select(&self.cell).collect();
            let first = match cells.first() {
                Some(first) => *first,
                None => {
                    tracing::debug!("Skipping table row without data cells");
                    return None;
                }
            };

            let kind = if footer_rows.contains(&row.id()) {
                RowKind::Total
            } else if has_class(first, &self.markers.category_class) {
                RowKind::Category
            } else if has_class(first, &self.markers.sub_item_class) {
                RowKind::SubItem
            } else {
                RowKind::Plain
            };

            Some(RawRow {
                kind,
                cells: cells.into_iter().map(cell_text).collect(),
            })
        })
    }

    /// Starts a fresh extraction over `table`. Each call re-reads the table,
    /// so the returned sequence can be restarted by calling this again.
    pub fn extract<'a>(&'a self, table: ElementRef<'a>, category: Option<&'a str>) -> Extraction<'a> {
        let headers = self.header_cells(table);
        let width = headers.len();

        let mut columns = headers;
        columns.push(CLASSIFICATION_COLUMN.to_string());
        if category.is_some() {
            columns.push(CATEGORY_COLUMN.to_string());
        }

        Extraction {
            columns,
            width,
            category,
            rows: Box::new(self.raw_rows(table)),
            state: HierarchyState::default(),
            index: 0,
            done: false,
        }
    }
}

/// Lazy sequence of [`ExtractedRecord`]s for one table. Stops after the
/// first error.
pub struct Extraction<'a> {
    columns: Vec<String>,
    width: usize,
    category: Option<&'a str>,
    rows: Box<dyn Iterator<Item = RawRow> + 'a>,
    state: HierarchyState,
    index: usize,
    done: bool,
}

impl<'a> Extraction<'a> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl<'a> Iterator for Extraction<'a> {
    type Item = Result<ExtractedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let row = self.rows.next()?;
        self.index += 1;

        let (state, classification) = match self.state.step(&row, self.index) {
            Ok(step) => step,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        self.state = state;

        let mut cells = row.cells;
        if cells.len() > self.width {
            tracing::debug!(
                "Row {} has {} cells for {} header columns, dropping the surplus",
                self.index,
                cells.len(),
                self.width
            );
        }
        cells.resize(self.width, String::new());
        cells.push(classification);
        if let Some(category) = self.category {
            cells.push(category.to_string());
        }

        Some(Ok(ExtractedRecord {
            kind: row.kind,
            cells,
        }))
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn has_class(cell: ElementRef<'_>, class: &str) -> bool {
    cell.value().classes().any(|c| c == class)
}
