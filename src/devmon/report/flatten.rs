use crate::devmon::report::consolidate::Consolidation;
use crate::devmon::report::model::{PersonRecord, RAW_COLUMNS, consolidated_columns};

/// Sheet holding one row per raw person record.
pub const RAW_SHEET: &str = "Raw";
/// Sheet holding one row per unique email.
pub const CONSOLIDATED_SHEET: &str = "Consolidated";

/// A table that will be materialised as a CSV file and an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Both report tables, in sheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub raw: SheetTable,
    pub consolidated: SheetTable,
}

impl WorkbookData {
    pub fn tables(&self) -> [&SheetTable; 2] {
        [&self.raw, &self.consolidated]
    }
}

/// Flattens raw rows into the `Raw` table.
pub fn build_raw_table(raw: &[PersonRecord]) -> SheetTable {
    SheetTable {
        sheet_name: RAW_SHEET.to_string(),
        columns: RAW_COLUMNS.iter().map(|column| column.to_string()).collect(),
        rows: raw.iter().map(PersonRecord::cells).collect(),
    }
}

/// Flattens consolidated rows into the `Consolidated` table. Every row has a
/// cell for every column.
pub fn build_consolidated_table(consolidation: &Consolidation) -> SheetTable {
    let order = &consolidation.workspace_order;
    SheetTable {
        sheet_name: CONSOLIDATED_SHEET.to_string(),
        columns: consolidated_columns(order),
        rows: consolidation
            .records
            .iter()
            .map(|record| record.cells(order))
            .collect(),
    }
}

pub fn build_workbook(raw: &[PersonRecord], consolidation: &Consolidation) -> WorkbookData {
    WorkbookData {
        raw: build_raw_table(raw),
        consolidated: build_consolidated_table(consolidation),
    }
}
