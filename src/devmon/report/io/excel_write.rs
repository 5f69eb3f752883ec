use std::path::Path;

use rust_xlsxwriter::{Table, Workbook, Worksheet};
use tracing::{debug, instrument};

use crate::devmon::report::error::Result;
use crate::devmon::report::flatten::{SheetTable, WorkbookData};

/// Writes the report tables to `path`, one sheet per table, header in row 1.
/// Cells are written as strings so the sheets match the CSV files exactly.
#[instrument(level = "debug", skip(workbook), fields(path = %path.display()))]
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in workbook.tables() {
        let worksheet = workbook_writer.add_worksheet();
        write_sheet(worksheet, table)?;
        debug!(sheet = %table.sheet_name, rows = table.rows.len(), "sheet written");
    }

    workbook_writer.save(path)?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, table: &SheetTable) -> Result<()> {
    worksheet.set_name(&table.sheet_name)?;

    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                worksheet.write_string((row_idx + 1) as u32, col_idx as u16, cell)?;
            }
        }
    }

    // Excel tables need a header plus at least one data row.
    if !table.rows.is_empty() && !table.columns.is_empty() {
        let mut excel_table = Table::new();
        excel_table.set_autofilter(true);
        let col_end = (table.columns.len() as u16).saturating_sub(1);
        worksheet.add_table(0, 0, table.rows.len() as u32, col_end, &excel_table)?;
    }

    Ok(())
}
