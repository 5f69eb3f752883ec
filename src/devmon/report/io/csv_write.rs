use std::path::Path;

use tracing::{debug, instrument};

use crate::devmon::report::error::Result;
use crate::devmon::report::flatten::SheetTable;

/// Writes `table` as CSV. The header row is always present, so an empty
/// table still produces a usable file.
#[instrument(level = "debug", skip(table), fields(path = %path.display(), sheet = %table.sheet_name))]
pub fn write_table(path: &Path, table: &SheetTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    debug!(rows = table.rows.len(), "csv written");
    Ok(())
}
