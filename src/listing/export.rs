use rust_xlsxwriter::{Format, Workbook};

use crate::error::{AppError, Result};
use crate::listing::{columns, SectorTable};

/// One worksheet per sector table, named after the sector, with the same
/// columns the listing shows.
pub fn build_workbook(tables: &[SectorTable]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for table in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(table.sector.as_str())?;

        for (col, title) in table.columns().iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *title, &header)?;
        }
        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.cells(table.show_listed_date).iter().enumerate() {
                worksheet.write_string(r, col as u16, cell)?;
            }
        }
        worksheet.autofit();
    }

    if tables.is_empty() {
        // A workbook needs at least one sheet.
        workbook.add_worksheet().set_name("Stocks")?;
    }
    Ok(workbook)
}

pub fn to_xlsx_bytes(tables: &[SectorTable]) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(tables)?;
    Ok(workbook.save_to_buffer()?)
}

/// Flat CSV of every table: a leading `Sector` column, then the full column
/// set; date cells are blank for sectors that do not track them.
pub fn to_csv_bytes(tables: &[SectorTable]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Sector"];
    header.extend(columns(true));
    writer.write_record(&header)?;

    for table in tables {
        for row in &table.rows {
            let mut record = vec![table.sector.to_string()];
            if table.show_listed_date {
                record.extend(row.cells(true));
            } else {
                let mut cells = row.cells(false);
                // Re-insert blank date cells after Id, S.N., Name.
                cells.splice(3..3, [String::new(), String::new()]);
                record.extend(cells);
            }
            writer.write_record(&record)?;
        }
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}
