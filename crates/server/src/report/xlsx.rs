//! Spreadsheet report (XLSX workbook).

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use super::{ReportRow, format_date, format_timestamp};
use crate::models::CodeSummary;

/// Name of the per-code totals sheet.
pub const SUMMARY_SHEET: &str = "Summary by Code";

/// Name of the per-batch sheet.
pub const DETAIL_SHEET: &str = "Detail by Batch";

const DETAIL_TITLE: &str = "Inventory Report - Detail by Lot";
const HEADER_FILL: u32 = 0x0036_6092;

const SUMMARY_COLUMNS: [(&str, f64); 4] = [
    ("Code", 15.0),
    ("Product Name", 40.0),
    ("Total Quantity", 18.0),
    ("Total Lots", 15.0),
];

const DETAIL_COLUMNS: [(&str, f64); 6] = [
    ("Code", 15.0),
    ("Product Name", 40.0),
    ("Lot", 15.0),
    ("Expiry", 12.0),
    ("Quantity", 12.0),
    ("Registered", 18.0),
];

/// Row index of the detail sheet's column headers.
const DETAIL_HEADER_ROW: u32 = 2;
/// Column holding quantities on the detail sheet.
const DETAIL_QTY_COLUMN: u16 = 4;
/// Last column a subtotal or total label spans.
const LABEL_LAST_COLUMN: u16 = 3;

const SUBTOTAL_SPACER_HEIGHT: f64 = 5.0;
const TOTAL_SPACER_HEIGHT: f64 = 10.0;

struct Formats {
    header: Format,
    title: Format,
    bold: Format,
    total: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_align(FormatAlign::Center)
                .set_border(FormatBorder::Thin),
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center),
            bold: Format::new().set_bold(),
            total: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_align(FormatAlign::Right),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_cell(value: i64) -> f64 {
    value as f64
}

fn write_summary(
    sheet: &mut Worksheet,
    formats: &Formats,
    summary: &[CodeSummary],
) -> Result<(), XlsxError> {
    sheet.set_name(SUMMARY_SHEET)?;

    for (col, (title, width)) in (0u16..).zip(SUMMARY_COLUMNS) {
        sheet.write_string_with_format(0, col, title, &formats.header)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, group) in (1u32..).zip(summary) {
        sheet.write_string(row, 0, &group.code)?;
        sheet.write_string(row, 1, &group.name)?;
        sheet.write_number(row, 2, as_cell(group.total_quantity))?;
        sheet.write_number(row, 3, as_cell(group.batch_count))?;
    }

    Ok(())
}

fn write_detail(
    sheet: &mut Worksheet,
    formats: &Formats,
    rows: &[ReportRow<'_>],
) -> Result<(), XlsxError> {
    sheet.set_name(DETAIL_SHEET)?;

    let last_column = u16::try_from(DETAIL_COLUMNS.len() - 1).unwrap_or(u16::MAX);
    sheet.merge_range(0, 0, 0, last_column, DETAIL_TITLE, &formats.title)?;

    for (col, (title, width)) in (0u16..).zip(DETAIL_COLUMNS) {
        sheet.write_string_with_format(DETAIL_HEADER_ROW, col, title, &formats.header)?;
        sheet.set_column_width(col, width)?;
    }

    let mut row = DETAIL_HEADER_ROW + 1;
    for (index, item) in rows.iter().enumerate() {
        match item {
            ReportRow::Detail(batch) => {
                sheet.write_string(row, 0, &batch.code)?;
                sheet.write_string(row, 1, &batch.name)?;
                sheet.write_string(row, 2, &batch.lot)?;
                sheet.write_string(row, 3, format_date(batch.expiry))?;
                sheet.write_number(row, DETAIL_QTY_COLUMN, batch.quantity)?;
                sheet.write_string(row, 5, format_timestamp(batch.registered_at))?;
                row += 1;
            }
            ReportRow::Subtotal { quantity, .. } => {
                let label = item.label().unwrap_or_default();
                sheet.merge_range(row, 0, row, LABEL_LAST_COLUMN, &label, &formats.bold)?;
                sheet.write_number_with_format(
                    row,
                    DETAIL_QTY_COLUMN,
                    as_cell(*quantity),
                    &formats.bold,
                )?;
                row += 1;

                if matches!(rows.get(index + 1), Some(ReportRow::Detail(_))) {
                    sheet.set_row_height(row, SUBTOTAL_SPACER_HEIGHT)?;
                    row += 1;
                }
            }
            ReportRow::GrandTotal { quantity } => {
                sheet.set_row_height(row, TOTAL_SPACER_HEIGHT)?;
                row += 1;

                let label = item.label().unwrap_or_default();
                sheet.merge_range(row, 0, row, LABEL_LAST_COLUMN, &label, &formats.total)?;
                sheet.write_number_with_format(
                    row,
                    DETAIL_QTY_COLUMN,
                    as_cell(*quantity),
                    &formats.total,
                )?;
                row += 1;
            }
        }
    }

    Ok(())
}

/// Render the summary and detail sheets into XLSX bytes.
///
/// # Errors
///
/// Returns `XlsxError` if a cell cannot be written or the workbook cannot
/// be serialized.
pub fn render(summary: &[CodeSummary], rows: &[ReportRow<'_>]) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();

    write_summary(workbook.add_worksheet(), &formats, summary)?;
    write_detail(workbook.add_worksheet(), &formats, rows)?;

    workbook.save_to_buffer()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;
    use crate::report::grouped_rows;
    use crate::report::tests::batch;

    fn summary_of(code: &str, total: i64, count: i64) -> CodeSummary {
        CodeSummary {
            code: code.to_string(),
            name: format!("Product {code}"),
            total_quantity: total,
            batch_count: count,
        }
    }

    /// Read one part of the rendered workbook as text.
    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    /// The XML of one cell, e.g. `cell(&sheet, "E11")`.
    fn cell<'a>(sheet: &'a str, reference: &str) -> &'a str {
        let start = sheet.find(&format!("<c r=\"{reference}\"")).unwrap();
        let len = sheet[start..].find("</c>").unwrap();
        &sheet[start..start + len]
    }

    /// The opening tag of one row, 1-based as in the sheet XML.
    fn row_tag(sheet: &str, number: u32) -> &str {
        let start = sheet.find(&format!("<row r=\"{number}\"")).unwrap();
        let len = sheet[start..].find('>').unwrap();
        &sheet[start..start + len]
    }

    fn sample() -> Vec<u8> {
        let batches = vec![
            batch(1, "A1", "L1", 15),
            batch(2, "A1", "L2", 3),
            batch(3, "B2", "L1", 7),
        ];
        let summary = vec![summary_of("A1", 18, 2), summary_of("B2", 7, 1)];
        render(&summary, &grouped_rows(&batches)).unwrap()
    }

    #[test]
    fn test_render_produces_zip_container() {
        let bytes = sample();
        assert!(bytes.starts_with(b"PK"));

        let workbook = part(&bytes, "xl/workbook.xml");
        let summary_at = workbook.find(&format!("name=\"{SUMMARY_SHEET}\"")).unwrap();
        let detail_at = workbook.find(&format!("name=\"{DETAIL_SHEET}\"")).unwrap();
        assert!(summary_at < detail_at);

        let strings = part(&bytes, "xl/sharedStrings.xml");
        for text in [DETAIL_TITLE, "Total Lots", "Subtotal A1:", "Subtotal B2:", "TOTAL GERAL:"] {
            assert!(strings.contains(text), "missing `{text}`");
        }
    }

    #[test]
    fn test_summary_sheet_totals() {
        let sheet = part(&sample(), "xl/worksheets/sheet1.xml");
        assert!(cell(&sheet, "C2").contains("<v>18</v>"));
        assert!(cell(&sheet, "D2").contains("<v>2</v>"));
        assert!(cell(&sheet, "C3").contains("<v>7</v>"));
    }

    #[test]
    fn test_detail_sheet_layout() {
        let sheet = part(&sample(), "xl/worksheets/sheet2.xml");

        // Title, two A1 details, subtotal, spacer, B2 detail, subtotal,
        // spacer, grand total.
        for range in ["A1:F1", "A6:D6", "A9:D9", "A11:D11"] {
            assert!(sheet.contains(&format!("<mergeCell ref=\"{range}\"/>")), "{range}");
        }
        assert!(cell(&sheet, "E6").contains("<v>18</v>"));
        assert!(row_tag(&sheet, 7).contains("ht=\"5\""));
        assert!(cell(&sheet, "E9").contains("<v>7</v>"));
        assert!(row_tag(&sheet, 10).contains("ht=\"10\""));
        assert!(cell(&sheet, "E11").contains("<v>25</v>"));
        assert!(cell(&sheet, "E11").contains(" s=\""));
    }

    #[test]
    fn test_total_row_is_right_aligned() {
        let styles = part(&sample(), "xl/styles.xml");
        assert!(styles.contains("horizontal=\"right\""));
    }

    #[test]
    fn test_render_empty_workbook() {
        let bytes = render(&[], &grouped_rows(&[])).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_render_large_quantities() {
        let batches = vec![batch(1, "A1", "L1", i32::MAX), batch(2, "A1", "L2", i32::MAX)];
        let summary = vec![summary_of("A1", 2 * i64::from(i32::MAX), 2)];
        assert!(render(&summary, &grouped_rows(&batches)).is_ok());
    }
}
