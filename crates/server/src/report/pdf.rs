//! Printable report (A4 PDF).
//!
//! Rendering is split in two: [`layout`] places every row on a page with a
//! vertical offset, and [`render`] draws the placed rows with `printpdf`.
//! Offsets are millimetres from the top edge; `printpdf` measures from the
//! bottom, so the conversion happens only while drawing.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Point};

use super::{ReportContext, ReportError, ReportRow, format_date};
use crate::models::Batch;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LEFT_MARGIN_MM: f32 = 15.0;
const CELL_PADDING_MM: f32 = 1.5;

/// First usable offset below the page header.
const BODY_TOP_MM: f32 = 40.0;
/// A detail row starting below this offset moves to a fresh page.
const PAGE_BREAK_THRESHOLD_MM: f32 = 250.0;
/// Nothing may extend past this offset (bottom margin).
const BODY_BOTTOM_MM: f32 = 277.0;

const SECTION_TITLE_HEIGHT_MM: f32 = 15.0;
const HEADER_ROW_HEIGHT_MM: f32 = 8.0;
const DATA_ROW_HEIGHT_MM: f32 = 6.0;
const TOTAL_ROW_HEIGHT_MM: f32 = 8.0;
const SUBTOTAL_GAP_MM: f32 = 2.0;
const TOTAL_GAP_MM: f32 = 5.0;

const COLUMN_WIDTHS_MM: [f32; 6] = [25.0, 60.0, 25.0, 25.0, 20.0, 25.0];
const COLUMN_TITLES: [&str; 6] = [
    "Code",
    "Product Name",
    "Lot",
    "Expiry",
    "Qty",
    "Registered",
];
/// Index of the quantity column.
const QTY_COLUMN: usize = 4;
const BORDER_THICKNESS_PT: f32 = 0.5;
/// Product names longer than this are cut to fit their column.
const NAME_MAX_CHARS: usize = 25;

const DOCUMENT_TITLE: &str = "Inventory Report";
const SECTION_TITLE: &str = "Inventory Report - Detail by Lot";
const LAYER_NAME: &str = "Report";

/// A row as it will be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    SectionTitle,
    TableHeader,
    Detail([String; 6]),
    Subtotal { label: String, quantity: i64 },
    GrandTotal { label: String, quantity: i64 },
}

/// A line and the offset of its top edge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placed {
    pub top_mm: f32,
    pub line: Line,
}

/// Lines placed on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PageLayout {
    pub lines: Vec<Placed>,
}

struct Cursor {
    pages: Vec<PageLayout>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: BODY_TOP_MM,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = BODY_TOP_MM;
    }

    /// Start a new page if `height` does not fit above the bottom margin.
    fn ensure_room(&mut self, height: f32) {
        if self.y + height > BODY_BOTTOM_MM {
            self.new_page();
        }
    }

    fn place(&mut self, line: Line, height: f32) {
        let top_mm = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(Placed { top_mm, line });
        }
        self.y += height;
    }

    fn skip(&mut self, height: f32) {
        self.y += height;
    }
}

fn detail_cells(batch: &Batch) -> [String; 6] {
    [
        batch.code.clone(),
        batch.name.chars().take(NAME_MAX_CHARS).collect(),
        batch.lot.clone(),
        format_date(batch.expiry),
        batch.quantity.to_string(),
        format_date(batch.registered_at.date_naive()),
    ]
}

/// Place report rows on pages.
///
/// The first page opens with the section title and table header. Before
/// each detail row, a cursor past [`PAGE_BREAK_THRESHOLD_MM`] starts a new
/// page that repeats the table header. Subtotal and total rows only move
/// to a new page when they would cross the bottom margin.
pub(crate) fn layout(rows: &[ReportRow<'_>]) -> Vec<PageLayout> {
    let mut cursor = Cursor::new();
    cursor.place(Line::SectionTitle, SECTION_TITLE_HEIGHT_MM);
    cursor.place(Line::TableHeader, HEADER_ROW_HEIGHT_MM);

    for (index, row) in rows.iter().enumerate() {
        match row {
            ReportRow::Detail(batch) => {
                if cursor.y > PAGE_BREAK_THRESHOLD_MM {
                    cursor.new_page();
                    cursor.place(Line::TableHeader, HEADER_ROW_HEIGHT_MM);
                }
                cursor.place(Line::Detail(detail_cells(batch)), DATA_ROW_HEIGHT_MM);
            }
            ReportRow::Subtotal { quantity, .. } => {
                cursor.ensure_room(DATA_ROW_HEIGHT_MM);
                cursor.place(
                    Line::Subtotal {
                        label: row.label().unwrap_or_default(),
                        quantity: *quantity,
                    },
                    DATA_ROW_HEIGHT_MM,
                );
                if matches!(rows.get(index + 1), Some(ReportRow::Detail(_))) {
                    cursor.skip(SUBTOTAL_GAP_MM);
                }
            }
            ReportRow::GrandTotal { quantity } => {
                cursor.skip(TOTAL_GAP_MM);
                cursor.ensure_room(TOTAL_ROW_HEIGHT_MM);
                cursor.place(
                    Line::GrandTotal {
                        label: row.label().unwrap_or_default(),
                        quantity: *quantity,
                    },
                    TOTAL_ROW_HEIGHT_MM,
                );
            }
        }
    }

    cursor.pages
}

// =============================================================================
// Drawing
// =============================================================================

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

fn pdf_error(e: printpdf::Error) -> ReportError {
    ReportError::Pdf(e.to_string())
}

/// Convert a top offset and row height to a text baseline in PDF space.
fn baseline(top_mm: f32, height_mm: f32) -> Mm {
    Mm(PAGE_HEIGHT_MM - top_mm - height_mm * 0.7)
}

/// Approximate left edge that centres `text` on the page.
///
/// Helvetica averages roughly half an em per glyph.
#[allow(clippy::cast_precision_loss)]
fn centred_x(text: &str, font_size: f32) -> Mm {
    let em_mm = font_size * 0.3528;
    let width = text.chars().count() as f32 * em_mm * 0.5;
    Mm(((PAGE_WIDTH_MM - width) / 2.0).max(LEFT_MARGIN_MM))
}

fn column_x(column: usize) -> Mm {
    let offset: f32 = COLUMN_WIDTHS_MM.iter().take(column).sum();
    Mm(LEFT_MARGIN_MM + offset + CELL_PADDING_MM)
}

/// Bordered cells of a line as `(left, width)` pairs in millimetres.
///
/// Subtotal and total rows merge the first four columns into one label cell.
pub(crate) fn cell_spans(line: &Line) -> Vec<(f32, f32)> {
    let mut spans = Vec::with_capacity(COLUMN_WIDTHS_MM.len());
    let mut left = LEFT_MARGIN_MM;
    match line {
        Line::SectionTitle => {}
        Line::TableHeader | Line::Detail(_) => {
            for width in COLUMN_WIDTHS_MM {
                spans.push((left, width));
                left += width;
            }
        }
        Line::Subtotal { .. } | Line::GrandTotal { .. } => {
            let label_width: f32 = COLUMN_WIDTHS_MM.iter().take(QTY_COLUMN).sum();
            spans.push((left, label_width));
            left += label_width;
            for width in COLUMN_WIDTHS_MM.iter().skip(QTY_COLUMN) {
                spans.push((left, *width));
                left += width;
            }
        }
    }
    spans
}

fn draw_borders(layer: &PdfLayerReference, line: &Line, top: f32, height: f32) {
    let upper = Mm(PAGE_HEIGHT_MM - top);
    let lower = Mm(PAGE_HEIGHT_MM - top - height);
    for (left, width) in cell_spans(line) {
        let right = Mm(left + width);
        let left = Mm(left);
        layer.add_line(printpdf::Line {
            points: vec![
                (Point::new(left, upper), false),
                (Point::new(right, upper), false),
                (Point::new(right, lower), false),
                (Point::new(left, lower), false),
            ],
            is_closed: true,
        });
    }
}

fn draw_frame(layer: &PdfLayerReference, fonts: &Fonts, generated: &str, page_number: usize) {
    layer.use_text(
        DOCUMENT_TITLE,
        16.0,
        centred_x(DOCUMENT_TITLE, 16.0),
        baseline(10.0, 10.0),
        &fonts.bold,
    );
    layer.use_text(
        generated,
        10.0,
        centred_x(generated, 10.0),
        baseline(20.0, 10.0),
        &fonts.regular,
    );

    let footer = format!("Page {page_number}");
    layer.use_text(
        footer.as_str(),
        8.0,
        centred_x(&footer, 8.0),
        baseline(PAGE_HEIGHT_MM - 15.0, 10.0),
        &fonts.italic,
    );
}

fn draw_line(layer: &PdfLayerReference, fonts: &Fonts, placed: &Placed) {
    let top = placed.top_mm;
    draw_borders(layer, &placed.line, top, line_height(&placed.line));
    match &placed.line {
        Line::SectionTitle => {
            layer.use_text(
                SECTION_TITLE,
                14.0,
                Mm(LEFT_MARGIN_MM),
                baseline(top, 10.0),
                &fonts.bold,
            );
        }
        Line::TableHeader => {
            for (column, title) in COLUMN_TITLES.iter().enumerate() {
                layer.use_text(
                    *title,
                    10.0,
                    column_x(column),
                    baseline(top, HEADER_ROW_HEIGHT_MM),
                    &fonts.bold,
                );
            }
        }
        Line::Detail(cells) => {
            for (column, text) in cells.iter().enumerate() {
                layer.use_text(
                    text.as_str(),
                    8.0,
                    column_x(column),
                    baseline(top, DATA_ROW_HEIGHT_MM),
                    &fonts.regular,
                );
            }
        }
        Line::Subtotal { label, quantity } => {
            draw_total(layer, &fonts.bold, top, DATA_ROW_HEIGHT_MM, 8.0, label, *quantity);
        }
        Line::GrandTotal { label, quantity } => {
            draw_total(layer, &fonts.bold, top, TOTAL_ROW_HEIGHT_MM, 12.0, label, *quantity);
        }
    }
}

fn line_height(line: &Line) -> f32 {
    match line {
        Line::SectionTitle => SECTION_TITLE_HEIGHT_MM,
        Line::TableHeader => HEADER_ROW_HEIGHT_MM,
        Line::Detail(_) | Line::Subtotal { .. } => DATA_ROW_HEIGHT_MM,
        Line::GrandTotal { .. } => TOTAL_ROW_HEIGHT_MM,
    }
}

fn draw_total(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    top: f32,
    height: f32,
    font_size: f32,
    label: &str,
    quantity: i64,
) {
    // Label sits in the lot/expiry columns, just left of the quantity.
    layer.use_text(label, font_size, column_x(2), baseline(top, height), font);
    layer.use_text(
        quantity.to_string(),
        font_size,
        column_x(QTY_COLUMN),
        baseline(top, height),
        font,
    );
}

/// Render report rows into PDF bytes.
///
/// # Errors
///
/// Returns `ReportError::Pdf` if font registration or serialization fails.
pub fn render(rows: &[ReportRow<'_>], ctx: &ReportContext) -> Result<Vec<u8>, ReportError> {
    let pages = layout(rows);

    let (doc, first_page, first_layer) = PdfDocument::new(
        DOCUMENT_TITLE,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(pdf_error)?,
    };
    let generated = format!(
        "Generated at: {}",
        ctx.generated_at.format("%d/%m/%Y %H:%M")
    );

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            doc.get_page(page_index).get_layer(layer_index)
        };

        layer.set_outline_thickness(BORDER_THICKNESS_PT);
        draw_frame(&layer, &fonts, &generated, index + 1);
        for placed in &page.lines {
            draw_line(&layer, &fonts, placed);
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::grouped_rows;
    use crate::report::tests::{batch, context};

    fn detail_count(pages: &[PageLayout]) -> usize {
        pages
            .iter()
            .flat_map(|p| &p.lines)
            .filter(|l| matches!(l.line, Line::Detail(_)))
            .count()
    }

    #[test]
    fn test_single_page_layout() {
        let batches = vec![batch(1, "A1", "L1", 5), batch(2, "B2", "L1", 6)];
        let pages = layout(&grouped_rows(&batches));

        assert_eq!(pages.len(), 1);
        let kinds: Vec<&Line> = pages[0].lines.iter().map(|p| &p.line).collect();
        assert_eq!(kinds[0], &Line::SectionTitle);
        assert_eq!(kinds[1], &Line::TableHeader);
        assert!(matches!(kinds.last().unwrap(), Line::GrandTotal { quantity: 11, .. }));
        assert_eq!(detail_count(&pages), 2);
    }

    #[test]
    fn test_long_report_repeats_table_header() {
        let batches: Vec<Batch> = (0..120)
            .map(|i| batch(i, &format!("C{:03}", i / 10), &format!("L{i}"), 1))
            .collect();
        let pages = layout(&grouped_rows(&batches));

        assert!(pages.len() > 2);
        for page in pages.iter().skip(1) {
            let first = &page.lines[0];
            assert!(
                matches!(first.line, Line::TableHeader | Line::Subtotal { .. } | Line::GrandTotal { .. }),
                "unexpected first line {first:?}"
            );
        }
        assert_eq!(detail_count(&pages), 120);
    }

    #[test]
    fn test_no_line_crosses_bottom_margin() {
        let batches: Vec<Batch> = (0..300)
            .map(|i| batch(i, &format!("C{:03}", i / 4), &format!("L{i}"), 2))
            .collect();
        for page in layout(&grouped_rows(&batches)) {
            for placed in &page.lines {
                assert!(placed.top_mm >= BODY_TOP_MM);
                assert!(placed.top_mm + line_height(&placed.line) <= BODY_BOTTOM_MM);
            }
        }
    }

    #[test]
    fn test_detail_name_is_truncated() {
        let mut long = batch(1, "A1", "L1", 1);
        long.name = "N".repeat(60);
        let cells = detail_cells(&long);
        assert_eq!(cells[1].chars().count(), NAME_MAX_CHARS);
        assert_eq!(cells[3], "15/01/2027");
        assert_eq!(cells[5], "19/10/2026");
    }

    #[test]
    fn test_subtotal_labels_carry_code() {
        let batches = vec![batch(1, "A1", "L1", 5)];
        let pages = layout(&grouped_rows(&batches));
        assert!(pages[0].lines.iter().any(|p| p.line
            == Line::Subtotal {
                label: "Subtotal A1:".to_string(),
                quantity: 5
            }));
    }

    #[test]
    fn test_table_rows_are_boxed_in_a_grid() {
        let table_width: f32 = COLUMN_WIDTHS_MM.iter().sum();
        let detail = Line::Detail(detail_cells(&batch(1, "A1", "L1", 1)));
        let subtotal = Line::Subtotal {
            label: "Subtotal A1:".to_string(),
            quantity: 1,
        };

        for line in [Line::TableHeader, detail, subtotal] {
            let spans = cell_spans(&line);
            let (first_left, _) = spans[0];
            let (last_left, last_width) = spans[spans.len() - 1];
            assert!((first_left - LEFT_MARGIN_MM).abs() < f32::EPSILON);
            assert!((last_left + last_width - LEFT_MARGIN_MM - table_width).abs() < 0.01);
            for pair in spans.windows(2) {
                assert!((pair[0].0 + pair[0].1 - pair[1].0).abs() < 0.01);
            }
        }

        assert_eq!(cell_spans(&Line::TableHeader).len(), 6);
        let total = cell_spans(&Line::GrandTotal {
            label: "TOTAL GERAL:".to_string(),
            quantity: 1,
        });
        assert_eq!(total.len(), 3);
        assert!((total[0].1 - 135.0).abs() < f32::EPSILON);
        assert!(cell_spans(&Line::SectionTitle).is_empty());
    }

    #[test]
    fn test_render_produces_pdf() {
        let batches = vec![batch(1, "A1", "L1", 5), batch(2, "A1", "L2", 6)];
        let bytes = render(&grouped_rows(&batches), &context()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
