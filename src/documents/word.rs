// Word (.docx) text extraction

use docx_rust::document::{BodyContent, TableCell, TableCellContent, TableRowContent, SDT};
use docx_rust::DocxFile;
use std::path::Path;
use tracing::debug;

/// Extract the text of every paragraph, one paragraph per line. Hyperlinks,
/// content controls and table cells are included in document order.
pub fn extract_text(path: &Path) -> Result<String, String> {
    debug!(path = %path.display(), "Extracting Word document text");

    let file = DocxFile::from_file(path).map_err(|e| format!("{:?}", e))?;
    let docx = file.parse().map_err(|e| format!("{:?}", e))?;

    let mut lines = Vec::new();
    collect_body(&docx.document.body.content, &mut lines);

    let mut text = lines.join("\n");
    if !lines.is_empty() {
        text.push('\n');
    }
    Ok(text)
}

fn collect_body(content: &[BodyContent<'_>], lines: &mut Vec<String>) {
    for item in content {
        match item {
            BodyContent::Paragraph(paragraph) => lines.push(paragraph.text()),
            BodyContent::Table(table) => {
                for row in &table.rows {
                    for cell in &row.cells {
                        match cell {
                            TableRowContent::TableCell(cell) => collect_cell(cell, lines),
                            TableRowContent::SDT(sdt) => collect_sdt(sdt, lines),
                        }
                    }
                }
            }
            BodyContent::Sdt(sdt) => collect_sdt(sdt, lines),
            BodyContent::TableCell(cell) => collect_cell(cell, lines),
            BodyContent::Run(run) => lines.push(run.iter_text().map(|t| t.to_string()).collect()),
            BodyContent::SectionProperty(_) => {}
        }
    }
}

fn collect_cell(cell: &TableCell<'_>, lines: &mut Vec<String>) {
    for content in &cell.content {
        let TableCellContent::Paragraph(paragraph) = content;
        lines.push(paragraph.text());
    }
}

fn collect_sdt(sdt: &SDT<'_>, lines: &mut Vec<String>) {
    if let Some(content) = &sdt.content {
        collect_body(&content.content, lines);
    }
}
