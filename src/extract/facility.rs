use std::io::Cursor;
use std::sync::LazyLock;

use calamine::{DataType, Reader, Xlsx};
use scraper::{Html, Selector};

use super::{resolve_href, selector};
use crate::error::ExtractionError;
use crate::model::Facility;

/// Rows whose region cell starts with this carry the sheet's as-of date.
const STALE_STAMP_PREFIX: &str = "Stand";

static DOWNLOAD_LINK: LazyLock<Selector> = LazyLock::new(|| {
    selector("ul > li > a.c-link.c-link--download.c-link--desc.c-link--orient")
});

/// Spreadsheet download links on a state's test-centre page.
pub fn download_links(
    html: &str,
    bamf_base: &str,
    page_url: &str,
) -> Result<Vec<String>, ExtractionError> {
    let doc = Html::parse_document(html);
    doc.select(&DOWNLOAD_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| resolve_href(bamf_base, page_url, href))
        .collect()
}

/// Every sheet of an xlsx workbook as rows of rendered cells. Blank rows are
/// skipped, so index 0 of each sheet is its header.
pub fn read_workbook(bytes: &[u8], url: &str) -> Result<Vec<Vec<Vec<String>>>, ExtractionError> {
    let spreadsheet_err = |reason: String| ExtractionError::Spreadsheet {
        url: url.to_string(),
        reason,
    };

    let mut workbook =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| spreadsheet_err(e.to_string()))?;

    let mut sheets = Vec::new();
    for (_, range) in workbook.worksheets() {
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(render_cell).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .collect();
        sheets.push(rows);
    }
    Ok(sheets)
}

fn render_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        DataType::Float(v) => format!("{v}"),
        DataType::Int(v) => format!("{v}"),
        DataType::Bool(b) => b.to_string(),
        DataType::Error(e) => format!("#{e:?}"),
        DataType::Empty => String::new(),
        DataType::DateTime(v) => format!("{v}"),
        DataType::DateTimeIso(s) => s.clone(),
        DataType::Duration(v) => format!("{v}"),
        DataType::DurationIso(s) => s.clone(),
    }
}

/// Map one sheet's data rows (header at index 0 is skipped) to records.
///
/// Columns: region, sub-region, postal code, city, institution, street,
/// phone, email. The first two form the region label.
pub fn sheet_to_facilities(rows: &[Vec<String>]) -> Vec<Facility> {
    rows.iter()
        .skip(1)
        .map(|row| {
            let cell = |i: usize| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
            let region = [cell(0), cell(1)]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Facility {
                region,
                postal_code: cell(2),
                city: cell(3),
                institution: cell(4),
                street: cell(5),
                phone: cell(6),
                email: cell(7),
            }
        })
        .collect()
}

/// Drop as-of stamps and rows without an institution, then the leading
/// boilerplate row that survives those filters.
pub fn filter_facilities(facilities: Vec<Facility>) -> Vec<Facility> {
    facilities
        .into_iter()
        .filter(|f| !f.region.starts_with(STALE_STAMP_PREFIX))
        .filter(|f| !f.institution.is_empty())
        .skip(1)
        .collect()
}

/// Minimal single-sheet xlsx with shared strings; empty strings leave the
/// cell out.
#[cfg(test)]
pub(crate) fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    let mut strings: Vec<&str> = Vec::new();
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, text) in row.iter().enumerate().filter(|(_, t)| !t.is_empty()) {
            let column = char::from(b'A' + c as u8);
            sheet_rows.push_str(&format!(
                r#"<c r="{column}{}" t="s"><v>{}</v></c>"#,
                r + 1,
                strings.len()
            ));
            strings.push(text);
        }
        sheet_rows.push_str("</row>");
    }
    let shared: String = strings
        .iter()
        .map(|s| format!("<si><t>{}</t></si>", s.replace('&', "&amp;").replace('<', "&lt;")))
        .collect();

    let files = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#),
        ),
        (
            "xl/workbook.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="Prüfstellen" sheetId="1" r:id="rId1"/></sheets></workbook>"#),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#),
        ),
        (
            "xl/sharedStrings.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{MAIN_NS}" count="{n}" uniqueCount="{n}">{shared}</sst>"#, n = strings.len()),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>{sheet_rows}</sheetData></worksheet>"#),
        ),
    ];

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in files {
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
