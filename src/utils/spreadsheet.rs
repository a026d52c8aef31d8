use anyhow::{Context as _, Result};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    /// Legacy BIFF workbook. Files saved as xlsx under an .xls name are common, so
    /// the xlsx reader is tried when the BIFF reader refuses the file.
    Xls,
}

/// First worksheet rendered column by column: `"<header>: v1 v2 ...\n"`.
pub fn workbook_text(data: &[u8], format: SheetFormat) -> Result<String> {
    let range = match format {
        SheetFormat::Xlsx => first_sheet_xlsx(data)?,
        SheetFormat::Xls => match first_sheet_xls(data) {
            Ok(range) => range,
            Err(xls_err) => {
                tracing::debug!(error = %xls_err, "legacy xls reader failed, retrying as xlsx");
                first_sheet_xlsx(data)?
            }
        },
    };
    Ok(columns_text(&range))
}

fn first_sheet_xlsx(data: &[u8]) -> Result<Range<Data>> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(data)).context("could not open xlsx workbook")?;
    workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("could not read first worksheet")
}

fn first_sheet_xls(data: &[u8]) -> Result<Range<Data>> {
    let mut workbook: Xls<_> =
        open_workbook_from_rs(Cursor::new(data)).context("could not open xls workbook")?;
    workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("could not read first worksheet")
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn columns_text(range: &Range<Data>) -> String {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return String::new();
    };
    let body: Vec<&[Data]> = rows.collect();

    let mut out = String::new();
    for (col, head) in header.iter().enumerate() {
        let name = if is_blank(head) {
            format!("Unnamed: {}", col)
        } else {
            head.to_string()
        };
        let values: Vec<String> = body
            .iter()
            .filter_map(|row| row.get(col))
            .filter(|cell| !is_blank(cell))
            .map(|cell| cell.to_string())
            .collect();

        out.push_str(&name);
        out.push_str(": ");
        out.push_str(&values.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sample_xlsx() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Element").unwrap();
        sheet.write_string(0, 1, "Atomic number").unwrap();
        sheet.write_string(1, 0, "Hydrogen").unwrap();
        sheet.write_number(1, 1, 1).unwrap();
        sheet.write_string(2, 0, "Helium").unwrap();
        sheet.write_string(3, 0, "Lithium").unwrap();
        sheet.write_number(3, 1, 3).unwrap();
        sheet.write_number(1, 3, 7).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn renders_columns_with_headers_and_skips_blanks() {
        let text = workbook_text(&sample_xlsx(), SheetFormat::Xlsx).unwrap();
        assert_eq!(
            text,
            "Element: Hydrogen Helium Lithium\nAtomic number: 1 3\nUnnamed: 2: \nUnnamed: 3: 7\n"
        );
    }

    #[test]
    fn xls_name_with_xlsx_content_falls_back() {
        let text = workbook_text(&sample_xlsx(), SheetFormat::Xls).unwrap();
        assert!(text.starts_with("Element: Hydrogen"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(workbook_text(b"not a workbook", SheetFormat::Xlsx).is_err());
        assert!(workbook_text(b"not a workbook", SheetFormat::Xls).is_err());
    }
}
