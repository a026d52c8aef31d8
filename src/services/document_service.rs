use crate::config::ToolPaths;
use crate::error::{Error, Result};
use crate::utils::ooxml;
use crate::utils::spreadsheet::{self, SheetFormat};
use crate::utils::text::trimmed_char_count;
use std::io::Write;
use std::path::PathBuf;
use tokio::process::Command;

pub const SUPPORTED_TYPES: &str = "PDF, DOC, DOCX, PPT, PPTX, XLS, XLSX, JPG, PNG";

/// OCR output shorter than this (after trimming) counts as "no text found".
pub const MIN_OCR_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word { legacy: bool },
    PowerPoint { legacy: bool },
    Spreadsheet(SheetFormat),
    Image,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Word { legacy: true }),
            "docx" => Some(Self::Word { legacy: false }),
            "ppt" => Some(Self::PowerPoint { legacy: true }),
            "pptx" => Some(Self::PowerPoint { legacy: false }),
            "xls" => Some(Self::Spreadsheet(SheetFormat::Xls)),
            "xlsx" => Some(Self::Spreadsheet(SheetFormat::Xlsx)),
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Lowercased text after the last `.`; the whole name when there is none.
pub fn file_extension(filename: &str) -> String {
    filename.rsplit('.').next().unwrap_or_default().to_lowercase()
}

#[derive(Clone)]
pub struct DocumentService {
    tools: ToolPaths,
}

impl DocumentService {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    pub async fn extract_text_from_document(&self, filename: &str, data: &[u8]) -> Result<String> {
        let ext = file_extension(filename);
        let kind = DocumentKind::from_extension(&ext).ok_or_else(|| {
            Error::BadRequest(format!(
                "Unsupported file type: {}. Supported types: {}",
                ext, SUPPORTED_TYPES
            ))
        })?;
        tracing::debug!(filename, ?kind, bytes = data.len(), "extracting document text");

        match kind {
            DocumentKind::Pdf => self.extract_pdf(data).await,
            DocumentKind::Word { legacy } => self.extract_word(data, legacy).await,
            DocumentKind::PowerPoint { legacy } => self.extract_powerpoint(data, legacy).await,
            DocumentKind::Spreadsheet(format) => extract_spreadsheet(data, format),
            DocumentKind::Image => self.extract_image(data, &ext).await,
        }
    }

    async fn extract_pdf(&self, data: &[u8]) -> Result<String> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::BadRequest("Invalid PDF file content".into()));
        }
        let fail = |e: anyhow::Error| {
            Error::BadRequest(format!("Failed to extract text from PDF: {:#}", e))
        };

        let input = write_temp_file(data, ".pdf").map_err(fail)?;
        let stdout = run_tool(
            Command::new(&self.tools.pdftotext)
                .arg("-layout")
                .arg(input.path())
                .arg("-"),
        )
        .await
        .map_err(fail)?;

        Ok(join_pdf_pages(&String::from_utf8_lossy(&stdout)))
    }

    async fn extract_word(&self, data: &[u8], legacy: bool) -> Result<String> {
        let fail = |e: anyhow::Error| {
            Error::BadRequest(format!("Failed to extract text from Word document: {:#}", e))
        };
        if legacy {
            let converted = self.convert_legacy(data, "doc", "docx").await.map_err(fail)?;
            ooxml::docx_text(&converted).map_err(fail)
        } else {
            ooxml::docx_text(data).map_err(fail)
        }
    }

    async fn extract_powerpoint(&self, data: &[u8], legacy: bool) -> Result<String> {
        let fail = |e: anyhow::Error| {
            Error::BadRequest(format!("Failed to extract text from PowerPoint: {:#}", e))
        };
        if legacy {
            let converted = self.convert_legacy(data, "ppt", "pptx").await.map_err(fail)?;
            ooxml::pptx_text(&converted).map_err(fail)
        } else {
            ooxml::pptx_text(data).map_err(fail)
        }
    }

    async fn extract_image(&self, data: &[u8], ext: &str) -> Result<String> {
        let magic_ok = match ext {
            "png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
            _ => data.starts_with(&[0xFF, 0xD8]),
        };
        if !magic_ok {
            let label = if ext == "png" { "PNG" } else { "JPEG" };
            return Err(Error::BadRequest(format!("Invalid {} file content", label)));
        }

        let input = write_temp_file(data, &format!(".{}", ext)).map_err(ocr_failure)?;
        let stdout = run_tool(
            Command::new(&self.tools.tesseract)
                .arg(input.path())
                .arg("stdout"),
        )
        .await
        .map_err(ocr_failure)?;

        let text = String::from_utf8_lossy(&stdout).into_owned();
        ensure_ocr_text(text)
    }

    /// Converts a legacy binary Office file with headless LibreOffice and returns the new bytes.
    async fn convert_legacy(&self, data: &[u8], from: &str, to: &str) -> anyhow::Result<Vec<u8>> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(format!("upload.{}", from));
        tokio::fs::write(&input, data).await?;

        run_tool(
            Command::new(&self.tools.libreoffice)
                .arg("--headless")
                .arg("--norestore")
                .arg("--convert-to")
                .arg(to)
                .arg("--outdir")
                .arg(workdir.path())
                .arg(&input),
        )
        .await?;

        let output: PathBuf = workdir.path().join(format!("upload.{}", to));
        let converted = tokio::fs::read(&output)
            .await
            .map_err(|e| anyhow::anyhow!("LibreOffice produced no {} output: {}", to, e))?;
        Ok(converted)
    }
}

fn extract_spreadsheet(data: &[u8], format: SheetFormat) -> Result<String> {
    spreadsheet::workbook_text(data, format)
        .map_err(|e| Error::BadRequest(format!("Failed to extract text from Excel: {:#}", e)))
}

fn ocr_failure(e: anyhow::Error) -> Error {
    Error::BadRequest(format!(
        "Failed to extract text from image using OCR: {:#}. Please ensure tesseract-ocr is installed on your system.",
        e
    ))
}

pub(crate) fn ensure_ocr_text(text: String) -> Result<String> {
    if trimmed_char_count(&text) < MIN_OCR_CHARS {
        return Err(Error::BadRequest(
            "Could not extract text from image. The image may not contain readable text or OCR failed."
                .into(),
        ));
    }
    Ok(text)
}

/// pdftotext separates pages with form feeds; pages are joined with newlines instead.
pub(crate) fn join_pdf_pages(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for page in raw.split('\u{c}') {
        if page.is_empty() {
            continue;
        }
        out.push_str(page);
        if !page.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn write_temp_file(data: &[u8], suffix: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("quizgen_upload_")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

async fn run_tool(command: &mut Command) -> anyhow::Result<Vec<u8>> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(program = %program, status = ?output.status, "external tool failed");
        anyhow::bail!("{} exited with {}: {}", program, output.status, stderr.trim());
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> DocumentService {
        DocumentService::new(ToolPaths {
            pdftotext: "quizgen-missing-pdftotext".into(),
            libreoffice: "quizgen-missing-libreoffice".into(),
            tesseract: "quizgen-missing-tesseract".into(),
        })
    }

    #[test]
    fn extension_is_last_segment_lowercased() {
        assert_eq!(file_extension("Lecture.Notes.PDF"), "pdf");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "readme");
    }

    #[test]
    fn known_extensions_map_to_kinds() {
        assert_eq!(DocumentKind::from_extension("jpeg"), Some(DocumentKind::Image));
        assert_eq!(
            DocumentKind::from_extension("doc"),
            Some(DocumentKind::Word { legacy: true })
        );
        assert_eq!(
            DocumentKind::from_extension("xls"),
            Some(DocumentKind::Spreadsheet(SheetFormat::Xls))
        );
        assert_eq!(DocumentKind::from_extension("gif"), None);
    }

    #[tokio::test]
    async fn unsupported_extensions_name_the_supported_set() {
        for name in ["notes.txt", "slides.key", "image.gif", "noextension"] {
            let err = service()
                .extract_text_from_document(name, b"whatever")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::BadRequest(_)), "{}", name);
            let detail = err.detail();
            assert!(detail.starts_with("Unsupported file type: "), "{}", detail);
            assert!(detail.ends_with(SUPPORTED_TYPES), "{}", detail);
        }
    }

    #[tokio::test]
    async fn pdf_magic_is_checked_before_running_tools() {
        let err = service()
            .extract_text_from_document("paper.pdf", b"<html>not a pdf</html>")
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "Invalid PDF file content");
    }

    #[tokio::test]
    async fn missing_pdf_tool_is_a_bad_request() {
        let err = service()
            .extract_text_from_document("paper.pdf", b"%PDF-1.4\n%%EOF")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(err.detail().starts_with("Failed to extract text from PDF: "));
    }

    #[tokio::test]
    async fn missing_ocr_tool_is_a_bad_request() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let err = service()
            .extract_text_from_document("scan.PNG", &png)
            .await
            .unwrap_err();
        assert!(err.detail().starts_with("Failed to extract text from image using OCR: "));
        assert!(err.detail().ends_with("Please ensure tesseract-ocr is installed on your system."));
    }

    #[tokio::test]
    async fn broken_office_files_report_their_format() {
        let svc = service();
        let word = svc.extract_text_from_document("a.docx", b"nope").await.unwrap_err();
        assert!(word.detail().starts_with("Failed to extract text from Word document: "));

        let slides = svc.extract_text_from_document("a.pptx", b"nope").await.unwrap_err();
        assert!(slides.detail().starts_with("Failed to extract text from PowerPoint: "));

        let sheet = svc.extract_text_from_document("a.xlsx", b"nope").await.unwrap_err();
        assert!(sheet.detail().starts_with("Failed to extract text from Excel: "));

        let legacy = svc.extract_text_from_document("a.doc", b"nope").await.unwrap_err();
        assert!(legacy.detail().starts_with("Failed to extract text from Word document: "));
    }

    #[test]
    fn short_ocr_output_is_rejected() {
        let err = ensure_ocr_text("  abc \n\n".to_string()).unwrap_err();
        assert!(err.detail().starts_with("Could not extract text from image."));
        assert!(ensure_ocr_text("123456789".to_string()).is_err());
        assert_eq!(
            ensure_ocr_text("0123456789".to_string()).unwrap(),
            "0123456789"
        );
    }

    #[test]
    fn pdf_pages_are_newline_joined() {
        assert_eq!(join_pdf_pages("page one\n\u{c}page two\n\u{c}"), "page one\npage two\n");
        assert_eq!(join_pdf_pages("a\u{c}b"), "a\nb\n");
    }
}
