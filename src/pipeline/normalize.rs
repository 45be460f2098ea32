//! Stage A: normalise office documents to PDF.
//!
//! Word-processor and spreadsheet files are handed to a headless office
//! suite; everything else (PDF in particular) passes through untouched. The
//! converter is a trait so the orchestrator can be driven by an in-process
//! fake in tests.

use crate::config::ConverterSettings;
use crate::error::{DocParseError, Stage};
use crate::pipeline::command::{self, CommandFailure, Invocation};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Extensions (lower-case, without the dot) routed through the converter.
pub const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "xls", "xlsx"];

/// Whether `path` names an office document that needs conversion.
pub fn is_office_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| OFFICE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Converts an office document to a PDF placed beside it.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` into `out_dir`, which is always `input`'s parent.
    ///
    /// `scratch` is a directory private to the current job where the
    /// converter may keep per-run state. Success means the call returned
    /// `Ok`; the caller separately checks that `<stem>.pdf` exists.
    async fn convert(
        &self,
        input: &Path,
        out_dir: &Path,
        scratch: &Path,
    ) -> Result<(), DocParseError>;
}

/// Headless LibreOffice (`--convert-to pdf`).
#[derive(Debug, Clone, Default)]
pub struct LibreOfficeConverter {
    settings: ConverterSettings,
}

impl LibreOfficeConverter {
    pub fn new(settings: ConverterSettings) -> Self {
        Self { settings }
    }

    fn invocation(&self, input: &Path, out_dir: &Path, scratch: &Path) -> Invocation {
        Invocation::new(&self.settings.command)
            .arg(user_installation_arg(scratch))
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
    }
}

/// Directory (under the job's scratch dir) used as the LibreOffice profile.
pub const PROFILE_SUBDIR: &str = ".lo_profile";

/// `-env:UserInstallation=file:///...` pointing at a job-private profile.
///
/// Concurrent LibreOffice instances must never share a profile.
fn user_installation_arg(scratch: &Path) -> String {
    let profile = scratch.join(PROFILE_SUBDIR);
    let profile = std::path::absolute(&profile).unwrap_or(profile);
    let url = profile.to_string_lossy().replace('%', "%25").replace(' ', "%20");
    if url.starts_with('/') {
        format!("-env:UserInstallation=file://{url}")
    } else {
        format!("-env:UserInstallation=file:///{url}")
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(
        &self,
        input: &Path,
        out_dir: &Path,
        scratch: &Path,
    ) -> Result<(), DocParseError> {
        let invocation = self.invocation(input, out_dir, scratch);
        let outcome = match command::run(&invocation, self.settings.timeout).await {
            Ok(outcome) => outcome,
            Err(CommandFailure::TimedOut) => {
                return Err(DocParseError::StageTimeout {
                    stage: Stage::Normalize,
                    secs: self.settings.timeout.as_secs(),
                })
            }
            Err(CommandFailure::Spawn(e)) => {
                return Err(DocParseError::Conversion {
                    input: input.to_path_buf(),
                    detail: format!("cannot start '{}': {}", invocation.display(), e),
                })
            }
        };

        if !outcome.success() {
            error!(
                "Office conversion failed: {}\ncommand: {}\nstdout: {}\nstderr: {}",
                input.display(),
                invocation.display(),
                outcome.stdout,
                outcome.stderr
            );
            return Err(DocParseError::Conversion {
                input: input.to_path_buf(),
                detail: format!("converter exited with {:?}", outcome.code),
            });
        }
        Ok(())
    }
}

/// Run Stage A on `input`, using `scratch` for converter state.
///
/// Returns the PDF to feed into extraction: the converted file for office
/// documents, `input` itself otherwise.
pub async fn normalize(
    converter: &dyn DocumentConverter,
    input: &Path,
    scratch: &Path,
) -> Result<PathBuf, DocParseError> {
    if !is_office_document(input) {
        return Ok(input.to_path_buf());
    }

    let out_dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let pdf = input.with_extension("pdf");

    converter.convert(input, out_dir, scratch).await?;

    if !tokio::fs::try_exists(&pdf).await.unwrap_or(false) {
        error!(
            "Converter reported success but {} does not exist",
            pdf.display()
        );
        return Err(DocParseError::Conversion {
            input: input.to_path_buf(),
            detail: format!("expected output '{}' is missing", pdf.display()),
        });
    }

    info!("Converted {} -> {}", input.display(), pdf.display());
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes `<stem>.pdf` unless told to fail; counts calls.
    struct FakeConverter {
        calls: AtomicUsize,
        write_pdf: bool,
        fail: bool,
    }

    impl FakeConverter {
        fn new(write_pdf: bool, fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                write_pdf,
                fail,
            }
        }
    }

    #[async_trait]
    impl DocumentConverter for FakeConverter {
        async fn convert(
            &self,
            input: &Path,
            out_dir: &Path,
            _scratch: &Path,
        ) -> Result<(), DocParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DocParseError::Conversion {
                    input: input.to_path_buf(),
                    detail: "fake failure".into(),
                });
            }
            if self.write_pdf {
                let stem = input.file_stem().unwrap();
                std::fs::write(out_dir.join(stem).with_extension("pdf"), b"%PDF-1.7").unwrap();
            }
            Ok(())
        }
    }

    #[test]
    fn office_extensions_are_case_insensitive() {
        assert!(is_office_document(Path::new("a.docx")));
        assert!(is_office_document(Path::new("a.DOC")));
        assert!(is_office_document(Path::new("/x/y/sheet.XLSX")));
        assert!(!is_office_document(Path::new("a.pdf")));
        assert!(!is_office_document(Path::new("a.pptx")));
        assert!(!is_office_document(Path::new("README")));
    }

    #[tokio::test]
    async fn pdf_passes_through_without_invoking_converter() {
        let fake = FakeConverter::new(true, false);
        let out = normalize(&fake, Path::new("/docs/a.pdf"), Path::new("/ws")).await.unwrap();
        assert_eq!(out, PathBuf::from("/docs/a.pdf"));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn office_document_becomes_sibling_pdf() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("report.docx");
        std::fs::write(&input, b"PK").unwrap();

        let fake = FakeConverter::new(true, false);
        let out = normalize(&fake, &input, tmp.path()).await.unwrap();
        assert_eq!(out, tmp.path().join("report.pdf"));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_pdf_after_success_is_conversion_fault() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("sheet.xlsx");
        std::fs::write(&input, b"PK").unwrap();

        let fake = FakeConverter::new(false, false);
        let err = normalize(&fake, &input, tmp.path()).await.unwrap_err();
        assert!(matches!(err, DocParseError::Conversion { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn converter_failure_propagates() {
        let fake = FakeConverter::new(false, true);
        let err = normalize(&fake, Path::new("/tmp/x.doc"), Path::new("/ws")).await.unwrap_err();
        assert!(matches!(err, DocParseError::Conversion { .. }));
    }

    #[test]
    fn libreoffice_arguments() {
        let conv = LibreOfficeConverter::default();
        let inv = conv.invocation(Path::new("/w/a.docx"), Path::new("/w"), Path::new("/ws/1f2e"));
        assert_eq!(
            inv.display(),
            "libreoffice -env:UserInstallation=file:///ws/1f2e/.lo_profile \
             --headless --convert-to pdf --outdir /w /w/a.docx"
        );
    }

    #[test]
    fn each_job_gets_its_own_profile() {
        let conv = LibreOfficeConverter::default();
        let input = Path::new("/docs/a.docx");
        let first = conv.invocation(input, Path::new("/docs"), Path::new("/ws/one"));
        let second = conv.invocation(input, Path::new("/docs"), Path::new("/ws/two"));
        assert_ne!(first.args()[0], second.args()[0]);
        assert_eq!(
            second.args()[0],
            "-env:UserInstallation=file:///ws/two/.lo_profile"
        );
    }

    #[test]
    fn profile_url_is_absolute_and_escaped() {
        let arg = user_installation_arg(Path::new("rel dir/ws"));
        assert!(arg.starts_with("-env:UserInstallation=file:///"), "{arg}");
        assert!(arg.ends_with("rel%20dir/ws/.lo_profile"), "{arg}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn libreoffice_nonzero_exit_is_conversion_fault() {
        let conv = LibreOfficeConverter::new(ConverterSettings {
            command: CommandSpec::new("sh").with_args(["-c", "exit 1", "soffice"]),
            timeout: Duration::from_secs(10),
        });
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.docx");
        std::fs::write(&input, b"PK").unwrap();

        let err = normalize(&conv, &input, tmp.path()).await.unwrap_err();
        assert!(matches!(err, DocParseError::Conversion { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn libreoffice_script_producing_pdf_succeeds() {
        // $6 is --outdir's value, $7 the input; mimic soffice's naming.
        let script = r#"stem=$(basename "$7"); stem="${stem%.*}"; printf '%%PDF' > "$6/$stem.pdf""#;
        let conv = LibreOfficeConverter::new(ConverterSettings {
            command: CommandSpec::new("sh").with_args(["-c", script, "soffice"]),
            timeout: Duration::from_secs(10),
        });
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("report.doc");
        std::fs::write(&input, b"PK").unwrap();

        let out = normalize(&conv, &input, tmp.path()).await.unwrap();
        assert_eq!(out, tmp.path().join("report.pdf"));
        assert!(out.exists());
    }
}
