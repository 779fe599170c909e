//! Text recognition and document conversion through external command-line
//! tools.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result};
use docview_core::{OcrEngine, RasterImage, TextExporter};
use thiserror::Error;
use tracing::{debug, info};

use crate::to_rgba_image;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("{tool} did not produce {expected:?}")]
    MissingOutput { tool: String, expected: PathBuf },
}

fn run(program: &OsString, configure: impl FnOnce(&mut Command)) -> Result<Output, ToolError> {
    let tool = program.to_string_lossy().into_owned();
    let mut command = Command::new(program);
    configure(&mut command);
    debug!(?command, "running external tool");
    let output = command.output().map_err(|source| ToolError::Launch {
        tool: tool.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(output)
}

/// Recognises page text with the `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    program: OsString,
    language: Option<String>,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            program: OsString::from("tesseract"),
            language: None,
        }
    }
}

impl TesseractOcr {
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &RasterImage) -> Result<String> {
        let workdir = tempfile::tempdir().context("failed to create OCR scratch directory")?;
        let input = workdir.path().join("page.png");
        to_rgba_image(image)?
            .save(&input)
            .with_context(|| format!("failed to write {:?}", input))?;

        // tesseract prints the recognised text when the output base is "stdout"
        let output = run(&self.program, |command| {
            command.arg(&input).arg("stdout");
            if let Some(language) = &self.language {
                command.arg("-l").arg(language);
            }
        })?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Converts plain text into another office format with `unoconv`.
#[derive(Debug, Clone)]
pub struct UnoconvExporter {
    program: OsString,
    format: String,
}

impl Default for UnoconvExporter {
    fn default() -> Self {
        Self {
            program: OsString::from("unoconv"),
            format: "odt".to_owned(),
        }
    }
}

impl UnoconvExporter {
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

impl TextExporter for UnoconvExporter {
    fn export_text(&self, text: &str, output: &Path) -> Result<()> {
        let workdir = tempfile::tempdir().context("failed to create conversion scratch directory")?;
        let source = workdir.path().join("extracted.txt");
        fs::write(&source, text).with_context(|| format!("failed to write {:?}", source))?;

        run(&self.program, |command| {
            command
                .arg("-f")
                .arg(&self.format)
                .arg(&source)
                .current_dir(workdir.path());
        })?;

        let converted = source.with_extension(&self.format);
        if !converted.exists() {
            return Err(ToolError::MissingOutput {
                tool: self.program.to_string_lossy().into_owned(),
                expected: converted,
            }
            .into());
        }
        fs::copy(&converted, output)
            .with_context(|| format!("failed to move converted file to {:?}", output))?;
        info!(?output, format = %self.format, "text exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docview_core::Color;

    const MISSING: &str = "docview-test-no-such-tool";

    #[test]
    fn missing_ocr_binary_reports_launch_failure() {
        let ocr = TesseractOcr::with_program(MISSING);
        let err = ocr
            .recognize(&RasterImage::new(2, 2, Color::new(255, 255, 255, 255)))
            .unwrap_err();
        let tool_err = err.downcast_ref::<ToolError>().unwrap();
        assert!(matches!(tool_err, ToolError::Launch { tool, .. } if tool == MISSING));
    }

    #[test]
    fn missing_converter_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.odt");
        let exporter = UnoconvExporter::with_program(MISSING);

        let err = exporter.export_text("hello", &output).unwrap_err();
        assert!(err.to_string().contains(MISSING));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_exit_status() {
        let err = run(&OsString::from("false"), |_| {}).unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn converter_that_writes_nothing_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.odt");
        let exporter = UnoconvExporter::with_program("true");

        let err = exporter.export_text("hello", &output).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolError>(),
            Some(ToolError::MissingOutput { .. })
        ));
        assert!(!output.exists());
    }
}
