use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use docview_core::config::project_dirs;
use docview_core::{
    DocumentBackend, DocumentMetadata, DocumentProvider, PageRange, Session, ViewerConfig,
};
use docview_render::{to_rgba_image, PdfRenderFactory, TesseractOcr, UnoconvExporter};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "docview", version, about = "Inspect, edit and convert PDF documents")]
struct Args {
    /// Configuration file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Print page count and document metadata as JSON
    Info { file: PathBuf },
    /// Print the table of contents
    Toc { file: PathBuf },
    /// Render one page to a PNG file
    Render {
        file: PathBuf,
        /// Page to render (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        zoom: Option<f32>,
        #[arg(long)]
        dark: bool,
        /// Annotation file to paint over the page
        #[arg(long)]
        annotations: Option<PathBuf>,
        /// Highlight the first match of this text on the page
        #[arg(long)]
        highlight: Option<String>,
    },
    /// List every match of a text query
    Search { file: PathBuf, query: String },
    /// Write page ranges such as "1-3,5-7" to separate files
    Split {
        file: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        ranges: Vec<PageRange>,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Concatenate documents in the given order
    Merge {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Rotate one page or every page clockwise
    Rotate {
        file: PathBuf,
        /// Page to rotate (1-based)
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        page: Option<usize>,
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 90, allow_negative_numbers = true)]
        degrees: i32,
        /// Write the result here instead of updating the file in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or edit document metadata
    Metadata {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Recognise the text of every page and export it as an office document
    Ocr {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct InfoOutput<'a> {
    path: &'a Path,
    pages: usize,
    metadata: DocumentMetadata,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs =
        project_dirs().ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config = match args.config.clone().or_else(ViewerConfig::default_path) {
        Some(path) => ViewerConfig::load(&path)?,
        None => ViewerConfig::default(),
    };
    let provider = PdfRenderFactory::new()?;
    let mut session = Session::new(config);

    match args.command {
        CliCommand::Info { file } => {
            open(&mut session, &provider, &file).await?;
            let output = InfoOutput {
                path: &file,
                pages: session.page_count().unwrap_or(0),
                metadata: session.metadata()?,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        CliCommand::Toc { file } => {
            open(&mut session, &provider, &file).await?;
            for entry in session.toc()? {
                let indent = "  ".repeat(entry.level.saturating_sub(1));
                println!("{indent}{} ....... {}", entry.title, entry.page_index + 1);
            }
        }
        CliCommand::Render {
            file,
            page,
            output,
            zoom,
            dark,
            annotations,
            highlight,
        } => {
            open(&mut session, &provider, &file).await?;
            let page_index = one_based(page)?;
            if let Some(zoom) = zoom {
                session.set_zoom(zoom);
            }
            if dark {
                session.toggle_dark_mode();
            }
            if let Some(path) = annotations {
                let count = session
                    .import_annotations(&path)
                    .with_context(|| format!("failed to load annotations from {:?}", path))?;
                info!(count, "annotations loaded");
            }

            let mut region = None;
            if let Some(query) = highlight {
                session.search(&query)?;
                region = session
                    .search_session()
                    .and_then(|search| {
                        search
                            .matches()
                            .iter()
                            .find(|found| found.page_index == page_index)
                    })
                    .map(|found| found.rect);
                if region.is_none() {
                    warn!(query = %query, page, "no match on the requested page");
                }
            }

            let rendered = session.render_page(page_index, region)?;
            to_rgba_image(&rendered.image)?
                .save(&output)
                .with_context(|| format!("failed to write {:?}", output))?;
            println!(
                "wrote page {} ({}x{}, {} overlay items) to {}",
                page,
                rendered.image.width,
                rendered.image.height,
                rendered.overlay.len(),
                output.display()
            );
        }
        CliCommand::Search { file, query } => {
            open(&mut session, &provider, &file).await?;
            let count = session.search(&query)?;
            if count == 0 {
                println!("no matches for {query:?}");
            }
            let matches = session
                .search_session()
                .map(|search| search.matches())
                .unwrap_or_default();
            for found in matches {
                println!(
                    "page {}: x={:.1} y={:.1} w={:.1} h={:.1}",
                    found.page_index + 1,
                    found.rect.x,
                    found.rect.y,
                    found.rect.width,
                    found.rect.height
                );
            }
        }
        CliCommand::Split {
            file,
            ranges,
            output_dir,
        } => {
            open(&mut session, &provider, &file).await?;
            for part in session.split_ranges(&ranges, &output_dir)? {
                println!("{}", part.display());
            }
        }
        CliCommand::Merge { files, output } => {
            let mut documents: Vec<Box<dyn DocumentBackend>> = Vec::with_capacity(files.len());
            for path in &files {
                let document = provider
                    .open(path)
                    .await
                    .with_context(|| format!("failed to open {:?}", path))?;
                documents.push(document);
            }
            session.merge_with(&provider, documents).await?;
            session.save(&output)?;
            println!(
                "merged {} documents ({} pages) into {}",
                files.len(),
                session.page_count().unwrap_or(0),
                output.display()
            );
        }
        CliCommand::Rotate {
            file,
            page,
            all,
            degrees,
            output,
        } => {
            open(&mut session, &provider, &file).await?;
            match page {
                Some(page) if !all => session.rotate_page(one_based(page)?, degrees)?,
                _ => session.rotate_all(degrees)?,
            }
            persist(&session, output.as_deref())?;
        }
        CliCommand::Metadata {
            file,
            title,
            author,
            subject,
            keywords,
            output,
        } => {
            open(&mut session, &provider, &file).await?;
            let current = session.metadata()?;
            let edited = DocumentMetadata {
                title: title.or_else(|| current.title.clone()),
                author: author.or_else(|| current.author.clone()),
                subject: subject.or_else(|| current.subject.clone()),
                keywords: keywords.or_else(|| current.keywords.clone()),
            };
            if edited != current {
                session.set_metadata(edited)?;
                persist(&session, output.as_deref())?;
            }
            println!("{}", serde_json::to_string_pretty(&session.metadata()?)?);
        }
        CliCommand::Ocr {
            file,
            output,
            language,
        } => {
            open(&mut session, &provider, &file).await?;
            let ocr = match language {
                Some(language) => TesseractOcr::default().language(language),
                None => TesseractOcr::default(),
            };
            let target = output.clone();
            let pages = tokio::task::spawn_blocking(move || {
                session.export_text_via_ocr(&ocr, &UnoconvExporter::default(), &target)
            })
            .await
            .context("OCR worker stopped unexpectedly")??;
            println!("recognised {pages} pages into {}", output.display());
        }
    }

    Ok(())
}

async fn open(session: &mut Session, provider: &PdfRenderFactory, path: &Path) -> Result<()> {
    session
        .open_with(provider, path.to_path_buf())
        .await
        .with_context(|| format!("failed to open {:?}", path))
}

fn persist(session: &Session, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => session.save(path)?,
        None => session.save_incremental()?,
    }
    Ok(())
}

fn one_based(page: usize) -> Result<usize> {
    match page.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("page numbers start at 1"),
    }
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "docview.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
