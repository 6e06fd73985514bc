use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_annotator_compose::compose;
use pdf_annotator_model::{
    ensure_pdf, Edit, EditPatch, EditorAction, EditorSession, ImageEdit, Point, TextEdit,
};
use pdf_annotator_render::{LopdfRenderer, RenderService, ThumbnailTarget};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pdf-annotator")]
#[command(about = "PDF annotation and export tool")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a thumbnail PNG for a page.
    RenderThumb {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 256)]
        width: u32,
        #[arg(long, default_value_t = 256)]
        height: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Apply an edit script to a PDF and export the result.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON edit script to replay before exporting.
        #[arg(long)]
        script: Option<PathBuf>,
        /// Export page order as a comma-separated list of 1-based pages.
        #[arg(long)]
        order: Option<String>,
        /// Output path. Defaults to `edited-<FILE>` next to the input.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

/// One step of an `export --script` file.
///
/// Steps address existing edits by their 0-based position on a page, in
/// insertion order; positions are resolved against the edit state at the
/// moment the step runs.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum ScriptStep {
    AddText {
        page: u32,
        x: f32,
        y: f32,
        text: Option<String>,
        font_size: Option<f32>,
    },
    AddImage {
        page: u32,
        file: PathBuf,
    },
    Update {
        page: u32,
        edit: usize,
        x: Option<f32>,
        y: Option<f32>,
        width: Option<f32>,
        height: Option<f32>,
        text: Option<String>,
        font_size: Option<f32>,
        font_family: Option<String>,
    },
    Remove {
        page: u32,
        edit: usize,
    },
    Undo,
    Redo,
    Reorder {
        from: usize,
        to: usize,
    },
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::RenderThumb { file, page, width, height, output } => {
            run_render_thumb(&file, page, width, height, output.as_deref())
        }
        Commands::Export { file, script, order, output } => {
            run_export(&file, script.as_deref(), order.as_deref(), output)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    let bytes = read_pdf(file)?;

    let mut renderer = LopdfRenderer::new();
    let handle = renderer.open(bytes).context("failed to open PDF")?;

    let page_count = renderer.page_count(handle)?;
    let first_page_size_pt = if page_count > 0 {
        let size = renderer.page_size(handle, 0)?;
        Some(PageSizeOutput { width: size.width_pt, height: size.height_pt })
    } else {
        None
    };

    let payload = InfoOutput { path: file.display().to_string(), page_count, first_page_size_pt };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    renderer.close(handle)?;

    Ok(())
}

fn run_render_thumb(
    file: &Path,
    page: u32,
    width: u32,
    height: u32,
    output: Option<&Path>,
) -> Result<()> {
    let bytes = read_pdf(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let mut renderer = LopdfRenderer::new();
    let handle = renderer.open(bytes).context("failed to open PDF")?;

    let surface = renderer
        .render_thumbnail(handle, page - 1, ThumbnailTarget { width_px: width, height_px: height })
        .context("failed to render thumbnail")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_thumbnail_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    surface
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    renderer.close(handle)?;

    Ok(())
}

fn run_export(
    file: &Path,
    script: Option<&Path>,
    order: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = read_pdf(file)?;

    let mut renderer = LopdfRenderer::new();
    let handle = renderer.open(bytes.clone()).context("failed to open PDF")?;
    let page_count = renderer.page_count(handle)?;
    renderer.close(handle)?;

    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.pdf")
        .to_owned();
    let mut session = EditorSession::new(name, page_count);

    if let Some(script_path) = script {
        let script_bytes = fs::read(script_path)
            .with_context(|| format!("failed to read script {}", script_path.display()))?;
        let steps: Vec<ScriptStep> =
            serde_json::from_slice(&script_bytes).context("failed to parse edit script")?;
        for (step_index, step) in steps.into_iter().enumerate() {
            apply_step(&mut session, step)
                .with_context(|| format!("script step {step_index} failed"))?;
        }
    }

    let page_order = match order {
        Some(list) => parse_order(list)?,
        None => session.page_order().clone(),
    };

    session.begin_export().context("export rejected")?;
    let result = compose(&bytes, session.current(), &page_order);
    session.finish_export();
    let exported = result.context("export failed")?;

    let output = output.unwrap_or_else(|| file.with_file_name(session.export_name()));
    fs::write(&output, exported)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn apply_step(session: &mut EditorSession, step: ScriptStep) -> Result<()> {
    match step {
        ScriptStep::AddText { page, x, y, text, font_size } => {
            ensure_page(session, page)?;
            let mut edit = TextEdit::at(Point { x, y });
            if let Some(text) = text {
                edit.text = text;
            }
            if let Some(size) = font_size {
                edit.font_size = size;
            }
            session.apply(EditorAction::AddEdit { page, edit: Edit::Text(edit) });
        }
        ScriptStep::AddImage { page, file } => {
            ensure_page(session, page)?;
            let bytes = fs::read(&file)
                .with_context(|| format!("failed to read image {}", file.display()))?;
            let edit = ImageEdit::from_bytes(bytes)
                .with_context(|| format!("unsupported image {}", file.display()))?;
            session.apply(EditorAction::AddEdit { page, edit: Edit::Image(edit) });
        }
        ScriptStep::Update { page, edit, x, y, width, height, text, font_size, font_family } => {
            let edit_id = resolve_edit(session, page, edit)?;
            let patch = EditPatch { x, y, width, height, text, font_size, font_family };
            session.apply(EditorAction::UpdateEdit { page, edit_id, patch });
        }
        ScriptStep::Remove { page, edit } => {
            let edit_id = resolve_edit(session, page, edit)?;
            session.apply(EditorAction::RemoveEdit { page, edit_id });
        }
        ScriptStep::Undo => session.apply(EditorAction::Undo),
        ScriptStep::Redo => session.apply(EditorAction::Redo),
        ScriptStep::Reorder { from, to } => {
            let count = session.page_count() as usize;
            if from >= count || to >= count {
                anyhow::bail!("reorder positions {from} -> {to} out of range for {count} pages");
            }
            session.apply(EditorAction::ReorderPages { from, to });
        }
    }
    Ok(())
}

fn ensure_page(session: &EditorSession, page: u32) -> Result<()> {
    if page == 0 || page > session.page_count() {
        anyhow::bail!("page {page} out of range (document has {} pages)", session.page_count());
    }
    Ok(())
}

fn resolve_edit(
    session: &EditorSession,
    page: u32,
    position: usize,
) -> Result<pdf_annotator_model::EditId> {
    let edits = session.current().edits_on(page);
    edits
        .get(position)
        .map(Edit::id)
        .with_context(|| format!("page {page} has no edit at position {position}"))
}

fn parse_order(list: &str) -> Result<pdf_annotator_model::PageOrder> {
    let pages = list
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --order list: {list}"))?;
    if pages.is_empty() {
        anyhow::bail!("--order must name at least one page");
    }
    Ok(pdf_annotator_model::PageOrder::from_pages(pages))
}

fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    ensure_pdf(&bytes).with_context(|| path.display().to_string())?;

    Ok(bytes)
}

fn default_thumbnail_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("thumbnail");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
