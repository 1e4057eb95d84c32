use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sc_core::ingest::ResolvedAsset;
use sc_core::model::ObjectKind;
use sc_core::{EditorConfig, Layout, Theme};
use sc_editor::Editor;
use sc_render::{ExportFormat, ExportPreset, ExportRequest};

#[derive(Parser, Debug)]
#[command(name = "story-canvas", version)]
struct Cli {
    /// Editor config JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a saved layout to PNG or JPG.
    Export(ExportArgs),
    /// Build a draft layout from a headline, body copy and an image.
    Draft(DraftArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input layout JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file. Defaults to a timestamped name in the current directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// `png` or `jpg`.
    #[arg(long, default_value = "png")]
    format: ExportFormat,

    /// `story`, `square`, `thumbnail` or a size such as `1080x1920`.
    #[arg(long, default_value = "story")]
    preset: ExportPreset,

    /// Byte budget. JPEG lowers quality to fit; PNG fails if over.
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Theme the layout is opened under.
    #[arg(long, default_value = "light")]
    theme: Theme,
}

#[derive(Parser, Debug)]
struct DraftArgs {
    /// Output layout JSON.
    #[arg(long)]
    out: PathBuf,

    #[arg(long)]
    headline: Option<String>,

    #[arg(long)]
    body: Option<String>,

    /// Local PNG or JPEG to place on the canvas.
    #[arg(long)]
    image: Option<PathBuf>,

    #[arg(long, default_value = "light")]
    theme: Theme,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Export(args) => cmd_export(config, args),
        Command::Draft(args) => cmd_draft(config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    EditorConfig::from_json(&text).with_context(|| format!("parse config '{}'", path.display()))
}

fn cmd_export(config: EditorConfig, args: ExportArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read layout '{}'", args.in_path.display()))?;
    let layout = Layout::from_json(&text)
        .with_context(|| format!("parse layout '{}'", args.in_path.display()))?;
    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));

    let mut editor = Editor::new(config, args.theme);
    editor.load_layout(layout)?;
    attach_bitmaps(&mut editor, assets_root);

    let request = ExportRequest {
        max_bytes: args.max_bytes,
        ..ExportRequest::new(args.format, args.preset)
    };
    let exported = futures::executor::block_on(editor.export(request))?;

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(&exported.filename));
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&out, &exported.bytes)
        .with_context(|| format!("write {} '{}'", exported.mime, out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} bytes)",
        out.display(),
        exported.width,
        exported.height,
        exported.bytes.len()
    );
    Ok(())
}

/// Decode image objects whose URI names a local file. Missing files keep
/// their placeholder and are skipped by the renderer.
fn attach_bitmaps(editor: &mut Editor, root: &Path) {
    let pending: Vec<_> = editor
        .store()
        .objects()
        .iter()
        .filter_map(|obj| match &obj.kind {
            ObjectKind::Image { source, .. } if source.bitmap.is_none() => {
                source.uri.clone().map(|uri| (obj.id, uri))
            }
            _ => None,
        })
        .collect();

    for (id, uri) in pending {
        let path = root.join(uri.strip_prefix("file://").unwrap_or(&uri));
        match ResolvedAsset::open(&path) {
            Ok(ResolvedAsset {
                bitmap: Some(bitmap),
                ..
            }) => {
                editor.complete_image_load(id, bitmap);
            }
            Ok(_) => {}
            Err(e) => log::warn!("image {id} left unloaded: {e}"),
        }
    }
}

fn cmd_draft(config: EditorConfig, args: DraftArgs) -> anyhow::Result<()> {
    let mut editor = Editor::new(config, args.theme);
    if let Some(path) = &args.image {
        let asset = ResolvedAsset::open(path);
        editor
            .add_asset(asset)
            .with_context(|| format!("place image '{}'", path.display()))?;
    }
    if let Some(headline) = &args.headline {
        editor.add_headline(headline)?;
    }
    if let Some(body) = &args.body {
        editor.add_body(body)?;
    }

    let json = editor.save_layout().to_json()?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("write layout '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
