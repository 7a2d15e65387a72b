mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use retouch_catalog::{Catalog, NewPhoto, PhotoStore};
use retouch_core::presets::{PRESETS, THUMBNAIL_SIZE, preset_thumbnail};
use retouch_core::{Adjustments, RasterBuffer};
use retouch_editor::export::encode;
use retouch_editor::{EditorConfig, EditorSession, ExportFormat, ExportSettings};
use retouch_layers::{Layer, LayerStack};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{CatalogCommand, Cli, Command, EditArgs, PresetsArgs, PreviewArgs, Source};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let catalog_path = cli.catalog.clone().unwrap_or_else(default_catalog_path);

    match cli.cmd {
        Command::Edit(args) => cmd_edit(args, config, &catalog_path).await,
        Command::Preview(args) => cmd_preview(args, config, &catalog_path).await,
        Command::Presets(args) => cmd_presets(args, config, &catalog_path).await,
        Command::Catalog(cmd) => cmd_catalog(cmd, &catalog_path),
    }
}

fn default_catalog_path() -> PathBuf {
    let data_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retouch");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("catalog.db")
}

async fn open_session(source: &Source, config: EditorConfig, catalog_path: &Path) -> Result<EditorSession> {
    match (&source.input, source.photo) {
        (Some(path), _) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(EditorSession::from_bytes(&bytes, config)?)
        }
        (None, Some(id)) => {
            let catalog = Catalog::open(catalog_path)?;
            Ok(EditorSession::open(&catalog, id, config).await?)
        }
        (None, None) => bail!("either --input or --photo is required"),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn apply_look(session: &mut EditorSession, adjustments: Option<&Path>, preset: Option<&str>) -> Result<()> {
    if let Some(path) = adjustments {
        session.set_adjustments(read_json::<Adjustments>(path)?);
    }
    if let Some(id) = preset
        && !session.apply_preset(id)
    {
        let known: Vec<&str> = PRESETS.iter().map(|p| p.id).collect();
        bail!("unknown preset {id:?}, expected one of {}", known.join(", "));
    }
    Ok(())
}

async fn cmd_edit(args: EditArgs, mut config: EditorConfig, catalog_path: &Path) -> Result<()> {
    if args.output.is_none() && args.save_as.is_none() {
        bail!("nothing to do: pass --output, --save-as, or both");
    }
    if let Some(format) = args.output.as_deref().and_then(ExportFormat::from_path) {
        config.export.format = format;
    }
    let loader = config.resources.loader();

    let mut session = open_session(&args.source, config, catalog_path).await?;
    apply_look(&mut session, args.adjustments.as_deref(), args.preset.as_deref())?;

    for _ in 0..args.rotate.unsigned_abs() {
        if args.rotate < 0 {
            session.rotate_left();
        } else {
            session.rotate_right();
        }
    }
    if args.flip_horizontal {
        session.toggle_flip_horizontal();
    }
    if args.flip_vertical {
        session.toggle_flip_vertical();
    }
    if let Some(rect) = args.crop {
        session.crop(rect);
    }
    if let Some(path) = &args.layers {
        let layers: Vec<Layer> = read_json(path)?;
        session.set_layers(LayerStack::from_layers(layers));
    }

    if let Some(output) = &args.output {
        let bytes = session.export_final(&loader).await?;
        tokio::fs::write(output, &bytes)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(path = %output.display(), bytes = bytes.len(), "wrote export");
    }
    if let Some(title) = &args.save_as {
        let catalog = Catalog::open(catalog_path)?;
        let photo = session.save_as(&catalog, &loader, title).await?;
        println!("{}\t{}", photo.id, photo.title);
    }
    Ok(())
}

async fn cmd_preview(args: PreviewArgs, config: EditorConfig, catalog_path: &Path) -> Result<()> {
    let mut session = open_session(&args.source, config, catalog_path).await?;
    apply_look(&mut session, args.adjustments.as_deref(), args.preset.as_deref())?;
    session.render_preview_async().await?;
    let preview = session.preview().context("preview was superseded")?;
    write_png(&preview.image, &args.output)
}

async fn cmd_presets(args: PresetsArgs, config: EditorConfig, catalog_path: &Path) -> Result<()> {
    let session = open_session(&args.source, config, catalog_path).await?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    for preset in PRESETS {
        let thumb = preset_thumbnail(session.original(), preset, THUMBNAIL_SIZE);
        let path = args.out_dir.join(format!("{}.png", preset.id));
        write_png(&thumb, &path)?;
        println!("{}\t{}", preset.id, path.display());
    }
    Ok(())
}

fn write_png(image: &RasterBuffer, path: &Path) -> Result<()> {
    let bytes = encode(image, &ExportSettings::png())?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

fn cmd_catalog(cmd: CatalogCommand, catalog_path: &Path) -> Result<()> {
    let catalog = Catalog::open(catalog_path)?;
    match cmd {
        CatalogCommand::Import { path, title } => {
            let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let mut upload = NewPhoto::new(filename, mime_for(&path), bytes);
            if let Some(title) = title {
                upload = upload.with_title(title);
            }
            let photo = catalog.upload(upload)?;
            println!("{}\t{}", photo.id, photo.title);
        }
        CatalogCommand::List => {
            for photo in catalog.list()? {
                let dims = match (photo.width, photo.height) {
                    (Some(w), Some(h)) => format!("{w}x{h}"),
                    _ => "?".to_string(),
                };
                let derived = photo.derived_from.map(|id| format!(" (from {id})")).unwrap_or_default();
                println!("{}\t{}\t{}\t{}{}", photo.id, photo.title, dims, photo.created_at, derived);
            }
        }
        CatalogCommand::Export { id, output } => {
            let stored = catalog.fetch(id)?;
            std::fs::write(&output, &stored.bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        CatalogCommand::Rename { id, title } => {
            if !catalog.rename(id, &title)? {
                bail!("no photo with id {id}");
            }
        }
        CatalogCommand::Delete { id } => {
            if !catalog.delete(id)? {
                bail!("no photo with id {id}");
            }
        }
    }
    Ok(())
}

/// MIME type from a file extension; the catalog decides what it accepts.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}
