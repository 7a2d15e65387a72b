use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use retouch_catalog::PhotoId;
use retouch_core::geometry::CropRect;

#[derive(Parser, Debug)]
#[command(name = "retouch", version, about = "Non-destructive photo editing from the command line")]
pub struct Cli {
    /// Catalog database. Defaults to the user data directory.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Editor config JSON.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply adjustments and layers, then export the flattened result.
    Edit(EditArgs),
    /// Render a working-size preview (adjustments only) as PNG.
    Preview(PreviewArgs),
    /// Write one thumbnail per filter preset.
    Presets(PresetsArgs),
    /// Manage stored photos.
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

/// Where the photo being edited comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Source {
    /// Image file on disk.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Photo id in the catalog.
    #[arg(long)]
    pub photo: Option<PhotoId>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[command(flatten)]
    pub source: Source,

    /// Adjustment set JSON (camelCase knobs, omitted knobs are neutral).
    #[arg(long)]
    pub adjustments: Option<PathBuf>,

    /// Filter preset id, applied after the adjustment file.
    #[arg(long)]
    pub preset: Option<String>,

    /// Layer list JSON, bottom to top.
    #[arg(long)]
    pub layers: Option<PathBuf>,

    /// Clockwise quarter turns; negative turns left.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub rotate: i32,

    #[arg(long)]
    pub flip_horizontal: bool,

    #[arg(long)]
    pub flip_vertical: bool,

    /// Crop rectangle `x,y,w,h` on the rotated canvas.
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<CropRect>,

    /// Output file; `.png` exports PNG, anything else the configured format.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Store the result in the catalog as a new photo with this title.
    #[arg(long)]
    pub save_as: Option<String>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: Source,

    #[arg(long)]
    pub adjustments: Option<PathBuf>,

    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct PresetsArgs {
    #[command(flatten)]
    pub source: Source,

    #[arg(long)]
    pub out_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Upload an image file.
    Import {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// List photos, newest first.
    List,
    /// Write a stored photo's bytes to a file.
    Export { id: PhotoId, output: PathBuf },
    Rename { id: PhotoId, title: String },
    Delete { id: PhotoId },
}

fn parse_crop(value: &str) -> Result<CropRect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop {value:?}: {e}"))?;
    match parts[..] {
        [x, y, w, h] if w > 0.0 && h > 0.0 => Ok(CropRect::new(x, y, w, h)),
        [_, _, _, _] => Err(format!("crop {value:?} needs a positive width and height")),
        _ => Err(format!("crop {value:?} must be x,y,w,h")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_values() {
        assert_eq!(parse_crop("10, 20,30,40"), Ok(CropRect::new(10.0, 20.0, 30.0, 40.0)));
        for bad in ["1,2,3", "a,b,c,d", "0,0,0,5", "1,2,3,4,5"] {
            assert!(parse_crop(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn edit_needs_one_source() {
        let ok = Cli::try_parse_from(["retouch", "edit", "--input", "a.jpg", "--rotate", "-1"]).unwrap();
        let Command::Edit(args) = ok.cmd else {
            panic!("expected edit");
        };
        assert_eq!(args.rotate, -1);
        assert!(Cli::try_parse_from(["retouch", "edit"]).is_err());
        assert!(Cli::try_parse_from(["retouch", "edit", "--input", "a", "--photo", "1"]).is_err());
    }

    #[test]
    fn catalog_subcommands() {
        let cli = Cli::try_parse_from(["retouch", "catalog", "rename", "3", "Beach", "--catalog", "x.db"]).unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("x.db")));
        assert!(matches!(cli.cmd, Command::Catalog(CatalogCommand::Rename { id: 3, .. })));
    }
}
