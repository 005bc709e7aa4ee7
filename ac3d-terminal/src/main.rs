/// AC3D Terminal Viewer
///
/// Loads an AC3D model and previews it as ASCII art.
/// Usage: ac3d-terminal <model.ac> [--lenient] [--info]
///   --lenient  accept malformed numbers the way legacy loaders did
///   --info     print the scene summary and exit
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera
///   - +/-: Zoom
///   - F: Re-frame the model
///   - Q/ESC: Quit
use std::fs;
use std::path::{Path, PathBuf};

use ac3d_core::{load_scene, ParseOptions, Scene};
use ac3d_terminal::{TerminalApp, TextureSet};
use anyhow::{bail, Context, Result};
use log::info;

struct Args {
    model: PathBuf,
    options: ParseOptions,
    info_only: bool,
}

fn parse_args() -> Result<Args> {
    let mut model = None;
    let mut options = ParseOptions::default();
    let mut info_only = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--lenient" => options = ParseOptions::lenient(),
            "--info" => info_only = true,
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path if model.is_none() => model = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}"),
        }
    }

    let Some(model) = model else {
        bail!("usage: ac3d-terminal <model.ac> [--lenient] [--info]");
    };
    Ok(Args {
        model,
        options,
        info_only,
    })
}

fn print_summary(path: &Path, scene: &Scene, textures: &TextureSet) {
    let bounds = &scene.bounding_box;
    println!("{}", path.display());
    println!("  materials:    {}", scene.materials.len());
    println!(
        "  textures:     {} ({} loaded)",
        scene.textures.len(),
        textures.loaded()
    );
    println!(
        "  groups:       {} ({} transparent)",
        scene.groups.len(),
        scene.transparent_groups().count()
    );
    println!("  vertices:     {}", scene.vertex_count());
    if bounds.is_empty() {
        println!("  bounds:       empty");
    } else {
        println!(
            "  bounds:       ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let data = fs::read(&args.model)
        .with_context(|| format!("failed to read {}", args.model.display()))?;
    let scene = load_scene(&data, &args.options)
        .with_context(|| format!("failed to load {}", args.model.display()))?;
    info!("loaded {}", args.model.display());

    let base_dir = args.model.parent().unwrap_or_else(|| Path::new("."));
    let textures = TextureSet::load(&scene, base_dir);

    print_summary(&args.model, &scene, &textures);
    if args.info_only {
        return Ok(());
    }

    let title = args
        .model
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut app = TerminalApp::new(scene, textures, title)?;
    app.run()?;
    Ok(())
}
