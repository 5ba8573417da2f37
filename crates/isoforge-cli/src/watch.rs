//! Terminal watch mode: re-mesh a formula file on every save

use crate::args::MeshArgs;
use crate::load_formula;
use anyhow::{Context, Result};
use glam::Vec3;
use isoforge_formula::{FormulaWatcher, LiveProgram, Program, WatchEvent, watcher::DEFAULT_DEBOUNCE};
use isoforge_mesh::{MeshGenerator, MeshRequest, export_obj};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn run_watch(formula_path: &Path, args: &MeshArgs, output: &Path) -> Result<()> {
    let request = args.request()?;
    let path = formula_path
        .canonicalize()
        .with_context(|| format!("Formula file not found: {}", formula_path.display()))?;

    // Serves an empty mesh until the first edit compiles
    let generator = MeshGenerator::new(Arc::new(LiveProgram::new(Program::constant(Vec3::ZERO))));

    // The directory watch survives editors that save by renaming; the file
    // watch registers the exact path whatever its extension
    let directory = path.parent().unwrap_or(Path::new("."));
    let mut watcher = FormulaWatcher::new(DEFAULT_DEBOUNCE)?;
    watcher.watch(directory)?;
    watcher.watch(&path)?;

    println!("Watching {} (writing {})", path.display(), output.display());
    println!("Press Ctrl+C to stop\n");

    rebuild(&generator, &path, &request, output);

    loop {
        match watcher.recv_timeout(Duration::from_millis(100)) {
            Some(WatchEvent::Modified(changed)) if changed == path => {
                // Coalesce bursts from a single save
                let _ = watcher.drain_events();
                rebuild(&generator, &path, &request, output);
            }
            Some(WatchEvent::Error(message)) => tracing::warn!("{}", message),
            Some(WatchEvent::Modified(_)) | None => {}
        }
    }
}

/// Reload, recompile and re-export; failures leave the previous program and output in place
fn rebuild(generator: &MeshGenerator, path: &Path, request: &MeshRequest, output: &Path) {
    println!("\n--- Compiling: {} ---", path.display());

    let mut formula = match load_formula(path) {
        Ok(formula) => formula,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            return;
        }
    };

    if let Err(e) = generator.recompile(&mut formula) {
        eprintln!("ERROR: {}\nKeeping generation {}", e, generator.live().generation());
        return;
    }

    match generator.generate(request).and_then(|mesh| {
        export_obj(&mesh.buffers, output)?;
        Ok(mesh)
    }) {
        Ok(mesh) => println!(
            "OK - generation {}: {} vertices, {} triangles",
            mesh.generation,
            mesh.buffers.vertex_count(),
            mesh.buffers.triangle_count()
        ),
        Err(e) => eprintln!("ERROR: {}", e),
    }
}
