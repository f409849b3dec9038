use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use latticecpm::config::Params;
use latticecpm::constraints::ChemotaxisConstraint;
use latticecpm::grid::{LatticeRead, Point};
use latticecpm::{render, seed};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let seed_value: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let width: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(200);
    let height: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(200);
    let steps: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let out_dir: PathBuf = args
        .get(5)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    let mut params = match args.get(6) {
        Some(path) => serde_json::from_str::<Params>(&std::fs::read_to_string(path)?)?,
        None => Params::default(),
    };
    params.extents = vec![width, height];
    params.torus.resize(2, true);
    params.seed = seed_value;

    std::fs::create_dir_all(&out_dir)?;

    info!(
        "Simulating {}x{} lattice with seed={} for {} steps",
        width, height, seed_value, steps
    );

    let n_cells = (width * height / 400).max(1);
    let radius = width.min(height) as f64 / 4.0;
    let (cpm, timings) = latticecpm::simulate(&params, steps, |cpm| {
        let center = Point::xy(width / 2, height / 2);
        seed::seed_cells_in_disk(cpm, 1, n_cells, &center, radius, n_cells * 1000)?;
        Ok(())
    })?;

    // Print timings
    eprintln!("\nTimings:");
    for t in &timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }

    // Save diagnostic PNGs
    let save = |name: &str, rgba: &[u8], w: usize, h: usize| -> Result<(), image::ImageError> {
        let path = out_dir.join(name);
        image::save_buffer(&path, rgba, w as u32, h as u32, image::ColorType::Rgba8)?;
        info!("Saved {}", path.display());
        Ok(())
    };

    // 1. Cells
    save("cells.png", &render::render_cells(&cpm.view())?, width, height)?;

    // 2. Chemical field at its own (coarse) resolution
    if let Some(chemotaxis) = cpm.constraint::<ChemotaxisConstraint>() {
        let field = chemotaxis.field();
        let extents = field.extents();
        save("field.png", &render::render_field(field)?, extents[0], extents[1])?;
    }

    info!("Done after {} steps, {} live cells", cpm.time(), cpm.cells().live_count());
    Ok(())
}
