use bini::config::{load_config, RuntimeConfig};
use bini::image::io::{
    load_intrinsics, load_mask, load_normal_map, save_weight_map, write_json_file,
};
use bini::image::{ImageView, Mask};
use bini::{IntegrationOutput, NormalIntegrator, Projection};
use log::info;
use std::env;
use std::error::Error;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "bini".to_string());
    let config_path = match args.next() {
        Some(arg) if arg != "-h" && arg != "--help" => PathBuf::from(arg),
        _ => return Err(format!("Usage: {program} <config.json>").into()),
    };
    let config = load_config(&config_path)?;

    let normals = load_normal_map(&config.normal_map)?;
    let mask = match &config.mask {
        Some(path) => load_mask(path)?,
        None => Mask::full(normals.w, normals.h),
    };
    let projection = match &config.intrinsics {
        Some(path) => Projection::perspective(load_intrinsics(path)?)?,
        None => Projection::Orthographic,
    };
    info!(
        "loaded {} ({}x{}), {} valid pixels, {} projection",
        config.normal_map.display(),
        normals.width(),
        normals.height(),
        mask.count(),
        projection.name()
    );

    let integrator = NormalIntegrator::new(config.params.clone());
    let out = integrator.run(&normals, &mask, &projection, None)?;
    println!("{}", out.report.summary());

    write_outputs(&config, &out)?;
    Ok(())
}

fn write_outputs(config: &RuntimeConfig, out: &IntegrationOutput) -> Result<(), Box<dyn Error>> {
    let output = &config.output;
    if output.is_empty() {
        info!("no outputs configured");
        return Ok(());
    }
    if let Some(path) = &output.mesh_ply {
        out.mesh.save_ply(path)?;
        println!("Mesh written to {}", path.display());
    }
    if let Some(path) = &output.wu_png {
        save_weight_map(&out.wu_map, path)?;
        println!("wu map written to {}", path.display());
    }
    if let Some(path) = &output.wv_png {
        save_weight_map(&out.wv_map, path)?;
        println!("wv map written to {}", path.display());
    }
    if let Some(path) = &output.report_json {
        write_json_file(path, &out.report)?;
        println!("JSON report written to {}", path.display());
    }
    Ok(())
}
