mod common;

use bini::config::load_config;
use bini::image::io::{load_mask, load_normal_map, save_weight_map, write_json_file};
use bini::NormalIntegrator;
use common::synthetic_normals::plane_normals;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::fs;

#[test]
fn files_on_disk_drive_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let (w, h) = (10u32, 8u32);

    let normals = plane_normals(w as usize, h as usize, 0.2, 0.1);
    let mut rgb = RgbImage::new(w, h);
    for (x, y, px) in rgb.enumerate_pixels_mut() {
        let n = normals.get(x as usize, y as usize);
        *px = Rgb(n.map(|c| ((c + 1.0) / 2.0 * 255.0).round() as u8));
    }
    rgb.save(dir.path().join("normal.png")).unwrap();

    let mut mask = GrayImage::new(w, h);
    for (x, _, px) in mask.enumerate_pixels_mut() {
        *px = Luma([if x < 9 { 255 } else { 0 }]);
    }
    mask.save(dir.path().join("mask.png")).unwrap();

    let config_path = dir.path().join("run.json");
    fs::write(
        &config_path,
        r#"{
            "normal_map": "normal.png",
            "mask": "mask.png",
            "params": { "max_iter": 10 },
            "output": {
                "mesh_ply": "out/mesh.ply",
                "wu_png": "out/wu.png",
                "report_json": "out/report.json"
            }
        }"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let normals = load_normal_map(&config.normal_map).unwrap();
    let mask = load_mask(config.mask.as_ref().unwrap()).unwrap();
    assert_eq!(mask.count(), 9 * 8);

    let out = NormalIntegrator::new(config.params.clone())
        .run(&normals, &mask, &bini::Projection::Orthographic, None)
        .unwrap();
    assert!(out.termination.iterations() <= 10);

    let output = &config.output;
    out.mesh.save_ply(output.mesh_ply.as_ref().unwrap()).unwrap();
    save_weight_map(&out.wu_map, output.wu_png.as_ref().unwrap()).unwrap();
    write_json_file(output.report_json.as_ref().unwrap(), &out.report).unwrap();

    let ply = fs::read_to_string(dir.path().join("out/mesh.ply")).unwrap();
    assert!(ply.contains(&format!("element vertex {}", 9 * 8)));
    assert!(ply.contains(&format!("element face {}", 8 * 7)));

    let wu = image::open(dir.path().join("out/wu.png")).unwrap().into_luma8();
    assert_eq!(wu.get_pixel(9, 0).0[0], 255, "masked pixels are written white");

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(report["input"]["validPixels"], 72);
    assert_eq!(report["input"]["projection"], "orthographic");
    assert!(report["solver"]["energyTrace"].is_array());
}
