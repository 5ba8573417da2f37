//! Whole-pipeline tests: formula text through sampling and both extractors

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use isoforge_mesh::prelude::*;
use isoforge_mesh::{GridLayout, Padding, write_obj};
use std::collections::HashSet;

const CENTER: Vec3 = Vec3::new(4.1, 3.9, 4.05);

fn sphere_generator() -> MeshGenerator {
    let mut formula = Formula::new("3 - dist(coords, v3(4.1, 3.9, 4.05))").with_parameters(["coords"]);
    MeshGenerator::from_formula(&mut formula).expect("sphere formula should compile")
}

fn request(algorithm: Algorithm) -> MeshRequest {
    MeshRequest::new(Vec3::ZERO, 8.0, 16).with_algorithm(algorithm)
}

fn position(buffers: &MeshBuffers, index: u32) -> Vec3 {
    Vec3::from_array(buffers.positions()[index as usize])
}

fn assert_faces_outward(buffers: &MeshBuffers, origin: Vec3) {
    let mut checked = 0;
    for tri in buffers.indices().chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| origin + position(buffers, i));
        let face = (b - a).cross(c - a);
        if face.length() < 1e-6 {
            continue;
        }
        let centroid = (a + b + c) / 3.0;
        assert!(face.dot(centroid - CENTER) > 0.0, "inward face at {}", centroid);
        checked += 1;
    }
    assert!(checked > 100);
}

#[test]
fn uniform_fields_produce_no_triangles() {
    for source in ["1", "-1", "0.5 + 0 * x(coords)"] {
        let mut formula = Formula::new(source).with_parameters(["coords"]);
        let generator = MeshGenerator::from_formula(&mut formula).unwrap();
        for algorithm in [Algorithm::MarchingCubes, Algorithm::DualContouring] {
            let mesh = generator.generate(&request(algorithm)).unwrap();
            assert!(mesh.buffers.is_empty(), "{} with {:?}", source, algorithm);
            assert_eq!(mesh.buffers.vertex_count(), 0);
        }
    }
}

#[test]
fn marching_cubes_faces_point_out_of_the_solid() {
    let mesh = sphere_generator().generate(&request(Algorithm::MarchingCubes)).unwrap();
    let buffers = &mesh.buffers;

    assert_eq!(buffers.vertex_count(), buffers.index_count());
    assert_faces_outward(buffers, Vec3::ZERO);

    // Flat shading: one normal per triangle
    for tri in buffers.normals().chunks_exact(3) {
        assert_eq!(tri[0], tri[1]);
        assert_eq!(tri[1], tri[2]);
    }
}

#[test]
fn dual_contouring_faces_and_normals_point_outward() {
    let mesh = sphere_generator().generate(&request(Algorithm::DualContouring)).unwrap();
    let buffers = &mesh.buffers;

    assert_faces_outward(buffers, Vec3::ZERO);
    for (p, n) in buffers.positions().iter().zip(buffers.normals()) {
        let outward = Vec3::from_array(*p) - CENTER;
        assert!(Vec3::from_array(*n).dot(outward) > 0.0);
    }
}

#[test]
fn dual_contouring_shares_lattice_vertices() {
    let mesh = sphere_generator().generate(&request(Algorithm::DualContouring)).unwrap();
    let buffers = &mesh.buffers;

    // Each lattice point owns one position, so no two vertices coincide
    let unique: HashSet<[u32; 3]> = buffers
        .positions()
        .iter()
        .map(|p| p.map(f32::to_bits))
        .collect();
    assert_eq!(unique.len(), buffers.vertex_count());

    // Every vertex is used, and by more than one triangle on average
    let referenced: HashSet<u32> = buffers.indices().iter().copied().collect();
    assert_eq!(referenced.len(), buffers.vertex_count());
    assert!(buffers.index_count() > 3 * buffers.vertex_count());
}

#[test]
fn indices_stay_in_range() {
    let generator = sphere_generator();
    for algorithm in [Algorithm::MarchingCubes, Algorithm::DualContouring] {
        let mesh = generator.generate(&request(algorithm).with_smoothing(true)).unwrap();
        let count = mesh.buffers.vertex_count() as u32;
        assert!(mesh.buffers.indices().iter().all(|&i| i < count));
    }
}

#[test]
fn smoothing_pulls_vertices_onto_the_surface() {
    let generator = sphere_generator();
    let rough = generator.generate(&request(Algorithm::DualContouring)).unwrap();
    let smooth = generator
        .generate(&request(Algorithm::DualContouring).with_smoothing(true))
        .unwrap();

    let error = |buffers: &MeshBuffers| -> f32 {
        let total: f32 = buffers
            .positions()
            .iter()
            .map(|p| (Vec3::from_array(*p).distance(CENTER) - 3.0).abs())
            .sum();
        total / buffers.vertex_count() as f32
    };

    assert_eq!(rough.buffers.index_count(), smooth.buffers.index_count());
    assert!(error(&smooth.buffers) < error(&rough.buffers));
    assert!(error(&smooth.buffers) < 0.06);
}

#[test]
fn regeneration_is_bit_identical() {
    let generator = sphere_generator();
    for request in [
        request(Algorithm::MarchingCubes),
        request(Algorithm::DualContouring),
        request(Algorithm::DualContouring).with_smoothing(true),
    ] {
        let first = generator.generate(&request).unwrap();
        let second = generator.generate(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.buffers.position_bytes(), second.buffers.position_bytes());
    }
}

#[test]
fn unused_capacity_is_zero_filled() {
    for algorithm in [Algorithm::MarchingCubes, Algorithm::DualContouring] {
        let mesh = sphere_generator().generate(&request(algorithm)).unwrap();
        let buffers = &mesh.buffers;

        assert_eq!(buffers.capacity(), request(algorithm).capacity());
        let vertex_bytes = buffers.vertex_count() * 12;
        assert!(buffers.position_bytes()[vertex_bytes..].iter().all(|&b| b == 0));
        assert!(buffers.normal_bytes()[vertex_bytes..].iter().all(|&b| b == 0));
        assert!(buffers.index_bytes()[buffers.index_count() * 4..].iter().all(|&b| b == 0));
    }
}

#[test]
fn reused_grid_matches_fresh_grid() {
    let generator = sphere_generator();
    let request = request(Algorithm::DualContouring);
    let mut grid = DensityGrid::new(GridLayout::new(16, Padding::Gradient));

    let fresh = generator.generate(&request).unwrap();
    let reused = generator.generate_with_grid(&request, &mut grid).unwrap();
    let again = generator.generate_with_grid(&request, &mut grid).unwrap();
    assert_eq!(fresh, reused);
    assert_eq!(reused, again);
}

#[test]
fn grid_index_mapping_is_a_bijection() {
    for voxel_side in [1, 4, 9] {
        GridLayout::new(voxel_side, Padding::None).assert_bijection();
        GridLayout::new(voxel_side, Padding::Gradient).assert_bijection();
    }
}

#[test]
fn batch_matches_individual_requests() {
    let generator = sphere_generator();
    let requests: Vec<MeshRequest> = (0..4)
        .map(|i| {
            MeshRequest::new(Vec3::new(i as f32 * 4.0 - 4.0, 0.0, 0.0), 8.0, 8)
                .with_algorithm(if i % 2 == 0 {
                    Algorithm::MarchingCubes
                } else {
                    Algorithm::DualContouring
                })
        })
        .collect();

    let batch = generator.generate_batch(&requests);
    assert_eq!(batch.len(), requests.len());
    for (request, result) in requests.iter().zip(batch) {
        assert_eq!(result.unwrap(), generator.generate(request).unwrap());
    }
}

#[test]
fn failed_edit_keeps_serving_previous_program() {
    let mut formula = Formula::new("3 - dist(coords, v3(4.1, 3.9, 4.05))").with_parameters(["coords"]);
    let generator = MeshGenerator::from_formula(&mut formula).unwrap();
    let before = generator.generate(&request(Algorithm::MarchingCubes)).unwrap();

    formula.source = "3 - dist(coords, ".into();
    assert!(generator.recompile(&mut formula).is_err());
    assert!(matches!(generator.live().status(), LiveStatus::Error(_)));

    let after = generator.generate(&request(Algorithm::MarchingCubes)).unwrap();
    assert_eq!(before, after);

    formula.source = "2 - dist(coords, v3(4.1, 3.9, 4.05))".into();
    let recompiled = generator.recompile(&mut formula).unwrap();
    let smaller = generator.generate(&request(Algorithm::MarchingCubes)).unwrap();
    assert_eq!(smaller.generation, recompiled.generation);
    assert!(smaller.buffers.triangle_count() < before.buffers.triangle_count());
}

#[test]
fn region_origin_offsets_sampling() {
    let generator = sphere_generator();
    // Region holding the +x half of the sphere only
    let request = MeshRequest::new(Vec3::new(4.0, 0.0, 0.0), 8.0, 16).with_algorithm(Algorithm::MarchingCubes);
    let mesh = generator.generate(&request).unwrap();

    assert!(!mesh.buffers.is_empty());
    assert_faces_outward(&mesh.buffers, request.origin);
}

#[test]
fn obj_export_lists_every_vertex_and_face() {
    let mesh = sphere_generator().generate(&request(Algorithm::DualContouring)).unwrap();
    let mut out = Vec::new();
    write_obj(&mesh.buffers, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), mesh.buffers.vertex_count());
    assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), mesh.buffers.vertex_count());
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), mesh.buffers.triangle_count());

    let path = std::env::temp_dir().join("isoforge_pipeline_test.obj");
    export_obj(&mesh.buffers, &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    std::fs::remove_file(&path).ok();
}

#[test]
fn demo_files_mesh() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
    let request: MeshRequest =
        MeshRequest::from_json(&std::fs::read_to_string(demos.join("region.json")).unwrap()).unwrap();

    for name in ["caves.json", "terrain.formula"] {
        let mut formula = Formula::load(demos.join(name)).expect(name);
        if formula.parameters().is_empty() {
            formula.set_parameters(["coords"]);
        }
        let generator = MeshGenerator::from_formula(&mut formula).expect(name);
        let mesh = generator.generate(&request.with_voxel_side(16)).unwrap();
        assert!(!mesh.buffers.is_empty(), "{}", name);
    }
}
