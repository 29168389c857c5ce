//! Unit tests for asset/mesh.rs

use std::fs;
use std::path::PathBuf;

use glam::{Vec2, Vec3};

use crate::asset::image::ImageData;
use crate::asset::mesh::Mesh;
use crate::asset::vertex::Vertex;
use crate::error::Error;

fn temp_obj(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("nebula3d_mesh_{}_{}.obj", name, std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

const TRIANGLE_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";

#[test]
fn test_unit_cube_topology() {
    let cube = Mesh::unit_cube();
    assert_eq!(cube.vertex_count(), 24);
    assert_eq!(cube.index_count(), 36);
    assert!(cube.texture().is_none());

    // Every index addresses a real vertex.
    assert!(cube.indices().iter().all(|&i| i < 24));

    // Each face contributes two triangles over its own four vertices.
    for face in 0..6u32 {
        let base = face * 4;
        let tris = &cube.indices()[(face * 6) as usize..(face * 6 + 6) as usize];
        assert!(tris.iter().all(|&i| i >= base && i < base + 4));
    }
}

#[test]
fn test_unit_cube_extents_and_normals() {
    let cube = Mesh::unit_cube();
    for v in cube.vertices() {
        assert!(v.position.abs().max_element() <= 0.5 + f32::EPSILON);
        // Normals are axis-aligned unit vectors.
        assert!((v.normal.length() - 1.0).abs() < 1e-6);
        assert_eq!(v.normal.abs().max_element(), 1.0);
    }
}

#[test]
fn test_load_obj_flips_v_coordinate() {
    let path = temp_obj("vflip", TRIANGLE_OBJ);
    let mesh = Mesh::load_obj(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.indices(), &[0, 1, 2]);

    // Source vt rows are (0,0), (1,0), (0,1); V is flipped for the
    // top-left texture origin.
    let uvs: Vec<Vec2> = mesh.vertices().iter().map(|v| v.uv).collect();
    assert_eq!(uvs, vec![Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 0.0)]);

    for v in mesh.vertices() {
        assert_eq!(v.normal, Vec3::Z);
    }
}

#[test]
fn test_load_obj_without_uvs_or_normals_falls_back_to_zero() {
    let path = temp_obj(
        "bare",
        "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\nf 1 2 3\n",
    );
    let mesh = Mesh::load_obj(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(mesh.vertex_count(), 3);
    for v in mesh.vertices() {
        assert_eq!(v.uv, Vec2::ZERO);
        assert_eq!(v.normal, Vec3::ZERO);
    }
}

#[test]
fn test_load_obj_missing_file_is_asset_error() {
    let err = Mesh::load_obj("no/such/mesh.obj").unwrap_err();
    assert!(matches!(err, Error::AssetLoadFailed(_)));
}

#[test]
fn test_set_texture() {
    let mut mesh = Mesh::new(
        vec![Vertex::new(Vec3::ZERO, Vec2::ZERO, Vec3::Z)],
        vec![0],
        None,
    );
    assert!(mesh.texture().is_none());
    mesh.set_texture(ImageData::solid([255, 255, 255, 255]));
    assert_eq!(mesh.texture().unwrap().width(), 1);
}
