//! Unit tests for asset/model.rs

use std::fs;
use std::path::PathBuf;

use crate::asset::mesh::Mesh;
use crate::asset::model::Model;
use crate::error::Error;

fn temp_obj(name: &str, contents: &str) -> PathBuf {
    let path =
        std::env::temp_dir().join(format!("nebula3d_model_{}_{}.obj", name, std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

const TWO_SHAPE_OBJ: &str = "\
o first
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
o second
v 0.0 0.0 1.0
v 1.0 0.0 1.0
v 0.0 1.0 1.0
v 1.0 1.0 1.0
f 4 5 6
f 6 5 7
";

#[test]
fn test_load_flattens_all_shapes() {
    let path = temp_obj("shapes", TWO_SHAPE_OBJ);
    let model = Model::load(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(model.mesh_count(), 2);
    assert_eq!(model.meshes()[0].index_count(), 3);
    assert_eq!(model.meshes()[1].index_count(), 6);
    // No MTL library, so nothing is textured.
    assert!(model.meshes().iter().all(|m| m.texture().is_none()));
}

#[test]
fn test_load_missing_file_is_asset_error() {
    let err = Model::load("no/such/model.obj").unwrap_err();
    assert!(matches!(err, Error::AssetLoadFailed(_)));
}

#[test]
fn test_load_empty_file_has_no_shapes() {
    let path = temp_obj("empty", "# nothing here\n");
    let result = Model::load(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(Error::AssetLoadFailed(_))));
}

#[test]
fn test_from_meshes() {
    let model = Model::from_meshes(vec![Mesh::unit_cube(), Mesh::unit_cube()]);
    assert_eq!(model.mesh_count(), 2);
    assert_eq!(model.meshes()[0].vertex_count(), 24);
}

#[test]
fn test_missing_texture_degrades_to_untextured() {
    let dir = std::env::temp_dir().join(format!("nebula3d_model_mtl_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("cube.mtl"),
        "newmtl painted\nmap_Kd does_not_exist.png\n",
    )
    .unwrap();
    let obj = dir.join("cube.obj");
    fs::write(
        &obj,
        "mtllib cube.mtl\nv 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\nusemtl painted\nf 1 2 3\n",
    )
    .unwrap();

    let model = Model::load(&obj).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert_eq!(model.mesh_count(), 1);
    assert!(model.meshes()[0].texture().is_none());
}
