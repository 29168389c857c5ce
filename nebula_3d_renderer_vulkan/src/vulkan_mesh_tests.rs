//! Unit tests for GPU mesh draw parameters

use crate::vulkan_mesh::draw_params;
use nebula_3d_renderer::nebula3d::asset::Mesh;

#[test]
fn test_draw_covers_whole_index_buffer_once() {
    // One instance, no offsets: the draw consumes every index exactly once.
    assert_eq!(draw_params(36), (36, 1, 0, 0, 0));
    assert_eq!(draw_params(3), (3, 1, 0, 0, 0));
}

#[test]
fn test_unit_cube_draws_twelve_triangles() {
    let cube = Mesh::unit_cube();
    let (index_count, instance_count, first_index, vertex_offset, first_instance) =
        draw_params(cube.index_count());
    assert_eq!(index_count, 36);
    assert_eq!(instance_count, 1);
    assert_eq!(first_index, 0);
    assert_eq!(vertex_offset, 0);
    assert_eq!(first_instance, 0);
}
