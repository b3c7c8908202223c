// Small meshes with fixed, known-good geometry for testing.
// Construction can't fail for these inputs, hence the `expect`s.

use ndarray as nd;
use ndarray::ShapeBuilder;

use super::{CurvilinearMesh, TensorMesh};

/// A 3x2 tensor mesh covering `[0, 3] x [0, 2]`,
/// uniform along x and graded along y.
pub fn tiny_tensor_mesh_2d() -> TensorMesh {
    TensorMesh::builder()
        .h(vec![vec![1.0, 1.0, 1.0], vec![0.5, 1.5]])
        .build()
        .expect("tiny 2D tensor mesh is valid")
}

/// A 3x2x3 tensor mesh covering `[0, 2] x [0, 1.5] x [0, 2]`
/// with a different width for nearly every cell.
pub fn tiny_tensor_mesh_3d() -> TensorMesh {
    TensorMesh::builder()
        .h(vec![
            vec![0.5, 0.5, 1.0],
            vec![1.0, 0.5],
            vec![0.25, 0.75, 1.0],
        ])
        .build()
        .expect("tiny 3D tensor mesh is valid")
}

/// A 3x2 mesh of trapezoids whose columns spread apart along y,
/// symmetric about `x = 1.5`.
pub fn tiny_curvilinear_mesh_2d() -> CurvilinearMesh {
    let shape = nd::IxDyn(&[4, 3]);
    let x = nd::ArrayD::from_shape_fn(shape.clone().f(), |idx| {
        let (i, j) = (idx[0] as f64, idx[1] as f64);
        // spread the columns out from the center as j grows
        (i - 1.5) * (1.0 + 0.25 * j * j) + 1.5
    });
    let y = nd::ArrayD::from_shape_fn(shape.f(), |idx| idx[1] as f64);
    CurvilinearMesh::new(vec![x, y]).expect("tiny 2D curvilinear mesh is valid")
}

/// A 2x2x2 mesh of unit-volume parallelepipeds,
/// sheared along x as z grows.
pub fn tiny_curvilinear_mesh_3d() -> CurvilinearMesh {
    let shape = nd::IxDyn(&[3, 3, 3]);
    let x = nd::ArrayD::from_shape_fn(shape.clone().f(), |idx| {
        idx[0] as f64 + 0.25 * idx[2] as f64
    });
    let y = nd::ArrayD::from_shape_fn(shape.clone().f(), |idx| idx[1] as f64);
    let z = nd::ArrayD::from_shape_fn(shape.f(), |idx| idx[2] as f64);
    CurvilinearMesh::new(vec![x, y, z]).expect("tiny 3D curvilinear mesh is valid")
}
