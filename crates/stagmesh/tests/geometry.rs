//! Properties every mesh should have, checked through the public API
//! on both mesh kinds.

use approx::assert_relative_eq;
use stagmesh::{
    mesh::{
        tiny_curvilinear_mesh_2d, tiny_curvilinear_mesh_3d, tiny_tensor_mesh_2d,
        tiny_tensor_mesh_3d,
    },
    na, nd, ElementKind, Format, GridSource, Inversion, Location, OperatorBuilder, TensorMesh,
};

fn meshes() -> Vec<(&'static str, Box<dyn GridSource>)> {
    vec![
        ("tensor 2d", Box::new(tiny_tensor_mesh_2d()) as Box<dyn GridSource>),
        ("tensor 3d", Box::new(tiny_tensor_mesh_3d())),
        ("curvilinear 2d", Box::new(tiny_curvilinear_mesh_2d())),
        ("curvilinear 3d", Box::new(tiny_curvilinear_mesh_3d())),
    ]
}

#[test]
fn grids_have_one_row_per_element() {
    for (name, mesh) in meshes() {
        let topo = mesh.topology();
        for loc in Location::ALL {
            match (mesh.grid(loc), topo.location_count(loc)) {
                (Ok(grid), Some(count)) => {
                    assert_eq!(grid.nrows(), count, "{name}: {loc}");
                    assert_eq!(grid.ncols(), topo.dim(), "{name}: {loc}");
                }
                (Err(_), None) => {}
                (grid, count) => panic!(
                    "{name}: {loc} grid {:?} disagrees with count {count:?}",
                    grid.map(|g| g.nrows())
                ),
            }
        }
    }
}

#[test]
fn measures_are_consistent() {
    for (name, mesh) in meshes() {
        let topo = mesh.topology();
        assert_eq!(mesh.cell_volumes().len(), topo.cell_count(), "{name}");
        assert!(mesh.cell_volumes().iter().all(|&v| v > 0.0), "{name}");
        assert_eq!(mesh.face_areas().len(), topo.face_count(), "{name}");
        assert_eq!(mesh.edge_lengths().len(), topo.edge_count(), "{name}");
        assert_eq!(
            mesh.face_normals().shape(),
            (topo.face_count(), topo.dim()),
            "{name}"
        );
        for row in mesh.face_normals().row_iter() {
            assert_relative_eq!(row.norm(), 1.0, epsilon = 1e-12);
        }
        for row in mesh.edge_tangents().row_iter() {
            assert_relative_eq!(row.norm(), 1.0, epsilon = 1e-12);
        }
        assert_eq!(mesh.origin().len(), topo.dim(), "{name}");
        assert!(!mesh.is_rotated(), "{name}");
    }
}

#[test]
fn total_volumes() {
    let tensor = tiny_tensor_mesh_3d();
    assert_relative_eq!(tensor.cell_volumes().sum(), 2.0 * 1.5 * 2.0, epsilon = 1e-12);
    // two trapezoidal strips with widths 3 -> 3.75 -> 6
    let curvi = tiny_curvilinear_mesh_2d();
    assert_relative_eq!(curvi.cell_volumes().sum(), 3.375 + 4.875, epsilon = 1e-12);
    let sheared = tiny_curvilinear_mesh_3d();
    assert_relative_eq!(sheared.cell_volumes().sum(), 8.0, epsilon = 1e-12);
}

#[test]
fn unit_inner_product_distributes_volume() {
    // every cell shares its volume among the faces (edges) of each component,
    // so the diagonal sums to dim times the total volume
    for (name, mesh) in meshes() {
        let ops = OperatorBuilder::new(mesh.as_ref());
        let total = mesh.cell_volumes().sum() * mesh.topology().dim() as f64;
        for kind in [ElementKind::Face, ElementKind::Edge] {
            let m = ops
                .inner_product(kind, None, Inversion::NONE)
                .unwrap()
                .unwrap();
            assert_relative_eq!(m.diagonal().sum(), total, epsilon = 1e-10);
            assert!(m.diagonal().iter().all(|&d| d > 0.0), "{name}: {kind:?}");

            let inv = ops
                .inner_product(kind, None, Inversion::MATRIX)
                .unwrap()
                .unwrap();
            for (a, b) in m.diagonal().iter().zip(inv.diagonal().iter()) {
                assert_relative_eq!(a * b, 1.0, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn node_grid_reshapes_to_axis_arrays() {
    let mesh = tiny_tensor_mesh_2d();
    let topo = mesh.topology();
    let grid = mesh.grid(Location::Nodes).unwrap();
    let arrays = topo
        .reshape_columns(grid, Location::Nodes, Location::Nodes, Format::Matrix)
        .unwrap();
    assert_eq!(arrays.len(), 2);

    let x = arrays[0].as_matrix().unwrap();
    assert_eq!(x.shape(), topo.node_shape().as_slice());
    let xs = mesh.node_vector(0).unwrap();
    let ys = mesh.node_vector(1).unwrap();
    for i in 0..xs.len() {
        for j in 0..ys.len() {
            assert_eq!(x[nd::IxDyn(&[i, j])], xs[i]);
            assert_eq!(arrays[1].as_matrix().unwrap()[nd::IxDyn(&[i, j])], ys[j]);
        }
    }
    // and back again
    let flat = arrays[0].clone().into_vector();
    assert_eq!(flat, grid.column(0).into_owned());

    let faces = na::DVector::from_fn(topo.face_count(), |i, _| i as f64);
    let parts = topo
        .reshape(&faces, Location::Faces, Location::Faces, Format::Vector)
        .unwrap();
    assert_eq!(parts.len(), 2);
    let fy = parts[1].clone().into_vector();
    assert_eq!(fy.len(), topo.face_count_axis(1).unwrap());
    assert_eq!(fy[0], topo.face_count_axis(0).unwrap() as f64);
}

#[test]
fn interpolation_reproduces_linear_fields() {
    let mesh = tiny_tensor_mesh_3d();
    let topo = mesh.topology();
    let linear = |p: na::RowDVector<f64>| 1.0 + 2.0 * p[0] - p[1] + 0.5 * p[2];
    let sample = |loc| {
        let grid = mesh.grid(loc).unwrap();
        na::DVector::from_iterator(grid.nrows(), grid.row_iter().map(|r| linear(r.into_owned())))
    };
    let points = na::DMatrix::from_row_slice(3, 3, &[0.5, 0.8, 0.3, 1.2, 1.0, 1.0, 0.3, 0.6, 0.2]);
    let expected = na::DVector::from_iterator(3, points.row_iter().map(|p| linear(p.into_owned())));

    for loc in [Location::Nodes, Location::CellCenters] {
        let interp = mesh.interpolation_matrix(&points, loc, false).unwrap();
        assert_relative_eq!(&interp * &sample(loc), expected.clone(), epsilon = 1e-12);
    }

    // components act on the whole stacked face vector
    let fy = mesh
        .interpolation_matrix(&points, Location::FacesY, false)
        .unwrap();
    assert_eq!(fy.ncols(), topo.face_count());
    let mut faces = na::DVector::zeros(topo.face_count());
    let n_fx = topo.face_count_axis(0).unwrap();
    let fy_values = sample(Location::FacesY);
    faces.rows_mut(n_fx, fy_values.len()).copy_from(&fy_values);
    assert_relative_eq!(&fy * &faces, expected, epsilon = 1e-12);

    assert!(mesh
        .interpolation_matrix(&points, Location::Faces, false)
        .is_err());
}

#[test]
fn points_outside_are_reported() {
    let mesh = TensorMesh::builder()
        .h(vec![vec![1.0, 1.0], vec![1.0]])
        .build()
        .unwrap();
    let points = na::DMatrix::from_row_slice(3, 2, &[0.5, 0.5, 2.5, 0.5, 1.0, 1.0]);
    let inside = mesh.is_inside(&points, Location::Nodes).unwrap();
    assert!(inside.contains(0));
    assert!(!inside.contains(1));
    assert!(inside.contains(2));

    match mesh.interpolation_matrix(&points, Location::CellCenters, false) {
        Err(stagmesh::MeshError::OutOfDomain { count, first_index }) => {
            assert_eq!((count, first_index), (1, 1));
        }
        other => panic!("expected an out-of-domain error, got {other:?}"),
    }
    let lenient = mesh
        .interpolation_matrix(&points, Location::CellCenters, true)
        .unwrap();
    assert_eq!(lenient.nrows(), 3);
    assert_eq!(lenient.row(1).nnz(), 0);
}
