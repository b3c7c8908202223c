//! Building meshes from serialized fields.

use approx::assert_relative_eq;
use stagmesh::{
    mesh::{tiny_curvilinear_mesh_2d, tiny_tensor_mesh_3d},
    AnyMesh, CoordinateSystem, GridSource, Location, MeshError, MeshFields, TensorMesh,
};

fn json_round_trip(mesh: &AnyMesh) -> AnyMesh {
    let json = serde_json::to_string(&mesh.to_fields()).unwrap();
    let fields: MeshFields = serde_json::from_str(&json).unwrap();
    fields.build().unwrap()
}

fn assert_same_mesh(a: &AnyMesh, b: &AnyMesh) {
    assert_eq!(a.topology(), b.topology());
    assert_eq!(a.origin(), b.origin());
    assert_eq!(a.coordinate_system(), b.coordinate_system());
    assert_eq!(a.reference_frame(), b.reference_frame());
    for loc in [Location::Nodes, Location::CellCenters, Location::Faces] {
        assert_eq!(a.grid(loc).unwrap(), b.grid(loc).unwrap());
    }
    assert_relative_eq!(a.cell_volumes(), b.cell_volumes());
}

#[test]
fn tensor_mesh_survives_json() {
    let mesh = AnyMesh::from(tiny_tensor_mesh_3d());
    let rebuilt = json_round_trip(&mesh);
    assert!(rebuilt.as_tensor().is_some());
    assert_same_mesh(&mesh, &rebuilt);
}

#[test]
fn curvilinear_mesh_survives_json() {
    let mesh = AnyMesh::from(tiny_curvilinear_mesh_2d());
    let rebuilt = json_round_trip(&mesh);
    assert!(rebuilt.as_curvilinear().is_some());
    assert_same_mesh(&mesh, &rebuilt);
    assert_eq!(
        rebuilt.as_curvilinear().unwrap().nodes(),
        mesh.as_curvilinear().unwrap().nodes()
    );
}

#[test]
fn handwritten_json() {
    let json = r#"{
        "h": [[1.0, 1.0, 2.0], [0.5, 0.5]],
        "origin": ["C", "N"],
        "coordinate_system": "CYL"
    }"#;
    let fields: MeshFields = serde_json::from_str(json).unwrap();
    let mesh = fields.build().unwrap();
    assert_eq!(mesh.origin(), &[-2.0, -1.0]);
    assert_eq!(mesh.coordinate_system(), CoordinateSystem::Cylindrical);
    assert_eq!(mesh.shape(), &[3, 2]);
    assert!(!mesh.is_rotated());
}

#[test]
fn invalid_fields_report_every_problem() {
    let json = r#"{
        "h": [[1.0, 0.0]],
        "axis_u": [1.0, 0.0, 0.0],
        "axis_v": [1.0, 0.0, 0.0],
        "coordinate_system": "polar"
    }"#;
    let fields: MeshFields = serde_json::from_str(json).unwrap();
    let errors = fields.build().unwrap_err();
    assert!(matches!(
        errors.for_field("coordinate_system"),
        Some(MeshError::Geometry(_))
    ));
    assert!(matches!(errors.for_field("h"), Some(MeshError::Geometry(_))));
    assert!(matches!(
        errors.for_field("reference_frame"),
        Some(MeshError::Geometry(_))
    ));
    assert_eq!(errors.errors().len(), 3);

    // unknown anchors don't deserialize at all
    assert!(serde_json::from_str::<MeshFields>(r#"{"origin": ["X"]}"#).is_err());
}

#[test]
fn rotated_frame() {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let mesh = TensorMesh::builder()
        .h(vec![vec![1.0], vec![1.0], vec![1.0]])
        .axis_u([1.0, 1.0, 0.0])
        .axis_v([-1.0, 1.0, 0.0])
        .build()
        .unwrap();
    assert!(mesh.is_rotated());
    let rot = mesh.rotation_matrix();
    assert_relative_eq!(rot[(0, 0)], s, epsilon = 1e-12);
    assert_relative_eq!(rot[(1, 0)], -s, epsilon = 1e-12);
    assert_relative_eq!(rot[(2, 2)], 1.0, epsilon = 1e-12);

    let rebuilt = json_round_trip(&AnyMesh::from(mesh));
    assert!(rebuilt.is_rotated());
}
