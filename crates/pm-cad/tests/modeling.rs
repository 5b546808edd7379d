use glam::{DVec2, DVec3};
use pm_cad::kernel::FilletGroup;
use pm_cad::{
    ArcSense, Containment, EdgeFilter, FilletErrorKind, FilletSpec, KernelError, ModelError,
    Modeler, PathBuilder, Plane, PlaneName, Solid, shapes,
};

fn xy() -> Plane {
    Plane::named(PlaneName::XY, 0.0)
}

fn drilled_plate(modeler: &Modeler) -> Solid {
    let plate = modeler
        .extrude(shapes::rectangle(20.0, 10.0).unwrap(), xy(), 2.0)
        .unwrap();
    let hole = modeler
        .extrude(
            shapes::circle(2.0).unwrap(),
            Plane::named(PlaneName::XY, -1.0),
            4.0,
        )
        .unwrap();
    plate.cut(hole).unwrap()
}

#[test]
fn test_drilled_plate() {
    let modeler = Modeler::new();
    let plate = drilled_plate(&modeler);
    assert_eq!(
        plate.classify(DVec3::new(0.0, 0.0, 1.0)).unwrap(),
        Containment::Outside
    );
    assert_eq!(
        plate.classify(DVec3::new(5.0, 0.0, 1.0)).unwrap(),
        Containment::Inside
    );

    let top = plate
        .select_edges(EdgeFilter::in_named_plane(PlaneName::XY, 2.0))
        .find()
        .unwrap();
    let bottom = plate
        .select_edges(EdgeFilter::in_named_plane(PlaneName::XY, 0.0))
        .count()
        .unwrap();
    // Four outer edges and the rim of the hole
    assert_eq!(top.len(), 5);
    assert_eq!(top.len(), bottom);
    assert!(top.iter().all(|e| e.points.iter().all(|p| (p.z - 2.0).abs() < 1e-9)));
}

#[test]
fn test_grouped_fillet_on_a_drilled_plate() {
    let modeler = Modeler::new();
    let plate = drilled_plate(&modeler);
    let spec = FilletSpec::new()
        .with(EdgeFilter::in_named_plane(PlaneName::XY, 2.0), 0.5)
        .with(EdgeFilter::All, 0.25);
    let corner = DVec3::new(9.9, 4.9, 1.9);
    let rim = DVec3::new(2.05, 0.0, 1.95);
    assert_eq!(plate.classify(corner).unwrap(), Containment::Inside);
    assert_eq!(plate.classify(rim).unwrap(), Containment::Inside);

    let rounded = plate.fillet(&spec).unwrap();
    assert!(rounded.edges().unwrap().iter().all(|e| e.smooth));
    assert_eq!(rounded.classify(corner).unwrap(), Containment::Outside);
    assert_eq!(rounded.classify(rim).unwrap(), Containment::Outside);
    let size = rounded.bounding_box().unwrap().size();
    assert!((size - DVec3::new(20.0, 10.0, 2.0)).abs().max_element() < 1e-6);
}

#[test]
fn test_fillet_wider_than_the_plate_fails() {
    let modeler = Modeler::new();
    let err = drilled_plate(&modeler).fillet_all(1.5).unwrap_err();
    match err {
        ModelError::Fillet(e) => {
            assert_eq!(e.group, Some(0));
            assert!(matches!(e.kind, FilletErrorKind::Infeasible { limit } if limit < 1.5));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_edges_of_another_solid_are_stale() {
    let modeler = Modeler::new();
    let first = drilled_plate(&modeler);
    let second = drilled_plate(&modeler);
    let foreign = first.select_edges(EdgeFilter::All).ids().unwrap();
    let err = modeler
        .kernel()
        .fillet(
            second.id(),
            &[FilletGroup {
                edges: foreign,
                radius: 0.1,
            }],
        )
        .unwrap_err();
    assert!(matches!(err, KernelError::StaleEdge { .. }));
}

#[test]
fn test_custom_corner_rounds_a_right_angle() {
    let profile = PathBuilder::new()
        .h_line(10.0)
        .custom_corner(2.0)
        .v_line(10.0)
        .h_line(-10.0)
        .close()
        .unwrap();
    let solid = Modeler::new().extrude(profile, xy(), 1.0).unwrap();
    assert_eq!(
        solid.classify(DVec3::new(9.9, 0.1, 0.5)).unwrap(),
        Containment::Outside
    );
    assert_eq!(
        solid.classify(DVec3::new(8.0, 2.0, 0.5)).unwrap(),
        Containment::Inside
    );
}

#[test]
fn test_half_ellipse_stadium() {
    let stadium = PathBuilder::at(DVec2::new(-5.0, -3.0))
        .h_line(10.0)
        .half_ellipse(0.0, 6.0, 3.0, ArcSense::CounterClockwise)
        .h_line(-10.0)
        .half_ellipse(0.0, -6.0, 3.0, ArcSense::CounterClockwise)
        .close()
        .unwrap();
    let solid = Modeler::new().extrude(stadium, xy(), 1.0).unwrap();
    let bbox = solid.bounding_box().unwrap();
    assert!((bbox.min.x + 8.0).abs() < 1e-9);
    assert!((bbox.max.x - 8.0).abs() < 1e-9);
    assert!((bbox.size().y - 6.0).abs() < 1e-9);
}
