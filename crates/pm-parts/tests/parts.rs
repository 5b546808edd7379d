use glam::DVec3;
use pm_cad::{Containment, Modeler};
use pm_parts::recipes::{HingeLayout, HingeParams};
use pm_parts::{PartError, PartKind, build_part, build_part_named};
use serde_json::{Map, Value, json};

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn test_cutting_jig_holes_sit_on_the_grid() {
    let jig = build_part(PartKind::CuttingJig, &Map::new(), &Modeler::new())
        .unwrap()
        .into_single()
        .unwrap();
    let bbox = jig.bounding_box().unwrap();
    assert!((bbox.size().x - 79.365).abs() < 1e-9);
    assert!((bbox.min.x - 0.3175).abs() < 1e-9);

    let at = |x: f64| jig.classify(DVec3::new(x, 0.0, 5.0)).unwrap();
    assert_eq!(at(20.0), Containment::Outside);
    assert_eq!(at(60.0), Containment::Outside);
    assert_eq!(at(40.0), Containment::Inside);
}

#[test]
fn test_dowel_holder_with_a_thicker_bottom() {
    let map = params(json!({ "bottomThicknessInMm": 3.0 }));
    let plate = build_part_named("dowel-holder", &map, &Modeler::new())
        .unwrap()
        .into_single()
        .unwrap();
    assert!((plate.bounding_box().unwrap().size().z - 3.0).abs() < 1e-9);
}

#[test]
fn test_unknown_names_and_keys_are_rejected() {
    let modeler = Modeler::new();
    assert!(matches!(
        build_part_named("shelf", &Map::new(), &modeler),
        Err(PartError::UnknownPart(_))
    ));
    let map = params(json!({ "lengthInGrids": 2, "depthInMm": 4 }));
    assert!(matches!(
        build_part(PartKind::Beam, &map, &modeler),
        Err(PartError::InvalidParams(_))
    ));
}

#[test]
fn test_hinge_layout_for_more_knuckles() {
    let params = HingeParams {
        num_fasteners: 3,
        num_odd_knuckles: 2,
        ..Default::default()
    };
    let layout = HingeLayout::new(&params).unwrap();
    assert!((layout.leaf_height - 110.0).abs() < 1e-9);
    assert_eq!(layout.knuckle_count(), 5);

    let mut end = 0.0;
    for index in 0..layout.knuckle_count() {
        let (start, height) = layout.knuckle(index);
        if index > 0 {
            assert!((start - end - 0.4).abs() < 1e-9);
        }
        end = start + height;
    }
    assert!((end - layout.leaf_height).abs() < 1e-9);
}
