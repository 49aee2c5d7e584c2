//! End-to-end tests over the public instance surface: a creation defined in
//! JSON, instantiated, and driven through ticks.

use creation_vars::creation::{CreationDefinition, CreationInstance};
use creation_vars::diagnostics::IssueKind;
use creation_vars::value::Value;
use glam::Vec3;

const TOL: f32 = 1e-4;

fn rig() -> CreationInstance {
    let def: CreationDefinition = serde_json::from_str(
        r#"{
            "name": "rig",
            "nodes": [
                { "name": "arm", "position": [1.0, 0.0, 0.0] },
                {
                    "name": "hand",
                    "parent": "arm",
                    "position": [0.0, 2.0, 0.0],
                    "follow": { "target": "arm", "weight": 0.25, "offset": [0.0, 0.1, 0.0] }
                }
            ],
            "variables": [
                {
                    "name": "armTip",
                    "type": "PositionRoot",
                    "objectLink": "arm",
                    "memberLink": "transform.position",
                    "conversionMethod": "RootToWorld"
                },
                {
                    "name": "grip",
                    "type": "Double",
                    "defaultValue": 0.5
                },
                {
                    "name": "pulse",
                    "type": "Double",
                    "driverScript": "pulse += 1.0;"
                },
                {
                    "name": "ghostAim",
                    "type": "PositionWorld",
                    "objectLink": "no_such_node"
                },
                {
                    "name": "handVisible",
                    "type": "Bool",
                    "objectLink": "hand",
                    "memberLink": "visible"
                }
            ]
        }"#,
    )
    .unwrap();
    CreationInstance::instantiate(&def)
}

fn assert_vec3_near(v: &Value, expected: Vec3) {
    let got = match v {
        Value::Vec3(v) => *v,
        other => panic!("expected Vec3, got {other:?}"),
    };
    assert!((got - expected).length() < TOL, "{got} vs {expected}");
}

#[test]
fn root_offset_reads_world_and_writes_raw() {
    let mut inst = rig();
    let root = inst.root();

    // Before root motion, raw and world coincide.
    assert_vec3_near(&inst.get("armTip").unwrap(), Vec3::new(1.0, 0.0, 0.0));

    // Move the whole creation to world (10,0,0): the variable reads the
    // node's raw (1,0,0) as world (11,0,0).
    inst.scene_mut().get_mut(root).unwrap().transform.position = Vec3::new(10.0, 0.0, 0.0);
    assert_vec3_near(&inst.get("armTip").unwrap(), Vec3::new(11.0, 0.0, 0.0));

    // Writing the same world position back leaves the raw member untouched.
    assert!(inst.set("armTip", Value::Vec3(Vec3::new(11.0, 0.0, 0.0))));
    let arm = inst.scene().find_by_path(root, "arm").unwrap();
    assert!(
        (inst.scene().get(arm).unwrap().transform.position - Vec3::new(1.0, 0.0, 0.0)).length()
            < TOL
    );

    // Writing world (12,0,0) lands at raw (2,0,0).
    assert!(inst.set("armTip", Value::Vec3(Vec3::new(12.0, 0.0, 0.0))));
    assert!(
        (inst.scene().get(arm).unwrap().transform.position - Vec3::new(2.0, 0.0, 0.0)).length()
            < TOL
    );
}

#[test]
fn stored_variable_defaults_and_change_tracking() {
    let mut inst = rig();
    assert_eq!(inst.get("grip"), Some(Value::Double(0.5)));

    assert!(inst.set("grip", Value::Double(0.9)));
    assert_eq!(inst.get("grip"), Some(Value::Double(0.9)));
    let var = inst.variable("grip").unwrap();
    assert!(var.changed());
    assert_eq!(var.previous_value(), &Value::Double(0.5));

    // A read that observes no change clears the flag.
    inst.get("grip");
    assert!(!inst.variable("grip").unwrap().changed());
}

#[test]
fn driver_is_read_only_and_memoized_per_tick() {
    let mut inst = rig();
    assert!(inst.variable("pulse").unwrap().read_only());

    inst.advance_tick();
    assert_eq!(inst.get("pulse"), Some(Value::Double(1.0)));
    // Second read on the same tick does not re-run the script.
    assert_eq!(inst.get("pulse"), Some(Value::Double(1.0)));

    // Writes to a driven variable are dropped.
    assert!(!inst.set("pulse", Value::Double(50.0)));
    assert_eq!(inst.get("pulse"), Some(Value::Double(1.0)));

    inst.advance_tick();
    assert_eq!(inst.get("pulse"), Some(Value::Double(2.0)));
}

#[test]
fn missing_node_variable_is_inert_with_diagnostic() {
    let mut inst = rig();
    assert!(inst.variable("ghostAim").unwrap().is_inert());
    assert!(inst
        .issues()
        .iter()
        .any(|i| i.kind == IssueKind::MissingNode && i.variable == "ghostAim"));

    // Neutral reads, dropped writes, forever.
    assert_eq!(inst.get("ghostAim"), Some(Value::Vec3(Vec3::ZERO)));
    assert!(!inst.set("ghostAim", Value::Vec3(Vec3::ONE)));
    assert_eq!(inst.get("ghostAim"), Some(Value::Vec3(Vec3::ZERO)));
}

#[test]
fn bool_member_variable_reads_and_writes_through() {
    let mut inst = rig();
    assert_eq!(inst.get("handVisible"), Some(Value::Bool(true)));

    assert!(inst.set("handVisible", Value::Bool(false)));
    assert_eq!(inst.get("handVisible"), Some(Value::Bool(false)));

    let hand = inst.scene().find_by_path(inst.root(), "hand").unwrap();
    assert!(!inst.scene().get(hand).unwrap().visible);
}

#[test]
fn follow_component_is_wired_from_the_definition() {
    let inst = rig();
    let root = inst.root();
    let arm = inst.scene().find_by_path(root, "arm").unwrap();
    let hand = inst.scene().find_by_path(root, "hand").unwrap();

    let follow = &inst.scene().get(hand).unwrap().follow;
    assert_eq!(follow.target, Some(arm));
    assert_eq!(follow.weight, 0.25);
    assert!((follow.offset - Vec3::new(0.0, 0.1, 0.0)).length() < TOL);
}

#[test]
fn driver_failure_keeps_previous_value_and_reports() {
    let def: CreationDefinition = serde_json::from_str(
        r#"{
            "name": "rig",
            "nodes": [],
            "variables": [
                { "name": "flaky", "type": "Double", "driverScript": "flaky = boom();" }
            ]
        }"#,
    )
    .unwrap();
    let mut inst = CreationInstance::instantiate(&def);
    assert!(inst.issues().is_empty());

    inst.advance_tick();
    assert_eq!(inst.get("flaky"), Some(Value::Double(0.0)));
    assert!(inst
        .issues()
        .iter()
        .any(|i| i.kind == IssueKind::DriverRuntime));
}
