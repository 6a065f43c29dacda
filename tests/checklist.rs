use assert_fs::prelude::*;
use predicates::prelude::*;
use scenelint::resolver::SnapshotResolver;
use scenelint::{ChecklistRunner, Condition, document, presets};
use serde_json::json;

const RULES: &str = r#"[
    {
        "type": "folder",
        "name": "Render Settings",
        "enabled": true,
        "children": [
            {
                "type": "rule",
                "name": "Width",
                "enabled": true,
                "condition": { "type": "min_value", "maxscript_property": "renderWidth", "value": "1920" },
                "error_message": "Render width is below 1920",
                "fix_script": "renderWidth = 1920"
            },
            {
                "type": "rule",
                "name": "Output",
                "enabled": true,
                "condition": { "type": "property_not_empty", "maxscript_property": "rendOutputFilename", "value": "" },
                "error_message": "Render output path is not set",
                "fix_script": ""
            }
        ]
    },
    {
        "type": "folder",
        "name": "Lights",
        "enabled": false,
        "children": [
            {
                "type": "rule",
                "name": "Light count",
                "enabled": true,
                "condition": { "type": "max_value", "maxscript_property": "lights.count", "value": "2" },
                "error_message": "Too many lights",
                "fix_script": "delete lights"
            }
        ]
    },
    {
        "type": "rule",
        "name": "Renderable objects",
        "condition": { "type": "collection_property_all_match", "maxscript_property": "geometry", "value": "renderable" },
        "error_message": "Objects are not renderable",
        "fix_script": "for o in geometry do o.renderable = true"
    }
]"#;

fn scene() -> SnapshotResolver {
    SnapshotResolver::new(json!({
        "renderWidth": 1280,
        "rendOutputFilename": "",
        "lights": { "count": 9 },
        "geometry": [
            { "name": "Teapot001", "renderable": false },
            { "name": "Plane001", "renderable": true },
            { "name": "Sphere001", "renderable": false }
        ]
    }))
}

#[test]
fn test_run_and_fix_from_rule_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let rules = temp.child("rules.json");
    rules.write_str(RULES).unwrap();

    let tree = document::load(rules.path()).unwrap();
    let mut resolver = scene();

    let result = ChecklistRunner::new(&tree).run(&resolver).unwrap();
    let messages: Vec<_> = result.failures.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(
        messages,
        [
            "Render width is below 1920 (Value: 1280, Min: 1920)",
            "Render output path is not set",
            "Objects are not renderable: Teapot001, Sphere001",
        ]
    );
    assert_eq!(result.evaluated, 3);
    assert!(!resolver.lookups().iter().any(|p| p == "lights.count"));

    let report = ChecklistRunner::apply_fixes(&result.failures, &mut resolver);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(
        resolver.executed(),
        ["renderWidth = 1920", "for o in geometry do o.renderable = true"]
    );
}

#[test]
fn test_edit_save_and_reload() {
    let temp = assert_fs::TempDir::new().unwrap();
    let rules = temp.child("rules.json");
    rules.write_str(RULES).unwrap();

    let mut tree = document::load(rules.path()).unwrap();
    let render = tree.children(tree.root())[0];
    tree.set_focus(Some(render)).unwrap();
    tree.add_rule(
        None,
        "Height",
        Condition::MinValue {
            path: presets::resolve_target("Render Height"),
            threshold: "1080".to_string(),
        },
        "Render height is below 1080",
        "renderHeight = 1080",
    )
    .unwrap();
    assert!(tree.is_dirty());

    let saved = temp.child("saved.json");
    document::save(saved.path(), &mut tree).unwrap();
    assert!(!tree.is_dirty());
    saved.assert(predicate::str::contains("\"maxscript_property\": \"renderHeight\""));

    let reloaded = document::load(saved.path()).unwrap();
    assert_eq!(reloaded, tree);
    assert_eq!(reloaded.children(reloaded.children(reloaded.root())[0]).len(), 3);
}
