//! Validation requirement index against the storage fixture model

use shape_guard::graph::load_from_str;
use shape_guard::{ShapeId, ValidationIndex, ValidationOptions};

fn model() -> shape_guard::SchemaGraph {
    load_from_str(include_str!("fixtures/storage_v1.json"), "storage_v1.json").unwrap()
}

fn names(ids: &std::collections::BTreeSet<ShapeId>) -> Vec<&str> {
    ids.iter().map(|id| id.as_str()).collect()
}

#[test]
fn test_required_members_propagate_to_enclosing_containers() {
    let graph = model();
    let result = ValidationIndex::for_service(&graph, &ShapeId::from("S.Foo#Storage"), ValidationOptions::default());

    assert_eq!(names(&result.operations), vec!["S.Foo#PutObject"]);
    assert_eq!(
        names(&result.containers),
        vec!["S.Foo#Part", "S.Foo#PartList", "S.Foo#PutObjectInput"]
    );
    assert!(!result.requires_helper(&ShapeId::from("S.Foo#TagMap")));
    assert!(!result.requires_helper(&ShapeId::from("S.Foo#PutObjectOutput")));
}

#[test]
fn test_http_bindings_count_when_enabled() {
    let graph = model();
    let options = ValidationOptions {
        validate_http_bindings: true,
    };
    let result = ValidationIndex::for_service(&graph, &ShapeId::from("S.Foo#Storage"), options);

    assert_eq!(names(&result.operations), vec!["S.Foo#ListObjects", "S.Foo#PutObject"]);
    assert!(result.requires_helper(&ShapeId::from("S.Foo#ListObjectsInput")));
    assert_eq!(
        result.operation_for_input(&ShapeId::from("S.Foo#ListObjectsInput")),
        Some(&ShapeId::from("S.Foo#ListObjects"))
    );
}

#[test]
fn test_index_covers_every_service() {
    let graph = model();
    let index = ValidationIndex::new(&graph, ValidationOptions::default());
    let services: Vec<&str> = index.services().map(|s| s.service.as_str()).collect();
    assert_eq!(services, vec!["S.Foo#Storage"]);
    assert!(index.get(&ShapeId::from("S.Foo#Missing")).is_none());
}

#[test]
fn test_index_serializes_as_sorted_sets() {
    let graph = model();
    let result = ValidationIndex::for_service(&graph, &ShapeId::from("S.Foo#Storage"), ValidationOptions::default());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["operations"], serde_json::json!(["S.Foo#PutObject"]));
    assert_eq!(json["containers"][0], "S.Foo#Part");
}

#[test]
fn test_operations_bound_through_resources_are_indexed() {
    let doc = r#"{
        "shapes": {
            "ns#Svc": { "type": "service", "resources": [ { "target": "ns#Thing" } ] },
            "ns#Thing": {
                "type": "resource",
                "put": { "target": "ns#PutThing" },
                "list": { "target": "ns#ListThings" }
            },
            "ns#PutThing": { "type": "operation", "input": { "target": "ns#PutThingInput" } },
            "ns#ListThings": { "type": "operation", "input": { "target": "ns#ListThingsInput" } },
            "ns#PutThingInput": {
                "type": "structure",
                "traits": { "smithy.api#input": {} },
                "members": {
                    "id": { "target": "smithy.api#String", "traits": { "smithy.api#required": {} } }
                }
            },
            "ns#ListThingsInput": {
                "type": "structure",
                "members": { "token": { "target": "smithy.api#String" } }
            }
        }
    }"#;
    let graph = load_from_str(doc, "things.json").unwrap();
    let result = ValidationIndex::for_service(&graph, &ShapeId::from("ns#Svc"), ValidationOptions::default());

    assert_eq!(names(&result.operations), vec!["ns#PutThing"]);
    assert_eq!(names(&result.containers), vec!["ns#PutThingInput"]);
    assert_eq!(
        result.operation_for_input(&ShapeId::from("ns#ListThingsInput")),
        Some(&ShapeId::from("ns#ListThings"))
    );
}
