//! Engine scenario tests: full request flows against a scripted control
//! plane, covering the create/update/delete state machine, replacement
//! planning, attribute grouping, and custom lifecycle registration.

use caldera_core::{
    Action, Catalog, CoreError, Created, Disposition, Engine, Outcome, ProvisioningRequest,
    ResourceLifecycle, Status,
};
use caldera_remote::{MockApi, RemoteApi};
use caldera_schema::{parse_catalog_str, Args, StaticSchemaProvider};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

const CATALOG: &str = r#"
catalog_version = 1

[resources."Custom::KafkaCluster"]
service = "kafka"
not_found_error = "NotFoundException"
extra_permissions = ["network:DescribeSubnets"]

[resources."Custom::KafkaCluster".create]
name = "create_cluster"
physical_id_query = "ClusterArn"

[resources."Custom::KafkaCluster".read]
name = "describe_cluster"
physical_id_argument = "ClusterArn"
attributes_query = "ClusterInfo"

[resources."Custom::KafkaCluster".readiness]
query = "ClusterInfo.State"
expected_value = "ACTIVE"
failed_values = ["DELETING", "FAILED"]

[resources."Custom::KafkaCluster".delete]
name = "delete_cluster"
physical_id_argument = "ClusterArn"

[resources."Custom::TranscoderPipeline"]
service = "transcoder"
not_found_error = "ResourceNotFoundException"

[resources."Custom::TranscoderPipeline".create]
name = "create_pipeline"
physical_id_query = "Pipeline.Id"
attributes_query = "Pipeline"

[[resources."Custom::TranscoderPipeline".update]]
name = "update_pipeline"
physical_id_argument = "Id"
attributes_query = "Pipeline"

[[resources."Custom::TranscoderPipeline".update]]
name = "update_pipeline_status"
physical_id_argument = "Id"

[resources."Custom::TranscoderPipeline".read]
name = "read_pipeline"
physical_id_argument = "Id"
attributes_query = "Pipeline"

[resources."Custom::TranscoderPipeline".delete]
name = "delete_pipeline"
physical_id_argument = "Id"
"#;

const SCHEMAS: &str = r#"{
  "kafka.create_cluster": {
    "ClusterName": "string",
    "NumberOfBrokerNodes": "integer",
    "BrokerNodeGroupInfo": {
      "structure": {
        "StorageInfo": {
          "structure": { "EbsStorageInfo": { "structure": { "VolumeSize": "integer" } } }
        }
      }
    }
  },
  "kafka.describe_cluster": { "ClusterArn": "string" },
  "transcoder.create_pipeline": {
    "Name": "string",
    "InputBucket": "string",
    "OutputBucket": "string",
    "Role": "string",
    "Notifications": "string"
  },
  "transcoder.update_pipeline": {
    "Id": "string",
    "Name": "string",
    "InputBucket": "string",
    "Role": "string"
  },
  "transcoder.update_pipeline_status": { "Id": "string", "Status": "string" }
}"#;

fn engine_with(api: &Arc<MockApi>) -> Engine {
    let schemas = Arc::new(StaticSchemaProvider::from_json_str(SCHEMAS).unwrap());
    let catalog = Catalog::new(
        parse_catalog_str(CATALOG).unwrap(),
        Arc::clone(api) as Arc<dyn RemoteApi>,
        schemas,
    )
    .unwrap();
    Engine::new(catalog)
}

fn request(
    action: Action,
    resource_type: &str,
    properties: Value,
    old_properties: Option<Value>,
    physical_id: Option<&str>,
) -> ProvisioningRequest {
    let mut properties = properties.as_object().unwrap().clone();
    properties.insert("ServiceToken".to_owned(), json!("engine-address"));
    ProvisioningRequest {
        action,
        resource_type: resource_type.to_owned(),
        properties,
        old_properties: old_properties.map(|v| v.as_object().unwrap().clone()),
        physical_id: physical_id.map(str::to_owned),
        stack_id: "stack-1".to_owned(),
        request_id: "req-1".to_owned(),
        logical_resource_id: "MyResource".to_owned(),
        response_url: "https://callback.example/r".to_owned(),
    }
}

fn expect_done(disposition: Disposition) -> Outcome {
    match disposition {
        Disposition::Done(outcome) => outcome,
        Disposition::Suspended(_) => panic!("expected a terminal outcome"),
    }
}

// --- Create ---

#[test]
fn create_without_probe_succeeds_in_one_invocation() {
    let api = Arc::new(MockApi::new().with_response(
        "transcoder",
        "create_pipeline",
        json!({"Pipeline": {"Id": "p-1", "Status": "Active"}}),
    ));
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Create,
        "Custom::TranscoderPipeline",
        json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out"}),
        None,
        None,
    )));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.physical_id, "p-1");
    assert_eq!(outcome.data, json!({"Id": "p-1", "Status": "Active"}));
    // no readiness probe configured: the read operation is never called
    assert_eq!(api.invocation_count("transcoder", "read_pipeline"), 0);
}

#[test]
fn create_coerces_arguments_and_strips_service_token() {
    let api = Arc::new(
        MockApi::new()
            .with_response("kafka", "create_cluster", json!({"ClusterArn": "arn:c/1"}))
            .with_response("kafka", "describe_cluster", json!({"ClusterInfo": {"State": "ACTIVE"}})),
    );
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Create,
        "Custom::KafkaCluster",
        json!({
            "ClusterName": "x",
            "NumberOfBrokerNodes": "3",
            "BrokerNodeGroupInfo": {
                "StorageInfo": {"EbsStorageInfo": {"VolumeSize": "100"}}
            }
        }),
        None,
        None,
    )));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.physical_id, "arn:c/1");

    let create_call = &api.invocations()[0];
    assert_eq!(create_call.operation, "create_cluster");
    assert_eq!(create_call.args.get("NumberOfBrokerNodes"), Some(&json!(3)));
    assert_eq!(
        create_call.args["BrokerNodeGroupInfo"]["StorageInfo"]["EbsStorageInfo"]["VolumeSize"],
        json!(100)
    );
    assert!(!create_call.args.contains_key("ServiceToken"));
}

// --- Update planning ---

#[test]
fn update_of_replacement_required_property_recreates() {
    // InputBucket is updatable (update_pipeline), OutputBucket is create-only.
    let api = Arc::new(
        MockApi::new()
            .with_response("transcoder", "read_pipeline", json!({"Pipeline": {"Id": "p-1"}}))
            .with_response("transcoder", "create_pipeline", json!({"Pipeline": {"Id": "p-2"}})),
    );
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Update,
        "Custom::TranscoderPipeline",
        json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out2"}),
        Some(json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out"})),
        Some("p-1"),
    )));
    assert_eq!(outcome.status, Status::Success);
    // replacement produced a fresh instance; the controller will delete p-1
    assert_eq!(outcome.physical_id, "p-2");
    assert_eq!(api.invocation_count("transcoder", "create_pipeline"), 1);
    assert_eq!(api.invocation_count("transcoder", "update_pipeline"), 0);
    assert_eq!(api.invocation_count("transcoder", "update_pipeline_status"), 0);
}

#[test]
fn update_of_updatable_properties_groups_by_operation() {
    let api = Arc::new(
        MockApi::new()
            .with_response("transcoder", "read_pipeline", json!({"Pipeline": {"Id": "p-1"}}))
            .with_response(
                "transcoder",
                "update_pipeline",
                json!({"Pipeline": {"Id": "p-1", "Name": "clips2"}}),
            )
            .with_response("transcoder", "update_pipeline_status", json!({})),
    );
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Update,
        "Custom::TranscoderPipeline",
        json!({"Name": "clips2", "InputBucket": "in2", "OutputBucket": "out", "Status": "Paused"}),
        Some(json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out", "Status": "Active"})),
        Some("p-1"),
    )));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.physical_id, "p-1");

    // each distinct operation ran exactly once with its mapped attributes
    assert_eq!(api.invocation_count("transcoder", "update_pipeline"), 1);
    assert_eq!(api.invocation_count("transcoder", "update_pipeline_status"), 1);
    let calls = api.invocations();
    let pipeline_call = calls.iter().find(|c| c.operation == "update_pipeline").unwrap();
    assert_eq!(pipeline_call.args.get("Id"), Some(&json!("p-1")));
    assert_eq!(pipeline_call.args.get("Name"), Some(&json!("clips2")));
    assert_eq!(pipeline_call.args.get("InputBucket"), Some(&json!("in2")));
    assert!(!pipeline_call.args.contains_key("Status"));
    let status_call = calls.iter().find(|c| c.operation == "update_pipeline_status").unwrap();
    assert_eq!(status_call.args.get("Id"), Some(&json!("p-1")));
    assert_eq!(status_call.args.get("Status"), Some(&json!("Paused")));
}

#[test]
fn removed_attribute_is_reset_with_an_empty_value() {
    let api = Arc::new(
        MockApi::new()
            .with_response("transcoder", "read_pipeline", json!({"Pipeline": {"Id": "p-1"}}))
            .with_response("transcoder", "update_pipeline", json!({"Pipeline": {"Id": "p-1"}})),
    );
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Update,
        "Custom::TranscoderPipeline",
        json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out"}),
        Some(json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out", "Role": "arn:role"})),
        Some("p-1"),
    )));
    assert_eq!(outcome.status, Status::Success);

    let calls = api.invocations();
    let update_call = calls.iter().find(|c| c.operation == "update_pipeline").unwrap();
    assert_eq!(update_call.args.get("Role"), Some(&json!("")));
}

#[test]
fn update_with_unmapped_attribute_fails_without_remote_update_calls() {
    let api = Arc::new(
        MockApi::new()
            .with_response("transcoder", "read_pipeline", json!({"Pipeline": {"Id": "p-1"}})),
    );
    let engine = engine_with(&api);

    // "Mystery" appears in no operation schema at all, so it is neither
    // updatable nor replacement-required
    let outcome = expect_done(engine.handle(&request(
        Action::Update,
        "Custom::TranscoderPipeline",
        json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out", "Mystery": "y"}),
        Some(json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out"})),
        Some("p-1"),
    )));
    assert_eq!(outcome.status, Status::Failed);
    assert_eq!(outcome.reason.as_deref(), Some("invalid attribute: Mystery"));
    assert_eq!(api.invocation_count("transcoder", "update_pipeline"), 0);
    assert_eq!(api.invocation_count("transcoder", "update_pipeline_status"), 0);
}

#[test]
fn update_self_heals_when_resource_vanished() {
    let api = Arc::new(
        MockApi::new()
            .with_error("transcoder", "read_pipeline", "ResourceNotFoundException", "gone")
            .with_response("transcoder", "create_pipeline", json!({"Pipeline": {"Id": "p-9"}})),
    );
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Update,
        "Custom::TranscoderPipeline",
        json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out"}),
        Some(json!({"Name": "clips", "InputBucket": "in", "OutputBucket": "out"})),
        Some("p-1"),
    )));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.physical_id, "p-9");
    assert_eq!(api.invocation_count("transcoder", "create_pipeline"), 1);
}

// --- Delete ---

#[test]
fn delete_completes_when_resource_disappears() {
    let api = Arc::new(
        MockApi::new()
            .with_response("transcoder", "read_pipeline", json!({"Pipeline": {"Id": "p-1"}}))
            .with_error("transcoder", "read_pipeline", "ResourceNotFoundException", "gone")
            .with_response("transcoder", "delete_pipeline", json!({})),
    );
    let engine = engine_with(&api);

    let outcome = expect_done(engine.handle(&request(
        Action::Delete,
        "Custom::TranscoderPipeline",
        json!({}),
        None,
        Some("p-1"),
    )));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(api.invocation_count("transcoder", "delete_pipeline"), 1);
    assert_eq!(api.invocation_count("transcoder", "read_pipeline"), 2);
}

#[test]
fn async_delete_walks_through_wait_delete_to_success() {
    let api = Arc::new(
        MockApi::new()
            .with_response("kafka", "describe_cluster", json!({"ClusterInfo": {"State": "ACTIVE"}}))
            .with_response("kafka", "describe_cluster", json!({"ClusterInfo": {"State": "DELETING"}}))
            .with_not_found("kafka", "describe_cluster")
            .with_response("kafka", "delete_cluster", json!({})),
    );
    let engine = engine_with(&api);

    let delete = request(Action::Delete, "Custom::KafkaCluster", json!({}), None, Some("arn:c/1"));
    let first = engine.handle(&delete);
    let Disposition::Suspended(continuation) = first else {
        panic!("expected suspension, got {first:?}");
    };
    assert_eq!(continuation.action, Action::WaitDelete);

    // the delay workflow re-delivers the continuation; now the resource is gone
    let outcome = expect_done(engine.handle(&continuation));
    assert_eq!(outcome.status, Status::Success);
}

// --- Custom lifecycles ---

/// Lookup-style resource: "creating" it just resolves a search against the
/// remote API; there is nothing to update or tear down.
struct ImageLookup {
    api: Arc<dyn RemoteApi>,
}

impl ResourceLifecycle for ImageLookup {
    fn exists(&mut self, _physical_id: &str) -> Result<bool, CoreError> {
        Ok(true)
    }

    fn ready(&mut self, _physical_id: &str) -> Result<bool, CoreError> {
        Ok(true)
    }

    fn data(&mut self) -> Value {
        Value::Null
    }

    fn create(&mut self, args: &Args) -> Result<Created, CoreError> {
        let response = self.api.invoke("compute", "describe_images", args)?;
        let image_id = response
            .get("Images")
            .and_then(|images| images.get(0))
            .and_then(|image| image.get("ImageId"))
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::MissingPhysicalId {
                operation: "describe_images".to_owned(),
                query: "Images.0.ImageId".to_owned(),
            })?;
        Ok(Created {
            physical_id: image_id.to_owned(),
            attributes: Value::Null,
        })
    }

    fn can_update(&self, _old: &Args, _new: &Args, _diff: &BTreeSet<String>) -> bool {
        false
    }

    fn update(
        &mut self,
        _physical_id: &str,
        _old: &Args,
        _new: &Args,
        _diff: &BTreeSet<String>,
    ) -> Result<Value, CoreError> {
        Err(CoreError::NoUpdateOperation)
    }

    fn delete(&mut self, _physical_id: &str) -> Result<(), CoreError> {
        Ok(())
    }

    fn required_permissions(&self) -> Vec<String> {
        vec!["compute:DescribeImages".to_owned()]
    }
}

#[test]
fn custom_lifecycle_serves_lookup_resources() {
    let api = Arc::new(MockApi::new().with_response(
        "compute",
        "describe_images",
        json!({"Images": [{"ImageId": "img-42"}]}),
    ));
    let schemas = Arc::new(StaticSchemaProvider::new());
    let mut catalog = Catalog::new(
        parse_catalog_str("catalog_version = 1\n").unwrap(),
        Arc::clone(&api) as Arc<dyn RemoteApi>,
        schemas,
    )
    .unwrap();
    catalog.register_custom(
        "Custom::ImageLookup",
        Arc::new(|api| Box::new(ImageLookup { api })),
    );
    let engine = Engine::new(catalog);

    let outcome = expect_done(engine.handle(&request(
        Action::Create,
        "Custom::ImageLookup",
        json!({"Owner": "acme", "Name": "base-image-*"}),
        None,
        None,
    )));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.physical_id, "img-42");

    // can_update is always false for a lookup: changing the search terms
    // re-resolves a fresh result
    let updated = expect_done(engine.handle(&request(
        Action::Update,
        "Custom::ImageLookup",
        json!({"Owner": "acme", "Name": "base-image-2*"}),
        Some(json!({"Owner": "acme", "Name": "base-image-*"})),
        Some("img-42"),
    )));
    assert_eq!(updated.status, Status::Success);
    assert_eq!(api.invocation_count("compute", "describe_images"), 2);
}

// --- Permission manifest ---

#[test]
fn permission_manifest_covers_all_registered_resources() {
    let api = Arc::new(MockApi::new());
    let engine = engine_with(&api);

    let permissions = engine.catalog().required_permissions();
    for expected in [
        "kafka:CreateCluster",
        "kafka:DescribeCluster",
        "kafka:DeleteCluster",
        "network:DescribeSubnets",
        "transcoder:CreatePipeline",
        "transcoder:ReadPipeline",
        "transcoder:UpdatePipeline",
        "transcoder:UpdatePipelineStatus",
        "transcoder:DeletePipeline",
    ] {
        assert!(
            permissions.contains(&expected.to_owned()),
            "missing {expected} in {permissions:?}"
        );
    }
    let mut sorted = permissions.clone();
    sorted.sort();
    assert_eq!(permissions, sorted);
}
