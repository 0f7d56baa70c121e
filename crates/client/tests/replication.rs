//! Integration tests for reference resolution and cross-server
//! replication against a mocked target server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fhirbridge_client::{replicate, FhirSession, TenantRequester, Transport};
use fhirbridge_domain::{Identifier, ResourceRecord, ResourceReference};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const MRN_SYSTEM: &str = "http://acme.test/mrn";

fn requester_for(server_uri: &str) -> TenantRequester {
    let transport = Transport::builder().no_proxy(true).build().expect("transport");
    let session = Arc::new(
        FhirSession::builder(server_uri, transport).bearer("target-token").build(),
    );
    TenantRequester::new(session, HashMap::new())
}

fn source_patient() -> ResourceRecord {
    ResourceRecord::from_value(json!({
        "resourceType": "Patient",
        "id": "source-1",
        "identifier": [{"system": MRN_SYSTEM, "value": "MRN-42"}],
        "name": [{"family": "Doe"}],
    }))
    .expect("source record")
}

fn empty_bundle() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"resourceType": "Bundle", "entry": []}))
}

#[tokio::test]
async fn replicating_a_new_resource_creates_without_an_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("identifier", "MRN-42"))
        .respond_with(empty_bundle())
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/Patient"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resourceType": "Patient",
            "id": "target-1",
            "identifier": [{"system": MRN_SYSTEM, "value": "MRN-42"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let target = requester_for(&server.uri());
    let saved = replicate(&source_patient(), &target, Some(MRN_SYSTEM)).await.expect("saved");
    assert_eq!(saved.id(), Some("target-1"));

    // The create payload must not carry the source server's id.
    let create = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|req| req.method.as_str() == "POST")
        .expect("create request");
    let body: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert!(body.get("id").is_none());
    assert_eq!(body["identifier"][0]["value"], "MRN-42");
}

#[tokio::test]
async fn replicating_twice_updates_the_same_target_record() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    // First lookup finds nothing; after the create, the same search finds
    // the stored record.
    let searches = Arc::new(AtomicUsize::new(0));
    let search_counter = searches.clone();
    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("identifier", "MRN-42"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            if search_counter.fetch_add(1, Ordering::SeqCst) == 0 {
                empty_bundle()
            } else {
                ResponseTemplate::new(200).set_body_json(json!({
                    "resourceType": "Bundle",
                    "entry": [{"resource": {
                        "resourceType": "Patient",
                        "id": "target-1",
                        "identifier": [{"system": MRN_SYSTEM, "value": "MRN-42"}],
                    }}],
                }))
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/Patient"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resourceType": "Patient",
            "id": "target-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/Patient/target-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "target-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let target = requester_for(&server.uri());
    let source = source_patient();

    let first = replicate(&source, &target, Some(MRN_SYSTEM)).await?;
    assert_eq!(first.id(), Some("target-1"));

    // Second run resolves the existing target id and goes down the update
    // path instead of creating a duplicate.
    let second = replicate(&source, &target, Some(MRN_SYSTEM)).await?;
    assert_eq!(second.id(), Some("target-1"));

    let update = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|req| req.method.as_str() == "PUT")
        .expect("update request");
    let body: serde_json::Value = serde_json::from_slice(&update.body)?;
    assert_eq!(body["id"], "target-1");
    Ok(())
}

#[tokio::test]
async fn replicating_without_identifier_url_always_creates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Patient"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resourceType": "Patient",
            "id": "target-2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let target = requester_for(&server.uri());
    let saved = replicate(&source_patient(), &target, None).await.expect("saved");
    assert_eq!(saved.id(), Some("target-2"));

    // No identifier lookup happened.
    let searches = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|req| req.method.as_str() == "GET")
        .count();
    assert_eq!(searches, 0);
}

#[tokio::test]
async fn identifier_reference_resolves_through_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("identifier", "MRN-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Patient", "id": "p1"}}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let requester = requester_for(&server.uri());
    let reference = ResourceReference::by_identifier(
        "Patient",
        Identifier::new(Some(MRN_SYSTEM.to_string()), "MRN-42"),
    );

    let resolved = requester.resolve_ref(Some(&reference), false).await.expect("resolved");
    assert_eq!(resolved.and_then(|r| r.id().map(str::to_string)).as_deref(), Some("p1"));
}

#[tokio::test]
async fn literal_reference_resolves_by_id_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .and(query_param("_id", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Patient", "id": "p1"}}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let requester = requester_for(&server.uri());
    let reference = ResourceReference::literal("Patient/p1");

    let resolved = requester.resolve_ref(Some(&reference), false).await.expect("resolved");
    assert!(resolved.is_some());
}

#[tokio::test]
async fn typed_terminals_deserialize_the_raw_field_map() {
    #[derive(serde::Deserialize)]
    struct SlimPatient {
        id: String,
    }

    #[derive(serde::Deserialize)]
    struct SlimEntry {
        resource: SlimPatient,
    }

    #[derive(serde::Deserialize)]
    struct SlimBundle {
        entry: Vec<SlimEntry>,
    }

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1"}},
                {"resource": {"resourceType": "Patient", "id": "p2"}},
            ],
        })))
        .mount(&server)
        .await;

    let requester = requester_for(&server.uri());
    let patients: Vec<SlimPatient> =
        requester.resource("Patient").search().fetch_as().await.expect("patients");
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0].id, "p1");

    let first: Option<SlimPatient> =
        requester.resource("Patient").search().first_as().await.expect("first");
    assert_eq!(first.map(|p| p.id).as_deref(), Some("p1"));

    // The whole bundle deserializes too, not just the entry resources.
    let bundle: SlimBundle =
        requester.resource("Patient").search().fetch_raw_as().await.expect("bundle");
    assert_eq!(bundle.entry.len(), 2);
    assert_eq!(bundle.entry[1].resource.id, "p2");
}

#[tokio::test]
async fn registered_adapter_rewrites_wrapped_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Patient"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Patient", "id": "p1"}}],
        })))
        .mount(&server)
        .await;

    let transport = Transport::builder().no_proxy(true).build().expect("transport");
    let session =
        Arc::new(FhirSession::builder(server.uri(), transport).bearer("tok").build());

    let mut adapters: HashMap<String, fhirbridge_client::RecordAdapter> = HashMap::new();
    adapters.insert(
        "Patient".to_string(),
        Arc::new(|mut record: ResourceRecord| {
            record.set("active", json!(true));
            record
        }),
    );

    let requester = TenantRequester::new(session, adapters);
    let found = requester.resource("Patient").search().first().await.expect("first");
    assert_eq!(found.and_then(|r| r.get("active").cloned()), Some(json!(true)));
}
