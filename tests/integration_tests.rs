//! Integration tests using wiremock to simulate HTTP servers.

use courier::codec::Resource;
use courier::config::{add_header_decorator, set_retries};
use courier::header::static_header;
use courier::provider::{filter, provider, slice_provider};
use courier::tenant::{self, tenant_header_decorator, Tenant};
use courier::tracecontext::{span_header_decorator, trace_context_propagator};
use courier::{Client, Error};
use opentelemetry::trace::{
    SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState,
};
use opentelemetry::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Item {
    name: String,
    quantity: u32,
}

fn item_resource(id: &str, name: &str, quantity: u32) -> serde_json::Value {
    json!({
        "type": "items",
        "id": id,
        "attributes": {"name": name, "quantity": quantity}
    })
}

fn client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(format!("{}/api/", server.uri()))
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": item_resource("1", "widget", 3)}))
                .insert_header("x-custom-header", "custom-value"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client(&mock_server)
        .get::<Resource<Item>>("items/1")
        .send()
        .await
        .unwrap();

    assert_eq!(response.data.id.as_deref(), Some("1"));
    assert_eq!(response.data.attributes.name, "widget");
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
    assert!(response.raw_body.contains("widget"));
    assert_eq!(response.header("x-custom-header"), Some("custom-value"));
}

#[tokio::test]
async fn test_bad_request_and_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/items/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);

    let result = client
        .get::<Resource<Item>>("items/bad")
        .configure(set_retries(3))
        .execute()
        .await;
    assert!(matches!(result, Err(Error::BadRequest)), "got {:?}", result);

    let result = client
        .get::<Resource<Item>>("items/missing")
        .configure(set_retries(3))
        .execute()
        .await;
    assert!(matches!(result, Err(Error::NotFound)), "got {:?}", result);
}

#[tokio::test]
async fn test_server_error_is_unknown_status_and_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server)
        .get::<Resource<Item>>("items/1")
        .configure(set_retries(3))
        .execute()
        .await;

    match result {
        Err(Error::UnknownStatus {
            status,
            raw_response,
        }) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(raw_response, "Service unavailable");
        }
        _ => panic!("Expected UnknownStatus, got {:?}", result),
    }
}

#[tokio::test]
async fn test_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server)
        .get::<Resource<Item>>("items/1")
        .execute()
        .await;

    match result {
        Err(Error::Decode {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
        }
        _ => panic!("Expected Decode, got {:?}", result),
    }
}

#[tokio::test]
async fn test_post_sends_json_api_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(body_json(json!({
            "data": {"type": "items", "attributes": {"name": "widget", "quantity": 3}}
        })))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"data": item_resource("9", "widget", 3)})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = Resource::new(
        "items",
        Item {
            name: "widget".to_string(),
            quantity: 3,
        },
    );

    let created = client(&mock_server)
        .post::<Resource<Item>, _>("items", body)
        .execute()
        .await
        .unwrap();

    assert_eq!(created.id.as_deref(), Some("9"));
}

#[tokio::test]
async fn test_writes_with_empty_bodies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/items/1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/items/1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);

    let created = client
        .post::<Resource<Item>, _>("items", item_resource("", "gadget", 1))
        .execute()
        .await
        .unwrap();
    assert_eq!(created, Resource::default());

    let updated: Option<Resource<Item>> = client
        .patch("items/1", item_resource("1", "gadget", 1))
        .execute()
        .await
        .unwrap();
    assert!(updated.is_none());

    client.delete("items/1").execute().await.unwrap();
}

#[tokio::test]
async fn test_transport_failures_retried_to_limit() {
    // Nothing listens on this port, so every attempt is a connection failure.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let decorations = Arc::new(AtomicUsize::new(0));
    let counter = decorations.clone();
    let counting = courier::header::header_decorator(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let result = Client::builder()
        .build()
        .unwrap()
        .get::<Resource<Item>>(format!("http://{}/items/1", addr))
        .configure(set_retries(3))
        .configure(add_header_decorator(counting))
        .execute()
        .await;

    match result {
        Err(Error::Transport(e)) => assert_eq!(e.kind(), courier::transport::TransportErrorKind::Connect),
        _ => panic!("Expected Transport, got {:?}", result),
    }
    // Decorators run once per attempt.
    assert_eq!(decorations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_header_decorators_reach_the_server() {
    let mock_server = MockServer::start().await;

    let tenant = Tenant::new(Uuid::new_v4(), "GMS", 83, 1).unwrap();
    let trace = Context::new().with_remote_span_context(SpanContext::new(
        TraceId::from_bytes(0x1234u128.to_be_bytes()),
        SpanId::from_bytes(0x5678u64.to_be_bytes()),
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    ));

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(header(tenant::ID, tenant.id().to_string().as_str()))
        .and(header(tenant::REGION, "GMS"))
        .and(header(tenant::MAJOR_VERSION, "83"))
        .and(header(tenant::MINOR_VERSION, "1"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(header(
            "traceparent",
            "00-00000000000000000000000000001234-0000000000005678-01",
        ))
        .and(header("x-team", "inventory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let items = client(&mock_server)
        .get::<Vec<Resource<Item>>>("items")
        .configure(add_header_decorator(tenant_header_decorator(Some(tenant))))
        .configure(add_header_decorator(span_header_decorator(
            trace,
            trace_context_propagator(),
        )))
        .configure(add_header_decorator(static_header("x-team", "inventory")))
        .execute()
        .await
        .unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn test_slice_provider_over_live_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            item_resource("1", "a", 1),
            item_resource("2", "b", 2),
            item_resource("3", "c", 3),
            item_resource("4", "d", 4),
        ]})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = client(&mock_server).get::<Vec<Resource<Item>>>("items");
    let even = slice_provider(
        request,
        |r: Resource<Item>| Ok(r.attributes),
        vec![filter(|i: &Item| i.quantity % 2 == 0)],
    );

    // One request; the two views come from the materialized result.
    let even = even.materialize().await;
    let names = even
        .clone()
        .slice_map(|i| Ok(i.name))
        .get()
        .await
        .unwrap();
    let total: u32 = even.get().await.unwrap().iter().map(|i| i.quantity).sum();

    assert_eq!(names, vec!["b".to_string(), "d".to_string()]);
    assert_eq!(total, 6);
}

#[tokio::test]
async fn test_provider_reissues_request_per_evaluation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": item_resource("1", "widget", 3)})),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let request = client(&mock_server).get::<Resource<Item>>("items/1");
    let quantity = provider(request, |r: Resource<Item>| Ok(r.attributes.quantity));

    assert_eq!(quantity.get().await.unwrap(), 3);
    assert_eq!(quantity.get().await.unwrap(), 3);
}

#[tokio::test]
async fn test_provider_skips_transform_on_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let request = client(&mock_server).get::<Resource<Item>>("items/1");
    let item = provider(request, |_: Resource<Item>| -> courier::Result<Item> {
        panic!("transform must not run")
    });

    assert!(matches!(item.get().await, Err(Error::NotFound)));
}
