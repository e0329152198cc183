//! Integration tests for the HTTP transport using wiremock
//!
//! These tests verify request shaping and response classification against
//! mocked endpoints: status code mapping, empty bodies, array bodies and
//! cancellation.

use restform::transport::{HttpMethod, TransportRequest};
use restform::{CallContext, HttpTransport, Transport, TransportErrorCode};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test module for HTTP transport integration tests
mod http_transport_tests {
    use super::*;

    async fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::with_base_url(&format!("{}/1.0", server.uri()))
            .expect("transport should build")
    }

    /// Test successful GET request returns parsed JSON object
    #[tokio::test]
    async fn test_get_success_returns_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/1.0/cloud/project/p/network/private/net-1"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "net-1", "vlanId": 7})),
            )
            .mount(&server)
            .await;

        let response = transport(&server)
            .await
            .execute(
                &CallContext::new(),
                TransportRequest::get("/cloud/project/p/network/private/net-1"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.body.get("id"), Some(&json!("net-1")));
        assert_eq!(response.body.get("vlanId"), Some(&json!(7)));
        assert!(response.body_array.is_empty());
    }

    /// Test array-shaped bodies land in body_array
    #[tokio::test]
    async fn test_get_array_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/1.0/cloud/project/p/network/private"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["net-1", "net-2"])))
            .mount(&server)
            .await;

        let response = transport(&server)
            .await
            .execute(&CallContext::new(), TransportRequest::get("/cloud/project/p/network/private"))
            .await
            .unwrap();

        assert!(response.body.is_empty());
        assert_eq!(response.body_array, vec![json!("net-1"), json!("net-2")]);
    }

    /// Test POST sends the JSON body
    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        let body = json!({"name": "n", "vlanId": 7});

        Mock::given(method("POST"))
            .and(path("/1.0/cloud/project/p/network/private"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "op-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server)
            .await
            .execute(
                &CallContext::new(),
                TransportRequest::with_body(
                    HttpMethod::Post,
                    "/cloud/project/p/network/private",
                    body,
                ),
            )
            .await
            .unwrap();

        assert_eq!(response.body.get("id"), Some(&json!("op-1")));
    }

    /// Test empty 204 bodies decode to an empty response
    #[tokio::test]
    async fn test_delete_no_content() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/1.0/cloud/project/p/network/private/net-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = transport(&server)
            .await
            .execute(
                &CallContext::new(),
                TransportRequest::delete("/cloud/project/p/network/private/net-1"),
            )
            .await
            .unwrap();

        assert!(response.is_empty());
    }

    /// Test 404 response is classified as not found with the API message
    #[tokio::test]
    async fn test_404_returns_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/1.0/cloud/project/p/network/private/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                json!({"message": "This network does not exist"}),
            ))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .execute(
                &CallContext::new(),
                TransportRequest::get("/cloud/project/p/network/private/missing"),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.status, Some(404));
        assert!(err.message.contains("This network does not exist"));
    }

    /// Test status codes map onto transport error codes
    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;
        let cases = [
            (400, TransportErrorCode::InvalidRequest),
            (401, TransportErrorCode::Unauthorized),
            (403, TransportErrorCode::Forbidden),
            (409, TransportErrorCode::Conflict),
            (429, TransportErrorCode::Throttled),
            (500, TransportErrorCode::Internal),
            (503, TransportErrorCode::ServiceUnavailable),
        ];

        for (status, _) in &cases {
            Mock::given(method("GET"))
                .and(path(format!("/1.0/status/{}", status)))
                .respond_with(ResponseTemplate::new(*status))
                .mount(&server)
                .await;
        }

        let transport = transport(&server).await;
        for (status, expected) in cases {
            let err = transport
                .execute(&CallContext::new(), TransportRequest::get(format!("/status/{}", status)))
                .await
                .unwrap_err();
            assert_eq!(err.code, expected, "status {}", status);
        }
    }

    /// Test malformed JSON is reported as an invalid response
    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/1.0/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .execute(&CallContext::new(), TransportRequest::get("/broken"))
            .await
            .unwrap_err();

        assert_eq!(err.code, TransportErrorCode::InvalidResponse);
    }

    /// Test a cancelled context aborts an in-flight request
    #[tokio::test]
    async fn test_cancelled_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/1.0/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let transport = transport(&server).await;
        let (ctx, handle) = CallContext::cancellable();
        let request = tokio::spawn(async move {
            transport.execute(&ctx, TransportRequest::get("/slow")).await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();

        let err = request.await.unwrap().unwrap_err();
        assert_eq!(err.code, TransportErrorCode::Cancelled);
    }

    /// Test absolute URLs bypass the base URL
    #[tokio::test]
    async fn test_absolute_url_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let response = HttpTransport::with_base_url("https://unused.invalid")
            .unwrap()
            .execute(
                &CallContext::new(),
                TransportRequest::get(format!("{}/elsewhere", server.uri())),
            )
            .await
            .unwrap();

        assert_eq!(response.body.get("ok"), Some(&json!(true)));
    }
}
