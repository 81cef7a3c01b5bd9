//! Integration tests for request dispatch against a mock HTTP server.

#[cfg(test)]
mod dispatch_tests {
    use integrations_github_core::{
        ApiErrorKind, Attestation, AttestationsResponse, ErrorKind, GitHubClient, ListCursorOptions,
        ListOptions, Rate, RateLimitKind, RawDocument, RequestContext, TransportErrorKind, NO_BODY,
    };
    use pretty_assertions::assert_eq;
    use reqwest::Method;
    use serde::Serialize;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ATTESTATIONS_BODY: &str = r#"{
        "attestations": [
            {
                "repository_id": 1,
                "bundle": {}
            },
            {
                "repository_id": 2,
                "bundle": {"mediaType": "application/vnd.dev.sigstore.bundle.v0.3+json",  "verificationMaterial": {"publicKey": {"hint": "abc"}}}
            }
        ]
    }"#;

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::builder()
            .base_url(server.uri())
            .pat("test-token")
            .user_agent("dispatch-tests/1.0")
            .build()
            .expect("client should build")
    }

    fn ctx() -> RequestContext {
        RequestContext::background()
    }

    #[tokio::test]
    async fn test_list_attestations_decodes_raw_bundles() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/attestations/digest"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(ATTESTATIONS_BODY, "application/json")
                    .insert_header("x-ratelimit-limit", "5000")
                    .insert_header("x-ratelimit-remaining", "4321")
                    .insert_header("x-ratelimit-reset", "1700000000"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client
            .new_request(Method::GET, "repos/o/r/attestations/digest", NO_BODY)?
            .with_options(Some(&ListOptions::default()))?;
        let (got, response): (AttestationsResponse, _) = client.execute(&ctx(), request).await?;

        let want = AttestationsResponse {
            attestations: vec![
                Attestation {
                    repository_id: 1,
                    bundle: RawDocument::from_json("{}")?,
                },
                Attestation {
                    repository_id: 2,
                    bundle: RawDocument::from_json(
                        r#"{"mediaType": "application/vnd.dev.sigstore.bundle.v0.3+json",  "verificationMaterial": {"publicKey": {"hint": "abc"}}}"#,
                    )?,
                },
            ],
        };
        assert_eq!(got, want);
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.rate().limit, 5000);
        assert_eq!(response.rate().remaining, 4321);
        Ok(())
    }

    #[tokio::test]
    async fn test_none_options_send_no_query() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/attestations/digest"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"attestations":[]}"#, "application/json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client
            .new_request(Method::GET, "repos/o/r/attestations/digest", NO_BODY)?
            .with_options::<ListOptions>(None)?;
        let (got, _): (AttestationsResponse, _) = client.execute(&ctx(), request).await?;
        assert!(got.attestations.is_empty());

        let received = server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].url.query(), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_pagination_options_and_links() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let next = format!("{}/user/repos?page=3&per_page=2", server.uri());
        let last = format!("{}/user/repos?page=9&per_page=2", server.uri());
        let link = format!(r#"<{}>; rel="next", <{}>; rel="last""#, next, last);

        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("type", "owner"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("[1, 2]", "application/json")
                    .insert_header("link", link.as_str()),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client
            .new_request(Method::GET, "user/repos?type=owner", NO_BODY)?
            .with_options(Some(&ListOptions::new().page(2).per_page(2)))?;
        let (ids, response): (Vec<u32>, _) = client.execute(&ctx(), request).await?;

        assert_eq!(ids, vec![1, 2]);
        assert_eq!(response.pages().next_page, Some(3));
        assert_eq!(response.pages().last_page, Some(9));
        assert_eq!(response.pages().prev_page, None);
        assert_eq!(response.links().total_pages(), Some(9));
        Ok(())
    }

    #[tokio::test]
    async fn test_cursor_pagination() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let link = format!(r#"<{}/orgs/o/audit-log?after=MS42&per_page=1>; rel="next""#, server.uri());

        Mock::given(method("GET"))
            .and(path("/orgs/o/audit-log"))
            .and(query_param("after", "MS41"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("[]", "application/json")
                    .insert_header("link", link.as_str()),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client
            .new_request(Method::GET, "orgs/o/audit-log", NO_BODY)?
            .with_options(Some(&ListCursorOptions::new().per_page(1).after("MS41")))?;
        let response = client.execute_empty(&ctx(), request).await?;

        assert_eq!(response.pages().after.as_deref(), Some("MS42"));
        assert!(response.pages().has_next());
        Ok(())
    }

    #[tokio::test]
    async fn test_not_found_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/attestations/digest"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_raw(
                        r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#,
                        "application/json",
                    )
                    .insert_header("x-github-request-id", "CAFE:42")
                    .insert_header("x-ratelimit-limit", "60")
                    .insert_header("x-ratelimit-remaining", "58"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client
            .new_request(Method::GET, "repos/o/r/attestations/digest", NO_BODY)
            .unwrap();
        let result = client.execute::<AttestationsResponse>(&ctx(), request).await;

        let got = result.as_ref().ok().map(|(value, _)| value.clone());
        assert_eq!(got, None);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status_code(), Some(404));

        let api = err.as_api_error().unwrap();
        assert_eq!(api.kind(), ApiErrorKind::NotFound);
        assert_eq!(api.message(), "Not Found");
        assert_eq!(api.request_id(), Some("CAFE:42"));
        assert_eq!(err.rate().remaining, 58);

        let rendered = err.to_string();
        assert!(rendered.contains("Not Found"));
        assert!(rendered.contains("404"));
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        #[derive(Serialize)]
        struct SuspendOptions {
            reason: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/users/u/suspended"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"reason": ""})))
            .respond_with(ResponseTemplate::new(422).set_body_raw(
                r#"{"message":"Validation Failed","errors":[{"resource":"User","field":"reason","code":"invalid"}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body = SuspendOptions { reason: String::new() };
        let request = client
            .new_request(Method::PUT, "users/u/suspended", Some(&body))
            .unwrap();
        let err = client.execute_empty(&ctx(), request).await.unwrap_err();

        let api = err.as_api_error().unwrap();
        assert_eq!(api.kind(), ApiErrorKind::UnprocessableEntity);
        assert_eq!(api.errors().len(), 1);
        assert_eq!(api.errors()[0].field.as_deref(), Some("reason"));
    }

    #[tokio::test]
    async fn test_html_error_body_becomes_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/users/u/site_admin"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client
            .new_request(Method::DELETE, "users/u/site_admin", NO_BODY)
            .unwrap();
        let err = client.execute_empty(&ctx(), request).await.unwrap_err();

        let api = err.as_api_error().unwrap();
        assert_eq!(api.kind(), ApiErrorKind::ServiceUnavailable);
        assert_eq!(api.message(), "upstream unavailable");
        assert_eq!(api.response().body().as_ref(), b"upstream unavailable");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_raw(r#"{"message":"API rate limit exceeded"}"#, "application/json")
                    .insert_header("x-ratelimit-limit", "60")
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1372700873"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client.new_request(Method::GET, "user", NO_BODY).unwrap();
        let err = client.execute_empty(&ctx(), request).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimit);
        let limited = err.as_rate_limit_error().unwrap();
        assert_eq!(limited.kind(), RateLimitKind::Primary);
        assert_eq!(limited.rate().limit, 60);
        assert_eq!(limited.reset_at().map(|t| t.timestamp()), Some(1372700873));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = GitHubClient::builder()
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap();

        let request = client.new_request(Method::GET, "user", NO_BODY).unwrap();
        let err = client
            .execute::<serde_json::Value>(&ctx(), request)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.as_transport_error().unwrap().kind(), TransportErrorKind::Connect);
        assert!(err.response().is_none());
        assert_eq!(err.rate(), Rate::default());
    }

    #[tokio::test]
    async fn test_transport_error_redacts_client_secret() {
        let client = GitHubClient::builder()
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap();

        let request = client
            .new_request(
                Method::GET,
                "applications?client_id=abc&client_secret=hunter2-secret",
                NO_BODY,
            )
            .unwrap();
        let err = client.execute_empty(&ctx(), request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let rendered = err.to_string();
        assert!(rendered.contains("client_secret=REDACTED"), "{}", rendered);

        let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(current) = source {
            assert!(!current.to_string().contains("hunter2-secret"), "{}", current);
            assert!(!format!("{:?}", current).contains("hunter2-secret"));
            source = current.source();
        }
    }

    #[tokio::test]
    async fn test_bad_paths_fail_before_sending() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        for bad in ["\n/\n/attestations/\n", "/repos/o/r", "repos/%gg/r"] {
            let err = client.new_request(Method::GET, bad, NO_BODY).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Construction, "path {:?}", bad);
        }

        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_on_slow_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = client.new_request(Method::GET, "user", NO_BODY).unwrap();
        let context = RequestContext::background().with_timeout(Duration::from_millis(50));
        let err = client.execute_empty(&context, request).await.unwrap_err();

        assert_eq!(err.as_transport_error().unwrap().kind(), TransportErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_client() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meta"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"verifiable_password_authentication":true}"#, "application/json"))
            .expect(8)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let calls = (0..8).map(|_| {
            let client = client.clone();
            async move {
                let request = client.new_request(Method::GET, "meta", NO_BODY)?;
                client
                    .execute::<serde_json::Value>(&RequestContext::background(), request)
                    .await
                    .map(|(value, _)| value)
            }
        });

        let results = futures::future::join_all(calls).await;
        for result in results {
            assert_eq!(result?["verifiable_password_authentication"], json!(true));
        }
        Ok(())
    }
}
