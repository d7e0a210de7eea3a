//! HTTP-level tests against a mock clipper service.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use emailclipper::config::ServiceConfig;
use emailclipper::error::{ClipperError, SubmitStep};
use emailclipper::host::{EmlFile, MailHost};
use emailclipper::model::note::{NoteDraft, TagRef};
use emailclipper::service::client::NoteClient;
use emailclipper::service::locator::ServiceLocator;
use emailclipper::service::transport::{HttpTransport, Request, Transport};
use emailclipper::service::SENTINEL;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new().unwrap())
}

fn client(server: &MockServer, token: Option<&str>) -> NoteClient {
    NoteClient::new(
        transport(),
        server.uri(),
        token.map(String::from),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_transport_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SENTINEL))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport()
        .send(Request::get(format!("{}/ping", server.uri()), Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(body, SENTINEL);
}

#[tokio::test]
async fn test_transport_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/folders"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = transport()
        .send(Request::get(format!("{}/folders", server.uri()), Duration::from_secs(5)))
        .await
        .unwrap_err();
    match err {
        ClipperError::Transport {
            status,
            status_text,
        } => {
            assert_eq!(status, 404);
            assert_eq!(status_text, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_timeout_is_504() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SENTINEL)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = transport()
        .send(Request::get(format!("{}/ping", server.uri()), Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(504));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_transport_connection_refused_is_status_zero() {
    // Reserve a port, then free it so nothing listens there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = transport()
        .send(Request::get(
            format!("http://127.0.0.1:{port}/ping"),
            Duration::from_secs(5),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(0));
    assert!(err.to_string().contains("transport failed"));
}

#[tokio::test]
async fn test_locator_finds_mock_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SENTINEL))
        .mount(&server)
        .await;

    let port = server.address().port();
    let mut locator = ServiceLocator::new(
        transport(),
        ServiceConfig {
            base_port: port,
            port_span: 0,
            ..ServiceConfig::default()
        },
    );

    assert_eq!(locator.locate().await, Some(port));
    assert_eq!(locator.base_url().unwrap(), format!("http://127.0.0.1:{port}"));
}

#[tokio::test]
async fn test_locator_rejects_other_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let mut locator = ServiceLocator::new(
        transport(),
        ServiceConfig {
            base_port: server.address().port(),
            port_span: 0,
            ..ServiceConfig::default()
        },
    );
    assert_eq!(locator.locate().await, None);
    assert!(!locator.is_connected());
}

#[tokio::test]
async fn test_list_tags_sends_token_and_dedups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(query_param("token", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "a", "title": "Work"},
            {"id": "b", "title": "Work"},
            {"id": "c", "title": "Home"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tags = client(&server, Some("s3cret")).list_tags().await.unwrap();
    let ids: Vec<&str> = tags.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);
}

#[tokio::test]
async fn test_create_note_uploads_then_posts_then_tags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "res1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(body_partial_json(serde_json::json!({"title": "Hi", "parent_id": "nb1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "note1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tags/t1/notes"))
        .and(body_partial_json(serde_json::json!({"id": "note1"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let draft = NoteDraft {
        title: "Hi".into(),
        body: "| table |\n\nHello\n".into(),
        notebook_id: "nb1".into(),
        tags: vec![TagRef::Id("t1".into())],
    };
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        b"From: a@x.com\r\nSubject: Hi\r\n\
Content-Type: multipart/mixed; boundary=\"B\"\r\n\r\n\
--B\r\nContent-Type: text/plain\r\n\r\nHello\r\n\
--B\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=\"a.txt\"\r\n\r\nhello\r\n\
--B--\r\n",
    )
    .unwrap();
    let host = EmlFile::new(file.path());
    let message = host.download().await.unwrap();
    let attachment = &message.attachments[0];

    let note = client(&server, None)
        .create_note(&draft, &[attachment], &host)
        .await
        .unwrap();
    assert_eq!(note.id, "note1");

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(paths, vec!["/resources", "/notes", "/tags/t1/notes"]);

    let multipart = String::from_utf8_lossy(&requests[0].body);
    assert!(multipart.contains("name=\"data\""));
    assert!(multipart.contains("filename=\"a.txt\""));
    assert!(multipart.contains("name=\"props\""));
    assert!(multipart.contains(r#""filename":"a.txt""#));
    assert!(multipart.contains("hello"));

    let note_body: serde_json::Value = requests[1].body_json().unwrap();
    assert_eq!(note_body["body"], "| table |\n\nHello\n\n[a.txt](:/res1)\n");
}

#[tokio::test]
async fn test_create_note_failure_reports_step_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tags/t1/notes"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let draft = NoteDraft {
        title: "Hi".into(),
        body: "Hello".into(),
        notebook_id: "nb1".into(),
        tags: vec![TagRef::Id("t1".into())],
    };
    let host = EmlFile::new("unused.eml");
    let err = client(&server, None)
        .create_note(&draft, &[], &host)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.step(), Some(&SubmitStep::CreateNote));
}
