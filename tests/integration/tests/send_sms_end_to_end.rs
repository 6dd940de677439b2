use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use sms_dispatch::{DispatchCancellation, DispatchConfig, DispatchOrchestrator, DispatchRequest};
use sms_gateway::HttpGatewayClient;
use sms_server::{build_send_sms_router, SendSmsServerConfig, SEND_SMS_ENDPOINT};
use tokio::net::TcpListener;

fn orchestrator_for(gateway_base: String) -> Arc<DispatchOrchestrator> {
    let config = DispatchConfig {
        api_base: gateway_base,
        api_key: "NCS-INTEGRATION".to_string(),
        api_secret: "integration-secret".to_string(),
        sender: "0212345678".to_string(),
        send_timeout_ms: 2_000,
        upload_timeout_ms: 2_000,
        ..DispatchConfig::default()
    };
    let gateway = HttpGatewayClient::new(config.http_gateway_config()).expect("gateway client");
    Arc::new(DispatchOrchestrator::new(config, Arc::new(gateway)).expect("orchestrator"))
}

async fn spawn_server(orchestrator: Arc<DispatchOrchestrator>) -> SocketAddr {
    let config = SendSmsServerConfig {
        orchestrator,
        bind: "127.0.0.1:0".to_string(),
        request_timeout_ms: 10_000,
    };
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("resolve listener addr");
    let app = build_send_sms_router(&config);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    addr
}

#[tokio::test]
async fn integration_send_sms_endpoint_uploads_once_and_reports_each_recipient() {
    let gateway = MockServer::start();
    let upload = gateway.mock(|when, then| {
        when.method(POST)
            .path("/storage/v1/files")
            .header_exists("authorization")
            .body_includes("filename=\"promo.png\"")
            .body_includes("MMS");
        then.status(200).json_body(json!({"fileId": "ST01FILE"}));
    });
    let accepted = gateway.mock(|when, then| {
        when.method(POST)
            .path("/messages/v4/send")
            .header_exists("authorization")
            .json_body_includes(
                json!({"message": {"to": "01011112222", "from": "0212345678", "imageId": "ST01FILE"}})
                    .to_string(),
            );
        then.status(200)
            .json_body(json!({"messageId": "M-ACCEPTED", "statusCode": "2000"}));
    });
    let rejected = gateway.mock(|when, then| {
        when.method(POST)
            .path("/messages/v4/send")
            .json_body_includes(json!({"message": {"to": "01033334444"}}).to_string());
        then.status(400)
            .json_body(json!({"errorCode": "InvalidPhoneNumber"}));
    });

    let addr = spawn_server(orchestrator_for(gateway.base_url())).await;
    let image = Part::bytes(b"fake-png-bytes".to_vec())
        .file_name("promo.png")
        .mime_str("image/png")
        .expect("png mime");
    let form = Form::new()
        .text("message", "안내문자")
        .text("receivers", r#"["010-1111-2222", "010-3333-4444"]"#)
        .part("image", image);
    let response = reqwest::Client::new()
        .post(format!("http://{addr}{SEND_SMS_ENDPOINT}"))
        .multipart(form)
        .send()
        .await
        .expect("post send-sms");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.json::<Value>().await.expect("json body");
    assert_eq!(body["success"], true);
    assert_eq!(body["attempted"], 2);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["media_reference"], "ST01FILE");
    assert_eq!(body["results"][0]["to"], "01011112222");
    assert_eq!(body["results"][0]["data"]["message_id"], "M-ACCEPTED");
    assert_eq!(body["results"][1]["success"], false);
    assert_eq!(body["results"][1]["error"]["http_status"], 400);
    assert_eq!(
        body["results"][1]["error"]["response_body"]["errorCode"],
        "InvalidPhoneNumber"
    );
    upload.assert_calls(1);
    accepted.assert_calls(1);
    rejected.assert_calls(1);
}

#[tokio::test]
async fn integration_upload_outage_returns_bad_gateway_without_sends() {
    let gateway = MockServer::start();
    let upload = gateway.mock(|when, then| {
        when.method(POST).path("/storage/v1/files");
        then.status(503).body("storage maintenance");
    });
    let send = gateway.mock(|when, then| {
        when.method(POST).path("/messages/v4/send");
        then.status(200).json_body(json!({"messageId": "unexpected"}));
    });

    let addr = spawn_server(orchestrator_for(gateway.base_url())).await;
    let image = Part::bytes(b"fake-gif-bytes".to_vec())
        .file_name("promo.gif")
        .mime_str("image/gif")
        .expect("gif mime");
    let form = Form::new()
        .text("message", "hello")
        .text("receivers", r#"["01011112222", "01033334444"]"#)
        .part("image", image);
    let response = reqwest::Client::new()
        .post(format!("http://{addr}{SEND_SMS_ENDPOINT}"))
        .multipart(form)
        .send()
        .await
        .expect("post send-sms");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body = response.json::<Value>().await.expect("json body");
    assert_eq!(body["error"]["code"], "upload_failed");
    assert_eq!(body["error"]["details"]["http_status"], 503);
    upload.assert_calls(1);
    send.assert_calls(0);
}

#[tokio::test]
async fn integration_text_dispatch_signs_every_send_with_one_credential() {
    let gateway = MockServer::start();
    let sent = gateway.mock(|when, then| {
        when.method(POST)
            .path("/messages/v4/send")
            .header_exists("authorization")
            .json_body_includes(json!({"message": {"text": "안내문자"}}).to_string());
        then.status(200).json_body(json!({"messageId": "M-OK"}));
    });

    let orchestrator = orchestrator_for(gateway.base_url());
    let request = DispatchRequest::new(
        "안내문자",
        ["01011112222", "01033334444"],
        None,
        orchestrator.request_limits(),
    )
    .expect("request");
    let report = orchestrator
        .dispatch(request, DispatchCancellation::never())
        .await
        .expect("report");

    assert!(report.all_succeeded());
    assert_eq!(report.attempted, 2);
    assert!(report.media_reference.is_none());
    sent.assert_calls(2);
}
