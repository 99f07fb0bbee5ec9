use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_models::auth::CallRole;
use shared_models::error::ApiError;
use shared_utils::test_utils::{MockBackendResponses, TestConfig};
use video_call_cell::models::{ConsultationStatus, DoctorAssignment, VideoCallError};
use video_call_cell::services::{HttpSessionBroker, SessionBroker};

fn create_test_config_with_mock_url(mock_server: &MockServer) -> shared_config::AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.api_base_url = mock_server.uri();
    config
}

#[tokio::test]
async fn test_request_join_returns_credentials() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/join",
            consultation_id
        )))
        .and(header("Authorization", "Bearer test-bearer-token"))
        .and(body_json(json!({"user_type": "patient"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::join_credentials_response(consultation_id)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let credentials = broker
        .request_join(consultation_id, CallRole::Patient)
        .await
        .unwrap();

    assert_eq!(credentials.app_id, "test-app-id");
    assert_eq!(credentials.channel_name, "vc_0123456789abcdef_00c0ffee");
    assert_eq!(credentials.token, "007test-rtc-token");
    assert_eq!(credentials.uid, 12345678);
    assert_eq!(credentials.consultation_id, consultation_id);
    assert!(credentials.call_url.is_none());
}

#[tokio::test]
async fn test_request_join_as_doctor_sends_doctor_user_type() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/join",
            consultation_id
        )))
        .and(body_json(json!({"user_type": "doctor"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::join_credentials_response(consultation_id)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let result = broker.request_join(consultation_id, CallRole::Doctor).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_request_join_forbidden_maps_to_authorization_error() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/join",
            consultation_id
        )))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            MockBackendResponses::error_detail("Not authorized to join this consultation"),
        ))
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let error = broker
        .request_join(consultation_id, CallRole::Patient)
        .await
        .unwrap_err();

    assert_matches!(
        error,
        ApiError::Authorization(message) if message.contains("Not authorized")
    );
}

#[tokio::test]
async fn test_request_join_unknown_consultation_maps_to_not_found() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/join",
            consultation_id
        )))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(MockBackendResponses::error_detail("Consultation not found")),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let error = broker
        .request_join(consultation_id, CallRole::Patient)
        .await
        .unwrap_err();

    assert_matches!(error, ApiError::NotFound(_));
}

#[tokio::test]
async fn test_request_join_too_early_maps_to_validation_error() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/join",
            consultation_id
        )))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            MockBackendResponses::error_detail("Cannot join before the scheduled window"),
        ))
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let error = broker
        .request_join(consultation_id, CallRole::Patient)
        .await
        .unwrap_err();

    assert_matches!(
        error,
        ApiError::Validation(message) if message.contains("before the scheduled window")
    );
}

#[tokio::test]
async fn test_fetch_consultation_decodes_wire_shape() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let start = Utc::now() + chrono::Duration::minutes(5);

    Mock::given(method("GET"))
        .and(path(format!("/api/video-consultations/{}", consultation_id)))
        .and(header("Authorization", "Bearer test-bearer-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::consultation_response(
                consultation_id,
                doctor_id,
                "SCHEDULED",
                start,
            ),
        ))
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let consultation = broker.fetch_consultation(consultation_id).await.unwrap();

    assert_eq!(consultation.consultation_id, consultation_id);
    assert_eq!(consultation.status, ConsultationStatus::Scheduled);
    assert_eq!(consultation.channel_name, "vc_0123456789abcdef_00c0ffee");
    assert_eq!(consultation.duration_minutes, 30);
    assert_eq!(consultation.doctor_id, DoctorAssignment::Assigned(doctor_id));
}

#[tokio::test]
async fn test_fetch_consultation_with_unassigned_doctor() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    let mut body = MockBackendResponses::consultation_response(
        consultation_id,
        Uuid::new_v4(),
        "SCHEDULED",
        Utc::now(),
    );
    body["doctor_id"] = json!(null);

    Mock::given(method("GET"))
        .and(path(format!("/api/video-consultations/{}", consultation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let consultation = broker.fetch_consultation(consultation_id).await.unwrap();
    assert_eq!(consultation.doctor_id, DoctorAssignment::Unassigned);
    assert!(consultation.doctor_id.id().is_none());
}

#[tokio::test]
async fn test_report_end_returns_summary() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/end",
            consultation_id
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::end_response(consultation_id, 247)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let report = broker.report_end(consultation_id).await.unwrap();

    assert_eq!(report.consultation_id, consultation_id);
    assert_eq!(report.duration_seconds, Some(247));
    assert_eq!(report.status, ConsultationStatus::Completed);
}

#[tokio::test]
async fn test_report_end_conflict_treated_as_already_completed() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/end",
            consultation_id
        )))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(MockBackendResponses::error_detail("Consultation already ended")),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    // The call is over either way; a second report must not surface an error
    let report = broker.report_end(consultation_id).await.unwrap();

    assert_eq!(report.consultation_id, consultation_id);
    assert_eq!(report.status, ConsultationStatus::Completed);
    assert!(report.duration_seconds.is_none());
    assert!(report.message.contains("already ended"));
}

#[tokio::test]
async fn test_report_end_server_error_still_fails() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/end",
            consultation_id
        )))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockBackendResponses::error_detail("Internal server error")),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let error = broker.report_end(consultation_id).await.unwrap_err();
    assert_matches!(error, ApiError::Api { status: 500, .. });
}

#[tokio::test]
async fn test_report_cancel_sends_reason() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/cancel",
            consultation_id
        )))
        .and(body_json(json!({
            "cancellation_reason": "Patient recovered, visit no longer needed"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::cancel_response(consultation_id)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let result = broker
        .report_cancel(
            consultation_id,
            "Patient recovered, visit no longer needed",
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_report_cancel_conflict_propagates() {
    let mock_server = MockServer::start().await;
    let consultation_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/api/video-consultations/{}/cancel",
            consultation_id
        )))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockBackendResponses::error_detail("Consultation already in progress"),
        ))
        .mount(&mock_server)
        .await;

    let config = create_test_config_with_mock_url(&mock_server);
    let broker = HttpSessionBroker::new(&config);

    let error = broker
        .report_cancel(consultation_id, "stale cancel")
        .await
        .unwrap_err();
    assert_matches!(error, ApiError::Conflict(_));
}

#[tokio::test]
async fn test_unreachable_backend_maps_to_network_error() {
    let mut config = TestConfig::default().to_app_config();
    // Port 0 is never connectable
    config.api_base_url = "http://127.0.0.1:0".to_string();
    let broker = HttpSessionBroker::new(&config);

    let error = broker.fetch_consultation(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(error, ApiError::Network(_));
}

#[tokio::test]
async fn test_api_error_converts_into_video_call_error() {
    let error = ApiError::NotFound("Consultation not found".to_string());
    let call_error: VideoCallError = error.into();
    assert_matches!(call_error, VideoCallError::Api(ApiError::NotFound(_)));
}
