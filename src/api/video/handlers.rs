use actix_multipart::Multipart;
use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{scope, Data, Query, ServiceConfig},
    HttpResponse, ResponseError,
};
use tracing::{error, info, warn};

use super::models::{PollQuery, VideoRequest, VideoStatusResponse};
use super::service::{self, VideoOutcome, VideoStatus};
use crate::api::error::ApiError;
use crate::api::form::FormData;
use crate::api::state::AppState;

#[post("")]
async fn generate_video(state: Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let config = state.config();
    let mut form = FormData::from_multipart(payload, config.max_payload_size).await?;
    let request = VideoRequest::from_form(&mut form, &config.video)?;
    info!("Video generation requested: model={}", request.model_id);

    let response = match service::generate_video(&state, request).await? {
        VideoOutcome::Completed(result) => HttpResponse::Ok().json(VideoStatusResponse::Completed {
            video_urls: result.into_payload(),
        }),
        VideoOutcome::Submitted(job) => HttpResponse::Accepted().json(VideoStatusResponse::Processing {
            job_id: Some(job.job_id().to_string()),
            message: "Video generation started".to_string(),
        }),
    };
    Ok(response)
}

/// Every answer of this route, failures included, carries a `status` field
#[get("/poll")]
async fn poll_video(state: Data<AppState>, query: Query<PollQuery>) -> HttpResponse {
    match check_status(&state, &query).await {
        Ok(response) => response,
        Err(e) => {
            let status = e.status_code();
            if status.is_client_error() {
                warn!("Video poll rejected ({}): {}", e.kind(), e);
            } else {
                error!("Video poll failed ({}): {}", e.kind(), e);
            }
            HttpResponse::build(status).json(VideoStatusResponse::Error { error: e.to_string() })
        }
    }
}

async fn check_status(state: &AppState, query: &PollQuery) -> Result<HttpResponse, ApiError> {
    let job_id = query.validated_job_id()?;

    let response = match service::check_video_status(state, job_id).await? {
        VideoStatus::Completed(video_urls) => {
            HttpResponse::Ok().json(VideoStatusResponse::Completed { video_urls })
        }
        VideoStatus::Processing(status) => HttpResponse::Ok().json(VideoStatusResponse::Processing {
            job_id: None,
            message: match status {
                Some(status) => format!("Video is still being generated ({status})"),
                None => "Video is still being generated".to_string(),
            },
        }),
        VideoStatus::Failed(error) => {
            HttpResponse::InternalServerError().json(VideoStatusResponse::Failed { error })
        }
        VideoStatus::Error(e) => {
            let status = e
                .status
                .filter(|s| (400..=599).contains(s))
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status).json(VideoStatusResponse::Error { error: e.message })
        }
    };
    Ok(response)
}

pub fn video_config(config: &mut ServiceConfig) {
    config.service(scope("/api/video").service(poll_video).service(generate_video));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::form::test_support::MultipartBody;
    use crate::config::Config;
    use actix_web::{http::header, test, web, App};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(config: Config) -> Data<AppState> {
        web::Data::new(AppState::new(Arc::new(config), CancellationToken::new()))
    }

    fn post(body: MultipartBody) -> test::TestRequest {
        let (content_type, payload) = body.finish();
        test::TestRequest::post()
            .uri("/api/video")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    }

    fn full_form() -> MultipartBody {
        MultipartBody::new()
            .text("modelId", "test/motion-control")
            .file("image", "me.png", "image/png", &[1, 2, 3])
            .file("video", "dance.mp4", "video/mp4", &[4, 5, 6])
    }

    #[actix_web::test]
    async fn missing_motion_video_is_rejected_by_field() {
        let server = MockServer::start().await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let body = MultipartBody::new()
            .text("modelId", "test/motion-control")
            .file("image", "me.png", "image/png", &[1, 2, 3]);
        let resp = test::call_service(&app, post(body).to_request()).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "validation-error");
        assert!(body["fields"]["video"]["errors"].is_array());
        assert!(body["fields"].get("image").is_none());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[actix_web::test]
    async fn repeated_video_parts_are_rejected() {
        let server = MockServer::start().await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let body = full_form().file("video", "other.mp4", "video/mp4", &[7, 8]);
        let resp = test::call_service(&app, post(body).to_request()).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["fields"]["video"]["errors"].is_array());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[actix_web::test]
    async fn unknown_model_is_rejected() {
        let server = MockServer::start().await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let body = MultipartBody::new()
            .text("modelId", "nobody/nothing")
            .file("image", "me.png", "image/png", &[1])
            .file("video", "dance.mp4", "video/mp4", &[2]);
        let resp = test::call_service(&app, post(body).to_request()).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "unknown-model");
    }

    #[actix_web::test]
    async fn client_mode_returns_the_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/test/motion-control/predictions"))
            .and(body_string_contains("filename=\"dance.mp4\""))
            .and(body_string_contains("name=\"attachmentCount\""))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "pred_v1", "status": "starting"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let resp = test::call_service(&app, post(full_form().text("pollMode", "client")).to_request()).await;

        assert_eq!(resp.status(), 202);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "processing");
        assert_eq!(body["jobId"], "pred_v1");
    }

    #[actix_web::test]
    async fn server_mode_polls_until_completed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/test/motion-control/predictions"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "pred_v2", "status": "starting"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/pred_v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pred_v2", "status": "processing"})))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/pred_v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pred_v2",
                "status": "succeeded",
                "output": "http://cdn/v.mp4"
            })))
            .mount(&server)
            .await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let resp = test::call_service(&app, post(full_form()).to_request()).await;

        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "completed", "videoUrls": ["http://cdn/v.mp4"]}));

        let status_checks = server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "GET")
            .count();
        assert_eq!(status_checks, 3);
    }

    #[actix_web::test]
    async fn server_mode_times_out_after_configured_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "pred_v3"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/pred_v3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .expect(5)
            .mount(&server)
            .await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let resp = test::call_service(&app, post(full_form()).to_request()).await;

        assert_eq!(resp.status(), 500);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "timed-out");
    }

    #[actix_web::test]
    async fn poll_endpoint_reports_each_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/done"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "output": ["http://cdn/a.mp4"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/busy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed",
                "error": "face not detected"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/flaky"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "overloaded"})))
            .mount(&server)
            .await;
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests(&server.uri())))
                .configure(video_config),
        )
        .await;

        let get = |job_id: &str| {
            test::TestRequest::get()
                .uri(&format!("/api/video/poll?jobId={job_id}"))
                .to_request()
        };

        let resp = test::call_service(&app, get("done")).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "completed", "videoUrls": ["http://cdn/a.mp4"]}));

        let resp = test::call_service(&app, get("busy")).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "processing");

        let resp = test::call_service(&app, get("broken")).await;
        assert_eq!(resp.status(), 500);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "failed", "error": "face not detected"}));

        let resp = test::call_service(&app, get("flaky")).await;
        assert_eq!(resp.status(), 503);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "error", "error": "overloaded"}));
    }

    #[actix_web::test]
    async fn poll_endpoint_requires_a_job_id() {
        let app = test::init_service(
            App::new()
                .app_data(state(Config::for_tests("http://localhost")))
                .configure(video_config),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/video/poll").to_request()).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "error", "error": "jobId is required"}));
    }

    #[actix_web::test]
    async fn poll_endpoint_reports_missing_credential_as_status_error() {
        let server = MockServer::start().await;
        let mut config = Config::for_tests(&server.uri());
        config.video.api_key = None;
        let app = test::init_service(App::new().app_data(state(config)).configure(video_config)).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/video/poll?jobId=abc").to_request(),
        )
        .await;

        assert_eq!(resp.status(), 500);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "error", "error": "VIDEO_API_KEY is not configured"}));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
