//! REST API endpoint for AI triage of security findings

use actix_web::{HttpRequest, HttpResponse, post, web};
use utoipa::OpenApi;

use crate::api::error::ApiError;
use crate::model::{TriageRequest, TriageResponse};
use crate::service::TriageService;

#[derive(OpenApi)]
#[openapi(
    paths(
        triage_findings,
        crate::api::health::liveness,
        crate::api::health::readiness,
    ),
    components(schemas(
        crate::model::TriageRequest,
        crate::model::TriageResponse,
        crate::model::TriageItem,
        crate::model::AiAnalysis,
        crate::model::finding::Severity,
        crate::model::finding::FindingStatus,
        crate::api::health::HealthStatus,
        crate::api::health::ReadinessStatus,
    )),
    tags(
        (name = "triage", description = "AI triage of security findings"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Extract the bearer credential from the Authorization header.
/// Accepts both "Bearer <token>" and a raw token.
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get("Authorization")?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Analyze one or many findings with the AI triage pipeline
#[utoipa::path(
    post,
    path = "/v1/triage",
    request_body = TriageRequest,
    responses(
        (status = 200, description = "Findings analyzed", body = TriageResponse),
        (status = 400, description = "Malformed body, action, or finding ids"),
        (status = 401, description = "Missing or invalid credential"),
        (status = 403, description = "Caller lacks access to the finding"),
        (status = 402, description = "Model credits exhausted"),
        (status = 404, description = "Finding not found"),
        (status = 429, description = "Hourly triage quota exceeded"),
        (status = 500, description = "Internal server error")
    ),
    tag = "triage"
)]
#[post("/v1/triage")]
pub async fn triage_findings(
    service: web::Data<TriageService>,
    req: HttpRequest,
    body: web::Json<TriageRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = service
        .triage(bearer_token(&req), &body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Configure triage routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(triage_findings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_prefix_is_stripped() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123"));
    }

    #[test]
    fn raw_token_is_accepted() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123"));
    }

    #[test]
    fn missing_header_yields_none() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
