use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Office Facility Management API",
        version = "1.0.0",
        description = "API for office facility management. \n\n**Authentication:** browser clients use the SSO session cookie; mobile and tablet clients send a Bearer token from `/api/v1/auth/token`.\n\n**Features:**\n- SSO login (OAuth2 + PKCE)\n- Transport, meeting and facility requests\n- Voucher import and reconciliation\n- Organization master data\n- SCIM directory sync",
        contact(
            name = "Facility Management Team",
            email = "facility@ofm.local"
        )
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::callback,
        crate::api::auth::logout,
        crate::api::auth::me,
        crate::api::auth::refresh,
        crate::api::auth::issue_token,

        // Health
        crate::api::health::health_check,

        // Requests
        crate::api::transport::create_request,
        crate::api::transport::list_requests,
        crate::api::meetings::create_meeting,
        crate::api::vouchers::import_vouchers,

        // Organization
        crate::api::companies::list_companies,

        // SCIM
        crate::api::sync::trigger_sync,
    ),
    components(
        schemas(
            crate::api::auth::MeResponse,
            crate::auth::api_token::ApiTokenResponse,
            crate::api::health::HealthResponse,
            crate::models::CreateTransportRequest,
            crate::models::CreateMeetingRequest,
        )
    ),
    tags(
        (name = "Auth", description = "SSO login, session cookies and API tokens."),
        (name = "Health", description = "Service and database health."),
        (name = "Transport", description = "Transport requests and approval flow."),
        (name = "Meetings", description = "Meeting room bookings, check-in and room schedule."),
        (name = "Vouchers", description = "Transport voucher import, stats and reconciliation."),
        (name = "Organization", description = "Companies, departments, positions, roles and users."),
        (name = "SCIM", description = "Directory sync with the SSO provider."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /api/v1/auth/token"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/v1/transport/requests"));
    }

    #[test]
    fn test_request_bodies_are_documented() {
        let doc = ApiDoc::openapi();
        let transport = doc.paths.paths.get("/api/v1/transport/requests").and_then(|item| item.post.as_ref());
        assert!(transport.and_then(|op| op.request_body.as_ref()).is_some());
        let meetings = doc.paths.paths.get("/api/v1/meetings").and_then(|item| item.post.as_ref());
        assert!(meetings.and_then(|op| op.request_body.as_ref()).is_some());

        let schemas = doc.components.map(|c| c.schemas).unwrap_or_default();
        assert!(schemas.contains_key("CreateTransportRequest"));
        assert!(schemas.contains_key("CreateMeetingRequest"));
    }

    #[test]
    fn test_list_query_params_are_documented() {
        let doc = ApiDoc::openapi();
        let list = doc.paths.paths.get("/api/v1/transport/requests").and_then(|item| item.get.as_ref());
        let names: Vec<String> = list
            .and_then(|op| op.parameters.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert!(names.iter().any(|n| n == "page"));
        assert!(names.iter().any(|n| n == "startDate"));
    }
}
