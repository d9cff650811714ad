use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::rooms::list_rooms,
        crate::rest::rooms::get_or_create_pairwise_room,
        crate::rest::rooms::create_named_room,
        crate::rest::rooms::get_room,
        crate::rest::messages::list_messages,
        crate::rest::messages::create_message,
        crate::rest::messages::mark_room_read,
        crate::rest::messages::mark_message_read,
        crate::rest::messages::unread_count,
        crate::rest::contacts::list_contacts,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::rest::health::HealthResponse,
            crate::rest::models::ParticipantPayload,
            crate::rest::models::ParticipantSelector,
            crate::rest::models::CreatePairwiseRoomRequest,
            crate::rest::models::CreateNamedRoomRequest,
            crate::rest::models::CreateMessageRequest,
            crate::rest::models::AttachmentPayload,
            crate::rest::models::ReadStatusPayload,
            crate::rest::models::MessagePayload,
            crate::rest::models::RoomPayload,
            crate::rest::models::ContactPayload,
            crate::rest::models::MarkAllReadResponse,
            crate::rest::models::MarkReadResponse,
            crate::rest::models::UnreadCountResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "rooms", description = "Rooms, pairwise lookup and contacts"),
        (name = "messages", description = "Message history, posting and read tracking"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("JWT".to_string());
        }

        components
            .security_schemes
            .insert("bearer".to_string(), scheme);
    }
}
