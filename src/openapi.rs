use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{
    ClassDetails, ClassFields, ClassView, GymClass, ToggleOutcome, ToggleResponse,
    UpdateClassRequest,
};
use crate::validation::FieldError;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "member_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Member-Id"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::list_classes,
        crate::handlers::create_class,
        crate::handlers::get_class,
        crate::handlers::update_class,
        crate::handlers::delete_class,
        crate::handlers::toggle_booking,
        crate::handlers::register_member,
        crate::handlers::my_classes,
        crate::handlers::my_classes_ical
    ),
    components(schemas(
        GymClass,
        ClassView,
        ClassDetails,
        ClassFields,
        UpdateClassRequest,
        ToggleOutcome,
        ToggleResponse,
        FieldError
    )),
    tags(
        (name = "booking", description = "Class attendance toggling"),
        (name = "classes", description = "Class authoring"),
        (name = "members", description = "Member schedules")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
