use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        files_handlers::upload_file,
        files_handlers::get_file,
        files_handlers::get_file_content,
        files_handlers::download_file,
        files_handlers::list_public_files,
    ),
    components(
        schemas(
            Meta,
            files_dtos::UploadFileDto,
            files_dtos::FileMetaDto,
            files_dtos::FileLookupResponseDto,
            ApiResponse<files_dtos::FileMetaDto>,
            ApiResponse<files_dtos::FileLookupResponseDto>,
            ApiResponse<Vec<files_dtos::FileMetaDto>>,
        )
    ),
    tags(
        (name = "files", description = "Share files by short code"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Codedrop API",
        version = "0.1.0",
        description = "Upload a file, get a six-character code, retrieve by code",
    )
)]
pub struct ApiDoc;

/// Adds the optional Bearer JWT scheme accepted on upload
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
