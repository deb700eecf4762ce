use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppQuery;
use crate::features::auth::AuthenticatedUser;
use crate::features::files::dtos::{
    attachment_disposition, parse_public_flag, FileLookupResponseDto, FileMetaDto,
    UploadFileDto, UploadFormDto,
};
use crate::features::files::services::{FileService, NewUpload};
use crate::features::files::FileError;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Upload a file and receive its share code
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `public`: "true" to make the file retrievable by code (optional, defaults to private)
/// - `type`: Content type used when the file part declares none (optional)
///
/// A bearer token is optional; when present the file is stamped with its subject.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with optional public flag and fallback type",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileMetaDto>),
        (status = 400, description = "Missing file or validation error"),
        (status = 401, description = "Invalid bearer token"),
        (status = 413, description = "Request body exceeds the upload limit"),
        (status = 500, description = "File stored but metadata could not be written"),
        (status = 503, description = "Storage unavailable or no free share code")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileMetaDto>>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut part_type: Option<String> = None;
    let mut fallback_type: Option<String> = None;
    let mut is_public = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart data", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                part_type = field.content_type().map(|s| s.to_string());
                file_name = Some(field.file_name().unwrap_or("").to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read file data", e))?;
                file_data = Some(data.to_vec());
            }
            "public" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read public field", e))?;
                is_public = parse_public_flag(&text);
            }
            "type" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read type field", e))?;
                if !text.trim().is_empty() {
                    fallback_type = Some(text.trim().to_string());
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let form = UploadFormDto {
        file_name: file_name.unwrap_or_default().trim().to_string(),
        content_type: part_type
            .filter(|ct| !ct.trim().is_empty())
            .or(fallback_type),
    };
    form.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let record = service
        .upload(NewUpload {
            data: file_data,
            file_name: form.file_name,
            content_type: form.content_type,
            is_public,
            owner: user.map(|u| u.sub),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(FileMetaDto::from(&record)),
            Some("File uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// Body-limit rejections keep their 413; every other multipart failure is a 400
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    debug!("{}: {}", context, err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{}: {}", context, err.body_text()))
    } else {
        AppError::BadRequest(format!("{}: {}", context, err.body_text()))
    }
}

/// Look up a file by its share code
///
/// Returns public metadata and a short-lived download URL.
#[utoipa::path(
    get,
    path = "/api/file/{code}",
    tag = "files",
    params(
        ("code" = String, Path, description = "Share code (case-insensitive)")
    ),
    responses(
        (status = 200, description = "File found", body = ApiResponse<FileLookupResponseDto>),
        (status = 403, description = "File is private"),
        (status = 404, description = "File not found"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_file(
    State(service): State<Arc<FileService>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<FileLookupResponseDto>>> {
    let result = service.lookup(&code).await?;

    Ok(Json(ApiResponse::success(
        Some(FileLookupResponseDto::from(result)),
        None,
        None,
    )))
}

/// Download file content by share code
#[utoipa::path(
    get,
    path = "/api/file/{code}/content",
    tag = "files",
    params(
        ("code" = String, Path, description = "Share code (case-insensitive)")
    ),
    responses(
        (status = 200, description = "File content with its recorded content type"),
        (status = 403, description = "File is private"),
        (status = 404, description = "File not found"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_file_content(
    State(service): State<Arc<FileService>>,
    Path(code): Path<String>,
) -> Result<Response> {
    let (record, data) = service.fetch_content(&code).await?;

    Ok((
        [
            (header::CONTENT_TYPE, record.content_type.clone()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&record.name)),
        ],
        data,
    )
        .into_response())
}

/// Redirect to a short-lived download URL
///
/// Browser-facing: errors are plain text rather than JSON.
#[utoipa::path(
    get,
    path = "/download/{code}",
    tag = "files",
    params(
        ("code" = String, Path, description = "Share code (case-insensitive)")
    ),
    responses(
        (status = 302, description = "Redirect to the file"),
        (status = 403, description = "File is private"),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_file(
    State(service): State<Arc<FileService>>,
    Path(code): Path<String>,
) -> Response {
    match service.lookup(&code).await {
        Ok(result) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, result.handle.url),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
        )
            .into_response(),
        Err(FileError::NotFound) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(FileError::Forbidden) => (StatusCode::FORBIDDEN, "Private file").into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

/// List public files, newest first
#[utoipa::path(
    get,
    path = "/api/files/public",
    tag = "files",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of public files", body = ApiResponse<Vec<FileMetaDto>>),
        (status = 400, description = "Invalid pagination parameters")
    )
)]
pub async fn list_public_files(
    State(service): State<Arc<FileService>>,
    AppQuery(params): AppQuery<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<FileMetaDto>>>> {
    let page = service.list_public(&params).await?;
    let dtos: Vec<FileMetaDto> = page.records.iter().map(FileMetaDto::from).collect();

    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta::for_page(page.total, &params)),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::routes;
    use crate::features::files::services::RandomCodeGenerator;
    use crate::features::auth::JwtValidator;
    use crate::shared::test_helpers::{
        file_service, unreachable_validator, with_user, InMemoryFileRepository,
        InMemoryObjectStore,
    };
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use std::sync::atomic::Ordering;

    struct Harness {
        server: TestServer,
        store: Arc<InMemoryObjectStore>,
        repo: Arc<InMemoryFileRepository>,
    }

    fn build(user: Option<&str>, validator: Option<Arc<JwtValidator>>) -> Harness {
        let store = Arc::new(InMemoryObjectStore::new());
        let repo = Arc::new(InMemoryFileRepository::new());
        let service = file_service(store.clone(), repo.clone(), RandomCodeGenerator::new(6));

        let mut router = routes(Arc::new(service), validator);
        if let Some(sub) = user {
            router = with_user(router, sub);
        }

        Harness {
            server: TestServer::new(router).unwrap(),
            store,
            repo,
        }
    }

    fn harness_with(user: Option<&str>) -> Harness {
        build(user, None)
    }

    fn harness() -> Harness {
        harness_with(None)
    }

    fn upload_form(data: &[u8], name: &str, public: &str) -> MultipartForm {
        MultipartForm::new().add_text("public", public.to_string()).add_part(
            "file",
            Part::bytes(data.to_vec())
                .file_name(name.to_string())
                .mime_type("text/plain"),
        )
    }

    async fn upload(harness: &Harness, data: &[u8], name: &str, public: &str) -> FileMetaDto {
        let response = harness
            .server
            .post("/api/upload")
            .multipart(upload_form(data, name, public))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: ApiResponse<FileMetaDto> = response.json();
        assert!(body.success);
        body.data.unwrap()
    }

    #[tokio::test]
    async fn test_upload_lookup_and_download() {
        let h = harness();
        let meta = upload(&h, b"hello world", "hello.txt", "true").await;

        assert_eq!(meta.code.len(), 6);
        assert_eq!(meta.name, "hello.txt");
        assert_eq!(meta.content_type, "text/plain");
        assert!(meta.is_public);
        assert_eq!(meta.size_bytes, 11);

        let response = h.server.get(&format!("/api/file/{}", meta.code)).await;
        response.assert_status_ok();
        let body: ApiResponse<FileLookupResponseDto> = response.json();
        let lookup = body.data.unwrap();
        assert_eq!(lookup.meta, meta);
        assert_eq!(lookup.expires_in, 60);
        assert_eq!(h.store.resolve(&lookup.url).unwrap(), b"hello world".to_vec());

        let response = h
            .server
            .get(&format!("/download/{}", meta.code.to_lowercase()))
            .await;
        response.assert_status(StatusCode::FOUND);
        let location = response.header(header::LOCATION);
        assert_eq!(
            h.store.resolve(location.to_str().unwrap()).unwrap(),
            b"hello world".to_vec()
        );
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let h = harness();

        let response = h.server.get("/api/file/ZZZZZZ").await;
        response.assert_status_not_found();
        let body: ApiResponse<()> = response.json();
        assert!(!body.success);
        assert_eq!(body.message.as_deref(), Some("File not found"));

        let response = h.server.get("/download/ZZZZZZ").await;
        response.assert_status_not_found();
        response.assert_text("Not found");
    }

    #[tokio::test]
    async fn test_private_file_is_forbidden() {
        let h = harness();
        let meta = upload(&h, b"secret", "secret.txt", "false").await;
        assert!(!meta.is_public);

        let response = h.server.get(&format!("/api/file/{}", meta.code)).await;
        response.assert_status_forbidden();

        let response = h.server.get(&format!("/download/{}", meta.code)).await;
        response.assert_status_forbidden();
        response.assert_text("Private file");

        let response = h
            .server
            .get(&format!("/api/file/{}/content", meta.code))
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_public_flag_defaults_to_private() {
        let h = harness();

        let form = MultipartForm::new()
            .add_part("file", Part::bytes(b"data".to_vec()).file_name("a.txt"));
        let response = h.server.post("/api/upload").multipart(form).await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<FileMetaDto> = response.json();
        assert!(!body.data.unwrap().is_public);

        let meta = upload(&h, b"data", "b.txt", "yes").await;
        assert!(!meta.is_public);
    }

    #[tokio::test]
    async fn test_missing_file_part_is_bad_request() {
        let h = harness();

        let form = MultipartForm::new().add_text("public", "true");
        let response = h.server.post("/api/upload").multipart(form).await;

        response.assert_status_bad_request();
        let body: ApiResponse<()> = response.json();
        assert_eq!(body.message.as_deref(), Some("File is required"));
        assert_eq!(h.repo.record_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_is_bad_request() {
        let h = harness();

        let response = h
            .server
            .post("/api/upload")
            .multipart(upload_form(b"", "empty.txt", "true"))
            .await;

        response.assert_status_bad_request();
        assert_eq!(h.store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_stamps_authenticated_owner() {
        let h = harness_with(Some("user-42"));
        let meta = upload(&h, b"mine", "mine.txt", "true").await;

        let record = h.repo.record(&meta.code).unwrap();
        assert_eq!(record.owner.as_deref(), Some("user-42"));
    }

    #[tokio::test]
    async fn test_anonymous_upload_has_no_owner() {
        let h = harness();
        let meta = upload(&h, b"anon", "anon.txt", "true").await;

        assert_eq!(h.repo.record(&meta.code).unwrap().owner, None);
    }

    #[tokio::test]
    async fn test_content_endpoint_serves_bytes() {
        let h = harness();
        let meta = upload(&h, b"raw bytes", "notes.txt", "true").await;

        let response = h
            .server
            .get(&format!("/api/file/{}/content", meta.code))
            .await;

        response.assert_status_ok();
        assert_eq!(response.as_bytes().to_vec(), b"raw bytes".to_vec());
        assert_eq!(response.header(header::CONTENT_TYPE), "text/plain");
        assert_eq!(
            response.header(header::CONTENT_DISPOSITION),
            "attachment; filename=\"notes.txt\"; filename*=UTF-8''notes.txt"
        );
    }

    #[tokio::test]
    async fn test_storage_outage_is_service_unavailable() {
        let h = harness();
        h.store.fail_puts.store(true, Ordering::SeqCst);

        let response = h
            .server
            .post("/api/upload")
            .multipart(upload_form(b"data", "a.txt", "true"))
            .await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(h.repo.record_count(), 0);
    }

    #[tokio::test]
    async fn test_list_public_files() {
        let h = harness();
        upload(&h, b"1", "one.txt", "true").await;
        upload(&h, b"2", "two.txt", "true").await;
        upload(&h, b"3", "three.txt", "false").await;

        let response = h
            .server
            .get("/api/files/public")
            .add_query_param("page_size", 1)
            .await;

        response.assert_status_ok();
        let body: ApiResponse<Vec<FileMetaDto>> = response.json();
        assert_eq!(body.data.unwrap().len(), 1);
        assert_eq!(
            body.meta,
            Some(Meta {
                total: 2,
                page: 1,
                page_size: 1,
            })
        );

        let response = h.server.get("/api/files/public?page=abc").await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_lookups_ignore_bearer_tokens() {
        let h = build(None, Some(unreachable_validator()));
        let public = upload(&h, b"open", "open.txt", "true").await;
        let private = upload(&h, b"closed", "closed.txt", "false").await;

        h.server
            .get(&format!("/api/file/{}", public.code))
            .authorization_bearer("stale.jwt.token")
            .await
            .assert_status_ok();
        h.server
            .get(&format!("/api/file/{}/content", public.code))
            .authorization_bearer("stale.jwt.token")
            .await
            .assert_status_ok();
        h.server
            .get(&format!("/download/{}", public.code))
            .authorization_bearer("stale.jwt.token")
            .await
            .assert_status(StatusCode::FOUND);
        h.server
            .get(&format!("/api/file/{}", private.code))
            .authorization_bearer("stale.jwt.token")
            .await
            .assert_status_forbidden();
        h.server
            .get("/api/file/ZZZZZZ")
            .authorization_bearer("stale.jwt.token")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_upload_rejects_invalid_bearer_token() {
        let h = build(None, Some(unreachable_validator()));

        let response = h
            .server
            .post("/api/upload")
            .authorization_bearer("stale.jwt.token")
            .multipart(upload_form(b"data", "a.txt", "true"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(h.repo.record_count(), 0);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_payload_too_large() {
        let h = harness();
        // Cap is 1 MiB plus 1 MiB of multipart headroom
        let oversized = vec![7u8; 3 * 1024 * 1024];

        let response = h
            .server
            .post("/api/upload")
            .multipart(upload_form(&oversized, "big.bin", "true"))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(h.store.object_count(), 0);
    }
}
