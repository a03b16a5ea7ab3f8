//! Routes served by the bundled server.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use updraft_core::{
    AfterSignedUrl, AfterSignedUrlContext, BeforeUpload, BeforeUploadContext, HookError,
    MultipartConfig, ObjectInfo, ObjectInfoPlan, RouteConfig, SchemaIssue, UploadHooks,
    UploadRouterBuilder,
};

/// Part size for the `multipart` route: the S3 minimum of 5 MiB.
const DEMO_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Register the demo routes on `builder`.
///
/// - `image`: one image up to the default size limit
/// - `images`: up to five images of 4 MiB each
/// - `multipart`: one video up to 1 GiB, uploaded in parts
/// - `form`: up to three files placed under the `folder` client metadata
pub fn register(builder: UploadRouterBuilder) -> UploadRouterBuilder {
    builder
        .route(
            "image",
            RouteConfig::builder().file_types(&["image/*"]).build(),
        )
        .route(
            "images",
            RouteConfig::builder()
                .file_types(&["image/*"])
                .multiple_files(true)
                .max_files(5)
                .max_file_size(4 * 1024 * 1024)
                .build(),
        )
        .route(
            "multipart",
            RouteConfig::builder()
                .file_types(&["video/*"])
                .max_file_size(1024 * 1024 * 1024)
                .multipart(MultipartConfig::builder().part_size(DEMO_PART_SIZE).build())
                .build(),
        )
        .route(
            "form",
            RouteConfig::builder()
                .multiple_files(true)
                .client_metadata_schema(Arc::new(folder_schema))
                .hooks(Arc::new(FolderHooks))
                .build(),
        )
}

/// Requires `{"folder": "<non-empty string>"}`.
fn folder_schema(value: &Value) -> Result<Value, Vec<SchemaIssue>> {
    match value.get("folder").and_then(Value::as_str) {
        Some(folder) if !folder.trim().is_empty() => Ok(json!({ "folder": folder.trim() })),
        _ => Err(vec![SchemaIssue {
            message: "Expected a non-empty string.".to_owned(),
            path: vec!["folder".to_owned()],
        }]),
    }
}

#[derive(Debug)]
struct FolderHooks;

#[async_trait]
impl UploadHooks for FolderHooks {
    async fn before_upload(&self, ctx: BeforeUploadContext<'_>) -> Result<BeforeUpload, HookError> {
        let folder = ctx
            .client_metadata
            .get("folder")
            .and_then(Value::as_str)
            .ok_or_else(|| HookError::reject("Missing folder."))?
            .to_owned();

        let mut metadata = serde_json::Map::new();
        metadata.insert("folder".to_owned(), Value::String(folder.clone()));

        Ok(BeforeUpload {
            metadata,
            bucket_name: None,
            object_info: ObjectInfoPlan::PerFile(Box::new(move |file| {
                ObjectInfo::builder()
                    .metadata(BTreeMap::from([
                        ("folder".to_owned(), folder.clone()),
                        ("original-name".to_owned(), file.name.clone()),
                    ]))
                    .build()
            })),
        })
    }

    async fn after_signed_url(
        &self,
        ctx: AfterSignedUrlContext<'_>,
    ) -> Result<AfterSignedUrl, HookError> {
        let mut metadata = ctx.metadata.clone();
        metadata.insert(
            "keys".to_owned(),
            ctx.files.iter().map(|f| Value::String(f.object_key.clone())).collect(),
        );
        Ok(AfterSignedUrl { metadata })
    }
}
