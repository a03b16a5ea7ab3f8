//! Single-request upload integration tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::{HeaderMap, HeaderValue, Method};
    use tokio_util::sync::CancellationToken;
    use updraft_client::{LocalFile, UploadOptions, UploadStatus, Uploader};
    use updraft_model::{ErrorKind, UploadError};

    use crate::{BUCKET, Harness};

    fn uploader(harness: &Harness, route: &str) -> Uploader {
        Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route(route)
                .build(),
        )
    }

    #[tokio::test]
    async fn test_should_upload_files_with_single_put() {
        let harness = Harness::start(None).await.expect("harness");
        let uploader = uploader(&harness, "text");

        let result = uploader
            .upload_async(
                vec![
                    LocalFile::from_bytes("notes.txt", "text/plain", "hello world"),
                    LocalFile::from_bytes("Read Me.md", "text/markdown", "# title"),
                ],
                None,
            )
            .await
            .expect("upload");

        assert_eq!(result.files.len(), 2);
        assert!(result.failed_files.is_empty());
        assert!(uploader.all_succeeded());
        assert!(uploader.is_settled());
        assert!((uploader.average_progress() - 1.0).abs() < f64::EPSILON);

        let puts = harness.store.requests_with(&Method::PUT);
        assert_eq!(puts.len(), 2);
        for info in &result.files {
            assert_eq!(info.status, UploadStatus::Complete);
            let path = format!("/{BUCKET}/{}", info.object_key());
            let put = puts.iter().find(|p| p.path == path).expect("matching PUT");
            assert!(put.has_param("X-Amz-Signature"));
        }

        let notes = puts
            .iter()
            .find(|p| p.body.as_ref() == b"hello world")
            .expect("notes upload");
        assert_eq!(notes.header("content-type"), Some("text/plain"));
        assert!(notes.path.ends_with("-notes.txt"));

        let readme = puts
            .iter()
            .find(|p| p.body.as_ref() == b"# title")
            .expect("readme upload");
        assert!(readme.path.ends_with("-read-me.md"));
    }

    #[tokio::test]
    async fn test_should_pass_through_validation_rejection() {
        let harness = Harness::start(None).await.expect("harness");
        let uploader = uploader(&harness, "text");

        let err = uploader
            .upload_async(
                vec![LocalFile::from_bytes("photo.png", "image/png", "png")],
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidFileType);
        assert_eq!(uploader.error(), Some(err));
        assert!(uploader.progresses().is_empty());
        assert!(harness.store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_too_many_files() {
        let harness = Harness::start(None).await.expect("harness");
        let uploader = uploader(&harness, "text");
        let files = (0..4)
            .map(|i| LocalFile::from_bytes(format!("{i}.txt"), "text/plain", "x"))
            .collect();

        let err = uploader.upload_async(files, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyFiles);
    }

    #[tokio::test]
    async fn test_should_reject_unauthenticated_hook() {
        let harness = Harness::start(None).await.expect("harness");
        let uploader = uploader(&harness, "private");

        let err = uploader
            .upload_file(LocalFile::from_bytes("a.bin", "application/octet-stream", "a"), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Rejected);
        assert_eq!(err.message, "Not logged in.");
    }

    #[tokio::test]
    async fn test_should_return_hook_metadata_to_client() {
        let harness = Harness::start(None).await.expect("harness");
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("alice"));
        let uploader = Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("private")
                .headers(headers)
                .build(),
        );

        let uploaded = uploader
            .upload_file(LocalFile::from_bytes("a.bin", "application/octet-stream", "a"), None)
            .await
            .expect("upload");

        assert_eq!(uploaded.metadata["user"], "alice");
        assert_eq!(uploader.metadata()["user"], "alice");
        assert_eq!(uploaded.file.status, UploadStatus::Complete);
    }

    #[tokio::test]
    async fn test_should_report_aborted_when_cancelled() {
        let harness = Harness::start(None).await.expect("harness");
        let signal = CancellationToken::new();
        let uploader = Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("text")
                .signal(signal.clone())
                .build(),
        );
        signal.cancel();

        let result = uploader
            .upload(vec![LocalFile::from_bytes("a.txt", "text/plain", "a")], None)
            .await;

        assert!(result.files.is_empty());
        assert!(uploader.is_aborted());
        assert_eq!(uploader.error().map(|e| e.kind), Some(ErrorKind::Aborted));
        assert!(harness.store.requests().is_empty());
    }

    fn retrying_uploader(harness: &Harness, retry: u32) -> Uploader {
        Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("text")
                .retry(retry)
                .retry_delay(Duration::from_millis(10))
                .build(),
        )
    }

    #[tokio::test]
    async fn test_should_keep_sibling_when_one_put_fails() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.fail_puts("-bad.txt", None);
        let uploader = retrying_uploader(&harness, 1);

        let result = uploader
            .upload_async(
                vec![
                    LocalFile::from_bytes("good.txt", "text/plain", "fine"),
                    LocalFile::from_bytes("bad.txt", "text/plain", "broken"),
                ],
                None,
            )
            .await
            .expect("critical path succeeds");

        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].object_key().ends_with("-good.txt"));
        assert_eq!(result.failed_files.len(), 1);
        assert!(result.failed_files[0].object_key().ends_with("-bad.txt"));
        assert_eq!(result.failed_files[0].error, Some(UploadError::s3_upload()));
        assert!(uploader.has_failed_files());
        assert!(!uploader.all_succeeded());
        assert!(uploader.is_settled());
        assert_eq!(harness.store.requests_for("-bad.txt").len(), 2);
    }

    #[tokio::test]
    async fn test_should_retry_failed_put_until_it_succeeds() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.fail_puts("-flaky.txt", Some(2));
        let uploader = retrying_uploader(&harness, 2);

        let uploaded = uploader
            .upload_file(LocalFile::from_bytes("flaky.txt", "text/plain", "again"), None)
            .await
            .expect("upload");

        assert_eq!(uploaded.file.status, UploadStatus::Complete);
        let attempts = harness.store.requests_for("-flaky.txt");
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|r| r.body.as_ref() == b"again"));
    }

    #[tokio::test]
    async fn test_should_fail_put_when_retries_are_exhausted() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.fail_puts("-flaky.txt", Some(2));
        let uploader = retrying_uploader(&harness, 1);

        let err = uploader
            .upload_file(LocalFile::from_bytes("flaky.txt", "text/plain", "again"), None)
            .await
            .unwrap_err();

        assert_eq!(err.message, "Failed to upload file.");
        assert_eq!(harness.store.requests_for("-flaky.txt").len(), 2);
    }

    #[tokio::test]
    async fn test_should_upload_files_in_batches() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.delay_puts("", Duration::from_millis(150));
        let uploader = Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("text")
                .upload_batch_size(2)
                .build(),
        );
        let files = (0..3)
            .map(|i| LocalFile::from_bytes(format!("{i}.txt"), "text/plain", "x"))
            .collect();

        let result = uploader.upload_async(files, None).await.expect("upload");

        assert_eq!(result.files.len(), 3);
        assert_eq!(harness.store.requests_with(&Method::PUT).len(), 3);
        assert_eq!(harness.store.max_puts_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_should_keep_completed_file_when_cancelled_mid_transfer() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.delay_puts("-slow.txt", Duration::from_secs(10));
        let signal = CancellationToken::new();
        let uploader = Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("text")
                .signal(signal.clone())
                .build(),
        );

        let cancel_after_fast_file = async {
            loop {
                let fast_done = uploader.uploaded_files().len() == 1;
                let slow_sent = !harness.store.requests_for("-slow.txt").is_empty();
                if fast_done && slow_sent {
                    signal.cancel();
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        let upload = uploader.upload_async(
            vec![
                LocalFile::from_bytes("fast.txt", "text/plain", "quick"),
                LocalFile::from_bytes("slow.txt", "text/plain", "sluggish"),
            ],
            None,
        );
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(upload, cancel_after_fast_file)
        })
        .await
        .expect("cancellation ends the upload");
        let result = result.expect("critical path succeeds");

        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].object_key().ends_with("-fast.txt"));
        assert_eq!(result.files[0].status, UploadStatus::Complete);
        assert_eq!(result.failed_files.len(), 1);
        assert!(result.failed_files[0].object_key().ends_with("-slow.txt"));
        assert_eq!(result.failed_files[0].error, Some(UploadError::aborted()));
        assert!(uploader.is_aborted());
        assert!(uploader.is_settled());
    }
}
