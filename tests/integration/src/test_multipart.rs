//! Multipart upload integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use http::Method;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;
    use updraft_client::{
        FileUploadInfo, LocalFile, UploadCallbacks, UploadOptions, UploadStatus, Uploader,
    };
    use updraft_model::{ErrorKind, UploadError};

    use crate::{Harness, PART_SIZE, UPLOAD_ID};

    const VIDEO: &[u8] = b"0123456789ab";

    fn uploader(harness: &Harness, retry: u32) -> Uploader {
        Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("video")
                .retry(retry)
                .retry_delay(Duration::from_millis(10))
                .multipart_batch_size(2)
                .build(),
        )
    }

    #[tokio::test]
    async fn test_should_upload_parts_and_complete() {
        let harness = Harness::start(None).await.expect("harness");
        let uploader = uploader(&harness, 0);

        let uploaded = uploader
            .upload_file(LocalFile::from_bytes("clip.mp4", "video/mp4", VIDEO), None)
            .await
            .expect("upload");
        assert_eq!(uploaded.file.status, UploadStatus::Complete);

        let posts = harness.store.requests_with(&Method::POST);
        let initiate = posts.iter().find(|r| r.has_param("uploads")).expect("initiate");
        assert_eq!(initiate.header("content-type"), Some("video/mp4"));

        let mut parts = harness.store.requests_with(&Method::PUT);
        parts.sort_by_key(|r| r.part_number());
        assert_eq!(parts.len(), 3);
        let sizes: Vec<usize> = parts.iter().map(|p| p.body.len()).collect();
        assert_eq!(sizes, vec![PART_SIZE as usize, PART_SIZE as usize, 2]);
        let assembled: Vec<u8> = parts.iter().flat_map(|p| p.body.to_vec()).collect();
        assert_eq!(assembled, VIDEO);
        assert!(parts.iter().all(|p| p.param("uploadId") == Some(UPLOAD_ID)));

        let complete = posts
            .iter()
            .find(|r| r.param("uploadId") == Some(UPLOAD_ID))
            .expect("completion");
        let xml = String::from_utf8(complete.body.to_vec()).expect("utf-8 body");
        assert_eq!(complete.header("content-type"), Some("application/xml"));
        assert_eq!(
            xml,
            "<CompleteMultipartUpload>\
             <Part><ETag>etag-1</ETag><PartNumber>1</PartNumber></Part>\
             <Part><ETag>etag-2</ETag><PartNumber>2</PartNumber></Part>\
             <Part><ETag>etag-3</ETag><PartNumber>3</PartNumber></Part>\
             </CompleteMultipartUpload>"
        );
        assert!(harness.store.requests_with(&Method::DELETE).is_empty());
    }

    #[tokio::test]
    async fn test_should_abort_session_when_part_keeps_failing() {
        let harness = Harness::start(Some(2)).await.expect("harness");
        let uploader = uploader(&harness, 1);

        let result = uploader
            .upload_async(
                vec![LocalFile::from_bytes("clip.mp4", "video/mp4", VIDEO)],
                None,
            )
            .await
            .expect("critical path succeeds");

        assert!(result.files.is_empty());
        assert_eq!(result.failed_files.len(), 1);
        assert_eq!(result.failed_files[0].error, Some(UploadError::s3_upload()));
        assert!(uploader.has_failed_files());

        let part_two = harness
            .store
            .requests_with(&Method::PUT)
            .into_iter()
            .filter(|r| r.part_number() == Some(2))
            .count();
        assert_eq!(part_two, 2);

        let completions = harness
            .store
            .requests_with(&Method::POST)
            .into_iter()
            .filter(|r| r.param("uploadId").is_some())
            .count();
        assert_eq!(completions, 0);

        let aborts = harness.store.requests_with(&Method::DELETE);
        assert_eq!(aborts.len(), 1);
        assert_eq!(aborts[0].param("uploadId"), Some(UPLOAD_ID));
    }

    #[tokio::test]
    async fn test_should_fail_single_file_upload_after_part_failure() {
        let harness = Harness::start(Some(1)).await.expect("harness");
        let uploader = uploader(&harness, 0);

        let err = uploader
            .upload_file(LocalFile::from_bytes("clip.mp4", "video/mp4", VIDEO), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "Failed to upload file.");
    }

    #[derive(Debug, Default)]
    struct ProgressRecorder {
        events: Mutex<Vec<(UploadStatus, f64)>>,
    }

    #[async_trait]
    impl UploadCallbacks for ProgressRecorder {
        fn on_upload_progress(&self, file: &FileUploadInfo) {
            self.events.lock().push((file.status, file.progress));
        }
    }

    #[tokio::test]
    async fn test_should_report_capped_progress_until_complete() {
        let harness = Harness::start(None).await.expect("harness");
        let recorder = Arc::new(ProgressRecorder::default());
        let callbacks: Arc<dyn UploadCallbacks> = recorder.clone();
        let uploader = Uploader::with_callbacks(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("video")
                .multipart_batch_size(1)
                .build(),
            callbacks,
        );

        uploader
            .upload_file(LocalFile::from_bytes("clip.mp4", "video/mp4", VIDEO), None)
            .await
            .expect("upload");

        let events = recorder.events.lock().clone();
        let (last, earlier) = events.split_last().expect("progress events");
        assert_eq!(last.0, UploadStatus::Complete);
        assert!((last.1 - 1.0).abs() < f64::EPSILON);
        assert!(earlier.iter().all(|(status, p)| *status != UploadStatus::Complete && *p <= 0.99));
        let uploading: Vec<f64> = earlier
            .iter()
            .filter(|(status, _)| *status == UploadStatus::Uploading)
            .map(|(_, p)| *p)
            .collect();
        assert!(uploading.len() >= 3);
        assert!(uploading.windows(2).all(|w| w[0] <= w[1]));
        assert!((uploader.average_progress() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_should_upload_parts_in_batches() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.delay_puts("", Duration::from_millis(150));
        let uploader = uploader(&harness, 0);

        let uploaded = uploader
            .upload_file(LocalFile::from_bytes("clip.mp4", "video/mp4", VIDEO), None)
            .await
            .expect("upload");

        assert_eq!(uploaded.file.status, UploadStatus::Complete);
        assert_eq!(harness.store.requests_with(&Method::PUT).len(), 3);
        assert_eq!(harness.store.max_puts_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_should_abort_session_when_cancelled_mid_transfer() {
        let harness = Harness::start(None).await.expect("harness");
        harness.store.delay_puts("", Duration::from_secs(10));
        let signal = CancellationToken::new();
        let uploader = Uploader::new(
            UploadOptions::builder()
                .api(harness.api.clone())
                .route("video")
                .multipart_batch_size(2)
                .signal(signal.clone())
                .build(),
        );

        let cancel_once_parts_are_sent = async {
            while harness.store.requests_with(&Method::PUT).len() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            signal.cancel();
        };
        let upload = uploader.upload_async(
            vec![LocalFile::from_bytes("clip.mp4", "video/mp4", VIDEO)],
            None,
        );
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(upload, cancel_once_parts_are_sent)
        })
        .await
        .expect("cancellation ends the upload");
        let result = result.expect("critical path succeeds");

        assert!(result.files.is_empty());
        assert_eq!(result.failed_files.len(), 1);
        assert_eq!(result.failed_files[0].error, Some(UploadError::aborted()));
        assert!(uploader.is_aborted());

        let parts: Vec<Option<u32>> = harness
            .store
            .requests_with(&Method::PUT)
            .iter()
            .map(crate::StoreRequest::part_number)
            .collect();
        assert_eq!(parts.len(), 2);
        assert!(!parts.contains(&Some(3)));

        let completions = harness
            .store
            .requests_with(&Method::POST)
            .into_iter()
            .filter(|r| r.param("uploadId").is_some())
            .count();
        assert_eq!(completions, 0);

        let aborts = harness.store.requests_with(&Method::DELETE);
        assert_eq!(aborts.len(), 1);
        assert_eq!(aborts[0].param("uploadId"), Some(UPLOAD_ID));
    }
}
