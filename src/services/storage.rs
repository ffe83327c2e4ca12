use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};

use crate::core::config::Settings;

/// The two object namespaces of the system: illustrations attached to
/// questions, and captured answer photos keyed `{submission_id}/{question_id}`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StorageBucket {
    QuestionImages,
    AnswerImages,
}

#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    endpoint: String,
    question_bucket: String,
    answer_bucket: String,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if settings.s3().access_key.is_empty() || settings.s3().secret_key.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "examly-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);

        Ok(Some(Self {
            client,
            endpoint: settings.s3().endpoint.clone(),
            question_bucket: settings.s3().question_bucket.clone(),
            answer_bucket: settings.s3().answer_bucket.clone(),
        }))
    }

    fn bucket_name(&self, bucket: StorageBucket) -> &str {
        match bucket {
            StorageBucket::QuestionImages => &self.question_bucket,
            StorageBucket::AnswerImages => &self.answer_bucket,
        }
    }

    pub(crate) async fn upload_bytes(
        &self,
        bucket: StorageBucket,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<(i64, String)> {
        let size = bytes.len() as i64;
        let hash = Sha256::digest(&bytes);
        let hash_hex = hex::encode(hash);

        self.client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok((size, hash_hex))
    }

    /// Both buckets are served publicly; references stored on rows are
    /// plain URLs, not presigned ones.
    pub(crate) fn public_url(&self, bucket: StorageBucket, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint.trim_end_matches('/'), self.bucket_name(bucket), key)
    }
}

#[cfg(test)]
mod tests {
    use super::{StorageBucket, StorageService};
    use crate::core::config::Settings;
    use crate::test_support;

    #[tokio::test]
    async fn public_url_joins_endpoint_bucket_and_key() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        test_support::set_test_storage_env();

        let settings = Settings::load().expect("settings");
        let storage = StorageService::from_settings(&settings)
            .await
            .expect("storage")
            .expect("storage enabled");

        let url = storage.public_url(StorageBucket::AnswerImages, "sub-1/q-1.jpg");
        assert_eq!(url, "http://localhost:9000/answer-images/sub-1/q-1.jpg");

        let url = storage.public_url(StorageBucket::QuestionImages, "exam-1/pic.jpg");
        assert_eq!(url, "http://localhost:9000/question-images/exam-1/pic.jpg");
    }

    #[tokio::test]
    async fn storage_is_disabled_without_credentials() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        let storage = StorageService::from_settings(&settings).await.expect("storage");
        assert!(storage.is_none());
    }
}
