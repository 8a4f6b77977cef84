//! S3 backend. A container maps to a bucket; listing pages through
//! ListObjectsV2 with continuation tokens.

use crate::config::S3Settings;
use crate::error::StoreError;
use crate::store::{ObjectDescriptor, ObjectStore, ObjectStream};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::Object;
use chrono::DateTime;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

pub struct S3Store {
    client: Client,
}

enum PageCursor {
    First,
    Next(String),
    Exhausted,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads credentials through the default AWS provider chain.
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.force_path_style)
            .build();
        debug!(
            region = ?settings.region,
            endpoint = ?settings.endpoint,
            force_path_style = settings.force_path_style,
            "S3 client configured"
        );
        Self::new(Client::from_conf(s3_config))
    }
}

fn descriptor_from_object(object: &Object) -> Option<ObjectDescriptor> {
    let name = object.key().filter(|key| !key.is_empty())?;
    let last_modified = object
        .last_modified()
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));
    Some(ObjectDescriptor::new(name, last_modified))
}

async fn fetch_page(
    client: &Client,
    bucket: &str,
    token: Option<String>,
) -> Result<(Vec<ObjectDescriptor>, PageCursor), StoreError> {
    let resp = client
        .list_objects_v2()
        .bucket(bucket)
        .set_continuation_token(token)
        .send()
        .await
        .map_err(|e| StoreError::backend("list objects", DisplayErrorContext(&e).to_string()))?;

    let page: Vec<ObjectDescriptor> = resp
        .contents()
        .iter()
        .filter_map(descriptor_from_object)
        .collect();
    debug!(bucket = %bucket, objects = page.len(), "fetched listing page");

    let next = match (resp.is_truncated(), resp.next_continuation_token()) {
        (Some(true), Some(token)) => PageCursor::Next(token.to_string()),
        _ => PageCursor::Exhausted,
    };
    Ok((page, next))
}

#[async_trait]
impl ObjectStore for S3Store {
    fn kind(&self) -> &'static str {
        "s3"
    }

    fn list_objects(&self, container: &str) -> ObjectStream {
        let client = self.client.clone();
        let bucket = container.to_string();

        stream::try_unfold(PageCursor::First, move |cursor| {
            let client = client.clone();
            let bucket = bucket.clone();
            async move {
                let token = match cursor {
                    PageCursor::Exhausted => return Ok(None),
                    PageCursor::First => None,
                    PageCursor::Next(token) => Some(token),
                };
                fetch_page(&client, &bucket, token).await.map(Some)
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, StoreError>)))
        .try_flatten()
        .boxed()
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await;

        let output = match resp {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Err(StoreError::not_found(container, key));
            }
            Err(e) => {
                return Err(StoreError::backend(
                    "get object",
                    DisplayErrorContext(&e).to_string(),
                ));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::backend("read object body", e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StoreError::backend("put object", DisplayErrorContext(&e).to_string()))
    }
}
