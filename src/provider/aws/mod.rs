//! # AWS EC2 Client
//!
//! [`CloudClient`] backed by the official AWS SDK.
//!
//! Clients are built per reconcile from the static keys in the record's
//! credential secret and the record's region. The ambient credential chain
//! (environment, IRSA, instance profile) is never consulted, so one operator
//! can manage resources across any number of accounts.

mod credentials;
mod error;

pub use credentials::{StaticKeys, ACCESS_KEY_FIELD, SECRET_KEY_FIELD};
pub use error::{is_not_found_code, is_throttling_code};

use crate::crd::{InstanceSpec, Tag};
use crate::observability::metrics;
use crate::provider::{
    CloudClient, CloudClientFactory, CredentialError, LaunchedInstance, ProviderError,
};
use crate::store::SecretPayload;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::primitives::Blob;
use aws_sdk_ec2::types::{
    IamInstanceProfileSpecification, InstanceType, ResourceType, Tag as Ec2Tag, TagSpecification,
};
use aws_sdk_ec2::Client;
use base64::Engine;
use tracing::{debug, info, info_span, Instrument};

const RUN_INSTANCES: &str = "RunInstances";
const DESCRIBE_INSTANCES: &str = "DescribeInstances";
const CREATE_TAGS: &str = "CreateTags";
const TERMINATE_INSTANCES: &str = "TerminateInstances";
const IMPORT_KEY_PAIR: &str = "ImportKeyPair";
const DELETE_KEY_PAIR: &str = "DeleteKeyPair";

/// EC2 client scoped to one account and region
pub struct Ec2Client {
    client: Client,
    region: String,
}

impl std::fmt::Debug for Ec2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ec2Client")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

fn sdk_tags(tags: &[Tag]) -> Vec<Ec2Tag> {
    tags.iter()
        .map(|t| Ec2Tag::builder().key(&t.name).value(&t.value).build())
        .collect()
}

fn iam_profile(profile: &str) -> IamInstanceProfileSpecification {
    let builder = IamInstanceProfileSpecification::builder();
    if profile.starts_with("arn:") {
        builder.arn(profile).build()
    } else {
        builder.name(profile).build()
    }
}

/// Count the call and its failure, then hand the result back unchanged
fn observe<T>(operation: &'static str, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
    metrics::increment_provider_calls(operation);
    if result.is_err() {
        metrics::increment_provider_errors(operation);
    }
    result
}

#[async_trait]
impl CloudClient for Ec2Client {
    async fn launch(
        &self,
        spec: &InstanceSpec,
        client_token: &str,
    ) -> Result<LaunchedInstance, ProviderError> {
        let span = info_span!(
            "ec2.run_instances",
            image.id = %spec.image_id,
            instance.type = %spec.instance_type,
            region = %self.region
        );

        let result = async {
            let mut request = self
                .client
                .run_instances()
                .image_id(&spec.image_id)
                .instance_type(InstanceType::from(spec.instance_type.as_str()))
                .min_count(1)
                .max_count(1);

            if !client_token.is_empty() {
                request = request.client_token(client_token);
            }
            if !spec.subnet_id.is_empty() {
                request = request.subnet_id(&spec.subnet_id);
            }
            if !spec.key_name.is_empty() {
                request = request.key_name(&spec.key_name);
            }
            if !spec.security_group_ids.is_empty() {
                request = request.set_security_group_ids(Some(spec.security_group_ids.clone()));
            }
            if !spec.security_groups.is_empty() {
                request = request.set_security_groups(Some(spec.security_groups.clone()));
            }
            if !spec.iam_instance_profile.is_empty() {
                request = request.iam_instance_profile(iam_profile(&spec.iam_instance_profile));
            }
            if !spec.user_data.is_empty() {
                request = request.user_data(
                    base64::engine::general_purpose::STANDARD.encode(spec.user_data.as_bytes()),
                );
            }

            let response = request
                .send()
                .await
                .map_err(|e| error::from_sdk(RUN_INSTANCES, &e))?;

            let instance = response.instances().first().ok_or_else(|| {
                ProviderError::new(RUN_INSTANCES, None, "no instance in reservation")
            })?;
            let instance_id = instance
                .instance_id()
                .ok_or_else(|| ProviderError::new(RUN_INSTANCES, None, "instance has no id"))?
                .to_string();
            let private_ip = instance.private_ip_address().unwrap_or_default().to_string();

            info!(instance.id = %instance_id, private.ip = %private_ip, "Instance launched");
            Ok(LaunchedInstance {
                instance_id,
                private_ip,
            })
        }
        .instrument(span)
        .await;

        observe(RUN_INSTANCES, result)
    }

    async fn describe_public_ip(&self, instance_id: &str) -> Result<Option<String>, ProviderError> {
        let result = async {
            let response = self
                .client
                .describe_instances()
                .instance_ids(instance_id)
                .send()
                .await
                .map_err(|e| error::from_sdk(DESCRIBE_INSTANCES, &e))?;

            let public_ip = response
                .reservations()
                .iter()
                .flat_map(|r| r.instances())
                .find(|i| i.instance_id() == Some(instance_id))
                .and_then(|i| i.public_ip_address())
                .filter(|ip| !ip.is_empty())
                .map(str::to_string);

            debug!(public.ip = ?public_ip, "Described instance");
            Ok(public_ip)
        }
        .instrument(info_span!("ec2.describe_instances", instance.id = %instance_id))
        .await;

        observe(DESCRIBE_INSTANCES, result)
    }

    async fn tag(&self, instance_id: &str, tags: &[Tag]) -> Result<(), ProviderError> {
        let result = self
            .client
            .create_tags()
            .resources(instance_id)
            .set_tags(Some(sdk_tags(tags)))
            .send()
            .instrument(info_span!("ec2.create_tags", instance.id = %instance_id, tag.count = tags.len()))
            .await
            .map(|_| ())
            .map_err(|e| error::from_sdk(CREATE_TAGS, &e));

        observe(CREATE_TAGS, result)
    }

    async fn terminate(&self, instance_id: &str) -> Result<(), ProviderError> {
        let result = self
            .client
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .instrument(info_span!("ec2.terminate_instances", instance.id = %instance_id))
            .await
            .map(|_| ())
            .map_err(|e| error::from_sdk(TERMINATE_INSTANCES, &e));

        observe(TERMINATE_INSTANCES, result)
    }

    async fn import_key(
        &self,
        key_name: &str,
        public_key: &str,
        tags: &[Tag],
    ) -> Result<String, ProviderError> {
        let result = async {
            let response = self
                .client
                .import_key_pair()
                .key_name(key_name)
                .public_key_material(Blob::new(public_key.as_bytes()))
                .tag_specifications(
                    TagSpecification::builder()
                        .resource_type(ResourceType::KeyPair)
                        .set_tags(Some(sdk_tags(tags)))
                        .build(),
                )
                .send()
                .await
                .map_err(|e| error::from_sdk(IMPORT_KEY_PAIR, &e))?;

            response.key_pair_id().map(str::to_string).ok_or_else(|| {
                ProviderError::new(IMPORT_KEY_PAIR, None, "response carried no key pair id")
            })
        }
        .instrument(info_span!("ec2.import_key_pair", key.name = %key_name))
        .await;

        observe(IMPORT_KEY_PAIR, result)
    }

    async fn delete_key(&self, key_pair_id: &str) -> Result<(), ProviderError> {
        let result = self
            .client
            .delete_key_pair()
            .key_pair_id(key_pair_id)
            .send()
            .instrument(info_span!("ec2.delete_key_pair", key_pair.id = %key_pair_id))
            .await
            .map(|_| ())
            .map_err(|e| error::from_sdk(DELETE_KEY_PAIR, &e));

        observe(DELETE_KEY_PAIR, result)
    }
}

/// Builds an [`Ec2Client`] per reconcile
#[derive(Debug, Clone, Default)]
pub struct Ec2ClientFactory {
    endpoint_url: Option<String>,
}

impl Ec2ClientFactory {
    /// `endpoint_url` points the SDK at an EC2-compatible emulator instead of AWS
    #[must_use]
    pub fn new(endpoint_url: Option<String>) -> Self {
        Self { endpoint_url }
    }
}

#[async_trait]
impl CloudClientFactory for Ec2ClientFactory {
    async fn connect(
        &self,
        credentials: &SecretPayload,
        region: &str,
    ) -> Result<Box<dyn CloudClient>, CredentialError> {
        let keys = StaticKeys::from_payload(credentials)?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(keys.to_sdk_credentials())
            .load()
            .await;

        let mut builder = aws_sdk_ec2::config::Builder::from(&sdk_config);
        if let Some(url) = &self.endpoint_url {
            builder = builder.endpoint_url(url);
        }

        debug!(region = %region, endpoint = ?self.endpoint_url, "Built EC2 client");
        Ok(Box::new(Ec2Client {
            client: Client::from_conf(builder.build()),
            region: region.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iam_profile_arn_or_name() {
        let by_arn = iam_profile("arn:aws:iam::123456789012:instance-profile/web");
        assert_eq!(
            by_arn.arn(),
            Some("arn:aws:iam::123456789012:instance-profile/web")
        );
        assert_eq!(by_arn.name(), None);

        let by_name = iam_profile("web");
        assert_eq!(by_name.name(), Some("web"));
        assert_eq!(by_name.arn(), None);
    }

    #[test]
    fn test_sdk_tags_preserve_order() {
        let tags = crate::crd::with_name_tag(&[Tag::new("team", "infra")], "web-1");
        let converted = sdk_tags(&tags);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].key(), Some("team"));
        assert_eq!(converted[1].key(), Some("Name"));
        assert_eq!(converted[1].value(), Some("web-1"));
    }
}
