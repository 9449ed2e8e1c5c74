//! Request and response bodies for the object storage service.

use serde::{Deserialize, Serialize};

/// Retention policy applied to a new bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BucketPolicy {
    Transient,
    Temporary,
    #[default]
    Persistent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest {
    pub bucket_key: String,
    pub policy_key: BucketPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub bucket_key: String,
    #[serde(default)]
    pub created_date: Option<u64>,
    #[serde(default)]
    pub policy_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketList {
    #[serde(default)]
    pub items: Vec<BucketSummary>,
    #[serde(default)]
    pub next: Option<String>,
}

impl BucketList {
    pub fn contains(&self, bucket_key: &str) -> bool {
        self.items.iter().any(|bucket| bucket.bucket_key == bucket_key)
    }

    /// `startAt` key of the following page, read from the `next` link.
    ///
    /// Bucket keys are limited to `[-_.a-z0-9]`, so the value needs no decoding.
    pub fn next_start_at(&self) -> Option<&str> {
        let next = self.next.as_deref()?;
        let query = next.split_once('?').map_or(next, |(_, query)| query);
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("startAt="))
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub object_key: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectList {
    #[serde(default)]
    pub items: Vec<ObjectSummary>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetails {
    pub bucket_key: String,
    pub object_key: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Request for a time-boxed URL on a single object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    pub minutes_expiration: u32,
    pub single_use: bool,
}

impl Default for SignedUrlRequest {
    /// Forty-five minutes, usable once.
    fn default() -> Self {
        Self {
            minutes_expiration: 45,
            single_use: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub signed_url: String,
    #[serde(default)]
    pub expiration: Option<u64>,
    #[serde(default)]
    pub single_use: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signed_url_request_defaults_to_single_use_45_minutes() {
        assert_eq!(
            serde_json::to_value(SignedUrlRequest::default()).unwrap(),
            json!({"minutesExpiration": 45, "singleUse": true})
        );
    }

    #[test]
    fn bucket_list_matches_exact_keys_only() {
        let list: BucketList = serde_json::from_value(json!({
            "items": [{"bucketKey": "abcinput", "createdDate": 1, "policyKey": "persistent"}]
        }))
        .unwrap();
        assert!(list.contains("abcinput"));
        assert!(!list.contains("abc"));
    }

    #[test]
    fn next_page_key_comes_from_the_next_link() {
        let list: BucketList = serde_json::from_value(json!({
            "items": [{"bucketKey": "other1"}],
            "next": "https://storage.example.com/oss/v2/buckets?limit=10&startAt=other1"
        }))
        .unwrap();
        assert_eq!(list.next_start_at(), Some("other1"));

        let last: BucketList = serde_json::from_value(json!({"items": []})).unwrap();
        assert_eq!(last.next_start_at(), None);
        let bare: BucketList = serde_json::from_value(json!({"next": "https://storage.example.com/oss/v2/buckets"})).unwrap();
        assert_eq!(bare.next_start_at(), None);
    }

    #[test]
    fn object_listing_decodes_keys_and_sizes() {
        let list: ObjectList = serde_json::from_value(json!({
            "items": [{"bucketKey": "abcinput", "objectKey": "box.ipt", "objectId": "urn:box", "size": 4}]
        }))
        .unwrap();
        assert_eq!(list.items[0].object_key, "box.ipt");
        assert_eq!(list.items[0].size, Some(4));
        assert!(list.next.is_none());

        let details: ObjectDetails = serde_json::from_value(json!({
            "bucketKey": "abcinput", "objectKey": "box.ipt", "size": 4, "contentType": "application/octet-stream"
        }))
        .unwrap();
        assert_eq!(details.size, Some(4));
        assert_eq!(details.content_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn create_bucket_request_uses_lowercase_policy() {
        let request = CreateBucketRequest {
            bucket_key: "abcoutput".into(),
            policy_key: BucketPolicy::default(),
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"bucketKey": "abcoutput", "policyKey": "persistent"})
        );
    }
}
