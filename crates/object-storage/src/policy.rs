//! Bucket access policies.

use serde_json::json;

/// Access policy applied to a bucket after it is ensured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketPolicy {
    /// Anyone can read objects.
    PublicRead,
    /// Reads allowed to identities whose `jwt:email` claim ends in `@domain`.
    EmailDomain(String),
    /// Leave the service default in place.
    Private,
}

impl BucketPolicy {
    /// Render the policy document for `bucket`, or `None` for [`BucketPolicy::Private`].
    pub fn document(&self, bucket: &str) -> Option<String> {
        let resource = format!("arn:aws:s3:::{}/*", bucket);
        let statement = match self {
            BucketPolicy::PublicRead => json!({
                "Effect": "Allow",
                "Principal": { "AWS": ["*"] },
                "Action": ["s3:GetObject"],
                "Resource": [resource],
            }),
            BucketPolicy::EmailDomain(domain) => json!({
                "Effect": "Allow",
                "Principal": { "AWS": ["*"] },
                "Action": ["s3:GetObject"],
                "Resource": [resource],
                "Condition": {
                    "StringLike": { "jwt:email": [format!("*@{}", domain)] }
                },
            }),
            BucketPolicy::Private => return None,
        };

        Some(
            json!({
                "Version": "2012-10-17",
                "Statement": [statement],
            })
            .to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_read_document() {
        let doc = BucketPolicy::PublicRead.document("plan-documents").unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
        let statement = &value["Statement"][0];
        assert_eq!(statement["Action"][0], "s3:GetObject");
        assert_eq!(statement["Resource"][0], "arn:aws:s3:::plan-documents/*");
        assert!(statement.get("Condition").is_none());
    }

    #[test]
    fn test_email_domain_document() {
        let doc = BucketPolicy::EmailDomain("clinic.com".to_string())
            .document("plan-materials")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(
            value["Statement"][0]["Condition"]["StringLike"]["jwt:email"][0],
            "*@clinic.com"
        );
        assert!(BucketPolicy::Private.document("x").is_none());
    }
}
