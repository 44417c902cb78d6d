// restoretool/src/clients/firestore.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::config::FirestoreConfig;
use crate::restore::components::{DocumentStore, WriteOp};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
/// The emulator accepts this token as an admin credential.
const EMULATOR_TOKEN: &str = "owner";

/// Firestore REST client issuing atomic `documents:commit` calls.
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    token: String,
}

impl FirestoreClient {
    pub fn new(config: &FirestoreConfig) -> Result<Self> {
        let (base_url, token) = match (&config.emulator_host, &config.access_token) {
            (Some(host), _) => (format!("http://{}", host), EMULATOR_TOKEN.to_string()),
            (None, Some(token)) => (FIRESTORE_BASE_URL.to_string(), token.clone()),
            (None, None) => anyhow::bail!(
                "Firestore requires FIRESTORE_ACCESS_TOKEN unless FIRESTORE_EMULATOR_HOST is set"
            ),
        };

        Ok(FirestoreClient {
            http: reqwest::Client::new(),
            base_url,
            project_id: config.project_id.clone(),
            token,
        })
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn commit_url(&self) -> String {
        format!("{}/v1/{}/documents:commit", self.base_url, self.database_path())
    }

    fn commit_body(&self, writes: &[WriteOp]) -> Value {
        let database = self.database_path();
        let writes: Vec<Value> = writes
            .iter()
            .map(|op| {
                json!({
                    "update": {
                        "name": format!("{}/documents/{}/{}", database, op.collection, op.id),
                        "fields": encode_fields(&op.data),
                    }
                })
            })
            .collect();
        json!({ "writes": writes })
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn commit(&self, writes: &[WriteOp]) -> Result<()> {
        let response = self
            .http
            .post(self.commit_url())
            .bearer_auth(&self.token)
            .json(&self.commit_body(writes))
            .send()
            .await
            .with_context(|| format!("Failed to reach Firestore at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore commit returned HTTP {}: {}", status, body);
        }
        Ok(())
    }
}

fn encode_fields(data: &Map<String, Value>) -> Value {
    Value::Object(
        data.iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

/// Converts plain JSON into Firestore's typed value representation.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(emulator: Option<&str>, token: Option<&str>) -> FirestoreConfig {
        FirestoreConfig {
            project_id: "demo".into(),
            access_token: token.map(String::from),
            emulator_host: emulator.map(String::from),
        }
    }

    #[test]
    fn test_emulator_host_takes_precedence() {
        let client = FirestoreClient::new(&config(Some("localhost:8080"), Some("tok"))).unwrap();
        assert_eq!(
            client.commit_url(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents:commit"
        );
        assert_eq!(client.token, "owner");
    }

    #[test]
    fn test_requires_some_credential() {
        assert!(FirestoreClient::new(&config(None, None)).is_err());
    }

    #[test]
    fn test_encodes_typed_values() {
        let encoded = encode_value(&json!({
            "name": "Alice",
            "age": 31,
            "score": 4.5,
            "active": true,
            "nickname": null,
            "tags": ["a"]
        }));

        assert_eq!(
            encoded,
            json!({ "mapValue": { "fields": {
                "name": { "stringValue": "Alice" },
                "age": { "integerValue": "31" },
                "score": { "doubleValue": 4.5 },
                "active": { "booleanValue": true },
                "nickname": { "nullValue": null },
                "tags": { "arrayValue": { "values": [ { "stringValue": "a" } ] } }
            }}})
        );
    }

    #[test]
    fn test_commit_body_names_documents_by_collection_and_id() {
        let client = FirestoreClient::new(&config(None, Some("tok"))).unwrap();
        let op = WriteOp {
            collection: "users".into(),
            id: "alice".into(),
            data: json!({ "n": 1 }).as_object().unwrap().clone(),
        };

        let body = client.commit_body(&[op]);
        assert_eq!(
            body["writes"][0]["update"]["name"],
            "projects/demo/databases/(default)/documents/users/alice"
        );
        assert_eq!(body["writes"][0]["update"]["fields"]["n"]["integerValue"], "1");
    }
}
