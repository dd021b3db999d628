//! ExportPackager: turns assembled roles into a named bundle and hands it to a sink.
//!
//! Layout under the bundle root:
//!   {label}/{label} S{n}.md   one per candidate
//!   {label}/{label} C.md      juror answer key
//!   manifest.json
//!
//! `{label}` is `{stem} {tier}x`, suffixed with a short role id when two roles of the
//! bundle would otherwise share it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::booklet::assembler::AssembledRole;
use crate::booklet::render::{
    booklet_file_name, juror_file_name, render_booklet_md, render_juror_md, unique_role_labels,
};
use crate::errors::AppError;
use crate::models::{ContractRecord, QuestionTypeCatalog, RoleDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    /// Path relative to the bundle root.
    pub path: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRole {
    pub role_id: Uuid,
    pub role_name: String,
    pub candidate_count: u32,
    pub booklets: Vec<String>,
    pub juror_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub bundle_id: Uuid,
    pub contract_id: Uuid,
    pub contract_title: String,
    pub assignment_policy: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<ManifestRole>,
}

#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub manifest: Manifest,
    pub documents: Vec<ExportDocument>,
}

/// Where a bundle ended up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub bundle_id: Uuid,
    pub contract_id: Uuid,
    /// Storage keys of every document, manifest excluded.
    pub documents: Vec<String>,
    pub manifest_key: String,
}

/// Builds the full bundle in memory. Nothing is written until a sink stores it.
///
/// Every document path is unique within the bundle; a duplicate is an error rather than a
/// silent overwrite in the sink.
pub fn build_bundle(
    contract: &ContractRecord,
    roles: &[(RoleDescriptor, AssembledRole)],
    catalog: &QuestionTypeCatalog,
    assignment_policy: &str,
) -> Result<ExportBundle, AppError> {
    let mut documents = Vec::new();
    let mut manifest_roles = Vec::with_capacity(roles.len());
    let descriptors: Vec<&RoleDescriptor> = roles.iter().map(|(role, _)| role).collect();
    let labels = unique_role_labels(&descriptors);

    for ((role, assembled), folder) in roles.iter().zip(&labels) {
        let mut booklet_paths = Vec::with_capacity(assembled.booklets.len());

        for booklet in &assembled.booklets {
            let path = format!("{folder}/{}", booklet_file_name(folder, booklet.candidate_index));
            documents.push(ExportDocument {
                path: path.clone(),
                body: render_booklet_md(contract, role, booklet, catalog),
            });
            booklet_paths.push(path);
        }

        let juror_path = format!("{folder}/{}", juror_file_name(folder));
        documents.push(ExportDocument {
            path: juror_path.clone(),
            body: render_juror_md(contract, role, &assembled.juror_packet, catalog),
        });

        manifest_roles.push(ManifestRole {
            role_id: role.id,
            role_name: role.name.clone(),
            candidate_count: assembled.booklets.len() as u32,
            booklets: booklet_paths,
            juror_key: juror_path,
        });
    }

    {
        let mut paths = BTreeSet::new();
        if let Some(dup) = documents.iter().find(|d| !paths.insert(d.path.as_str())) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Duplicate document path in export bundle: {}",
                dup.path
            )));
        }
    }

    Ok(ExportBundle {
        manifest: Manifest {
            bundle_id: Uuid::new_v4(),
            contract_id: contract.id,
            contract_title: contract.title.clone(),
            assignment_policy: assignment_policy.to_string(),
            created_at: Utc::now(),
            roles: manifest_roles,
        },
        documents,
    })
}

fn bundle_prefix(manifest: &Manifest) -> String {
    format!("exports/{}/{}", manifest.contract_id, manifest.bundle_id)
}

fn manifest_bytes(manifest: &Manifest) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(manifest)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize manifest: {e}")))
}

/// Persists a bundle and returns where its documents live.
#[async_trait]
pub trait BundleSink: Send + Sync {
    async fn store(&self, bundle: &ExportBundle) -> Result<ExportReceipt, AppError>;
}

/// Uploads bundles to S3 / MinIO under `exports/{contract_id}/{bundle_id}/`.
pub struct S3BundleSink {
    client: S3Client,
    bucket: String,
}

impl S3BundleSink {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl BundleSink for S3BundleSink {
    async fn store(&self, bundle: &ExportBundle) -> Result<ExportReceipt, AppError> {
        let prefix = bundle_prefix(&bundle.manifest);
        let mut keys = Vec::with_capacity(bundle.documents.len());

        for doc in &bundle.documents {
            let key = format!("{prefix}/{}", doc.path);
            self.put(&key, doc.body.clone().into_bytes(), "text/markdown")
                .await?;
            keys.push(key);
        }

        let manifest_key = format!("{prefix}/manifest.json");
        self.put(&manifest_key, manifest_bytes(&bundle.manifest)?, "application/json")
            .await?;

        info!(
            "Uploaded export bundle to s3://{}/{} ({} documents)",
            self.bucket,
            prefix,
            keys.len()
        );
        Ok(ExportReceipt {
            bundle_id: bundle.manifest.bundle_id,
            contract_id: bundle.manifest.contract_id,
            documents: keys,
            manifest_key,
        })
    }
}

/// Keeps bundles in memory. Used by tests and local runs without object storage.
#[derive(Clone, Default)]
pub struct InMemoryBundleSink {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryBundleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl BundleSink for InMemoryBundleSink {
    async fn store(&self, bundle: &ExportBundle) -> Result<ExportReceipt, AppError> {
        let prefix = bundle_prefix(&bundle.manifest);
        let manifest_key = format!("{prefix}/manifest.json");
        let manifest = manifest_bytes(&bundle.manifest)?;

        let mut objects = self.objects.write().await;
        let mut keys = Vec::with_capacity(bundle.documents.len());
        for doc in &bundle.documents {
            let key = format!("{prefix}/{}", doc.path);
            objects.insert(key.clone(), doc.body.clone().into_bytes());
            keys.push(key);
        }
        objects.insert(manifest_key.clone(), manifest);

        Ok(ExportReceipt {
            bundle_id: bundle.manifest.bundle_id,
            contract_id: bundle.manifest.contract_id,
            documents: keys,
            manifest_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booklet::assembler::{Booklet, BookletQuestion, JurorPacket};
    use crate::models::SalaryTier;

    fn contract() -> ContractRecord {
        ContractRecord {
            id: Uuid::new_v4(),
            title: "Intake".to_string(),
            general_requirements: None,
            created_at: Utc::now(),
        }
    }

    fn assembled_role(contract_id: Uuid, name: &str, candidates: u32) -> (RoleDescriptor, AssembledRole) {
        let role = RoleDescriptor {
            id: Uuid::new_v4(),
            contract_id,
            name: name.to_string(),
            position_count: 1,
            salary_tier: SalaryTier::Double,
            requirements: None,
        };
        let booklets = (1..=candidates)
            .map(|c| Booklet {
                role_id: role.id,
                candidate_index: c,
                questions: vec![BookletQuestion {
                    type_code: "theoretical_knowledge".to_string(),
                    ordinal: c - 1,
                    question: format!("Q{c}"),
                }],
            })
            .collect();
        let assembled = AssembledRole {
            booklets,
            juror_packet: JurorPacket {
                role_id: role.id,
                sections: Vec::new(),
            },
        };
        (role, assembled)
    }

    #[test]
    fn test_bundle_layout_per_role() {
        let contract = contract();
        let roles = vec![
            assembled_role(contract.id, "Sistem Yöneticisi", 3),
            assembled_role(contract.id, "Analyst", 2),
        ];
        let bundle =
            build_bundle(&contract, &roles, &QuestionTypeCatalog::default(), "round_robin").unwrap();

        let paths: Vec<&str> = bundle.documents.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths.len(), 3 + 1 + 2 + 1);
        assert!(paths.contains(&"Sistem_Yoneticisi 2x/Sistem_Yoneticisi 2x S3.md"));
        assert!(paths.contains(&"Sistem_Yoneticisi 2x/Sistem_Yoneticisi 2x C.md"));
        assert!(paths.contains(&"Analyst 2x/Analyst 2x S1.md"));
        assert_eq!(bundle.manifest.roles[0].candidate_count, 3);
        assert_eq!(bundle.manifest.assignment_policy, "round_robin");
    }

    #[tokio::test]
    async fn test_in_memory_sink_stores_documents_and_manifest() {
        let contract = contract();
        let roles = vec![assembled_role(contract.id, "Analyst", 2)];
        let bundle =
            build_bundle(&contract, &roles, &QuestionTypeCatalog::default(), "round_robin").unwrap();
        let sink = InMemoryBundleSink::new();

        let receipt = sink.store(&bundle).await.unwrap();

        assert_eq!(receipt.documents.len(), 3);
        assert_eq!(
            receipt.manifest_key,
            format!("exports/{}/{}/manifest.json", contract.id, receipt.bundle_id)
        );
        let manifest: Manifest =
            serde_json::from_slice(&sink.get(&receipt.manifest_key).await.unwrap()).unwrap();
        assert_eq!(manifest.roles[0].booklets.len(), 2);

        let first = sink.get(&receipt.documents[0]).await.unwrap();
        assert!(String::from_utf8(first).unwrap().contains("Q1"));
        assert_eq!(sink.keys().await.len(), 4);
    }

    #[tokio::test]
    async fn test_same_named_roles_keep_separate_documents() {
        let contract = contract();
        let roles = vec![
            assembled_role(contract.id, "Analyst", 2),
            assembled_role(contract.id, "Analyst", 2),
        ];
        let bundle =
            build_bundle(&contract, &roles, &QuestionTypeCatalog::default(), "round_robin").unwrap();
        let sink = InMemoryBundleSink::new();

        let receipt = sink.store(&bundle).await.unwrap();

        assert_eq!(receipt.documents.len(), 6);
        assert_eq!(sink.keys().await.len(), 6 + 1);
        let juror_keys: BTreeSet<&str> = bundle
            .manifest
            .roles
            .iter()
            .map(|r| r.juror_key.as_str())
            .collect();
        assert_eq!(juror_keys.len(), 2);
        for (role, _) in &roles {
            let short = &role.id.simple().to_string()[..8];
            assert!(bundle
                .documents
                .iter()
                .any(|d| d.path == format!("Analyst 2x {short}/Analyst 2x {short} S1.md")));
        }
    }
}
