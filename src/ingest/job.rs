use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::xlsx;
use crate::config::RagConfig;
use crate::embedding::EmbeddingClient;
use crate::vector::{PointRecord, VectorStore};

const UPSERT_BATCH_SIZE: usize = 100;
const DATA_TYPE_TAG: &str = "flood_2025";
const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Fatal conditions for the ingestion job. Per-file parse failures and
/// per-document embedding failures are logged and skipped instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("flood data directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("no spreadsheet files found in {0}")]
    NoSpreadsheets(PathBuf),
    #[error("no documents extracted from spreadsheet files")]
    NoDocuments,
    #[error("no valid embeddings created")]
    NoEmbeddings,
    #[error("failed to index batch {batch}/{batches}: {message}")]
    IndexFailure {
        batch: usize,
        batches: usize,
        message: String,
    },
    #[error("failed to enumerate {dir}: {source}")]
    Io {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// One spreadsheet row, normalized for indexing. The embedding is attached
/// before upsert and stripped from the JSON backup.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedDocument {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub source: String,
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub files_processed: usize,
    pub documents_extracted: usize,
    pub embedding_failures: usize,
    pub documents_indexed: usize,
    pub completed_at: DateTime<Utc>,
}

/// Sequential batch job: spreadsheets → documents → embeddings → upsert.
pub struct IngestJob {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl IngestJob {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
        }
    }

    pub async fn run(&self) -> Result<IngestSummary, IngestError> {
        let dir = &self.config.flood_data_dir;
        if !dir.is_dir() {
            return Err(IngestError::MissingDirectory(dir.clone()));
        }

        let files = collect_spreadsheet_files(dir)?;
        if files.is_empty() {
            return Err(IngestError::NoSpreadsheets(dir.clone()));
        }
        tracing::info!("Found {} spreadsheet files to process", files.len());

        let mut documents = Vec::new();
        for path in &files {
            documents.extend(documents_from_file(path));
        }
        if documents.is_empty() {
            return Err(IngestError::NoDocuments);
        }
        let documents_extracted = documents.len();
        tracing::info!("Total documents extracted: {}", documents_extracted);

        let (documents, embedding_failures) = self.embed_documents(documents).await;
        if documents.is_empty() {
            return Err(IngestError::NoEmbeddings);
        }
        tracing::info!(
            "Successfully created embeddings for {} documents",
            documents.len()
        );

        if let Some(backup_path) = &self.config.ingest_backup_path {
            save_backup(&documents, backup_path);
        }

        self.index_documents(&documents).await?;
        tracing::info!("Successfully indexed {} documents", documents.len());

        Ok(IngestSummary {
            files_processed: files.len(),
            documents_extracted,
            embedding_failures,
            documents_indexed: documents.len(),
            completed_at: Utc::now(),
        })
    }

    /// Attach a passage embedding to each document. Failed documents are
    /// dropped from the batch and counted.
    async fn embed_documents(
        &self,
        documents: Vec<IngestedDocument>,
    ) -> (Vec<IngestedDocument>, usize) {
        tracing::info!("Creating embeddings for {} documents", documents.len());
        let mut embedded = Vec::with_capacity(documents.len());
        let mut failures = 0usize;

        for mut doc in documents {
            match self.embedder.embed_passage(&doc.content).await {
                Ok(vector) => {
                    doc.embedding = Some(vector);
                    embedded.push(doc);
                }
                Err(err) => {
                    failures += 1;
                    tracing::error!("Error creating embedding for {}: {}", doc.source, err);
                }
            }
        }

        (embedded, failures)
    }

    /// Upsert all documents in fixed-size batches with fresh point ids. Any
    /// batch failure aborts the job; earlier batches are not rolled back.
    async fn index_documents(&self, documents: &[IngestedDocument]) -> Result<(), IngestError> {
        let collection = &self.config.collection_name;
        tracing::info!(
            "Indexing {} documents to collection: {}",
            documents.len(),
            collection
        );

        let points: Vec<PointRecord> = documents
            .iter()
            .filter_map(|doc| {
                let vector = doc.embedding.clone()?;
                let mut payload = doc.metadata.clone();
                payload.insert("content".to_string(), json!(doc.content));
                payload.insert("source".to_string(), json!(doc.source));
                Some(PointRecord {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    payload: Value::Object(payload),
                })
            })
            .collect();

        let batches = points.len().div_ceil(UPSERT_BATCH_SIZE);
        for (i, batch) in points.chunks(UPSERT_BATCH_SIZE).enumerate() {
            self.store
                .upsert(collection, batch.to_vec())
                .await
                .map_err(|err| IngestError::IndexFailure {
                    batch: i + 1,
                    batches,
                    message: err.to_string(),
                })?;
            tracing::info!("Uploaded batch {}/{}", i + 1, batches);
        }
        Ok(())
    }
}

fn collect_spreadsheet_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let entries = fs::read_dir(dir).map_err(|source| IngestError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    SPREADSHEET_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Extract one document per populated data row. A file that cannot be
/// parsed is logged and contributes nothing.
fn documents_from_file(path: &Path) -> Vec<IngestedDocument> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    tracing::info!("Processing file: {}", file_name);

    let rows = match xlsx::read_rows(path) {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!("Error processing {}: {}", file_name, err);
            return Vec::new();
        }
    };

    let Some((header, data_rows)) = rows.split_first() else {
        return Vec::new();
    };

    let category = categorize_file(&file_name);
    let mut documents = Vec::new();
    for (row_index, row) in data_rows.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        documents.push(document_from_row(&file_name, category, row_index, header, row));
    }

    tracing::info!("Extracted {} documents from {}", documents.len(), file_name);
    documents
}

/// Build the text and metadata for one row: a category header line, then a
/// `column: value` line per populated cell. Empty values are skipped in
/// both the content and the flattened metadata.
fn document_from_row(
    file_name: &str,
    category: &str,
    row_index: usize,
    header: &[String],
    row: &[String],
) -> IngestedDocument {
    let mut content_parts = vec![format!("Flood 2025 Data - {}:", category)];
    let mut metadata = Map::new();
    metadata.insert("file_name".to_string(), json!(file_name));
    metadata.insert("category".to_string(), json!(category));
    metadata.insert("row_index".to_string(), json!(row_index));
    metadata.insert("data_type".to_string(), json!(DATA_TYPE_TAG));

    for (col, name) in header.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = row.get(col).map(|v| v.trim()).unwrap_or("");
        if value.is_empty() {
            continue;
        }
        content_parts.push(format!("{}: {}", name, value));
        metadata.insert(name.to_lowercase().replace(' ', "_"), json!(value));
    }

    IngestedDocument {
        content: content_parts.join("\n"),
        metadata,
        source: format!("{}_row_{}", file_name, row_index),
        embedding: None,
    }
}

/// Classify a workbook by filename; the first matching rule wins.
pub(crate) fn categorize_file(filename: &str) -> &'static str {
    let name = filename.to_lowercase();

    if name.contains("human") && (name.contains("losses") || name.contains("injuries")) {
        "Human Casualties and Displacement"
    } else if name.contains("infrastructure") && name.contains("damages") {
        "Infrastructure Damage Assessment"
    } else if name.contains("livestock") || name.contains("agriculture") {
        "Agricultural and Livestock Losses"
    } else if name.contains("relief") && name.contains("operations") {
        "Relief and Emergency Operations"
    } else if name.contains("services") && name.contains("status") {
        "Essential Services Status"
    } else {
        "General Flood Data"
    }
}

/// Best-effort JSON backup of the batch, embeddings stripped. Failures are
/// logged, never fatal.
fn save_backup(documents: &[IngestedDocument], path: &Path) {
    match serde_json::to_string_pretty(documents) {
        Ok(contents) => match fs::write(path, contents) {
            Ok(()) => tracing::info!("Processed data saved to {}", path.display()),
            Err(err) => tracing::error!("Error saving processed data: {}", err),
        },
        Err(err) => tracing::error!("Error saving processed data: {}", err),
    }
}
