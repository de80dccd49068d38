use super::RetrievedDocument;

/// Render retrieved documents into one context block for prompt inclusion.
///
/// Each document keeps its retrieval rank (1-based), source identifier,
/// body, and a JSON dump of its full payload. Blocks are blank-line
/// separated. No deduplication or length cap is applied: the combined
/// context grows with the retrieval count and document sizes, and is sent
/// to the generation model as-is.
pub fn assemble_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let metadata = serde_json::to_string(&doc.metadata).unwrap_or_default();
            format!(
                "Document {} (Source: {}):\nContent: {}\nMetadata: {}",
                i + 1,
                doc.source,
                doc.content,
                metadata
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
