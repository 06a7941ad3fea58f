// Conversion between the index's SearchDoc and the semantic Document, so
// embedding-based scoring can run over index snapshots. The round trip loses
// only `category`, which SearchDoc does not carry at the top level.

use crate::index::summary::{truncate_chars, SearchDoc, Summary, MAX_SHORT_DESCRIPTION_LEN};
use crate::semantic::document::Document;

/// Convert an index search doc to a semantic document.
pub fn document_from_search_doc(doc: &SearchDoc) -> Document {
    Document {
        id: doc.id.clone(),
        name: doc.summary.name.clone(),
        namespace: doc.summary.namespace.clone(),
        description: doc.summary.short_description.clone(),
        tags: doc.summary.tags.clone(),
        category: String::new(),
        text: doc.doc_text.clone(),
    }
}

pub fn documents_from_search_docs(docs: &[SearchDoc]) -> Vec<Document> {
    docs.iter().map(document_from_search_doc).collect()
}

/// Convert a semantic document back to an index search doc. The description
/// is re-capped and `text` rebuilt when missing.
pub fn search_doc_from_document(doc: &Document) -> SearchDoc {
    let short = truncate_chars(&doc.description, MAX_SHORT_DESCRIPTION_LEN);

    let doc_text = if doc.text.is_empty() {
        doc.normalized().text
    } else {
        doc.text.clone()
    };

    SearchDoc {
        id: doc.id.clone(),
        doc_text,
        summary: Summary {
            id: doc.id.clone(),
            name: doc.name.clone(),
            namespace: doc.namespace.clone(),
            short_description: short,
            tags: doc.tags.clone(),
            ..Summary::default()
        },
    }
}

pub fn search_docs_from_documents(docs: &[Document]) -> Vec<SearchDoc> {
    docs.iter().map(search_doc_from_document).collect()
}
