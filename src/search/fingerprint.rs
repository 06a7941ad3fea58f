// Content fingerprint over a search-doc set. The BM25 engine cache is keyed
// by this hash, so the underlying full-text index is rebuilt exactly when
// the doc set changes.

use sha2::{Digest, Sha256};

use crate::index::SearchDoc;

const FIELD_SEP: &[u8] = &[0x00];
const ITEM_SEP: &str = "\u{1}";

/// Stable hash of the document slice. Doc order matters (the snapshot is
/// already id-sorted); tag order does not.
pub fn compute_fingerprint(docs: &[SearchDoc]) -> String {
    let mut hasher = Sha256::new();

    for doc in docs {
        hasher.update(doc.id.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(doc.doc_text.as_bytes());
        hasher.update(FIELD_SEP);

        let s = &doc.summary;
        hasher.update(s.id.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.name.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.namespace.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.short_description.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.summary.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.category.as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.input_modes.join(ITEM_SEP).as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.output_modes.join(ITEM_SEP).as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(s.security_summary.as_bytes());
        hasher.update(FIELD_SEP);

        let mut tags = s.tags.clone();
        tags.sort();
        hasher.update(tags.join(ITEM_SEP).as_bytes());
        hasher.update(FIELD_SEP);
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Summary;

    fn doc(id: &str, text: &str) -> SearchDoc {
        SearchDoc {
            id: id.to_string(),
            doc_text: text.to_string(),
            summary: Summary { id: id.to_string(), name: id.to_string(), ..Summary::default() },
        }
    }

    #[test]
    fn test_same_docs_same_fingerprint() {
        let docs = vec![doc("tool-1", "description one"), doc("tool-2", "description two")];
        let fp1 = compute_fingerprint(&docs);
        let fp2 = compute_fingerprint(&docs);
        assert_eq!(fp1, fp2);
        assert!(!fp1.is_empty());
    }

    #[test]
    fn test_different_docs_different_fingerprint() {
        let fp1 = compute_fingerprint(&[doc("tool-1", "one")]);
        let fp2 = compute_fingerprint(&[doc("tool-2", "two")]);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn test_doc_order_matters() {
        let a = doc("tool-1", "one");
        let b = doc("tool-2", "two");
        assert_ne!(
            compute_fingerprint(&[a.clone(), b.clone()]),
            compute_fingerprint(&[b, a])
        );
    }

    #[test]
    fn test_every_summary_field_participates() {
        let base = SearchDoc {
            id: "tool-1".into(),
            doc_text: "description".into(),
            summary: Summary {
                id: "tool-1".into(),
                name: "Tool1".into(),
                namespace: "ns1".into(),
                short_description: "short desc".into(),
                summary: "summary text".into(),
                category: "category".into(),
                input_modes: vec!["application/json".into()],
                output_modes: vec!["application/json".into()],
                security_summary: "apiKey".into(),
                tags: vec!["tag1".into(), "tag2".into()],
            },
        };
        let base_fp = compute_fingerprint(std::slice::from_ref(&base));

        let variations: Vec<Box<dyn Fn(&mut SearchDoc)>> = vec![
            Box::new(|d| d.id = "tool-1-changed".into()),
            Box::new(|d| d.doc_text = "changed".into()),
            Box::new(|d| d.summary.name = "ChangedName".into()),
            Box::new(|d| d.summary.namespace = "changed-ns".into()),
            Box::new(|d| d.summary.short_description = "changed short desc".into()),
            Box::new(|d| d.summary.summary = "changed summary".into()),
            Box::new(|d| d.summary.category = "changed-category".into()),
            Box::new(|d| d.summary.input_modes = vec!["text/plain".into()]),
            Box::new(|d| d.summary.output_modes = vec!["text/plain".into()]),
            Box::new(|d| d.summary.security_summary = "oauth2".into()),
            Box::new(|d| d.summary.tags = vec!["different-tag".into()]),
        ];

        for (i, mutate) in variations.iter().enumerate() {
            let mut changed = base.clone();
            mutate(&mut changed);
            assert_ne!(
                compute_fingerprint(&[changed]),
                base_fp,
                "variation {i} should change the fingerprint"
            );
        }
    }

    #[test]
    fn test_tag_order_independent() {
        let mut a = doc("tool-1", "description");
        a.summary.tags = vec!["alpha".into(), "bravo".into(), "charlie".into()];
        let mut b = doc("tool-1", "description");
        b.summary.tags = vec!["charlie".into(), "alpha".into(), "bravo".into()];
        assert_eq!(compute_fingerprint(&[a]), compute_fingerprint(&[b]));
    }

    #[test]
    fn test_empty_docs_stable() {
        assert_eq!(compute_fingerprint(&[]), compute_fingerprint(&[]));
        assert!(!compute_fingerprint(&[]).is_empty());
    }

    #[test]
    fn test_separator_prevents_field_bleed() {
        // "ab" + "c" must differ from "a" + "bc".
        let mut a = doc("t", "x");
        a.summary.name = "ab".into();
        a.summary.namespace = "c".into();
        let mut b = doc("t", "x");
        b.summary.name = "a".into();
        b.summary.namespace = "bc".into();
        assert_ne!(compute_fingerprint(&[a]), compute_fingerprint(&[b]));
    }
}
