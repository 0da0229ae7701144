//! References between documents.

use super::{DocumentId, Identified};
use serde::{Deserialize, Serialize};

/// A reference to another document: a bare id, or the document itself.
///
/// Stored bodies always hold the id form. Reads replace ids with documents
/// when relations are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(DocumentId),
    Doc(Box<T>),
}

impl<T: Identified> Ref<T> {
    pub fn id(&self) -> DocumentId {
        match self {
            Self::Id(id) => *id,
            Self::Doc(document) => document.id(),
        }
    }

    /// Returns the id when this reference has not been populated.
    pub fn as_bare_id(&self) -> Option<DocumentId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Doc(_) => None,
        }
    }

    pub fn as_doc(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Doc(document) => Some(document),
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Doc(_))
    }

    /// Drops any embedded document, keeping only its id.
    pub fn collapse(&mut self) {
        if self.is_populated() {
            *self = Self::Id(self.id());
        }
    }
}

impl<T> From<DocumentId> for Ref<T> {
    fn from(id: DocumentId) -> Self {
        Self::Id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::Ref;
    use crate::model::{DocumentId, Identified};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Thing {
        #[serde(rename = "_id")]
        id: DocumentId,
        label: String,
    }

    impl Identified for Thing {
        fn id(&self) -> DocumentId {
            self.id
        }
    }

    #[test]
    fn bare_ids_and_documents_decode_into_matching_variants() {
        let id = Uuid::new_v4();
        let bare: Ref<Thing> = serde_json::from_value(serde_json::json!(id.to_string())).unwrap();
        assert_eq!(bare, Ref::Id(id));

        let doc: Ref<Thing> =
            serde_json::from_value(serde_json::json!({"_id": id.to_string(), "label": "x"}))
                .unwrap();
        assert!(doc.is_populated());
        assert_eq!(doc.id(), id);
    }

    #[test]
    fn collapse_keeps_only_the_id() {
        let id = Uuid::new_v4();
        let mut reference = Ref::Doc(Box::new(Thing {
            id,
            label: "x".to_string(),
        }));
        reference.collapse();
        assert_eq!(reference, Ref::Id(id));
        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            serde_json::json!(id.to_string())
        );
    }
}
