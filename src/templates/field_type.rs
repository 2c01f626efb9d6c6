use crate::graph::catalog::{self, Cardinality};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a template field, e.g. `ImageField` or a collection of
/// `IntegerField`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldType {
    pub name: String,
    #[serde(default)]
    pub is_collection: bool,
    #[serde(default)]
    pub is_collection_or_scalar: bool,
}

impl FieldType {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: false,
            is_collection_or_scalar: false,
        }
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            is_collection: true,
            ..Self::single(name)
        }
    }

    pub fn collection_or_scalar(name: impl Into<String>) -> Self {
        Self {
            is_collection_or_scalar: true,
            ..Self::single(name)
        }
    }

    pub(crate) fn from_catalog(name: &str, cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::Single => Self::single(name),
            Cardinality::Collection => Self::collection(name),
            Cardinality::CollectionOrScalar => Self::collection_or_scalar(name),
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        if self.is_collection_or_scalar {
            Cardinality::CollectionOrScalar
        } else if self.is_collection {
            Cardinality::Collection
        } else {
            Cardinality::Single
        }
    }

    /// Whether an output of this type may feed an input of type `destination`.
    pub fn is_compatible_with(&self, destination: &FieldType) -> bool {
        catalog::types_compatible(
            (&self.name, self.cardinality()),
            (&destination.name, destination.cardinality()),
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cardinality() {
            Cardinality::Single => f.write_str(&self.name),
            Cardinality::Collection => write!(f, "list[{}]", self.name),
            Cardinality::CollectionOrScalar => write!(f, "{} | list[{}]", self.name, self.name),
        }
    }
}
