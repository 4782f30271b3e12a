use serde::Serialize;

use paramgrid_recon::model::normalize_scope;

/// Checklist identity key.
///
/// `Common` rules apply to an item regardless of module/part. `Scoped` rules
/// carry at least one of module or part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScopedKey {
    Common {
        item_name: String,
    },
    Scoped {
        module: Option<String>,
        part: Option<String>,
        item_name: String,
    },
}

impl ScopedKey {
    /// Build a key from nullable columns. Blank module/part count as absent.
    pub fn new(module: Option<&str>, part: Option<&str>, item_name: &str) -> Self {
        let item_name = item_name.trim().to_string();
        match (normalize_scope(module), normalize_scope(part)) {
            (None, None) => Self::Common { item_name },
            (module, part) => Self::Scoped {
                module,
                part,
                item_name,
            },
        }
    }

    pub fn common(item_name: &str) -> Self {
        Self::Common {
            item_name: item_name.trim().to_string(),
        }
    }

    pub fn item_name(&self) -> &str {
        match self {
            Self::Common { item_name } | Self::Scoped { item_name, .. } => item_name,
        }
    }

    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Common { .. } => None,
            Self::Scoped { module, .. } => module.as_deref(),
        }
    }

    pub fn part(&self) -> Option<&str> {
        match self {
            Self::Common { .. } => None,
            Self::Scoped { part, .. } => part.as_deref(),
        }
    }

    pub fn is_common(&self) -> bool {
        matches!(self, Self::Common { .. })
    }

    /// The type-common key for the same item.
    pub fn fallback(&self) -> Self {
        Self::Common {
            item_name: self.item_name().to_string(),
        }
    }
}

impl std::fmt::Display for ScopedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common { item_name } => write!(f, "(*, *, {item_name})"),
            Self::Scoped { module, part, item_name } => write!(
                f,
                "({}, {}, {item_name})",
                module.as_deref().unwrap_or("NULL"),
                part.as_deref().unwrap_or("NULL"),
            ),
        }
    }
}
