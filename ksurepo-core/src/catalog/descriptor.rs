//! Module descriptors and tolerant catalog parsing
//!
//! A catalog is a JSON array of loosely-typed objects. Each element is
//! read field by field with a typed default, so a missing or mistyped
//! field never drops the element.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{CatalogError, CatalogResult};

/// Sentinel version for "resolution attempted, nothing found"
pub const UNRESOLVED_VERSION: &str = "null";

/// Visibility flag value that passes the merge filter
pub const VISIBLE: i64 = 1;

/// Which kind of catalog a descriptor came from
///
/// The kind decides how descriptors are identified during dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Regular module catalogs, keyed by `name + repoUrl`
    Modules,
    /// Meta-module catalog, keyed by `id`
    MetaModules,
}

/// Identity of a module within a merged catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityKey {
    Id { id: String },
    NameRepo { name: String, repo_url: String },
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Id { id } => write!(f, "{id}"),
            IdentityKey::NameRepo { name, repo_url } => write!(f, "{name}||{repo_url}"),
        }
    }
}

/// One installable module listed in a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub kind: CatalogKind,
    /// Only meaningful for meta-module catalogs
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub repo_url: String,
    pub banner_link: String,
    pub license: String,
    pub visibility: i64,
    pub latest_version: String,
    pub download_url: String,
    pub is_loading: bool,
}

impl ModuleDescriptor {
    /// Build a descriptor from one catalog array element
    ///
    /// Returns `None` only when the element is not a JSON object.
    pub fn from_json(kind: CatalogKind, value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        Some(Self {
            kind,
            id: opt_string(obj, "id", ""),
            name: opt_string(obj, "name", ""),
            description: opt_string(obj, "description", ""),
            author: opt_string(obj, "author", ""),
            repo_url: opt_string(obj, "repoUrl", ""),
            banner_link: opt_string(obj, "bannerUrl", ""),
            license: opt_string(obj, "license", ""),
            visibility: opt_int(obj, "visibility", VISIBLE),
            latest_version: String::new(),
            download_url: String::new(),
            is_loading: true,
        })
    }

    /// Identity key used for dedup and in-place updates
    pub fn identity_key(&self) -> IdentityKey {
        match self.kind {
            CatalogKind::MetaModules => IdentityKey::Id {
                id: self.id.clone(),
            },
            CatalogKind::Modules => IdentityKey::NameRepo {
                name: self.name.clone(),
                repo_url: self.repo_url.clone(),
            },
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == VISIBLE
    }

    /// Reset release fields to the "not yet resolved" placeholder
    pub fn into_placeholder(self) -> Self {
        Self {
            latest_version: String::new(),
            download_url: String::new(),
            is_loading: true,
            ..self
        }
    }

    /// Apply a resolution outcome; `None` becomes the sentinel
    pub fn resolved(self, release: Option<super::ReleaseInfo>) -> Self {
        let (latest_version, download_url) = match release {
            Some(info) => (info.version, info.zip_url),
            None => (UNRESOLVED_VERSION.to_string(), String::new()),
        };

        Self {
            latest_version,
            download_url,
            is_loading: false,
            ..self
        }
    }

    /// Whether a resolution produced something to download
    pub fn is_downloadable(&self) -> bool {
        !self.is_loading && !self.download_url.is_empty()
    }

    /// File name suggested to the download facility
    pub fn download_file_name(&self) -> String {
        format!(
            "{}_{}.zip",
            self.name.replace(' ', "_"),
            self.latest_version.replace('/', "_")
        )
    }
}

/// Parse a whole catalog body
///
/// Fails if the body is not a JSON array or any element is not an
/// object; fields inside an object are always tolerated.
pub fn parse_catalog(
    kind: CatalogKind,
    url: &str,
    body: &str,
) -> CatalogResult<Vec<ModuleDescriptor>> {
    let value: Value =
        serde_json::from_str(body).map_err(|source| CatalogError::InvalidCatalog {
            url: url.to_string(),
            source,
        })?;

    let Value::Array(items) = value else {
        return Err(invalid_shape(url, "expected a JSON array"));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            ModuleDescriptor::from_json(kind, item)
                .ok_or_else(|| invalid_shape(url, &format!("element {index} is not an object")))
        })
        .collect()
}

fn invalid_shape(url: &str, message: &str) -> CatalogError {
    CatalogError::InvalidCatalog {
        url: url.to_string(),
        source: <serde_json::Error as serde::de::Error>::custom(message),
    }
}

fn opt_string(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

fn opt_int(obj: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReleaseInfo;
    use serde_json::json;

    #[test]
    fn test_missing_fields_get_defaults() {
        let d =
            ModuleDescriptor::from_json(CatalogKind::Modules, &json!({"name": "Alpha"})).unwrap();
        assert_eq!(d.name, "Alpha");
        assert_eq!(d.description, "");
        assert_eq!(d.banner_link, "");
        assert_eq!(d.visibility, 1);
        assert!(d.is_loading);
        assert!(d.latest_version.is_empty());
    }

    #[test]
    fn test_mistyped_fields_fall_back() {
        let d = ModuleDescriptor::from_json(
            CatalogKind::Modules,
            &json!({"name": ["x"], "visibility": "zero", "author": null}),
        )
        .unwrap();
        assert_eq!(d.name, "");
        assert_eq!(d.author, "");
        assert_eq!(d.visibility, 1);
    }

    #[test]
    fn test_visibility_as_string_number() {
        let d = ModuleDescriptor::from_json(CatalogKind::Modules, &json!({"visibility": "0"}))
            .unwrap();
        assert_eq!(d.visibility, 0);
        assert!(!d.is_visible());
    }

    #[test]
    fn test_banner_url_field_name() {
        let d = ModuleDescriptor::from_json(
            CatalogKind::MetaModules,
            &json!({"id": "meta", "bannerUrl": "https://img.example/b.png"}),
        )
        .unwrap();
        assert_eq!(d.banner_link, "https://img.example/b.png");
    }

    #[test]
    fn test_identity_key_per_kind() {
        let v = json!({"id": "x", "name": "Alpha", "repoUrl": "https://github.com/o/a"});
        let meta = ModuleDescriptor::from_json(CatalogKind::MetaModules, &v).unwrap();
        let module = ModuleDescriptor::from_json(CatalogKind::Modules, &v).unwrap();

        assert_eq!(meta.identity_key(), IdentityKey::Id { id: "x".into() });
        assert_eq!(
            module.identity_key(),
            IdentityKey::NameRepo {
                name: "Alpha".into(),
                repo_url: "https://github.com/o/a".into()
            }
        );
    }

    #[test]
    fn test_parse_catalog_rejects_non_object_element() {
        let body = r#"[{"name": "Alpha"}, 42]"#;
        let err = parse_catalog(CatalogKind::Modules, "u", body).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCatalog { .. }));

        let body = r#"[{"name": "Alpha"}, "junk", {"name": "Beta"}]"#;
        assert!(parse_catalog(CatalogKind::Modules, "u", body).is_err());
    }

    #[test]
    fn test_parse_catalog_rejects_non_array() {
        assert!(parse_catalog(CatalogKind::Modules, "u", r#"{"name": "x"}"#).is_err());
        assert!(parse_catalog(CatalogKind::Modules, "u", "<html>").is_err());
    }

    #[test]
    fn test_resolved_sentinel_and_success() {
        let base =
            ModuleDescriptor::from_json(CatalogKind::Modules, &json!({"name": "A"})).unwrap();

        let failed = base.clone().resolved(None);
        assert_eq!(failed.latest_version, UNRESOLVED_VERSION);
        assert_eq!(failed.download_url, "");
        assert!(!failed.is_loading);
        assert!(!failed.is_downloadable());

        let ok = base.resolved(Some(ReleaseInfo {
            version: "v1.2".into(),
            zip_url: "https://github.com/o/a/releases/download/v1.2/a.zip".into(),
        }));
        assert_eq!(ok.latest_version, "v1.2");
        assert!(ok.is_downloadable());
    }

    #[test]
    fn test_download_file_name() {
        let mut d =
            ModuleDescriptor::from_json(CatalogKind::Modules, &json!({"name": "Zygisk Next"}))
                .unwrap();
        d.latest_version = "release/v1.0".into();
        assert_eq!(d.download_file_name(), "Zygisk_Next_release_v1.0.zip");
    }
}
