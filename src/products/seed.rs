//! Public catalogue loaded from a JSON file at startup.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{dto::ProductCreate, repo_types::Product, services::validate_fields};

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(flatten)]
    pub product: ProductCreate,
    /// Relative to the seed file.
    pub picture_path: Option<String>,
}

pub fn parse_seed(raw: &str) -> anyhow::Result<Vec<SeedProduct>> {
    serde_json::from_str(raw).context("parse seed products")
}

pub fn image_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

async fn read_picture(base: &Path, rel: &str) -> Option<(Vec<u8>, &'static str)> {
    let path = base.join(rel);
    let Some(content_type) = image_type_for(&path) else {
        warn!(path = %path.display(), "unsupported seed picture type");
        return None;
    };
    match tokio::fs::read(&path).await {
        Ok(data) => Some((data, content_type)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "seed picture unreadable");
            None
        }
    }
}

/// Inserts every public product from `path` that does not exist yet.
/// Returns how many were inserted.
pub async fn load_seed_products(db: &PgPool, path: &str) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read seed file {path}"))?;
    let entries = parse_seed(&raw)?;
    let base = Path::new(path).parent().unwrap_or_else(|| Path::new("."));

    let mut inserted = 0;
    for entry in entries {
        let fields = match validate_fields(entry.product.into()) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "skipping invalid seed product");
                continue;
            }
        };
        let picture = match &entry.picture_path {
            Some(rel) => read_picture(base, rel).await,
            None => None,
        };
        let image = picture.as_ref().map(|(data, ct)| (data.as_slice(), *ct));
        if Product::insert_public(db, &fields, image)
            .await
            .with_context(|| format!("insert seed product {}", fields.name))?
        {
            inserted += 1;
        }
    }
    info!(path, inserted, "seed products loaded");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_with_optional_picture() {
        let raw = r#"[
            {"name":"Apple","calories":52,"proteins":0.3,"fats":0.2,"carbohydrates":14,
             "description":"fresh","picture_path":"img/apple.jpg"},
            {"name":"Rice","weight":100,"calories":130,"proteins":2.7,"fats":0.3,"carbohydrates":28}
        ]"#;
        let seed = parse_seed(raw).unwrap();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].product.name, "Apple");
        assert_eq!(seed[0].product.weight, 100.0);
        assert_eq!(seed[0].picture_path.as_deref(), Some("img/apple.jpg"));
        assert!(seed[1].picture_path.is_none());
    }

    #[test]
    fn rejects_non_array() {
        assert!(parse_seed(r#"{"name":"Apple"}"#).is_err());
    }

    #[test]
    fn picture_types_by_extension() {
        assert_eq!(image_type_for(Path::new("a/b.JPG")), Some("image/jpeg"));
        assert_eq!(image_type_for(Path::new("b.webp")), Some("image/webp"));
        assert_eq!(image_type_for(Path::new("b.bmp")), None);
        assert_eq!(image_type_for(Path::new("noext")), None);
    }
}
