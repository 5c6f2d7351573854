use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Product;

fn default_weight() -> f64 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRead {
    pub id: Uuid,
    pub name: String,
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub description: Option<String>,
    pub is_public: bool,
    pub picture_url: Option<String>,
}

impl From<Product> for ProductRead {
    fn from(p: Product) -> Self {
        let picture_url = p
            .has_picture
            .then(|| format!("/api/v1/products/{}/picture", p.id));
        Self {
            id: p.id,
            name: p.name,
            weight: p.weight,
            calories: p.calories,
            proteins: p.proteins,
            fats: p.fats,
            carbohydrates: p.carbohydrates,
            description: p.description,
            is_public: p.is_public,
            picture_url,
        }
    }
}

/// Also the shape of one entry in the seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub weight: Option<f64>,
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub fats: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(has_picture: bool) -> Product {
        Product {
            id: Uuid::nil(),
            name: "Apple".into(),
            weight: 100.0,
            calories: 52.0,
            proteins: 0.3,
            fats: 0.2,
            carbohydrates: 14.0,
            description: None,
            has_picture,
            is_public: true,
            user_id: None,
        }
    }

    #[test]
    fn picture_url_only_when_stored() {
        assert_eq!(ProductRead::from(product(false)).picture_url, None);
        assert_eq!(
            ProductRead::from(product(true)).picture_url.as_deref(),
            Some("/api/v1/products/00000000-0000-0000-0000-000000000000/picture")
        );
    }

    #[test]
    fn create_defaults_weight_to_100() {
        let body: ProductCreate = serde_json::from_str(
            r#"{"name":"Rice","calories":130,"proteins":2.7,"fats":0.3,"carbohydrates":28}"#,
        )
        .unwrap();
        assert_eq!(body.weight, 100.0);
        assert!(body.description.is_none());
    }
}
