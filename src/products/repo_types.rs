use sqlx::FromRow;
use uuid::Uuid;

/// Row of `products` without the image bytes.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub description: Option<String>,
    pub has_picture: bool,
    pub is_public: bool,
    pub user_id: Option<Uuid>,
}

/// Writable columns of a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub weight: f64,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbohydrates: f64,
    pub description: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct ProductImage {
    pub data: Vec<u8>,
    pub content_type: String,
}
