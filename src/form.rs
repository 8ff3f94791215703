//! Field values of the product dialog and the rule deciding whether it can
//! be submitted.

use thiserror::Error;

use crate::catalog::{Product, ProductDraft};
use crate::upload::UploadedAsset;

/// Raw text of every product field, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub price: String,
    pub sale_price: String,
    pub total_stock: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} is not a valid {expected}: {value:?}")]
    NotANumber {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ProductForm {
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            brand: product.brand.clone(),
            price: product.price.to_string(),
            sale_price: product.sale_price.to_string(),
            total_stock: product.total_stock.to_string(),
        }
    }

    /// Parses every field into a draft carrying `image`.
    pub fn to_draft(&self, image: Option<&UploadedAsset>) -> Result<ProductDraft, FormError> {
        Ok(ProductDraft {
            image: image.map(|asset| asset.url().to_string()),
            title: required("title", &self.title)?,
            description: required("description", &self.description)?,
            category: required("category", &self.category)?,
            brand: required("brand", &self.brand)?,
            price: parse_amount("price", &self.price)?,
            sale_price: parse_amount("sale price", &self.sale_price)?,
            total_stock: parse_stock(&self.total_stock)?,
        })
    }

    /// Whether every field is filled in and the numeric ones parse.
    pub fn fields_valid(&self) -> bool {
        self.to_draft(None).is_ok()
    }
}

/// The submit gate: valid fields, and either a hosted image or an existing
/// product whose image can be reused.
pub fn can_submit(form: &ProductForm, uploaded: &[UploadedAsset], edit_mode: bool) -> bool {
    form.fields_valid() && (!uploaded.is_empty() || edit_mode)
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    if value.is_empty() {
        return Err(FormError::Missing(field));
    }
    Ok(value.to_string())
}

fn parse_amount(field: &'static str, value: &str) -> Result<f64, FormError> {
    if value.trim().is_empty() {
        return Err(FormError::Missing(field));
    }
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| FormError::NotANumber {
            field,
            expected: "number",
            value: value.to_string(),
        })
}

fn parse_stock(value: &str) -> Result<i64, FormError> {
    if value.trim().is_empty() {
        return Err(FormError::Missing("total stock"));
    }
    value.trim().parse().map_err(|_| FormError::NotANumber {
        field: "total stock",
        expected: "whole number",
        value: value.to_string(),
    })
}
