//! Compiled-in seed data.
//!
//! Used when a store key has never been written, when a read fails, and as
//! the per-collection fallback for malformed backup snapshots.

use crate::{
  model::{AdminUser, Brand, Product},
  settings::Settings
};

/// Demo brands shown on first run.
#[must_use]
pub fn brands() -> Vec<Brand> {
  vec![
    Brand {
      id: "brand-aurora".to_string(),
      name: "Aurora Tools".to_string(),
      logo_url: None,
      is_deleted: false
    },
    Brand {
      id: "brand-northwind".to_string(),
      name: "Northwind Home".to_string(),
      logo_url: None,
      is_deleted: false
    },
  ]
}

/// Demo products shown on first run.
#[must_use]
pub fn products() -> Vec<Product> {
  vec![
    Product {
      id: "product-drill".to_string(),
      brand_id: "brand-aurora".to_string(),
      name: "Cordless Drill 18V".to_string(),
      sku: Some("AUR-1001".to_string()),
      description: Some("Two-speed cordless drill with brushless motor.".to_string()),
      image_url: None,
      is_deleted: false
    },
    Product {
      id: "product-kettle".to_string(),
      brand_id: "brand-northwind".to_string(),
      name: "Glass Kettle 1.7L".to_string(),
      sku: Some("NW-2040".to_string()),
      description: None,
      image_url: None,
      is_deleted: false
    },
  ]
}

/// The initial admin account. The PIN is expected to be changed during setup.
#[must_use]
pub fn admin_users() -> Vec<AdminUser> {
  vec![AdminUser {
    id: "admin-default".to_string(),
    name: "Administrator".to_string(),
    pin: "1234".to_string()
  }]
}

/// Default settings document (`last_updated` starts at zero).
#[must_use]
pub fn settings() -> Settings {
  Settings::default()
}
