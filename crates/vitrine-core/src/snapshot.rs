//! The backup snapshot envelope and its defensive parser.
//!
//! [`BackupData`] is the unit of exchange with every storage provider and
//! the unit of manual import/export. Parsing never rejects a whole
//! document: a corrupted or hand-edited snapshot degrades collection by
//! collection to the compiled-in seeds, and `settings` deserializes with
//! per-field defaults so snapshots from older schema versions still produce
//! a fully-populated document.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
  model::{
    AdminUser, Brand, Catalogue, Category, Client, Pamphlet, Product, Quote, ScreensaverAd,
    TvContent, ViewCounts
  },
  seed,
  settings::Settings
};

/// The full serialized application state at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupData {
  /// Brand collection.
  pub brands: Vec<Brand>,
  /// Product collection.
  pub products: Vec<Product>,
  /// Catalogue collection.
  pub catalogues: Vec<Catalogue>,
  /// Pamphlet collection.
  pub pamphlets: Vec<Pamphlet>,
  /// Settings singleton. Some providers deliver this as a one-element
  /// array; deserialization unwraps it either way.
  #[serde(deserialize_with = "object_or_one_element_array")]
  pub settings: Settings,
  /// Screensaver ad collection.
  pub screensaver_ads: Vec<ScreensaverAd>,
  /// Admin user collection.
  pub admin_users: Vec<AdminUser>,
  /// TV content collection.
  pub tv_content: Vec<TvContent>,
  /// Category collection.
  pub categories: Vec<Category>,
  /// Client collection.
  pub clients: Vec<Client>,
  /// Quote collection.
  pub quotes: Vec<Quote>,
  /// Per-kiosk view tallies.
  pub view_counts: ViewCounts
}

impl BackupData {
  /// Parse a snapshot defensively.
  ///
  /// Every collection field that is absent or not an array is replaced by
  /// that collection's seed; `settings` is normalized
  /// (object-or-one-element-array) and deserialized onto defaults. A broken
  /// field never aborts the whole restore.
  #[must_use]
  pub fn from_value(value: Value) -> Self {
    let Value::Object(mut map) = value else {
      warn!("snapshot is not a JSON object, substituting seed data");
      return Self::seeded();
    };

    Self {
      brands: collection_or(&mut map, "brands", seed::brands),
      products: collection_or(&mut map, "products", seed::products),
      catalogues: collection_or(&mut map, "catalogues", Vec::new),
      pamphlets: collection_or(&mut map, "pamphlets", Vec::new),
      settings: settings_or_default(map.remove("settings")),
      screensaver_ads: collection_or(&mut map, "screensaverAds", Vec::new),
      admin_users: collection_or(&mut map, "adminUsers", seed::admin_users),
      tv_content: collection_or(&mut map, "tvContent", Vec::new),
      categories: collection_or(&mut map, "categories", Vec::new),
      clients: collection_or(&mut map, "clients", Vec::new),
      quotes: collection_or(&mut map, "quotes", Vec::new),
      view_counts: view_counts_or_default(map.remove("viewCounts"))
    }
  }

  /// The snapshot a fresh install would produce.
  #[must_use]
  pub fn seeded() -> Self {
    Self {
      brands: seed::brands(),
      products: seed::products(),
      admin_users: seed::admin_users(),
      settings: seed::settings(),
      ..Self::default()
    }
  }
}

/// Accept `settings` as a single object or a one-element array.
fn object_or_one_element_array<'de, D>(deserializer: D) -> Result<Settings, D::Error>
where
  D: Deserializer<'de>
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(Settings),
    Many(Vec<Settings>)
  }

  Ok(match OneOrMany::deserialize(deserializer)? {
    OneOrMany::One(settings) => settings,
    OneOrMany::Many(list) => list.into_iter().next().unwrap_or_default()
  })
}

fn settings_or_default(value: Option<Value>) -> Settings {
  let Some(value) = value else {
    debug!("snapshot has no settings, using defaults");
    return seed::settings();
  };

  // Defensive unwrapping: some providers deliver settings as [settings]
  let value = match value {
    Value::Array(mut list) if !list.is_empty() => list.remove(0),
    Value::Array(_) => {
      warn!("snapshot settings is an empty array, using defaults");
      return seed::settings();
    }
    other => other
  };

  match serde_json::from_value(value) {
    Ok(settings) => settings,
    Err(e) => {
      warn!(error = %e, "snapshot settings is malformed, using defaults");
      seed::settings()
    }
  }
}

fn view_counts_or_default(value: Option<Value>) -> ViewCounts {
  let Some(value) = value else {
    return ViewCounts::default();
  };

  match serde_json::from_value(value) {
    Ok(counts) => counts,
    Err(e) => {
      warn!(error = %e, "snapshot viewCounts is malformed, resetting");
      ViewCounts::default()
    }
  }
}

fn collection_or<T, F>(map: &mut serde_json::Map<String, Value>, key: &str, fallback: F) -> Vec<T>
where
  T: DeserializeOwned,
  F: FnOnce() -> Vec<T>
{
  match map.remove(key) {
    Some(value @ Value::Array(_)) => match serde_json::from_value(value) {
      Ok(items) => items,
      Err(e) => {
        warn!(key, error = %e, "snapshot collection is malformed, substituting seed");
        fallback()
      }
    },
    Some(_) => {
      warn!(key, "snapshot collection is not an array, substituting seed");
      fallback()
    }
    None => {
      debug!(key, "snapshot collection missing, substituting seed");
      fallback()
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::model::new_id;

  fn sample() -> BackupData {
    let mut snapshot = BackupData::seeded();
    snapshot.settings.app_name = "Roundtrip".to_string();
    snapshot.settings.last_updated = 777;
    snapshot.quotes.push(Quote {
      id: new_id(),
      client_id: "client-1".to_string(),
      admin_id: "admin-default".to_string(),
      ..Quote::default()
    });
    snapshot
  }

  #[test]
  fn serialize_then_parse_is_identity() {
    let snapshot = sample();
    let value = serde_json::to_value(&snapshot).expect("serialize");

    assert_eq!(BackupData::from_value(value), snapshot);
  }

  #[test]
  fn typed_deserialize_matches_defensive_parse() {
    let value = serde_json::to_value(sample()).expect("serialize");

    let typed: BackupData = serde_json::from_value(value.clone()).expect("typed parse");
    assert_eq!(typed, BackupData::from_value(value));
  }

  #[test]
  fn malformed_collection_degrades_alone() {
    let value = json!({
      "brands": "oops, a string",
      "products": [{"id": "p1", "brandId": "b1", "name": "Saw"}],
      "settings": {"appName": "Partial"}
    });

    let snapshot = BackupData::from_value(value);

    assert_eq!(snapshot.brands, seed::brands(), "broken field falls back to seed");
    assert_eq!(snapshot.products.len(), 1, "intact fields survive");
    assert_eq!(snapshot.settings.app_name, "Partial");
  }

  #[test]
  fn empty_arrays_are_preserved_not_reseeded() {
    let mut snapshot = BackupData::seeded();
    snapshot.brands.clear();
    snapshot.products.clear();

    let value = serde_json::to_value(&snapshot).expect("serialize");
    let parsed = BackupData::from_value(value);

    assert!(parsed.brands.is_empty(), "an empty array is valid data, not damage");
    assert!(parsed.products.is_empty());
  }

  #[test]
  fn settings_accepts_one_element_array() {
    let value = json!({
      "settings": [{"appName": "From Array", "lastUpdated": 5}]
    });

    let snapshot = BackupData::from_value(value);
    assert_eq!(snapshot.settings.app_name, "From Array");
    assert_eq!(snapshot.settings.last_updated, 5);

    // The typed path unwraps it too
    let typed: BackupData =
      serde_json::from_value(json!({"settings": [{"appName": "Typed"}]})).expect("typed parse");
    assert_eq!(typed.settings.app_name, "Typed");
  }

  #[test]
  fn non_object_snapshot_falls_back_to_seeds() {
    let snapshot = BackupData::from_value(json!([1, 2, 3]));
    assert_eq!(snapshot, BackupData::seeded());
  }

  #[test]
  fn older_schema_settings_backfill_defaults() {
    let value = json!({
      "settings": {"appName": "Old Install", "lastUpdated": 99}
    });

    let settings = BackupData::from_value(value).settings;

    assert_eq!(settings.app_name, "Old Install");
    assert_eq!(settings.last_updated, 99);
    assert_eq!(settings.kiosk, crate::settings::KioskSettings::default());
  }
}
