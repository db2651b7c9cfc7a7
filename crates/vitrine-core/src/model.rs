//! Catalogue entities and the shared identity/clock helpers.
//!
//! Every entity carries a caller-generated, immutable string id. Entities
//! participating in the trash lifecycle implement [`Trashable`]; soft-deleted
//! rows stay in storage until purged and are filtered out of visible listings.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new entity id: epoch milliseconds plus a random hex suffix.
///
/// Ids are collision-resistant across kiosk devices without coordination.
#[must_use]
pub fn new_id() -> String {
  let suffix = Uuid::new_v4().simple().to_string();
  format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Current wall-clock time in milliseconds since the epoch.
#[must_use]
pub fn now_ms() -> i64 {
  Utc::now().timestamp_millis()
}

/// Advance a logical clock: strictly greater than `prev`, tracking wall time.
///
/// Two mutations within the same millisecond still produce distinct,
/// increasing stamps.
#[must_use]
pub fn next_clock(prev: i64) -> i64 {
  now_ms().max(prev + 1)
}

/// An entity addressable by id.
pub trait Record {
  /// The entity id.
  fn id(&self) -> &str;
}

/// An entity participating in the trash lifecycle.
pub trait Trashable: Record {
  /// Whether the entity is soft-deleted.
  fn is_deleted(&self) -> bool;
  /// Set the soft-delete flag.
  fn set_deleted(&mut self, deleted: bool);
}

macro_rules! impl_record {
  ($($ty:ty),+) => {
    $(impl Record for $ty {
      fn id(&self) -> &str {
        &self.id
      }
    })+
  };
}

macro_rules! impl_trashable {
  ($($ty:ty),+) => {
    $(impl Trashable for $ty {
      fn is_deleted(&self) -> bool {
        self.is_deleted
      }

      fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
      }
    })+
  };
}

/// A brand shown on the kiosk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Brand {
  /// Entity id.
  pub id: String,
  /// Display name.
  pub name: String,
  /// Logo reference: absolute http(s) URL or data-URI.
  pub logo_url: Option<String>,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// A product belonging to a brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
  /// Entity id.
  pub id: String,
  /// Owning brand id.
  pub brand_id: String,
  /// Display name.
  pub name: String,
  /// Stock-keeping unit.
  pub sku: Option<String>,
  /// Free-form description.
  pub description: Option<String>,
  /// Image reference: absolute http(s) URL or data-URI.
  pub image_url: Option<String>,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// A PDF catalogue, optionally scoped to a brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Catalogue {
  /// Entity id.
  pub id: String,
  /// Owning brand id, if brand-scoped.
  pub brand_id: Option<String>,
  /// Display title.
  pub title: String,
  /// Catalogue year.
  pub year: Option<i32>,
  /// Document reference: absolute http(s) URL or data-URI.
  pub pdf_url: Option<String>,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// A promotional pamphlet with a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Pamphlet {
  /// Entity id.
  pub id: String,
  /// Display title.
  pub title: String,
  /// Page image references, in reading order.
  pub image_urls: Vec<String>,
  /// First day of validity (ISO 8601 date).
  pub start_date: Option<String>,
  /// Last day of validity (ISO 8601 date).
  pub end_date: Option<String>,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// Media kind of a screensaver ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
  /// Still image.
  #[default]
  Image,
  /// Video clip.
  Video
}

/// A full-screen ad shown by the idle screensaver carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreensaverAd {
  /// Entity id.
  pub id: String,
  /// Display title (admin-facing).
  pub title: String,
  /// Media reference: absolute http(s) URL or data-URI.
  pub media_url: String,
  /// Image or video.
  pub media_type: MediaKind
}

/// An administrator account, authenticated by PIN lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminUser {
  /// Entity id.
  pub id: String,
  /// Display name.
  pub name: String,
  /// Login PIN.
  pub pin: String
}

/// Looping video content for TV displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TvContent {
  /// Entity id.
  pub id: String,
  /// Owning brand id, if brand-scoped.
  pub brand_id: Option<String>,
  /// Display title.
  pub title: String,
  /// Video reference: absolute http(s) URL or data-URI.
  pub media_url: String,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
  /// Entity id.
  pub id: String,
  /// Owning brand id, if brand-scoped.
  pub brand_id: Option<String>,
  /// Display name.
  pub name: String,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// A customer on whose behalf quotes are raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
  /// Entity id.
  pub id: String,
  /// Display name.
  pub name: String,
  /// Contact email.
  pub email: Option<String>,
  /// Contact phone.
  pub phone: Option<String>,
  /// Soft-delete flag.
  pub is_deleted: bool
}

/// Quote lifecycle status. Toggle-able in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
  /// Raised, awaiting a price.
  #[default]
  Pending,
  /// Priced and sent back.
  Quoted
}

impl QuoteStatus {
  /// The other status.
  #[must_use]
  pub fn toggled(self) -> Self {
    match self {
      Self::Pending => Self::Quoted,
      Self::Quoted => Self::Pending
    }
  }
}

/// One line item of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteItem {
  /// Product id at the time the quote was raised.
  pub product_id: String,
  /// Requested quantity.
  pub quantity: u32
}

/// A quote raised by an admin for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
  /// Entity id.
  pub id: String,
  /// Referenced client id.
  pub client_id: String,
  /// Admin who raised the quote.
  pub admin_id: String,
  /// Lifecycle status.
  pub status: QuoteStatus,
  /// Line-item snapshot.
  pub items: Vec<QuoteItem>,
  /// Product ids ticked off on the fulfillment checklist.
  pub ticked_items: Vec<String>,
  /// Uploaded proof-of-quote image reference.
  pub proof_image: Option<String>,
  /// Creation time (epoch milliseconds).
  pub created_at: i64
}

/// Per-kiosk view tallies. Incremented on every view event, never decremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct KioskViews {
  /// Brand id → view count.
  pub brands: BTreeMap<String, u64>,
  /// Product id → view count.
  pub products: BTreeMap<String, u64>
}

/// Kiosk device id → its view tallies.
pub type ViewCounts = BTreeMap<String, KioskViews>;

impl_record!(
  Brand, Product, Catalogue, Pamphlet, ScreensaverAd, AdminUser, TvContent, Category, Client,
  Quote
);

impl_trashable!(Brand, Product, Catalogue, Pamphlet, TvContent, Category, Client);
