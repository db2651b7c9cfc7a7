//! The catalog controller — single owner of all application state.
//!
//! Replaces ad-hoc global context with one struct: UI layers hold an
//! `Arc<Catalog>` and go through its mutation methods. Every logical
//! mutation advances the settings logical clock exactly once (cascades
//! included), writes the touched store keys, and emits one
//! [`StoreEvent::Mutated`] to the sync engine. Reads see mutations
//! immediately; persistence and provider sync lag by design.

use std::{path::PathBuf, sync::Mutex};

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::{
  model::{
    AdminUser, Brand, Catalogue, Category, Client, KioskViews, Pamphlet, Product, Quote,
    QuoteStatus, Record, ScreensaverAd, Trashable, TvContent, ViewCounts, next_clock
  },
  provider::ProviderKind,
  seed,
  settings::{Settings, SettingsPatch},
  snapshot::BackupData,
  store::{StateStore, keys},
  sync::StoreEvent
};

/// Rejections the UI must surface verbatim.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
  /// An admin tried to delete the account they are signed in with.
  #[error("you cannot delete the admin account you are signed in with")]
  SelfDelete
}

/// Everything the kiosk persists, in memory.
#[derive(Debug, Clone)]
pub struct CatalogState {
  /// Brand collection.
  pub brands: Vec<Brand>,
  /// Product collection.
  pub products: Vec<Product>,
  /// Catalogue collection.
  pub catalogues: Vec<Catalogue>,
  /// Pamphlet collection.
  pub pamphlets: Vec<Pamphlet>,
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
  /// Settings singleton (carries the logical clock).
  pub settings: Settings,
  /// Per-kiosk view tallies.
  pub view_counts: ViewCounts,
  /// Device-local: display theme.
  pub theme: String,
  /// Device-local: playback volume, 0.0–1.0.
  pub local_volume: f32,
  /// Device-local: first-run setup finished.
  pub is_setup_complete: bool,
  /// Device-local: active provider selection.
  pub provider_kind: ProviderKind,
  /// Device-local: retained sync-directory path for the local provider.
  pub sync_dir: Option<PathBuf>
}

/// Store keys that travel inside a snapshot (everything device-local stays
/// out of the backup envelope).
const SNAPSHOT_KEYS: [&str; 12] = [
  keys::BRANDS,
  keys::PRODUCTS,
  keys::CATALOGUES,
  keys::PAMPHLETS,
  keys::SETTINGS,
  keys::SCREENSAVER_ADS,
  keys::ADMIN_USERS,
  keys::TV_CONTENT,
  keys::CATEGORIES,
  keys::CLIENTS,
  keys::QUOTES,
  keys::VIEW_COUNTS
];

/// Single controller owning [`CatalogState`].
pub struct Catalog {
  store: StateStore,
  state: RwLock<CatalogState>,
  sync_tx: Mutex<Option<mpsc::Sender<StoreEvent>>>
}

impl Catalog {
  /// Load persisted state, falling back per key to seed data.
  ///
  /// A missing or unreadable key never blocks startup.
  pub async fn load(store: StateStore) -> Self {
    let state = CatalogState {
      brands: store.get(keys::BRANDS).await.unwrap_or_else(seed::brands),
      products: store.get(keys::PRODUCTS).await.unwrap_or_else(seed::products),
      catalogues: store.get(keys::CATALOGUES).await.unwrap_or_default(),
      pamphlets: store.get(keys::PAMPHLETS).await.unwrap_or_default(),
      screensaver_ads: store.get(keys::SCREENSAVER_ADS).await.unwrap_or_default(),
      admin_users: store
        .get(keys::ADMIN_USERS)
        .await
        .unwrap_or_else(seed::admin_users),
      tv_content: store.get(keys::TV_CONTENT).await.unwrap_or_default(),
      categories: store.get(keys::CATEGORIES).await.unwrap_or_default(),
      clients: store.get(keys::CLIENTS).await.unwrap_or_default(),
      quotes: store.get(keys::QUOTES).await.unwrap_or_default(),
      settings: store.get(keys::SETTINGS).await.unwrap_or_else(seed::settings),
      view_counts: store.get(keys::VIEW_COUNTS).await.unwrap_or_default(),
      theme: store
        .get(keys::THEME)
        .await
        .unwrap_or_else(|| "light".to_string()),
      local_volume: store.get(keys::LOCAL_VOLUME).await.unwrap_or(0.75),
      is_setup_complete: store.get(keys::IS_SETUP_COMPLETE).await.unwrap_or(false),
      provider_kind: store.get(keys::STORAGE_PROVIDER).await.unwrap_or_default(),
      sync_dir: store.get(keys::DIRECTORY_HANDLE).await.unwrap_or_default()
    };

    info!(
      brands = state.brands.len(),
      products = state.products.len(),
      clock = state.settings.last_updated,
      "catalog loaded"
    );

    Self {
      store,
      state: RwLock::new(state),
      sync_tx: Mutex::new(None)
    }
  }

  /// Wire mutations to a sync engine. Replaces any previous sender.
  pub fn attach_sync(&self, tx: mpsc::Sender<StoreEvent>) {
    if let Ok(mut guard) = self.sync_tx.lock() {
      *guard = Some(tx);
    }
  }

  /// Detach from the sync engine (provider disconnect).
  pub fn detach_sync(&self) {
    if let Ok(mut guard) = self.sync_tx.lock() {
      *guard = None;
    }
  }

  // --------------------------------------------------------------------
  // Reads
  // --------------------------------------------------------------------

  /// Current settings document.
  pub async fn settings(&self) -> Settings {
    self.state.read().await.settings.clone()
  }

  /// Current logical clock.
  pub async fn last_updated(&self) -> i64 {
    self.state.read().await.settings.last_updated
  }

  /// Whether debounced auto-push is enabled.
  pub async fn auto_sync_enabled(&self) -> bool {
    self.state.read().await.settings.sync.auto_sync_enabled
  }

  /// Brands visible on the kiosk (soft-deleted excluded).
  pub async fn visible_brands(&self) -> Vec<Brand> {
    visible(&self.state.read().await.brands)
  }

  /// Soft-deleted brands (the trash screen).
  pub async fn trashed_brands(&self) -> Vec<Brand> {
    trashed(&self.state.read().await.brands)
  }

  /// A brand by id, soft-deleted or not.
  pub async fn brand(&self, id: &str) -> Option<Brand> {
    by_id(&self.state.read().await.brands, id)
  }

  /// Products of a visible brand, soft-deleted excluded on both sides.
  ///
  /// A soft-deleted brand hides all of its products even though the
  /// products themselves keep `is_deleted: false`.
  pub async fn brand_products(&self, brand_id: &str) -> Vec<Product> {
    let state = self.state.read().await;

    let brand_visible = state
      .brands
      .iter()
      .any(|b| b.id == brand_id && !b.is_deleted);
    if !brand_visible {
      return Vec::new();
    }

    state
      .products
      .iter()
      .filter(|p| p.brand_id == brand_id && !p.is_deleted)
      .cloned()
      .collect()
  }

  /// Products visible on the kiosk.
  pub async fn visible_products(&self) -> Vec<Product> {
    visible(&self.state.read().await.products)
  }

  /// Soft-deleted products.
  pub async fn trashed_products(&self) -> Vec<Product> {
    trashed(&self.state.read().await.products)
  }

  /// A product by id, soft-deleted or not.
  pub async fn product(&self, id: &str) -> Option<Product> {
    by_id(&self.state.read().await.products, id)
  }

  /// Catalogues visible on the kiosk.
  pub async fn visible_catalogues(&self) -> Vec<Catalogue> {
    visible(&self.state.read().await.catalogues)
  }

  /// Soft-deleted catalogues.
  pub async fn trashed_catalogues(&self) -> Vec<Catalogue> {
    trashed(&self.state.read().await.catalogues)
  }

  /// Pamphlets visible on the kiosk.
  pub async fn visible_pamphlets(&self) -> Vec<Pamphlet> {
    visible(&self.state.read().await.pamphlets)
  }

  /// Soft-deleted pamphlets.
  pub async fn trashed_pamphlets(&self) -> Vec<Pamphlet> {
    trashed(&self.state.read().await.pamphlets)
  }

  /// TV content visible on displays.
  pub async fn visible_tv_content(&self) -> Vec<TvContent> {
    visible(&self.state.read().await.tv_content)
  }

  /// Soft-deleted TV content.
  pub async fn trashed_tv_content(&self) -> Vec<TvContent> {
    trashed(&self.state.read().await.tv_content)
  }

  /// Categories visible on the kiosk.
  pub async fn visible_categories(&self) -> Vec<Category> {
    visible(&self.state.read().await.categories)
  }

  /// Soft-deleted categories.
  pub async fn trashed_categories(&self) -> Vec<Category> {
    trashed(&self.state.read().await.categories)
  }

  /// Clients visible in the admin screens.
  pub async fn visible_clients(&self) -> Vec<Client> {
    visible(&self.state.read().await.clients)
  }

  /// Soft-deleted clients.
  pub async fn trashed_clients(&self) -> Vec<Client> {
    trashed(&self.state.read().await.clients)
  }

  /// All screensaver ads.
  pub async fn screensaver_ads(&self) -> Vec<ScreensaverAd> {
    self.state.read().await.screensaver_ads.clone()
  }

  /// All admin users.
  pub async fn admin_users(&self) -> Vec<AdminUser> {
    self.state.read().await.admin_users.clone()
  }

  /// PIN-lookup login.
  pub async fn find_admin_by_pin(&self, pin: &str) -> Option<AdminUser> {
    self
      .state
      .read()
      .await
      .admin_users
      .iter()
      .find(|a| a.pin == pin)
      .cloned()
  }

  /// All quotes.
  pub async fn quotes(&self) -> Vec<Quote> {
    self.state.read().await.quotes.clone()
  }

  /// Per-kiosk view tallies.
  pub async fn view_counts(&self) -> ViewCounts {
    self.state.read().await.view_counts.clone()
  }

  /// Device-local state: `(theme, volume, setup_complete)`.
  pub async fn device_state(&self) -> (String, f32, bool) {
    let state = self.state.read().await;
    (state.theme.clone(), state.local_volume, state.is_setup_complete)
  }

  /// Active provider selection: `(kind, sync directory)`.
  pub async fn provider_selection(&self) -> (ProviderKind, Option<PathBuf>) {
    let state = self.state.read().await;
    (state.provider_kind, state.sync_dir.clone())
  }

  /// The full current state as a backup envelope.
  pub async fn snapshot(&self) -> BackupData {
    let state = self.state.read().await;
    BackupData {
      brands: state.brands.clone(),
      products: state.products.clone(),
      catalogues: state.catalogues.clone(),
      pamphlets: state.pamphlets.clone(),
      settings: state.settings.clone(),
      screensaver_ads: state.screensaver_ads.clone(),
      admin_users: state.admin_users.clone(),
      tv_content: state.tv_content.clone(),
      categories: state.categories.clone(),
      clients: state.clients.clone(),
      quotes: state.quotes.clone(),
      view_counts: state.view_counts.clone()
    }
  }

  // --------------------------------------------------------------------
  // Brands
  // --------------------------------------------------------------------

  /// Add a brand.
  pub async fn add_brand(&self, brand: Brand) {
    self
      .mutate(&[keys::BRANDS], |state| {
        state.brands.push(brand);
        true
      })
      .await;
  }

  /// Replace a brand by id. Returns `false` for an unknown id.
  pub async fn update_brand(&self, brand: Brand) -> bool {
    self
      .mutate(&[keys::BRANDS], |state| replace_by_id(&mut state.brands, brand))
      .await
  }

  /// Soft-delete a brand. Its products keep their own flags and are hidden
  /// only by the brand-scoped listings.
  pub async fn delete_brand(&self, id: &str) -> bool {
    self
      .mutate(&[keys::BRANDS], |state| set_deleted(&mut state.brands, id, true))
      .await
  }

  /// Restore a soft-deleted brand and every soft-deleted product of it.
  pub async fn restore_brand(&self, id: &str) -> bool {
    self
      .mutate(&[keys::BRANDS, keys::PRODUCTS], |state| {
        if !set_deleted(&mut state.brands, id, false) {
          return false;
        }
        for product in state.products.iter_mut().filter(|p| p.brand_id == id) {
          product.is_deleted = false;
        }
        true
      })
      .await
  }

  /// Permanently remove a brand and every product, catalogue, and category
  /// referencing it. One logical mutation, one clock advance.
  pub async fn purge_brand(&self, id: &str) -> bool {
    self
      .mutate(
        &[keys::BRANDS, keys::PRODUCTS, keys::CATALOGUES, keys::CATEGORIES],
        |state| {
          if !purge_by_id(&mut state.brands, id) {
            return false;
          }
          state.products.retain(|p| p.brand_id != id);
          state.catalogues.retain(|c| c.brand_id.as_deref() != Some(id));
          state.categories.retain(|c| c.brand_id.as_deref() != Some(id));
          true
        }
      )
      .await
  }

  // --------------------------------------------------------------------
  // Products
  // --------------------------------------------------------------------

  /// Add a product.
  pub async fn add_product(&self, product: Product) {
    self
      .mutate(&[keys::PRODUCTS], |state| {
        state.products.push(product);
        true
      })
      .await;
  }

  /// Replace a product by id. Returns `false` for an unknown id.
  pub async fn update_product(&self, product: Product) -> bool {
    self
      .mutate(&[keys::PRODUCTS], |state| {
        replace_by_id(&mut state.products, product)
      })
      .await
  }

  /// Soft-delete a product.
  pub async fn delete_product(&self, id: &str) -> bool {
    self
      .mutate(&[keys::PRODUCTS], |state| {
        set_deleted(&mut state.products, id, true)
      })
      .await
  }

  /// Restore a soft-deleted product.
  pub async fn restore_product(&self, id: &str) -> bool {
    self
      .mutate(&[keys::PRODUCTS], |state| {
        set_deleted(&mut state.products, id, false)
      })
      .await
  }

  /// Permanently remove a product.
  pub async fn purge_product(&self, id: &str) -> bool {
    self
      .mutate(&[keys::PRODUCTS], |state| purge_by_id(&mut state.products, id))
      .await
  }

  // --------------------------------------------------------------------
  // Catalogues
  // --------------------------------------------------------------------

  /// Add a catalogue.
  pub async fn add_catalogue(&self, catalogue: Catalogue) {
    self
      .mutate(&[keys::CATALOGUES], |state| {
        state.catalogues.push(catalogue);
        true
      })
      .await;
  }

  /// Replace a catalogue by id. Returns `false` for an unknown id.
  pub async fn update_catalogue(&self, catalogue: Catalogue) -> bool {
    self
      .mutate(&[keys::CATALOGUES], |state| {
        replace_by_id(&mut state.catalogues, catalogue)
      })
      .await
  }

  /// Soft-delete a catalogue.
  pub async fn delete_catalogue(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CATALOGUES], |state| {
        set_deleted(&mut state.catalogues, id, true)
      })
      .await
  }

  /// Restore a soft-deleted catalogue.
  pub async fn restore_catalogue(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CATALOGUES], |state| {
        set_deleted(&mut state.catalogues, id, false)
      })
      .await
  }

  /// Permanently remove a catalogue.
  pub async fn purge_catalogue(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CATALOGUES], |state| {
        purge_by_id(&mut state.catalogues, id)
      })
      .await
  }

  // --------------------------------------------------------------------
  // Pamphlets
  // --------------------------------------------------------------------

  /// Add a pamphlet.
  pub async fn add_pamphlet(&self, pamphlet: Pamphlet) {
    self
      .mutate(&[keys::PAMPHLETS], |state| {
        state.pamphlets.push(pamphlet);
        true
      })
      .await;
  }

  /// Replace a pamphlet by id. Returns `false` for an unknown id.
  pub async fn update_pamphlet(&self, pamphlet: Pamphlet) -> bool {
    self
      .mutate(&[keys::PAMPHLETS], |state| {
        replace_by_id(&mut state.pamphlets, pamphlet)
      })
      .await
  }

  /// Soft-delete a pamphlet.
  pub async fn delete_pamphlet(&self, id: &str) -> bool {
    self
      .mutate(&[keys::PAMPHLETS], |state| {
        set_deleted(&mut state.pamphlets, id, true)
      })
      .await
  }

  /// Restore a soft-deleted pamphlet.
  pub async fn restore_pamphlet(&self, id: &str) -> bool {
    self
      .mutate(&[keys::PAMPHLETS], |state| {
        set_deleted(&mut state.pamphlets, id, false)
      })
      .await
  }

  /// Permanently remove a pamphlet.
  pub async fn purge_pamphlet(&self, id: &str) -> bool {
    self
      .mutate(&[keys::PAMPHLETS], |state| purge_by_id(&mut state.pamphlets, id))
      .await
  }

  // --------------------------------------------------------------------
  // TV content
  // --------------------------------------------------------------------

  /// Add TV content.
  pub async fn add_tv_content(&self, content: TvContent) {
    self
      .mutate(&[keys::TV_CONTENT], |state| {
        state.tv_content.push(content);
        true
      })
      .await;
  }

  /// Replace TV content by id. Returns `false` for an unknown id.
  pub async fn update_tv_content(&self, content: TvContent) -> bool {
    self
      .mutate(&[keys::TV_CONTENT], |state| {
        replace_by_id(&mut state.tv_content, content)
      })
      .await
  }

  /// Soft-delete TV content.
  pub async fn delete_tv_content(&self, id: &str) -> bool {
    self
      .mutate(&[keys::TV_CONTENT], |state| {
        set_deleted(&mut state.tv_content, id, true)
      })
      .await
  }

  /// Restore soft-deleted TV content.
  pub async fn restore_tv_content(&self, id: &str) -> bool {
    self
      .mutate(&[keys::TV_CONTENT], |state| {
        set_deleted(&mut state.tv_content, id, false)
      })
      .await
  }

  /// Permanently remove TV content.
  pub async fn purge_tv_content(&self, id: &str) -> bool {
    self
      .mutate(&[keys::TV_CONTENT], |state| {
        purge_by_id(&mut state.tv_content, id)
      })
      .await
  }

  // --------------------------------------------------------------------
  // Categories
  // --------------------------------------------------------------------

  /// Add a category.
  pub async fn add_category(&self, category: Category) {
    self
      .mutate(&[keys::CATEGORIES], |state| {
        state.categories.push(category);
        true
      })
      .await;
  }

  /// Replace a category by id. Returns `false` for an unknown id.
  pub async fn update_category(&self, category: Category) -> bool {
    self
      .mutate(&[keys::CATEGORIES], |state| {
        replace_by_id(&mut state.categories, category)
      })
      .await
  }

  /// Soft-delete a category.
  pub async fn delete_category(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CATEGORIES], |state| {
        set_deleted(&mut state.categories, id, true)
      })
      .await
  }

  /// Restore a soft-deleted category.
  pub async fn restore_category(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CATEGORIES], |state| {
        set_deleted(&mut state.categories, id, false)
      })
      .await
  }

  /// Permanently remove a category.
  pub async fn purge_category(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CATEGORIES], |state| {
        purge_by_id(&mut state.categories, id)
      })
      .await
  }

  // --------------------------------------------------------------------
  // Clients
  // --------------------------------------------------------------------

  /// Add a client.
  pub async fn add_client(&self, client: Client) {
    self
      .mutate(&[keys::CLIENTS], |state| {
        state.clients.push(client);
        true
      })
      .await;
  }

  /// Replace a client by id. Returns `false` for an unknown id.
  pub async fn update_client(&self, client: Client) -> bool {
    self
      .mutate(&[keys::CLIENTS], |state| replace_by_id(&mut state.clients, client))
      .await
  }

  /// Soft-delete a client.
  pub async fn delete_client(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CLIENTS], |state| set_deleted(&mut state.clients, id, true))
      .await
  }

  /// Restore a soft-deleted client.
  pub async fn restore_client(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CLIENTS], |state| {
        set_deleted(&mut state.clients, id, false)
      })
      .await
  }

  /// Permanently remove a client.
  pub async fn purge_client(&self, id: &str) -> bool {
    self
      .mutate(&[keys::CLIENTS], |state| purge_by_id(&mut state.clients, id))
      .await
  }

  // --------------------------------------------------------------------
  // Screensaver ads (no trash lifecycle)
  // --------------------------------------------------------------------

  /// Add a screensaver ad.
  pub async fn add_screensaver_ad(&self, ad: ScreensaverAd) {
    self
      .mutate(&[keys::SCREENSAVER_ADS], |state| {
        state.screensaver_ads.push(ad);
        true
      })
      .await;
  }

  /// Replace a screensaver ad by id. Returns `false` for an unknown id.
  pub async fn update_screensaver_ad(&self, ad: ScreensaverAd) -> bool {
    self
      .mutate(&[keys::SCREENSAVER_ADS], |state| {
        replace_by_id(&mut state.screensaver_ads, ad)
      })
      .await
  }

  /// Remove a screensaver ad.
  pub async fn remove_screensaver_ad(&self, id: &str) -> bool {
    self
      .mutate(&[keys::SCREENSAVER_ADS], |state| {
        purge_by_id(&mut state.screensaver_ads, id)
      })
      .await
  }

  // --------------------------------------------------------------------
  // Admin users
  // --------------------------------------------------------------------

  /// Add an admin account.
  pub async fn add_admin(&self, admin: AdminUser) {
    self
      .mutate(&[keys::ADMIN_USERS], |state| {
        state.admin_users.push(admin);
        true
      })
      .await;
  }

  /// Replace an admin account by id. Returns `false` for an unknown id.
  pub async fn update_admin(&self, admin: AdminUser) -> bool {
    self
      .mutate(&[keys::ADMIN_USERS], |state| {
        replace_by_id(&mut state.admin_users, admin)
      })
      .await
  }

  /// Remove an admin account.
  ///
  /// # Errors
  ///
  /// Returns [`CatalogError::SelfDelete`] when `id` is the signed-in
  /// account; state is unchanged.
  pub async fn remove_admin(&self, id: &str, signed_in_id: &str) -> Result<bool, CatalogError> {
    if id == signed_in_id {
      return Err(CatalogError::SelfDelete);
    }

    Ok(
      self
        .mutate(&[keys::ADMIN_USERS], |state| {
          purge_by_id(&mut state.admin_users, id)
        })
        .await
    )
  }

  // --------------------------------------------------------------------
  // Quotes
  // --------------------------------------------------------------------

  /// Add a quote.
  pub async fn add_quote(&self, quote: Quote) {
    self
      .mutate(&[keys::QUOTES], |state| {
        state.quotes.push(quote);
        true
      })
      .await;
  }

  /// Replace a quote by id. Returns `false` for an unknown id.
  pub async fn update_quote(&self, quote: Quote) -> bool {
    self
      .mutate(&[keys::QUOTES], |state| replace_by_id(&mut state.quotes, quote))
      .await
  }

  /// Toggle a quote between `pending` and `quoted`. Returns the new status.
  pub async fn toggle_quote_status(&self, id: &str) -> Option<QuoteStatus> {
    let mut toggled = None;

    self
      .mutate(&[keys::QUOTES], |state| {
        let Some(quote) = state.quotes.iter_mut().find(|q| q.id == id) else {
          return false;
        };
        quote.status = quote.status.toggled();
        toggled = Some(quote.status);
        true
      })
      .await;

    toggled
  }

  /// Toggle a product on a quote's fulfillment checklist.
  pub async fn tick_quote_item(&self, id: &str, product_id: &str) -> bool {
    self
      .mutate(&[keys::QUOTES], |state| {
        let Some(quote) = state.quotes.iter_mut().find(|q| q.id == id) else {
          return false;
        };

        if let Some(pos) = quote.ticked_items.iter().position(|p| p == product_id) {
          quote.ticked_items.remove(pos);
        } else {
          quote.ticked_items.push(product_id.to_string());
        }
        true
      })
      .await
  }

  /// Attach a proof-of-quote image reference.
  pub async fn attach_quote_proof(&self, id: &str, reference: String) -> bool {
    self
      .mutate(&[keys::QUOTES], |state| {
        let Some(quote) = state.quotes.iter_mut().find(|q| q.id == id) else {
          return false;
        };
        quote.proof_image = Some(reference);
        true
      })
      .await
  }

  /// Remove a quote.
  pub async fn remove_quote(&self, id: &str) -> bool {
    self
      .mutate(&[keys::QUOTES], |state| purge_by_id(&mut state.quotes, id))
      .await
  }

  // --------------------------------------------------------------------
  // Settings
  // --------------------------------------------------------------------

  /// Deep-merge a partial settings update and stamp the clock.
  pub async fn update_settings(&self, patch: SettingsPatch) {
    self
      .mutate(&[], |state| {
        state.settings.apply(patch);
        true
      })
      .await;
  }

  // --------------------------------------------------------------------
  // View counts (persisted, but outside the logical clock)
  // --------------------------------------------------------------------

  /// Count one brand view on a kiosk device.
  pub async fn record_brand_view(&self, kiosk_id: &str, brand_id: &str) {
    let mut state = self.state.write().await;
    let views = kiosk_views(&mut state.view_counts, kiosk_id);
    *views.brands.entry(brand_id.to_string()).or_insert(0) += 1;
    self.persist(&state, keys::VIEW_COUNTS).await;
  }

  /// Count one product view on a kiosk device.
  pub async fn record_product_view(&self, kiosk_id: &str, product_id: &str) {
    let mut state = self.state.write().await;
    let views = kiosk_views(&mut state.view_counts, kiosk_id);
    *views.products.entry(product_id.to_string()).or_insert(0) += 1;
    self.persist(&state, keys::VIEW_COUNTS).await;
  }

  // --------------------------------------------------------------------
  // Device-local state (not part of the snapshot, no clock)
  // --------------------------------------------------------------------

  /// Set the device display theme.
  pub async fn set_theme(&self, theme: String) {
    let mut state = self.state.write().await;
    state.theme = theme;
    self.persist(&state, keys::THEME).await;
  }

  /// Set the device playback volume.
  pub async fn set_local_volume(&self, volume: f32) {
    let mut state = self.state.write().await;
    state.local_volume = volume.clamp(0.0, 1.0);
    self.persist(&state, keys::LOCAL_VOLUME).await;
  }

  /// Mark first-run setup as complete.
  pub async fn set_setup_complete(&self, complete: bool) {
    let mut state = self.state.write().await;
    state.is_setup_complete = complete;
    self.persist(&state, keys::IS_SETUP_COMPLETE).await;
  }

  /// Record the active provider selection and sync directory.
  pub async fn set_provider_selection(&self, kind: ProviderKind, sync_dir: Option<PathBuf>) {
    let mut state = self.state.write().await;
    state.provider_kind = kind;
    state.sync_dir = sync_dir;
    self.persist(&state, keys::STORAGE_PROVIDER).await;
    self.persist(&state, keys::DIRECTORY_HANDLE).await;
  }

  // --------------------------------------------------------------------
  // Snapshot exchange
  // --------------------------------------------------------------------

  /// Restore a manual backup. Parsing is defensive: broken collections
  /// degrade to seeds one by one. Counts as one mutation — the clock
  /// advances past both the prior local clock and the backup's own clock.
  pub async fn restore_backup(&self, value: Value) {
    let incoming = BackupData::from_value(value);

    let mut state = self.state.write().await;
    let prior = state.settings.last_updated;
    let imported = incoming.settings.last_updated;

    apply_snapshot(&mut state, incoming);
    state.settings.last_updated = next_clock(prior.max(imported));

    for key in SNAPSHOT_KEYS {
      self.persist(&state, key).await;
    }
    drop(state);

    info!("backup restored");
    self.notify();
  }

  /// Replace local state wholesale with a strictly newer remote snapshot.
  ///
  /// The remote clock is adopted as-is, and no mutation event is emitted —
  /// a pull must never trigger an echo push.
  pub async fn replace_with_snapshot(&self, remote: BackupData) {
    let mut state = self.state.write().await;
    apply_snapshot(&mut state, remote);

    for key in SNAPSHOT_KEYS {
      self.persist(&state, key).await;
    }

    debug!(clock = state.settings.last_updated, "local state replaced by remote snapshot");
  }

  // --------------------------------------------------------------------
  // Internals
  // --------------------------------------------------------------------

  /// Run one logical mutation: apply `f`, and when it reports a change,
  /// advance the clock once, persist the touched keys plus settings, and
  /// emit one mutation event.
  async fn mutate<F>(&self, touched: &[&str], f: F) -> bool
  where
    F: FnOnce(&mut CatalogState) -> bool
  {
    let mut state = self.state.write().await;

    if !f(&mut state) {
      return false;
    }

    state.settings.last_updated = next_clock(state.settings.last_updated);

    for key in touched {
      self.persist(&state, key).await;
    }
    self.persist(&state, keys::SETTINGS).await;
    drop(state);

    self.notify();
    true
  }

  /// Write one key through to the durable store. Failures are logged, not
  /// retried: the key is rewritten on the next mutation anyway.
  async fn persist(&self, state: &CatalogState, key: &str) {
    let result = match key {
      keys::BRANDS => self.store.put(key, &state.brands).await,
      keys::PRODUCTS => self.store.put(key, &state.products).await,
      keys::CATALOGUES => self.store.put(key, &state.catalogues).await,
      keys::PAMPHLETS => self.store.put(key, &state.pamphlets).await,
      keys::SETTINGS => self.store.put(key, &state.settings).await,
      keys::SCREENSAVER_ADS => self.store.put(key, &state.screensaver_ads).await,
      keys::ADMIN_USERS => self.store.put(key, &state.admin_users).await,
      keys::TV_CONTENT => self.store.put(key, &state.tv_content).await,
      keys::CATEGORIES => self.store.put(key, &state.categories).await,
      keys::CLIENTS => self.store.put(key, &state.clients).await,
      keys::QUOTES => self.store.put(key, &state.quotes).await,
      keys::VIEW_COUNTS => self.store.put(key, &state.view_counts).await,
      keys::THEME => self.store.put(key, &state.theme).await,
      keys::LOCAL_VOLUME => self.store.put(key, &state.local_volume).await,
      keys::IS_SETUP_COMPLETE => self.store.put(key, &state.is_setup_complete).await,
      keys::STORAGE_PROVIDER => self.store.put(key, &state.provider_kind).await,
      keys::DIRECTORY_HANDLE => self.store.put(key, &state.sync_dir).await,
      other => {
        warn!(key = other, "unknown store key, nothing persisted");
        return;
      }
    };

    if let Err(e) = result {
      warn!(key, error = %e, "state write failed");
    }
  }

  fn notify(&self) {
    let Ok(guard) = self.sync_tx.lock() else {
      return;
    };
    if let Some(tx) = guard.as_ref() {
      // A full channel means a sync is already queued; dropping is fine
      let _ = tx.try_send(StoreEvent::Mutated);
    }
  }
}

fn apply_snapshot(state: &mut CatalogState, snapshot: BackupData) {
  state.brands = snapshot.brands;
  state.products = snapshot.products;
  state.catalogues = snapshot.catalogues;
  state.pamphlets = snapshot.pamphlets;
  state.settings = snapshot.settings;
  state.screensaver_ads = snapshot.screensaver_ads;
  state.admin_users = snapshot.admin_users;
  state.tv_content = snapshot.tv_content;
  state.categories = snapshot.categories;
  state.clients = snapshot.clients;
  state.quotes = snapshot.quotes;
  state.view_counts = snapshot.view_counts;
}

fn kiosk_views<'a>(counts: &'a mut ViewCounts, kiosk_id: &str) -> &'a mut KioskViews {
  counts.entry(kiosk_id.to_string()).or_default()
}

fn by_id<T: Record + Clone>(items: &[T], id: &str) -> Option<T> {
  items.iter().find(|item| item.id() == id).cloned()
}

fn visible<T: Trashable + Clone>(items: &[T]) -> Vec<T> {
  items.iter().filter(|item| !item.is_deleted()).cloned().collect()
}

fn trashed<T: Trashable + Clone>(items: &[T]) -> Vec<T> {
  items.iter().filter(|item| item.is_deleted()).cloned().collect()
}

fn replace_by_id<T: Record>(items: &mut [T], item: T) -> bool {
  match items.iter_mut().find(|existing| existing.id() == item.id()) {
    Some(slot) => {
      *slot = item;
      true
    }
    None => false
  }
}

/// Flip the soft-delete flag. No-op (and no clock advance) when the entity
/// is unknown or the flag already has the requested value.
fn set_deleted<T: Trashable>(items: &mut [T], id: &str, deleted: bool) -> bool {
  match items.iter_mut().find(|item| item.id() == id) {
    Some(item) if item.is_deleted() != deleted => {
      item.set_deleted(deleted);
      true
    }
    _ => false
  }
}

fn purge_by_id<T: Record>(items: &mut Vec<T>, id: &str) -> bool {
  let before = items.len();
  items.retain(|item| item.id() != id);
  items.len() != before
}
