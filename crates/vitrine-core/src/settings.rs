//! The global settings document and its typed merge engine.
//!
//! [`Settings`] is a singleton: theming, typography, kiosk behavior,
//! navigation, provider credentials, plus the `lastUpdated` logical clock
//! that sync conflict resolution keys on.
//!
//! Partial updates arrive as a [`SettingsPatch`] — a mirror of the settings
//! tree with `Option` at every leaf. [`Settings::apply`] recurses into the
//! sections that are present and replaces present leaves outright; `Vec`
//! leaves are replaced wholesale, never merged element-wise.
//!
//! Schema growth is handled by serde: every level carries
//! `#[serde(default)]`, so a document stored by an older build deserializes
//! with its own leaf values where present and compiled-in defaults
//! everywhere else.

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// The global settings singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
  /// Kiosk application name shown in the header.
  pub app_name: String,
  /// Logo reference: absolute http(s) URL or data-URI.
  pub logo_url: Option<String>,
  /// Color theming.
  pub theme: ThemeSettings,
  /// Typography.
  pub typography: TypographySettings,
  /// Kiosk behavior (idle timers, volume).
  pub kiosk: KioskSettings,
  /// Navigation chrome.
  pub navigation: NavigationSettings,
  /// Sync behavior and provider credentials.
  pub sync: SyncSettings,
  /// Logical clock (epoch milliseconds). Advanced on every mutation;
  /// used only for sync conflict resolution.
  pub last_updated: i64
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      app_name: "Vitrine".to_string(),
      logo_url: None,
      theme: ThemeSettings::default(),
      typography: TypographySettings::default(),
      kiosk: KioskSettings::default(),
      navigation: NavigationSettings::default(),
      sync: SyncSettings::default(),
      last_updated: 0
    }
  }
}

/// Color theming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeSettings {
  /// Primary accent color (CSS hex).
  pub primary_color: String,
  /// Secondary accent color (CSS hex).
  pub secondary_color: String,
  /// Page background color (CSS hex).
  pub background_color: String,
  /// Body text color (CSS hex).
  pub text_color: String
}

impl Default for ThemeSettings {
  fn default() -> Self {
    Self {
      primary_color: "#1a73e8".to_string(),
      secondary_color: "#f9ab00".to_string(),
      background_color: "#ffffff".to_string(),
      text_color: "#202124".to_string()
    }
  }
}

/// Typography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypographySettings {
  /// Heading font family.
  pub heading_font: String,
  /// Body font family.
  pub body_font: String,
  /// Base font size in px.
  pub base_size_px: u16
}

impl Default for TypographySettings {
  fn default() -> Self {
    Self {
      heading_font: "Inter".to_string(),
      body_font: "Inter".to_string(),
      base_size_px: 16
    }
  }
}

/// Kiosk behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KioskSettings {
  /// Seconds of inactivity before the screensaver starts.
  pub idle_timeout_secs: u32,
  /// Seconds each screensaver slide is shown.
  pub screensaver_slide_secs: u32,
  /// Whether screensaver videos play sound.
  pub screensaver_sound: bool
}

impl Default for KioskSettings {
  fn default() -> Self {
    Self {
      idle_timeout_secs: 120,
      screensaver_slide_secs: 8,
      screensaver_sound: false
    }
  }
}

/// Navigation chrome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationSettings {
  /// Show the search bar.
  pub show_search: bool,
  /// Show the category sidebar.
  pub show_categories: bool,
  /// Section keys hidden from the main menu. Replaced wholesale on update.
  pub hidden_sections: Vec<String>
}

impl Default for NavigationSettings {
  fn default() -> Self {
    Self {
      show_search: true,
      show_categories: true,
      hidden_sections: Vec::new()
    }
  }
}

/// Sync behavior and provider credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
  /// Push local mutations automatically after the debounce window.
  pub auto_sync_enabled: bool,
  /// Provider the credentials below belong to.
  pub provider: ProviderKind,
  /// Custom HTTP API endpoint.
  pub custom_api_url: Option<String>,
  /// Shared secret sent as `x-api-key`.
  pub custom_api_key: Option<String>,
  /// Public read-only snapshot URL.
  pub shared_url: Option<String>
}

impl Default for SyncSettings {
  fn default() -> Self {
    Self {
      auto_sync_enabled: true,
      provider: ProviderKind::None,
      custom_api_url: None,
      custom_api_key: None,
      shared_url: None
    }
  }
}

/// Partial settings update: `None` leaves the current value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
  /// New application name.
  pub app_name: Option<String>,
  /// New logo reference. `Some(None)` clears it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub logo_url: Option<Option<String>>,
  /// Theme section patch.
  pub theme: Option<ThemePatch>,
  /// Typography section patch.
  pub typography: Option<TypographyPatch>,
  /// Kiosk section patch.
  pub kiosk: Option<KioskPatch>,
  /// Navigation section patch.
  pub navigation: Option<NavigationPatch>,
  /// Sync section patch.
  pub sync: Option<SyncPatch>
}

/// Partial [`ThemeSettings`] update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemePatch {
  /// New primary color.
  pub primary_color: Option<String>,
  /// New secondary color.
  pub secondary_color: Option<String>,
  /// New background color.
  pub background_color: Option<String>,
  /// New text color.
  pub text_color: Option<String>
}

/// Partial [`TypographySettings`] update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypographyPatch {
  /// New heading font.
  pub heading_font: Option<String>,
  /// New body font.
  pub body_font: Option<String>,
  /// New base size.
  pub base_size_px: Option<u16>
}

/// Partial [`KioskSettings`] update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KioskPatch {
  /// New idle timeout.
  pub idle_timeout_secs: Option<u32>,
  /// New slide duration.
  pub screensaver_slide_secs: Option<u32>,
  /// New sound flag.
  pub screensaver_sound: Option<bool>
}

/// Partial [`NavigationSettings`] update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationPatch {
  /// New search flag.
  pub show_search: Option<bool>,
  /// New categories flag.
  pub show_categories: Option<bool>,
  /// Replacement hidden-section list (wholesale).
  pub hidden_sections: Option<Vec<String>>
}

/// Partial [`SyncSettings`] update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncPatch {
  /// New auto-sync flag.
  pub auto_sync_enabled: Option<bool>,
  /// New provider discriminant.
  pub provider: Option<ProviderKind>,
  /// New API endpoint. `Some(None)` clears it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub custom_api_url: Option<Option<String>>,
  /// New API key. `Some(None)` clears it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub custom_api_key: Option<Option<String>>,
  /// New shared URL. `Some(None)` clears it.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub shared_url: Option<Option<String>>
}

fn set<T>(slot: &mut T, value: Option<T>) {
  if let Some(v) = value {
    *slot = v;
  }
}

impl Settings {
  /// Merge a partial update into this document.
  ///
  /// Recurses into present sections; present leaves replace the current
  /// value outright, `Vec` leaves wholesale. Does NOT stamp `last_updated`
  /// — the catalog does that once per logical mutation.
  pub fn apply(&mut self, patch: SettingsPatch) {
    set(&mut self.app_name, patch.app_name);
    set(&mut self.logo_url, patch.logo_url);

    if let Some(theme) = patch.theme {
      set(&mut self.theme.primary_color, theme.primary_color);
      set(&mut self.theme.secondary_color, theme.secondary_color);
      set(&mut self.theme.background_color, theme.background_color);
      set(&mut self.theme.text_color, theme.text_color);
    }

    if let Some(typography) = patch.typography {
      set(&mut self.typography.heading_font, typography.heading_font);
      set(&mut self.typography.body_font, typography.body_font);
      set(&mut self.typography.base_size_px, typography.base_size_px);
    }

    if let Some(kiosk) = patch.kiosk {
      set(&mut self.kiosk.idle_timeout_secs, kiosk.idle_timeout_secs);
      set(
        &mut self.kiosk.screensaver_slide_secs,
        kiosk.screensaver_slide_secs
      );
      set(&mut self.kiosk.screensaver_sound, kiosk.screensaver_sound);
    }

    if let Some(navigation) = patch.navigation {
      set(&mut self.navigation.show_search, navigation.show_search);
      set(
        &mut self.navigation.show_categories,
        navigation.show_categories
      );
      set(
        &mut self.navigation.hidden_sections,
        navigation.hidden_sections
      );
    }

    if let Some(sync) = patch.sync {
      set(&mut self.sync.auto_sync_enabled, sync.auto_sync_enabled);
      set(&mut self.sync.provider, sync.provider);
      set(&mut self.sync.custom_api_url, sync.custom_api_url);
      set(&mut self.sync.custom_api_key, sync.custom_api_key);
      set(&mut self.sync.shared_url, sync.shared_url);
    }
  }
}
