use serde::{Deserialize, Serialize};

use crate::{
    foundation::error::{ReportError, ReportResult},
    model::session::SessionInput,
};

/// Number of items in a freshly initialized catalog.
pub const DEFAULT_ITEM_COUNT: u32 = 28;

const DEFAULT_INTRODUCTION: &str = "Caro(a) [NOME_CLIENTE],

Este relatório apresenta as frequências terapêuticas utilizadas em sua sessão. Cada frequência \
foi selecionada especificamente para suas necessidades terapêuticas atuais.

As frequências são ferramentas importantes no processo de harmonização e equilíbrio energético, \
contribuindo para seu bem-estar geral.";

/// One selectable catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: u32,
    pub title: String,
    pub description: String,
    /// Remote URL, `data:` URI or local path.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CatalogItem {
    fn placeholder(id: u32) -> Self {
        Self {
            id,
            title: format!("Frequência {id}"),
            description: format!(
                "Descrição da frequência {id}. Configure este texto na área administrativa."
            ),
            image_url: None,
        }
    }

    /// The image reference, ignoring empty strings.
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Cover page template settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverSettings {
    pub background_image: String,
    /// Preset id the background came from, or `"custom"`.
    pub background_type: String,
}

impl Default for CoverSettings {
    fn default() -> Self {
        CoverPreset::DEFAULT.settings()
    }
}

/// A predefined cover background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoverPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

/// Variant label for a user-supplied cover background.
pub const CUSTOM_COVER_VARIANT: &str = "custom";

impl CoverPreset {
    pub const DEFAULT: CoverPreset = COVER_PRESETS[0];

    pub fn find(id: &str) -> Option<CoverPreset> {
        COVER_PRESETS.iter().copied().find(|p| p.id == id)
    }

    pub fn settings(self) -> CoverSettings {
        CoverSettings {
            background_image: self.url.to_string(),
            background_type: self.id.to_string(),
        }
    }
}

pub const COVER_PRESETS: [CoverPreset; 6] = [
    CoverPreset {
        id: "mandala",
        name: "Mandala Dourada",
        url: "https://images.pexels.com/photos/1103970/pexels-photo-1103970.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    CoverPreset {
        id: "nature",
        name: "Natureza Zen",
        url: "https://images.pexels.com/photos/355321/pexels-photo-355321.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    CoverPreset {
        id: "lotus",
        name: "Flor de Lótus",
        url: "https://images.pexels.com/photos/1263986/pexels-photo-1263986.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    CoverPreset {
        id: "crystals",
        name: "Cristais Energéticos",
        url: "https://images.pexels.com/photos/1121123/pexels-photo-1121123.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    CoverPreset {
        id: "sacred",
        name: "Geometria Sagrada",
        url: "https://images.pexels.com/photos/1103970/pexels-photo-1103970.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    CoverPreset {
        id: "meditation",
        name: "Meditação",
        url: "https://images.pexels.com/photos/1051838/pexels-photo-1051838.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
];

/// Content configuration read by the composer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub introduction_text: String,
    #[serde(rename = "frequencies", alias = "items")]
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub cover_settings: CoverSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            introduction_text: DEFAULT_INTRODUCTION.to_string(),
            items: (1..=DEFAULT_ITEM_COUNT).map(CatalogItem::placeholder).collect(),
            cover_settings: CoverSettings::default(),
        }
    }
}

impl Configuration {
    /// Items selected in `session`, in catalog order.
    ///
    /// Selected ids that are not in the catalog are dropped.
    pub fn selected_items<'a>(&'a self, session: &SessionInput) -> Vec<&'a CatalogItem> {
        self.items
            .iter()
            .filter(|item| session.is_selected(item.id))
            .collect()
    }

    pub fn item(&self, id: u32) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Apply an admin edit in place.
    pub fn apply(&mut self, update: ConfigUpdate) -> ReportResult<()> {
        match update {
            ConfigUpdate::IntroductionText(text) => self.introduction_text = text,
            ConfigUpdate::Item { id, patch } => {
                let item = self
                    .items
                    .iter_mut()
                    .find(|item| item.id == id)
                    .ok_or_else(|| ReportError::validation(format!("unknown item id {id}")))?;
                patch.apply_to(item);
            }
            ConfigUpdate::CoverSettings(settings) => self.cover_settings = settings,
        }
        Ok(())
    }
}

/// Partial update of one catalog item. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `Some(None)` clears the image.
    #[serde(default)]
    pub image_url: Option<Option<String>>,
}

impl ItemPatch {
    fn apply_to(self, item: &mut CatalogItem) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(image_url) = self.image_url {
            item.image_url = image_url;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image_url.is_none()
    }
}

/// A single write against the configuration store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigUpdate {
    IntroductionText(String),
    Item { id: u32, patch: ItemPatch },
    CoverSettings(CoverSettings),
}
