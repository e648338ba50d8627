//! Component template catalog, placeholder extraction and substitution.
//!
//! Templates are keyed by `(component type, style name)` and contain
//! `{{NAME}}` placeholder tokens. The default catalog ships embedded in the
//! binary; tests and callers can load their own from JSON of the same shape:
//! `{ "<type>": { "<style>": { "template": "..." } } }`.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

/// Content synthesized for one component: placeholder name to text.
pub type ContentMap = HashMap<String, String>;

/// The UI component categories the pipeline knows how to generate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentType {
    Header,
    Hero,
    Features,
    Testimonials,
    Cta,
    Footer,
}

impl ComponentType {
    /// Generation order for a full run.
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Header,
        ComponentType::Hero,
        ComponentType::Features,
        ComponentType::Testimonials,
        ComponentType::Cta,
        ComponentType::Footer,
    ];

    /// The safe style guaranteed to exist in the embedded catalog.
    pub fn default_style(self) -> &'static str {
        match self {
            ComponentType::Header => "modern",
            ComponentType::Hero => "fullscreen",
            ComponentType::Features => "grid",
            ComponentType::Testimonials => "cards",
            ComponentType::Cta => "banner",
            ComponentType::Footer => "columns",
        }
    }

    /// Canonical file name inside the theme's UI directory.
    pub fn ui_file_name(self) -> &'static str {
        match self {
            ComponentType::Header => "header.html",
            ComponentType::Hero => "hero.html",
            ComponentType::Features => "features.html",
            ComponentType::Testimonials => "testimonials.html",
            ComponentType::Cta => "cta.html",
            ComponentType::Footer => "footer.html",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TemplateEntry {
    template: String,
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

#[derive(Debug, Error)]
pub enum TemplateCatalogError {
    #[error("embedded catalog asset missing: {0}")]
    MissingAsset(&'static str),
    #[error("catalog asset is not utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only mapping from `(component type, style name)` to template source.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<String, HashMap<String, TemplateEntry>>,
}

impl TemplateCatalog {
    /// The catalog shipped with the binary.
    pub fn embedded() -> Result<Self, TemplateCatalogError> {
        let asset = Assets::get("templates.json")
            .ok_or(TemplateCatalogError::MissingAsset("templates.json"))?;
        Self::from_json(std::str::from_utf8(asset.data.as_ref())?)
    }

    pub fn from_json(json: &str) -> Result<Self, TemplateCatalogError> {
        Ok(Self {
            templates: serde_json::from_str(json)?,
        })
    }

    /// Template source for an exact `(type, style)` pair, if present.
    pub fn template(&self, component: ComponentType, style: &str) -> Option<&str> {
        self.templates
            .get(component.as_ref())?
            .get(style)
            .map(|entry| entry.template.as_str())
    }

    /// Resolve a requested style to a usable `(style, template)` pair,
    /// falling back to the component's default style. `None` means the
    /// catalog holds nothing for this component at all: a soft miss the
    /// caller logs and skips.
    pub fn resolve<'a>(
        &'a self,
        component: ComponentType,
        requested: &'a str,
    ) -> Option<(&'a str, &'a str)> {
        if let Some(template) = self.template(component, requested) {
            return Some((requested, template));
        }
        let default = component.default_style();
        self.template(component, default)
            .map(|template| (default, template))
    }

    /// Style names per component type, sorted for stable prompt text.
    pub fn available_styles(&self) -> BTreeMap<String, Vec<String>> {
        self.templates
            .iter()
            .map(|(component, styles)| {
                let mut names: Vec<String> = styles.keys().cloned().collect();
                names.sort();
                (component.clone(), names)
            })
            .collect()
    }
}

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder regex"));

/// Unique `{{NAME}}` tokens in a template, in order of first appearance.
/// Recomputed per template; templates can change between invocations.
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for capture in PLACEHOLDER_RE.captures_iter(template) {
        let name = &capture[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Replace every `{{NAME}}` occurrence with its mapped value. Extra map keys
/// are ignored; placeholders absent from the map stay in the output as
/// literal tokens, which is the visible signal that content was incomplete.
pub fn apply_template(template: &str, content: &ContentMap) -> String {
    let mut out = template.to_string();
    for (name, value) in content {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}
