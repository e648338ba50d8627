//! Strategy analysis: one generative call that turns a free-text design
//! vision into the ThemeStrategy governing every later stage of a run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{info, warn};
use ts_rs::TS;

use super::claude_api::{Synthesized, TextGenerator, extract_json};
use super::template_catalog::{ComponentType, TemplateCatalog};

const STRATEGY_MAX_TOKENS: u32 = 2048;

/// The single structured design decision for one pipeline run. Produced
/// once, immutable afterwards, and threaded into every later stage, which
/// is what keeps the generated theme coherent.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ThemeStrategy {
    pub primary_style: String,
    #[serde(default)]
    pub secondary_styles: Vec<String>,
    #[serde(default)]
    pub design_philosophy: String,
    #[serde(default)]
    pub color_narrative: String,
    #[serde(default)]
    pub component_strategy: HashMap<String, String>,
    #[serde(default)]
    pub innovation_areas: Vec<String>,
    #[serde(default)]
    pub creativity_report: String,
}

impl ThemeStrategy {
    /// Style the strategy chose for a component, if it chose one. Values
    /// that do not resolve to a catalog template are handled downstream by
    /// falling back to the component's default style.
    pub fn style_for(&self, component: ComponentType) -> Option<&str> {
        self.component_strategy
            .get(component.as_ref())
            .map(String::as_str)
    }
}

/// Site metadata woven into every prompt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SiteContext {
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub audience: String,
}

/// Optional hard constraints from the site owner, embedded verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct ThemeConstraints {
    #[serde(default)]
    pub must_include: Vec<String>,
    #[serde(default)]
    pub avoid_styles: Vec<String>,
    #[serde(default)]
    pub color_preferences: Option<String>,
}

impl ThemeConstraints {
    pub fn is_empty(&self) -> bool {
        self.must_include.is_empty()
            && self.avoid_styles.is_empty()
            && self.color_preferences.is_none()
    }
}

/// How far the run is allowed to stray from safe choices.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CreativityLevel {
    #[default]
    Standard,
    Unconstrained,
}

impl CreativityLevel {
    pub fn strategy_temperature(self) -> f32 {
        match self {
            CreativityLevel::Standard => 0.7,
            CreativityLevel::Unconstrained => 1.0,
        }
    }

    pub fn content_temperature(self) -> f32 {
        match self {
            CreativityLevel::Standard => 0.8,
            CreativityLevel::Unconstrained => 1.0,
        }
    }
}

/// Produces the ThemeStrategy for a run. Never fails: any transport or
/// contract problem yields the conservative fallback strategy instead.
pub struct StrategyAnalyzer {
    generator: Arc<dyn TextGenerator>,
}

impl StrategyAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn analyze(
        &self,
        vision: &str,
        site: &SiteContext,
        constraints: Option<&ThemeConstraints>,
        catalog: &TemplateCatalog,
        creativity: CreativityLevel,
    ) -> Synthesized<ThemeStrategy> {
        let prompt = build_strategy_prompt(vision, site, constraints, catalog, creativity);

        let response = match self
            .generator
            .generate(&prompt, creativity.strategy_temperature(), STRATEGY_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Theme strategy: generative call failed, using fallback strategy");
                return Synthesized::Fallback(fallback_strategy(site));
            }
        };

        match parse_strategy(&response) {
            Some(strategy) => {
                info!(
                    primary_style = %strategy.primary_style,
                    components = strategy.component_strategy.len(),
                    "Theme strategy: analysis complete"
                );
                Synthesized::Parsed(strategy)
            }
            None => {
                warn!(
                    response_preview = %utils::text::truncate_chars(&response, 200),
                    "Theme strategy: response violated contract, using fallback strategy"
                );
                Synthesized::Fallback(fallback_strategy(site))
            }
        }
    }
}

/// Parse a model response against the ThemeStrategy contract. `None` on any
/// violation; the caller substitutes the fallback.
pub fn parse_strategy(response: &str) -> Option<ThemeStrategy> {
    let strategy: ThemeStrategy = serde_json::from_str(extract_json(response)).ok()?;
    if strategy.primary_style.trim().is_empty() {
        return None;
    }
    Some(strategy)
}

/// The fixed conservative strategy: baseline style, neutral voice, and every
/// core component mapped to its safe default. Kept next to the contract type
/// so the two cannot drift apart.
pub fn fallback_strategy(site: &SiteContext) -> ThemeStrategy {
    ThemeStrategy {
        primary_style: "modern".to_string(),
        secondary_styles: vec!["classic".to_string()],
        design_philosophy: "Clean, legible layouts that put the content first.".to_string(),
        color_narrative: "A calm blue base with one confident accent.".to_string(),
        component_strategy: ComponentType::ALL
            .iter()
            .map(|c| (c.as_ref().to_string(), c.default_style().to_string()))
            .collect(),
        innovation_areas: Vec::new(),
        creativity_report: format!("Conservative default strategy applied for {}.", site.name),
    }
}

fn build_strategy_prompt(
    vision: &str,
    site: &SiteContext,
    constraints: Option<&ThemeConstraints>,
    catalog: &TemplateCatalog,
    creativity: CreativityLevel,
) -> String {
    let styles = catalog
        .available_styles()
        .into_iter()
        .map(|(component, names)| format!("- {}: {}", component, names.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        r#"Design a cohesive visual theme for a website from the owner's vision below.

## Vision
{vision}

## Site
Name: {name}
Industry: {industry}
Description: {description}
Audience: {audience}

## Available component styles
{styles}
"#,
        name = site.name,
        industry = site.industry,
        description = site.description,
        audience = site.audience,
    );

    if let Some(constraints) = constraints.filter(|c| !c.is_empty()) {
        prompt.push_str("\n## Constraints (must be honored exactly)\n");
        if !constraints.must_include.is_empty() {
            prompt.push_str(&format!(
                "Must include components: {}\n",
                constraints.must_include.join(", ")
            ));
        }
        if !constraints.avoid_styles.is_empty() {
            prompt.push_str(&format!(
                "Styles to avoid: {}\n",
                constraints.avoid_styles.join(", ")
            ));
        }
        if let Some(colors) = &constraints.color_preferences {
            prompt.push_str(&format!("Color preferences: {colors}\n"));
        }
    }

    if creativity == CreativityLevel::Unconstrained {
        prompt.push_str(
            "\nCreativity is unconstrained: prefer bold, unexpected pairings over safe ones, \
             and say where you took risks in creativity_report.\n",
        );
    }

    prompt.push_str(
        r#"
## Instructions
1. Pick one primary style direction and up to two supporting ones, all from the styles listed above
2. For each component type, pick the listed style that best serves the vision
3. Describe the design philosophy and the color story in two or three sentences each
4. Name the components, if any, where the theme should take a creative risk

## Output Format
Return ONLY valid JSON with this structure:
```json
{
  "primary_style": "style name",
  "secondary_styles": ["style name"],
  "design_philosophy": "What the theme is trying to feel like and why",
  "color_narrative": "The color story supporting that feeling",
  "component_strategy": {"header": "style name", "hero": "style name"},
  "innovation_areas": ["component name"],
  "creativity_report": "Where and how the theme departs from the obvious choice"
}
```
"#,
    );

    prompt
}
