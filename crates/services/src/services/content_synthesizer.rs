//! Per-component content synthesis: fills a template's placeholders in the
//! voice of the run's ThemeStrategy.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::claude_api::{Synthesized, TextGenerator, extract_json};
use super::template_catalog::{ComponentType, ContentMap, extract_placeholders};
use super::theme_strategy::{CreativityLevel, SiteContext, ThemeStrategy};

const CONTENT_MAX_TOKENS: u32 = 1024;

/// Fills one component's placeholders. Never fails: transport or contract
/// problems yield the deterministic fallback ContentMap, so every
/// placeholder always has some value.
pub struct ContentSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl ContentSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn synthesize(
        &self,
        component: ComponentType,
        style: &str,
        strategy: &ThemeStrategy,
        template_source: &str,
        site: &SiteContext,
        creativity: CreativityLevel,
    ) -> Synthesized<ContentMap> {
        let placeholders = extract_placeholders(template_source);
        if placeholders.is_empty() {
            debug!(component = %component, "Theme content: template has no placeholders");
            return Synthesized::Parsed(ContentMap::new());
        }

        let prompt = build_content_prompt(component, style, strategy, &placeholders, site);

        let response = match self
            .generator
            .generate(&prompt, creativity.content_temperature(), CONTENT_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    component = %component,
                    error = %e,
                    "Theme content: generative call failed, using fallback content"
                );
                return Synthesized::Fallback(fallback_content(&placeholders, site));
            }
        };

        match parse_content(&response) {
            Some(content) => Synthesized::Parsed(content),
            None => {
                warn!(
                    component = %component,
                    response_preview = %utils::text::truncate_chars(&response, 200),
                    "Theme content: response violated contract, using fallback content"
                );
                Synthesized::Fallback(fallback_content(&placeholders, site))
            }
        }
    }
}

/// Lenient parse of a content response: a JSON object whose scalar values
/// are stringified. Nested values are dropped (their placeholders then stay
/// literal in the output, which is the documented degradation signal).
pub fn parse_content(response: &str) -> Option<ContentMap> {
    let value: Value = serde_json::from_str(extract_json(response)).ok()?;
    let object = value.as_object()?;

    let mut content = ContentMap::new();
    for (key, value) in object {
        match value {
            Value::String(s) => {
                content.insert(key.clone(), s.clone());
            }
            Value::Number(n) => {
                content.insert(key.clone(), n.to_string());
            }
            Value::Bool(b) => {
                content.insert(key.clone(), b.to_string());
            }
            _ => {}
        }
    }
    Some(content)
}

/// Deterministic defaults: conventional text for well-known placeholder
/// names, a humanized form of the name for everything else.
pub fn fallback_content(placeholders: &[String], site: &SiteContext) -> ContentMap {
    placeholders
        .iter()
        .map(|name| (name.clone(), default_placeholder_value(name, site)))
        .collect()
}

fn default_placeholder_value(name: &str, site: &SiteContext) -> String {
    match name {
        "LOGO_TEXT" | "SITE_NAME" | "BRAND_NAME" => site.name.clone(),
        "CTA_BUTTON" | "CTA_PRIMARY" | "CTA_TEXT" => "Get Started".to_string(),
        "CTA_SECONDARY" => "Learn More".to_string(),
        "HERO_TITLE" | "HEADLINE" => format!("Welcome to {}", site.name),
        "HERO_SUBTITLE" | "TAGLINE" => {
            if site.description.is_empty() {
                "Everything you need, in one place.".to_string()
            } else {
                site.description.clone()
            }
        }
        "FOOTER_TEXT" => format!("{}, built for {}.", site.name, site.audience),
        "COPYRIGHT" => format!("© {} {}", Utc::now().year(), site.name),
        other => utils::text::humanize_token(other),
    }
}

fn build_content_prompt(
    component: ComponentType,
    style: &str,
    strategy: &ThemeStrategy,
    placeholders: &[String],
    site: &SiteContext,
) -> String {
    let placeholder_list = placeholders
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Write the copy for the {component} component of {name}'s website, in the "{style}" style.

## Theme direction (stay consistent with this voice)
Philosophy: {philosophy}
Color story: {narrative}

## Site
Name: {name}
Industry: {industry}
Audience: {audience}

## Placeholders to fill
{placeholder_list}

## Tone
Every value should earn its place. Boring: "Welcome to our website". Compelling: "Ship your ideas before your coffee cools". Boring: "Click here". Compelling: "Start building free". Short beats clever; specific beats short.

## Output Format
Return ONLY a valid JSON object mapping every placeholder name to its text:
```json
{{"PLACEHOLDER_NAME": "text"}}
```
"#,
        philosophy = strategy.design_philosophy,
        narrative = strategy.color_narrative,
        name = site.name,
        industry = site.industry,
        audience = site.audience,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteContext {
        SiteContext {
            name: "Nexus".to_string(),
            industry: "saas".to_string(),
            description: "Deploy previews for every branch".to_string(),
            audience: "developers".to_string(),
        }
    }

    #[test]
    fn parses_fenced_content_object() {
        let response = "```json\n{\"LOGO_TEXT\": \"NEXUS\", \"CTA_BUTTON\": \"Launch App\"}\n```";
        let content = parse_content(response).unwrap();
        assert_eq!(content["LOGO_TEXT"], "NEXUS");
        assert_eq!(content["CTA_BUTTON"], "Launch App");
    }

    #[test]
    fn stringifies_scalars_and_drops_nested_values() {
        let response = r#"{"COUNT": 3, "ENABLED": true, "NESTED": {"a": 1}, "LIST": []}"#;
        let content = parse_content(response).unwrap();
        assert_eq!(content["COUNT"], "3");
        assert_eq!(content["ENABLED"], "true");
        assert!(!content.contains_key("NESTED"));
        assert!(!content.contains_key("LIST"));
    }

    #[test]
    fn rejects_non_object_responses() {
        assert!(parse_content("not json").is_none());
        assert!(parse_content(r#""just a string""#).is_none());
        assert!(parse_content("[1, 2, 3]").is_none());
    }

    #[test]
    fn fallback_fills_every_placeholder() {
        let placeholders = vec![
            "LOGO_TEXT".to_string(),
            "CTA_BUTTON".to_string(),
            "SOME_CUSTOM_FIELD".to_string(),
        ];

        let content = fallback_content(&placeholders, &site());

        assert_eq!(content.len(), 3);
        assert_eq!(content["LOGO_TEXT"], "Nexus");
        assert_eq!(content["CTA_BUTTON"], "Get Started");
        assert_eq!(content["SOME_CUSTOM_FIELD"], "some custom field");
    }

    #[test]
    fn fallback_uses_site_description_for_subtitle() {
        let content = fallback_content(&["HERO_SUBTITLE".to_string()], &site());
        assert_eq!(content["HERO_SUBTITLE"], "Deploy previews for every branch");

        let mut bare = site();
        bare.description.clear();
        let content = fallback_content(&["HERO_SUBTITLE".to_string()], &bare);
        assert_eq!(content["HERO_SUBTITLE"], "Everything you need, in one place.");
    }

    #[test]
    fn prompt_lists_placeholders_and_strategy_voice() {
        let strategy = ThemeStrategy {
            primary_style: "modern".to_string(),
            secondary_styles: vec![],
            design_philosophy: "Dark, confident, engineered.".to_string(),
            color_narrative: "Neon over near-black.".to_string(),
            component_strategy: Default::default(),
            innovation_areas: vec![],
            creativity_report: String::new(),
        };
        let placeholders = vec!["LOGO_TEXT".to_string(), "CTA_BUTTON".to_string()];

        let prompt = build_content_prompt(
            ComponentType::Header,
            "modern",
            &strategy,
            &placeholders,
            &site(),
        );

        assert!(prompt.contains("header component"));
        assert!(prompt.contains("Dark, confident, engineered."));
        assert!(prompt.contains("- LOGO_TEXT"));
        assert!(prompt.contains("- CTA_BUTTON"));
        assert!(prompt.contains("Boring:"));
    }
}
