//! Theme-wide palette generation: a second, narrower generative call driven
//! only by the ThemeStrategy, so colors stay global rather than
//! component-local.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use super::claude_api::{Synthesized, TextGenerator, extract_json};
use super::theme_strategy::ThemeStrategy;

const PALETTE_MAX_TOKENS: u32 = 256;
const PALETTE_TEMPERATURE: f32 = 0.4;

/// Three theme colors, each an `"R G B"` decimal triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ColorPalette {
    pub primary: String,
    pub gray: String,
    pub accent: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        // Neutral blue baseline.
        Self {
            primary: "25 118 210".to_string(),
            gray: "71 85 105".to_string(),
            accent: "59 130 246".to_string(),
        }
    }
}

/// Split an `"R G B"` triple into its components. `None` when the string is
/// not exactly three decimal bytes.
pub fn rgb_components(triple: &str) -> Option<(u8, u8, u8)> {
    let mut parts = triple.split_whitespace();
    let r = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((r, g, b))
}

/// Proposes the run's palette. Never fails: any transport or contract
/// problem yields the fixed default palette.
pub struct PaletteGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl PaletteGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate(&self, strategy: &ThemeStrategy) -> Synthesized<ColorPalette> {
        let prompt = build_palette_prompt(strategy);

        let response = match self
            .generator
            .generate(&prompt, PALETTE_TEMPERATURE, PALETTE_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Theme palette: generative call failed, using default palette");
                return Synthesized::Fallback(ColorPalette::default());
            }
        };

        match parse_palette(&response) {
            Some(palette) => Synthesized::Parsed(palette),
            None => {
                warn!(
                    response_preview = %utils::text::truncate_chars(&response, 200),
                    "Theme palette: response violated contract, using default palette"
                );
                Synthesized::Fallback(ColorPalette::default())
            }
        }
    }
}

/// Parse and validate a palette response. Triples are normalized to single
/// spaces; any malformed triple rejects the whole palette.
pub fn parse_palette(response: &str) -> Option<ColorPalette> {
    let palette: ColorPalette = serde_json::from_str(extract_json(response)).ok()?;
    Some(ColorPalette {
        primary: normalize_triple(&palette.primary)?,
        gray: normalize_triple(&palette.gray)?,
        accent: normalize_triple(&palette.accent)?,
    })
}

fn normalize_triple(triple: &str) -> Option<String> {
    let (r, g, b) = rgb_components(triple)?;
    Some(format!("{r} {g} {b}"))
}

fn build_palette_prompt(strategy: &ThemeStrategy) -> String {
    format!(
        r#"Choose the three core colors for a website theme.

## Theme direction
Primary style: {primary_style}
Philosophy: {philosophy}
Color story: {narrative}

## Requirements
1. "primary": the brand color, carrying the emotional weight of the philosophy
2. "gray": a neutral for body text, readable on white (WCAG AA contrast)
3. "accent": a contrasting highlight that still harmonizes with the primary
4. Each color is a space-separated decimal RGB triple, e.g. "25 118 210"

## Output Format
Return ONLY valid JSON:
```json
{{"primary": "R G B", "gray": "R G B", "accent": "R G B"}}
```
"#,
        primary_style = strategy.primary_style,
        philosophy = strategy.design_philosophy,
        narrative = strategy.color_narrative,
    )
}
