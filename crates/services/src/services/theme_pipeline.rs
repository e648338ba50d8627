//! The theme-synthesis pipeline: backup, strategy, per-component
//! generation, palette, report.
//!
//! One logical run per invocation, strictly sequential. A component whose
//! synthesis fails falls back locally and the loop continues; the only
//! aborts are a failed backup (before any mutation) and unrecoverable I/O
//! while writing. Callers serialize runs against the same theme path.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::claude_api::{ClaudeApiClient, ClaudeApiError, TextGenerator};
use super::content_synthesizer::ContentSynthesizer;
use super::palette_generator::{ColorPalette, PaletteGenerator};
use super::template_catalog::{
    ComponentType, TemplateCatalog, TemplateCatalogError, apply_template,
};
use super::theme_backup::{self, BackupRecord};
use super::theme_strategy::{
    CreativityLevel, SiteContext, StrategyAnalyzer, ThemeConstraints, ThemeStrategy,
};
use super::theme_writer;

#[derive(Debug, Error)]
pub enum ThemeSynthesisError {
    #[error("theme directory not found: {0}")]
    ThemeDirMissing(String),
    #[error("backup failed before mutation: {0}")]
    Backup(#[source] std::io::Error),
    #[error("write failed for {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template catalog error: {0}")]
    Catalog(#[from] TemplateCatalogError),
    #[error("claude api error: {0}")]
    Api(#[from] ClaudeApiError),
}

/// Stages of one run, in order. `Aborted` is terminal and reachable only
/// from `BackingUp` or from a write failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PipelineStage {
    Idle,
    BackingUp,
    Strategizing,
    Generating,
    Coloring,
    Done,
    Aborted,
}

/// What a stage-local generative failure does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    Abort,
    Continue,
}

impl PipelineStage {
    /// Policy for failures local to the stage's own work. Write I/O errors
    /// are fatal in every stage regardless of this policy: once the live
    /// directory may be inconsistent, only the backup is trustworthy.
    pub fn error_policy(self) -> ErrorPolicy {
        match self {
            PipelineStage::BackingUp => ErrorPolicy::Abort,
            PipelineStage::Strategizing
            | PipelineStage::Generating
            | PipelineStage::Coloring => ErrorPolicy::Continue,
            PipelineStage::Idle | PipelineStage::Done | PipelineStage::Aborted => {
                ErrorPolicy::Continue
            }
        }
    }
}

/// How one component's generation went.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationOutcome {
    Standard,
    Enhanced,
    Experimental,
    Fallback,
}

/// Per-component entry in the final report. Never discarded, even when the
/// component fell back.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct GenerationResult {
    pub component: ComponentType,
    pub template_style: String,
    pub outcome: GenerationOutcome,
}

/// Whether a stage's value came from the model or from its fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SynthesisSource {
    Generated,
    Fallback,
}

/// Input for one run. The live theme path travels explicitly with the
/// request so runs are composable and tests can point at a temp directory.
#[derive(Debug, Clone)]
pub struct ThemeSynthesisRequest {
    pub theme_dir: PathBuf,
    pub vision: String,
    pub site: SiteContext,
    pub constraints: Option<ThemeConstraints>,
    pub creativity: CreativityLevel,
}

/// Terminal output of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ThemeSynthesisReport {
    pub run_id: Uuid,
    pub strategy: ThemeStrategy,
    pub strategy_source: SynthesisSource,
    pub results: Vec<GenerationResult>,
    pub palette: ColorPalette,
    pub palette_source: SynthesisSource,
    pub backup: BackupRecord,
}

/// Orchestrates one theme-synthesis run.
pub struct ThemeSynthesisPipeline {
    generator: Arc<dyn TextGenerator>,
    catalog: TemplateCatalog,
}

impl ThemeSynthesisPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, catalog: TemplateCatalog) -> Self {
        Self { generator, catalog }
    }

    /// Real client from `ANTHROPIC_API_KEY` plus the embedded catalog.
    pub fn from_env() -> Result<Self, ThemeSynthesisError> {
        Ok(Self::new(
            Arc::new(ClaudeApiClient::from_env()?),
            TemplateCatalog::embedded()?,
        ))
    }

    pub async fn run(
        &self,
        request: &ThemeSynthesisRequest,
    ) -> Result<ThemeSynthesisReport, ThemeSynthesisError> {
        let run_id = Uuid::new_v4();
        let mut stage = PipelineStage::Idle;

        info!(
            run_id = %run_id,
            theme_dir = %request.theme_dir.display(),
            creativity = %request.creativity,
            "Theme synthesis: starting run"
        );

        // Snapshot first. Nothing may touch the live directory until the
        // copy has fully completed.
        advance(&mut stage, PipelineStage::BackingUp, run_id);
        if !request.theme_dir.is_dir() {
            return Err(ThemeSynthesisError::ThemeDirMissing(
                request.theme_dir.display().to_string(),
            ));
        }
        let backup = theme_backup::snapshot(&request.theme_dir, run_id)
            .await
            .map_err(ThemeSynthesisError::Backup)?;

        advance(&mut stage, PipelineStage::Strategizing, run_id);
        let strategy_outcome = StrategyAnalyzer::new(self.generator.clone())
            .analyze(
                &request.vision,
                &request.site,
                request.constraints.as_ref(),
                &self.catalog,
                request.creativity,
            )
            .await;
        let strategy_source = source_of(strategy_outcome.is_fallback());
        let strategy = strategy_outcome.into_value();

        advance(&mut stage, PipelineStage::Generating, run_id);
        let synthesizer = ContentSynthesizer::new(self.generator.clone());
        let mut results = Vec::new();

        for component in ComponentType::ALL {
            let requested = strategy
                .style_for(component)
                .unwrap_or_else(|| component.default_style());

            let Some((style, template)) = self.catalog.resolve(component, requested) else {
                warn!(
                    component = %component,
                    requested_style = requested,
                    "Theme synthesis: no template for component, skipping"
                );
                continue;
            };

            let content_outcome = synthesizer
                .synthesize(
                    component,
                    style,
                    &strategy,
                    template,
                    &request.site,
                    request.creativity,
                )
                .await;

            let rendered = apply_template(template, content_outcome.value());
            let path = theme_writer::write_component(&request.theme_dir, component, &rendered)
                .await
                .map_err(|source| ThemeSynthesisError::Write {
                    path: request
                        .theme_dir
                        .join(theme_writer::UI_DIR)
                        .join(component.ui_file_name())
                        .display()
                        .to_string(),
                    source,
                })?;

            let outcome = grade_outcome(component, style, &strategy, content_outcome.is_fallback());
            info!(
                component = %component,
                style = %style,
                outcome = %outcome,
                path = %path.display(),
                "Theme synthesis: component generated"
            );
            results.push(GenerationResult {
                component,
                template_style: style.to_string(),
                outcome,
            });
        }

        advance(&mut stage, PipelineStage::Coloring, run_id);
        let palette_outcome = PaletteGenerator::new(self.generator.clone())
            .generate(&strategy)
            .await;
        let palette_source = source_of(palette_outcome.is_fallback());
        let palette = palette_outcome.into_value();

        theme_writer::write_stylesheet(&request.theme_dir, &palette)
            .await
            .map_err(|source| ThemeSynthesisError::Write {
                path: request
                    .theme_dir
                    .join(theme_writer::STYLESHEET_PATH)
                    .display()
                    .to_string(),
                source,
            })?;

        advance(&mut stage, PipelineStage::Done, run_id);
        info!(
            run_id = %run_id,
            components = results.len(),
            fallbacks = results
                .iter()
                .filter(|r| r.outcome == GenerationOutcome::Fallback)
                .count(),
            strategy_source = %strategy_source,
            palette_source = %palette_source,
            "Theme synthesis: run complete"
        );

        Ok(ThemeSynthesisReport {
            run_id,
            strategy,
            strategy_source,
            results,
            palette,
            palette_source,
            backup,
        })
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage, run_id: Uuid) {
    debug!(run_id = %run_id, from = %stage, to = %next, "Theme synthesis: stage transition");
    *stage = next;
}

fn source_of(fell_back: bool) -> SynthesisSource {
    if fell_back {
        SynthesisSource::Fallback
    } else {
        SynthesisSource::Generated
    }
}

/// Grade a successfully generated component. Fallback content always grades
/// `fallback`; otherwise the strategy's innovation areas and its choice of a
/// non-default style decide between `experimental`, `enhanced` and
/// `standard`.
fn grade_outcome(
    component: ComponentType,
    style: &str,
    strategy: &ThemeStrategy,
    content_fell_back: bool,
) -> GenerationOutcome {
    if content_fell_back {
        return GenerationOutcome::Fallback;
    }
    let name = component.as_ref();
    if strategy
        .innovation_areas
        .iter()
        .any(|area| area.to_lowercase().contains(name))
    {
        return GenerationOutcome::Experimental;
    }
    if style != component.default_style() {
        return GenerationOutcome::Enhanced;
    }
    GenerationOutcome::Standard
}
