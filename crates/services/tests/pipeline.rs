//! End-to-end pipeline runs against a temporary theme directory with a
//! scripted generator standing in for the Claude API.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use services::services::claude_api::{ClaudeApiError, TextGenerator};
use services::services::template_catalog::TemplateCatalog;
use services::services::theme_pipeline::{
    GenerationOutcome, SynthesisSource, ThemeSynthesisError, ThemeSynthesisPipeline,
    ThemeSynthesisRequest,
};
use services::services::theme_strategy::{CreativityLevel, SiteContext};

struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, ClaudeApiError>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(responses: Vec<Result<String, ClaudeApiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, ClaudeApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClaudeApiError::Transport("script exhausted".to_string())))
    }
}

const TEST_CATALOG: &str = r#"{
    "header": {
        "modern": {"template": "<header>{{LOGO_TEXT}}|{{CTA_BUTTON}}</header>"},
        "classic": {"template": "<header class=\"classic\">{{LOGO_TEXT}}|{{CTA_BUTTON}}</header>"}
    },
    "hero": {
        "fullscreen": {"template": "<section>{{HERO_TITLE}}</section>"}
    },
    "footer": {
        "columns": {"template": "<footer>{{COPYRIGHT}}</footer>"}
    }
}"#;

fn site() -> SiteContext {
    SiteContext {
        name: "Nexus".to_string(),
        industry: "saas".to_string(),
        description: "Deploy previews for every branch".to_string(),
        audience: "developers".to_string(),
    }
}

fn seed_theme(root: &Path) {
    std::fs::create_dir_all(root.join("ui")).unwrap();
    std::fs::create_dir_all(root.join("styles")).unwrap();
    std::fs::create_dir_all(root.join("assets/img")).unwrap();
    std::fs::write(root.join("ui/header.html"), "<header>old</header>").unwrap();
    std::fs::write(root.join("styles/theme.css"), "/* old */").unwrap();
    std::fs::write(root.join("assets/img/logo.svg"), "<svg/>").unwrap();
}

fn tree_snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(dir: &Path, base: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, base, out);
            } else {
                let rel = path
                    .strip_prefix(base)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[tokio::test]
async fn full_run_continues_past_one_failed_component() {
    utils::logging::init();

    let dir = tempfile::tempdir().unwrap();
    let theme = dir.path().join("theme");
    seed_theme(&theme);
    let pre_run = tree_snapshot(&theme);

    let strategy_response = r#"```json
{
  "primary_style": "classic",
  "secondary_styles": ["modern"],
  "design_philosophy": "Dark, confident, engineered.",
  "color_narrative": "Neon over near-black.",
  "component_strategy": {"header": "classic", "hero": "fullscreen", "footer": "brutalist"},
  "innovation_areas": ["hero"],
  "creativity_report": "Full-bleed hero."
}
```"#;

    // Component order: header, hero, footer. Hero's response breaks the
    // contract, so that component must fall back while the run continues.
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Ok(strategy_response.to_string()),
        Ok(r#"{"LOGO_TEXT": "NEXUS", "CTA_BUTTON": "Launch App"}"#.to_string()),
        Ok("not json".to_string()),
        Ok(r#"{"COPYRIGHT": "© 2099 Nexus"}"#.to_string()),
        Ok(r#"{"primary": "10 20 30", "gray": "40 50 60", "accent": "70 80 90"}"#.to_string()),
    ]));

    let pipeline = ThemeSynthesisPipeline::new(
        generator.clone(),
        TemplateCatalog::from_json(TEST_CATALOG).unwrap(),
    );

    let report = pipeline
        .run(&ThemeSynthesisRequest {
            theme_dir: theme.clone(),
            vision: "dark cyberpunk SaaS landing page".to_string(),
            site: site(),
            constraints: None,
            creativity: CreativityLevel::Standard,
        })
        .await
        .unwrap();

    // One result per component the catalog can serve, in generation order.
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.strategy_source, SynthesisSource::Generated);
    assert_eq!(report.palette_source, SynthesisSource::Generated);

    let header = &report.results[0];
    assert_eq!(header.template_style, "classic");
    assert_eq!(header.outcome, GenerationOutcome::Enhanced);

    let hero = &report.results[1];
    assert_eq!(hero.outcome, GenerationOutcome::Fallback);

    // Footer asked for a style the catalog lacks; it resolves to the
    // default style and grades standard.
    let footer = &report.results[2];
    assert_eq!(footer.template_style, "columns");
    assert_eq!(footer.outcome, GenerationOutcome::Standard);

    // Applied templates: tokens replaced, none left behind.
    let header_html = std::fs::read_to_string(theme.join("ui/header.html")).unwrap();
    assert_eq!(header_html, "<header class=\"classic\">NEXUS|Launch App</header>");

    // The failed hero still produced a file, from fallback content.
    let hero_html = std::fs::read_to_string(theme.join("ui/hero.html")).unwrap();
    assert_eq!(hero_html, "<section>Welcome to Nexus</section>");

    let css = std::fs::read_to_string(theme.join("styles/theme.css")).unwrap();
    assert!(css.contains("--primary: 10 20 30;"));
    assert!(css.contains("--accent-faint: rgb(70 80 90 / 0.12);"));

    // The backup captured the pre-run live tree, byte for byte.
    let backup_tree = tree_snapshot(Path::new(&report.backup.backup_path));
    assert_eq!(backup_tree, pre_run);

    // Strategy + 3 components + palette.
    assert_eq!(generator.calls(), 5);
}

#[tokio::test]
async fn missing_theme_dir_aborts_before_any_generation() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(ScriptedGenerator::always_failing());

    let pipeline = ThemeSynthesisPipeline::new(
        generator.clone(),
        TemplateCatalog::from_json(TEST_CATALOG).unwrap(),
    );

    let err = pipeline
        .run(&ThemeSynthesisRequest {
            theme_dir: dir.path().join("no-such-theme"),
            vision: "anything".to_string(),
            site: site(),
            constraints: None,
            creativity: CreativityLevel::Standard,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ThemeSynthesisError::ThemeDirMissing(_)));
    assert_eq!(generator.calls(), 0);
    // Nothing was created next to the missing directory either.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn total_generator_failure_still_produces_a_complete_theme() {
    let dir = tempfile::tempdir().unwrap();
    let theme = dir.path().join("theme");
    seed_theme(&theme);

    let generator = Arc::new(ScriptedGenerator::always_failing());
    let pipeline =
        ThemeSynthesisPipeline::new(generator.clone(), TemplateCatalog::embedded().unwrap());

    let report = pipeline
        .run(&ThemeSynthesisRequest {
            theme_dir: theme.clone(),
            vision: "minimalist portfolio".to_string(),
            site: site(),
            constraints: None,
            creativity: CreativityLevel::Unconstrained,
        })
        .await
        .unwrap();

    // The embedded catalog serves every core component type.
    assert_eq!(report.results.len(), 6);
    assert_eq!(report.strategy_source, SynthesisSource::Fallback);
    assert_eq!(report.palette_source, SynthesisSource::Fallback);
    assert!(
        report
            .results
            .iter()
            .all(|r| r.outcome == GenerationOutcome::Fallback)
    );

    // Fallback content still fills the templates.
    let header_html = std::fs::read_to_string(theme.join("ui/header.html")).unwrap();
    assert!(header_html.contains("Nexus"));
    assert!(header_html.contains("Get Started"));

    // Default palette lands in the stylesheet.
    let css = std::fs::read_to_string(theme.join("styles/theme.css")).unwrap();
    assert!(css.contains("--primary: 25 118 210;"));
}
