//! Persistence of finalized component source and palette-derived CSS into
//! the live theme directory. Both writers are destructive full-file
//! overwrites; the run's snapshot is the only recovery point.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use super::palette_generator::{ColorPalette, rgb_components};
use super::template_catalog::ComponentType;

/// Directory of generated component files, relative to the theme root.
pub const UI_DIR: &str = "ui";
/// Stylesheet entry point, relative to the theme root.
pub const STYLESHEET_PATH: &str = "styles/theme.css";

/// Overwrite the component's canonical file in the theme's UI directory.
pub async fn write_component(
    theme_dir: &Path,
    component: ComponentType,
    source: &str,
) -> io::Result<PathBuf> {
    let path = theme_dir.join(UI_DIR).join(component.ui_file_name());
    utils::fs::write_text(&path, source).await?;
    info!(
        component = %component,
        path = %path.display(),
        bytes = source.len(),
        "Theme writer: component written"
    );
    Ok(path)
}

/// Rewrite the theme's stylesheet entry point from the palette.
pub async fn write_stylesheet(theme_dir: &Path, palette: &ColorPalette) -> io::Result<PathBuf> {
    let path = theme_dir.join(STYLESHEET_PATH);
    utils::fs::write_text(&path, &render_stylesheet(palette)).await?;
    info!(path = %path.display(), "Theme writer: stylesheet rewritten");
    Ok(path)
}

/// CSS custom properties for the palette (each color expanded into
/// graduated opacity and shade variables) plus a small fixed set of
/// utility rules the component templates rely on.
pub fn render_stylesheet(palette: &ColorPalette) -> String {
    let mut css = String::from("/* Generated theme variables. Do not edit; regenerated on each run. */\n:root {\n");

    for (name, triple) in [
        ("primary", palette.primary.as_str()),
        ("gray", palette.gray.as_str()),
        ("accent", palette.accent.as_str()),
    ] {
        let (r, g, b) = rgb_components(triple).unwrap_or_else(|| {
            let fallback = ColorPalette::default();
            let slot = match name {
                "primary" => fallback.primary,
                "gray" => fallback.gray,
                _ => fallback.accent,
            };
            rgb_components(&slot).unwrap_or((0, 0, 0))
        });

        css.push_str(&format!("  --{name}: {r} {g} {b};\n"));
        css.push_str(&format!("  --{name}-strong: rgb({r} {g} {b} / 0.9);\n"));
        css.push_str(&format!("  --{name}-soft: rgb({r} {g} {b} / 0.35);\n"));
        css.push_str(&format!("  --{name}-faint: rgb({r} {g} {b} / 0.12);\n"));

        let (dr, dg, db) = darken(r, g, b, 0.2);
        css.push_str(&format!("  --{name}-deep: {dr} {dg} {db};\n"));
    }

    css.push_str("}\n\n");
    css.push_str(UTILITY_RULES);
    css
}

fn darken(r: u8, g: u8, b: u8, amount: f32) -> (u8, u8, u8) {
    let scale = |c: u8| (c as f32 * (1.0 - amount)) as u8;
    (scale(r), scale(g), scale(b))
}

const UTILITY_RULES: &str = r#"body {
  color: rgb(var(--gray));
  background: #ffffff;
}

a {
  color: rgb(var(--primary));
}

.btn-primary {
  background: rgb(var(--primary));
  color: #ffffff;
}

.btn-primary:hover {
  background: rgb(var(--primary-deep));
}

.btn-ghost {
  color: rgb(var(--primary));
  border: 1px solid var(--primary-soft);
}

.accent {
  color: rgb(var(--accent));
}

.surface {
  background: var(--gray-faint);
}
"#;
