//! Office document creation
//!
//! Generated text is split into sections, slides or rows and handed to the
//! Word, PowerPoint or Excel automation interface as a JSON payload. Hosts
//! without Office get a plain text file instead. Either way the file is
//! opened for the user afterwards.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform::{Platform, SharedDesktop};
use super::scripts;
use super::AutomationError;
use crate::intent::DocumentKind;

const MAX_TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Slide {
    pub title: String,
    pub bullets: Vec<String>,
}

fn clean_line(line: &str) -> &str {
    line.trim().trim_matches('*').trim()
}

/// `## Heading` lines start a section, other blocks become paragraphs
pub fn parse_sections(text: &str) -> Vec<Section> {
    let mut sections = vec![Section::default()];
    let mut paragraph = String::new();

    let flush = |paragraph: &mut String, sections: &mut Vec<Section>| {
        if !paragraph.trim().is_empty() {
            if let Some(section) = sections.last_mut() {
                section.paragraphs.push(paragraph.trim().to_string());
            }
        }
        paragraph.clear();
    };

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            flush(&mut paragraph, &mut sections);
            sections.push(Section {
                heading: Some(clean_line(trimmed.trim_start_matches('#')).to_string()),
                paragraphs: Vec::new(),
            });
        } else if trimmed.is_empty() {
            flush(&mut paragraph, &mut sections);
        } else {
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(clean_line(trimmed));
        }
    }
    flush(&mut paragraph, &mut sections);

    sections.retain(|s| s.heading.is_some() || !s.paragraphs.is_empty());
    sections
}

/// `[Slide Title]` lines start a slide, `- point` lines are bullets
pub fn parse_slides(text: &str) -> Vec<Slide> {
    let mut slides: Vec<Slide> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            slides.push(Slide {
                title: clean_line(&trimmed[1..trimmed.len() - 1]).to_string(),
                bullets: Vec::new(),
            });
            continue;
        }

        let bullet = trimmed.trim_start_matches(['-', '*', '•']).trim();
        match slides.last_mut() {
            Some(slide) => slide.bullets.push(clean_line(bullet).to_string()),
            None => slides.push(Slide {
                title: clean_line(bullet).to_string(),
                bullets: Vec::new(),
            }),
        }
    }

    slides
}

/// `a|b|c` rows; markdown table borders and separator rows are dropped
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.trim().trim_matches('|'))
        .filter(|line| line.contains('|') || (!line.is_empty() && !line.starts_with('-')))
        .filter(|line| !line.chars().all(|c| matches!(c, '-' | '|' | ':' | ' ')))
        .map(|line| line.split('|').map(|cell| cell.trim().to_string()).collect())
        .collect()
}

/// File-name-safe title, at most 50 characters
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

pub fn file_name(kind: DocumentKind, title: &str, millis: i64, office: bool) -> String {
    let mut stem = sanitize_title(title);
    if stem.is_empty() {
        stem = kind.label().to_string();
    }
    let extension = if office { kind.extension() } else { kind.text_extension() };
    format!("{}_{}.{}", stem, millis, extension)
}

fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Plain text rendering for hosts without Office
pub fn render_text(kind: DocumentKind, title: &str, content: &str) -> String {
    match kind {
        DocumentKind::Document => {
            let mut out = format!("# {}\n", title);
            for section in parse_sections(content) {
                if let Some(heading) = section.heading {
                    out.push_str(&format!("\n## {}\n", heading));
                }
                for paragraph in section.paragraphs {
                    out.push_str(&format!("\n{}\n", paragraph));
                }
            }
            out
        }
        DocumentKind::Presentation => {
            let mut out = format!("# {}\n", title);
            for slide in parse_slides(content) {
                out.push_str(&format!("\n---\n\n## {}\n\n", slide.title));
                for bullet in slide.bullets {
                    out.push_str(&format!("- {}\n", bullet));
                }
            }
            out
        }
        DocumentKind::Spreadsheet => parse_rows(content)
            .iter()
            .map(|row| row.iter().map(|c| csv_cell(c)).collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn payload(kind: DocumentKind, title: &str, content: &str) -> serde_json::Value {
    match kind {
        DocumentKind::Document => serde_json::json!({"title": title, "sections": parse_sections(content)}),
        DocumentKind::Presentation => serde_json::json!({"title": title, "slides": parse_slides(content)}),
        DocumentKind::Spreadsheet => serde_json::json!({"title": title, "rows": parse_rows(content)}),
    }
}

fn file_error(path: &Path, e: impl ToString) -> AutomationError {
    AutomationError::File {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

pub struct DocumentWriter {
    desktop: SharedDesktop,
    output_dir: PathBuf,
    script_timeout: Duration,
}

impl DocumentWriter {
    pub fn new(desktop: SharedDesktop, output_dir: PathBuf, script_timeout: Duration) -> Self {
        Self {
            desktop,
            output_dir,
            script_timeout,
        }
    }

    /// Write the document, open it and return its path
    pub async fn create(&self, kind: DocumentKind, title: &str, content: &str) -> Result<PathBuf, AutomationError> {
        let millis = chrono::Utc::now().timestamp_millis();
        let platform = self.desktop.platform();
        let office = platform == Platform::Windows;
        let path = self.output_dir.join(file_name(kind, title, millis, office));

        log::info!("Creating {} '{}' at {}", kind.label(), title, path.display());

        if office {
            self.create_with_office(kind, title, content, &path).await?;
            self.desktop
                .run_script(&scripts::start_program(&path.to_string_lossy()), self.script_timeout)
                .await?;
        } else {
            tokio::fs::write(&path, render_text(kind, title, content))
                .await
                .map_err(|e| file_error(&path, e))?;

            let opener = if platform == Platform::MacOs { "open" } else { "xdg-open" };
            if let Err(e) = self
                .desktop
                .launch(opener, &[path.to_string_lossy().to_string()])
                .await
            {
                log::warn!("Created {} but could not open it: {}", path.display(), e);
            }
        }

        Ok(path)
    }

    async fn create_with_office(
        &self,
        kind: DocumentKind,
        title: &str,
        content: &str,
        path: &Path,
    ) -> Result<(), AutomationError> {
        let payload_path = self
            .output_dir
            .join(format!("listenos-doc-{}.json", uuid::Uuid::new_v4()));
        let body = serde_json::to_vec(&payload(kind, title, content)).map_err(|e| file_error(&payload_path, e))?;
        tokio::fs::write(&payload_path, body)
            .await
            .map_err(|e| file_error(&payload_path, e))?;

        let payload_str = payload_path.to_string_lossy();
        let output_str = path.to_string_lossy();
        let script = match kind {
            DocumentKind::Document => scripts::word_document(&payload_str, &output_str),
            DocumentKind::Presentation => scripts::powerpoint_presentation(&payload_str, &output_str),
            DocumentKind::Spreadsheet => scripts::excel_workbook(&payload_str, &output_str),
        };

        // Office cold starts are slow
        let result = self.desktop.run_script(&script, self.script_timeout * 2).await;

        if let Err(e) = tokio::fs::remove_file(&payload_path).await {
            log::debug!("Could not remove {}: {}", payload_path.display(), e);
        }

        let output = result?;
        if output.contains(scripts::DOCUMENT_SAVED) {
            Ok(())
        } else {
            Err(AutomationError::Script(format!(
                "{} automation did not save the file: {}",
                kind.app(),
                output.stderr.trim()
            )))
        }
    }
}
