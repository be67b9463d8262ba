//! Output formatters: console, JSON, and Markdown

use crate::config::OutputFormat;
use crate::error::{RelevanceError, Result};
use crate::output::report::*;
use crate::processing::analyzer::FeedbackStatus;
use crate::storage::StoredAnalysis;
use colored::{Color, Colorize};
use std::path::Path;

const BAR_WIDTH: usize = 30;

pub trait OutputFormatter {
    fn format_report(&self, report: &RelevanceReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Colored terminal output with score bars
pub struct ConsoleFormatter {
    use_colors: bool,
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct MarkdownFormatter {
    include_metadata: bool,
}

/// Picks the formatter for an `OutputFormat`
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
}

fn verdict_color(verdict: &str) -> Color {
    match verdict {
        "High Suitability" => Color::Green,
        "Medium Suitability" => Color::Yellow,
        _ => Color::Red,
    }
}

fn score_color(score: f64) -> Color {
    if score >= 75.0 {
        Color::Green
    } else if score >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_bar(&self, score: f64) -> String {
        let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
        self.colorize(&bar, score_color(score))
    }

    fn format_skill_list(&self, skills: &[String], color: Color, empty: &str) -> String {
        if skills.is_empty() {
            return format!("  {}\n", empty);
        }
        skills
            .iter()
            .map(|skill| format!("  • {}\n", self.colorize(skill, color)))
            .collect()
    }

    /// Dashboard table of stored analyses
    pub fn format_history(&self, entries: &[StoredAnalysis]) -> String {
        let mut output = self.format_header("Analysis History", 1);

        if entries.is_empty() {
            output.push_str("No analyses stored yet. Run `resume-relevance analyze` first.\n");
            return output;
        }

        output.push_str(&format!(
            "{:>5}  {:<19}  {:<28}  {:<28}  {:>7}  {}\n",
            "ID", "Date", "Resume", "Job", "Score", "Verdict"
        ));
        output.push_str(&format!("{}\n", "─".repeat(110)));

        for entry in entries {
            let result = &entry.result;
            let verdict = result.verdict.label();
            output.push_str(&format!(
                "{:>5}  {:<19}  {:<28}  {:<28}  {:>6.2}%  {}\n",
                entry.id,
                result.created_at.format("%Y-%m-%d %H:%M:%S"),
                truncate(&result.resume_name, 28),
                truncate(&result.job_name, 28),
                result.final_score,
                self.colorize(verdict, verdict_color(verdict)),
            ));
        }

        output.push_str(&format!("\n{} stored analyses\n", entries.len()));
        output
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &RelevanceReport) -> Result<String> {
        let mut output = String::new();
        let meta = &report.metadata;

        output.push_str(&self.format_header("📊 RESUME RELEVANCE ANALYSIS", 1));
        output.push_str(&format!("Resume: {} | Job: {}\n", meta.resume_name, meta.job_name));
        output.push_str(&format!(
            "Generated: {}",
            meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(ms) = meta.processing_time_ms {
            output.push_str(&format!(" | Processing time: {}ms", ms));
        }
        if let Some(id) = meta.stored_id {
            output.push_str(&format!(" | Stored as #{}", id));
        }
        output.push('\n');

        output.push_str(&self.format_header("Summary", 2));
        let summary = &report.summary;
        output.push_str(&format!(
            "Final Score: {} {}\n",
            self.colorize(&format!("{:.2}%", summary.final_score), score_color(summary.final_score)),
            self.format_score_bar(summary.final_score)
        ));
        output.push_str(&format!(
            "Verdict: {}\n",
            self.colorize(&summary.verdict, verdict_color(&summary.verdict))
        ));
        output.push_str(&format!("{}\n", summary.verdict_reason));

        if let Some(breakdown) = &report.score_breakdown {
            output.push_str(&self.format_header("Score Breakdown", 3));
            output.push_str(&format!(
                "🔍 Keyword Match:  {:>6.2}% {} (weight: {:.0}%)\n",
                breakdown.hard_match_score,
                self.format_score_bar(breakdown.hard_match_score),
                breakdown.weights.hard_match * 100.0
            ));
            output.push_str(&format!(
                "🎯 Semantic Match: {:>6.2}% {} (weight: {:.0}%)\n",
                breakdown.semantic_score,
                self.format_score_bar(breakdown.semantic_score),
                breakdown.weights.semantic * 100.0
            ));
        }

        output.push_str(&self.format_header("✅ Matching Skills", 3));
        output.push_str(&self.format_skill_list(
            &report.skills.matched,
            Color::Green,
            "None of the job's listed skills were found.",
        ));

        output.push_str(&self.format_header("🎯 Missing Skills", 3));
        output.push_str(&self.format_skill_list(
            &report.skills.missing,
            Color::Red,
            "No missing skills. Great job!",
        ));

        output.push_str(&self.format_header("🤖 Personalized Feedback", 2));
        if let Some(model) = &report.feedback.model {
            output.push_str(&format!("Model: {}\n", model));
        }
        match report.feedback.status {
            Some(FeedbackStatus::Failed) => {
                output.push_str(&format!(
                    "{}\n",
                    self.colorize(&report.feedback.text, Color::Yellow)
                ));
                if let Some(error) = &report.feedback.error {
                    output.push_str(&format!("Reason: {}\n", error));
                }
            }
            _ => output.push_str(&format!("{}\n", report.feedback.text.trim())),
        }

        if let Some(model) = &meta.embedding_model {
            output.push_str(&format!(
                "\nEmbedding model: {} | Skill vocabulary: {} entries\n",
                model,
                meta.skill_vocabulary_size.unwrap_or_default()
            ));
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &RelevanceReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }

    fn markdown_badge(verdict: &str) -> &'static str {
        match verdict {
            "High Suitability" => "🟢",
            "Medium Suitability" => "🟡",
            _ => "🔴",
        }
    }

    fn markdown_list(skills: &[String], empty: &str) -> String {
        if skills.is_empty() {
            return format!("_{}_\n\n", empty);
        }
        let mut list: String = skills.iter().map(|s| format!("- {}\n", s)).collect();
        list.push('\n');
        list
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &RelevanceReport) -> Result<String> {
        let mut output = String::new();
        let meta = &report.metadata;

        output.push_str("# 📊 Resume Relevance Report\n\n");

        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {}\n",
                meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            output.push_str(&format!(
                "**Resume:** `{}` | **Job:** `{}`\n\n",
                meta.resume_name, meta.job_name
            ));
        }

        let summary = &report.summary;
        output.push_str("## Summary\n\n");
        output.push_str(&format!("**Final Score:** {:.2}%\n\n", summary.final_score));
        output.push_str(&format!(
            "**Verdict:** {} {}\n\n",
            Self::markdown_badge(&summary.verdict),
            summary.verdict
        ));
        output.push_str(&format!("> {}\n\n", summary.verdict_reason));

        if let Some(breakdown) = &report.score_breakdown {
            output.push_str("### Score Breakdown\n\n");
            output.push_str("| Component | Score | Weight |\n");
            output.push_str("|-----------|-------|--------|\n");
            output.push_str(&format!(
                "| 🔍 Keyword Match | {:.2}% | {:.0}% |\n",
                breakdown.hard_match_score,
                breakdown.weights.hard_match * 100.0
            ));
            output.push_str(&format!(
                "| 🎯 Semantic Match | {:.2}% | {:.0}% |\n\n",
                breakdown.semantic_score,
                breakdown.weights.semantic * 100.0
            ));
        }

        output.push_str("## ✅ Matching Skills\n\n");
        output.push_str(&Self::markdown_list(
            &report.skills.matched,
            "None of the job's listed skills were found.",
        ));
        output.push_str("## 🎯 Missing Skills\n\n");
        output.push_str(&Self::markdown_list(
            &report.skills.missing,
            "No missing skills. Great job!",
        ));

        output.push_str("## 🤖 Personalized Feedback\n\n");
        output.push_str(report.feedback.text.trim());
        output.push_str("\n\n");

        if self.include_metadata {
            if let Some(model) = &meta.embedding_model {
                output.push_str("---\n\n");
                output.push_str(&format!("*Embedding model: {}", model));
                if let Some(feedback_model) = &report.feedback.model {
                    output.push_str(&format!(" | Feedback model: {}", feedback_model));
                }
                output.push_str("*\n");
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::with_options(true, true, true)
    }

    pub fn with_options(use_colors: bool, pretty_json: bool, include_metadata: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors),
            json_formatter: JsonFormatter::new(pretty_json),
            markdown_formatter: MarkdownFormatter::new(include_metadata),
        }
    }

    pub fn generate_report(&self, report: &RelevanceReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
        }
    }

    pub fn generate_history(&self, entries: &[StoredAnalysis]) -> String {
        self.console_formatter.format_history(entries)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content).map_err(|e| {
        RelevanceError::OutputFormatting(format!(
            "Failed to write report to {}: {}",
            file_path.display(),
            e
        ))
    })
}

pub fn suggest_filename(format: OutputFormat, resume_name: &str) -> String {
    let base_name = Path::new(resume_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    match format {
        OutputFormat::Console => format!("{}_relevance.txt", base_name),
        OutputFormat::Json => format!("{}_relevance.json", base_name),
        OutputFormat::Markdown => format!("{}_relevance.md", base_name),
    }
}
