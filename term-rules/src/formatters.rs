//! Rendering validation reports as JSON or console text.

use serde::Serialize;
use std::fmt::Write;

use crate::core::{Impact, RuleResult, ValidationReport};
use crate::error::NO_VALIDATIONS_MESSAGE;
use crate::prelude::*;

/// Configuration for report formatting.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Spaces per indentation level for pretty JSON
    pub indent: usize,
    /// Include entries that passed
    pub include_passed: bool,
    /// Include failing items in human output
    pub include_failing_items: bool,
    /// Maximum number of entries to display (-1 for all)
    pub max_entries: i32,
    /// ANSI colours in console output
    pub use_colors: bool,
    /// Whether to include timestamps in human output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            include_passed: true,
            include_failing_items: true,
            max_entries: -1,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Only failures, without colors or timestamps.
    pub fn minimal() -> Self {
        Self {
            indent: 2,
            include_passed: false,
            include_failing_items: false,
            max_entries: -1,
            use_colors: false,
            include_timestamps: false,
        }
    }

    pub fn detailed() -> Self {
        Self::default()
    }

    /// Plain output capped at 50 entries.
    pub fn ci() -> Self {
        Self {
            max_entries: 50,
            use_colors: false,
            ..Self::default()
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_passed(mut self, include: bool) -> Self {
        self.include_passed = include;
        self
    }

    pub fn with_failing_items(mut self, include: bool) -> Self {
        self.include_failing_items = include;
        self
    }

    pub fn with_max_entries(mut self, max: i32) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }
}

/// Formats a [`ValidationReport`] into a string.
///
/// ```rust
/// use term_rules::core::ValidationReport;
/// use term_rules::formatters::ResultFormatter;
///
/// struct CountFormatter;
///
/// impl ResultFormatter for CountFormatter {
///     fn format(&self, report: &ValidationReport) -> term_rules::prelude::Result<String> {
///         Ok(format!("{} validations", report.len()))
///     }
/// }
///
/// assert_eq!(CountFormatter.format(&ValidationReport::new()).unwrap(), "0 validations");
/// ```
pub trait ResultFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String>;

    /// Formats with an explicit configuration; the default ignores it.
    fn format_with_config(
        &self,
        report: &ValidationReport,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(report)
    }
}

/// Formats reports as JSON, `Summary` first and entries in attachment order.
///
/// Pretty output uses four-space indentation unless configured otherwise.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Indented output when `true`, a single line otherwise.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn to_json<T: Serialize>(&self, value: &T, indent: usize) -> Result<String> {
        let mut buffer = Vec::new();
        if self.pretty {
            let indent = " ".repeat(indent);
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
            value.serialize(&mut serializer)?;
        } else {
            serde_json::to_writer(&mut buffer, value)?;
        }
        String::from_utf8(buffer)
            .map_err(|e| TermError::Internal(format!("JSON output is not UTF-8: {e}")))
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        if config.include_passed {
            self.to_json(report, config.indent)
        } else {
            self.to_json(&report.failed_only(), config.indent)
        }
    }
}

/// Formats reports as console text.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        &self,
        output: &mut String,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> std::fmt::Result {
        let paint = |text: &str, code: &str| {
            if config.use_colors {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        let summary = report.summary();
        writeln!(output)?;
        match summary.passed() {
            None => {
                writeln!(output, "{NO_VALIDATIONS_MESSAGE}")?;
                return Ok(());
            }
            Some(true) => writeln!(output, "✅ {}", paint("Validation PASSED", "32"))?,
            Some(false) => writeln!(output, "❌ {}", paint("Validation FAILED", "31"))?,
        }
        writeln!(
            output,
            "Validations: {} ({} failed)",
            summary.validations().len(),
            summary.failed_validations().len()
        )?;

        let limit = usize::try_from(config.max_entries).unwrap_or(usize::MAX);
        let shown: Vec<_> = report
            .iter()
            .filter(|(_, result)| config.include_passed || result.is_failure())
            .collect();
        for (name, result) in shown.iter().take(limit) {
            writeln!(output)?;
            self.render_entry(output, name, result, config, &paint)?;
        }
        if shown.len() > limit {
            writeln!(output)?;
            writeln!(output, "... and {} more", shown.len() - limit)?;
        }
        Ok(())
    }

    fn render_entry(
        &self,
        output: &mut String,
        name: &str,
        result: &RuleResult,
        config: &FormatterConfig,
        paint: &dyn Fn(&str, &str) -> String,
    ) -> std::fmt::Result {
        let (icon, color) = match (result.is_success(), result.impact) {
            (true, _) => ("✅", "32"),
            (false, Impact::High) => ("❌", "31"),
            (false, Impact::Medium) => ("⚠️", "33"),
            (false, Impact::Low) => ("ℹ️", "36"),
        };
        writeln!(output, "{icon} {} [{}]", paint(name, color), result.impact)?;
        writeln!(output, "   {}", result.message())?;

        let outcome = &result.result;
        if let (Some(failed), Some(rows)) = (outcome.failed_number, outcome.frame_row_number) {
            writeln!(
                output,
                "   failed {failed} of {rows} ({:.2}%), threshold {:.2}",
                outcome.failed_percentage.unwrap_or_default() * 100.0,
                outcome.threshold.unwrap_or_default()
            )?;
        }
        if config.include_failing_items {
            if let Some(items) = outcome.failing_items.as_ref().filter(|i| !i.is_empty()) {
                let rendered = items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(output, "   failing items: {rendered}")?;
            }
        }
        if config.include_timestamps {
            writeln!(output, "   at {}", result.timestamp)?;
        }
        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(&mut output, report, config)
            .map_err(|e| TermError::Internal(format!("Failed to format report: {e}")))?;
        Ok(output)
    }
}
