use crate::prune::PruneReport;
use anyhow::Result;
use chrono::Utc;

/// Report generator for the prune dry-run in various output formats
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate report in the specified format
    pub fn generate(&self, report: &PruneReport, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "json" => self.generate_json(report),
            "markdown" => Ok(self.generate_markdown(report)),
            "text" => Ok(self.generate_text(report)),
            _ => Err(anyhow::anyhow!("Unsupported format: {}", format)),
        }
    }

    /// Generate JSON format report. No timestamp, so reruns are identical.
    fn generate_json(&self, report: &PruneReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    /// Generate Markdown format report
    fn generate_markdown(&self, report: &PruneReport) -> String {
        format!(
            r#"# Prune Preview

**Selected Classes**: {}
**Pruned Classes**: {}

## Selected Classes
{}

## Pruned Classes
{}

## Pruned Containment Features
{}

## Pruned Reference Features
{}

---
*Generated at: {}*
"#,
            report.selected_classes.len(),
            report.pruned_classes.len(),
            markdown_list(&report.selected_classes),
            markdown_list(&report.pruned_classes),
            markdown_list(&report.pruned_containment_features),
            markdown_list(&report.pruned_reference_features),
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// Generate plain text format report
    fn generate_text(&self, report: &PruneReport) -> String {
        format!(
            r#"Prune Preview
=============

Selected classes ({}):
{}
Pruned classes ({}):
{}
Pruned containment features ({}):
{}
Pruned reference features ({}):
{}
Generated at: {}
"#,
            report.selected_classes.len(),
            text_list(&report.selected_classes),
            report.pruned_classes.len(),
            text_list(&report.pruned_classes),
            report.pruned_containment_features.len(),
            text_list(&report.pruned_containment_features),
            report.pruned_reference_features.len(),
            text_list(&report.pruned_reference_features),
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn markdown_list(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.iter().map(|item| format!("- {}", item)).collect::<Vec<_>>().join("\n")
    }
}

fn text_list(items: &[String]) -> String {
    items.iter().map(|item| format!("  {}\n", item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> PruneReport {
        PruneReport {
            selected_classes: vec!["BusinessAttribute".to_string(), "Repository".to_string()],
            pruned_classes: vec!["DataType".to_string()],
            pruned_containment_features: vec!["Repository.dataDictionary".to_string()],
            pruned_reference_features: vec![],
        }
    }

    #[test]
    fn test_json_has_no_timestamp() {
        let generator = ReportGenerator::new();
        let json = generator.generate(&sample_report(), "json").unwrap();

        let parsed: PruneReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_report());
        assert!(!json.contains("Generated at"));
    }

    #[test]
    fn test_markdown_and_text_carry_footer() {
        let generator = ReportGenerator::new();

        let markdown = generator.generate(&sample_report(), "Markdown").unwrap();
        assert!(markdown.contains("- Repository.dataDictionary"));
        assert!(markdown.contains("## Pruned Reference Features\nNone"));
        assert!(markdown.contains("*Generated at: "));

        let text = generator.generate(&sample_report(), "text").unwrap();
        assert!(text.contains("Pruned classes (1):\n  DataType\n"));
        assert!(text.contains("Generated at: "));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(ReportGenerator::new().generate(&sample_report(), "html").is_err());
    }
}
