//! Section extraction from free-form analysis text.
//!
//! Models answer with loosely formatted headings and bullets, so extraction
//! is keyword based. Every section falls back to a fixed "not available"
//! message instead of failing.

use serde::Serialize;

pub const SUMMARY_UNAVAILABLE: &str = "Analysis summary not available";
pub const PROS_UNAVAILABLE: &str = "Strengths analysis not available";
pub const CONS_UNAVAILABLE: &str = "Concerns analysis not available";
pub const RISKS_UNAVAILABLE: &str = "Risk analysis not available";
pub const RECOMMENDATION_UNAVAILABLE: &str = "Recommendation not available";

const MAX_SUMMARY_LINES: usize = 3;
const BULLET_MARKERS: [&str; 3] = ["•", "- ", "* "];

/// Structured view of an analysis text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisSections {
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub risks: Vec<String>,
    pub recommendation: String,
}

/// Splits `analysis` into summary, pros, cons, risks and recommendation.
pub fn parse_analysis(analysis: &str) -> AnalysisSections {
    let lines: Vec<&str> = analysis.lines().collect();
    AnalysisSections {
        summary: extract_summary(&lines),
        pros: extract_bullets(
            &lines,
            |line| line.contains("strengths") || line.contains("advantages"),
            |line, _| line.contains("concerns") || line.contains("weaknesses"),
            PROS_UNAVAILABLE,
        ),
        cons: extract_bullets(
            &lines,
            |line| line.contains("concerns") || line.contains("weaknesses"),
            |line, _| line.contains("risks") || line.contains("recommendation"),
            CONS_UNAVAILABLE,
        ),
        risks: extract_bullets(
            &lines,
            |line| line.contains("risks"),
            |line, raw| line.contains("recommendation") || raw.trim_start().starts_with("**"),
            RISKS_UNAVAILABLE,
        ),
        recommendation: extract_recommendation(&lines),
    }
}

fn extract_summary(lines: &[&str]) -> String {
    let Some(heading) = lines.iter().position(|line| {
        let lower = line.to_lowercase();
        lower.contains("summary") || lower.contains("investment case")
    }) else {
        return SUMMARY_UNAVAILABLE.to_string();
    };

    let summary: Vec<&str> = lines[heading + 1..]
        .iter()
        .map(|line| line.trim())
        .skip_while(|line| line.is_empty())
        .take_while(|line| !line.is_empty() && !is_heading(line))
        .take(MAX_SUMMARY_LINES)
        .collect();

    if summary.is_empty() {
        SUMMARY_UNAVAILABLE.to_string()
    } else {
        summary.join("\n")
    }
}

/// Collects bullets after the first line matching `start` until a line
/// matching `stop`. `stop` receives the lowercased and the raw line.
fn extract_bullets(
    lines: &[&str],
    start: impl Fn(&str) -> bool,
    stop: impl Fn(&str, &str) -> bool,
    fallback: &str,
) -> Vec<String> {
    let mut bullets = Vec::new();
    let mut in_section = false;

    for &raw in lines {
        let lower = raw.to_lowercase();
        if start(lower.as_str()) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        if stop(lower.as_str(), raw) {
            break;
        }
        if let Some(bullet) = strip_bullet(raw) {
            bullets.push(bullet.to_string());
        }
    }

    if bullets.is_empty() {
        vec![fallback.to_string()]
    } else {
        bullets
    }
}

fn extract_recommendation(lines: &[&str]) -> String {
    lines
        .iter()
        .find(|line| line.to_lowercase().contains("recommendation"))
        .map(|line| line.replace("**", "").trim().to_string())
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| RECOMMENDATION_UNAVAILABLE.to_string())
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    BULLET_MARKERS
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(str::trim)
        .filter(|bullet| !bullet.is_empty())
}

fn is_heading(line: &str) -> bool {
    line.starts_with("**") || line.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
## Summary
Solid franchise with pricing power.
Valuation is full.

**Key Strengths:**
- Durable margins
• Net cash balance sheet

**Key Weaknesses:**
* Slowing unit growth

**Major Risks:**
- Regulation
**Recommendation: BUY** on pullbacks
";

    #[test]
    fn extracts_every_section() {
        let sections = parse_analysis(SAMPLE);
        assert_eq!(
            sections.summary,
            "Solid franchise with pricing power.\nValuation is full."
        );
        assert_eq!(sections.pros, vec!["Durable margins", "Net cash balance sheet"]);
        assert_eq!(sections.cons, vec!["Slowing unit growth"]);
        assert_eq!(sections.risks, vec!["Regulation"]);
        assert_eq!(sections.recommendation, "Recommendation: BUY on pullbacks");
    }

    #[test]
    fn missing_sections_fall_back() {
        let sections = parse_analysis("nothing structured here");
        assert_eq!(sections.summary, SUMMARY_UNAVAILABLE);
        assert_eq!(sections.pros, vec![PROS_UNAVAILABLE]);
        assert_eq!(sections.cons, vec![CONS_UNAVAILABLE]);
        assert_eq!(sections.risks, vec![RISKS_UNAVAILABLE]);
        assert_eq!(sections.recommendation, RECOMMENDATION_UNAVAILABLE);
    }
}
