//! Analysis prompt construction.

use crate::market::MetricsSnapshot;
use crate::model::item::ResearchItem;
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str =
    "You are a professional investment analyst. Provide clear, objective analysis.";

/// Maximum research items quoted in one prompt.
pub const MAX_CONTEXT_ITEMS: usize = 5;
const MAX_CONTEXT_CHARS: usize = 400;
const NOT_AVAILABLE: &str = "N/A";

/// Builds the user prompt for one snapshot.
///
/// `context` items are quoted newest first as the caller passed them; at
/// most [`MAX_CONTEXT_ITEMS`] are used and each body is truncated.
pub fn build_analysis_prompt(snapshot: &MetricsSnapshot, context: &[ResearchItem]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a professional investment analyst. Analyze the following stock data and provide a comprehensive investment analysis.\n\n",
    );

    let _ = writeln!(
        prompt,
        "Company: {} ({})",
        text_or_na(snapshot.company_name.as_deref()),
        snapshot.ticker
    );
    let _ = writeln!(prompt, "Sector: {}", text_or_na(snapshot.sector.as_deref()));
    let _ = writeln!(
        prompt,
        "Industry: {}\n",
        text_or_na(snapshot.industry.as_deref())
    );
    let _ = writeln!(
        prompt,
        "Current Price: {}",
        snapshot
            .current_price
            .map(|price| format!("${price:.2}"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    );
    let _ = writeln!(
        prompt,
        "Price Change: {}\n",
        snapshot
            .price_change_pct
            .map(|pct| format!("{pct:.2}%"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    );

    prompt.push_str("Key Metrics:\n");
    let market_cap = snapshot
        .market_cap
        .map(|cap| format!("${}", group_thousands(cap)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let _ = writeln!(prompt, "- Market Cap: {market_cap}");
    for (label, value) in [
        ("P/E Ratio", snapshot.pe_ratio),
        ("Forward P/E", snapshot.forward_pe),
        ("Price to Book", snapshot.price_to_book),
        ("Debt to Equity", snapshot.debt_to_equity),
        ("Return on Equity", snapshot.return_on_equity),
        ("Profit Margins", snapshot.profit_margins),
        ("Revenue Growth", snapshot.revenue_growth),
        ("Dividend Yield", snapshot.dividend_yield),
        ("Beta", snapshot.beta),
    ] {
        let _ = writeln!(prompt, "- {label}: {}", number_or_na(value));
    }

    if !context.is_empty() {
        prompt.push_str("\nYour research notes on this company:\n");
        for item in context.iter().take(MAX_CONTEXT_ITEMS) {
            let _ = write!(prompt, "- [{}] {}", item.kind, item.title);
            if !item.tags.is_empty() {
                let _ = write!(prompt, " (tags: {})", item.tags.join(", "));
            }
            prompt.push('\n');
            let body = truncate_chars(item.content.trim(), MAX_CONTEXT_CHARS);
            if !body.is_empty() {
                let _ = writeln!(prompt, "  {}", body.replace('\n', " "));
            }
        }
        prompt.push_str("Take these notes into account where the data supports them.\n");
    }

    prompt.push_str(
        "\nPlease provide:\n\
         1. A concise summary of the investment case (2-3 sentences)\n\
         2. Key strengths/advantages (3-4 bullet points)\n\
         3. Key weaknesses/concerns (3-4 bullet points)\n\
         4. Major risks to consider (3-4 bullet points)\n\
         5. Overall investment recommendation (Buy/Hold/Sell with brief reasoning)\n\n\
         Format your response in a clear, structured manner. Be objective and data-driven. \
         Focus on what the numbers tell us about the company's financial health and investment potential.\n",
    );
    prompt
}

fn text_or_na(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(NOT_AVAILABLE)
}

fn number_or_na(value: Option<f64>) -> String {
    value
        .map(|number| format!("{number}"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut truncated: String = value.chars().take(max_chars).collect();
    if value.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::NewItem;
    use chrono::Utc;

    fn snapshot() -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::empty("TEST");
        snapshot.company_name = Some("Test Company".to_string());
        snapshot.current_price = Some(100.0);
        snapshot.price_change_pct = Some(5.0);
        snapshot.market_cap = Some(1_000_000_000);
        snapshot.pe_ratio = Some(25.0);
        snapshot
    }

    #[test]
    fn renders_metrics_and_placeholders() {
        let prompt = build_analysis_prompt(&snapshot(), &[]);
        assert!(prompt.contains("Company: Test Company (TEST)"));
        assert!(prompt.contains("Sector: N/A"));
        assert!(prompt.contains("Current Price: $100.00"));
        assert!(prompt.contains("Price Change: 5.00%"));
        assert!(prompt.contains("- Market Cap: $1,000,000,000"));
        assert!(prompt.contains("- P/E Ratio: 25"));
        assert!(prompt.contains("- Beta: N/A"));
        assert!(!prompt.contains("research notes"));
    }

    #[test]
    fn quotes_limited_research_context() {
        let now = Utc::now();
        let items: Vec<ResearchItem> = (0..7)
            .map(|idx| {
                ResearchItem::create(
                    NewItem::note(format!("Note {idx}"), "x".repeat(500)).with_tags(["growth"]),
                    now,
                )
                .unwrap()
            })
            .collect();

        let prompt = build_analysis_prompt(&snapshot(), &items);
        assert!(prompt.contains("- [note] Note 0 (tags: growth)"));
        assert!(prompt.contains("- [note] Note 4"));
        assert!(!prompt.contains("Note 5"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(400))));
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
