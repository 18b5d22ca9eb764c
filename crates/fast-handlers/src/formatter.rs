use core_types::{ContextItem, ContextType, GraphRow, Report, ResponseMeta};

const DEFAULT_CITATION_LIMIT: usize = 5;
const DEFAULT_GRAPH_SAMPLE_LIMIT: usize = 5;

/// Deterministic renderer (spec §4.12): no LM calls, must produce valid
/// Markdown even when every optional field is empty.
pub fn format_report(
    response_type: &str,
    heading: &str,
    items: &[ContextItem],
    graph_samples: Vec<GraphRow>,
    meta: ResponseMeta,
) -> Report {
    let mut markdown = format!("## {heading}\n\n");

    if items.is_empty() {
        markdown.push_str("_관련 정보를 찾지 못했습니다._\n");
    } else {
        for item in items {
            let title = item.title().unwrap_or("(제목 없음)");
            markdown.push('\n');
            markdown.push_str(&format!("### {title}\n"));
            if let Some(summary) = item.summary() {
                markdown.push_str(summary);
                markdown.push('\n');
            } else if item.item_type == ContextType::Stock {
                if let Some(symbol) = item.content.get("symbol").and_then(|v| v.as_str()) {
                    let last = item.content.get("last").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    let change_pct = item.content.get("change_pct").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    markdown.push_str(&format!("{symbol}: {last} ({change_pct:+.2}%)\n"));
                }
            }
        }
    }

    let sources: Vec<_> = items
        .iter()
        .filter_map(|item| {
            let url = item.url()?.to_string();
            Some(core_types::Citation {
                url,
                title: item.title().unwrap_or_default().to_string(),
                published_at: item.timestamp,
            })
        })
        .take(DEFAULT_CITATION_LIMIT)
        .collect();

    if !sources.is_empty() {
        markdown.push_str("\n---\n**출처**\n");
        for citation in &sources {
            markdown.push_str(&format!("- [{}]({})\n", citation.title, citation.url));
        }
    }

    let graph_samples: Vec<_> = graph_samples.into_iter().take(DEFAULT_GRAPH_SAMPLE_LIMIT).collect();

    Report {
        response_type: response_type.to_string(),
        markdown,
        sources,
        graph_samples,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_items_still_produce_valid_markdown() {
        let report = format_report("news", "뉴스 요약", &[], vec![], ResponseMeta::default());
        assert!(report.markdown.contains("관련 정보를 찾지 못했습니다"));
        assert!(report.sources.is_empty());
    }

    #[test]
    fn citations_are_capped_at_five() {
        let items: Vec<ContextItem> = (0..10)
            .map(|i| {
                let mut item = ContextItem::new(core_types::ContextSource::Search, ContextType::News);
                item.content.insert("title".into(), format!("title {i}").into());
                item.content.insert("url".into(), format!("https://example.com/{i}").into());
                item
            })
            .collect();
        let report = format_report("news", "뉴스", &items, vec![], ResponseMeta::default());
        assert_eq!(report.sources.len(), 5);
    }
}
