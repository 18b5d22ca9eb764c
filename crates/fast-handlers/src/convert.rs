use core_types::{ContextItem, ContextSource, ContextType, GraphRow, NewsHit, StockSnapshot};

/// Project a raw graph row into the uniform `ContextItem` shape (spec §3,
/// §4.8). The label list decides `item_type`; a row with no recognized
/// label falls back to `Analysis` since graph hits are typically
/// interpretive context rather than raw news.
pub fn graph_row_to_context_item(row: GraphRow) -> ContextItem {
    let item_type = row
        .labels
        .iter()
        .find_map(|label| match label.as_str() {
            "Company" => Some(ContextType::Company),
            "Event" => Some(ContextType::Event),
            "News" => Some(ContextType::News),
            _ => None,
        })
        .unwrap_or(ContextType::Analysis);

    let mut item = ContextItem::new(ContextSource::Graph, item_type);
    item.content = row.node_properties;
    item.timestamp = Some(row.timestamp);
    item.confidence = 1.0;
    item
}

pub fn news_hit_to_context_item(hit: NewsHit) -> ContextItem {
    let mut item = ContextItem::new(ContextSource::Search, ContextType::News);
    item.content.insert("id".into(), hit.id.into());
    item.content.insert("title".into(), hit.title.into());
    item.content.insert("url".into(), hit.url.into());
    if let Some(summary) = hit.summary {
        item.content.insert("summary".into(), summary.into());
    }
    item.timestamp = Some(hit.published_at);
    item.relevance = hit.score.clamp(0.0, 1.0);
    item.confidence = 1.0;
    item
}

pub fn stock_snapshot_to_context_item(snapshot: StockSnapshot) -> ContextItem {
    let mut item = ContextItem::new(ContextSource::Market, ContextType::Stock);
    item.content.insert("symbol".into(), snapshot.symbol.into());
    item.content.insert("last".into(), snapshot.last.into());
    item.content.insert("change".into(), snapshot.change.into());
    item.content.insert("change_pct".into(), snapshot.change_pct.into());
    item.content.insert("volume".into(), snapshot.volume.into());
    item.timestamp = Some(snapshot.as_of);
    item.confidence = 1.0;
    item
}
