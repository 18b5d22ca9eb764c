use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Query / intent / complexity
// ---------------------------------------------------------------------------

/// Closed intent set (spec §3, §4.4). Extending this is a configuration
/// change (the keyword bundles), never a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    NewsInquiry,
    StockAnalysis,
    Comparison,
    Trend,
    GeneralQa,
    Unknown,
}

impl Default for Intent {
    fn default() -> Self {
        Intent::Unknown
    }
}

/// Extracted entities, grouped by kind (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    pub companies: HashSet<String>,
    pub products: HashSet<String>,
    pub sectors: HashSet<String>,
    pub tickers: HashSet<String>,
}

impl Entities {
    pub fn distinct_company_count(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
            && self.products.is_empty()
            && self.sectors.is_empty()
            && self.tickers.is_empty()
    }
}

/// A query plus everything derived from it by the classifier (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub force_deep: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub confidence: f64,
    /// Deep-analysis request overrides (spec §6): only the synchronous
    /// deep-analysis endpoint populates these; the chat endpoint leaves them
    /// `None` and nodes fall back to their own defaults.
    #[serde(default)]
    pub lookback_days: Option<u32>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
            session_id: None,
            force_deep: false,
            keywords: Vec::new(),
            entities: Entities::default(),
            intent: Intent::Unknown,
            confidence: 0.0,
            lookback_days: None,
            domain: None,
            symbol: None,
        }
    }
}

/// Depth classification derived from a `ComplexityScore` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Shallow,
    Standard,
    Deep,
    Comprehensive,
}

impl AnalysisDepth {
    /// Thresholds from spec §3: <0.7 shallow, <0.85 standard, <0.9 deep, else comprehensive.
    pub fn from_score(score: f64) -> Self {
        if score < 0.7 {
            AnalysisDepth::Shallow
        } else if score < 0.85 {
            AnalysisDepth::Standard
        } else if score < 0.9 {
            AnalysisDepth::Deep
        } else {
            AnalysisDepth::Comprehensive
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        match self {
            AnalysisDepth::Shallow => 60,
            AnalysisDepth::Standard => 90,
            AnalysisDepth::Deep => 120,
            AnalysisDepth::Comprehensive => 180,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub score: f64,
    pub depth: AnalysisDepth,
}

impl ComplexityScore {
    pub fn new(score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            score,
            depth: AnalysisDepth::from_score(score),
        }
    }
}

// ---------------------------------------------------------------------------
// Context items (the unit of retrieved evidence)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Graph,
    Search,
    Market,
}

impl ContextSource {
    /// Source-priority weight used in Phase 1 / Phase 4 of Context Engineering (spec §4.10).
    pub fn weight(&self) -> f64 {
        match self {
            ContextSource::Graph => 1.3,
            ContextSource::Search => 1.0,
            ContextSource::Market => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    News,
    Company,
    Event,
    Financial,
    Analysis,
    Stock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OntologyStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Unknown,
}

impl Default for OntologyStatus {
    fn default() -> Self {
        OntologyStatus::Unknown
    }
}

/// The unit of retrieved evidence fused from Graph, Search, and Market (spec §3).
///
/// `quality_score` and friends are optional because upstream backends do not
/// currently populate them; the Context Engineer computes a fallback when
/// absent (spec §9, Open Questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub source: ContextSource,
    pub item_type: ContextType,
    pub content: serde_json::Map<String, serde_json::Value>,
    pub timestamp: Option<DateTime<Utc>>,
    pub confidence: f64,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub ontology_status: OntologyStatus,
    #[serde(default)]
    pub graph_degree: u32,
    #[serde(default)]
    pub event_chain_id: Option<String>,
}

impl ContextItem {
    pub fn new(source: ContextSource, item_type: ContextType) -> Self {
        Self {
            source,
            item_type,
            content: serde_json::Map::new(),
            timestamp: None,
            confidence: 1.0,
            relevance: 0.0,
            quality_score: None,
            is_featured: false,
            synced: false,
            ontology_status: OntologyStatus::Unknown,
            graph_degree: 0,
            event_chain_id: None,
        }
    }

    /// Clamp confidence into `[0, 1]` (invariant from spec §3).
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }

    pub fn title(&self) -> Option<&str> {
        self.content.get("title").and_then(|v| v.as_str())
    }

    pub fn summary(&self) -> Option<&str> {
        self.content.get("summary").and_then(|v| v.as_str())
    }

    pub fn url(&self) -> Option<&str> {
        self.content.get("url").and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Backend result shapes
// ---------------------------------------------------------------------------

/// One row returned from a graph query (spec §3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRow {
    pub node_properties: serde_json::Map<String, serde_json::Value>,
    pub labels: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsHit {
    pub id: String,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub score: f64,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub symbol: String,
    pub last: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub as_of: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Deep-path analytical artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisApproach {
    Comparative,
    SingleEntityDeepDive,
    TrendAnalysis,
    GeneralSynthesis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPlan {
    pub primary_focus: HashSet<String>,
    pub comparison_axes: HashSet<String>,
    pub required_data_types: HashSet<ContextType>,
    pub key_questions: Vec<String>,
    pub approach: AnalysisApproach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Quantitative,
    Qualitative,
    Temporal,
    Comparative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub finding: String,
    pub evidence: Vec<String>,
    pub significance: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    NewsEntity,
    FinancialNews,
    EventMarket,
    SupplyChain,
    Competitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub entities: Vec<String>,
    pub description: String,
    pub impact: ImpactLevel,
    pub implication: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhatIfScenario {
    pub scenario: String,
    pub probability: f64,
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeepReasoning {
    pub why_causes: Vec<String>,
    pub why_analysis: String,
    pub how_mechanisms: Vec<String>,
    pub what_if_scenarios: Vec<WhatIfScenario>,
    pub so_what_investor_implications: Vec<String>,
    pub so_what_actionable: Vec<String>,
}

impl DeepReasoning {
    /// Whether at least one quadrant (why/how/what_if/so_what) carries content,
    /// used by the robust JSON recovery in node 8 (spec §4.11) and by quality_check.
    pub fn has_any_section(&self) -> bool {
        !self.why_causes.is_empty()
            || !self.why_analysis.is_empty()
            || !self.how_mechanisms.is_empty()
            || !self.what_if_scenarios.is_empty()
            || !self.so_what_investor_implications.is_empty()
            || !self.so_what_actionable.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseMeta {
    pub processing_time_ms: u64,
    pub intent: Option<Intent>,
    pub confidence: Option<f64>,
    pub complexity_score: Option<f64>,
    pub analysis_depth: Option<AnalysisDepth>,
    pub processing_method: Option<String>,
    pub quality_score: Option<f64>,
    pub partial: Option<bool>,
    pub graph_samples_shown: Option<usize>,
    pub fallback: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub response_type: String,
    pub markdown: String,
    pub sources: Vec<Citation>,
    pub graph_samples: Vec<GraphRow>,
    pub meta: ResponseMeta,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub inserted_at: DateTime<Utc>,
    pub ttl: std::time::Duration,
    pub hits: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: std::time::Duration) -> Self {
        Self {
            value,
            inserted_at: Utc::now(),
            ttl,
            hits: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        let age = Utc::now().signed_duration_since(self.inserted_at);
        age.to_std().map(|a| a >= self.ttl).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Deep workflow state (spec §3, §4.11)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub keywords: Vec<String>,
    pub entities: Entities,
    pub complexity: f64,
    pub analysis_requirements: Vec<String>,
    pub focus_areas: Vec<String>,
    pub expected_output_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct NodeTiming {
    pub node: String,
    pub millis: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostic {
    pub node: String,
    pub message: String,
}

/// The single mutable record threaded through the ten-node DAG (spec §3).
/// Each node owns and mutates exactly one field; downstream nodes only read.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub query: Option<Query>,
    pub query_analysis: Option<QueryAnalysis>,
    pub analysis_plan: Option<AnalysisPlan>,
    pub contexts: Vec<ContextItem>,
    pub diversity_score: f64,
    pub insights: Vec<Insight>,
    pub relationships: Vec<Relationship>,
    pub deep_reasoning: Option<DeepReasoning>,
    pub draft_report: Option<String>,
    pub quality_score: f64,
    pub retry_count: u32,
    pub timings: Vec<NodeTiming>,
    pub diagnostics: Vec<Diagnostic>,
}

impl WorkflowState {
    pub fn new(query: Query) -> Self {
        Self {
            query: Some(query),
            ..Default::default()
        }
    }

    pub fn record_timing(&mut self, node: &str, millis: u64) {
        self.timings.push(NodeTiming {
            node: node.to_string(),
            millis,
        });
    }

    pub fn record_diagnostic(&mut self, node: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            node: node.to_string(),
            message: message.into(),
        });
    }
}

// ---------------------------------------------------------------------------
// Degradation levels (spec §5)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    Full,
    Degraded,
    Minimal,
    Emergency,
}

impl DegradationLevel {
    /// Derive from the count of currently-open breakers among the named backends (spec §5).
    pub fn from_open_count(open_count: usize, total: usize) -> Self {
        if open_count == 0 {
            DegradationLevel::Full
        } else if open_count == 1 {
            DegradationLevel::Degraded
        } else if open_count < total {
            DegradationLevel::Minimal
        } else {
            DegradationLevel::Emergency
        }
    }
}
