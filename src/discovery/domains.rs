//! Business domain clustering.
//!
//! Tables are assigned to one of a fixed, ordered list of domains by keyword
//! in the table name (first match wins). Each populated domain is then
//! described by its relationships, largest tables and temporal columns.
//! Relationships between two known domains feed process-flow inference and a
//! domain coupling graph.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::algo::connected_components;
use petgraph::graphmap::UnGraphMap;
use serde::Serialize;

use crate::config::Thresholds;

use super::matcher::RelationshipCandidate;
use super::rules::TypeFamily;
use super::types::{ColumnMetadata, ColumnRef, TableRef};

/// Number of core entities reported per domain.
const CORE_ENTITY_LIMIT: usize = 5;

/// Supporting cross-domain edges worth 25 confidence points each.
const PROCESS_EDGE_WEIGHT: usize = 25;

/// A business domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessDomain {
    UserManagement,
    OrderManagement,
    ProductCatalog,
    ContentManagement,
    AuditLogging,
    Configuration,
    Reporting,
    Integration,
    Financial,
    Security,
    Uncategorized,
}

impl BusinessDomain {
    /// Keyword-matched domains in priority order.
    pub const ORDERED: [BusinessDomain; 10] = [
        Self::UserManagement,
        Self::OrderManagement,
        Self::ProductCatalog,
        Self::ContentManagement,
        Self::AuditLogging,
        Self::Configuration,
        Self::Reporting,
        Self::Integration,
        Self::Financial,
        Self::Security,
    ];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::UserManagement => &["user", "account", "profile", "auth", "member", "customer", "person"],
            Self::OrderManagement => &["order", "cart", "purchase", "transaction", "payment", "invoice", "billing"],
            Self::ProductCatalog => &["product", "item", "catalog", "inventory", "stock", "category", "brand"],
            Self::ContentManagement => &["content", "article", "post", "media", "file", "document", "page"],
            Self::AuditLogging => &["log", "audit", "event", "activity", "history", "trace"],
            Self::Configuration => &["config", "setting", "parameter", "option", "preference"],
            Self::Reporting => &["report", "dashboard", "metric", "analytics", "stat"],
            Self::Integration => &["api", "webhook", "sync", "import", "export", "feed"],
            Self::Financial => &["price", "cost", "revenue", "financial", "accounting", "tax"],
            Self::Security => &["permission", "role", "access", "token", "session", "credential"],
            Self::Uncategorized => &[],
        }
    }

    /// First domain whose keywords appear in the table name.
    pub fn classify(table_name: &str) -> Self {
        let name = table_name.to_lowercase();
        Self::ORDERED
            .into_iter()
            .find(|domain| domain.keywords().iter().any(|k| name.contains(k)))
            .unwrap_or(Self::Uncategorized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserManagement => "user_management",
            Self::OrderManagement => "order_management",
            Self::ProductCatalog => "product_catalog",
            Self::ContentManagement => "content_management",
            Self::AuditLogging => "audit_logging",
            Self::Configuration => "configuration",
            Self::Reporting => "reporting",
            Self::Integration => "integration",
            Self::Financial => "financial",
            Self::Security => "security",
            Self::Uncategorized => "uncategorized",
        }
    }

    fn note(&self) -> Option<&'static str> {
        match self {
            Self::UserManagement => {
                Some("User management domain - core to application identity and access")
            }
            Self::OrderManagement => {
                Some("Order management domain - critical for revenue and customer experience")
            }
            Self::AuditLogging => Some("Audit domain - important for compliance and debugging"),
            Self::Uncategorized => Some(
                "Uncategorized tables may represent specialized business logic or legacy systems",
            ),
            _ => None,
        }
    }
}

impl fmt::Display for BusinessDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purpose of a date/time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    Audit,
    Business,
    Unknown,
}

impl TemporalKind {
    pub fn classify(column: &str) -> Self {
        const AUDIT: &[&str] = &["created", "updated", "modified", "deleted", "inserted"];
        const BUSINESS: &[&str] = &["start", "end", "due", "expire", "schedule", "delivery"];

        let name = column.to_lowercase();
        if AUDIT.iter().any(|k| name.contains(k)) {
            Self::Audit
        } else if BUSINESS.iter().any(|k| name.contains(k)) {
            Self::Business
        } else {
            Self::Unknown
        }
    }
}

/// A date/time column of a domain table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalColumn {
    pub column: ColumnRef,
    pub data_type: String,
    pub kind: TemporalKind,
}

/// Temporal columns of one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemporalSummary {
    pub total: usize,
    pub audit: usize,
    pub business: usize,
    pub columns: Vec<TemporalColumn>,
}

fn is_temporal(column: &ColumnMetadata) -> bool {
    let name = column.column.to_lowercase();
    column.type_family() == TypeFamily::Temporal
        || ["date", "time", "created", "updated"]
            .iter()
            .any(|k| name.contains(k))
}

/// A table and its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSize {
    pub table: TableRef,
    pub row_count: u64,
}

/// One populated domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainCluster {
    pub domain: BusinessDomain,
    pub tables: Vec<TableRef>,
    /// Largest tables first.
    pub core_entities: Vec<TableSize>,
    pub fact_tables: usize,
    pub dimension_tables: usize,
    pub internal_relationships: usize,
    pub relationship_density: f64,
    pub temporal: TemporalSummary,
    pub insights: Vec<String>,
}

/// A relationship whose endpoints sit in two different known domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossDomainRelationship {
    pub source: ColumnRef,
    pub target: ColumnRef,
    pub source_domain: BusinessDomain,
    pub target_domain: BusinessDomain,
}

/// A business process whose domains are all present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessFlow {
    pub name: &'static str,
    pub description: &'static str,
    pub domains: &'static [BusinessDomain],
    pub supporting_relationships: usize,
    pub confidence: u8,
}

struct ProcessTemplate {
    name: &'static str,
    description: &'static str,
    domains: &'static [BusinessDomain],
}

static PROCESS_TEMPLATES: &[ProcessTemplate] = &[
    ProcessTemplate {
        name: "User Registration and Management",
        description: "User account creation, authentication, and profile management",
        domains: &[BusinessDomain::UserManagement, BusinessDomain::Security],
    },
    ProcessTemplate {
        name: "Order Processing",
        description: "Complete order lifecycle from product selection to payment",
        domains: &[
            BusinessDomain::UserManagement,
            BusinessDomain::ProductCatalog,
            BusinessDomain::OrderManagement,
            BusinessDomain::Financial,
        ],
    },
    ProcessTemplate {
        name: "Content Publishing",
        description: "Content creation, review, and publication workflow",
        domains: &[BusinessDomain::UserManagement, BusinessDomain::ContentManagement],
    },
    ProcessTemplate {
        name: "Inventory Management",
        description: "Stock tracking and inventory updates based on orders",
        domains: &[BusinessDomain::ProductCatalog, BusinessDomain::OrderManagement],
    },
];

/// Domain clusters plus cross-domain structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainAnalysis {
    /// Populated domains in priority order, `uncategorized` last.
    pub clusters: Vec<DomainCluster>,
    pub cross_domain_relationships: Vec<CrossDomainRelationship>,
    pub process_flows: Vec<ProcessFlow>,
    /// Connected groups in the domain coupling graph.
    pub independent_domain_groups: usize,
    pub insights: Vec<String>,
}

impl DomainAnalysis {
    pub fn domain_of(&self, table: &TableRef) -> Option<BusinessDomain> {
        self.clusters
            .iter()
            .find(|c| c.tables.contains(table))
            .map(|c| c.domain)
    }
}

/// Cluster tables into domains and infer cross-domain structure.
pub fn analyze_domains(
    tables: &[TableSize],
    columns: &[ColumnMetadata],
    relationships: &[RelationshipCandidate],
    thresholds: &Thresholds,
) -> DomainAnalysis {
    let mut members: BTreeMap<BusinessDomain, Vec<&TableSize>> = BTreeMap::new();
    for table in tables {
        members
            .entry(BusinessDomain::classify(&table.table.table))
            .or_default()
            .push(table);
    }

    let domain_of = |table: &TableRef| -> Option<BusinessDomain> {
        members
            .iter()
            .find(|(_, ts)| ts.iter().any(|t| t.table == *table))
            .map(|(d, _)| *d)
    };

    let clusters: Vec<DomainCluster> = members
        .iter()
        .map(|(domain, tables)| build_cluster(*domain, tables, columns, relationships, thresholds))
        .collect();

    let cross_domain_relationships: Vec<CrossDomainRelationship> = relationships
        .iter()
        .filter_map(|rel| {
            let source_domain = domain_of(&rel.source.table_ref())?;
            let target_domain = domain_of(&rel.target.table_ref())?;
            let known = |d: BusinessDomain| d != BusinessDomain::Uncategorized;
            (source_domain != target_domain && known(source_domain) && known(target_domain)).then(
                || CrossDomainRelationship {
                    source: rel.source.clone(),
                    target: rel.target.clone(),
                    source_domain,
                    target_domain,
                },
            )
        })
        .collect();

    let process_flows = infer_process_flows(&clusters, &cross_domain_relationships);
    let independent_domain_groups = coupling_groups(&clusters, &cross_domain_relationships);
    let insights = architecture_insights(&clusters, &cross_domain_relationships, &process_flows);

    DomainAnalysis {
        clusters,
        cross_domain_relationships,
        process_flows,
        independent_domain_groups,
        insights,
    }
}

fn build_cluster(
    domain: BusinessDomain,
    tables: &[&TableSize],
    columns: &[ColumnMetadata],
    relationships: &[RelationshipCandidate],
    thresholds: &Thresholds,
) -> DomainCluster {
    let refs: Vec<TableRef> = tables.iter().map(|t| t.table.clone()).collect();

    let internal_relationships = relationships
        .iter()
        .filter(|r| refs.contains(&r.source.table_ref()) && refs.contains(&r.target.table_ref()))
        .count();
    let relationship_density = if refs.is_empty() {
        0.0
    } else {
        super::types::round2(internal_relationships as f64 / refs.len() as f64)
    };

    let mut core_entities: Vec<TableSize> = tables.iter().map(|t| (*t).clone()).collect();
    core_entities.sort_by(|a, b| b.row_count.cmp(&a.row_count).then_with(|| a.table.cmp(&b.table)));
    core_entities.truncate(CORE_ENTITY_LIMIT);

    let fact_tables = tables
        .iter()
        .filter(|t| t.row_count > thresholds.fact_table_rows)
        .count();

    let temporal_columns: Vec<TemporalColumn> = columns
        .iter()
        .filter(|c| refs.iter().any(|t| t.schema == c.schema && t.table == c.table))
        .filter(|c| is_temporal(c))
        .map(|c| TemporalColumn {
            column: c.column_ref(),
            data_type: c.data_type.clone(),
            kind: TemporalKind::classify(&c.column),
        })
        .collect();
    let temporal = TemporalSummary {
        total: temporal_columns.len(),
        audit: temporal_columns.iter().filter(|c| c.kind == TemporalKind::Audit).count(),
        business: temporal_columns.iter().filter(|c| c.kind == TemporalKind::Business).count(),
        columns: temporal_columns,
    };

    let insights = domain_insights(domain, refs.len(), internal_relationships);

    DomainCluster {
        domain,
        tables: refs,
        core_entities,
        fact_tables,
        dimension_tables: tables.len() - fact_tables,
        internal_relationships,
        relationship_density,
        temporal,
        insights,
    }
}

fn domain_insights(domain: BusinessDomain, table_count: usize, internal: usize) -> Vec<String> {
    let mut insights = Vec::new();

    if table_count > 10 {
        insights.push(format!(
            "Complex domain with {} tables suggests sophisticated business processes",
            table_count
        ));
    } else if table_count < 3 {
        insights.push(format!(
            "Simple domain with {} tables indicates a focused business area",
            table_count
        ));
    }

    if internal == 0 {
        insights.push(
            "No internal relationships found - may indicate data integration opportunities".into(),
        );
    } else {
        let density = internal as f64 / table_count.max(1) as f64;
        if density > 1.0 {
            insights.push("High relationship density indicates tightly coupled business processes".into());
        } else if density < 0.3 {
            insights.push("Low relationship density suggests independent business entities".into());
        }
    }

    if let Some(note) = domain.note() {
        insights.push(note.to_string());
    }
    insights
}

fn infer_process_flows(
    clusters: &[DomainCluster],
    cross: &[CrossDomainRelationship],
) -> Vec<ProcessFlow> {
    let present: Vec<BusinessDomain> = clusters.iter().map(|c| c.domain).collect();

    PROCESS_TEMPLATES
        .iter()
        .filter(|t| t.domains.iter().all(|d| present.contains(d)))
        .map(|t| {
            let supporting = cross
                .iter()
                .filter(|r| t.domains.contains(&r.source_domain) && t.domains.contains(&r.target_domain))
                .count();
            ProcessFlow {
                name: t.name,
                description: t.description,
                domains: t.domains,
                supporting_relationships: supporting,
                confidence: (supporting * PROCESS_EDGE_WEIGHT).min(100) as u8,
            }
        })
        .collect()
}

/// Connected components of the graph of known domains joined by
/// cross-domain relationships.
fn coupling_groups(clusters: &[DomainCluster], cross: &[CrossDomainRelationship]) -> usize {
    let mut graph: UnGraphMap<BusinessDomain, usize> = UnGraphMap::new();
    for cluster in clusters {
        if cluster.domain != BusinessDomain::Uncategorized {
            graph.add_node(cluster.domain);
        }
    }
    for rel in cross {
        let weight = graph
            .edge_weight(rel.source_domain, rel.target_domain)
            .copied()
            .unwrap_or(0);
        graph.add_edge(rel.source_domain, rel.target_domain, weight + 1);
    }
    connected_components(&graph)
}

fn architecture_insights(
    clusters: &[DomainCluster],
    cross: &[CrossDomainRelationship],
    flows: &[ProcessFlow],
) -> Vec<String> {
    let mut insights = Vec::new();
    let domain_count = clusters.len();
    let cross_count = cross.len();

    if domain_count > 8 {
        insights.push(format!(
            "Complex business architecture with {} distinct domains",
            domain_count
        ));
    } else if domain_count < 4 {
        insights.push(format!("Focused business model with {} core domains", domain_count));
    }

    if cross_count > domain_count * 2 {
        insights.push("Highly integrated system with strong cross-domain dependencies".into());
    } else if cross_count < domain_count {
        insights.push("Loosely coupled domains - may indicate a modular architecture".into());
    }

    let mature: Vec<&str> = flows.iter().filter(|f| f.confidence > 75).map(|f| f.name).collect();
    if mature.len() > 2 {
        insights.push(format!("Mature business processes detected: {}", mature.join(", ")));
    }

    let has = |d: BusinessDomain| clusters.iter().any(|c| c.domain == d);
    if has(BusinessDomain::UserManagement) {
        insights.push("User-centric business model with identity management foundation".into());
    }
    if has(BusinessDomain::OrderManagement) {
        insights.push("Transactional business model with order processing capabilities".into());
    }
    insights
}
