//! Rule tables for key and relationship scoring.
//!
//! Each rule is a named predicate with a fixed score delta. Scores are the
//! sum of every matching rule's delta on top of a base, clamped to 0–100.
//! Rules sharing a group are exclusive: only the first match in table order
//! counts.
//! Adding a heuristic means adding a row here; the analyses never branch on
//! names or types themselves.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::inflection::singular_table_name;

/// Broad groups of column types that can hold each other's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Integer,
    String,
    Uuid,
    Temporal,
    Other,
}

static INTEGER_TYPES: &[&str] = &[
    "integer", "int", "int2", "int4", "int8", "bigint", "smallint", "tinyint", "mediumint",
    "serial", "bigserial", "smallserial",
];

static STRING_TYPES: &[&str] = &[
    "varchar", "char", "text", "character varying", "character", "nvarchar", "nchar", "string",
    "varying character", "native character", "clob",
];

static UUID_TYPES: &[&str] = &["uuid", "uniqueidentifier"];

static TEMPORAL_TYPES: &[&str] = &[
    "timestamp", "timestamptz", "timestamp with time zone", "timestamp without time zone",
    "datetime", "date", "time",
];

/// Trailing facet list such as `(255)` or `(10, 2)`.
static TYPE_ARGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*\)\s*").expect("valid regex"));

/// Lowercase a declared type and strip its facets: `VARCHAR(255)` → `varchar`.
pub fn normalize_type(data_type: &str) -> String {
    TYPE_ARGS
        .replace_all(&data_type.to_lowercase(), " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classify a declared type.
pub fn type_family(data_type: &str) -> TypeFamily {
    let normalized = normalize_type(data_type);
    let base = normalized.as_str();
    if INTEGER_TYPES.contains(&base) {
        TypeFamily::Integer
    } else if STRING_TYPES.contains(&base) {
        TypeFamily::String
    } else if UUID_TYPES.contains(&base) {
        TypeFamily::Uuid
    } else if TEMPORAL_TYPES.contains(&base) {
        TypeFamily::Temporal
    } else {
        TypeFamily::Other
    }
}

/// Same declared type, or both integer-family, string-family or uuid.
pub fn types_compatible(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize_type(a), normalize_type(b));
    if !na.is_empty() && na == nb {
        return true;
    }
    let family = type_family(a);
    matches!(
        family,
        TypeFamily::Integer | TypeFamily::String | TypeFamily::Uuid
    ) && family == type_family(b)
}

/// One applied rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreAdjustment {
    pub rule: &'static str,
    pub delta: i32,
}

/// A clamped score and the rules that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleScore {
    pub score: u8,
    pub adjustments: Vec<ScoreAdjustment>,
}

fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

// ---------------------------------------------------------------------------
// Key rules
// ---------------------------------------------------------------------------

/// Base score for a natural key candidate.
pub const KEY_BASE_SCORE: i32 = 50;

/// Facts about a unique, non-null column that key rules test.
#[derive(Debug, Clone)]
pub struct KeyFacts<'a> {
    pub column: &'a str,
    pub data_type: &'a str,
    pub row_count: u64,
    pub large_table_rows: u64,
}

#[derive(Debug, Clone, Copy)]
enum KeyPredicate {
    NameIs(&'static [&'static str]),
    NameEndsWith(&'static [&'static str]),
    NameContains(&'static str),
    FamilyIn(&'static [TypeFamily]),
    /// Normalized type is one of these.
    TypeIn(&'static [&'static str]),
    LargeTable,
}

/// A key scoring rule.
#[derive(Debug, Clone, Copy)]
pub struct KeyRule {
    pub name: &'static str,
    pub description: &'static str,
    pub delta: i32,
    /// Exclusive group; `None` stacks freely.
    pub group: Option<&'static str>,
    predicate: KeyPredicate,
}

impl KeyRule {
    fn applies(&self, facts: &KeyFacts<'_>) -> bool {
        let name = facts.column.to_lowercase();
        match self.predicate {
            KeyPredicate::NameIs(names) => names.contains(&name.as_str()),
            KeyPredicate::NameEndsWith(suffixes) => suffixes.iter().any(|s| name.ends_with(s)),
            KeyPredicate::NameContains(part) => name.contains(part),
            KeyPredicate::FamilyIn(families) => families.contains(&type_family(facts.data_type)),
            KeyPredicate::TypeIn(types) => types.contains(&normalize_type(facts.data_type).as_str()),
            KeyPredicate::LargeTable => facts.row_count > facts.large_table_rows,
        }
    }
}

/// Natural key rules. At most one name rule and one type rule apply.
pub static KEY_RULES: &[KeyRule] = &[
    KeyRule {
        name: "exact_key_name",
        description: "Column is named id, key or pk",
        delta: 30,
        group: Some("name"),
        predicate: KeyPredicate::NameIs(&["id", "key", "pk"]),
    },
    KeyRule {
        name: "id_suffix",
        description: "Column name ends with _id or id",
        delta: 20,
        group: Some("name"),
        predicate: KeyPredicate::NameEndsWith(&["_id", "id"]),
    },
    KeyRule {
        name: "contains_key",
        description: "Column name contains key",
        delta: 10,
        group: Some("name"),
        predicate: KeyPredicate::NameContains("key"),
    },
    KeyRule {
        name: "integer_type",
        description: "Integer-family type",
        delta: 15,
        group: Some("type"),
        predicate: KeyPredicate::FamilyIn(&[TypeFamily::Integer]),
    },
    KeyRule {
        name: "uuid_or_string_type",
        description: "uuid, char or varchar type",
        delta: 10,
        group: Some("type"),
        predicate: KeyPredicate::TypeIn(&[
            "uuid",
            "uniqueidentifier",
            "char",
            "character",
            "varchar",
            "character varying",
        ]),
    },
    KeyRule {
        name: "large_table",
        description: "Table has more rows than the large-table threshold",
        delta: 5,
        group: None,
        predicate: KeyPredicate::LargeTable,
    },
];

/// Score a natural key candidate.
pub fn key_score(facts: &KeyFacts<'_>) -> RuleScore {
    let mut claimed: Vec<&'static str> = Vec::new();
    let mut adjustments = Vec::new();
    for rule in KEY_RULES.iter().filter(|rule| rule.applies(facts)) {
        if let Some(group) = rule.group {
            if claimed.contains(&group) {
                continue;
            }
            claimed.push(group);
        }
        adjustments.push(ScoreAdjustment {
            rule: rule.name,
            delta: rule.delta,
        });
    }
    let raw = KEY_BASE_SCORE + adjustments.iter().map(|a| a.delta).sum::<i32>();
    RuleScore {
        score: clamp_score(raw),
        adjustments,
    }
}

// ---------------------------------------------------------------------------
// Relationship rules
// ---------------------------------------------------------------------------

/// Facts about a (candidate column → key column) pair.
#[derive(Debug, Clone)]
pub struct RelationshipFacts<'a> {
    pub candidate_column: &'a str,
    pub candidate_nullable: bool,
    pub target_data_type: &'a str,
    pub type_match: bool,
    pub naming_match: bool,
}

#[derive(Debug, Clone, Copy)]
enum RelationshipPredicate {
    TypeMatch,
    NamingMatch,
    TargetFamily(TypeFamily),
    UnderscoreIdSuffix,
    /// Ends with `id` but not `_id`.
    BareIdSuffix,
    Nullable,
}

/// A relationship scoring rule.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipRule {
    pub name: &'static str,
    pub description: &'static str,
    pub delta: i32,
    predicate: RelationshipPredicate,
}

impl RelationshipRule {
    fn applies(&self, facts: &RelationshipFacts<'_>) -> bool {
        let name = facts.candidate_column.to_lowercase();
        match self.predicate {
            RelationshipPredicate::TypeMatch => facts.type_match,
            RelationshipPredicate::NamingMatch => facts.naming_match,
            RelationshipPredicate::TargetFamily(family) => {
                type_family(facts.target_data_type) == family
            }
            RelationshipPredicate::UnderscoreIdSuffix => name.ends_with("_id"),
            RelationshipPredicate::BareIdSuffix => name.ends_with("id") && !name.ends_with("_id"),
            RelationshipPredicate::Nullable => facts.candidate_nullable,
        }
    }
}

/// Foreign key candidate rules, applied additively from zero.
pub static RELATIONSHIP_RULES: &[RelationshipRule] = &[
    RelationshipRule {
        name: "type_compatible",
        description: "Candidate and key types are compatible",
        delta: 40,
        predicate: RelationshipPredicate::TypeMatch,
    },
    RelationshipRule {
        name: "naming_pattern",
        description: "Candidate name follows a reference naming pattern",
        delta: 35,
        predicate: RelationshipPredicate::NamingMatch,
    },
    RelationshipRule {
        name: "integer_target",
        description: "Key column is integer-family",
        delta: 10,
        predicate: RelationshipPredicate::TargetFamily(TypeFamily::Integer),
    },
    RelationshipRule {
        name: "underscore_id_suffix",
        description: "Candidate name ends with _id",
        delta: 10,
        predicate: RelationshipPredicate::UnderscoreIdSuffix,
    },
    RelationshipRule {
        name: "id_suffix",
        description: "Candidate name ends with id",
        delta: 5,
        predicate: RelationshipPredicate::BareIdSuffix,
    },
    RelationshipRule {
        name: "nullable",
        description: "Candidate column is nullable",
        delta: 5,
        predicate: RelationshipPredicate::Nullable,
    },
];

/// Score a foreign key candidate.
pub fn relationship_score(facts: &RelationshipFacts<'_>) -> RuleScore {
    let adjustments: Vec<ScoreAdjustment> = RELATIONSHIP_RULES
        .iter()
        .filter(|rule| rule.applies(facts))
        .map(|rule| ScoreAdjustment {
            rule: rule.name,
            delta: rule.delta,
        })
        .collect();
    let raw = adjustments.iter().map(|a| a.delta).sum::<i32>();
    RuleScore {
        score: clamp_score(raw),
        adjustments,
    }
}

// ---------------------------------------------------------------------------
// Reference naming patterns
// ---------------------------------------------------------------------------

/// The naming pattern by which `candidate` appears to reference
/// `target_table.target_column`, if any.
pub fn naming_pattern(target_table: &str, target_column: &str, candidate: &str) -> Option<&'static str> {
    let candidate = candidate.to_lowercase();
    let table = target_table.to_lowercase();
    let with_id = |stem: &str| candidate == format!("{}_id", stem) || candidate == format!("{}id", stem);

    if candidate == target_column.to_lowercase() {
        return Some("exact_column");
    }
    if with_id(&table) {
        return Some("table_id");
    }
    if table.chars().count() > 3 {
        let abbreviation: String = table.chars().take(3).collect();
        if with_id(&abbreviation) {
            return Some("abbreviation_id");
        }
    }
    let singular = singular_table_name(&table);
    if !singular.is_empty() && singular != table && with_id(&singular) {
        return Some("singular_table_id");
    }
    None
}
