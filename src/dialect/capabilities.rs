//! Versioned capability table keyed by (dialect, feature).
//!
//! Each vendor has an ordered list of version entries. An entry only lists
//! what changed relative to its predecessor; looking a feature up for a
//! dialect walks back from the newest entry not newer than the dialect's
//! version until some entry defines it. A feature no entry defines is a
//! capability gap for that dialect.

use std::collections::HashMap;

use super::{Dialect, Vendor, Version};
use crate::error::{Error, Result};
use crate::value::ColumnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Pagination,
    Apply,
    Identity,
    Sequences,
    StringLiteral,
    DateTimeLiteral,
    DateLiteral,
    TimeLiteral,
    IntervalLiteral,
    DateAdd,
    BooleanLiteral,
    IndexHint,
    FullText,
    PartitionSplitMerge,
    DropTableIfExists,
    ValuesTable,
    IncludedColumns,
    ParameterPlaceholder,
    Concat,
    Length,
    Substring,
    IdentifierQuote,
    /// Column type name used in DDL.
    Type(ColumnType),
    /// Length-bounded string type, rendered as `name(n)`.
    BoundedString,
    /// Table named in `FROM` when a select without a source has a `WHERE`.
    DummyTable,
}

impl Feature {
    pub fn description(self) -> &'static str {
        match self {
            Feature::Pagination => "row paging",
            Feature::Apply => "correlated table joins (APPLY/LATERAL)",
            Feature::Identity => "identity columns",
            Feature::Sequences => "sequences",
            Feature::StringLiteral => "string literals",
            Feature::DateTimeLiteral => "datetime literals",
            Feature::DateLiteral => "date values",
            Feature::TimeLiteral => "time values",
            Feature::IntervalLiteral => "interval values",
            Feature::DateAdd => "date arithmetic",
            Feature::BooleanLiteral => "boolean literals",
            Feature::IndexHint => "index hints",
            Feature::FullText => "full-text search",
            Feature::PartitionSplitMerge => "partition function SPLIT/MERGE",
            Feature::DropTableIfExists => "DROP TABLE IF EXISTS",
            Feature::ValuesTable => "VALUES table constructors",
            Feature::IncludedColumns => "included index columns",
            Feature::ParameterPlaceholder => "query parameters",
            Feature::Concat => "string concatenation",
            Feature::Length => "string length",
            Feature::Substring => "substring",
            Feature::IdentifierQuote => "quoted identifiers",
            Feature::Type(ColumnType::Bool) => "bool columns",
            Feature::Type(ColumnType::Int) => "int columns",
            Feature::Type(ColumnType::Float) => "float columns",
            Feature::Type(ColumnType::String) => "string columns",
            Feature::Type(ColumnType::DateTime) => "datetime columns",
            Feature::Type(ColumnType::Date) => "date columns",
            Feature::Type(ColumnType::Time) => "time columns",
            Feature::Type(ColumnType::Interval) => "interval columns",
            Feature::BoundedString => "length-bounded strings",
            Feature::DummyTable => "source-less filtered selects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `LIMIT n OFFSET m`; `unbounded` is the LIMIT text required when only
    /// an offset is present.
    LimitOffset { unbounded: Option<&'static str> },
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`, requires ORDER BY.
    OffsetFetch,
    /// `TOP n` only; offsets are emulated with ROW_NUMBER.
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySyntax {
    CrossApply,
    Lateral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySyntax {
    /// `IDENTITY(seed, increment)`
    Identity,
    /// `SERIAL` / `BIGSERIAL`
    Serial,
    /// `GENERATED BY DEFAULT AS IDENTITY (START WITH s INCREMENT BY i)`
    Generated,
    /// `AUTO_INCREMENT` plus a table-level start value
    AutoIncrement,
    /// `INTEGER PRIMARY KEY AUTOINCREMENT`
    Autoincrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringPrefix {
    None,
    /// `N'...'`
    National,
    /// `E'...'`
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringEscape {
    pub backslash: bool,
    pub prefix: StringPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    /// `TIMESTAMP '...'`
    Keyword(&'static str),
    /// `CAST('...' AS type)` with an ISO `T` separator
    Cast(&'static str),
    /// plain string
    Quoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFormat {
    pub style: LiteralStyle,
    /// Fractional second digits kept in literals.
    pub precision: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalStyle {
    /// `INTERVAL '-3 days -04:05:06.789000'`
    Native,
    /// bigint count of 100ns ticks
    Ticks,
    /// bigint count of microseconds
    Microseconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAddStyle {
    /// `DATEADD(ms, ..., DATEADD(day, ..., x))` over ticks
    DateAddFunction,
    /// `x + interval`
    Plus,
    /// `DATE_ADD(x, INTERVAL n MICROSECOND)`
    DateAddMicrosecond,
    /// `strftime('%Y-%m-%d %H:%M:%f', x, n || ' seconds')`
    Strftime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanStyle {
    /// `TRUE`/`FALSE`, predicates usable as values
    Native,
    /// bit values; predicates and values never mix without conversion
    Bit,
    /// `1`/`0`
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintStyle {
    /// `table WITH (INDEX(name))`
    TableHint,
    /// `table FORCE INDEX (name)`
    ForceIndex,
    /// `table INDEXED BY name`
    IndexedBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullTextStyle {
    /// `FREETEXT((c1, c2), query)`
    FreeText,
    /// `to_tsvector(c1 || ' ' || c2) @@ plainto_tsquery(query)`
    TsQuery,
    /// `MATCH (c1, c2) AGAINST (query)`
    MatchAgainst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropIfExistsStyle {
    Native,
    /// `IF OBJECT_ID(N'name', N'U') IS NOT NULL DROP TABLE name`
    ObjectIdCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `@p0`
    AtName,
    /// `$1`
    Dollar,
    /// `?`
    Question,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatStyle {
    Plus,
    Pipes,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Brackets,
    DoubleQuotes,
    Backticks,
}

/// Value of one feature in one version entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Supported,
    Pagination(Pagination),
    Apply(ApplySyntax),
    Identity(IdentitySyntax),
    String(StringEscape),
    Temporal(TemporalFormat),
    Interval(IntervalStyle),
    DateAdd(DateAddStyle),
    Boolean(BooleanStyle),
    IndexHint(IndexHintStyle),
    FullText(FullTextStyle),
    DropIfExists(DropIfExistsStyle),
    Placeholder(Placeholder),
    Concat(ConcatStyle),
    FunctionName(&'static str),
    TypeName(&'static str),
    Quote(QuoteStyle),
}

struct VersionEntry {
    version: Version,
    features: &'static [(Feature, Capability)],
}

use Capability as C;
use Feature as F;

const SQL_SERVER: &[VersionEntry] = &[
    VersionEntry {
        version: Version::new(9, 0),
        features: &[
            (F::Pagination, C::Pagination(Pagination::Top)),
            (F::Apply, C::Apply(ApplySyntax::CrossApply)),
            (F::Identity, C::Identity(IdentitySyntax::Identity)),
            (
                F::StringLiteral,
                C::String(StringEscape {
                    backslash: false,
                    prefix: StringPrefix::National,
                }),
            ),
            (
                F::DateTimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Cast("datetime"),
                    precision: 3,
                }),
            ),
            (F::IntervalLiteral, C::Interval(IntervalStyle::Ticks)),
            (F::DateAdd, C::DateAdd(DateAddStyle::DateAddFunction)),
            (F::BooleanLiteral, C::Boolean(BooleanStyle::Bit)),
            (F::IndexHint, C::IndexHint(IndexHintStyle::TableHint)),
            (F::FullText, C::FullText(FullTextStyle::FreeText)),
            (F::PartitionSplitMerge, C::Supported),
            (F::DropTableIfExists, C::DropIfExists(DropIfExistsStyle::ObjectIdCheck)),
            (F::IncludedColumns, C::Supported),
            (F::ParameterPlaceholder, C::Placeholder(Placeholder::AtName)),
            (F::Concat, C::Concat(ConcatStyle::Plus)),
            (F::Length, C::FunctionName("LEN")),
            (F::Substring, C::FunctionName("SUBSTRING")),
            (F::IdentifierQuote, C::Quote(QuoteStyle::Brackets)),
            (F::Type(ColumnType::Bool), C::TypeName("bit")),
            (F::Type(ColumnType::Int), C::TypeName("bigint")),
            (F::Type(ColumnType::Float), C::TypeName("float")),
            (F::Type(ColumnType::String), C::TypeName("nvarchar(max)")),
            (F::BoundedString, C::TypeName("nvarchar")),
            (F::Type(ColumnType::DateTime), C::TypeName("datetime")),
            (F::Type(ColumnType::Interval), C::TypeName("bigint")),
        ],
    },
    VersionEntry {
        version: Version::new(10, 0),
        features: &[
            (
                F::DateTimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Cast("datetime2"),
                    precision: 7,
                }),
            ),
            (
                F::DateLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Cast("date"),
                    precision: 0,
                }),
            ),
            (
                F::TimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Cast("time"),
                    precision: 7,
                }),
            ),
            (F::ValuesTable, C::Supported),
            (F::Type(ColumnType::DateTime), C::TypeName("datetime2")),
            (F::Type(ColumnType::Date), C::TypeName("date")),
            (F::Type(ColumnType::Time), C::TypeName("time")),
        ],
    },
    VersionEntry {
        version: Version::new(11, 0),
        features: &[
            (F::Pagination, C::Pagination(Pagination::OffsetFetch)),
            (F::Sequences, C::Supported),
        ],
    },
    VersionEntry {
        version: Version::new(13, 0),
        features: &[(F::DropTableIfExists, C::DropIfExists(DropIfExistsStyle::Native))],
    },
];

const POSTGRESQL: &[VersionEntry] = &[
    VersionEntry {
        version: Version::new(8, 3),
        features: &[
            (F::Pagination, C::Pagination(Pagination::LimitOffset { unbounded: None })),
            (F::Identity, C::Identity(IdentitySyntax::Serial)),
            (F::Sequences, C::Supported),
            (
                F::StringLiteral,
                C::String(StringEscape {
                    backslash: true,
                    prefix: StringPrefix::Escape,
                }),
            ),
            (
                F::DateTimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("TIMESTAMP"),
                    precision: 6,
                }),
            ),
            (
                F::DateLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("DATE"),
                    precision: 0,
                }),
            ),
            (
                F::TimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("TIME"),
                    precision: 6,
                }),
            ),
            (F::IntervalLiteral, C::Interval(IntervalStyle::Native)),
            (F::DateAdd, C::DateAdd(DateAddStyle::Plus)),
            (F::BooleanLiteral, C::Boolean(BooleanStyle::Native)),
            (F::FullText, C::FullText(FullTextStyle::TsQuery)),
            (F::DropTableIfExists, C::DropIfExists(DropIfExistsStyle::Native)),
            (F::ValuesTable, C::Supported),
            (F::ParameterPlaceholder, C::Placeholder(Placeholder::Dollar)),
            (F::Concat, C::Concat(ConcatStyle::Pipes)),
            (F::Length, C::FunctionName("LENGTH")),
            (F::Substring, C::FunctionName("SUBSTRING")),
            (F::IdentifierQuote, C::Quote(QuoteStyle::DoubleQuotes)),
            (F::Type(ColumnType::Bool), C::TypeName("boolean")),
            (F::Type(ColumnType::Int), C::TypeName("bigint")),
            (F::Type(ColumnType::Float), C::TypeName("double precision")),
            (F::Type(ColumnType::String), C::TypeName("text")),
            (F::BoundedString, C::TypeName("varchar")),
            (F::Type(ColumnType::DateTime), C::TypeName("timestamp")),
            (F::Type(ColumnType::Date), C::TypeName("date")),
            (F::Type(ColumnType::Time), C::TypeName("time")),
            (F::Type(ColumnType::Interval), C::TypeName("interval")),
        ],
    },
    VersionEntry {
        // standard_conforming_strings is on by default from 9.1
        version: Version::new(9, 1),
        features: &[(
            F::StringLiteral,
            C::String(StringEscape {
                backslash: false,
                prefix: StringPrefix::None,
            }),
        )],
    },
    VersionEntry {
        version: Version::new(9, 3),
        features: &[(F::Apply, C::Apply(ApplySyntax::Lateral))],
    },
    VersionEntry {
        version: Version::new(10, 0),
        features: &[(F::Identity, C::Identity(IdentitySyntax::Generated))],
    },
    VersionEntry {
        version: Version::new(11, 0),
        features: &[(F::IncludedColumns, C::Supported)],
    },
];

const MYSQL: &[VersionEntry] = &[
    VersionEntry {
        version: Version::new(5, 0),
        features: &[
            (
                F::Pagination,
                C::Pagination(Pagination::LimitOffset {
                    unbounded: Some("18446744073709551615"),
                }),
            ),
            (F::Identity, C::Identity(IdentitySyntax::AutoIncrement)),
            (
                F::StringLiteral,
                C::String(StringEscape {
                    backslash: true,
                    prefix: StringPrefix::None,
                }),
            ),
            (
                F::DateTimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("TIMESTAMP"),
                    precision: 0,
                }),
            ),
            (
                F::DateLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("DATE"),
                    precision: 0,
                }),
            ),
            (
                F::TimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("TIME"),
                    precision: 0,
                }),
            ),
            (F::IntervalLiteral, C::Interval(IntervalStyle::Microseconds)),
            (F::DateAdd, C::DateAdd(DateAddStyle::DateAddMicrosecond)),
            (F::BooleanLiteral, C::Boolean(BooleanStyle::Native)),
            (F::IndexHint, C::IndexHint(IndexHintStyle::ForceIndex)),
            (F::FullText, C::FullText(FullTextStyle::MatchAgainst)),
            (F::DropTableIfExists, C::DropIfExists(DropIfExistsStyle::Native)),
            (F::ParameterPlaceholder, C::Placeholder(Placeholder::Question)),
            (F::Concat, C::Concat(ConcatStyle::Function)),
            (F::Length, C::FunctionName("CHAR_LENGTH")),
            (F::Substring, C::FunctionName("SUBSTRING")),
            (F::IdentifierQuote, C::Quote(QuoteStyle::Backticks)),
            (F::Type(ColumnType::Bool), C::TypeName("boolean")),
            (F::Type(ColumnType::Int), C::TypeName("bigint")),
            (F::Type(ColumnType::Float), C::TypeName("double")),
            (F::Type(ColumnType::String), C::TypeName("longtext")),
            (F::BoundedString, C::TypeName("varchar")),
            (F::Type(ColumnType::DateTime), C::TypeName("datetime")),
            (F::Type(ColumnType::Date), C::TypeName("date")),
            (F::Type(ColumnType::Time), C::TypeName("time")),
            (F::Type(ColumnType::Interval), C::TypeName("bigint")),
            (F::DummyTable, C::TypeName("DUAL")),
        ],
    },
    VersionEntry {
        // fractional seconds
        version: Version::new(5, 6),
        features: &[
            (
                F::DateTimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("TIMESTAMP"),
                    precision: 6,
                }),
            ),
            (
                F::TimeLiteral,
                C::Temporal(TemporalFormat {
                    style: LiteralStyle::Keyword("TIME"),
                    precision: 6,
                }),
            ),
            (F::Type(ColumnType::DateTime), C::TypeName("datetime(6)")),
            (F::Type(ColumnType::Time), C::TypeName("time(6)")),
        ],
    },
    VersionEntry {
        version: Version::new(8, 0),
        features: &[(F::Apply, C::Apply(ApplySyntax::Lateral))],
    },
];

const SQLITE: &[VersionEntry] = &[VersionEntry {
    version: Version::new(3, 0),
    features: &[
        (
            F::Pagination,
            C::Pagination(Pagination::LimitOffset {
                unbounded: Some("-1"),
            }),
        ),
        (F::Identity, C::Identity(IdentitySyntax::Autoincrement)),
        (
            F::StringLiteral,
            C::String(StringEscape {
                backslash: false,
                prefix: StringPrefix::None,
            }),
        ),
        (
            F::DateTimeLiteral,
            C::Temporal(TemporalFormat {
                style: LiteralStyle::Quoted,
                precision: 3,
            }),
        ),
        (
            F::DateLiteral,
            C::Temporal(TemporalFormat {
                style: LiteralStyle::Quoted,
                precision: 0,
            }),
        ),
        (
            F::TimeLiteral,
            C::Temporal(TemporalFormat {
                style: LiteralStyle::Quoted,
                precision: 3,
            }),
        ),
        (F::IntervalLiteral, C::Interval(IntervalStyle::Microseconds)),
        (F::DateAdd, C::DateAdd(DateAddStyle::Strftime)),
        (F::BooleanLiteral, C::Boolean(BooleanStyle::Integer)),
        (F::IndexHint, C::IndexHint(IndexHintStyle::IndexedBy)),
        (F::DropTableIfExists, C::DropIfExists(DropIfExistsStyle::Native)),
        (F::ParameterPlaceholder, C::Placeholder(Placeholder::Question)),
        (F::Concat, C::Concat(ConcatStyle::Pipes)),
        (F::Length, C::FunctionName("LENGTH")),
        (F::Substring, C::FunctionName("SUBSTR")),
        (F::IdentifierQuote, C::Quote(QuoteStyle::DoubleQuotes)),
        (F::Type(ColumnType::Bool), C::TypeName("integer")),
        (F::Type(ColumnType::Int), C::TypeName("integer")),
        (F::Type(ColumnType::Float), C::TypeName("real")),
        (F::Type(ColumnType::String), C::TypeName("text")),
        (F::BoundedString, C::TypeName("varchar")),
        (F::Type(ColumnType::DateTime), C::TypeName("text")),
        (F::Type(ColumnType::Date), C::TypeName("text")),
        (F::Type(ColumnType::Time), C::TypeName("text")),
        (F::Type(ColumnType::Interval), C::TypeName("integer")),
    ],
}];

fn chain(vendor: Vendor) -> &'static [VersionEntry] {
    match vendor {
        Vendor::SqlServer => SQL_SERVER,
        Vendor::PostgreSql => POSTGRESQL,
        Vendor::MySql => MYSQL,
        Vendor::Sqlite => SQLITE,
    }
}

/// Newest version with an entry in the table.
pub fn latest_version(vendor: Vendor) -> Version {
    chain(vendor)
        .last()
        .map(|e| e.version)
        .unwrap_or(Version::new(0, 0))
}

/// Resolved feature set of one dialect.
#[derive(Debug, Clone)]
pub struct Capabilities {
    dialect: Dialect,
    features: HashMap<Feature, (Capability, Version)>,
}

impl Capabilities {
    pub fn resolve(dialect: Dialect) -> Result<Self> {
        let entries: Vec<&VersionEntry> = chain(dialect.vendor)
            .iter()
            .filter(|e| e.version <= dialect.version)
            .collect();
        if entries.is_empty() {
            return Err(Error::UnsupportedDialect(format!(
                "{} is older than any supported version",
                dialect
            )));
        }
        let mut features = HashMap::new();
        // oldest first so that newer entries override their predecessors
        for entry in entries {
            for (feature, capability) in entry.features {
                features.insert(*feature, (*capability, entry.version));
            }
        }
        Ok(Self { dialect, features })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn get(&self, feature: Feature) -> Option<Capability> {
        self.features.get(&feature).map(|(c, _)| *c)
    }

    /// Version entry the feature's value was inherited from.
    pub fn defined_in(&self, feature: Feature) -> Option<Version> {
        self.features.get(&feature).map(|(_, v)| *v)
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.features.contains_key(&feature)
    }

    /// Feature value or a capability-gap error naming `path`.
    pub fn require(&self, feature: Feature, path: &str) -> Result<Capability> {
        self.get(feature).ok_or_else(|| {
            Error::gap(self.dialect.to_string(), feature.description(), path)
        })
    }

    pub fn pagination(&self) -> Pagination {
        match self.get(Feature::Pagination) {
            Some(Capability::Pagination(p)) => p,
            _ => Pagination::Top,
        }
    }

    pub fn apply_syntax(&self) -> Option<ApplySyntax> {
        match self.get(Feature::Apply) {
            Some(Capability::Apply(a)) => Some(a),
            _ => None,
        }
    }

    pub fn index_hint(&self) -> Option<IndexHintStyle> {
        match self.get(Feature::IndexHint) {
            Some(Capability::IndexHint(h)) => Some(h),
            _ => None,
        }
    }

    pub fn boolean_style(&self) -> BooleanStyle {
        match self.get(Feature::BooleanLiteral) {
            Some(Capability::Boolean(b)) => b,
            _ => BooleanStyle::Integer,
        }
    }

    pub fn quote_style(&self) -> QuoteStyle {
        match self.get(Feature::IdentifierQuote) {
            Some(Capability::Quote(q)) => q,
            _ => QuoteStyle::DoubleQuotes,
        }
    }

    pub fn placeholder(&self) -> Placeholder {
        match self.get(Feature::ParameterPlaceholder) {
            Some(Capability::Placeholder(p)) => p,
            _ => Placeholder::Question,
        }
    }

    pub fn temporal(&self, feature: Feature, path: &str) -> Result<TemporalFormat> {
        match self.require(feature, path)? {
            Capability::Temporal(t) => Ok(t),
            other => Err(mismatch(feature, other)),
        }
    }

    pub fn function_name(&self, feature: Feature, path: &str) -> Result<&'static str> {
        match self.require(feature, path)? {
            Capability::FunctionName(n) => Ok(n),
            other => Err(mismatch(feature, other)),
        }
    }

    pub fn type_name(&self, feature: Feature, path: &str) -> Result<&'static str> {
        match self.require(feature, path)? {
            Capability::TypeName(n) => Ok(n),
            other => Err(mismatch(feature, other)),
        }
    }
}

fn mismatch(feature: Feature, capability: Capability) -> Error {
    Error::Config(format!(
        "capability table entry for {:?} has unexpected value {:?}",
        feature, capability
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_version_inherits_unchanged_features() {
        let caps = Capabilities::resolve(Dialect::sql_server(12)).unwrap();
        assert_eq!(caps.pagination(), Pagination::OffsetFetch);
        assert_eq!(caps.defined_in(Feature::Pagination), Some(Version::new(11, 0)));
        assert_eq!(caps.apply_syntax(), Some(ApplySyntax::CrossApply));
        assert_eq!(caps.defined_in(Feature::Apply), Some(Version::new(9, 0)));
    }

    #[test]
    fn test_old_version_lacks_newer_features() {
        let caps = Capabilities::resolve(Dialect::sql_server(10)).unwrap();
        assert_eq!(caps.pagination(), Pagination::Top);
        assert!(!caps.supports(Feature::Sequences));
        let pg = Capabilities::resolve(Dialect::postgres(9, 1)).unwrap();
        assert_eq!(pg.apply_syntax(), None);
        let pg = Capabilities::resolve(Dialect::postgres(9, 3)).unwrap();
        assert_eq!(pg.apply_syntax(), Some(ApplySyntax::Lateral));
    }

    #[test]
    fn test_gap_when_no_ancestor_defines_feature() {
        let caps = Capabilities::resolve(Dialect::sql_server(9)).unwrap();
        let err = caps.require(Feature::DateLiteral, "Literal").unwrap_err();
        assert!(matches!(err, Error::CapabilityGap { .. }));
        let sqlite = Capabilities::resolve(Dialect::sqlite()).unwrap();
        assert!(sqlite.require(Feature::FullText, "FullText").is_err());
    }

    #[test]
    fn test_too_old_version_rejected() {
        let err = Capabilities::resolve(Dialect::postgres(7, 4)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDialect(_)));
    }

    #[test]
    fn test_string_escaping_changes_between_versions() {
        let old = Capabilities::resolve(Dialect::postgres(8, 4)).unwrap();
        let new = Capabilities::resolve(Dialect::postgres(9, 1)).unwrap();
        assert_ne!(
            old.get(Feature::StringLiteral),
            new.get(Feature::StringLiteral)
        );
    }
}
