//! End-to-end checks: every compiled query must return the same rows from
//! the SQL interpreter as the provider tree returns from the provider
//! interpreter, for every dialect that can express it.

use std::sync::Arc;

use relsql::dialect::Dialect;
use relsql::dom::{SqlSelect, SqlStatement};
use relsql::eval::{self, Database, Row};
use relsql::precompile::{PreCompiler, ProviderSimplifier};
use relsql::provider::{
    table, AggregateColumn, AggregateKind, ApplyType, BinaryOp, Expr, JoinType, ParameterArena,
    Provider, ProviderExt, ProviderRef, ScalarMode, SortKey, TableBuilder, TableExt, TableInfo,
};
use relsql::translator::check_syntax;
use relsql::value::{ColumnType, Value};
use relsql::{Config, Error, QueryPipeline};

fn dialects() -> Vec<Dialect> {
    vec![
        Dialect::sql_server(9),
        Dialect::sql_server(10),
        Dialect::sql_server(11),
        Dialect::postgres(9, 3),
        Dialect::postgres(11, 0),
        Dialect::mysql(5, 6),
        Dialect::mysql(8, 0),
        Dialect::sqlite(),
    ]
}

fn pipeline(dialect: Dialect) -> QueryPipeline {
    QueryPipeline::for_dialect(dialect).unwrap()
}

fn orders() -> Arc<TableInfo> {
    table(
        "Orders",
        &[("Id", ColumnType::Int), ("ProductName", ColumnType::String)],
    )
}

fn products() -> Arc<TableInfo> {
    table(
        "Products",
        &[
            ("Id", ColumnType::Int),
            ("Name", ColumnType::String),
            ("Price", ColumnType::Int),
        ],
    )
}

fn row(values: &[Value]) -> Row {
    values.to_vec()
}

fn shop(product_rows: Vec<Row>) -> Database {
    Database::new()
        .with_table(
            &orders(),
            vec![
                row(&[Value::Int(1), "apple".into()]),
                row(&[Value::Int(2), "pear".into()]),
                row(&[Value::Int(3), "kiwi".into()]),
                row(&[Value::Int(4), Value::Null]),
                row(&[Value::Int(5), "apple".into()]),
            ],
        )
        .unwrap()
        .with_table(&products(), product_rows)
        .unwrap()
}

fn unique_products() -> Database {
    shop(vec![
        row(&[Value::Int(10), "apple".into(), Value::Int(3)]),
        row(&[Value::Int(11), "pear".into(), Value::Int(5)]),
        row(&[Value::Int(12), "plum".into(), Value::Int(7)]),
    ])
}

fn duplicate_products() -> Database {
    shop(vec![
        row(&[Value::Int(10), "apple".into(), Value::Int(3)]),
        row(&[Value::Int(11), "pear".into(), Value::Int(5)]),
        row(&[Value::Int(12), "apple".into(), Value::Int(4)]),
    ])
}

fn statement(query: &relsql::compiler::CompiledQuery) -> &SqlSelect {
    match &query.statement {
        SqlStatement::Select(s) => s,
        other => panic!("expected select, got {:?}", other),
    }
}

/// Rows from the provider interpreter and from the compiled SQL.
fn run_both(pipeline: &QueryPipeline, root: &ProviderRef, db: &Database) -> (Vec<Row>, Vec<Row>) {
    let expected = eval::evaluate(root, db).unwrap();
    let query = pipeline
        .compile_query(root)
        .unwrap_or_else(|e| panic!("{}: {}", pipeline.dialect(), e.format_detailed()));
    let actual = eval::execute(statement(&query), db, &query.parameters)
        .unwrap_or_else(|e| panic!("{}: {}", pipeline.dialect(), e));
    pipeline
        .compile(root)
        .unwrap_or_else(|e| panic!("{}: {}", pipeline.dialect(), e.format_detailed()));
    (expected, actual)
}

fn assert_same_rows(root: &ProviderRef, db: &Database) {
    for dialect in dialects() {
        let (expected, actual) = run_both(&pipeline(dialect), root, db);
        assert_eq!(eval::sorted(expected), eval::sorted(actual), "{}", dialect);
    }
}

/// `Orders` applied to the single product named by each order.
fn single_product_apply() -> ProviderRef {
    let mut arena = ParameterArena::new();
    let p = arena.allocate();
    let right = products()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::outer(p, 1)));
    orders().scan().apply(
        right,
        p,
        ApplyType::Scalar(ScalarMode::Single),
        JoinType::LeftOuter,
    )
}

#[test]
fn test_single_or_default_apply_becomes_join() {
    let root = single_product_apply();
    let rewritten = pipeline(Dialect::sqlite()).precompile(&root).unwrap();
    match rewritten.as_ref() {
        Provider::PredicateJoin {
            left,
            right,
            join_type,
            predicate,
        } => {
            assert_eq!(left.label(), "Index(Orders)");
            assert_eq!(right.label(), "Index(Products)");
            assert_eq!(*join_type, JoinType::LeftOuter);
            // Products.Name (2 + 1) == Orders.ProductName (1)
            assert_eq!(*predicate, Expr::eq(Expr::col(3), Expr::col(1)));
        }
        other => panic!("expected predicate join, got {:?}", other),
    }
}

#[test]
fn test_corrected_apply_keeps_rows() {
    let root = single_product_apply();
    let db = unique_products();
    let corrected = pipeline(Dialect::sqlite()).precompile(&root).unwrap();
    assert_eq!(
        eval::sorted(eval::evaluate(&root, &db).unwrap()),
        eval::sorted(eval::evaluate(&corrected, &db).unwrap())
    );
    assert_same_rows(&root, &db);
}

#[test]
fn test_first_row_apply_emulated_per_dialect() {
    let mut arena = ParameterArena::new();
    let p = arena.allocate();
    let right = products()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::outer(p, 1)))
        .select(vec![2]);
    let root = orders().scan().apply(
        right,
        p,
        ApplyType::Scalar(ScalarMode::First),
        JoinType::LeftOuter,
    );
    assert_same_rows(&root, &duplicate_products());
}

#[test]
fn test_correlated_count_stays_apply() {
    let mut arena = ParameterArena::new();
    let p = arena.allocate();
    let right = products()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::outer(p, 1)))
        .aggregate(
            vec![],
            vec![AggregateColumn {
                name: "n".into(),
                kind: AggregateKind::Count,
                column: None,
            }],
        );
    let root = orders().scan().apply(
        right,
        p,
        ApplyType::Scalar(ScalarMode::Single),
        JoinType::LeftOuter,
    );
    let rewritten = pipeline(Dialect::sqlite()).precompile(&root).unwrap();
    assert_eq!(rewritten.kind_name(), "Apply");

    let db = duplicate_products();
    let counts: Vec<Value> = eval::evaluate(&root, &db)
        .unwrap()
        .into_iter()
        .map(|r| r[2].clone())
        .collect();
    let expected: Vec<Value> = [2, 1, 0, 0, 2].into_iter().map(Value::Int).collect();
    assert_eq!(counts, expected);
    assert_same_rows(&root, &db);
}

#[test]
fn test_existence_apply_matches() {
    let mut arena = ParameterArena::new();
    let p = arena.allocate();
    let right = products().scan().filter(Expr::and(
        Expr::eq(Expr::col(1), Expr::outer(p, 1)),
        Expr::binary(BinaryOp::Gt, Expr::col(2), Expr::lit(3i64)),
    ));
    let root = orders()
        .scan()
        .apply(right, p, ApplyType::Existence, JoinType::Inner);
    assert_same_rows(&root, &duplicate_products());
}

#[test]
fn test_strict_mode_reports_correction_fault() {
    let mut arena = ParameterArena::new();
    let p = arena.allocate();
    let right = products()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::outer(p, 1)))
        .aggregate(
            vec![],
            vec![AggregateColumn {
                name: "total".into(),
                kind: AggregateKind::Sum,
                column: Some(2),
            }],
        );
    let root = orders().scan().apply(
        right,
        p,
        ApplyType::Scalar(ScalarMode::Single),
        JoinType::LeftOuter,
    );
    let mut config = Config::default();
    config.precompile.strict_apply_correction = true;
    let strict = QueryPipeline::new(&config).unwrap();
    let err = strict.compile(&root).unwrap_err();
    match &err {
        Error::Pass { pass, source } => {
            assert_eq!(pass, "apply_corrector");
            assert!(matches!(source.as_ref(), Error::CorrectionFault { .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.format_detailed().contains("Apply/right/Aggregate"));
}

fn person() -> Arc<TableInfo> {
    TableBuilder::new("Person")
        .columns(&[
            ("Id", ColumnType::Int),
            ("Email", ColumnType::String),
            ("FirstName", ColumnType::String),
            ("LastName", ColumnType::String),
        ])
        .primary_key(&[0])
        .index("IX_Email", &[1], true)
        .index("IX_Name", &[2, 3], false)
        .build()
}

fn people() -> Database {
    Database::new()
        .with_table(
            &person(),
            vec![
                row(&[Value::Int(1), "ann@example.com".into(), "Ann".into(), "Lee".into()]),
                row(&[Value::Int(2), "x".into(), "Bob".into(), "Stone".into()]),
                row(&[Value::Int(3), "cy@example.com".into(), "Cy".into(), "Lee".into()]),
            ],
        )
        .unwrap()
}

#[test]
fn test_email_lookup_uses_email_index() {
    let root = person()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::lit("x")));
    let rewritten = pipeline(Dialect::sql_server(11)).precompile(&root).unwrap();
    let Provider::Filter { source, .. } = rewritten.as_ref() else {
        panic!("expected filter, got {:?}", rewritten)
    };
    match source.as_ref() {
        Provider::RangeScan { index, .. } => assert_eq!(index.name, "IX_Email"),
        other => panic!("expected range scan, got {:?}", other),
    }

    let command = pipeline(Dialect::sql_server(11)).compile(&root).unwrap();
    assert!(command.sql.contains("WITH (INDEX([IX_Email]))"), "{}", command.sql);
    let command = pipeline(Dialect::postgres(11, 0)).compile(&root).unwrap();
    assert!(!command.sql.contains("IX_Email"), "{}", command.sql);

    let db = people();
    assert_eq!(eval::evaluate(&root, &db).unwrap().len(), 1);
    assert_same_rows(&root, &db);
}

#[test]
fn test_name_prefix_uses_compound_index() {
    let root = person()
        .scan()
        .filter(Expr::eq(Expr::col(2), Expr::lit("Ann")))
        .select(vec![0, 3]);
    let rewritten = pipeline(Dialect::sqlite()).precompile(&root).unwrap();
    let mut found = None;
    let mut node = &rewritten;
    loop {
        match node.as_ref() {
            Provider::RangeScan { index, .. } => {
                found = Some(index.name.clone());
                break;
            }
            Provider::Select { source, .. } | Provider::Filter { source, .. } => node = source,
            _ => break,
        }
    }
    assert_eq!(found.as_deref(), Some("IX_Name"));
    assert_same_rows(&root, &people());
}

fn numbered() -> (Arc<TableInfo>, Database) {
    let items = table("Items", &[("Id", ColumnType::Int), ("Label", ColumnType::String)]);
    let ids = [7i64, 2, 11, 5, 1, 9, 12, 3, 8, 4, 10, 6];
    let rows = ids
        .iter()
        .map(|&i| row(&[i.into(), format!("item {}", i).into()]))
        .collect();
    let db = Database::new().with_table(&items, rows).unwrap();
    (items, db)
}

#[test]
fn test_paging_window_is_the_same_everywhere() {
    let (items, db) = numbered();
    let root = items.scan().sort(vec![SortKey::asc(0)]).skip(3).take(5);
    let expected: Vec<Row> = (4..=8)
        .map(|i: i64| row(&[i.into(), format!("item {}", i).into()]))
        .collect();
    assert_eq!(eval::evaluate(&root, &db).unwrap(), expected);

    for dialect in dialects() {
        let (_, actual) = run_both(&pipeline(dialect), &root, &db);
        assert_eq!(actual, expected, "{}", dialect);
    }

    for old in [Dialect::sql_server(9), Dialect::sql_server(10)] {
        let sql = pipeline(old).compile(&root).unwrap().sql;
        assert!(sql.starts_with("SELECT TOP 5 "), "{}", sql);
        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY"), "{}", sql);
    }
    let sql = pipeline(Dialect::sql_server(11)).compile(&root).unwrap().sql;
    assert!(sql.ends_with("OFFSET 3 ROWS FETCH NEXT 5 ROWS ONLY"), "{}", sql);
    let sql = pipeline(Dialect::postgres(11, 0)).compile(&root).unwrap().sql;
    assert!(sql.ends_with("LIMIT 5 OFFSET 3"), "{}", sql);
}

#[test]
fn test_descending_page_after_projection() {
    let (items, db) = numbered();
    let root = items
        .scan()
        .sort(vec![SortKey::desc(0)])
        .select(vec![1])
        .skip(2)
        .take(3);
    for dialect in dialects() {
        let (expected, actual) = run_both(&pipeline(dialect), &root, &db);
        assert_eq!(actual, expected, "{}", dialect);
    }
}

#[test]
fn test_grouped_totals_match() {
    let root = products().scan().aggregate(
        vec![1],
        vec![
            AggregateColumn {
                name: "n".into(),
                kind: AggregateKind::Count,
                column: None,
            },
            AggregateColumn {
                name: "total".into(),
                kind: AggregateKind::Sum,
                column: Some(2),
            },
        ],
    );
    assert_same_rows(&root, &duplicate_products());
}

#[test]
fn test_parameterized_literals_bind_the_same_rows() {
    let root = orders()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::lit("apple")))
        .join(
            products()
                .scan()
                .filter(Expr::binary(BinaryOp::Lt, Expr::col(2), Expr::lit(5i64))),
            vec![(1, 1)],
        );
    let db = duplicate_products();
    for dialect in dialects() {
        let mut config = Config::default();
        config.dialect.target = dialect;
        config.compiler.parameterize_literals = true;
        let pipeline = QueryPipeline::new(&config).unwrap();
        let (expected, actual) = run_both(&pipeline, &root, &db);
        assert_eq!(eval::sorted(expected), eval::sorted(actual), "{}", dialect);
        assert_eq!(pipeline.compile(&root).unwrap().parameters.len(), 2);
    }
}

#[test]
fn test_compilation_is_deterministic() {
    let (items, _) = numbered();
    let root = single_product_apply().join(
        items.scan().sort(vec![SortKey::asc(0)]).take(3),
        vec![(0, 0)],
    );
    for dialect in dialects() {
        let first = pipeline(dialect).compile(&root).unwrap();
        let second = pipeline(dialect).compile(&root).unwrap();
        assert_eq!(first, second, "{}", dialect);
    }
}

#[test]
fn test_self_join_reuses_compiled_subtree() {
    let (items, db) = numbered();
    // not an index range, so pre-compilation keeps the subtree shared
    let small = items
        .scan()
        .filter(Expr::binary(BinaryOp::Like, Expr::col(1), Expr::lit("item 1%")));
    let root = small.clone().join(small, vec![(0, 0)]);
    let pipeline = pipeline(Dialect::postgres(11, 0));
    let query = pipeline.compile_query(&root).unwrap();
    assert_eq!(query.cache_hits, 1);
    let (expected, actual) = run_both(&pipeline, &root, &db);
    assert_eq!(expected.len(), 4);
    assert_eq!(eval::sorted(expected), eval::sorted(actual));
}

#[test]
fn test_simplifier_reaches_a_fixed_point() {
    let root = person()
        .scan()
        .filter(Expr::eq(Expr::col(2), Expr::lit("Ann")))
        .filter(Expr::eq(Expr::col(3), Expr::lit("Lee")))
        .select(vec![0, 1, 2, 3])
        .select(vec![3, 0]);
    let once = ProviderSimplifier.process(&root).unwrap();
    let twice = ProviderSimplifier.process(&once).unwrap();
    assert_eq!(once, twice);
    let db = people();
    assert_eq!(
        eval::evaluate(&root, &db).unwrap(),
        eval::evaluate(&once, &db).unwrap()
    );
}

#[test]
fn test_emitted_sql_parses() {
    let (items, _) = numbered();
    let trees = vec![
        items.scan().sort(vec![SortKey::asc(0)]).skip(3).take(5),
        single_product_apply(),
        products().scan().aggregate(
            vec![1],
            vec![AggregateColumn {
                name: "n".into(),
                kind: AggregateKind::Count,
                column: None,
            }],
        ),
        orders()
            .scan()
            .filter(Expr::eq(Expr::col(1), Expr::lit("it's")))
            .select(vec![0])
            .distinct(),
    ];
    let targets = [
        Dialect::sql_server(10),
        Dialect::sql_server(11),
        Dialect::postgres(11, 0),
        Dialect::mysql(8, 0),
        Dialect::sqlite(),
    ];
    for dialect in targets {
        let mut config = Config::default();
        config.dialect.target = dialect;
        config.precompile.index_selection = false;
        let pipeline = QueryPipeline::new(&config).unwrap();
        for tree in &trees {
            let sql = pipeline.compile(tree).unwrap().sql;
            assert_eq!(
                check_syntax(dialect, &sql).unwrap_or_else(|e| panic!("{}\n{}", e, sql)),
                1
            );
        }
    }
}
