//! Benchmarks for the relsql compilation pipeline.
//!
//! Benchmarks cover:
//! - Pre-compilation passes (simplifier, Apply correction, index selection)
//! - Compilation (provider tree → SQL DOM)
//! - Rendering (SQL DOM → dialect text)
//! - Full pipeline per dialect
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relsql::compiler::{CompilerChain, CompilerOptions};
use relsql::dialect::{Capabilities, Dialect};
use relsql::provider::{
    table, AggregateColumn, AggregateKind, ApplyType, BinaryOp, Expr, JoinType, ParameterArena,
    ProviderExt, ProviderRef, ScalarMode, SortKey, TableBuilder, TableExt, TableInfo,
};
use relsql::translator::Translator;
use relsql::value::ColumnType;
use relsql::QueryPipeline;

// ---------------------------------------------------------------------------
// Provider trees organized by complexity
// ---------------------------------------------------------------------------

fn orders() -> Arc<TableInfo> {
    table(
        "Orders",
        &[
            ("Id", ColumnType::Int),
            ("ProductName", ColumnType::String),
            ("Quantity", ColumnType::Int),
        ],
    )
}

fn products() -> Arc<TableInfo> {
    table(
        "Products",
        &[
            ("Id", ColumnType::Int),
            ("Name", ColumnType::String),
            ("Price", ColumnType::Float),
        ],
    )
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

fn simple_scan() -> ProviderRef {
    orders()
        .scan()
        .filter(Expr::binary(BinaryOp::Gt, Expr::col(2), Expr::lit(10i64)))
        .select(vec![0, 1])
}

fn index_lookup() -> ProviderRef {
    person()
        .scan()
        .filter(Expr::and(
            Expr::eq(Expr::col(1), Expr::lit("x@example.com")),
            Expr::eq(Expr::col(2), Expr::lit("Ann")),
        ))
        .select(vec![0, 3])
}

fn correlated_apply() -> ProviderRef {
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

fn correlated_aggregate() -> ProviderRef {
    let mut arena = ParameterArena::new();
    let p = arena.allocate();
    let right = orders()
        .scan()
        .filter(Expr::eq(Expr::col(1), Expr::outer(p, 1)))
        .aggregate(
            vec![],
            vec![AggregateColumn {
                name: "sold".into(),
                kind: AggregateKind::Sum,
                column: Some(2),
            }],
        );
    products().scan().apply(
        right,
        p,
        ApplyType::Scalar(ScalarMode::Single),
        JoinType::LeftOuter,
    )
}

fn paged_report() -> ProviderRef {
    orders()
        .scan()
        .join(products().scan(), vec![(1, 1)])
        .filter(Expr::binary(BinaryOp::GtEq, Expr::col(2), Expr::lit(1i64)))
        .sort(vec![SortKey::desc(5), SortKey::asc(0)])
        .select(vec![0, 4, 5])
        .skip(20)
        .take(10)
}

fn cases() -> Vec<(&'static str, ProviderRef)> {
    vec![
        ("simple_scan", simple_scan()),
        ("index_lookup", index_lookup()),
        ("correlated_apply", correlated_apply()),
        ("correlated_aggregate", correlated_aggregate()),
        ("paged_report", paged_report()),
    ]
}

// ---------------------------------------------------------------------------
// Benchmark groups
// ---------------------------------------------------------------------------

fn bench_precompile(c: &mut Criterion) {
    let mut group = c.benchmark_group("precompile");
    let pipeline = QueryPipeline::for_dialect(Dialect::sql_server(11)).unwrap();

    for (name, tree) in &cases() {
        group.bench_with_input(BenchmarkId::new("passes", name), tree, |b, tree| {
            b.iter(|| pipeline.precompile(black_box(tree)).unwrap());
        });
    }

    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");
    let pipeline = QueryPipeline::for_dialect(Dialect::sql_server(11)).unwrap();
    let caps = Capabilities::resolve(Dialect::sql_server(11)).unwrap();
    let chain = CompilerChain::with_defaults(caps, CompilerOptions::default());

    for (name, tree) in &cases() {
        let rewritten = pipeline.precompile(tree).unwrap();
        group.bench_with_input(BenchmarkId::new("compile", name), &rewritten, |b, tree| {
            b.iter(|| chain.compile(black_box(tree)).unwrap());
        });
    }

    group.finish();
}

fn bench_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");
    let dialects = [
        Dialect::sql_server(10),
        Dialect::postgres(11, 0),
        Dialect::mysql(8, 0),
        Dialect::sqlite(),
    ];

    for dialect in dialects {
        let pipeline = QueryPipeline::for_dialect(dialect).unwrap();
        let translator = Translator::new(dialect).unwrap();
        let statement = pipeline.compile_query(&paged_report()).unwrap().statement;
        group.bench_with_input(
            BenchmarkId::new("render", dialect.to_string()),
            &statement,
            |b, statement| {
                b.iter(|| translator.render(black_box(statement)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    let dialects = [
        Dialect::sql_server(9),
        Dialect::sql_server(11),
        Dialect::postgres(11, 0),
        Dialect::sqlite(),
    ];

    for dialect in dialects {
        let pipeline = QueryPipeline::for_dialect(dialect).unwrap();
        for (name, tree) in &cases() {
            group.bench_with_input(
                BenchmarkId::new(format!("pipeline/{}", dialect), name),
                tree,
                |b, tree| {
                    b.iter(|| pipeline.compile(black_box(tree)).unwrap());
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_precompile,
    bench_compilation,
    bench_rendering,
    bench_round_trip,
);
criterion_main!(benches);
