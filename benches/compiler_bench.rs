//! Benchmarks for the rule tree compiler and query gateway
//!
//! Run with: cargo bench

use querybuilder::compiler::SqlCompiler;
use querybuilder::db::Database;
use querybuilder::gateway::{GatewayConfig, QueryGateway};
use querybuilder::metadata::Catalog;
use querybuilder::rules::{Operator, Rule, RuleGroup, RuleNode, Scalar, SubqueryRef};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tempfile::tempdir;

/// A balanced tree with `width` rules per group, `depth` levels deep
fn create_tree(width: usize, depth: usize) -> RuleGroup {
    let mut rules: Vec<RuleNode> = (0..width)
        .map(|i| match i % 4 {
            0 => Rule::new("age", Operator::Gt, i as i64).into(),
            1 => Rule::new("city", Operator::Contains, "o").into(),
            2 => Rule::new("id", Operator::In, vec![Scalar::from(1), Scalar::from(2), Scalar::from(3)]).into(),
            _ => Rule::new("age", Operator::Between, vec![Scalar::from(20), Scalar::from(40)]).into(),
        })
        .collect();

    if depth > 1 {
        rules.push(create_tree(width, depth - 1).negated().into());
    }

    if depth % 2 == 0 {
        RuleGroup::or(rules)
    } else {
        RuleGroup::and(rules)
    }
}

fn bench_compile(c: &mut Criterion) {
    let compiler = SqlCompiler::new(Arc::new(Catalog::sample()));
    let mut group = c.benchmark_group("compile");

    for (width, depth) in [(4, 1), (8, 4), (16, 8)] {
        let tree = create_tree(width, depth);

        group.throughput(Throughput::Elements(tree.rule_count() as u64));

        group.bench_with_input(
            BenchmarkId::new("tree", format!("{}x{}", width, depth)),
            &tree,
            |b, tree| b.iter(|| compiler.compile_select(black_box(tree), "users", Some(100)).unwrap()),
        );
    }

    let nested = RuleGroup::and(vec![Rule::new(
        "id",
        Operator::In,
        SubqueryRef::new(
            "orders",
            "user_id",
            RuleGroup::and(vec![Rule::new(
                "id",
                Operator::In,
                SubqueryRef::new(
                    "order_items",
                    "order_id",
                    RuleGroup::and(vec![Rule::new("quantity", Operator::Gte, 2).into()]),
                ),
            )
            .into()]),
        ),
    )
    .into()]);

    group.bench_function("subquery_chain", |b| {
        b.iter(|| compiler.compile_select(black_box(&nested), "users", None).unwrap())
    });

    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("json");

    let tree = create_tree(8, 4);
    let json = tree.to_json().unwrap();

    group.throughput(Throughput::Bytes(json.len() as u64));

    group.bench_function("parse", |b| b.iter(|| RuleGroup::from_json(black_box(&json)).unwrap()));
    group.bench_function("serialize", |b| b.iter(|| black_box(&tree).to_json().unwrap()));

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempdir().unwrap();
    let database = Database::open(dir.path().join("bench.db"), true).unwrap();

    let compiler = SqlCompiler::new(Arc::new(Catalog::sample()));
    let gateway = QueryGateway::new(database.path(), GatewayConfig::default());

    let tree = RuleGroup::and(vec![
        Rule::new("category", Operator::Eq, "Electronics").into(),
        Rule::new("price", Operator::Lt, 500).into(),
    ]);
    let compiled = compiler.compile_select(&tree, "products", None).unwrap();

    c.bench_function("execute_products_filter", |b| {
        b.iter(|| rt.block_on(gateway.execute(black_box(&compiled))).unwrap())
    });
}

criterion_group!(benches, bench_compile, bench_json, bench_execute);
criterion_main!(benches);
