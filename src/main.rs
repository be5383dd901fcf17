//! Query Builder demo
//!
//! Prepares the configured database, then compiles and runs a few sample
//! rule trees and logs the SQL and row counts.

use querybuilder::compiler::SqlCompiler;
use querybuilder::config::Config;
use querybuilder::db::Database;
use querybuilder::gateway::QueryGateway;
use querybuilder::metadata::Catalog;
use querybuilder::rules::{Operator, Rule, RuleGroup, SubqueryRef};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    querybuilder::logging::init(&config.logging)?;

    tracing::info!("Query Builder v{}", env!("CARGO_PKG_VERSION"));

    let database = Database::from_config(&config.database)?;
    tracing::info!("Database: {:?}", database.path());

    let catalog = Catalog::load(config.metadata.catalog_path.as_deref())?;
    let compiler = SqlCompiler::with_config(Arc::new(catalog), config.query.compiler_config());
    let gateway = QueryGateway::new(database.path(), config.query.gateway_config(&config.database));

    for (table, tree) in demo_queries() {
        run(&compiler, &gateway, table, &tree).await?;
    }

    tracing::info!("Demo complete");
    Ok(())
}

fn demo_queries() -> Vec<(&'static str, RuleGroup)> {
    // Users over 30 in Boston or Denver
    let adults = RuleGroup::and(vec![])
        .with(Rule::new("age", Operator::Gt, 30))
        .with(RuleGroup::or(vec![
            Rule::new("city", Operator::Eq, "Boston").into(),
            Rule::new("city", Operator::Eq, "Denver").into(),
        ]));

    // Cheap furniture
    let furniture = RuleGroup::and(vec![
        Rule::new("category", Operator::Eq, "Furniture").into(),
        Rule::new("price", Operator::Lt, 250).into(),
    ]);

    // Users with a pending order
    let pending = RuleGroup::and(vec![Rule::new(
        "id",
        Operator::In,
        SubqueryRef::new(
            "orders",
            "user_id",
            RuleGroup::and(vec![Rule::new("status", Operator::Eq, "pending").into()]),
        ),
    )
    .into()]);

    vec![("users", adults), ("products", furniture), ("users", pending)]
}

async fn run(
    compiler: &SqlCompiler,
    gateway: &QueryGateway,
    table: &str,
    tree: &RuleGroup,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiled = compiler.compile_select(tree, table, Some(10))?;
    tracing::info!("SQL: {}", compiled.sql);
    tracing::info!("Params: {:?}", compiled.params);

    let result = gateway.execute(&compiled).await?;
    tracing::info!("{} rows in {} ms", result.row_count, result.execution_time_ms);

    Ok(())
}
