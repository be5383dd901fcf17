//! Query Builder CLI
//!
//! Command-line interface for Query Builder operations:
//! - Browse the field metadata catalog
//! - Build rule tree files one edit at a time
//! - Compile, preview and run rule trees
//! - Manage saved queries

use clap::{Parser, Subcommand};
use querybuilder::compiler::SqlCompiler;
use querybuilder::metadata::Catalog;
use querybuilder::rules::{Combinator, NodePath, Operator, Rule, RuleGroup, RuleValue};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "querybuilder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build filter rule trees and run them as SQL")]
#[command(long_about = "Query Builder compiles nested filter rules into parameterized SQL.\nEdit rule files locally, preview the SQL, run queries and keep the ones you reuse.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8000", global = true)]
    pub api_url: String,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tables
    Tables,

    /// Show field metadata
    Fields {
        /// Only this table
        table: Option<String>,
    },

    /// Run a rule file against a table
    Run {
        /// Rule tree JSON file
        file: PathBuf,
        /// Table to query
        #[arg(short, long)]
        table: String,
        /// Maximum rows
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show the SQL and parameters the server would run
    Preview {
        /// Rule tree JSON file
        file: PathBuf,
        /// Table to query
        #[arg(short, long)]
        table: String,
        /// Maximum rows
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Compile a rule file locally without a server
    Compile {
        /// Rule tree JSON file
        file: PathBuf,
        /// Table to query
        #[arg(short, long)]
        table: String,
        /// Maximum rows
        #[arg(short, long)]
        limit: Option<i64>,
        /// Metadata catalog JSON (default: built-in sample tables)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Save a rule file as a named query
    Save {
        /// Rule tree JSON file
        file: PathBuf,
        /// Table the rules filter
        #[arg(short, long)]
        table: String,
        /// Query name
        #[arg(short, long)]
        name: String,
        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List saved queries
    List {
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Show a saved query
    Show {
        id: i64,
        /// Write the rule tree to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a saved query
    Delete { id: i64 },

    /// Show server status
    Status,

    /// Edit a rule tree file
    #[command(subcommand)]
    Rule(RuleCommand),

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Structural edits on a rule file. Paths are dot-separated child
/// indexes from the root group; an empty path or `root` is the root.
#[derive(Subcommand)]
pub enum RuleCommand {
    /// Create an empty rule file
    New {
        file: PathBuf,
        /// and / or
        #[arg(short, long, default_value = "and")]
        combinator: String,
    },

    /// Append a rule to a group
    AddRule {
        file: PathBuf,
        field: String,
        operator: String,
        /// Value as JSON (`30`, `[1,2]`, `{"table":...}`) or plain text
        value: Option<String>,
        /// Parent group path
        #[arg(short, long, default_value = "")]
        parent: String,
    },

    /// Append an empty group to a group
    AddGroup {
        file: PathBuf,
        #[arg(short, long, default_value = "and")]
        combinator: String,
        /// Negate the new group
        #[arg(long)]
        not: bool,
        /// Parent group path
        #[arg(short, long, default_value = "")]
        parent: String,
    },

    /// Remove a rule or group
    Remove { file: PathBuf, path: String },

    /// Move a node under another group
    Move {
        file: PathBuf,
        from: String,
        to_parent: String,
        /// Position in the target group after the node is detached
        index: usize,
    },

    /// Change a group's combinator
    SetCombinator {
        file: PathBuf,
        path: String,
        combinator: String,
    },

    /// Set or clear a group's negation
    SetNot {
        file: PathBuf,
        path: String,
        #[arg(action = clap::ArgAction::Set)]
        not: bool,
    },

    /// Change a rule's field, operator or value
    Update {
        file: PathBuf,
        path: String,
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        operator: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },

    /// Print a rule file
    Show { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Tables => {
            let data = get_json(&client, &format!("{}/api/metadata/tables", cli.api_url)).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{:<20} {}", "Name", "Label");
                println!("{}", "-".repeat(40));
                for table in data["tables"].as_array().into_iter().flatten() {
                    println!(
                        "{:<20} {}",
                        table["name"].as_str().unwrap_or("-"),
                        table["label"].as_str().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Fields { table } => {
            let data = get_json(&client, &format!("{}/api/metadata/fields", cli.api_url)).await?;
            let tables: Vec<&Value> = data["tables"]
                .as_array()
                .into_iter()
                .flatten()
                .filter(|t| table.as_deref().map_or(true, |name| t["name"] == name))
                .collect();

            if tables.is_empty() {
                if let Some(name) = table {
                    eprintln!("Unknown table: {}", name);
                    std::process::exit(1);
                }
            }

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for t in tables {
                    println!("{} ({})", t["label"].as_str().unwrap_or("-"), t["name"].as_str().unwrap_or("-"));
                    for field in t["fields"].as_array().into_iter().flatten() {
                        let operators: Vec<&str> = field["operators"]
                            .as_array()
                            .into_iter()
                            .flatten()
                            .filter_map(|o| o.as_str())
                            .collect();
                        println!(
                            "  {:<18} {:<8} {}",
                            field["name"].as_str().unwrap_or("-"),
                            field["type"].as_str().unwrap_or("-"),
                            operators.join(" ")
                        );
                    }
                    println!();
                }
            }
        }

        Commands::Run { file, table, limit } => {
            let tree = read_tree(&file)?;
            let body = json!({ "query": tree, "table_name": table, "limit": limit });

            let response = client
                .post(format!("{}/api/queries/execute", cli.api_url))
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let data: Value = response.json().await?;

            if data["success"] != true {
                eprintln!(
                    "Query failed ({}, {}): {}",
                    status,
                    data["error_kind"].as_str().unwrap_or("unknown"),
                    data["error"].as_str().unwrap_or("no details")
                );
                std::process::exit(1);
            }

            match cli.format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                "csv" => {
                    print_csv(&data)?;
                }
                _ => {
                    print_table(&data);
                }
            }
        }

        Commands::Preview { file, table, limit } => {
            let tree = read_tree(&file)?;
            let body = json!({ "query": tree, "table_name": table, "limit": limit });

            let response = client
                .post(format!("{}/api/queries/preview", cli.api_url))
                .json(&body)
                .send()
                .await?;
            let data = check_response(response, "Preview failed").await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{}", data["sql"].as_str().unwrap_or(""));
                println!("params: {}", data["params"]);
            }
        }

        Commands::Compile {
            file,
            table,
            limit,
            catalog,
        } => {
            let tree = read_tree(&file)?;
            let catalog = Catalog::load(catalog.as_deref())?;
            let compiler = SqlCompiler::new(Arc::new(catalog));

            match compiler.compile_select(&tree, &table, limit) {
                Ok(compiled) => {
                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&compiled)?);
                    } else {
                        println!("{}", compiled.sql);
                        println!("params: {}", serde_json::to_string(&compiled.params)?);
                    }
                }
                Err(e) => {
                    eprintln!("{} ({})", e, e.code());
                    std::process::exit(1);
                }
            }
        }

        Commands::Save {
            file,
            table,
            name,
            description,
        } => {
            let tree = read_tree(&file)?;
            let body = json!({
                "name": name,
                "description": description,
                "query_json": tree.to_json()?,
                "table_name": table,
            });

            let response = client
                .post(format!("{}/api/queries/save", cli.api_url))
                .json(&body)
                .send()
                .await?;
            let saved = check_response(response, "Save failed").await?;

            println!("Saved query {} as '{}'", saved["id"], saved["name"].as_str().unwrap_or(&name));
            if let Some(sql) = saved["sql_query"].as_str() {
                println!("  {}", sql);
            }
        }

        Commands::List { skip, limit } => {
            let data = get_json(
                &client,
                &format!("{}/api/queries?skip={}&limit={}", cli.api_url, skip, limit),
            )
            .await?;
            let queries = data.as_array().cloned().unwrap_or_default();

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&queries)?);
            } else if queries.is_empty() {
                println!("No saved queries yet.");
                println!();
                println!("Save one with:");
                println!("  querybuilder save rules.json --table users --name \"My query\"");
            } else {
                println!("{:<6} {:<30} {:<14} {}", "ID", "Name", "Table", "Created");
                println!("{}", "-".repeat(76));

                for query in queries {
                    println!(
                        "{:<6} {:<30} {:<14} {}",
                        query["id"].as_i64().unwrap_or(0),
                        query["name"].as_str().unwrap_or("-"),
                        query["table_name"].as_str().unwrap_or("-"),
                        query["created_at"].as_str().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Show { id, output } => {
            let query = get_json(&client, &format!("{}/api/queries/{}", cli.api_url, id)).await?;

            if let Some(path) = output {
                let tree = RuleGroup::from_json(query["query_json"].as_str().unwrap_or_default())?;
                write_tree(&path, &tree)?;
                println!("Rule tree written to {:?}", path);
            } else if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&query)?);
            } else {
                println!("{} (#{})", query["name"].as_str().unwrap_or("-"), id);
                if let Some(description) = query["description"].as_str() {
                    println!("  {}", description);
                }
                println!("Table:   {}", query["table_name"].as_str().unwrap_or("-"));
                println!("Created: {}", query["created_at"].as_str().unwrap_or("-"));
                if let Some(sql) = query["sql_query"].as_str() {
                    println!("SQL:     {}", sql);
                }
            }
        }

        Commands::Delete { id } => {
            let response = client
                .delete(format!("{}/api/queries/{}", cli.api_url, id))
                .send()
                .await?;
            check_response(response, "Delete failed").await?;
            println!("Deleted query {}", id);
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    println!("Query Builder v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("  Database: {}", health["database"].as_str().unwrap_or("unknown"));
                    println!("  Store:    {}", health["store"].as_str().unwrap_or("unknown"));

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to Query Builder API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the API server is running:");
                    eprintln!("  cargo run --bin querybuilder-api");
                    std::process::exit(1);
                }
            }
        }

        Commands::Rule(command) => {
            if let Err(e) = edit_rule_file(command) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }

        Commands::Config { output } => {
            let config = querybuilder::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn edit_rule_file(command: RuleCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        RuleCommand::New { file, combinator } => {
            let tree = RuleGroup::new(parse_combinator(&combinator)?, Vec::new());
            write_tree(&file, &tree)?;
            println!("Created {:?}", file);
        }

        RuleCommand::AddRule {
            file,
            field,
            operator,
            value,
            parent,
        } => {
            let mut tree = read_tree(&file)?;
            let operator = parse_operator(&operator)?;
            let rule = match value {
                Some(v) if operator.takes_value() => Rule::new(field, operator, parse_value(&v)),
                _ => Rule::without_value(field, operator),
            };
            let path = tree.add_rule(&NodePath::parse(&parent)?, rule)?;
            write_tree(&file, &tree)?;
            println!("Added rule at {}", path);
        }

        RuleCommand::AddGroup {
            file,
            combinator,
            not,
            parent,
        } => {
            let mut tree = read_tree(&file)?;
            let mut group = RuleGroup::new(parse_combinator(&combinator)?, Vec::new());
            group.not = not;
            let path = tree.add_group(&NodePath::parse(&parent)?, group)?;
            write_tree(&file, &tree)?;
            println!("Added group at {}", path);
        }

        RuleCommand::Remove { file, path } => {
            let mut tree = read_tree(&file)?;
            tree.remove(&NodePath::parse(&path)?)?;
            write_tree(&file, &tree)?;
            println!("Removed {}", path);
        }

        RuleCommand::Move {
            file,
            from,
            to_parent,
            index,
        } => {
            let mut tree = read_tree(&file)?;
            let path = tree.move_node(&NodePath::parse(&from)?, &NodePath::parse(&to_parent)?, index)?;
            write_tree(&file, &tree)?;
            println!("Moved {} to {}", from, path);
        }

        RuleCommand::SetCombinator { file, path, combinator } => {
            let mut tree = read_tree(&file)?;
            tree.set_combinator(&NodePath::parse(&path)?, parse_combinator(&combinator)?)?;
            write_tree(&file, &tree)?;
        }

        RuleCommand::SetNot { file, path, not } => {
            let mut tree = read_tree(&file)?;
            tree.set_not(&NodePath::parse(&path)?, not)?;
            write_tree(&file, &tree)?;
        }

        RuleCommand::Update {
            file,
            path,
            field,
            operator,
            value,
        } => {
            let mut tree = read_tree(&file)?;
            let operator = operator.as_deref().map(parse_operator).transpose()?;
            tree.update_rule(
                &NodePath::parse(&path)?,
                field,
                operator,
                value.as_deref().map(parse_value),
            )?;
            write_tree(&file, &tree)?;
        }

        RuleCommand::Show { file } => {
            let tree = read_tree(&file)?;
            println!("{}", tree.to_json_pretty()?);
            println!();
            println!("{} rule(s)", tree.rule_count());
        }
    }

    Ok(())
}

fn read_tree(path: &Path) -> Result<RuleGroup, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("Cannot read {:?}: {}", path, e))?;
    RuleGroup::from_json(&content).map_err(|e| format!("{:?} is not a rule tree: {}", path, e).into())
}

fn write_tree(path: &Path, tree: &RuleGroup) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, tree.to_json_pretty()? + "\n")?;
    Ok(())
}

fn parse_operator(s: &str) -> Result<Operator, String> {
    Operator::parse(s).ok_or_else(|| {
        let known: Vec<&str> = Operator::ALL.iter().map(|o| o.as_str()).collect();
        format!("Unknown operator '{}'. Use one of: {}", s, known.join(" "))
    })
}

fn parse_combinator(s: &str) -> Result<Combinator, String> {
    Combinator::parse(s).ok_or_else(|| format!("Unknown combinator '{}'. Use and / or", s))
}

/// JSON when it parses as a rule value, otherwise the raw text
fn parse_value(s: &str) -> RuleValue {
    serde_json::from_str(s).unwrap_or_else(|_| RuleValue::from(s))
}

async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let response = client.get(url).send().await?;
    check_response(response, "Request failed").await
}

/// Parse a JSON body, exiting with the server's error message on failure
async fn check_response(response: reqwest::Response, context: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        eprintln!("{} ({}): {}", context, status, message);
        std::process::exit(1);
    }
    Ok(response.json().await?)
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn columns(data: &Value) -> Vec<String> {
    data["columns"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c.as_str().map(str::to_string))
        .collect()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_table(data: &Value) {
    let rows = match data["data"].as_array() {
        Some(r) if !r.is_empty() => r,
        _ => {
            println!("No rows matched");
            return;
        }
    };
    let columns = columns(data);

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| {
            rows.iter()
                .map(|row| cell(&row[c]).chars().count())
                .chain(std::iter::once(c.len()))
                .max()
                .unwrap_or(0)
                .min(30)
        })
        .collect();

    // Header
    let header: Vec<String> = columns.iter().zip(&widths).map(|(c, w)| format!("{:<w$}", c, w = *w)).collect();
    println!("{}", header.join(" | "));

    // Separator
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));

    // Data rows
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| {
                let text: String = cell(&row[c]).chars().take(*w).collect();
                format!("{:<w$}", text, w = *w)
            })
            .collect();
        println!("{}", cells.join(" | "));
    }

    println!();
    println!(
        "{} row(s) in {} ms",
        data["row_count"].as_u64().unwrap_or(0),
        data["execution_time_ms"].as_u64().unwrap_or(0)
    );
}

fn print_csv(data: &Value) -> Result<(), Box<dyn std::error::Error>> {
    let columns = columns(data);
    let mut writer = csv::Writer::from_writer(std::io::stdout());

    writer.write_record(&columns)?;
    for row in data["data"].as_array().into_iter().flatten() {
        writer.write_record(columns.iter().map(|c| cell(&row[c])))?;
    }
    writer.flush()?;
    Ok(())
}
