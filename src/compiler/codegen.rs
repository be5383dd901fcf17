//! Rule tree to SQL code generation

use std::sync::Arc;

use serde::Serialize;

use super::error::{CompileError, CompileResult};
use super::ident::quote_ident;
use super::value::{coerce, like_pattern, SqlValue};
use crate::metadata::{Catalog, FieldMetadata, FieldType, TableMetadata};
use crate::rules::{OperandShape, Operator, Rule, RuleGroup, RuleNode, RuleValue, Scalar, SubqueryRef};

/// Condition emitted for a tree that constrains nothing
pub const TAUTOLOGY: &str = "1 = 1";

/// Compiler limits
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Maximum number of nested subqueries
    pub max_subquery_depth: usize,
    /// Row limit when the caller gives none
    pub default_limit: u32,
    /// Upper bound for caller-supplied limits
    pub max_limit: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_subquery_depth: 8,
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

/// A compiled boolean condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledFilter {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// A column of a compiled statement's result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputColumn {
    pub name: String,
    pub field_type: FieldType,
}

/// A complete, bounded `SELECT` ready for execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub table: String,
    pub sql: String,
    pub params: Vec<SqlValue>,
    #[serde(skip)]
    pub columns: Vec<OutputColumn>,
    pub limit: u32,
}

/// Compiles rule trees against a metadata catalog
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    catalog: Arc<Catalog>,
    config: CompilerConfig,
}

impl SqlCompiler {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, CompilerConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: CompilerConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a tree into a WHERE-clause body for `table`
    ///
    /// A tree with no rules compiles to `1 = 1` with no params.
    pub fn compile(&self, tree: &RuleGroup, table: &str) -> CompileResult<CompiledFilter> {
        let meta = self.table(table)?;
        let mut params = Vec::new();
        let sql = self
            .render_group(tree, meta, 0, &mut params, true)?
            .unwrap_or_else(|| TAUTOLOGY.to_string());

        Ok(CompiledFilter { sql, params })
    }

    /// Compile a full `SELECT <columns> FROM <table> [WHERE ...] LIMIT n`
    pub fn compile_select(&self, tree: &RuleGroup, table: &str, limit: Option<i64>) -> CompileResult<CompiledQuery> {
        let meta = self.table(table)?;
        let limit = self.resolve_limit(limit)?;

        let mut params = Vec::new();
        let condition = self.render_group(tree, meta, 0, &mut params, true)?;

        let columns: Vec<String> = meta.fields.iter().map(|f| quote_ident(&f.name).into_owned()).collect();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), quote_ident(&meta.name));
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        sql.push_str(&format!(" LIMIT {}", limit));

        tracing::debug!(table = %meta.name, params = params.len(), "Compiled query");

        Ok(CompiledQuery {
            table: meta.name.clone(),
            sql,
            params,
            columns: meta
                .fields
                .iter()
                .map(|f| OutputColumn {
                    name: f.name.clone(),
                    field_type: f.field_type,
                })
                .collect(),
            limit,
        })
    }

    /// Apply the default and the cap to a caller-supplied row limit
    pub fn resolve_limit(&self, limit: Option<i64>) -> CompileResult<u32> {
        match limit {
            None => Ok(self.config.default_limit.min(self.config.max_limit)),
            Some(n) if n <= 0 => Err(CompileError::InvalidLimit(n)),
            Some(n) => Ok(n.min(i64::from(self.config.max_limit)) as u32),
        }
    }

    fn table(&self, name: &str) -> CompileResult<&TableMetadata> {
        self.catalog
            .table(name)
            .ok_or_else(|| CompileError::UnknownTable(name.to_string()))
    }

    /// Render a group, or `None` when it contains no rules at any depth
    ///
    /// `depth` counts enclosing subqueries. Params are pushed in the same
    /// order their placeholders appear in the returned text.
    fn render_group(
        &self,
        group: &RuleGroup,
        table: &TableMetadata,
        depth: usize,
        params: &mut Vec<SqlValue>,
        root: bool,
    ) -> CompileResult<Option<String>> {
        let mut parts = Vec::with_capacity(group.rules.len());
        for node in &group.rules {
            let part = match node {
                RuleNode::Rule(rule) => Some(self.render_rule(rule, table, depth, params)?),
                RuleNode::Group(child) => self.render_group(child, table, depth, params, false)?,
            };
            parts.extend(part);
        }

        if parts.is_empty() {
            return Ok(None);
        }

        let joined = parts.join(&format!(" {} ", group.combinator.keyword()));
        let rendered = if group.not {
            format!("NOT ({})", joined)
        } else if root {
            joined
        } else {
            format!("({})", joined)
        };
        Ok(Some(rendered))
    }

    fn render_rule(
        &self,
        rule: &Rule,
        table: &TableMetadata,
        depth: usize,
        params: &mut Vec<SqlValue>,
    ) -> CompileResult<String> {
        let field = table.get_field(&rule.field).ok_or_else(|| CompileError::UnknownField {
            table: table.name.clone(),
            field: rule.field.clone(),
        })?;
        let op = rule.operator;
        if !field.allows(op) {
            return Err(CompileError::OperatorNotAllowed {
                field: field.name.clone(),
                operator: op,
            });
        }

        let column = quote_ident(&field.name);

        match op.shape() {
            OperandShape::None => Ok(match op {
                Operator::Null => format!("{} IS NULL", column),
                _ => format!("{} IS NOT NULL", column),
            }),
            OperandShape::Single => {
                let scalar = single_operand(rule, field)?;
                let (sql_op, value) = match op {
                    Operator::Contains | Operator::BeginsWith | Operator::EndsWith => {
                        return Ok(push_like(params, &column, "LIKE", like_pattern(op, scalar)));
                    }
                    Operator::DoesNotContain | Operator::DoesNotBeginWith | Operator::DoesNotEndWith => {
                        return Ok(push_like(params, &column, "NOT LIKE", like_pattern(op, scalar)));
                    }
                    _ => (op.as_str(), coerce(field, scalar)?),
                };
                params.push(value);
                Ok(format!("{} {} ?", column, sql_op))
            }
            OperandShape::List => {
                let keyword = if op == Operator::In { "IN" } else { "NOT IN" };
                match &rule.value {
                    Some(RuleValue::Subquery(sub)) => {
                        let subquery = self.render_subquery(sub, field, depth, params)?;
                        Ok(format!("{} {} ({})", column, keyword, subquery))
                    }
                    _ => {
                        let items = list_operand(rule, field)?;
                        if items.is_empty() {
                            return Err(CompileError::EmptyListOperand {
                                field: field.name.clone(),
                                operator: op,
                            });
                        }
                        let mut placeholders = Vec::with_capacity(items.len());
                        for item in &items {
                            params.push(coerce(field, item)?);
                            placeholders.push("?");
                        }
                        Ok(format!("{} {} ({})", column, keyword, placeholders.join(", ")))
                    }
                }
            }
            OperandShape::Pair => {
                if let Some(RuleValue::Subquery(_)) = &rule.value {
                    return Err(CompileError::SubqueryNotAllowed { operator: op });
                }
                let items = list_operand(rule, field)?;
                if items.len() != 2 {
                    return Err(CompileError::BadOperandArity {
                        operator: op,
                        expected: 2,
                        found: items.len(),
                    });
                }
                params.push(coerce(field, &items[0])?);
                params.push(coerce(field, &items[1])?);
                Ok(format!("{} BETWEEN ? AND ?", column))
            }
        }
    }

    /// Render `SELECT <col> FROM <table> [WHERE ...]` for an `in` / `notIn` operand
    fn render_subquery(
        &self,
        sub: &SubqueryRef,
        outer_field: &FieldMetadata,
        depth: usize,
        params: &mut Vec<SqlValue>,
    ) -> CompileResult<String> {
        let depth = depth + 1;
        if depth > self.config.max_subquery_depth {
            return Err(CompileError::NestingTooDeep {
                max: self.config.max_subquery_depth,
            });
        }

        let table = self.table(&sub.table)?;
        let column = match sub.select_fields.as_slice() {
            [] => table
                .get_field(&outer_field.name)
                .or_else(|| table.get_field("id"))
                .ok_or_else(|| CompileError::SubqueryColumnUnresolved {
                    table: table.name.clone(),
                    field: outer_field.name.clone(),
                })?,
            [name] => table.get_field(name).ok_or_else(|| CompileError::UnknownField {
                table: table.name.clone(),
                field: name.clone(),
            })?,
            many => {
                return Err(CompileError::SubqueryArity {
                    table: table.name.clone(),
                    found: many.len(),
                })
            }
        };

        let mut sql = format!("SELECT {} FROM {}", quote_ident(&column.name), quote_ident(&table.name));
        if let Some(condition) = self.render_group(&sub.filter, table, depth, params, true)? {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        Ok(sql)
    }
}

fn push_like(params: &mut Vec<SqlValue>, column: &str, keyword: &str, pattern: SqlValue) -> String {
    params.push(pattern);
    format!("{} {} ? ESCAPE '\\'", column, keyword)
}

/// The one scalar a comparison or pattern operator consumes
fn single_operand<'a>(rule: &'a Rule, field: &FieldMetadata) -> CompileResult<&'a Scalar> {
    match &rule.value {
        Some(RuleValue::Scalar(s)) => Ok(s),
        Some(RuleValue::List(items)) => Err(CompileError::BadOperandArity {
            operator: rule.operator,
            expected: 1,
            found: items.len(),
        }),
        Some(RuleValue::Subquery(_)) => Err(CompileError::SubqueryNotAllowed {
            operator: rule.operator,
        }),
        None => Err(CompileError::MissingValue {
            field: field.name.clone(),
            operator: rule.operator,
        }),
    }
}

/// Literal operand list; comma-separated text is split and trimmed
fn list_operand(rule: &Rule, field: &FieldMetadata) -> CompileResult<Vec<Scalar>> {
    match &rule.value {
        Some(RuleValue::List(items)) => Ok(items.clone()),
        Some(RuleValue::Scalar(Scalar::Text(text))) => Ok(text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Scalar::from)
            .collect()),
        Some(RuleValue::Scalar(other)) => Ok(vec![other.clone()]),
        Some(RuleValue::Subquery(_)) => Err(CompileError::SubqueryNotAllowed {
            operator: rule.operator,
        }),
        None => Err(CompileError::MissingValue {
            field: field.name.clone(),
            operator: rule.operator,
        }),
    }
}
