//! SQL compiler (C4, §4.4).
//!
//! Translates a `FilterNode` into a parameterized `WHERE` fragment plus an
//! ordered list of bind values. Two concerns are pluggable per backend:
//!
//! - `AttributeMap`: which SQL column (or, for list-typed attributes backed
//!   by a join table, which membership join) a given SCIM attribute path
//!   resolves to for a given entity.
//! - `SqlDialect`: the handful of syntax differences between SQLite and
//!   PostgreSQL (bind placeholder style, case-insensitive LIKE).

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::filter::ast::{CompareOp, FilterNode, LogicalOp};

/// Where a SCIM attribute lives in the relational schema.
#[derive(Debug, Clone)]
pub enum AttrEntry {
    /// A plain column on the entity's own table, e.g. `"users.user_name"`.
    Column(String),
    /// A list-typed attribute backed by a join table, e.g. Group.members
    /// backed by `users_groups`. `value eq "<id>"` inside `members[...]`
    /// compiles to an `EXISTS` against this join.
    Membership {
        join_table: String,
        parent_column: String,
        member_column: String,
    },
}

pub type AttributeMap = HashMap<&'static str, AttrEntry>;

/// Per-dialect SQL syntax (§4.4, §6A).
pub trait SqlDialect {
    /// Render the Nth (1-based) bind placeholder.
    fn placeholder(&self, index: usize) -> String;
    /// Wrap a column/value pair for a case-insensitive `LIKE`-style
    /// comparison, returning the operator to use between them.
    fn ilike_operator(&self) -> &'static str;
    /// Case-fold an expression for case-insensitive `=`/`<>` comparisons on
    /// dialects without a native case-insensitive operator.
    fn lower(&self, expr: &str) -> String {
        format!("LOWER({})", expr)
    }
}

pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn ilike_operator(&self) -> &'static str {
        "LIKE"
    }
}

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn ilike_operator(&self) -> &'static str {
        "ILIKE"
    }
}

#[derive(Debug)]
pub struct CompiledFilter {
    pub where_clause: String,
    pub params: Vec<Value>,
}

pub fn compile_filter(
    node: &FilterNode,
    entity_table: &str,
    attributes: &AttributeMap,
    dialect: &dyn SqlDialect,
) -> AppResult<CompiledFilter> {
    let mut compiler = Compiler {
        entity_table,
        attributes,
        dialect,
        params: Vec::new(),
    };
    let where_clause = compiler.compile(node)?;
    Ok(CompiledFilter {
        where_clause,
        params: compiler.params,
    })
}

struct Compiler<'a> {
    entity_table: &'a str,
    attributes: &'a AttributeMap,
    dialect: &'a dyn SqlDialect,
    params: Vec<Value>,
}

impl<'a> Compiler<'a> {
    fn compile(&mut self, node: &FilterNode) -> AppResult<String> {
        match node {
            FilterNode::Compare {
                attr,
                op,
                value,
                namespace,
            } => match namespace {
                Some(ns) => self.compile_membership(ns, *op, value.as_ref()),
                None => self.compile_column_compare(attr, *op, value.as_ref()),
            },
            FilterNode::Logical { op, left, right } => {
                let left_sql = self.compile(left)?;
                let right_sql = self.compile(right)?;
                let joiner = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                Ok(format!("({} {} {})", left_sql, joiner, right_sql))
            }
            FilterNode::Negate(inner) => {
                let inner_sql = self.compile(inner)?;
                Ok(format!("(NOT {})", inner_sql))
            }
        }
    }

    fn resolve_column(&self, attr: &str) -> AppResult<String> {
        match self.attributes.get(attr.to_ascii_lowercase().as_str()) {
            Some(AttrEntry::Column(expr)) => Ok(expr.clone()),
            Some(AttrEntry::Membership { .. }) => Err(AppError::UnsupportedAttribute(format!(
                "attribute '{}' is list-typed; use a value sub-filter",
                attr
            ))),
            None => Err(AppError::UnsupportedAttribute(format!(
                "unknown or unfilterable attribute '{}'",
                attr
            ))),
        }
    }

    fn compile_column_compare(
        &mut self,
        attr: &str,
        op: CompareOp,
        value: Option<&Value>,
    ) -> AppResult<String> {
        let column = self.resolve_column(attr)?;

        if op == CompareOp::Pr {
            return Ok(format!("({} IS NOT NULL)", column));
        }

        let value = value.ok_or_else(|| {
            AppError::FilterParse(format!("operator on '{}' requires a value", attr))
        })?;

        match op {
            CompareOp::Eq | CompareOp::Ne => {
                let cmp_op = if op == CompareOp::Eq { "=" } else { "<>" };
                if let Value::String(s) = value {
                    let ph = self.push_param(Value::String(s.to_lowercase()));
                    Ok(format!(
                        "({} {} {})",
                        self.dialect.lower(&column),
                        cmp_op,
                        ph
                    ))
                } else {
                    let ph = self.push_param(value.clone());
                    Ok(format!("({} {} {})", column, cmp_op, ph))
                }
            }
            CompareOp::Co | CompareOp::Sw | CompareOp::Ew => {
                let pattern = match op {
                    CompareOp::Co => format!("%{}%", as_pattern_text(value)?),
                    CompareOp::Sw => format!("{}%", as_pattern_text(value)?),
                    CompareOp::Ew => format!("%{}", as_pattern_text(value)?),
                    _ => unreachable!(),
                };
                let ph = self.push_param(Value::String(pattern));
                Ok(format!(
                    "({} {} {})",
                    column,
                    self.dialect.ilike_operator(),
                    ph
                ))
            }
            CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => {
                let sql_op = match op {
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    _ => unreachable!(),
                };
                let ph = self.push_param(value.clone());
                Ok(format!("({} {} {})", column, sql_op, ph))
            }
            CompareOp::Pr => unreachable!("handled above"),
        }
    }

    fn compile_membership(
        &mut self,
        namespace: &str,
        op: CompareOp,
        value: Option<&Value>,
    ) -> AppResult<String> {
        let entry = self
            .attributes
            .get(namespace.to_ascii_lowercase().as_str())
            .ok_or_else(|| {
                AppError::UnsupportedAttribute(format!("unknown list attribute '{}'", namespace))
            })?;
        let (join_table, parent_column, member_column) = match entry {
            AttrEntry::Membership {
                join_table,
                parent_column,
                member_column,
            } => (join_table, parent_column, member_column),
            AttrEntry::Column(_) => {
                return Err(AppError::UnsupportedAttribute(format!(
                    "'{}' is not a list attribute and cannot take a value sub-filter",
                    namespace
                )))
            }
        };

        if op == CompareOp::Pr {
            return Ok(format!(
                "EXISTS (SELECT 1 FROM {jt} WHERE {jt}.{parent} = {table}.id)",
                jt = join_table,
                parent = parent_column,
                table = self.entity_table
            ));
        }

        let value = value.ok_or_else(|| {
            AppError::FilterParse("value sub-filter operator requires a value".to_string())
        })?;
        let sql_op = match op {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            _ => {
                return Err(AppError::UnsupportedAttribute(
                    "value sub-filters support only eq/ne/pr".to_string(),
                ))
            }
        };
        let ph = self.push_param(value.clone());
        Ok(format!(
            "EXISTS (SELECT 1 FROM {jt} WHERE {jt}.{parent} = {table}.id AND {jt}.{member} {op} {ph})",
            jt = join_table,
            parent = parent_column,
            table = self.entity_table,
            member = member_column,
            op = sql_op,
            ph = ph
        ))
    }

    fn push_param(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }
}

fn as_pattern_text(value: &Value) -> AppResult<String> {
    value
        .as_str()
        .map(|s| s.replace('%', "\\%").replace('_', "\\_"))
        .ok_or_else(|| AppError::FilterParse("co/sw/ew require a string value".to_string()))
}
