//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 基于 SeaORM 的存储实现，使用 sea-query 按连接的数据库后端生成语句。

use super::{Predicate, RowQuery, RowStorage};
use crate::error::{CacheError, Result};
use crate::value::Row;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, JsonValue};
use tracing::{debug, instrument};

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid");
}

/// SeaORM 存储
#[derive(Debug, Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
}

impl SeaOrmStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn identifier(name: &str) -> Result<Alias> {
    if IDENTIFIER.is_match(name) {
        Ok(Alias::new(name))
    } else {
        Err(CacheError::Configuration(format!(
            "Invalid identifier '{}'",
            name
        )))
    }
}

fn db_value(value: &JsonValue) -> sea_orm::Value {
    match value {
        JsonValue::Null => sea_orm::Value::String(None),
        JsonValue::Bool(b) => (*b).into(),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64().unwrap_or_default().into()
            }
        }
        JsonValue::String(s) => s.clone().into(),
        other => other.clone().into(),
    }
}

fn condition(predicate: &Predicate) -> Result<SimpleExpr> {
    let column = identifier(predicate.column())?;
    let expr = match predicate {
        Predicate::Eq { value, .. } => Expr::col(column).eq(db_value(value)),
        Predicate::In { values, .. } => {
            Expr::col(column).is_in(values.iter().map(db_value).collect::<Vec<_>>())
        }
        Predicate::IsNull { .. } => Expr::col(column).is_null(),
        Predicate::InOrNull { values, .. } => Expr::col(column.clone())
            .is_in(values.iter().map(db_value).collect::<Vec<_>>())
            .or(Expr::col(column).is_null()),
    };
    Ok(expr)
}

fn into_row(value: JsonValue) -> Result<Row> {
    match value {
        JsonValue::Object(map) => Ok(map.into_iter().collect()),
        other => Err(CacheError::Storage(format!(
            "Unexpected row shape: {}",
            other
        ))),
    }
}

#[async_trait]
impl RowStorage for SeaOrmStorage {
    #[instrument(skip(self, query), level = "debug", fields(predicates = query.predicates.len(), limit = ?query.limit))]
    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>> {
        let mut select = Query::select();
        select.column(Asterisk).from(identifier(table)?);
        for predicate in &query.predicates {
            select.and_where(condition(predicate)?);
        }
        if let Some(limit) = query.limit {
            select.limit(limit);
        }

        let statement = self.db.get_database_backend().build(&select);
        debug!("select: {}", statement);
        let rows = JsonValue::find_by_statement(statement).all(&self.db).await?;
        rows.into_iter().map(into_row).collect()
    }

    #[instrument(skip(self, row), level = "debug")]
    async fn insert(&self, table: &str, row: &Row) -> Result<()> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in row.iter() {
            columns.push(identifier(column)?);
            values.push(SimpleExpr::from(db_value(value)));
        }

        let mut insert = Query::insert();
        insert
            .into_table(identifier(table)?)
            .columns(columns)
            .values(values)
            .map_err(|e| CacheError::Storage(e.to_string()))?;

        let statement = self.db.get_database_backend().build(&insert);
        self.db.execute(statement).await?;
        Ok(())
    }

    #[instrument(skip(self, assignments, predicates), level = "debug", fields(columns = assignments.len()))]
    async fn update(
        &self,
        table: &str,
        assignments: &[(String, JsonValue)],
        predicates: &[Predicate],
    ) -> Result<u64> {
        let mut values = Vec::with_capacity(assignments.len());
        for (column, value) in assignments {
            values.push((identifier(column)?, SimpleExpr::from(db_value(value))));
        }

        let mut update = Query::update();
        update.table(identifier(table)?).values(values);
        for predicate in predicates {
            update.and_where(condition(predicate)?);
        }

        let statement = self.db.get_database_backend().build(&update);
        debug!("update: {}", statement);
        let result = self.db.execute(statement).await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, predicates), level = "debug")]
    async fn delete(&self, table: &str, predicates: &[Predicate]) -> Result<u64> {
        let mut delete = Query::delete();
        delete.from_table(identifier(table)?);
        for predicate in predicates {
            delete.and_where(condition(predicate)?);
        }

        let statement = self.db.get_database_backend().build(&delete);
        let result = self.db.execute(statement).await?;
        Ok(result.rows_affected())
    }
}
