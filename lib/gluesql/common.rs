use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use eyre::bail;
use gluesql::core::ast::Statement;
use gluesql::core::ast_builder::*;
use gluesql::core::store::{GStore, GStoreMut};
use gluesql::prelude::{Glue, Payload};
use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow};

/// Row of a [`Table`], derived with the gluesql_derive macros.
pub trait DbRow: ReflectGlueSqlRow + FromGlueSqlRow + ToGlueSqlRow + Debug {}
impl<T: ReflectGlueSqlRow + FromGlueSqlRow + ToGlueSqlRow + Debug> DbRow for T {}

/// Typed handle on one table of a gluesql storage.
pub struct Table<G: GStore + GStoreMut, D: DbRow> {
    glue: Glue<G>,
    name: String,
    row: PhantomData<D>,
}

impl<G: GStore + GStoreMut + Clone, D: DbRow> Clone for Table<G, D> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone(), self.glue.storage.clone())
    }
}

impl<G: GStore + GStoreMut, D: DbRow> Table<G, D> {
    pub fn new(name: impl Into<String>, storage: G) -> Self {
        Table {
            glue: Glue::new(storage),
            name: name.into(),
            row: PhantomData,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// whether the schema of the table is in the storage
    pub async fn exists(&self) -> eyre::Result<bool> {
        Ok(self.glue.storage.fetch_schema(&self.name).await?.is_some())
    }

    async fn execute_insert(&mut self, sql: Statement, expected: usize) -> eyre::Result<usize> {
        match self.glue.execute_stmt(&sql).await? {
            Payload::Insert(n) if n == expected => Ok(n),
            other => bail!("insert into {} expected {expected} rows, got {other:?}", self.name),
        }
    }
    pub async fn insert(&mut self, row: D) -> eyre::Result<()> {
        let sql = table(self.name.as_str())
            .insert()
            .columns(D::columns())
            .values(vec![row.to_gluesql_row()])
            .build()?;
        self.execute_insert(sql, 1).await?;
        Ok(())
    }
    /// one statement for all `rows`, callers keep it under the bound parameter limit
    pub async fn insert_many(&mut self, rows: &[D]) -> eyre::Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = table(self.name.as_str())
            .insert()
            .columns(D::columns())
            .values(rows.iter().map(|row| row.to_gluesql_row()).collect::<Vec<_>>())
            .build()?;
        self.execute_insert(sql, rows.len()).await
    }

    pub async fn delete(&mut self, filter: ExprNode<'static>) -> eyre::Result<usize> {
        let sql = table(self.name.as_str()).delete().filter(filter).build()?;
        match self.glue.execute_stmt(&sql).await? {
            Payload::Delete(n) => Ok(n),
            other => bail!("delete from {} returned {other:?}", self.name),
        }
    }

    async fn query(&mut self, sql: Statement) -> eyre::Result<Vec<D>> {
        match self.glue.execute_stmt(&sql).await? {
            Payload::Select { labels, rows } => Ok(D::from_gluesql_rows(&labels, rows)?),
            other => bail!("select from {} returned {other:?}", self.name),
        }
    }
    /// rows matching `filter` in storage order
    pub async fn select_unordered(&mut self, filter: Option<ExprNode<'static>>) -> eyre::Result<Vec<D>> {
        let select = table(self.name.as_str()).select();
        let sql = match filter {
            Some(filter) => select.filter(filter).project(D::columns()).build()?,
            None => select.project(D::columns()).build()?,
        };
        self.query(sql).await
    }
    pub async fn select(
        &mut self,
        filter: Option<ExprNode<'static>>,
        order: impl Into<OrderByExprList<'static>>,
    ) -> eyre::Result<Vec<D>> {
        let select = table(self.name.as_str()).select();
        let sql = match filter {
            Some(filter) => select.filter(filter).project(D::columns()).order_by(order).build()?,
            None => select.project(D::columns()).order_by(order).build()?,
        };
        self.query(sql).await
    }
    /// fails when more than one row matches
    pub async fn select_one_unordered(&mut self, filter: Option<ExprNode<'static>>) -> eyre::Result<Option<D>> {
        let mut rows = self.select_unordered(filter).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => bail!("expected at most 1 row in {}, found {n}", self.name),
        }
    }
}

impl<G: GStore + GStoreMut, D: DbRow> Deref for Table<G, D> {
    type Target = Glue<G>;
    fn deref(&self) -> &Self::Target {
        &self.glue
    }
}
impl<G: GStore + GStoreMut, D: DbRow> DerefMut for Table<G, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.glue
    }
}

/// Filter expressions the asset store queries with.
pub struct QueryFilter;
impl QueryFilter {
    pub fn eq_string(key: impl AsRef<str>, value: impl AsRef<str>) -> ExprNode<'static> {
        col(key.as_ref().to_string()).eq(text(value.as_ref().to_string()))
    }
    /// `key IN (...)`, one bound value per item
    pub fn in_u64(key: impl AsRef<str>, values: &[u64]) -> ExprNode<'static> {
        let list: Vec<ExprNode<'static>> = values.iter().map(|v| num(*v)).collect();
        col(key.as_ref().to_string()).in_list(list)
    }
    pub fn in_string(key: impl AsRef<str>, values: &[String]) -> ExprNode<'static> {
        let list: Vec<ExprNode<'static>> = values.iter().map(|v| text(v.clone())).collect();
        col(key.as_ref().to_string()).in_list(list)
    }
}

/// create the table from the row's ddl, no-op when it already exists
/// T to work around orphan rule
#[async_trait(?Send)]
pub trait TableCreate<T: ReflectGlueSqlRow> {
    async fn create_table(&mut self) -> eyre::Result<()>;
}

#[async_trait(?Send)]
impl<G: GStore + GStoreMut, D: DbRow> TableCreate<D> for Table<G, D> {
    async fn create_table(&mut self) -> eyre::Result<()> {
        if self.exists().await? {
            return Ok(());
        }
        let ddl = D::get_ddl(self.name());
        self.glue.execute(ddl.as_str()).await?;
        Ok(())
    }
}
