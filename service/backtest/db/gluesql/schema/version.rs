use async_trait::async_trait;
use eyre::{bail, eyre};
use gluesql::core::ast_builder;
use gluesql::core::ast_builder::Build;
use gluesql::core::store::GStore;
use gluesql::prelude::Payload;
use gluesql_derive::gluesql_core::store::GStoreMut;
use gluesql_derive::{FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSql, ToGlueSqlRow};
use tracing::info;
use trading_model::AssetError;

use lib::gluesql::{Table, TableCreate};

pub const VERSION_INFO: &str = "version_info";

#[derive(Debug, Clone, FromGlueSqlRow, ReflectGlueSqlRow, ToGlueSqlRow, Default, PartialEq, Eq)]
pub struct DbRowVersionInfo {
    pub version: u64,
}

#[async_trait(?Send)]
pub trait TableVersioning<G: GStore + GStoreMut> {
    async fn query_version_info(&mut self) -> eyre::Result<Option<DbRowVersionInfo>>;
    async fn upsert_version_info(&mut self, version: DbRowVersionInfo) -> eyre::Result<()>;
}

#[async_trait(?Send)]
impl<G: GStore + GStoreMut> TableVersioning<G> for Table<G, DbRowVersionInfo> {
    async fn query_version_info(&mut self) -> eyre::Result<Option<DbRowVersionInfo>> {
        let select = ast_builder::table(self.name())
            .select()
            .project(DbRowVersionInfo::columns())
            .build()?;
        let payload = self.execute_stmt(&select).await?;

        match payload {
            Payload::Select { labels, rows } => {
                let row = DbRowVersionInfo::from_gluesql_rows(&labels, rows)?;
                Ok(row.into_iter().next())
            }
            p => Err(eyre!("unexpected payload: {:?}", p)),
        }
    }

    async fn upsert_version_info(&mut self, version: DbRowVersionInfo) -> eyre::Result<()> {
        match self.query_version_info().await? {
            None => {
                self.insert(version).await?;
            }
            Some(_) => {
                let stmt = ast_builder::table(self.name())
                    .update()
                    .set("version", version.version.to_gluesql())
                    .build()?;
                match self.execute_stmt(&stmt).await? {
                    Payload::Update(_) => {}
                    p => bail!("unexpected payload {:?}", p),
                }
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
pub trait CheckVersionInfo {
    /// fails with `VersionMismatch` unless the stored version equals `expected`, a missing row reads as version 0
    async fn check_version_info(&mut self, expected: u64) -> eyre::Result<()>;
    /// create the table and stamp `version` when the store is fresh, check it otherwise
    async fn init_version_info(&mut self, version: u64) -> eyre::Result<()>;
}

#[async_trait(?Send)]
impl<G: GStore + GStoreMut> CheckVersionInfo for Table<G, DbRowVersionInfo> {
    async fn check_version_info(&mut self, expected: u64) -> eyre::Result<()> {
        let found = if self.exists().await? {
            self.query_version_info().await?.map(|v| v.version).unwrap_or(0)
        } else {
            0
        };
        if found != expected {
            return Err(AssetError::VersionMismatch { expected, found }.into());
        }
        Ok(())
    }

    async fn init_version_info(&mut self, version: u64) -> eyre::Result<()> {
        if self.exists().await? {
            return self.check_version_info(version).await;
        }
        self.create_table().await?;
        self.upsert_version_info(DbRowVersionInfo { version }).await?;
        info!("Stamped asset db version {}", version);
        Ok(())
    }
}
