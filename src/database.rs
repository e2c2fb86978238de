use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

use crate::concurrent_status::ConcurrentStatus;
use crate::config::DbConfig;
use crate::heap::buffer_pool::BufferPool;
use crate::heap::catalog::Catalog;
use crate::types::Pod;
use crate::utils::HandyRwLock;

static SINGLETON: Lazy<Database> = Lazy::new(Database::new);

/// We collect all shared state here: the buffer pool, the lock table, the
/// catalog, and the active configuration.
///
/// Components are handed out one guard at a time through the static
/// accessors; no accessor returns two guards at once, which keeps the
/// locking order between components visible at the call sites.
pub struct Database {
    path: PathBuf,

    config: RwLock<DbConfig>,

    buffer_pool: Pod<BufferPool>,
    catalog: Pod<Catalog>,
    concurrent_status: Pod<ConcurrentStatus>,
}

impl Database {
    fn new() -> Self {
        let db_name = "default_db";
        let path = PathBuf::from("data").join(db_name);
        if !path.exists() {
            std::fs::create_dir_all(&path).unwrap();
        }

        let config = DbConfig::default();

        Self {
            path,

            buffer_pool: Arc::new(RwLock::new(BufferPool::new(&config))),
            catalog: Arc::new(RwLock::new(Catalog::new())),
            concurrent_status: Arc::new(RwLock::new(ConcurrentStatus::new())),

            config: RwLock::new(config),
        }
    }

    pub fn global() -> &'static Self {
        &SINGLETON
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn config() -> DbConfig {
        Self::global().config.rl().clone()
    }

    pub fn buffer_pool() -> RwLockReadGuard<'static, BufferPool> {
        Self::global().buffer_pool.rl()
    }

    pub fn mut_buffer_pool() -> RwLockWriteGuard<'static, BufferPool> {
        Self::global().buffer_pool.wl()
    }

    pub fn catalog() -> RwLockReadGuard<'static, Catalog> {
        Self::global().catalog.rl()
    }

    pub fn mut_catalog() -> RwLockWriteGuard<'static, Catalog> {
        Self::global().catalog.wl()
    }

    pub fn concurrent_status() -> RwLockReadGuard<'static, ConcurrentStatus> {
        Self::global().concurrent_status.rl()
    }

    pub fn mut_concurrent_status() -> RwLockWriteGuard<'static, ConcurrentStatus> {
        Self::global().concurrent_status.wl()
    }

    /// Reset the database with the default configuration. Used by unit
    /// tests only.
    pub fn reset() {
        Self::reset_with(DbConfig::default());
    }

    /// Reset the database with a custom configuration: empty catalog,
    /// empty lock table, and a fresh buffer pool built from `config`.
    /// Used by unit tests only.
    pub fn reset_with(config: DbConfig) {
        let db = Self::global();

        *db.buffer_pool.wl() = BufferPool::new(&config);
        db.catalog.wl().clear();
        db.concurrent_status.wl().clear();
        *db.config.wl() = config;
    }
}
