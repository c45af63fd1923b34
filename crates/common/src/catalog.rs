use crate::error::{Error, Result};
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::datasource::TableProvider;
use std::collections::HashMap;
use std::sync::Arc;

/// Which lookup styles a table offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupCapability {
    pub supports_sync: bool,
    pub supports_async: bool,
}

impl LookupCapability {
    pub const SYNC: Self = Self { supports_sync: true, supports_async: false };
    pub const ASYNC: Self = Self { supports_sync: false, supports_async: true };
    pub const BOTH: Self = Self { supports_sync: true, supports_async: true };
    pub const NONE: Self = Self { supports_sync: false, supports_async: false };

    pub fn supports_lookup(&self) -> bool {
        self.supports_sync || self.supports_async
    }
}

impl Default for LookupCapability {
    fn default() -> Self {
        Self::SYNC
    }
}

/// A registered lookup table: its provider plus the metadata the planner needs.
#[derive(Debug, Clone)]
pub struct LookupTableEntry {
    pub name: String,
    pub provider: Arc<dyn TableProvider>,
    /// Declared primary key column names, in key order.
    pub primary_key: Option<Vec<String>>,
    pub capability: LookupCapability,
}

impl LookupTableEntry {
    pub fn schema(&self) -> SchemaRef {
        self.provider.schema()
    }
}

pub struct LookupCatalog {
    tables: HashMap<String, LookupTableEntry>,
}

impl Default for LookupCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupCatalog {
    pub fn new() -> Self {
        Self { tables: HashMap::new() }
    }

    /// Registers a table, replacing any previous registration under the same name.
    pub fn register_table(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn TableProvider>,
        primary_key: Option<Vec<String>>,
        capability: LookupCapability,
    ) -> Option<LookupTableEntry> {
        let name = name.into();
        let entry = LookupTableEntry { name: name.clone(), provider, primary_key, capability };
        self.tables.insert(name, entry)
    }

    pub fn get_table(&self, name: &str) -> Option<&LookupTableEntry> {
        self.tables.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&LookupTableEntry> {
        self.get_table(name).ok_or_else(|| Error::TableNotFound(name.to_string()))
    }
}
