//! Tiered configuration.
//!
//! Configuration comes from four tiers, merged field-by-field (later wins):
//! 1. **Defaults** - compiled into the binary
//! 2. **Project** - `$CWD/inspection-lineage/config.yaml`
//! 3. **User** - `~/.inspection-lineage/config.yaml`
//! 4. **Environment** - the variables below
//!
//! ## Environment Variables
//! - `INSPECTION_LINEAGE_CONFIG_PATH` - Explicit config file (overrides all file tiers)
//! - `INSPECTION_LINEAGE_PROJECT_DIR` - Project config dir (default: `./inspection-lineage`)
//! - `INSPECTION_LINEAGE_USER_DIR` - User config dir (default: `~/.inspection-lineage`)
//! - `INSPECTION_LINEAGE_DB_PATH` - Database path
//! - `INSPECTION_LINEAGE_PAGE_SIZE` - Rows per task page
//! - `INSPECTION_LINEAGE_MAX_CHAIN_DEPTH` - Ancestor chain depth cap
//! - `INSPECTION_LINEAGE_DEDUP_POLICY` - `leaf_wins` or `root_wins`

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
