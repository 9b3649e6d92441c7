//! Database schema for upload_queue.db.
//!
//! Defines versioned schema migrations for the upload queue database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Upload Queue Table - Version 0
// =============================================================================

/// Main upload queue table.
///
/// `status` and `requested_at` are mirrored out of the blob into their own
/// columns so that claim and scan queries never need to decode records.
const UPLOAD_QUEUE_TABLE_V0: Table = Table {
    name: "upload_queue",
    columns: &[
        sqlite_column!("local_path", &SqlType::Text, is_primary_key = true),
        sqlite_column!("status", &SqlType::Integer, non_null = true),
        sqlite_column!("requested_at", &SqlType::Integer, non_null = true),
        sqlite_column!("record_blob", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_upload_queue_status", "status, requested_at"),
        ("idx_upload_queue_requested_at", "requested_at"),
    ],
};

/// All schema versions, oldest first. `migration` carries the DDL that
/// brings a database from the previous version to this one.
pub const UPLOAD_QUEUE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[UPLOAD_QUEUE_TABLE_V0],
    migration: None,
}];
