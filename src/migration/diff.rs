// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::stores::LiveColumn;
use crate::schema::{TableDesign, SYSTEM_COLUMNS};

/// One structural operation against a materialized table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MigrationOp {
    /// A field was added, its column does not exist yet.
    AddColumn {
        /// Column identifier.
        column: String,

        /// Relational type of the new column.
        sql_type: String,
    },

    /// A field's declared type changed, the column must be retyped after a
    /// data backup.
    AlterColumnType {
        /// Column identifier.
        column: String,

        /// Type currently live in the table.
        from_type: String,

        /// Type required by the definition.
        to_type: String,
    },

    /// A field was removed, its column is dropped after a data backup.
    DropColumn {
        /// Column identifier.
        column: String,
    },
}

/// Diffs a table design against the live column set.
///
/// Operations come back in a fixed order: additions first, then type
/// changes, then removals. This keeps the window in which the physical
/// table is structurally narrower than the canonical record set as small
/// as possible.
pub fn plan(design: &TableDesign, live: &[LiveColumn]) -> Vec<MigrationOp> {
    let mut operations = Vec::new();

    let is_system = |name: &str| SYSTEM_COLUMNS.contains(&name);

    // Field columns the definition expects.
    let expected: Vec<_> = design
        .columns
        .iter()
        .filter(|column| !is_system(&column.name))
        .collect();

    for column in &expected {
        match live.iter().find(|live| live.name == column.name) {
            None => operations.push(MigrationOp::AddColumn {
                column: column.name.clone(),
                sql_type: column.sql_type.clone(),
            }),
            Some(live_column) if live_column.sql_type != column.sql_type => {
                operations.push(MigrationOp::AlterColumnType {
                    column: column.name.clone(),
                    from_type: live_column.sql_type.clone(),
                    to_type: column.sql_type.clone(),
                });
            }
            Some(_) => (),
        }
    }

    // Additions before type changes before removals.
    operations.sort_by_key(|operation| match operation {
        MigrationOp::AddColumn { .. } => 0,
        MigrationOp::AlterColumnType { .. } => 1,
        MigrationOp::DropColumn { .. } => 2,
    });

    for live_column in live {
        if is_system(&live_column.name) {
            continue;
        }

        if !expected.iter().any(|column| column.name == live_column.name) {
            operations.push(MigrationOp::DropColumn {
                column: live_column.name.clone(),
            });
        }
    }

    operations
}
