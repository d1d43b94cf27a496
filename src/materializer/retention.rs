// SPDX-License-Identifier: AGPL-3.0-or-later

use log::{debug, info};

use crate::context::Context;
use crate::db::errors::BackupStorageError;

/// Deletes field data backups whose retention window has passed.
///
/// Works through the expired rows in bounded batches so a large backlog
/// never holds one long-running statement. Returns the total number of
/// purged records.
pub async fn purge_expired_backups(context: &Context) -> Result<u64, BackupStorageError> {
    let batch_size = context.config.backup_purge_batch_size;
    let mut total = 0;

    loop {
        let purged = context.store.purge_expired_backups(batch_size).await?;
        if purged == 0 {
            break;
        }

        debug!("Purged batch of {} expired field data backups", purged);
        total += purged;
    }

    if total > 0 {
        info!("Purged {} expired field data backups", total);
    }

    Ok(total)
}
