// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;
use std::str::FromStr;

use log::{debug, warn};

use crate::db::models::{FieldRow, SubmissionRow, SubmissionValueRow};
use crate::db::{now, SqlStore};
use crate::definition::FieldType;
use crate::submission::{FieldValue, Submission, SubmissionError};

/// Outcome of a successful dual-write.
#[derive(Debug, Clone)]
pub struct PersistReceipt {
    /// Id of the persisted submission.
    pub submission_id: String,

    /// Whether the materialized row was written too. `false` when the form
    /// has not been activated yet, the canonical record still stands.
    pub materialized: bool,
}

/// Persists one submission: canonical generic rows first, then the
/// materialized row.
///
/// The canonical write commits as one transaction and is never rolled back
/// afterwards, it is the source of truth. A failure on the physical side
/// surfaces as [`SubmissionError::ReconciliationNeeded`] which callers
/// retry idempotently via [`rematerialize`]. All identifiers used here were
/// resolved and persisted at definition time, nothing on this path waits on
/// the translation tier.
pub async fn persist(
    store: &SqlStore,
    submission: &Submission,
    values: &HashMap<String, FieldValue>,
) -> Result<PersistReceipt, SubmissionError> {
    let form = store
        .get_form(&submission.form_id)
        .await?
        .ok_or_else(|| SubmissionError::FormNotFound(submission.form_id.clone()))?;

    let fields = store.get_fields(&form.id).await?;

    for field_id in values.keys() {
        if !fields.iter().any(|field| &field.id == field_id) {
            return Err(SubmissionError::UnknownField(field_id.clone()));
        }
    }

    for field in &fields {
        let provided = values
            .get(&field.id)
            .map(|value| *value != FieldValue::Null)
            .unwrap_or(false);
        if field.required == 1 && !provided {
            return Err(SubmissionError::MissingRequiredValue {
                field: field.title.clone(),
            });
        }
    }

    // Both the immediate parent link and the root reference carry the same
    // parent submission id, divergence between the two is a bug guarded
    // against by `verify_parent_links`.
    let parent_id = submission.parent_submission_id.clone();
    let timestamp = now();

    let head = SubmissionRow {
        id: submission.id.clone(),
        form_id: submission.form_id.clone(),
        parent_submission_id: parent_id.clone(),
        root_submission_id: parent_id.clone(),
        submitted_by: submission.submitted_by.clone(),
        created_at: timestamp,
        updated_at: timestamp,
    };

    let value_rows: Vec<SubmissionValueRow> = fields
        .iter()
        .filter_map(|field| {
            values.get(&field.id).map(|value| SubmissionValueRow {
                submission_id: submission.id.clone(),
                field_id: field.id.clone(),
                value: value.as_canonical_text(),
                value_kind: value.kind().to_owned(),
                is_encrypted: i64::from(is_sensitive(field)),
            })
        })
        .collect();

    store.insert_canonical(&head, &value_rows).await?;
    debug!(
        "Canonically persisted submission {} with {} values",
        submission.id,
        value_rows.len()
    );

    let table_name = match &form.table_name {
        Some(table_name) => table_name.clone(),
        None => {
            debug!(
                "Form {} has no materialized table yet, canonical write only",
                form.id
            );
            return Ok(PersistReceipt {
                submission_id: submission.id.clone(),
                materialized: false,
            });
        }
    };

    let columns = column_values(&fields, values);
    let parent_links = parent_id.as_deref().map(|parent| (parent, parent));

    if let Err(err) = store
        .upsert_materialized_row(
            &table_name,
            &submission.id,
            &submission.form_id,
            &submission.submitted_by,
            parent_links,
            &columns,
        )
        .await
    {
        warn!(
            "Materialized write of submission {} failed, canonical record stands: {}",
            submission.id, err
        );
        return Err(SubmissionError::ReconciliationNeeded {
            submission_id: submission.id.clone(),
        });
    }

    Ok(PersistReceipt {
        submission_id: submission.id.clone(),
        materialized: true,
    })
}

/// Retries only the materialized side of a submission, rebuilding the row
/// from the canonical records. Idempotent, the physical row is keyed by the
/// submission id.
pub async fn rematerialize(
    store: &SqlStore,
    submission_id: &str,
) -> Result<PersistReceipt, SubmissionError> {
    let head = store
        .get_submission(submission_id)
        .await?
        .ok_or_else(|| SubmissionError::SubmissionNotFound(submission_id.to_owned()))?;

    let form = store
        .get_form(&head.form_id)
        .await?
        .ok_or_else(|| SubmissionError::FormNotFound(head.form_id.clone()))?;

    let table_name = match &form.table_name {
        Some(table_name) => table_name.clone(),
        None => {
            return Ok(PersistReceipt {
                submission_id: submission_id.to_owned(),
                materialized: false,
            })
        }
    };

    let fields = store.get_fields(&form.id).await?;
    let value_rows = store.get_submission_values(submission_id).await?;

    let values: HashMap<String, FieldValue> = value_rows
        .iter()
        .map(|row| {
            (
                row.field_id.clone(),
                FieldValue::from_canonical(&row.value_kind, row.value.as_deref()),
            )
        })
        .collect();

    let columns = column_values(&fields, &values);
    let parent_links = head
        .parent_submission_id
        .as_deref()
        .map(|parent| (parent, parent));

    if let Err(err) = store
        .upsert_materialized_row(
            &table_name,
            &head.id,
            &head.form_id,
            &head.submitted_by,
            parent_links,
            &columns,
        )
        .await
    {
        warn!("Rematerialization of {} failed: {}", submission_id, err);
        return Err(SubmissionError::ReconciliationNeeded {
            submission_id: submission_id.to_owned(),
        });
    }

    Ok(PersistReceipt {
        submission_id: submission_id.to_owned(),
        materialized: true,
    })
}

/// Returns the ids of materialized rows whose immediate parent link and
/// root reference diverge. Always empty unless something bypassed the
/// coordinator.
pub async fn verify_parent_links(
    store: &SqlStore,
    form_id: &str,
) -> Result<Vec<String>, SubmissionError> {
    let form = store
        .get_form(form_id)
        .await?
        .ok_or_else(|| SubmissionError::FormNotFound(form_id.to_owned()))?;

    match &form.table_name {
        Some(table_name) => {
            let divergent = store.find_divergent_parent_links(table_name).await?;
            Ok(divergent)
        }
        None => Ok(Vec::new()),
    }
}

/// Maps provided values onto their persisted column identifiers.
fn column_values(
    fields: &[FieldRow],
    values: &HashMap<String, FieldValue>,
) -> Vec<(String, FieldValue)> {
    fields
        .iter()
        .filter_map(|field| {
            let column_name = field.column_name.clone()?;
            let value = values.get(&field.id)?;
            Some((column_name, value.clone()))
        })
        .collect()
}

fn is_sensitive(field: &FieldRow) -> bool {
    FieldType::from_str(&field.field_type)
        .map(|field_type| field_type.is_sensitive())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::db::{DatabaseKind, SqlStore};
    use crate::migration::reconcile;
    use crate::submission::{FieldValue, Submission, SubmissionError};
    use crate::test_utils::{initialize_db, insert_test_form_with_fields, TestField};

    use super::{persist, rematerialize, verify_parent_links};

    async fn materialized_form(store: &SqlStore) {
        insert_test_form_with_fields(
            store,
            "form-1",
            "patients_ab12",
            &[
                TestField::new("field-1", "full_name_cd34", "short_answer"),
                TestField::new("field-2", "phone_ef56", "phone"),
            ],
        )
        .await;
        reconcile(store, "form-1", 90).await.unwrap();
    }

    fn payload() -> HashMap<String, FieldValue> {
        let mut values = HashMap::new();
        values.insert("field-1".to_string(), FieldValue::Text("Somchai".into()));
        values.insert(
            "field-2".to_string(),
            FieldValue::Text("081-234-5678".into()),
        );
        values
    }

    #[tokio::test]
    async fn writes_both_representations() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);
        materialized_form(&store).await;

        let submission = Submission {
            id: "sub-1".into(),
            form_id: "form-1".into(),
            parent_submission_id: None,
            submitted_by: "user-1".into(),
        };

        let receipt = persist(&store, &submission, &payload()).await.unwrap();
        assert!(receipt.materialized);

        // Canonical rows.
        let values = store.get_submission_values("sub-1").await.unwrap();
        assert_eq!(values.len(), 2);

        // Sensitive types carry the encryption flag.
        let phone = values
            .iter()
            .find(|value| value.field_id == "field-2")
            .unwrap();
        assert_eq!(phone.is_encrypted, 1);

        // Materialized row.
        assert_eq!(
            store.count_materialized_rows("patients_ab12").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);
        materialized_form(&store).await;

        let submission = Submission {
            id: "sub-1".into(),
            form_id: "form-1".into(),
            parent_submission_id: None,
            submitted_by: "user-1".into(),
        };

        let mut values = HashMap::new();
        values.insert("no-such-field".to_string(), FieldValue::Null);

        let result = persist(&store, &submission, &values).await;
        assert!(matches!(result, Err(SubmissionError::UnknownField(_))));
    }

    #[tokio::test]
    async fn canonical_write_survives_missing_table() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        // Form metadata names a table which was never created, the physical
        // write will fail. The canonical write must still succeed.
        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[TestField::new("field-1", "full_name_cd34", "short_answer")],
        )
        .await;
        let submission = Submission {
            id: "sub-1".into(),
            form_id: "form-1".into(),
            parent_submission_id: None,
            submitted_by: "user-1".into(),
        };

        let mut values = HashMap::new();
        values.insert("field-1".to_string(), FieldValue::Text("Somchai".into()));

        let result = persist(&store, &submission, &values).await;
        assert!(matches!(
            result,
            Err(SubmissionError::ReconciliationNeeded { .. })
        ));

        // The canonical record stands regardless.
        assert!(store.get_submission("sub-1").await.unwrap().is_some());

        // After the table appears, rematerialization succeeds.
        reconcile(&store, "form-1", 90).await.unwrap();
        let receipt = rematerialize(&store, "sub-1").await.unwrap();
        assert!(receipt.materialized);
        assert_eq!(
            store.count_materialized_rows("patients_ab12").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn sub_form_rows_carry_equal_parent_and_root_links() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);
        materialized_form(&store).await;

        insert_test_form_with_fields(
            &store,
            "form-2",
            "visits_9900",
            &[TestField::new("field-3", "note_1122", "paragraph")],
        )
        .await;
        store
            .execute_ddl("UPDATE forms SET parent_form_id = 'form-1' WHERE id = 'form-2'")
            .await
            .unwrap();
        reconcile(&store, "form-2", 90).await.unwrap();

        // Parent row first.
        let parent = Submission {
            id: "sub-parent".into(),
            form_id: "form-1".into(),
            parent_submission_id: None,
            submitted_by: "user-1".into(),
        };
        persist(&store, &parent, &payload()).await.unwrap();

        // Sub-form row below it.
        let child = Submission {
            id: "sub-child".into(),
            form_id: "form-2".into(),
            parent_submission_id: Some("sub-parent".into()),
            submitted_by: "user-1".into(),
        };
        let mut values = HashMap::new();
        values.insert("field-3".to_string(), FieldValue::Text("first visit".into()));
        persist(&store, &child, &values).await.unwrap();

        // The invariant check finds nothing to complain about.
        let divergent = verify_parent_links(&store, "form-2").await.unwrap();
        assert!(divergent.is_empty());

        // A row written behind the coordinator's back is detected. Both ids
        // exist in the parent table, only the invariant between them is
        // broken.
        let second_parent = Submission {
            id: "sub-parent-2".into(),
            form_id: "form-1".into(),
            parent_submission_id: None,
            submitted_by: "user-1".into(),
        };
        persist(&store, &second_parent, &payload()).await.unwrap();

        store
            .execute_ddl(
                "INSERT INTO visits_9900 (id, form_id, submitted_by, parent_id, root_id, \
                 created_at, updated_at) \
                 VALUES ('rogue', 'form-2', 'user-1', 'sub-parent', 'sub-parent-2', 0, 0)",
            )
            .await
            .unwrap();

        let divergent = verify_parent_links(&store, "form-2").await.unwrap();
        assert_eq!(divergent, vec!["rogue".to_string()]);
    }
}
