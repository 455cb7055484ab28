//! Collection-agnostic record operations, dispatching to the repository
//! for each target collection.

use formflow_core::admission::SubmitterKey;
use formflow_core::records::{RoutedRecord, TargetCollection};
use formflow_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use super::{LeadRepo, ResponseRepo, VolunteerRepo};

pub struct RecordRepo;

impl RecordRepo {
    /// Persist a routed record into its collection. Returns the new row ID.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        record: &RoutedRecord,
    ) -> Result<DbId, sqlx::Error> {
        match record {
            RoutedRecord::Lead(r) => LeadRepo::create(executor, r).await.map(|row| row.id),
            RoutedRecord::Volunteer(r) => {
                VolunteerRepo::create(executor, r).await.map(|row| row.id)
            }
            RoutedRecord::Generic(r) => ResponseRepo::create(executor, r).await.map(|row| row.id),
        }
    }

    /// Serialize admissions for one form until the surrounding transaction
    /// ends, so the count and prior-submitter checks stay true until the
    /// insert commits.
    pub async fn lock_form_admissions(
        executor: impl PgExecutor<'_>,
        form_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(form_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_by_source_tag(
        pool: &PgPool,
        target: TargetCollection,
        source_tag: &str,
    ) -> Result<u64, sqlx::Error> {
        match target {
            TargetCollection::Lead => LeadRepo::delete_by_source_tag(pool, source_tag).await,
            TargetCollection::Volunteer => {
                VolunteerRepo::delete_by_source_tag(pool, source_tag).await
            }
            TargetCollection::Generic => ResponseRepo::delete_by_source_tag(pool, source_tag).await,
        }
    }

    pub async fn count_for_form(
        executor: impl PgExecutor<'_>,
        target: TargetCollection,
        form_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        match target {
            TargetCollection::Lead => LeadRepo::count_for_form(executor, form_id).await,
            TargetCollection::Volunteer => {
                VolunteerRepo::count_for_form(executor, form_id).await
            }
            TargetCollection::Generic => ResponseRepo::count_for_form(executor, form_id).await,
        }
    }

    pub async fn submitter_exists(
        executor: impl PgExecutor<'_>,
        target: TargetCollection,
        form_id: DbId,
        key: &SubmitterKey,
    ) -> Result<bool, sqlx::Error> {
        match target {
            TargetCollection::Lead => LeadRepo::submitter_exists(executor, form_id, key).await,
            TargetCollection::Volunteer => {
                VolunteerRepo::submitter_exists(executor, form_id, key).await
            }
            TargetCollection::Generic => {
                ResponseRepo::submitter_exists(executor, form_id, key).await
            }
        }
    }
}
