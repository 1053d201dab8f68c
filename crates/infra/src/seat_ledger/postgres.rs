//! Postgres-backed seat ledger.
//!
//! Every query is scoped by `tenant_id`. Commits run in one transaction:
//!
//! 1. `UPDATE seat_pools ... WHERE version = $expected` (zero rows means another
//!    writer won: `Conflict`)
//! 2. insert or delete the enrollment row
//! 3. commit
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |------------|-----------------|--------------|
//! | unique violation | `23505` | `Conflict` (duplicate enrollment or pool) |
//! | check violation | `23514` | `Backend` (would break `0 <= used <= total`) |
//! | anything else | any | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use seatwise_core::{EnrollmentId, ExpectedVersion, MemberId, TenantId, UnitId, Versioned};
use seatwise_licensing::{Enrollment, SeatPool};

use super::store::{EnrollmentFilter, SeatLedgerStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_seat_ledger.sql");

#[derive(Debug, Clone)]
pub struct PostgresSeatLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresSeatLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

/// Version-guarded write of the pool counters. Zero affected rows means the
/// expectation no longer holds.
async fn swap_pool(
    tx: &mut Transaction<'static, Postgres>,
    pool: &SeatPool,
    expected: ExpectedVersion,
) -> Result<(), StoreError> {
    let result = match expected {
        ExpectedVersion::Absent => sqlx::query(
            r#"
            INSERT INTO seat_pools (tenant_id, unit_id, total, used, version)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, unit_id) DO NOTHING
            "#,
        )
        .bind(*pool.tenant_id().as_uuid())
        .bind(pool.unit_id().as_str())
        .bind(i64::from(pool.total()))
        .bind(i64::from(pool.used()))
        .bind(version_to_db(pool.version())?)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_pool", e))?,

        ExpectedVersion::Exact(v) => sqlx::query(
            r#"
            UPDATE seat_pools
            SET total = $3, used = $4, version = $5, updated_at = now()
            WHERE tenant_id = $1 AND unit_id = $2 AND version = $6
            "#,
        )
        .bind(*pool.tenant_id().as_uuid())
        .bind(pool.unit_id().as_str())
        .bind(i64::from(pool.total()))
        .bind(i64::from(pool.used()))
        .bind(version_to_db(pool.version())?)
        .bind(version_to_db(v)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_pool", e))?,
    };

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!(
            "seat pool {}: expected {expected:?} no longer holds",
            pool.unit_id()
        )));
    }
    Ok(())
}

#[async_trait]
impl SeatLedgerStore for PostgresSeatLedgerStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, unit_id = %unit_id), err)]
    async fn load_pool(&self, tenant_id: TenantId, unit_id: &UnitId) -> Result<Option<SeatPool>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, unit_id, total, used, version
            FROM seat_pools
            WHERE tenant_id = $1 AND unit_id = $2
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(unit_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_pool", e))?;

        row.as_ref().map(pool_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_pools(&self, tenant_id: TenantId) -> Result<Vec<SeatPool>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, unit_id, total, used, version
            FROM seat_pools
            WHERE tenant_id = $1
            ORDER BY unit_id ASC
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_pools", e))?;

        rows.iter().map(pool_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, unit_id = %unit_id, member_id = %member_id), err)]
    async fn find_enrollment(
        &self,
        tenant_id: TenantId,
        unit_id: &UnitId,
        member_id: MemberId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT enrollment_id, tenant_id, unit_id, member_id, enrolled_at
            FROM enrollments
            WHERE tenant_id = $1 AND unit_id = $2 AND member_id = $3
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(unit_id.as_str())
        .bind(*member_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_enrollment", e))?;

        row.as_ref().map(enrollment_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_enrollments(
        &self,
        tenant_id: TenantId,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT enrollment_id, tenant_id, unit_id, member_id, enrolled_at
            FROM enrollments
            WHERE tenant_id = $1
              AND ($2::TEXT IS NULL OR unit_id = $2)
              AND ($3::UUID IS NULL OR member_id = $3)
            ORDER BY member_id ASC, unit_id ASC
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(filter.unit_id.as_ref().map(UnitId::as_str))
        .bind(filter.member_id.map(|m| *m.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_enrollments", e))?;

        rows.iter().map(enrollment_from_row).collect()
    }

    #[instrument(
        skip(self, pool, enrollment),
        fields(
            tenant_id = %pool.tenant_id(),
            unit_id = %pool.unit_id(),
            member_id = %enrollment.member_id,
            expected_version = ?expected
        ),
        err
    )]
    async fn commit_allocation(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment: &Enrollment,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        swap_pool(&mut tx, pool, expected).await?;

        sqlx::query(
            r#"
            INSERT INTO enrollments (enrollment_id, tenant_id, unit_id, member_id, enrolled_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*enrollment.id.as_uuid())
        .bind(*enrollment.tenant_id.as_uuid())
        .bind(enrollment.unit_id.as_str())
        .bind(*enrollment.member_id.as_uuid())
        .bind(enrollment.enrolled_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!(
                    "member {} already enrolled in {}",
                    enrollment.member_id, enrollment.unit_id
                ))
            } else {
                map_sqlx_error("insert_enrollment", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(
        skip(self, pool),
        fields(
            tenant_id = %pool.tenant_id(),
            unit_id = %pool.unit_id(),
            enrollment_id = %enrollment_id,
            expected_version = ?expected
        ),
        err
    )]
    async fn commit_release(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment_id: EnrollmentId,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        swap_pool(&mut tx, pool, expected).await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM enrollments
            WHERE enrollment_id = $1 AND tenant_id = $2 AND unit_id = $3
            "#,
        )
        .bind(*enrollment_id.as_uuid())
        .bind(*pool.tenant_id().as_uuid())
        .bind(pool.unit_id().as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_enrollment", e))?;

        if deleted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::Conflict(format!(
                "enrollment {enrollment_id} already released"
            )));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(
        skip(self, pool),
        fields(tenant_id = %pool.tenant_id(), unit_id = %pool.unit_id(), expected_version = ?expected),
        err
    )]
    async fn save_purchase(&self, pool: &SeatPool, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        swap_pool(&mut tx, pool, expected).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

fn counter_from_db(column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("{column} {value} out of range")))
}

fn pool_from_row(row: &PgRow) -> Result<SeatPool, StoreError> {
    let decode = |e| map_sqlx_error("decode_pool", e);
    let tenant_id: uuid::Uuid = row.try_get("tenant_id").map_err(decode)?;
    let unit_id: String = row.try_get("unit_id").map_err(decode)?;
    let total: i64 = row.try_get("total").map_err(decode)?;
    let used: i64 = row.try_get("used").map_err(decode)?;
    let version: i64 = row.try_get("version").map_err(decode)?;

    let unit_id = UnitId::new(unit_id).map_err(|e| StoreError::Backend(e.to_string()))?;
    let version = u64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))?;
    SeatPool::restore(
        TenantId::from_uuid(tenant_id),
        unit_id,
        counter_from_db("total", total)?,
        counter_from_db("used", used)?,
        version,
    )
    .map_err(|e| StoreError::Backend(e.to_string()))
}

fn enrollment_from_row(row: &PgRow) -> Result<Enrollment, StoreError> {
    let decode = |e| map_sqlx_error("decode_enrollment", e);
    let id: uuid::Uuid = row.try_get("enrollment_id").map_err(decode)?;
    let tenant_id: uuid::Uuid = row.try_get("tenant_id").map_err(decode)?;
    let unit_id: String = row.try_get("unit_id").map_err(decode)?;
    let member_id: uuid::Uuid = row.try_get("member_id").map_err(decode)?;
    let enrolled_at: DateTime<Utc> = row.try_get("enrolled_at").map_err(decode)?;

    Ok(Enrollment {
        id: EnrollmentId::from_uuid(id),
        tenant_id: TenantId::from_uuid(tenant_id),
        unit_id: UnitId::new(unit_id).map_err(|e| StoreError::Backend(e.to_string()))?,
        member_id: MemberId::from_uuid(member_id),
        enrolled_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
