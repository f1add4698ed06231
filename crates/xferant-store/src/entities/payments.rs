use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::any::AnyRow;
use xferant_core::{
    FieldError, NewPayment, Payment, PaymentFilter, PaymentPatch, PaymentStatus,
};

use super::require_user;
use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::record::{Condition, Guard, Param, Record, RowReader};
use crate::store::Store;

#[async_trait]
impl Record for Payment {
    const ENTITY: &'static str = "payment";
    const TABLE: &'static str = "payments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "amount",
        "currency",
        "status",
        "external_payment_id",
        "provider",
        "created_at",
        "completed_at",
    ];
    const UNIQUE: &'static [&'static str] = &["external_payment_id"];
    const SORTABLE: &'static [&'static str] = &["created_at", "completed_at", "amount"];

    type New = NewPayment;
    type Patch = PaymentPatch;
    type Filter = PaymentFilter;

    fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let r = RowReader::new(row, Self::TABLE);
        Ok(Self {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            amount: r.int("amount")?,
            currency: r.text("currency")?,
            status: r.parse("status")?,
            external_payment_id: r.opt_text("external_payment_id")?,
            provider: r.text("provider")?,
            created_at: r.time("created_at")?,
            completed_at: r.opt_time("completed_at")?,
        })
    }

    fn insert_values(new: &NewPayment, now: i64) -> Vec<(&'static str, Param)> {
        vec![
            ("user_id", new.user_id.as_str().into()),
            ("amount", new.amount.into()),
            ("currency", new.currency.as_str().into()),
            ("status", PaymentStatus::Pending.as_str().into()),
            ("external_payment_id", new.external_payment_id.clone().into()),
            ("provider", new.provider.as_str().into()),
            ("created_at", now.into()),
            ("completed_at", Param::NullableInt(None)),
        ]
    }

    fn assignments(patch: &PaymentPatch, now: i64) -> Vec<(&'static str, Param)> {
        let mut sets: Vec<(&'static str, Param)> = Vec::new();
        if let Some(status) = patch.status {
            sets.push(("status", status.as_str().into()));
            sets.push(("completed_at", Param::NullableInt(Some(now))));
        }
        if let Some(ext) = &patch.external_payment_id {
            sets.push(("external_payment_id", Param::NullableText(Some(ext.clone()))));
        }
        sets
    }

    fn conditions(filter: &PaymentFilter) -> Vec<Condition> {
        let mut conds = Vec::new();
        if let Some(user_id) = &filter.user_id {
            conds.push(Condition::Eq("user_id", user_id.as_str().into()));
        }
        if let Some(status) = filter.status {
            conds.push(Condition::Eq("status", status.as_str().into()));
        }
        if let Some(provider) = &filter.provider {
            conds.push(Condition::Eq("provider", provider.as_str().into()));
        }
        conds
    }

    /// Finalizing only applies to pending payments.
    fn guard(patch: &PaymentPatch) -> Option<Guard> {
        patch.status.map(|_| Guard {
            column: "status",
            value: PaymentStatus::Pending.as_str().into(),
            violation: FieldError::new("status", "payment is already finalized"),
        })
    }

    async fn before_insert(
        conn: &mut AnyConnection,
        db: DatabaseType,
        new: &NewPayment,
        _now: i64,
    ) -> Result<(), StoreError> {
        require_user(conn, db, &new.user_id).await
    }
}

impl Store {
    /// Mark a pending payment completed.
    pub async fn complete_payment(
        &self,
        id: &str,
        external_payment_id: Option<String>,
    ) -> Result<(), StoreError> {
        self.update::<Payment>(
            id,
            PaymentPatch {
                status: Some(PaymentStatus::Completed),
                external_payment_id,
            },
        )
        .await
    }

    /// Mark a pending payment failed.
    pub async fn fail_payment(&self, id: &str) -> Result<(), StoreError> {
        self.update::<Payment>(
            id,
            PaymentPatch {
                status: Some(PaymentStatus::Failed),
                external_payment_id: None,
            },
        )
        .await
    }

    pub async fn find_payment_by_external_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.find_by::<Payment>("external_payment_id", external_payment_id)
            .await
    }
}
