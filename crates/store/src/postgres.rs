use async_trait::async_trait;
use common::{EventId, InvoiceId, PaymentId, ReservationId, UserId, Version};
use domain::{
    Event, Invoice, InvoiceNumber, Money, Payment, Reservation, ReservationCode, TaxRate,
    TransactionId,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventQuery, ReservationQuery, Result, StoreError,
    repository::{BillingRepository, EventRepository, ReservationRepository},
};

const EVENT_COLUMNS: &str = "id, title, description, category, date, location, capacity, \
     available_seats, price_cents, status, image_url, created_at, updated_at, version";

const RESERVATION_COLUMNS: &str = "id, code, user_id, event_id, number_of_seats, \
     total_price_cents, status, is_paid, notes, cancelled_at, created_at, updated_at, version";

const INVOICE_COLUMNS: &str = "id, number, reservation_id, user_id, subtotal_cents, \
     tax_rate_bps, tax_cents, discount_cents, total_cents, status, issued_at, due_date, paid_at, \
     created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, reservation_id, invoice_id, user_id, amount_cents, method, \
     status, transaction_id, paid_at, created_at, updated_at";

/// PostgreSQL-backed booking store.
///
/// Seat changes are single `UPDATE ... WHERE` statements, so the database row
/// lock is the only synchronization needed between concurrent bookings.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: &PgRow) -> Result<Event> {
        Ok(Event {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get::<String, _>("category")?.parse()?,
            date: row.try_get("date")?,
            location: row.try_get("location")?,
            capacity: count(row, "capacity")?,
            available_seats: count(row, "available_seats")?,
            price_per_person: Money::from_cents(row.try_get("price_cents")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_reservation(row: &PgRow) -> Result<Reservation> {
        Ok(Reservation {
            id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            code: ReservationCode::from_string(row.try_get::<String, _>("code")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            number_of_seats: count(row, "number_of_seats")?,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            is_paid: row.try_get("is_paid")?,
            notes: row.try_get("notes")?,
            cancelled_at: row.try_get("cancelled_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: Version::new(row.try_get("version")?),
        })
    }

    fn row_to_invoice(row: &PgRow) -> Result<Invoice> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("id")?),
            number: InvoiceNumber::from_string(row.try_get::<String, _>("number")?),
            reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax_rate: TaxRate::from_basis_points(count(row, "tax_rate_bps")?),
            tax_amount: Money::from_cents(row.try_get("tax_cents")?),
            discount: Money::from_cents(row.try_get("discount_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            issued_at: row.try_get("issued_at")?,
            due_date: row.try_get("due_date")?,
            paid_at: row.try_get("paid_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
            invoice_id: row
                .try_get::<Option<Uuid>, _>("invoice_id")?
                .map(InvoiceId::from_uuid),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            method: row.try_get::<String, _>("method")?.parse()?,
            status: row.try_get::<String, _>("status")?.parse()?,
            transaction_id: TransactionId::from_string(
                row.try_get::<String, _>("transaction_id")?,
            ),
            paid_at: row.try_get("paid_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Reports why a version-checked update matched no row.
    async fn version_mismatch(
        &self,
        table: &'static str,
        entity: &'static str,
        id: Uuid,
        expected: Version,
    ) -> StoreError {
        let sql = format!("SELECT version FROM {table} WHERE id = $1");
        match sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(actual)) => StoreError::ConcurrencyConflict {
                entity,
                id,
                expected,
                actual: Version::new(actual),
            },
            Ok(None) => StoreError::NotFound { entity, id },
            Err(e) => StoreError::Database(e),
        }
    }
}

fn count(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{column} out of range: {value}")))
}

/// Maps a unique-constraint violation onto `Duplicate`.
fn duplicate_or(entity: &'static str, key: String) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::Duplicate { entity, key };
        }
        StoreError::Database(e)
    }
}

#[async_trait]
impl EventRepository for PostgresStore {
    async fn insert_event(&self, event: &Event) -> Result<Event> {
        let sql = format!(
            r#"
            INSERT INTO events ({EVENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {EVENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.category.as_str())
            .bind(event.date)
            .bind(&event.location)
            .bind(i64::from(event.capacity))
            .bind(i64::from(event.available_seats))
            .bind(event.price_per_person.cents())
            .bind(event.status.as_str())
            .bind(&event.image_url)
            .bind(event.created_at)
            .bind(event.updated_at)
            .bind(Version::first().as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(duplicate_or("event", event.id.to_string()))?;

        Self::row_to_event(&row)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn list_events(&self, query: EventQuery) -> Result<Vec<Event>> {
        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1=1");
        let mut param_count = 0;

        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }
        if query.starting_after.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND date > ${param_count}"));
        }

        sql.push_str(" ORDER BY date ASC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(category) = query.category {
            sqlx_query = sqlx_query.bind(category.as_str());
        }
        if let Some(after) = query.starting_after {
            sqlx_query = sqlx_query.bind(after);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_event).collect()
    }

    async fn update_event(&self, event: &Event) -> Result<Event> {
        let sql = format!(
            r#"
            UPDATE events SET
                title = $2, description = $3, category = $4, date = $5, location = $6,
                capacity = $7, available_seats = $8, price_cents = $9, status = $10,
                image_url = $11, updated_at = $12, version = version + 1
            WHERE id = $1 AND version = $13
            RETURNING {EVENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.category.as_str())
            .bind(event.date)
            .bind(&event.location)
            .bind(i64::from(event.capacity))
            .bind(i64::from(event.available_seats))
            .bind(event.price_per_person.cents())
            .bind(event.status.as_str())
            .bind(&event.image_url)
            .bind(event.updated_at)
            .bind(event.version.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_event(&row),
            None => Err(self
                .version_mismatch("events", "event", event.id.as_uuid(), event.version)
                .await),
        }
    }

    async fn reserve_seats(&self, id: EventId, seats: u32) -> Result<Event> {
        let sql = format!(
            r#"
            UPDATE events
            SET available_seats = available_seats - $2, version = version + 1
            WHERE id = $1 AND available_seats >= $2
            RETURNING {EVENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(i64::from(seats))
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Self::row_to_event(&row);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT available_seats FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientSeats {
                event_id: id,
                requested: seats,
                available: u32::try_from(available).unwrap_or(0),
            }),
            None => Err(StoreError::not_found("event", id)),
        }
    }

    async fn release_seats(&self, id: EventId, seats: u32) -> Result<Event> {
        let sql = format!(
            r#"
            WITH previous AS (
                SELECT available_seats AS previous_available
                FROM events WHERE id = $1 FOR UPDATE
            )
            UPDATE events
            SET available_seats = LEAST(available_seats + $2, capacity), version = version + 1
            FROM previous
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}, previous.previous_available
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(i64::from(seats))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("event", id))?;

        let event = Self::row_to_event(&row)?;
        let previous = count(&row, "previous_available")?;
        let released = event.available_seats.saturating_sub(previous);
        if released < seats {
            tracing::warn!(
                event_id = %id,
                requested = seats,
                released,
                capacity = event.capacity,
                "seat release clamped at capacity"
            );
        }
        Ok(event)
    }
}

#[async_trait]
impl ReservationRepository for PostgresStore {
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<Reservation> {
        let sql = format!(
            r#"
            INSERT INTO reservations ({RESERVATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(reservation.id.as_uuid())
            .bind(reservation.code.as_str())
            .bind(reservation.user_id.as_uuid())
            .bind(reservation.event_id.as_uuid())
            .bind(i64::from(reservation.number_of_seats))
            .bind(reservation.total_price.cents())
            .bind(reservation.status.as_str())
            .bind(reservation.is_paid)
            .bind(&reservation.notes)
            .bind(reservation.cancelled_at)
            .bind(reservation.created_at)
            .bind(reservation.updated_at)
            .bind(Version::first().as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(duplicate_or("reservation", reservation.code.to_string()))?;

        Self::row_to_reservation(&row)
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_reservation).transpose()
    }

    async fn find_reservation_by_code(
        &self,
        code: &ReservationCode,
    ) -> Result<Option<Reservation>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE code = $1");
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_reservation).transpose()
    }

    async fn list_reservations(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        let mut sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE 1=1");
        let mut param_count = 0;

        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.event_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_id = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(event_id) = query.event_id {
            sqlx_query = sqlx_query.bind(event_id.as_uuid());
        }
        if let Some(statuses) = query.statuses {
            let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_reservation).collect()
    }

    async fn update_reservation(&self, reservation: &Reservation) -> Result<Reservation> {
        let sql = format!(
            r#"
            UPDATE reservations SET
                number_of_seats = $2, total_price_cents = $3, status = $4, is_paid = $5,
                notes = $6, cancelled_at = $7, updated_at = $8, version = version + 1
            WHERE id = $1 AND version = $9
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(reservation.id.as_uuid())
            .bind(i64::from(reservation.number_of_seats))
            .bind(reservation.total_price.cents())
            .bind(reservation.status.as_str())
            .bind(reservation.is_paid)
            .bind(&reservation.notes)
            .bind(reservation.cancelled_at)
            .bind(reservation.updated_at)
            .bind(reservation.version.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_reservation(&row),
            None => Err(self
                .version_mismatch(
                    "reservations",
                    "reservation",
                    reservation.id.as_uuid(),
                    reservation.version,
                )
                .await),
        }
    }
}

#[async_trait]
impl BillingRepository for PostgresStore {
    async fn next_invoice_sequence(&self, year: i32) -> Result<u32> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (year, last_value) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = invoice_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(value)
            .map_err(|_| StoreError::InvalidData(format!("invoice sequence out of range: {value}")))
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO invoices ({INVOICE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#
        );
        sqlx::query(&sql)
            .bind(invoice.id.as_uuid())
            .bind(invoice.number.as_str())
            .bind(invoice.reservation_id.as_uuid())
            .bind(invoice.user_id.as_uuid())
            .bind(invoice.subtotal.cents())
            .bind(i64::from(invoice.tax_rate.basis_points()))
            .bind(invoice.tax_amount.cents())
            .bind(invoice.discount.cents())
            .bind(invoice.total.cents())
            .bind(invoice.status.as_str())
            .bind(invoice.issued_at)
            .bind(invoice.due_date)
            .bind(invoice.paid_at)
            .bind(invoice.created_at)
            .bind(invoice.updated_at)
            .execute(&self.pool)
            .await
            .map_err(duplicate_or("invoice", invoice.number.to_string()))?;

        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_invoice).transpose()
    }

    async fn find_invoice_for_reservation(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE reservation_id = $1");
        let row = sqlx::query(&sql)
            .bind(reservation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_invoice).transpose()
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal_cents = $2, tax_rate_bps = $3, tax_cents = $4, discount_cents = $5,
                total_cents = $6, status = $7, issued_at = $8, due_date = $9, paid_at = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.subtotal.cents())
        .bind(i64::from(invoice.tax_rate.basis_points()))
        .bind(invoice.tax_amount.cents())
        .bind(invoice.discount.cents())
        .bind(invoice.total.cents())
        .bind(invoice.status.as_str())
        .bind(invoice.issued_at)
        .bind(invoice.due_date)
        .bind(invoice.paid_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("invoice", invoice.id));
        }
        Ok(())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO payments ({PAYMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#
        );
        sqlx::query(&sql)
            .bind(payment.id.as_uuid())
            .bind(payment.reservation_id.as_uuid())
            .bind(payment.invoice_id.map(|id| id.as_uuid()))
            .bind(payment.user_id.as_uuid())
            .bind(payment.amount.cents())
            .bind(payment.method.as_str())
            .bind(payment.status.as_str())
            .bind(payment.transaction_id.as_str())
            .bind(payment.paid_at)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .execute(&self.pool)
            .await
            .map_err(duplicate_or("payment", payment.transaction_id.to_string()))?;

        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    async fn list_payments(&self, reservation_id: ReservationId) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reservation_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(reservation_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_payment).collect()
    }

    async fn update_payment(&self, payment: &Payment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = $2, paid_at = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("payment", payment.id));
        }
        Ok(())
    }
}

