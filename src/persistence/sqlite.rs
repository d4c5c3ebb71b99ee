use super::file::{format_datetime, parse_datetime};
use super::{AssignmentStore, PersistenceError, PersistenceResult};
use crate::assignment::{AssignmentSnapshot, SeriesKind};
use crate::duration::{TimeUnit, WorkDuration};
use crate::span::TimeSpan;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::{Mutex, MutexGuard};

pub struct SqliteAssignmentStore {
    connection: Mutex<Connection>,
}

impl SqliteAssignmentStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS assignments (
                id INTEGER PRIMARY KEY,
                task_id INTEGER NOT NULL,
                resource_id INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS timephased_spans (
                assignment_id INTEGER NOT NULL REFERENCES assignments(id) ON DELETE CASCADE,
                type_code INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                start TEXT NOT NULL,
                finish TEXT NOT NULL,
                total_amount REAL NOT NULL,
                amount_per_day REAL NOT NULL,
                unit TEXT NOT NULL,
                per_day_unit TEXT NOT NULL,
                PRIMARY KEY (assignment_id, type_code, seq)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    fn save_spans(
        tx: &Transaction,
        assignment_id: i32,
        kind: SeriesKind,
        spans: &[TimeSpan],
    ) -> PersistenceResult<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO timephased_spans
                (assignment_id, type_code, seq, start, finish,
                 total_amount, amount_per_day, unit, per_day_unit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for (seq, span) in spans.iter().enumerate() {
            stmt.execute(params![
                assignment_id,
                kind.type_code(),
                seq as i64,
                format_datetime(span.start()),
                format_datetime(span.finish()),
                span.total_amount().amount(),
                span.amount_per_day().amount(),
                span.total_amount().unit().as_str(),
                span.amount_per_day().unit().as_str(),
            ])?;
        }
        Ok(())
    }

    fn load_spans(
        conn: &Connection,
        assignment_id: i32,
        kind: SeriesKind,
    ) -> PersistenceResult<Vec<TimeSpan>> {
        let mut stmt = conn.prepare(
            "SELECT start, finish, total_amount, amount_per_day, unit, per_day_unit
             FROM timephased_spans
             WHERE assignment_id = ?1 AND type_code = ?2
             ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![assignment_id, kind.type_code()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut spans = Vec::new();
        for row in rows {
            let (start, finish, total, per_day, unit, per_day_unit) = row?;
            let unit: TimeUnit = unit.parse()?;
            let per_day_unit: TimeUnit = per_day_unit.parse()?;
            let span = TimeSpan::new(
                parse_datetime(&start)?,
                parse_datetime(&finish)?,
                WorkDuration::new(total, unit),
            )?
            .with_amount_per_day(WorkDuration::new(per_day, per_day_unit));
            spans.push(span);
        }
        Ok(spans)
    }

    fn load_snapshot(
        conn: &Connection,
        id: i32,
        task_id: i32,
        resource_id: i32,
    ) -> PersistenceResult<AssignmentSnapshot> {
        Ok(AssignmentSnapshot {
            id,
            task_id,
            resource_id,
            planned: Self::load_spans(conn, id, SeriesKind::Planned)?,
            complete: Self::load_spans(conn, id, SeriesKind::Complete)?,
        })
    }
}

impl AssignmentStore for SqliteAssignmentStore {
    fn save_assignments(&self, assignments: &[AssignmentSnapshot]) -> PersistenceResult<()> {
        super::validate_snapshots(assignments)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM timephased_spans", [])?;
        tx.execute("DELETE FROM assignments", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO assignments (id, task_id, resource_id) VALUES (?1, ?2, ?3)")?;
            for assignment in assignments {
                stmt.execute(params![assignment.id, assignment.task_id, assignment.resource_id])?;
            }
        }
        for assignment in assignments {
            Self::save_spans(&tx, assignment.id, SeriesKind::Planned, &assignment.planned)?;
            Self::save_spans(&tx, assignment.id, SeriesKind::Complete, &assignment.complete)?;
        }
        tx.commit()?;
        tracing::debug!(assignments = assignments.len(), "saved assignments to sqlite");
        Ok(())
    }

    fn load_assignments(&self) -> PersistenceResult<Vec<AssignmentSnapshot>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, task_id, resource_id FROM assignments ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, i32>(1)?, row.get::<_, i32>(2)?))
        })?;

        let mut assignments = Vec::new();
        for row in rows {
            let (id, task_id, resource_id) = row?;
            assignments.push(Self::load_snapshot(&conn, id, task_id, resource_id)?);
        }
        Ok(assignments)
    }

    fn load_assignment(&self, id: i32) -> PersistenceResult<AssignmentSnapshot> {
        let conn = self.lock()?;
        let header: Option<(i32, i32)> = conn
            .query_row(
                "SELECT task_id, resource_id FROM assignments WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((task_id, resource_id)) = header else {
            return Err(PersistenceError::NotFound(id));
        };
        Self::load_snapshot(&conn, id, task_id, resource_id)
    }
}
