//! SQL transaction-log dump of the whole store

use std::io::Write;
use rusqlite::types::ValueRef;
use super::schema;
use super::sqlite::SqliteStore;
use crate::Result;

impl SqliteStore {
    /// Write the store as an ordered SQL script: `BEGIN TRANSACTION;`, table
    /// definitions, rows in dependency order, indexes, `COMMIT;`.
    pub fn dump_sql<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "BEGIN TRANSACTION;")?;

        for table in schema::TABLES {
            let create: String = self.conn.query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )?;
            writeln!(out, "{};", create.trim())?;

            let mut stmt = self.conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", table))?;
            let columns = stmt.column_count();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(columns);
                for i in 0..columns {
                    values.push(sql_literal(row.get_ref(i)?));
                }
                writeln!(out, "INSERT INTO \"{}\" VALUES({});", table, values.join(","))?;
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT sql FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL ORDER BY name",
        )?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        for index in indexes {
            writeln!(out, "{};", index.trim())?;
        }

        writeln!(out, "COMMIT;")?;
        Ok(())
    }
}

fn sql_literal(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => format!("'{}'", String::from_utf8_lossy(t).replace('\'', "''")),
        ValueRef::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
            format!("X'{}'", hex)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_is_ordered_script() {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("O'Hare", 2).unwrap();
        store.insert_appliance("R1", site).unwrap();

        let mut out = Vec::new();
        store.dump_sql(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("BEGIN TRANSACTION;\n"));
        assert!(text.trim_end().ends_with("COMMIT;"));
        assert!(text.contains("INSERT INTO \"site\" VALUES(1,'O''Hare',2);"));
        let site_pos = text.find("INSERT INTO \"site\"").unwrap();
        let app_pos = text.find("INSERT INTO \"appliance\"").unwrap();
        assert!(site_pos < app_pos);
        assert!(text.contains("CREATE INDEX"));
    }

    #[test]
    fn test_dump_replays_into_empty_database() {
        let store = SqliteStore::open_in_memory().unwrap();
        let site = store.insert_site("Core", 0).unwrap();
        let app = store.insert_appliance("PE1", site).unwrap();
        store.ensure_default_vrf(app).unwrap();

        let mut out = Vec::new();
        store.dump_sql(&mut out).unwrap();
        let script = String::from_utf8(out).unwrap();

        let replay = rusqlite::Connection::open_in_memory().unwrap();
        replay.execute_batch(&script).unwrap();
        let vrfs: i64 = replay.query_row("SELECT COUNT(*) FROM vrf", [], |row| row.get(0)).unwrap();
        assert_eq!(vrfs, 1);
    }
}
