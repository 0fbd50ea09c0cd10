//! Read-only mobile country code reference table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::CountryCode;
use crate::schema::country_codes;

fn map_country_code(row: &Row<'_>) -> rusqlite::Result<CountryCode> {
    Ok(CountryCode {
        code: row.get(0)?,
        abbreviation: row.get(1)?,
        name: row.get(2)?,
    })
}

fn select_columns() -> String {
    format!(
        "SELECT {}, {}, {} FROM {}",
        country_codes::CODE,
        country_codes::ABBREVIATION,
        country_codes::NAME,
        country_codes::TABLE
    )
}

/// Look up one country code
pub fn find(conn: &Connection, code: i32) -> Result<Option<CountryCode>> {
    let found = conn
        .query_row(
            &format!("{} WHERE {} = ?1", select_columns(), country_codes::CODE),
            params![code],
            map_country_code,
        )
        .optional()?;
    Ok(found)
}

/// List every seeded country code
pub fn get_all(conn: &Connection) -> Result<Vec<CountryCode>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY {}", select_columns(), country_codes::CODE))?;
    let found = stmt
        .query_map([], map_country_code)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(found)
}
