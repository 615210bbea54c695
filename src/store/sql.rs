//! SQL text for the CRUD helpers.
//!
//! Table names, column names and where-clauses are pasted into the statement
//! verbatim. Only values travel as `?` placeholders.

/// `INSERT INTO <table> (<c1>,<c2>) VALUES (?,?)`
pub fn insert(table: &str, columns: &[String]) -> String {
    let placeholders = vec!["?"; columns.len()].join(",");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(","),
        placeholders
    )
}

/// `UPDATE <table> SET <c1>=?,<c2>=? [WHERE <where_clause>]`
pub fn update(table: &str, columns: &[String], where_clause: &str) -> String {
    let assignments = columns
        .iter()
        .map(|column| format!("{}=?", column))
        .collect::<Vec<_>>()
        .join(",");
    format!("UPDATE {} SET {}{}", table, assignments, where_suffix(where_clause))
}

/// `DELETE FROM <table> [WHERE <where_clause>]`
pub fn delete(table: &str, where_clause: &str) -> String {
    format!("DELETE FROM {}{}", table, where_suffix(where_clause))
}

/// `SELECT COUNT(*) AS num FROM <table> [WHERE <where_clause>]`
pub fn count(table: &str, where_clause: &str) -> String {
    format!(
        "SELECT COUNT(*) AS num FROM {}{}",
        table,
        where_suffix(where_clause)
    )
}

/// `SELECT * FROM <table> WHERE `<id_field>`=?`
pub fn select_by_id(table: &str, id_field: &str) -> String {
    format!("SELECT * FROM {} WHERE {}", table, id_condition(id_field))
}

/// `` `<id_field>`=? ``
pub fn id_condition(id_field: &str) -> String {
    format!("`{}`=?", id_field)
}

fn where_suffix(where_clause: &str) -> String {
    if where_clause.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_clause)
    }
}
