use super::SqlDialect;

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    /// Identifiers are lower-cased before quoting, matching the engine's
    /// fold-to-lowercase convention for unquoted names.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.to_lowercase().replace('"', "\"\""))
    }

    fn string_concat(&self, parts: &[&str]) -> String {
        parts.join(" || ")
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "TRUE" } else { "FALSE" }.to_string()
    }

    fn paging(&self, take: Option<u64>, skip: Option<u64>) -> String {
        match (take, skip) {
            (Some(n), Some(s)) => format!(" LIMIT {} OFFSET {}", n, s),
            (Some(n), None) => format!(" LIMIT {}", n),
            (None, Some(s)) => format!(" OFFSET {}", s),
            (None, None) => String::new(),
        }
    }
}
