use super::SqlDialect;

pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn string_concat(&self, parts: &[&str]) -> String {
        parts.join(" + ")
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "1" } else { "0" }.to_string()
    }

    fn top_clause(&self, take: Option<u64>, skip: Option<u64>) -> Option<String> {
        // TOP only when there is no offset; otherwise OFFSET/FETCH pages.
        match (take, skip) {
            (Some(n), None) => Some(format!("TOP {}", n)),
            _ => None,
        }
    }

    fn paging(&self, take: Option<u64>, skip: Option<u64>) -> String {
        match (take, skip) {
            (Some(n), Some(s)) => format!(" OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", s, n),
            (None, Some(s)) => format!(" OFFSET {} ROWS", s),
            _ => String::new(),
        }
    }
}
