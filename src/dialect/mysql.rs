use super::SqlDialect;

pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn string_concat(&self, parts: &[&str]) -> String {
        parts.join(" + ")
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "1" } else { "0" }.to_string()
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
