//! Identifier and string quoting per dialect.
//!
//! Identifiers cannot be bound as parameters, so every name that reaches SQL
//! text goes through a [`Quoter`]. With `force_quote` on, names are always
//! wrapped and keep their exact case. With it off, plain names are left bare
//! and the database folds them (PostgreSQL to lower case, Oracle to upper
//! case); anything else is still quoted.

/// How the database folds unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFolding {
    None,
    Lower,
    Upper,
}

/// Words that never go out unquoted, whatever the quoting mode.
const RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "DATE", "DEFAULT", "DELETE", "DESC", "DISTINCT",
    "DROP", "ELSE", "END", "EXISTS", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN",
    "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LEVEL", "LIKE", "LIMIT",
    "NOT", "NULL", "NUMBER", "OF", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES",
    "RIGHT", "ROW", "ROWS", "SELECT", "SESSION", "SET", "SIZE", "TABLE", "THEN", "TO", "TRIGGER",
    "UNION", "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

#[derive(Debug, Clone)]
pub struct Quoter {
    open: char,
    close: char,
    folding: CaseFolding,
    force_quote: bool,
}

impl Quoter {
    pub fn new(open: char, close: char, folding: CaseFolding, force_quote: bool) -> Self {
        Self { open, close, folding, force_quote }
    }

    pub fn force_quote(&self) -> bool {
        self.force_quote
    }

    pub fn folding(&self) -> CaseFolding {
        self.folding
    }

    /// True when the name can be emitted bare without changing its meaning
    /// beyond the dialect's case folding.
    fn is_plain(&self, name: &str) -> bool {
        let mut chars = name.chars();
        let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        starts_ok
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !RESERVED.iter().any(|w| w.eq_ignore_ascii_case(name))
    }

    fn needs_quoting(&self, name: &str) -> bool {
        self.force_quote || !self.is_plain(name)
    }

    /// Quote a single identifier, doubling any embedded closing quote.
    pub fn quote(&self, name: &str) -> String {
        if !self.needs_quoting(name) {
            return name.to_string();
        }
        let close = self.close.to_string();
        let doubled = format!("{}{}", self.close, self.close);
        format!("{}{}{}", self.open, name.replace(&close, &doubled), self.close)
    }

    /// `schema.table`, or just `table` when no schema is given.
    pub fn quote_qualified(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(s) if !s.is_empty() => format!("{}.{}", self.quote(s), self.quote(name)),
            _ => self.quote(name),
        }
    }

    /// Standard single-quoted string literal.
    pub fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// The name as the catalog stores it: verbatim when it would be quoted,
    /// case-folded when the database sees it bare.
    pub fn catalog_name(&self, name: &str) -> String {
        if self.needs_quoting(name) {
            return name.to_string();
        }
        match self.folding {
            CaseFolding::None => name.to_string(),
            CaseFolding::Lower => name.to_lowercase(),
            CaseFolding::Upper => name.to_uppercase(),
        }
    }

    /// [`catalog_name`](Self::catalog_name) as an escaped string literal, for
    /// substitution into introspection queries.
    pub fn catalog_literal(&self, name: &str) -> String {
        self.quote_string(&self.catalog_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_quote_preserves_case() {
        let q = Quoter::new('"', '"', CaseFolding::Lower, true);
        assert_eq!(q.quote("Users"), "\"Users\"");
        assert_eq!(q.catalog_name("Users"), "Users");
    }

    #[test]
    fn test_unforced_plain_name_is_bare_and_folded() {
        let q = Quoter::new('"', '"', CaseFolding::Upper, false);
        assert_eq!(q.quote("Users"), "Users");
        assert_eq!(q.catalog_name("Users"), "USERS");
        assert_eq!(q.catalog_literal("Users"), "'USERS'");
    }

    #[test]
    fn test_unforced_reserved_or_odd_names_are_quoted() {
        let q = Quoter::new('"', '"', CaseFolding::Lower, false);
        assert_eq!(q.quote("order"), "\"order\"");
        assert_eq!(q.quote("first name"), "\"first name\"");
        assert_eq!(q.catalog_name("first name"), "first name");
    }

    #[test]
    fn test_embedded_quote_is_doubled() {
        let pg = Quoter::new('"', '"', CaseFolding::Lower, true);
        assert_eq!(pg.quote("my\"col"), "\"my\"\"col\"");

        let mssql = Quoter::new('[', ']', CaseFolding::None, true);
        assert_eq!(mssql.quote("a]b"), "[a]]b]");

        let mysql = Quoter::new('`', '`', CaseFolding::None, true);
        assert_eq!(mysql.quote("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_catalog_literal_escapes_single_quotes() {
        let q = Quoter::new('"', '"', CaseFolding::Lower, true);
        assert_eq!(q.catalog_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_qualified_without_schema() {
        let q = Quoter::new('[', ']', CaseFolding::None, true);
        assert_eq!(q.quote_qualified(None, "t"), "[t]");
        assert_eq!(q.quote_qualified(Some("dbo"), "t"), "[dbo].[t]");
    }
}
