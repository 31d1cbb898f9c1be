//! Response cleaning and auto-corrections.
//!
//! Small models wrap SQL in markdown fences, prepend chatty preambles,
//! and hallucinate a handful of well-known wrong column names. Everything
//! here is deterministic string surgery applied before validation.

use std::sync::LazyLock;

use regex::Regex;

static RE_BLACKLISTED_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:is_blacklisted|blacklisted)\b").unwrap()
});
static RE_BLOCKED_AS_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bblocked\s*(=|!=|<>|IS\b|IN\b)").unwrap());
static RE_STATEMENT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:select|with)\b").unwrap());

/// Reduce a raw model response to a single SQL statement.
///
/// Strips markdown fences and `--` comments, starts at the first SELECT
/// or WITH, and drops anything after the first semicolon. Returns an
/// empty string when no statement is present.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("sql").unwrap_or(after);
        text = match after.find("```") {
            Some(end) => after[..end].to_string(),
            None => after.to_string(),
        };
    }

    let without_comments: String = text
        .lines()
        .map(|line| match line.find("--") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let Some(start) = RE_STATEMENT_START.find(&without_comments) else {
        return String::new();
    };

    let statement = &without_comments[start.start()..];
    let statement = match statement.find(';') {
        Some(end) => &statement[..end],
        None => statement,
    };
    apply_column_fixes(statement.trim())
}

/// Rewrite hallucinated column names to the real ones.
fn apply_column_fixes(sql: &str) -> String {
    let mut fixed = sql.to_string();

    // Models invent "blacklisted"/"is_blacklisted" on vts_truck_master.
    if !fixed.to_lowercase().contains("whether_truck_blacklisted") {
        fixed = RE_BLACKLISTED_BARE
            .replace_all(&fixed, "whether_truck_blacklisted")
            .into_owned();
    }
    // "blocked" used as a boolean column is the same hallucination. Only
    // rewrite when it appears in comparison position, not as a word in a
    // string literal.
    if fixed.to_lowercase().contains("blocked")
        && !fixed.to_lowercase().contains("whether_truck_blacklisted")
    {
        fixed = RE_BLOCKED_AS_COLUMN
            .replace_all(&fixed, "whether_truck_blacklisted $1")
            .into_owned();
    }
    normalize_blacklist_comparison(&fixed)
}

/// `whether_truck_blacklisted = true/false` must become 'Y'/'N'.
fn normalize_blacklist_comparison(sql: &str) -> String {
    static RE_TRUE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)(whether_truck_blacklisted\s*=\s*)true").unwrap()
    });
    static RE_FALSE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)(whether_truck_blacklisted\s*=\s*)false").unwrap()
    });
    let sql = RE_TRUE.replace_all(sql, "${1}'Y'").into_owned();
    RE_FALSE.replace_all(&sql, "${1}'N'").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence_and_preamble() {
        let raw = "Here is the query you asked for:\n```sql\nSELECT truck_no FROM \
                   vts_truck_master;\n```\nLet me know if you need anything else.";
        assert_eq!(clean_response(raw), "SELECT truck_no FROM vts_truck_master");
    }

    #[test]
    fn strips_line_comments_and_trailing_statements() {
        let raw = "SELECT truck_no -- the vehicle id\nFROM vts_truck_master; DROP TABLE x;";
        assert_eq!(clean_response(raw), "SELECT truck_no \nFROM vts_truck_master");
    }

    #[test]
    fn with_clause_is_kept() {
        let raw = "Sure!\nWITH t AS (SELECT 1) SELECT * FROM t";
        assert_eq!(clean_response(raw), "WITH t AS (SELECT 1) SELECT * FROM t");
    }

    #[test]
    fn no_statement_yields_empty() {
        assert_eq!(clean_response("I cannot answer that."), "");
    }

    #[test]
    fn without_in_the_preamble_is_not_a_statement_start() {
        let raw = "Without further ado:\nSELECT truck_no FROM vts_truck_master";
        assert_eq!(clean_response(raw), "SELECT truck_no FROM vts_truck_master");
    }

    #[test]
    fn non_ascii_preamble_does_not_shift_the_statement() {
        let raw = "Die Abfrage für die Straße:\nSELECT truck_no FROM vts_truck_master";
        assert_eq!(clean_response(raw), "SELECT truck_no FROM vts_truck_master");
    }

    #[test]
    fn hallucinated_blacklist_column_is_corrected() {
        let raw = "SELECT truck_no FROM vts_truck_master WHERE is_blacklisted = true";
        assert_eq!(
            clean_response(raw),
            "SELECT truck_no FROM vts_truck_master WHERE whether_truck_blacklisted = 'Y'"
        );
    }

    #[test]
    fn blocked_in_comparison_position_is_corrected() {
        let raw = "SELECT truck_no FROM vts_truck_master WHERE blocked = 'Y'";
        assert_eq!(
            clean_response(raw),
            "SELECT truck_no FROM vts_truck_master WHERE whether_truck_blacklisted = 'Y'"
        );
    }

    #[test]
    fn correct_column_is_left_alone() {
        let raw = "SELECT truck_no FROM vts_truck_master WHERE whether_truck_blacklisted = 'N'";
        assert_eq!(clean_response(raw), raw);
    }
}
