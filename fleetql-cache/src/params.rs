//! Positional parameter substitution for cache hits.
//!
//! A cached answer for "alerts for MH12AB1234 in the last 7 days" can
//! serve "alerts for KA05CD9876 in the last 30 days" by swapping the
//! literals. Substitution only fires when the parameter counts match;
//! anything else returns the cached SQL untouched.

/// Rewrite `sql` by replacing each of `cached_params` with the
/// positionally corresponding entry of `new_params`. Goes through
/// placeholders so an already-substituted value is never matched again
/// by a later parameter.
pub fn substitute_parameters(sql: &str, cached_params: &[String], new_params: &[String]) -> String {
    if cached_params.is_empty()
        || cached_params.len() != new_params.len()
        || cached_params == new_params
    {
        return sql.to_string();
    }
    let mut rewritten = sql.to_string();
    for (i, old) in cached_params.iter().enumerate() {
        rewritten = replace_all_ci(&rewritten, old, &placeholder(i));
    }
    for (i, new) in new_params.iter().enumerate() {
        rewritten = rewritten.replace(&placeholder(i), new);
    }
    rewritten
}

fn placeholder(index: usize) -> String {
    format!("\u{1}{index}\u{1}")
}

/// Case-insensitive replace of every whole-token occurrence of `needle`.
/// Occurrences glued to other alphanumerics are left alone, so the "7"
/// parameter does not rewrite the digits inside a vehicle id.
fn replace_all_ci(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut pos = 0;
    while let Some(found) = lower_haystack[pos..].find(&lower_needle) {
        let start = pos + found;
        let end = start + needle.len();
        let bounded_left = !haystack[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        let bounded_right = !haystack[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        out.push_str(&haystack[pos..start]);
        if bounded_left && bounded_right {
            out.push_str(replacement);
        } else {
            out.push_str(&haystack[start..end]);
        }
        pos = end;
    }
    out.push_str(&haystack[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_vehicle_id_and_interval() {
        let sql = "SELECT * FROM alerts WHERE vehicle_number = 'MH12AB1234' \
                   AND created_at >= CURRENT_DATE - INTERVAL '7 days'";
        let cached = vec!["MH12AB1234".to_string(), "7".to_string()];
        let new = vec!["KA05CD9876".to_string(), "30".to_string()];
        let rewritten = substitute_parameters(sql, &cached, &new);
        assert!(rewritten.contains("KA05CD9876"));
        assert!(rewritten.contains("INTERVAL '30 days'"));
        assert!(!rewritten.contains("MH12AB1234"));
    }

    #[test]
    fn count_mismatch_leaves_sql_unchanged() {
        let sql = "SELECT * FROM alerts WHERE vehicle_number = 'MH12AB1234'";
        let cached = vec!["MH12AB1234".to_string()];
        let new: Vec<String> = vec![];
        assert_eq!(substitute_parameters(sql, &cached, &new), sql);
    }

    #[test]
    fn replacement_is_case_insensitive() {
        let rewritten = replace_all_ci("where id = 'mh12ab1234'", "MH12AB1234", "KA05CD9876");
        assert_eq!(rewritten, "where id = 'KA05CD9876'");
    }

    #[test]
    fn digits_inside_a_substituted_id_are_untouched() {
        // 'KA05CD9876' carries a 7; the interval parameter must not
        // rewrite it.
        let sql = "SELECT * FROM alerts WHERE vehicle_number = 'MH12AB1234' \
                   AND created_at >= CURRENT_DATE - INTERVAL '7 days'";
        let cached = vec!["MH12AB1234".to_string(), "7".to_string()];
        let new = vec!["KA05CD9876".to_string(), "30".to_string()];
        let rewritten = substitute_parameters(sql, &cached, &new);
        assert!(rewritten.contains("'KA05CD9876'"), "{rewritten}");
        assert!(rewritten.contains("INTERVAL '30 days'"), "{rewritten}");
    }

    #[test]
    fn identical_params_short_circuit() {
        let sql = "SELECT 1";
        let params = vec!["7".to_string()];
        assert_eq!(substitute_parameters(sql, &params, &params), sql);
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::substitute_parameters;

        proptest! {
            // Token lengths avoid every word in the template, so only
            // the parameters themselves can match.
            #[test]
            fn whole_token_params_substitute_exactly(
                old_word in "[a-z]{7,10}",
                new_word in "[A-Z]{7,10}",
                old_num in "[1-9][0-9]{0,3}",
                new_num in "[1-9][0-9]{0,3}",
            ) {
                let sql = format!(
                    "SELECT * FROM t WHERE a = '{old_word}' AND b = {old_num}"
                );
                let expected = format!(
                    "SELECT * FROM t WHERE a = '{new_word}' AND b = {new_num}"
                );
                let cached = vec![old_word.clone(), old_num.clone()];
                let new = vec![new_word.clone(), new_num.clone()];
                prop_assert_eq!(substitute_parameters(&sql, &cached, &new), expected);
            }
        }
    }
}
