//! Pluggable locator strategy for the "open this entry" click target.
//!
//! The host UI's detail-open affordance has no single stable selector, so the
//! default strategy is a heuristic: inside a list entry, the first descendant
//! `div` with enough visible text and no decorative icon is the most likely
//! clickable target. Candidates are tried in DOM order until one actually
//! opens the detail view. Keeping this behind a trait lets the heuristic be
//! swapped or tuned without touching orchestration.

use crate::core::config::Selectors;

/// Emit a JS string literal (quoted, escaped) for embedding in a snippet.
pub(crate) fn js_str(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization is infallible")
}

/// Generates the in-page JS that finds and clicks open-entry candidates.
///
/// `count_candidates_js` evaluates to the number of candidates inside entry
/// `index` under the *current* enumeration; `click_candidate_js` clicks the
/// `nth` candidate and evaluates to whether a click happened. Both re-query
/// the DOM from scratch — indices are never cached across evaluations.
pub trait LocatorStrategy: Send + Sync {
    fn count_candidates_js(&self, index: usize) -> String;
    fn click_candidate_js(&self, index: usize, nth: usize) -> String;
}

/// Default heuristic: visible text longer than `min_text_len`, no icon
/// sub-element (filters out decorative controls like menu buttons).
pub struct TextHeuristicLocator {
    selectors: Selectors,
    min_text_len: usize,
}

impl TextHeuristicLocator {
    pub fn new(selectors: Selectors, min_text_len: usize) -> Self {
        Self {
            selectors,
            min_text_len,
        }
    }
}

impl LocatorStrategy for TextHeuristicLocator {
    fn count_candidates_js(&self, index: usize) -> String {
        format!(
            r#"
(() => {{
    const entry = document.querySelectorAll({list})[{index}];
    if (!entry) return 0;
    let count = 0;
    for (const el of entry.querySelectorAll('div')) {{
        const text = (el.innerText || '').trim();
        if (text.length > {min} && !el.querySelector({icon})) count++;
    }}
    return count;
}})()
"#,
            list = js_str(&self.selectors.list_container),
            index = index,
            min = self.min_text_len,
            icon = js_str(&self.selectors.icon),
        )
    }

    fn click_candidate_js(&self, index: usize, nth: usize) -> String {
        format!(
            r#"
(() => {{
    const entry = document.querySelectorAll({list})[{index}];
    if (!entry) return false;
    let seen = 0;
    for (const el of entry.querySelectorAll('div')) {{
        const text = (el.innerText || '').trim();
        if (text.length > {min} && !el.querySelector({icon})) {{
            if (seen === {nth}) {{ el.click(); return true; }}
            seen++;
        }}
    }}
    return false;
}})()
"#,
            list = js_str(&self.selectors.list_container),
            index = index,
            min = self.min_text_len,
            icon = js_str(&self.selectors.icon),
            nth = nth,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TapConfig;

    fn locator() -> TextHeuristicLocator {
        let cfg = TapConfig::default();
        TextHeuristicLocator::new(cfg.resolve_selectors(), cfg.resolve_min_candidate_text_len())
    }

    #[test]
    fn count_script_embeds_contract() {
        let js = locator().count_candidates_js(3);
        assert!(js.contains(r#"".single-source-container""#));
        assert!(js.contains("[3]"));
        assert!(js.contains("text.length > 10"));
        assert!(js.contains(r#""mat-icon""#));
    }

    #[test]
    fn click_script_targets_nth_candidate() {
        let js = locator().click_candidate_js(0, 2);
        assert!(js.contains("seen === 2"));
        assert!(js.contains("el.click()"));
    }

    #[test]
    fn js_str_escapes_quotes() {
        assert_eq!(js_str(r#"a"b"#), r#""a\"b""#);
    }
}
