//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Drop a surrounding Markdown code fence (```json ... ```) if the model added one.
pub fn strip_code_fences(s: &str) -> &str {
  let t = s.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  // skip the info string ("json") up to the first newline
  let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) { end -= 1; }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fill_template() {
    let out = fill_template("{count} questions on {topic}", &[("count", "5"), ("topic", "C Basics")]);
    assert_eq!(out, "5 questions on C Basics");
  }

  #[test]
  fn test_strip_code_fences() {
    assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
    assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
    assert_eq!(strip_code_fences("  [1]  "), "[1]");
  }

  #[test]
  fn test_trunc_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let t = trunc_for_log("héllo world", 2);
    assert!(t.starts_with('h'));
    assert!(t.ends_with("(12 bytes total)"));
  }
}
