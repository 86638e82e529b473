//! Filename format templates.
//!
//! A template such as `db-{YYYY}{MM}{DD}T{hh}{mm}*.sql` describes how backup
//! names encode their timestamp. It compiles to two matchers:
//!
//! - a scan glob (`db-*T*.sql`) with every placeholder relaxed to `*`,
//!   used to decide which directory entries are considered at all
//! - an anchored regular expression that captures the five numeric fields

use crate::error::TemplateError;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// Placeholders in the order their fields build a timestamp
const PLACEHOLDERS: [(&str, &str, usize); 5] = [
    ("{YYYY}", "year", 4),
    ("{MM}", "month", 2),
    ("{DD}", "day", 2),
    ("{hh}", "hour", 2),
    ("{mm}", "minute", 2),
];

/// The default backup name: `20240131T2359`
pub const DEFAULT_FORMAT: &str = "{YYYY}{MM}{DD}T{hh}{mm}";

/// A compiled format template
#[derive(Debug, Clone)]
pub struct FormatTemplate {
    source: String,
    glob: String,
    regex: Regex,
}

impl FormatTemplate {
    /// Compile a template, rejecting anything that cannot yield a full timestamp
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        if template.contains('/') || template.contains('\\') {
            return Err(TemplateError::PathSeparator(template.to_string()));
        }

        let mut glob = String::new();
        let mut pattern = String::from("(?s)^");
        let mut seen = [false; PLACEHOLDERS.len()];
        let mut rest = template;

        while let Some(c) = rest.chars().next() {
            if c == '{' {
                let end = rest
                    .find('}')
                    .ok_or_else(|| TemplateError::Unterminated(template.to_string()))?;
                let placeholder = &rest[..=end];
                let index = PLACEHOLDERS
                    .iter()
                    .position(|(token, _, _)| *token == placeholder)
                    .ok_or_else(|| TemplateError::UnknownPlaceholder {
                        template: template.to_string(),
                        name: rest[1..end].to_string(),
                    })?;
                let (token, group, width) = PLACEHOLDERS[index];
                if seen[index] {
                    return Err(TemplateError::DuplicatePlaceholder {
                        template: template.to_string(),
                        placeholder: token,
                    });
                }
                seen[index] = true;
                push_star(&mut glob);
                pattern.push_str(&format!("(?P<{group}>[0-9]{{{width}}})"));
                rest = &rest[end + 1..];
                continue;
            }

            match c {
                '?' => {
                    glob.push('?');
                    pattern.push('.');
                }
                '*' => {
                    push_star(&mut glob);
                    pattern.push_str(".*");
                }
                _ => {
                    if matches!(c, '[' | ']' | '{' | '}' | '!' | '#') {
                        glob.push('\\');
                    }
                    glob.push(c);
                    pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                }
            }
            rest = &rest[c.len_utf8()..];
        }
        pattern.push('$');

        if let Some(index) = seen.iter().position(|s| !s) {
            return Err(TemplateError::MissingPlaceholder {
                template: template.to_string(),
                placeholder: PLACEHOLDERS[index].0,
            });
        }

        let regex = Regex::new(&pattern).map_err(|e| TemplateError::Compile {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(FormatTemplate {
            source: template.to_string(),
            glob,
            regex,
        })
    }

    /// The template as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Glob with every placeholder relaxed to `*`
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Extract the encoded timestamp.
    ///
    /// Returns `None` when the name does not match or the fields do not form a
    /// real date and time (e.g. February 30th, hour 24 or year 0000).
    pub fn extract(&self, name: &str) -> Option<NaiveDateTime> {
        let captures = self.regex.captures(name)?;
        let field = |group: &str| -> Option<u32> { captures.name(group)?.as_str().parse().ok() };

        let year = i32::try_from(field("year")?).ok().filter(|&year| year > 0)?;
        NaiveDate::from_ymd_opt(year, field("month")?, field("day")?)?
            .and_hms_opt(field("hour")?, field("minute")?, 0)
    }
}

/// Runs of `*` match the same names as a single one
fn push_star(glob: &mut String) {
    if !glob.ends_with('*') {
        glob.push('*');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_default_format() {
        let template = FormatTemplate::parse(DEFAULT_FORMAT).unwrap();
        assert_eq!(template.glob(), "*T*");
        assert_eq!(template.extract("20230601T1435"), Some(at(2023, 6, 1, 14, 35)));
    }

    #[test]
    fn test_match_is_anchored() {
        let template = FormatTemplate::parse(DEFAULT_FORMAT).unwrap();
        assert!(!template.regex.is_match("x20230601T1435"));
        assert!(!template.regex.is_match("20230601T1435.bak"));
        assert!(!template.regex.is_match("2023061T1435"));
        assert_eq!(template.extract("20230601T1435.bak"), None);
    }

    #[test]
    fn test_separators_and_literals() {
        let template = FormatTemplate::parse("db-{YYYY}-{MM}-{DD}_{hh}.{mm}.sql.gz").unwrap();
        assert_eq!(template.glob(), "db-*-*-*_*.*.sql.gz");
        assert_eq!(
            template.extract("db-2024-02-29_23.59.sql.gz"),
            Some(at(2024, 2, 29, 23, 59))
        );
        // '.' is literal, not "any character"
        assert_eq!(template.extract("db-2024-02-29_23x59.sql.gz"), None);
    }

    #[test]
    fn test_wildcards() {
        let template = FormatTemplate::parse("?{YYYY}{MM}{DD}{hh}{mm}*").unwrap();
        assert_eq!(template.glob(), "?*");
        assert_eq!(template.extract("X202305200130"), Some(at(2023, 5, 20, 1, 30)));
        assert_eq!(
            template.extract("X202305200130-full.tar"),
            Some(at(2023, 5, 20, 1, 30))
        );
        assert_eq!(template.extract("202305200130"), None);
    }

    #[test]
    fn test_placeholders_in_any_order() {
        let template = FormatTemplate::parse("{hh}{mm}_{DD}.{MM}.{YYYY}").unwrap();
        assert_eq!(template.extract("0745_31.12.2022"), Some(at(2022, 12, 31, 7, 45)));
    }

    #[test]
    fn test_impossible_dates_do_not_extract() {
        let template = FormatTemplate::parse(DEFAULT_FORMAT).unwrap();
        assert!(template.regex.is_match("20230230T1200"));
        assert_eq!(template.extract("20230230T1200"), None);
        assert_eq!(template.extract("20231301T1200"), None);
        assert_eq!(template.extract("20230001T1200"), None);
        assert_eq!(template.extract("20230101T2400"), None);
        assert_eq!(template.extract("20230101T1260"), None);
        assert_eq!(template.extract("20230229T0000"), None);
        assert_eq!(template.extract("20240229T0000"), Some(at(2024, 2, 29, 0, 0)));
    }

    #[test]
    fn test_year_zero_does_not_extract() {
        let template = FormatTemplate::parse(DEFAULT_FORMAT).unwrap();
        assert!(template.regex.is_match("00000101T0000"));
        assert_eq!(template.extract("00000101T0000"), None);
        assert_eq!(template.extract("00010101T0000"), Some(at(1, 1, 1, 0, 0)));
    }

    #[test]
    fn test_glob_escapes_metacharacters() {
        let template = FormatTemplate::parse("[db]{YYYY}{MM}{DD}{hh}{mm}").unwrap();
        assert_eq!(template.glob(), "\\[db\\]*");
        assert!(template.regex.is_match("[db]202301010000"));
    }

    #[test]
    fn test_missing_placeholder() {
        let err = FormatTemplate::parse("{YYYY}-{MM}-{DD}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingPlaceholder {
                template: "{YYYY}-{MM}-{DD}".to_string(),
                placeholder: "{hh}",
            }
        );
    }

    #[test]
    fn test_duplicate_placeholder() {
        let err = FormatTemplate::parse("{YYYY}{MM}{DD}{hh}{mm}{YYYY}").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::DuplicatePlaceholder { placeholder: "{YYYY}", .. }
        ));
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = FormatTemplate::parse("{YYYY}{MM}{DD}{hh}{mm}{ss}").unwrap_err();
        assert!(err.to_string().contains("{ss}"));
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = FormatTemplate::parse("{YYYY}{MM}{DD}{hh}{mm").unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated(_)));
    }

    #[test]
    fn test_path_separator_rejected() {
        let err = FormatTemplate::parse("daily/{YYYY}{MM}{DD}{hh}{mm}").unwrap_err();
        assert!(matches!(err, TemplateError::PathSeparator(_)));
    }
}
