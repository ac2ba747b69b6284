//! Line-level helpers shared by the mesh-ascii, pose and bone-dictionary readers.

use std::str::FromStr;

use super::parser::{ParseError, ParseResult};

/// Drop a trailing `# comment` and surrounding whitespace.
pub fn strip_comment(line: &str) -> &str {
    match line.split_once('#') {
        Some((content, _)) => content.trim(),
        None => line.trim(),
    }
}

/// Normalize a bone, mesh or texture name.
///
/// Names are lower-cased, `:` and `|` become spaces and the result is
/// trimmed. Underscores become spaces too unless `keep_underscores` is set
/// (texture names keep them).
pub fn clean_name(raw: &str, keep_underscores: bool) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ':' | '|' => ' ',
            '_' if !keep_underscores => ' ',
            c => c,
        })
        .collect();
    cleaned.trim().to_string()
}

/// Parse a single value, ignoring any trailing comment.
pub fn parse_scalar<T: FromStr>(line_num: usize, line: &str) -> ParseResult<T> {
    let token = strip_comment(line);
    token.parse::<T>().map_err(|_| ParseError::InvalidNumber {
        line: line_num,
        token: token.to_string(),
    })
}

/// Parse a whitespace-separated list of values. An empty line is an empty list.
pub fn parse_array<T: FromStr>(line_num: usize, line: &str) -> ParseResult<Vec<T>> {
    strip_comment(line)
        .split_whitespace()
        .map(|token| {
            token.parse::<T>().map_err(|_| ParseError::InvalidNumber {
                line: line_num,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Parse exactly `N` whitespace-separated values.
pub fn parse_fixed<T: FromStr + Copy + Default, const N: usize>(
    line_num: usize,
    line: &str,
) -> ParseResult<[T; N]> {
    let values = parse_array::<T>(line_num, line)?;
    if values.len() != N {
        return Err(ParseError::WrongArity {
            line: line_num,
            expected: N,
            found: values.len(),
        });
    }
    let mut out = [T::default(); N];
    out.copy_from_slice(&values);
    Ok(out)
}

/// Whether `token` is a finite number.
pub fn is_float(token: &str) -> bool {
    token.parse::<f32>().map(f32::is_finite).unwrap_or(false)
}

/// `Some` when the line holds exactly two finite numbers.
///
/// Used to detect whether a vertex carries a UV line.
pub fn probe_pair(line: &str) -> Option<[f64; 2]> {
    let mut tokens = strip_comment(line).split_whitespace();
    let u = tokens.next()?.parse::<f64>().ok()?;
    let v = tokens.next()?.parse::<f64>().ok()?;
    if tokens.next().is_some() || !u.is_finite() || !v.is_finite() {
        return None;
    }
    Some([u, v])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("12 # bones"), "12");
        assert_eq!(strip_comment("  -1   "), "-1");
        assert_eq!(strip_comment("# only comment"), "");
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name(" Bip01_L_Hand ", false), "bip01 l hand");
        assert_eq!(clean_name("Scene:Root|Pelvis", false), "scene root pelvis");
        assert_eq!(clean_name("Body_D.PNG", true), "body_d.png");
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar::<i64>(1, "-1 # parent index").unwrap(), -1);
        assert!(matches!(
            parse_scalar::<usize>(7, "abc # bones"),
            Err(ParseError::InvalidNumber { line: 7, .. })
        ));
    }

    #[test]
    fn test_parse_array_tolerates_extra_spaces() {
        let values = parse_array::<f64>(1, "1.5  -2 3").unwrap();
        assert_eq!(values, vec![1.5, -2.0, 3.0]);
        assert!(parse_array::<u32>(1, "").unwrap().is_empty());
    }

    #[test]
    fn test_parse_fixed_checks_arity() {
        let values: [u8; 4] = parse_fixed(3, "255 128 0 255").unwrap();
        assert_eq!(values, [255, 128, 0, 255]);
        assert!(matches!(
            parse_fixed::<f64, 3>(4, "1 2"),
            Err(ParseError::WrongArity { line: 4, expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_probe_pair() {
        assert_eq!(probe_pair("0.25 0.75"), Some([0.25, 0.75]));
        assert_eq!(probe_pair("1 2 3"), None);
        assert_eq!(probe_pair("0"), None);
        assert_eq!(probe_pair("nan 1"), None);
    }

    #[test]
    fn test_is_float() {
        assert!(is_float("0.5"));
        assert!(is_float("-3"));
        assert!(!is_float("body"));
        assert!(!is_float("inf"));
    }
}
