//! Token duration suffixes: `name[5]`, `name[-3]`, `name[?]`, `name[*]`,
//! `name[0]`.

use crate::error::ScriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dur {
    /// Forward range of `n` frames, or a backward range when negative.
    Fixed(i64),
    /// `[?]`: whatever is left of the enclosing row. Only legal inside a
    /// `|` sequence.
    Remainder,
    /// `[*]`: the button becomes held at this frame until released.
    HoldOn,
    /// `[0]`: the button becomes released at this frame.
    HoldOff,
}

/// Split a trailing `[..]` suffix off `token`. Arithmetic inside the
/// brackets has already been reduced by the evaluator.
pub fn split_suffix(token: &str, line: usize) -> Result<(&str, Option<Dur>), ScriptError> {
    if !token.ends_with(']') {
        return Ok((token, None));
    }
    let open = token
        .rfind('[')
        .ok_or_else(|| ScriptError::syntax(line, format!("unmatched `]` in `{token}`")))?;
    let body = token[open + 1..token.len() - 1].trim();
    let dur = match body {
        "?" => Dur::Remainder,
        "*" => Dur::HoldOn,
        "0" => Dur::HoldOff,
        n => Dur::Fixed(n.parse::<i64>().map_err(|_| {
            ScriptError::syntax(line, format!("invalid duration `[{n}]` in `{token}`"))
        })?),
    };
    Ok((&token[..open], Some(dur)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_suffix() {
        let test_cases = vec![
            ("a", ("a", None)),
            ("a[5]", ("a", Some(Dur::Fixed(5)))),
            ("a[-3]", ("a", Some(Dur::Fixed(-3)))),
            ("b[?]", ("b", Some(Dur::Remainder))),
            ("b[*]", ("b", Some(Dur::HoldOn))),
            ("b[0]", ("b", Some(Dur::HoldOff))),
            ("ls(0.5;90)[12]", ("ls(0.5;90)", Some(Dur::Fixed(12)))),
        ];
        for (src, expected) in test_cases {
            assert_eq!(split_suffix(src, 1).unwrap(), expected, "input {src:?}");
        }
    }

    #[test]
    fn test_bad_suffix_is_an_error() {
        assert!(split_suffix("a[x]", 7).is_err());
        assert!(split_suffix("a]", 7).is_err());
    }
}
