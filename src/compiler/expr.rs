//! Textual arithmetic evaluation inside script tokens.
//!
//! Grammar (recursive descent, whitespace tolerant):
//!
//! ```text
//! expr   ::= term (('+' | '-') term)*
//! term   ::= factor ('*' factor)*
//! factor ::= '-'? ( '(' expr ')' | NUMBER )
//! ```
//!
//! A token is reduced in two modes: whole-token (duration and assignment
//! tokens) and embedded, where the shortest substring sitting between one of
//! `( , ; [` and one of `) , ; ]` that parses as an expression is evaluated
//! and substituted, repeated to a bounded fixpoint. Substrings that would
//! not change (plain numbers, `!`/`@` markers) are left alone, so the
//! reduction always terminates.

/// Upper bound on embedded substitutions per token.
const MAX_REDUCTIONS: usize = 64;

const LEFT_DELIMS: [char; 4] = ['(', ',', ';', '['];
const RIGHT_DELIMS: [char; 4] = [')', ',', ';', ']'];

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn skip_spaces(&mut self) {
        while self.src.get(self.pos).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.src.get(self.pos) == Some(&b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        loop {
            self.skip_spaces();
            if self.eat(b'+') {
                value += self.term()?;
            } else if self.eat(b'-') {
                value -= self.term()?;
            } else {
                return Some(value);
            }
        }
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        loop {
            self.skip_spaces();
            if self.eat(b'*') {
                value *= self.factor()?;
            } else {
                return Some(value);
            }
        }
    }

    fn factor(&mut self) -> Option<f64> {
        self.skip_spaces();
        if self.eat(b'-') {
            return Some(-self.factor()?);
        }
        if self.eat(b'(') {
            let value = self.expr()?;
            self.skip_spaces();
            return self.eat(b')').then_some(value);
        }
        self.number()
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_digit() || *b == b'.')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}

/// Evaluate `s` if the whole string is an arithmetic expression.
pub fn eval_expr(s: &str) -> Option<f64> {
    let mut parser = Parser::new(s);
    let value = parser.expr()?;
    parser.skip_spaces();
    (parser.pos == s.len()).then_some(value)
}

/// Render a value the way downstream token matching expects: integral
/// results lose the decimal point.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Evaluate every arithmetic expression inside `token` and substitute the
/// results back in.
pub fn reduce_math(token: &str) -> String {
    if let Some(value) = eval_expr(token) {
        return format_number(value);
    }
    let mut tok = token.to_string();
    for _ in 0..MAX_REDUCTIONS {
        match find_reducible(&tok) {
            Some((start, end, replacement)) => tok.replace_range(start..end, &replacement),
            None => break,
        }
    }
    tok
}

/// Shortest delimited substring that evaluates to something textually
/// different from itself, if any.
fn find_reducible(tok: &str) -> Option<(usize, usize, String)> {
    let bytes = tok.as_bytes();
    if !bytes.is_ascii() {
        return None;
    }
    for len in 1..bytes.len() {
        for start in 1..bytes.len() - len {
            let end = start + len;
            if !LEFT_DELIMS.contains(&(bytes[start - 1] as char))
                || !RIGHT_DELIMS.contains(&(bytes[end] as char))
            {
                continue;
            }
            let sub = &tok[start..end];
            if let Some(value) = eval_expr(sub) {
                let replacement = format_number(value);
                if replacement != sub {
                    return Some((start, end, replacement));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_token_eval() {
        let test_cases = vec![
            ("1+2", Some(3.0)),
            ("2*3+4", Some(10.0)),
            ("2+3*4", Some(14.0)),
            ("(2+3)*4", Some(20.0)),
            ("-5", Some(-5.0)),
            ("2 * -3", Some(-6.0)),
            ("1.5+1.25", Some(2.75)),
            ("10 - 4 - 3", Some(3.0)),
            ("", None),
            ("abc", None),
            ("1+", None),
            ("(1+2", None),
            ("1;2", None),
        ];
        for (src, expected) in test_cases {
            assert_eq!(eval_expr(src), expected, "input {src:?}");
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.5), "0.5");
    }

    #[test]
    fn test_reduce_embedded() {
        let test_cases = vec![
            ("ls(1+2;90)", "ls(3;90)"),
            ("g(1+2;3*4;5)", "g(3;12;5)"),
            ("ls((1+2)*3;45)", "ls(9;45)"),
            ("a[5-2]", "a[3]"),
            ("s(0.5;90)", "s(0.5;90)"),
            ("a(0;-1;0)", "a(0;-1;0)"),
            // `!` and `@` are substituted later, per frame
            ("ls(!+0.1;@*3)", "ls(!+0.1;@*3)"),
            ("4+1", "5"),
        ];
        for (src, expected) in test_cases {
            assert_eq!(reduce_math(src), expected, "input {src:?}");
        }
    }

    #[test]
    fn test_reduce_terminates_on_malformed_input() {
        // nothing here parses; the bounded loop must give up untouched
        assert_eq!(reduce_math("ls((((;))))"), "ls((((;))))");
    }
}
