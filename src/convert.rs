//! Capture-log adapter: re-encodes nx-TAS text lines into the TSV script
//! dialect the compiler consumes.
//!
//! Beyond the 1:1 key mapping this does three things: index gaps become
//! blank duration rows, identical consecutive frames merge into one row
//! with a larger duration, and motion-macro keys are pulled out into
//! one-frame pulse rows so the compiled motion matches the capture.

use anyhow::{Context, bail};

/// One output row of the TSV script.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    duration: i64,
    tokens: Vec<String>,
    left: (i32, i32),
    right: (i32, i32),
}

impl Row {
    fn blank(duration: i64) -> Self {
        Self {
            duration,
            tokens: Vec::new(),
            left: (0, 0),
            right: (0, 0),
        }
    }
}

/// nx-TAS key → script token. D-pad keys drive motion macros on console,
/// and `KEY_L` is the single-side downward shake.
fn key_token(key: &str) -> Option<&'static str> {
    match key {
        "KEY_A" => Some("a"),
        "KEY_B" => Some("b"),
        "KEY_X" => Some("x"),
        "KEY_Y" => Some("y"),
        "KEY_L" => Some("m-d"),
        "KEY_R" => Some("r"),
        "KEY_ZL" => Some("zl"),
        "KEY_ZR" => Some("zr"),
        "KEY_PLUS" => Some("+"),
        "KEY_MINUS" => Some("-"),
        "KEY_DUP" => Some("m-uu"),
        "KEY_DRIGHT" => Some("m-rr"),
        "KEY_DDOWN" => Some("m-dd"),
        "KEY_DLEFT" => Some("m-ll"),
        "KEY_LSTICK" => Some("ls"),
        "KEY_RSTICK" => Some("rs"),
        _ => None,
    }
}

fn is_macro_token(token: &str) -> bool {
    matches!(
        token.trim(),
        "m" | "m-u" | "m-d" | "m-l" | "m-r" | "m-uu" | "m-dd" | "m-ll" | "m-rr"
    )
}

fn parse_pair(field: &str, line: usize) -> anyhow::Result<(i32, i32)> {
    let (x, y) = field
        .split_once(';')
        .with_context(|| format!("line {line}: bad stick field `{field}`"))?;
    Ok((
        x.parse()
            .with_context(|| format!("line {line}: bad stick value `{x}`"))?,
        y.parse()
            .with_context(|| format!("line {line}: bad stick value `{y}`"))?,
    ))
}

pub fn convert(input: &str) -> anyhow::Result<String> {
    let mut rows: Vec<Row> = Vec::new();
    let mut prev_index: i64 = -1;
    let mut max_buttons = 0usize;

    for (i, line) in input.lines().enumerate() {
        let lineno = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [index, keys, left, right] = fields.as_slice() else {
            bail!("line {lineno}: expected `<frame> <keys> <x;y> <x;y>`");
        };
        let index: i64 = index
            .parse()
            .with_context(|| format!("line {lineno}: bad frame index `{index}`"))?;
        let tokens: Vec<String> = keys
            .split(';')
            .filter_map(key_token)
            .map(str::to_string)
            .collect();
        max_buttons = max_buttons.max(tokens.len());
        let left = parse_pair(left, lineno)?;
        let right = parse_pair(right, lineno)?;

        let skipped = index - prev_index - 1;
        if skipped > 0 {
            rows.push(Row::blank(skipped));
        }

        let same_as_last = rows
            .last()
            .is_some_and(|r| r.tokens == tokens && r.left == left && r.right == right);
        if same_as_last {
            let last = rows.last_mut().expect("checked above");
            last.duration += 1;
            // a held D-pad key repeats the gesture; keep it as its own pulse
            let macros: Vec<String> = tokens.iter().filter(|t| is_macro_token(t)).cloned().collect();
            if !macros.is_empty() {
                rows.push(Row {
                    duration: 1,
                    tokens: macros,
                    left: (0, 0),
                    right: (0, 0),
                });
            }
        } else {
            rows.push(Row {
                duration: 1,
                tokens,
                left,
                right,
            });
        }
        prev_index = index;
    }

    reposition_macro_pulses(&mut rows);
    Ok(render(&rows, max_buttons))
}

/// Move one-frame macro pulses a frame earlier, carrying the neighboring
/// row's buttons and sticks so held inputs stay held through the gesture.
fn reposition_macro_pulses(rows: &mut Vec<Row>) {
    let mut i = 1;
    while i < rows.len() {
        let macros: Vec<String> = rows[i]
            .tokens
            .iter()
            .filter(|t| is_macro_token(t))
            .cloned()
            .collect();
        if !macros.is_empty() && rows[i].duration == 1 {
            rows[i].tokens.retain(|t| !is_macro_token(t));
            if rows[i - 1].duration > 1 {
                rows[i - 1].duration -= 1;
                let prev = rows[i - 1].clone();
                let pulse = Row {
                    duration: 1,
                    tokens: macros.into_iter().chain(prev.tokens).collect(),
                    left: prev.left,
                    right: prev.right,
                };
                rows.insert(i, pulse);
                i += 1;
            } else {
                rows[i - 1].tokens.extend(macros);
            }
        }
        i += 1;
    }
}

fn render(rows: &[Row], max_buttons: usize) -> String {
    let mut out = String::new();
    for row in rows {
        let mut cols: Vec<String> = Vec::with_capacity(max_buttons + 3);
        cols.push(row.duration.to_string());
        cols.extend(row.tokens.iter().cloned());
        while cols.len() < max_buttons + 1 {
            cols.push(String::new());
        }
        cols.push(stick_token("lsx", row.left));
        cols.push(stick_token("rsx", row.right));
        out.push_str(&cols.join("\t"));
        out.push('\n');
    }
    out
}

fn stick_token(prefix: &str, (x, y): (i32, i32)) -> String {
    if (x, y) == (0, 0) {
        String::new()
    } else {
        format!("{prefix}({x}; {y})")
    }
}
