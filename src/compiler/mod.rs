//! The TSV script compiler: rows in, a fully materialized frame table out.
//!
//! The input is scanned twice. The first scan only sums row durations so the
//! table can be pre-sized; the second walks line by line, evaluating each
//! column token and expanding it into frame-range writes. The finalize pass
//! then resolves deferred toggles and derives angular velocity.

pub mod directive;
pub mod duration;
pub mod expr;
pub mod finalize;
pub mod table;

use std::collections::HashMap;

use crate::error::ScriptError;
use crate::model::{Script, Vector3f};
use table::FrameTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Binary,
    /// nx-TAS style text; motion macros degrade to key substitutions.
    Text,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub mode: OutputMode,
    pub remove_empty: bool,
}

/// Parse state threaded through every token, instead of ambient globals.
#[derive(Debug)]
pub struct Context {
    vars: HashMap<String, String>,
    pub line: usize,
    pub row_start: usize,
    pub mode: OutputMode,
    pub delayed_motion: bool,
    pub independent_gyro: bool,
    prev_row_duration: i64,
}

impl Context {
    fn new(mode: OutputMode) -> Self {
        Self {
            vars: HashMap::new(),
            line: 0,
            row_start: 0,
            mode,
            delayed_motion: false,
            independent_gyro: false,
            prev_row_duration: 1,
        }
    }

    /// Replace every `$name` with its stored value.
    fn substitute_vars(&self, token: &str) -> Result<String, ScriptError> {
        if !token.contains('$') {
            return Ok(token.to_string());
        }
        let mut out = String::with_capacity(token.len());
        let mut rest = token;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            let name_len = tail
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(tail.len());
            let name = &tail[..name_len];
            if name.is_empty() {
                return Err(ScriptError::syntax(self.line, "`$` without a variable name"));
            }
            let value = self
                .vars
                .get(&name.to_lowercase())
                .ok_or_else(|| ScriptError::undefined(self.line, name))?;
            out.push_str(value);
            rest = &tail[name_len..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Variables, `#`, then arithmetic; `!`/`@` survive for the per-frame
    /// stick path. Tokens are matched lowercase.
    fn eval_token(&self, raw: &str, row_duration: i64) -> Result<String, ScriptError> {
        let token = self.substitute_vars(raw.trim())?;
        let token = token.replace('#', &row_duration.to_string());
        Ok(expr::reduce_math(&token).to_lowercase())
    }

    /// `$name=value` line. Recognized names configure the script itself;
    /// anything else lands in the flat user variable table.
    fn assign(&mut self, script: &mut Script, name: &str, value: &str) -> Result<(), ScriptError> {
        match name {
            "stage" => script.stage_name = value.to_string(),
            "entr" | "entrance" => script.stage_id = value.to_string(),
            "scen" | "scenario" => {
                let n: i32 = value.parse().map_err(|_| {
                    ScriptError::syntax(self.line, format!("invalid scenario number `{value}`"))
                })?;
                if n < 0 {
                    return Err(ScriptError::syntax(self.line, "negative scenario number"));
                }
                script.scenario = n;
            }
            "independent_gyro" | "ind_gyro" => self.independent_gyro = truthy(value),
            "delayed_motion" => self.delayed_motion = truthy(value),
            "pos" | "position" => script.start_position = parse_position(self.line, value)?,
            _ => {
                let evaluated = self.eval_token(value, self.prev_row_duration)?;
                self.vars.insert(name.to_string(), evaluated);
            }
        }
        Ok(())
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "t")
}

/// `(x;y;z)` start position.
fn parse_position(line: usize, value: &str) -> Result<Vector3f, ScriptError> {
    let inner = value
        .find('(')
        .and_then(|open| value.rfind(')').map(|close| (open, close)))
        .filter(|(open, close)| open < close)
        .map(|(open, close)| &value[open + 1..close])
        .ok_or_else(|| ScriptError::syntax(line, format!("invalid position `{value}`")))?;
    let coords: Vec<&str> = inner.split(';').collect();
    if coords.len() != 3 {
        return Err(ScriptError::syntax(
            line,
            format!("position needs 3 coordinates, got `{value}`"),
        ));
    }
    let mut parsed = [0.0; 3];
    for (slot, raw) in parsed.iter_mut().zip(&coords) {
        *slot = raw.trim().parse().map_err(|_| {
            ScriptError::syntax(line, format!("invalid position coordinate `{raw}`"))
        })?;
    }
    Ok(Vector3f::new(parsed[0], parsed[1], parsed[2]))
}

/// First scan: sum literal row durations for pre-allocation. Expression
/// durations are covered later by lazy extension.
fn count_frames(source: &str) -> usize {
    let mut total = 0usize;
    for line in source.lines() {
        let first = line.split('\t').next().unwrap_or("").trim();
        if first.is_empty() {
            total += 1;
        } else if let Ok(n) = first.parse::<i64>() {
            if n > 0 {
                total += n as usize;
            }
        }
    }
    total
}

/// Duration column: literal integer, or an expression over `!` (previous
/// row's duration) and variables. `None` means the line is a comment.
fn row_duration(ctx: &Context, first: &str) -> Result<Option<i64>, ScriptError> {
    if let Ok(n) = first.parse::<i64>() {
        if n < 0 {
            return Err(ScriptError::syntax(ctx.line, "negative row duration"));
        }
        return Ok(Some(n));
    }
    let token = first.replace('!', &ctx.prev_row_duration.to_string());
    let token = ctx.substitute_vars(&token)?;
    match expr::eval_expr(&token) {
        Some(v) if v >= 0.0 && v == v.trunc() => Ok(Some(v as i64)),
        Some(_) => Err(ScriptError::syntax(
            ctx.line,
            format!("row duration `{first}` must be a non-negative integer"),
        )),
        None => Ok(None),
    }
}

pub fn compile(source: &str, opts: &Options) -> Result<Script, ScriptError> {
    let mut ctx = Context::new(opts.mode);
    let mut script = Script::default();
    let mut frames = FrameTable::with_len(count_frames(source));
    let mut cursor = 0usize;

    for line in source.lines() {
        ctx.line += 1;
        let mut cols = line.split('\t');
        let first = cols.next().unwrap_or("").trim();

        let duration = if first.is_empty() {
            1
        } else if let Some(eq) = first.strip_prefix('$').and_then(|r| r.split_once('=')) {
            ctx.assign(&mut script, eq.0.trim().to_lowercase().as_str(), eq.1.trim())?;
            continue;
        } else {
            match row_duration(&ctx, first)? {
                Some(d) => d,
                None => continue,
            }
        };

        let row = cursor..cursor + duration as usize;
        ctx.row_start = row.start;
        frames.ensure(row.end);
        for col in cols {
            if col.trim().is_empty() {
                continue;
            }
            let token = ctx.eval_token(col, duration)?;
            directive::apply_token(&ctx, &mut frames, &token, row.clone())?;
        }
        cursor = row.end;
        ctx.prev_row_duration = duration;
    }

    script.frames = frames.into_frames();
    finalize::run(&mut script, ctx.independent_gyro, opts.remove_empty);
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ANG_VEL_FACTOR, buttons};

    fn compile_ok(source: &str) -> Script {
        compile(source, &Options::default()).expect("script compiles")
    }

    fn held(script: &Script, bit: u32) -> Vec<bool> {
        script.frames.iter().map(|f| f.buttons & bit != 0).collect()
    }

    #[test]
    fn test_buttons_and_stick_row() {
        let script = compile_ok("3\tA\tls(0.5;90)");
        assert_eq!(script.frames.len(), 3);
        for f in &script.frames {
            assert_eq!(f.buttons, buttons::A);
            assert_eq!(f.left_stick.coords.x, 0.0);
            assert_eq!(f.left_stick.coords.y, 16383.0 / 32767.0);
            assert_eq!(f.right_stick.coords.x, 0.0);
        }
    }

    #[test]
    fn test_button_mask_is_order_independent() {
        let a = compile_ok("2\ta\tzl\tdp-u");
        let b = compile_ok("2\tdp-u\tzl\ta");
        let expected = buttons::A | buttons::ZL | buttons::DPAD_UP;
        assert_eq!(a.frames[0].buttons, expected);
        assert_eq!(b.frames[0].buttons, expected);
    }

    #[test]
    fn test_variable_substitution() {
        let script = compile_ok("$x=5\n$x\ta");
        assert_eq!(script.frames.len(), 5);
        assert!(script.frames.iter().all(|f| f.buttons == buttons::A));

        let err = compile("$y\ta", &Options::default()).unwrap_err();
        assert!(matches!(err, ScriptError::UndefinedVariable { .. }));
    }

    #[test]
    fn test_variable_math_in_directive() {
        let script = compile_ok("$angle=45\n1\tls(1;$angle+45)");
        assert_eq!(script.frames[0].left_stick.theta, 90.0);
    }

    #[test]
    fn test_hash_is_row_duration() {
        // b[#-1] covers all but the last frame of the row
        let script = compile_ok("3\tb[#-1]");
        assert_eq!(held(&script, buttons::B), vec![true, true, false]);
    }

    #[test]
    fn test_previous_row_duration_in_expression() {
        let script = compile_ok("4\ta\n!*2\tb");
        assert_eq!(script.frames.len(), 12);
        assert!(script.frames[4..].iter().all(|f| f.buttons == buttons::B));
    }

    #[test]
    fn test_comment_lines_are_skipped() {
        let script = compile_ok("some note\ta\n2\ta\n1\tnot-a-button");
        assert_eq!(script.frames.len(), 3);
        assert_eq!(script.frames[2].buttons, 0);
    }

    #[test]
    fn test_global_assignments() {
        let script = compile_ok(
            "$stage=CapWorldHomeStage\n$entr=start\n$scen=2\n$pos=(1;2.5;-3)\n1\ta",
        );
        assert_eq!(script.stage_name, "CapWorldHomeStage");
        assert_eq!(script.stage_id, "start");
        assert_eq!(script.scenario, 2);
        assert_eq!(script.start_position, Vector3f::new(1.0, 2.5, -3.0));
    }

    #[test]
    fn test_negative_scenario_is_an_error() {
        let err = compile("$scen=-1\n1\ta", &Options::default()).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_toggle_hold_and_release() {
        let script = compile_ok("1\ta[*]\n3\n1\ta[0]\n2");
        assert_eq!(
            held(&script, buttons::A),
            vec![true, true, true, true, false, false, false]
        );
    }

    #[test]
    fn test_backward_range() {
        // b[-2] at write cursor 3 rewrites frames 1 and 2
        let script = compile_ok("3\ta\n1\tb[-2]\n");
        assert_eq!(held(&script, buttons::B), vec![false, true, true, false]);

        let err = compile("1\tb[-2]", &Options::default()).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_sequence_layout() {
        let script = compile_ok("6\ta[2]|b[?]");
        assert_eq!(
            held(&script, buttons::A),
            vec![true, true, false, false, false, false]
        );
        assert_eq!(
            held(&script, buttons::B),
            vec![false, false, true, true, true, true]
        );
    }

    #[test]
    fn test_sequence_default_member_duration_is_one() {
        let script = compile_ok("3\ta|b|x");
        assert_eq!(held(&script, buttons::A), vec![true, false, false]);
        assert_eq!(held(&script, buttons::B), vec![false, true, false]);
        assert_eq!(held(&script, buttons::X), vec![false, false, true]);
    }

    #[test]
    fn test_remainder_outside_sequence_is_an_error() {
        let err = compile("3\ta[?]", &Options::default()).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { .. }));
    }

    #[test]
    fn test_loop_cycles_until_row_is_filled() {
        let script = compile_ok("7\ta[2]/b[3]");
        assert_eq!(
            held(&script, buttons::A),
            vec![true, true, false, false, false, true, true]
        );
        assert_eq!(
            held(&script, buttons::B),
            vec![false, false, true, true, true, false, false]
        );
    }

    #[test]
    fn test_loop_rejects_negative_member() {
        let err = compile("6\ta[-2]/b", &Options::default()).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { .. }));
    }

    #[test]
    fn test_interpolation_endpoints_and_steps() {
        let script = compile_ok("5\tls(0;0)->ls(1;90)");
        for (k, f) in script.frames.iter().enumerate() {
            let expected_r = k as f64 * 0.25;
            assert!((f.left_stick.r - expected_r).abs() < 1e-12, "frame {k}");
            assert!((f.left_stick.theta - k as f64 * 22.5).abs() < 1e-12);
        }
        // exact endpoint
        assert_eq!(script.frames[4].left_stick.r, 1.0);
        assert_eq!(script.frames[4].left_stick.theta, 90.0);
        assert_eq!(script.frames[4].left_stick.coords.y, 1.0);
    }

    #[test]
    fn test_interpolation_needs_two_frames() {
        let err = compile("1\tls(0;0)->ls(1;90)", &Options::default()).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { .. }));
    }

    #[test]
    fn test_per_frame_offset_marker() {
        let script = compile_ok("3\tls(1;@*10)");
        let thetas: Vec<f64> = script.frames.iter().map(|f| f.left_stick.theta).collect();
        assert_eq!(thetas, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_per_frame_previous_marker_chains() {
        let script = compile_ok("1\tls(1;0)\n3\tls(1;!+10)");
        let thetas: Vec<f64> = script.frames.iter().map(|f| f.left_stick.theta).collect();
        assert_eq!(thetas, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_stick_sides() {
        let script = compile_ok("1\ts(1;90)\n1\trs(1;180)");
        let f0 = &script.frames[0];
        assert_eq!(f0.left_stick.coords, f0.right_stick.coords);
        let f1 = &script.frames[1];
        assert_eq!(f1.left_stick.coords.y, 0.0);
        assert_eq!(f1.right_stick.coords.x, -1.0);
    }

    #[test]
    fn test_gyro_defers_angular_velocity() {
        let script = compile_ok("1\tg(0;0;0)\n1\tg(10;0;0)");
        let f1 = &script.frames[1];
        assert_eq!(f1.gyro_left.ang_vel.x, ANG_VEL_FACTOR * 10.0);
        assert_eq!(f1.gyro_right.ang_vel.x, ANG_VEL_FACTOR * 10.0);
    }

    #[test]
    fn test_gyro_six_values_with_independent_gyro() {
        let script = compile_ok("$ind_gyro=true\n1\tg(0;0;0)\n1\tg(10;0;0;0.5;0;0)");
        assert_eq!(script.frames[1].gyro_left.ang_vel.x, 0.5);
    }

    #[test]
    fn test_motion_macro_presets() {
        let script = compile_ok("2\tm-uu\n1");
        let f0 = &script.frames[0];
        assert!(f0.macro_motion);
        assert_eq!(f0.accel_left, Vector3f::new(0.0, 3.0, 0.0));
        assert_eq!(f0.accel_right, Vector3f::new(0.0, 3.0, 0.0));
        assert_eq!(f0.gyro_left.ang_vel, Vector3f::new(-2.0, 0.0, 0.0));
        // derivation leaves macro frames alone
        assert_eq!(script.frames[1].gyro_right.ang_vel.x, -2.0);
        assert!(!script.frames[2].macro_motion);
    }

    #[test]
    fn test_motion_macro_text_mode() {
        let opts = Options {
            mode: OutputMode::Text,
            remove_empty: false,
        };
        let script = compile("1\tm-uu\n1\tm-d", &opts).unwrap();
        assert_eq!(script.frames[0].buttons, buttons::DPAD_UP);
        assert_eq!(script.frames[1].buttons, buttons::L | buttons::DPAD_DOWN);
        assert!(!script.frames[0].macro_motion);
    }

    #[test]
    fn test_delayed_motion_shifts_macro_writes() {
        let script = compile_ok("$delayed_motion=true\n2\n2\tm-uu\n");
        let flagged: Vec<bool> = script.frames.iter().map(|f| f.macro_motion).collect();
        assert_eq!(flagged, vec![false, true, true, false]);
    }

    #[test]
    fn test_remove_empty_frames() {
        let opts = Options {
            mode: OutputMode::Binary,
            remove_empty: true,
        };
        let script = compile("1\ta\n3\n1\tb\n2", &opts).unwrap();
        let steps: Vec<u32> = script.frames.iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![0, 4]);
    }

    #[test]
    fn test_rows_without_tokens_still_take_time() {
        let script = compile_ok("5");
        assert_eq!(script.frames.len(), 5);
    }
}
