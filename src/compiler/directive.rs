//! Directive token classification and the frame-range writers behind it.
//!
//! A token arrives here with variables, `#` and plain arithmetic already
//! substituted. Structure is recognized in one place (sequence, loop,
//! interpolation, parenthesized directive, macro, button) and each shape
//! gets its own writer over an explicit frame range.

use std::ops::Range;

use super::duration::{Dur, split_suffix};
use super::expr;
use super::table::FrameTable;
use super::{Context, OutputMode};
use crate::error::ScriptError;
use crate::model::{Gyro, StickState, Vector3f, buttons};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sides {
    left: bool,
    right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    StickPolar,
    StickCart,
    Accel,
    Gyroscope,
}

/// Directive prefix → kind + targeted sides, parsed exactly once.
fn directive_kind(prefix: &str) -> Option<(Kind, Sides)> {
    let both = Sides {
        left: true,
        right: true,
    };
    let left = Sides {
        left: true,
        right: false,
    };
    let right = Sides {
        left: false,
        right: true,
    };
    match prefix {
        "s" => Some((Kind::StickPolar, both)),
        "ls" => Some((Kind::StickPolar, left)),
        "rs" => Some((Kind::StickPolar, right)),
        "sx" => Some((Kind::StickCart, both)),
        "lsx" => Some((Kind::StickCart, left)),
        "rsx" => Some((Kind::StickCart, right)),
        "a" => Some((Kind::Accel, both)),
        "la" => Some((Kind::Accel, left)),
        "ra" => Some((Kind::Accel, right)),
        "g" => Some((Kind::Gyroscope, both)),
        "lg" => Some((Kind::Gyroscope, left)),
        "rg" => Some((Kind::Gyroscope, right)),
        _ => None,
    }
}

/// `prefix(args)` split, requiring the closing parenthesis to end the token.
fn parse_paren(token: &str) -> Option<(&str, &str)> {
    let open = token.find('(')?;
    let close = token.rfind(')')?;
    if close != token.len() - 1 || close < open {
        return None;
    }
    Some((&token[..open], &token[open + 1..close]))
}

/// Entry point: apply one evaluated row token over the row's frame range.
pub fn apply_token(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    row: Range<usize>,
) -> Result<(), ScriptError> {
    if token.contains('|') {
        return sequence(ctx, table, token, row);
    }
    if token.contains('/') {
        return cycle(ctx, table, token, row);
    }
    let (stripped, dur) = split_suffix(token, ctx.line)?;
    match dur {
        Some(Dur::HoldOn) => {
            toggle(table, stripped, row.start, true);
            Ok(())
        }
        Some(Dur::HoldOff) => {
            toggle(table, stripped, row.start, false);
            Ok(())
        }
        Some(Dur::Remainder) => Err(ScriptError::syntax(
            ctx.line,
            "`[?]` duration is only allowed inside a `|` sequence",
        )),
        Some(Dur::Fixed(n)) => {
            let range = fixed_range(ctx, row.start, n)?;
            apply_over_range(ctx, table, stripped, range)
        }
        None => apply_over_range(ctx, table, stripped, row),
    }
}

/// Dispatch a suffix-free token over a concrete range. Sequence members
/// land here too, so loops and interpolation stay available inside one.
fn apply_over_range(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    if token.contains("->") {
        interpolate(ctx, table, token, range)
    } else if token.contains('/') {
        cycle(ctx, table, token, range)
    } else {
        simple(ctx, table, token, range)
    }
}

/// Forward range from the cursor, or a backward range ending at it.
fn fixed_range(ctx: &Context, cursor: usize, n: i64) -> Result<Range<usize>, ScriptError> {
    if n >= 0 {
        Ok(cursor..cursor + n as usize)
    } else {
        let len = n.unsigned_abs() as usize;
        if cursor < len {
            return Err(ScriptError::syntax(
                ctx.line,
                format!("duration [{n}] reaches before frame 0"),
            ));
        }
        Ok(cursor - len..cursor)
    }
}

/// `a|b|c`: members laid out consecutively, each with its own duration
/// (default 1; `[?]` takes whatever is left of the row).
fn sequence(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    row: Range<usize>,
) -> Result<(), ScriptError> {
    let mut cursor = row.start;
    for part in token.split('|') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (stripped, dur) = split_suffix(part, ctx.line)?;
        match dur {
            Some(Dur::HoldOn) => toggle(table, stripped, cursor, true),
            Some(Dur::HoldOff) => toggle(table, stripped, cursor, false),
            Some(Dur::Remainder) => {
                let rest = row.end.saturating_sub(cursor);
                apply_over_range(ctx, table, stripped, cursor..cursor + rest)?;
                cursor += rest;
            }
            Some(Dur::Fixed(n)) if n < 0 => {
                // retroactive write; the cursor stays put
                let range = fixed_range(ctx, cursor, n)?;
                apply_over_range(ctx, table, stripped, range)?;
            }
            Some(Dur::Fixed(n)) => {
                apply_over_range(ctx, table, stripped, cursor..cursor + n as usize)?;
                cursor += n as usize;
            }
            None => {
                apply_over_range(ctx, table, stripped, cursor..cursor + 1)?;
                cursor += 1;
            }
        }
    }
    Ok(())
}

/// `a/b`: repeat the member cycle until the range is filled, truncating
/// the last repetition.
fn cycle(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let mut members: Vec<(&str, usize)> = Vec::new();
    for part in token.split('/') {
        let (stripped, dur) = split_suffix(part.trim(), ctx.line)?;
        let len = match dur {
            None => 1,
            Some(Dur::Fixed(n)) if n > 0 => n as usize,
            Some(Dur::Fixed(n)) => {
                return Err(ScriptError::syntax(
                    ctx.line,
                    format!("loop member duration [{n}] must be positive"),
                ));
            }
            Some(_) => {
                return Err(ScriptError::syntax(
                    ctx.line,
                    "loop members need a fixed duration",
                ));
            }
        };
        members.push((stripped, len));
    }
    if members.is_empty() {
        return Ok(());
    }
    let mut cursor = range.start;
    'fill: loop {
        for (member, len) in &members {
            if cursor >= range.end {
                break 'fill;
            }
            let end = (cursor + len).min(range.end);
            simple(ctx, table, member, cursor..end)?;
            cursor = end;
        }
    }
    Ok(())
}

/// `s(..)->s(..)`: linear polar interpolation, endpoints inclusive.
fn interpolate(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let duration = range.len();
    if duration < 2 {
        return Err(ScriptError::syntax(
            ctx.line,
            "interpolation needs a duration of at least 2",
        ));
    }
    let (from, to) = token
        .split_once("->")
        .ok_or_else(|| ScriptError::syntax(ctx.line, format!("malformed interpolation `{token}`")))?;
    let (prefix, from_args) = parse_paren(from.trim())
        .ok_or_else(|| ScriptError::syntax(ctx.line, format!("malformed directive `{from}`")))?;
    let (_, to_args) = parse_paren(to.trim())
        .ok_or_else(|| ScriptError::syntax(ctx.line, format!("malformed directive `{to}`")))?;
    let sides = match directive_kind(prefix) {
        Some((Kind::StickPolar, sides)) => sides,
        _ => {
            return Err(ScriptError::syntax(
                ctx.line,
                format!("`->` interpolates stick directives, got `{prefix}(..)`"),
            ));
        }
    };
    let (r1, t1) = parse_polar(ctx, from_args)?;
    let (r2, t2) = parse_polar(ctx, to_args)?;

    let steps = (duration - 1) as f64;
    for k in 0..duration {
        let (r, theta) = if k == duration - 1 {
            (r2, t2)
        } else {
            let k = k as f64;
            (r1 + k * (r2 - r1) / steps, t1 + k * (t2 - t1) / steps)
        };
        let stick = StickState::from_polar(r, theta);
        write_stick(table, range.start + k, sides, stick);
    }
    Ok(())
}

/// Stick/accel/gyro directive, motion macro, or bare button name.
fn simple(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    if let Some((prefix, args)) = parse_paren(token) {
        let (kind, sides) = directive_kind(prefix)
            .ok_or_else(|| ScriptError::syntax(ctx.line, format!("unknown directive `{prefix}(..)`")))?;
        return match kind {
            Kind::StickPolar => stick_polar(ctx, table, args, sides, range),
            Kind::StickCart => stick_cart(ctx, table, args, sides, range),
            Kind::Accel => accel(ctx, table, args, sides, range),
            Kind::Gyroscope => gyroscope(ctx, table, args, sides, range),
        };
    }
    if token.contains('(') || token.contains(')') {
        return Err(ScriptError::syntax(
            ctx.line,
            format!("malformed directive `{token}`"),
        ));
    }
    if is_macro(token) {
        return motion_macro(ctx, table, token, range);
    }
    let bits = buttons::from_name(token);
    if bits != 0 {
        table.write(range, |f| f.buttons |= bits);
    }
    // unknown bare words are tolerated as comments
    Ok(())
}

fn toggle(table: &mut FrameTable, token: &str, index: usize, on: bool) {
    let bits = buttons::from_name(token);
    if bits == 0 {
        return;
    }
    let frame = table.frame_mut(index);
    if on {
        frame.buttons_on |= bits;
    } else {
        frame.buttons_off |= bits;
    }
}

fn write_stick(table: &mut FrameTable, index: usize, sides: Sides, stick: StickState) {
    let frame = table.frame_mut(index);
    if sides.left {
        frame.left_stick = stick;
    }
    if sides.right {
        frame.right_stick = stick;
    }
}

/// Broadcast path: the args are pure numbers, evaluated once.
fn stick_polar(
    ctx: &Context,
    table: &mut FrameTable,
    args: &str,
    sides: Sides,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    if args.contains('!') || args.contains('@') {
        return stick_polar_per_frame(ctx, table, args, sides, range);
    }
    let (r, theta) = parse_polar(ctx, args)?;
    let stick = StickState::from_polar(r, theta);
    table.write(range, |f| {
        if sides.left {
            f.left_stick = stick;
        }
        if sides.right {
            f.right_stick = stick;
        }
    });
    Ok(())
}

/// Per-frame path: `!` is the targeted side's previous-frame value for the
/// same slot, `@` the offset from the row start; both re-run arithmetic.
fn stick_polar_per_frame(
    ctx: &Context,
    table: &mut FrameTable,
    args: &str,
    sides: Sides,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let slots: Vec<&str> = args.split(';').collect();
    if slots.is_empty() || slots.len() > 2 {
        return Err(ScriptError::syntax(
            ctx.line,
            format!("stick directive takes 1 or 2 values, got `{args}`"),
        ));
    }
    table.ensure(range.end);
    for index in range {
        let offset = index - ctx.row_start;
        for (is_left, targeted) in [(true, sides.left), (false, sides.right)] {
            if !targeted {
                continue;
            }
            let prev = match index.checked_sub(1).and_then(|i| table.frame(i)) {
                Some(f) => {
                    if is_left {
                        f.left_stick
                    } else {
                        f.right_stick
                    }
                }
                None => StickState::default(),
            };
            let (r, theta) = if slots.len() == 1 {
                (1.0, resolve_slot(ctx, slots[0], prev.theta, offset)?)
            } else {
                (
                    resolve_slot(ctx, slots[0], prev.r, offset)?,
                    resolve_slot(ctx, slots[1], prev.theta, offset)?,
                )
            };
            let one_side = Sides {
                left: is_left,
                right: !is_left,
            };
            write_stick(table, index, one_side, StickState::from_polar(r, theta));
        }
    }
    Ok(())
}

fn resolve_slot(
    ctx: &Context,
    slot: &str,
    prev: f64,
    offset: usize,
) -> Result<f64, ScriptError> {
    let s = slot
        .replace('!', &expr::format_number(prev))
        .replace('@', &offset.to_string());
    expr::eval_expr(&s)
        .ok_or_else(|| ScriptError::syntax(ctx.line, format!("bad stick value `{slot}`")))
}

/// Raw Cartesian stick form, 16-bit scale (`lsx(16383; 0)`), as emitted by
/// the capture-log converter.
fn stick_cart(
    ctx: &Context,
    table: &mut FrameTable,
    args: &str,
    sides: Sides,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let values = parse_floats(ctx, args, 2)?;
    let stick = StickState::from_cartesian(
        values[0] / crate::model::STICK_SCALE,
        values[1] / crate::model::STICK_SCALE,
    );
    table.write(range, |f| {
        if sides.left {
            f.left_stick = stick;
        }
        if sides.right {
            f.right_stick = stick;
        }
    });
    Ok(())
}

fn accel(
    ctx: &Context,
    table: &mut FrameTable,
    args: &str,
    sides: Sides,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let v = parse_floats(ctx, args, 3)?;
    let accel = Vector3f::new(v[0], v[1], v[2]);
    table.write(range, |f| {
        if sides.left {
            f.accel_left = accel;
        }
        if sides.right {
            f.accel_right = accel;
        }
    });
    Ok(())
}

/// `g(pitch;yaw;roll)` defers angular velocity to the derivation pass; the
/// six-value form supplies it explicitly.
fn gyroscope(
    ctx: &Context,
    table: &mut FrameTable,
    args: &str,
    sides: Sides,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let count = args.split(';').count();
    if count != 3 && count != 6 {
        return Err(ScriptError::syntax(
            ctx.line,
            format!("gyro directive takes 3 or 6 values, got `{args}`"),
        ));
    }
    let v = parse_floats(ctx, args, count)?;
    let mut gyro = Gyro::from_euler(Vector3f::new(v[0], v[1], v[2]));
    if count == 6 {
        gyro.ang_vel = Vector3f::new(v[3], v[4], v[5]);
    }
    table.write(range, |f| {
        if sides.left {
            f.gyro_left = gyro;
        }
        if sides.right {
            f.gyro_right = gyro;
        }
    });
    Ok(())
}

fn is_macro(token: &str) -> bool {
    matches!(
        token,
        "m" | "m-u" | "m-d" | "m-l" | "m-r" | "m-uu" | "m-dd" | "m-ll" | "m-rr"
    )
}

/// Preset accelerometer + angular-velocity bundle for one motion gesture.
/// Single-side gestures shake the left controller only; doubled suffixes
/// shake both.
struct MacroPreset {
    accel: Vector3f,
    ang_vel: Vector3f,
    both: bool,
}

fn macro_preset(token: &str) -> MacroPreset {
    let (accel, ang_vel, both) = match token {
        "m" | "m-u" => (Vector3f::new(0.0, 3.0, 0.0), Vector3f::new(-3.0, 0.0, 0.0), false),
        "m-d" => (Vector3f::new(0.0, 3.0, 0.0), Vector3f::new(3.0, 0.0, 0.0), false),
        "m-l" => (Vector3f::new(-3.0, 0.0, 0.0), Vector3f::new(0.0, 2.0, 0.0), false),
        "m-r" => (Vector3f::new(3.0, 0.0, 0.0), Vector3f::new(0.0, -2.0, 0.0), false),
        "m-uu" => (Vector3f::new(0.0, 3.0, 0.0), Vector3f::new(-2.0, 0.0, 0.0), true),
        "m-dd" => (Vector3f::new(0.0, 3.0, 0.0), Vector3f::new(2.0, 0.0, 0.0), true),
        "m-ll" => (Vector3f::new(-3.0, 0.0, 0.0), Vector3f::new(0.0, 2.0, 0.0), true),
        "m-rr" => (Vector3f::new(3.0, 0.0, 0.0), Vector3f::new(0.0, -2.0, 0.0), true),
        _ => unreachable!("checked by is_macro"),
    };
    MacroPreset {
        accel,
        ang_vel,
        both,
    }
}

/// Key substitution used when motion cannot be expressed (text output):
/// doubled gestures become their D-pad key, single-side ones L + D-pad.
fn macro_buttons(token: &str) -> u32 {
    match token {
        "m" | "m-u" => buttons::L | buttons::DPAD_UP,
        "m-d" => buttons::L | buttons::DPAD_DOWN,
        "m-l" => buttons::L | buttons::DPAD_LEFT,
        "m-r" => buttons::L | buttons::DPAD_RIGHT,
        "m-uu" => buttons::DPAD_UP,
        "m-dd" => buttons::DPAD_DOWN,
        "m-ll" => buttons::DPAD_LEFT,
        "m-rr" => buttons::DPAD_RIGHT,
        _ => unreachable!("checked by is_macro"),
    }
}

fn motion_macro(
    ctx: &Context,
    table: &mut FrameTable,
    token: &str,
    range: Range<usize>,
) -> Result<(), ScriptError> {
    let range = if ctx.delayed_motion {
        // the mod applies motion one frame late; compensate
        let start = range.start.saturating_sub(1);
        let end = range.end.saturating_sub(1).max(start);
        start..end
    } else {
        range
    };
    if ctx.mode == OutputMode::Text {
        let bits = macro_buttons(token);
        table.write(range, |f| f.buttons |= bits);
        return Ok(());
    }
    let preset = macro_preset(token);
    let mut gyro_on = Gyro::zero();
    gyro_on.ang_vel = preset.ang_vel;
    table.write(range, |f| {
        f.accel_left = preset.accel;
        f.gyro_left = gyro_on;
        if preset.both {
            f.accel_right = preset.accel;
            f.gyro_right = gyro_on;
        } else {
            f.accel_right = Vector3f::default_accel();
            f.gyro_right = Gyro::zero();
        }
        f.macro_motion = true;
    });
    Ok(())
}

fn parse_polar(ctx: &Context, args: &str) -> Result<(f64, f64), ScriptError> {
    let slots: Vec<&str> = args.split(';').collect();
    match slots.as_slice() {
        [theta] => Ok((1.0, parse_number(ctx, theta)?)),
        [r, theta] => Ok((parse_number(ctx, r)?, parse_number(ctx, theta)?)),
        _ => Err(ScriptError::syntax(
            ctx.line,
            format!("stick directive takes 1 or 2 values, got `{args}`"),
        )),
    }
}

fn parse_floats(ctx: &Context, args: &str, expected: usize) -> Result<Vec<f64>, ScriptError> {
    let slots: Vec<&str> = args.split(';').collect();
    if slots.len() != expected {
        return Err(ScriptError::syntax(
            ctx.line,
            format!("expected {expected} values, got `{args}`"),
        ));
    }
    slots.iter().map(|s| parse_number(ctx, s)).collect()
}

fn parse_number(ctx: &Context, s: &str) -> Result<f64, ScriptError> {
    let s = s.trim();
    s.parse()
        .ok()
        .or_else(|| expr::eval_expr(s))
        .ok_or_else(|| ScriptError::syntax(ctx.line, format!("invalid number `{s}`")))
}
