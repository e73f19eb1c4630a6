//! nx-TAS style text writer: one line per frame,
//! `<step> <keys-or-NONE> <x>;<y> <x>;<y>` with i16 stick values.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;

use crate::model::{STICK_SCALE, Script, buttons};

pub fn render(script: &Script) -> String {
    let mut out = String::new();
    for frame in &script.frames {
        let _ = writeln!(
            out,
            "{} {} {};{} {};{}",
            frame.step,
            buttons::key_names(frame.buttons),
            to_i16(frame.left_stick.coords.x),
            to_i16(frame.left_stick.coords.y),
            to_i16(frame.right_stick.coords.x),
            to_i16(frame.right_stick.coords.y),
        );
    }
    out
}

pub fn emit(script: &Script, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, render(script)).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}

/// Inverse of the stick quantization: coordinates are exact multiples of
/// 1/32767, so this recovers the lattice integer.
fn to_i16(value: f64) -> i16 {
    (value * STICK_SCALE).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Frame, StickState};

    #[test]
    fn test_render_lines() {
        let mut script = Script::default();
        let mut f0 = Frame::neutral(0);
        f0.buttons = buttons::A | buttons::B;
        f0.left_stick = StickState::from_polar(0.5, 90.0);
        script.frames.push(f0);
        script.frames.push(Frame::neutral(1));

        let text = render(&script);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0 KEY_A;KEY_B 0;16383 0;0");
        assert_eq!(lines[1], "1 NONE 0;0 0;0");
    }
}
