//! Debug CSV dump of the frame table, one row per frame.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;

use crate::model::{Frame, Script};

const HEADER: &str = "Frame,Buttons,ls.x,ls.y,rs.x,rs.y,la.x,la.y,la.z,ra.x,ra.y,ra.z,\
lg.r.xx,lg.r.xy,lg.r.xz,lg.r.yx,lg.r.yy,lg.r.yz,lg.r.zx,lg.r.zy,lg.r.zz,lg.v.x,lg.v.y,lg.v.z,\
rg.r.xx,rg.r.xy,rg.r.xz,rg.r.yx,rg.r.yy,rg.r.yz,rg.r.zx,rg.r.zy,rg.r.zz,rg.v.x,rg.v.y,rg.v.z";

pub fn render(script: &Script) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    for frame in &script.frames {
        let _ = writeln!(out, "{}", row(frame));
    }
    out
}

pub fn emit(script: &Script, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, render(script)).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}

fn row(f: &Frame) -> String {
    let mut values: Vec<String> = vec![f.step.to_string(), f.buttons.to_string()];
    for v in [
        f.left_stick.coords.x,
        f.left_stick.coords.y,
        f.right_stick.coords.x,
        f.right_stick.coords.y,
        f.accel_left.x,
        f.accel_left.y,
        f.accel_left.z,
        f.accel_right.x,
        f.accel_right.y,
        f.accel_right.z,
    ] {
        values.push(v.to_string());
    }
    for gyro in [&f.gyro_left, &f.gyro_right] {
        for v in gyro.direction.as_array() {
            values.push(v.to_string());
        }
        for v in [gyro.ang_vel.x, gyro.ang_vel.y, gyro.ang_vel.z] {
            values.push(v.to_string());
        }
    }
    values.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_width_matches_header() {
        let script = Script {
            frames: vec![Frame::neutral(0)],
            ..Script::default()
        };
        let text = render(&script);
        let mut lines = text.lines();
        let header_cols = lines.next().unwrap().split(',').count();
        let row_cols = lines.next().unwrap().split(',').count();
        assert_eq!(header_cols, 36);
        assert_eq!(row_cols, header_cols);
    }
}
