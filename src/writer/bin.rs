//! Binary frame-stream writer.
//!
//! Layout (little endian): `BOOB` magic, u32 frame count, bool two-player +
//! 3 pad bytes, i32 scenario, two 128-byte zero-padded ASCII names, 3-float
//! start position, then one 148-byte record per frame.

use std::path::Path;

use anyhow::Context;
use bytes::{BufMut, BytesMut};

use crate::error::ScriptError;
use crate::model::{Gyro, Script, Vector2f, Vector3f};

pub const MAGIC: &[u8; 4] = b"BOOB";
pub const HEADER_SIZE: usize = 4 + 12 + 128 + 128 + 12;
pub const FRAME_SIZE: usize = 12 + 16 + 24 + 48 + 48;

pub fn encode(script: &Script) -> Result<Vec<u8>, ScriptError> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + script.frames.len() * FRAME_SIZE);
    buf.put_slice(MAGIC);
    buf.put_u32_le(script.frames.len() as u32);
    buf.put_u8(script.is_two_player as u8);
    buf.put_bytes(0, 3);
    buf.put_i32_le(script.scenario);
    put_name(&mut buf, &script.stage_name)?;
    put_name(&mut buf, &script.stage_id)?;
    put_vec3(&mut buf, script.start_position);

    for frame in &script.frames {
        buf.put_u32_le(frame.step);
        buf.put_u8(frame.second_player as u8);
        buf.put_bytes(0, 3);
        buf.put_u32_le(frame.buttons);
        put_vec2(&mut buf, frame.left_stick.coords);
        put_vec2(&mut buf, frame.right_stick.coords);
        put_vec3(&mut buf, frame.accel_left);
        put_vec3(&mut buf, frame.accel_right);
        put_gyro(&mut buf, &frame.gyro_left);
        put_gyro(&mut buf, &frame.gyro_right);
    }
    Ok(buf.to_vec())
}

/// Write the whole stream in one shot; a compile failure upstream means no
/// file ever appears.
pub fn emit(script: &Script, path: &Path) -> anyhow::Result<()> {
    let data = encode(script)?;
    std::fs::write(path, data).with_context(|| format!("Writing {}", path.display()))?;
    Ok(())
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<(), ScriptError> {
    if !name.is_ascii() || name.len() > 128 {
        return Err(ScriptError::Format(format!(
            "name `{name}` must be ASCII and at most 128 bytes"
        )));
    }
    buf.put_slice(name.as_bytes());
    buf.put_bytes(0, 128 - name.len());
    Ok(())
}

fn put_vec2(buf: &mut BytesMut, v: Vector2f) {
    buf.put_f32_le(v.x as f32);
    buf.put_f32_le(v.y as f32);
}

fn put_vec3(buf: &mut BytesMut, v: Vector3f) {
    buf.put_f32_le(v.x as f32);
    buf.put_f32_le(v.y as f32);
    buf.put_f32_le(v.z as f32);
}

fn put_gyro(buf: &mut BytesMut, gyro: &Gyro) {
    for value in gyro.direction.as_array() {
        buf.put_f32_le(value as f32);
    }
    put_vec3(buf, gyro.ang_vel);
}
