//! Passes over the completed frame table: sticky toggle resolution,
//! angular-velocity derivation, optional neutral-frame elision.

use crate::model::{ANG_VEL_FACTOR, Frame, Script, Vector3f};

pub fn run(script: &mut Script, independent_gyro: bool, remove_empty: bool) {
    resolve_toggles(&mut script.frames);
    if !independent_gyro {
        derive_angular_velocity(&mut script.frames);
    }
    if remove_empty {
        strip_neutral_frames(&mut script.frames);
    }
}

/// Realize "held from here until released": a running sticky mask picks up
/// toggle-on bits and drops any bit that is toggled off or directly pressed
/// on the same frame. Off wins when both land on one frame.
fn resolve_toggles(frames: &mut [Frame]) {
    let mut sticky: u32 = 0;
    for frame in frames {
        sticky |= frame.buttons_on;
        sticky &= !(frame.buttons | frame.buttons_off);
        frame.buttons |= sticky;
    }
}

/// Angular velocity is the per-axis orientation delta against the true
/// previous frame, scaled by ANG_VEL_FACTOR. Frames written by a motion
/// macro keep the velocity the macro supplied.
fn derive_angular_velocity(frames: &mut [Frame]) {
    let Some(first) = frames.first() else {
        return;
    };
    let mut prev_left = first.gyro_left.euler;
    let mut prev_right = first.gyro_right.euler;
    for frame in &mut frames[1..] {
        let left = frame.gyro_left.euler;
        let right = frame.gyro_right.euler;
        if !frame.macro_motion {
            frame.gyro_left.ang_vel = delta_velocity(left, prev_left);
            frame.gyro_right.ang_vel = delta_velocity(right, prev_right);
        }
        prev_left = left;
        prev_right = right;
    }
}

fn delta_velocity(now: Vector3f, prev: Vector3f) -> Vector3f {
    Vector3f::new(
        ANG_VEL_FACTOR * (now.x - prev.x),
        ANG_VEL_FACTOR * (now.y - prev.y),
        ANG_VEL_FACTOR * (now.z - prev.z),
    )
}

/// Drop frames that are bit-for-bit neutral (their own step number aside).
/// Remaining frames keep their original step numbers.
fn strip_neutral_frames(frames: &mut Vec<Frame>) {
    frames.retain(|f| *f != Frame::neutral(f.step));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::buttons;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|i| Frame::neutral(i as u32)).collect()
    }

    #[test]
    fn test_sticky_hold_until_release() {
        let mut f = frames(6);
        f[1].buttons_on = buttons::A;
        f[4].buttons_off = buttons::A;
        resolve_toggles(&mut f);
        let held: Vec<bool> = f.iter().map(|f| f.buttons & buttons::A != 0).collect();
        assert_eq!(held, vec![false, true, true, true, false, false]);
    }

    #[test]
    fn test_direct_press_clears_sticky() {
        let mut f = frames(4);
        f[0].buttons_on = buttons::B;
        f[2].buttons = buttons::B;
        resolve_toggles(&mut f);
        // frame 2 still shows the direct press; the sticky bit is gone after
        assert_eq!(f[1].buttons, buttons::B);
        assert_eq!(f[2].buttons, buttons::B);
        assert_eq!(f[3].buttons, 0);
    }

    #[test]
    fn test_off_wins_same_frame() {
        let mut f = frames(3);
        f[1].buttons_on = buttons::X;
        f[1].buttons_off = buttons::X;
        resolve_toggles(&mut f);
        assert_eq!(f[1].buttons, 0);
        assert_eq!(f[2].buttons, 0);
    }

    #[test]
    fn test_angular_velocity_from_euler_delta() {
        let mut f = frames(3);
        f[1].gyro_left.euler = Vector3f::new(10.0, 0.0, 0.0);
        f[2].gyro_left.euler = Vector3f::new(10.0, 20.0, 0.0);
        derive_angular_velocity(&mut f);
        assert_eq!(f[1].gyro_left.ang_vel.x, ANG_VEL_FACTOR * 10.0);
        assert_eq!(f[2].gyro_left.ang_vel.x, 0.0);
        assert_eq!(f[2].gyro_left.ang_vel.y, ANG_VEL_FACTOR * 20.0);
    }

    #[test]
    fn test_macro_frames_keep_their_velocity() {
        let mut f = frames(3);
        f[1].macro_motion = true;
        f[1].gyro_left.ang_vel = Vector3f::new(-3.0, 0.0, 0.0);
        f[2].gyro_left.euler = Vector3f::new(5.0, 0.0, 0.0);
        derive_angular_velocity(&mut f);
        assert_eq!(f[1].gyro_left.ang_vel, Vector3f::new(-3.0, 0.0, 0.0));
        // history tracks the true previous frame regardless of macro status
        assert_eq!(f[2].gyro_left.ang_vel.x, ANG_VEL_FACTOR * 5.0);
    }

    #[test]
    fn test_strip_neutral_frames_keeps_steps() {
        let mut f = frames(4);
        f[1].buttons = buttons::A;
        strip_neutral_frames(&mut f);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].step, 1);
    }
}
