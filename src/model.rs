//! Frame/script data model shared by the compiler and the writers.

/// Angular velocity is the per-frame orientation delta (in degrees) scaled
/// by this factor; the game's gyro driver expects exactly this scaling.
pub const ANG_VEL_FACTOR: f64 = -3.0 / 200.0;

/// Stick coordinates are snapped to the nearest multiple of 1/32767 so the
/// value survives the 16-bit fixed-point encoding on the console side.
pub const STICK_SCALE: f64 = 32767.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2f {
    pub x: f64,
    pub y: f64,
}

impl Vector2f {
    pub fn zero() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3f {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3f {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Accelerometer value of an untouched frame.
    pub fn default_accel() -> Self {
        Self::zero()
    }
}

/// Row-major 3x3 rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix33f {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yx: f64,
    pub yy: f64,
    pub yz: f64,
    pub zx: f64,
    pub zy: f64,
    pub zz: f64,
}

impl Matrix33f {
    pub fn ident() -> Self {
        Self {
            xx: 1.0,
            xy: 0.0,
            xz: 0.0,
            yx: 0.0,
            yy: 1.0,
            yz: 0.0,
            zx: 0.0,
            zy: 0.0,
            zz: 1.0,
        }
    }

    /// Rotation matrix for Euler angles given in degrees.
    pub fn from_euler(euler: Vector3f) -> Self {
        let (cx, sx) = (euler.x.to_radians().cos(), euler.x.to_radians().sin());
        let (cy, sy) = (euler.y.to_radians().cos(), euler.y.to_radians().sin());
        let (cz, sz) = (euler.z.to_radians().cos(), euler.z.to_radians().sin());
        Self {
            xx: cy * cz,
            xy: -cy * sz,
            xz: sy,
            yx: cz * sx * sy + cx * sz,
            yy: cx * cz - sx * sy * sz,
            yz: -cy * sx,
            zx: -cx * cz * sy + sx * sz,
            zy: cz * sx + cx * sy * sz,
            zz: cx * cy,
        }
    }

    pub fn as_array(&self) -> [f64; 9] {
        [
            self.xx, self.xy, self.xz, self.yx, self.yy, self.yz, self.zx, self.zy, self.zz,
        ]
    }
}

/// One side's orientation state: Euler angles (degrees), the derived
/// rotation matrix, and the angular-velocity vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gyro {
    pub euler: Vector3f,
    pub direction: Matrix33f,
    pub ang_vel: Vector3f,
}

impl Gyro {
    pub fn zero() -> Self {
        Self {
            euler: Vector3f::zero(),
            direction: Matrix33f::ident(),
            ang_vel: Vector3f::zero(),
        }
    }

    /// Orientation from Euler angles; angular velocity left at zero for the
    /// derivation pass to fill in.
    pub fn from_euler(euler: Vector3f) -> Self {
        Self {
            euler,
            direction: Matrix33f::from_euler(euler),
            ang_vel: Vector3f::zero(),
        }
    }
}

/// Analog-stick state. The polar form is authoritative; `coords` is always
/// its quantized Cartesian projection and is never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickState {
    pub r: f64,
    /// Angle in degrees.
    pub theta: f64,
    pub coords: Vector2f,
}

impl StickState {
    pub fn from_polar(r: f64, theta_deg: f64) -> Self {
        let rad = theta_deg.to_radians();
        let coords = Vector2f {
            x: (STICK_SCALE * r * rad.cos()).trunc() / STICK_SCALE,
            y: (STICK_SCALE * r * rad.sin()).trunc() / STICK_SCALE,
        };
        Self {
            r,
            theta: theta_deg,
            coords,
        }
    }

    /// Re-derive the polar form from unit-scale Cartesian coordinates (used
    /// by the raw `sx(...)` directive emitted by the capture converter).
    pub fn from_cartesian(x: f64, y: f64) -> Self {
        Self::from_polar(x.hypot(y), y.atan2(x).to_degrees())
    }
}

/// One simulation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: u32,
    pub second_player: bool,
    /// Directly-held button mask.
    pub buttons: u32,
    /// Deferred toggle-on bits, resolved by the finalize pass.
    pub buttons_on: u32,
    /// Deferred toggle-off bits.
    pub buttons_off: u32,
    pub left_stick: StickState,
    pub right_stick: StickState,
    pub accel_left: Vector3f,
    pub accel_right: Vector3f,
    pub gyro_left: Gyro,
    pub gyro_right: Gyro,
    /// Set by motion macros; exempts the frame from angular-velocity
    /// derivation.
    pub macro_motion: bool,
}

impl Frame {
    pub fn neutral(step: u32) -> Self {
        Self {
            step,
            second_player: false,
            buttons: 0,
            buttons_on: 0,
            buttons_off: 0,
            left_stick: StickState::default(),
            right_stick: StickState::default(),
            accel_left: Vector3f::default_accel(),
            accel_right: Vector3f::default_accel(),
            gyro_left: Gyro::zero(),
            gyro_right: Gyro::zero(),
            macro_motion: false,
        }
    }
}

/// A fully compiled script, ready for the writers.
#[derive(Debug, Clone)]
pub struct Script {
    pub stage_name: String,
    pub stage_id: String,
    pub scenario: i32,
    pub is_two_player: bool,
    pub start_position: Vector3f,
    pub frames: Vec<Frame>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            stage_name: String::new(),
            stage_id: String::new(),
            scenario: 1,
            is_two_player: false,
            start_position: Vector3f::zero(),
            frames: Vec::new(),
        }
    }
}

pub mod buttons {
    //! Pad button bit positions and name tables.

    pub const A: u32 = 1 << 0;
    pub const B: u32 = 1 << 1;
    pub const ZL: u32 = 1 << 2;
    pub const X: u32 = 1 << 3;
    pub const Y: u32 = 1 << 4;
    pub const ZR: u32 = 1 << 5;
    pub const STICK_R: u32 = 1 << 6;
    pub const STICK_L: u32 = 1 << 7;
    pub const MINUS: u32 = 1 << 9;
    pub const PLUS: u32 = 1 << 10;
    pub const L: u32 = 1 << 13;
    pub const R: u32 = 1 << 14;
    pub const DPAD_UP: u32 = 1 << 16;
    pub const DPAD_DOWN: u32 = 1 << 17;
    pub const DPAD_LEFT: u32 = 1 << 18;
    pub const DPAD_RIGHT: u32 = 1 << 19;

    /// Script-token name → bit. Unknown names map to 0 so stray words in a
    /// row act as comments.
    pub fn from_name(name: &str) -> u32 {
        match name {
            "a" => A,
            "b" => B,
            "x" => X,
            "y" => Y,
            "l" => L,
            "r" => R,
            "zl" => ZL,
            "zr" => ZR,
            "plus" | "+" => PLUS,
            "minus" | "-" => MINUS,
            "dp-l" => DPAD_LEFT,
            "dp-u" => DPAD_UP,
            "dp-r" => DPAD_RIGHT,
            "dp-d" => DPAD_DOWN,
            "ls" => STICK_L,
            "rs" => STICK_R,
            _ => 0,
        }
    }

    /// Bit → nx-TAS key name, in the order the external tool lists them.
    pub const KEY_NAMES: &[(u32, &str)] = &[
        (A, "KEY_A"),
        (B, "KEY_B"),
        (X, "KEY_X"),
        (Y, "KEY_Y"),
        (L, "KEY_L"),
        (R, "KEY_R"),
        (ZL, "KEY_ZL"),
        (ZR, "KEY_ZR"),
        (PLUS, "KEY_PLUS"),
        (MINUS, "KEY_MINUS"),
        (DPAD_UP, "KEY_DUP"),
        (DPAD_DOWN, "KEY_DDOWN"),
        (DPAD_LEFT, "KEY_DLEFT"),
        (DPAD_RIGHT, "KEY_DRIGHT"),
        (STICK_L, "KEY_LSTICK"),
        (STICK_R, "KEY_RSTICK"),
    ];

    /// `;`-joined key names for a mask, or `NONE` when empty.
    pub fn key_names(mask: u32) -> String {
        let names: Vec<&str> = KEY_NAMES
            .iter()
            .filter(|(bit, _)| mask & bit != 0)
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            "NONE".to_string()
        } else {
            names.join(";")
        }
    }
}
