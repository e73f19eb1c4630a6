//! Growable table of per-frame state.
//!
//! Frames come into existence neutrally initialized the first time any write
//! reaches their index; rows with no tokens still extend the table so empty
//! time passes in the output.

use std::ops::Range;

use crate::model::Frame;

#[derive(Debug, Default)]
pub struct FrameTable {
    frames: Vec<Frame>,
}

impl FrameTable {
    /// Pre-sized table; the count scan gives a lower bound, lazy extension
    /// covers the rest.
    pub fn with_len(len: usize) -> Self {
        Self {
            frames: (0..len).map(|i| Frame::neutral(i as u32)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Extend with neutral frames so indices below `end` all exist.
    pub fn ensure(&mut self, end: usize) {
        while self.frames.len() < end {
            let step = self.frames.len() as u32;
            self.frames.push(Frame::neutral(step));
        }
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> &mut Frame {
        self.ensure(index + 1);
        &mut self.frames[index]
    }

    /// Apply `write` to every frame in `range`, creating frames as needed.
    /// Later writes win per field.
    pub fn write<F: FnMut(&mut Frame)>(&mut self, range: Range<usize>, mut write: F) {
        self.ensure(range.end);
        for frame in &mut self.frames[range] {
            write(frame);
        }
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::buttons;

    #[test]
    fn test_lazy_extension_is_neutral() {
        let mut table = FrameTable::with_len(2);
        table.write(5..7, |f| f.buttons |= buttons::A);
        assert_eq!(table.len(), 7);
        assert_eq!(*table.frame(3).unwrap(), Frame::neutral(3));
        assert_eq!(table.frame(6).unwrap().buttons, buttons::A);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut table = FrameTable::with_len(3);
        table.write(0..3, |f| f.buttons = buttons::A);
        table.write(1..2, |f| f.buttons = buttons::B);
        assert_eq!(table.frame(0).unwrap().buttons, buttons::A);
        assert_eq!(table.frame(1).unwrap().buttons, buttons::B);
        assert_eq!(table.frame(2).unwrap().buttons, buttons::A);
    }
}
