// Cues - Named time positions attached to a sound

use crate::sound::SoundBuffer;
use serde::{Deserialize, Serialize};

/// A named marker at a sample position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub name: String,
    pub time: usize,
    /// Anchored cues are meant to stay attached to the audio they mark
    pub anchored: bool,
}

impl Cue {
    pub fn new(name: impl Into<String>, time: usize, anchored: bool) -> Self {
        Self {
            name: name.into(),
            time,
            anchored,
        }
    }
}

/// Verbatim copy of a sound's cue list, taken before an edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSnapshot {
    cues: Vec<Cue>,
}

impl CueSnapshot {
    pub fn capture(sound: &dyn SoundBuffer) -> Self {
        Self {
            cues: sound.cues().to_vec(),
        }
    }

    /// Put the captured list back, replacing whatever the edit left behind
    pub fn restore(&self, sound: &mut dyn SoundBuffer) {
        sound.set_cues(self.cues.clone());
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Shift cues for `length` samples inserted at `position`
pub(crate) fn shift_for_insert(cues: &mut [Cue], position: usize, length: usize) {
    for cue in cues.iter_mut().filter(|cue| cue.time >= position) {
        cue.time += length;
    }
}

/// Shift cues for `length` samples removed at `position`
///
/// Cues inside the removed range collapse onto `position`.
pub(crate) fn shift_for_remove(cues: &mut [Cue], position: usize, length: usize) {
    let end = position + length;
    for cue in cues.iter_mut() {
        if cue.time >= end {
            cue.time -= length;
        } else if cue.time > position {
            cue.time = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(cues: &[Cue]) -> Vec<usize> {
        cues.iter().map(|cue| cue.time).collect()
    }

    #[test]
    fn test_shift_for_insert() {
        let mut cues = vec![Cue::new("a", 5, false), Cue::new("b", 10, true)];
        shift_for_insert(&mut cues, 10, 4);
        assert_eq!(times(&cues), vec![5, 14]);
    }

    #[test]
    fn test_shift_for_remove() {
        let mut cues = vec![
            Cue::new("before", 2, false),
            Cue::new("inside", 12, false),
            Cue::new("after", 30, false),
        ];
        shift_for_remove(&mut cues, 10, 10);
        assert_eq!(times(&cues), vec![2, 10, 20]);
    }
}
