use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
/// Two notes a fifth apart, each ringing out with an exponential decay.
const NOTES: [(f32, f32); 2] = [(784.0, 0.0), (1174.7, 0.18)];
const LENGTH_SECS: f32 = 1.2;
const DECAY: f32 = 4.5;

/// Short mono completion chime.
pub struct Chime {
    num_sample: usize,
    total_samples: usize,
}

impl Chime {
    pub fn new() -> Self {
        Self {
            num_sample: 0,
            total_samples: (SAMPLE_RATE as f32 * LENGTH_SECS) as usize,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f32(LENGTH_SECS)
    }
}

impl Default for Chime {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample += 1;

        let sample: f32 = NOTES
            .iter()
            .filter(|(_, onset)| t >= *onset)
            .map(|(freq, onset)| {
                let local = t - onset;
                (2.0 * PI * freq * local).sin() * (-DECAY * local).exp()
            })
            .sum();

        Some(sample * 0.2)
    }
}

#[cfg(feature = "audio")]
impl rodio::Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample.min(self.total_samples))
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration())
    }
}
