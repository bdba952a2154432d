//! Progress extraction from tool output.
//!
//! ffmpeg is run with `-progress pipe:1 -nostats`, which writes `key=value`
//! blocks terminated by a `progress=continue|end` line. Whisper prints a
//! tqdm bar (` 45%|█████     | ...`) on stderr.

/// Folds ffmpeg `-progress` lines into a percentage of `duration_secs`.
#[derive(Debug, Clone)]
pub struct FfmpegProgress {
    duration_secs: Option<f64>,
    out_time_us: Option<i64>,
}

impl FfmpegProgress {
    pub fn new(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs: duration_secs.filter(|d| *d > 0.0),
            out_time_us: None,
        }
    }

    /// Feed one line. Returns a percentage at the end of each progress block
    /// when one can be computed; `progress=end` always yields 100.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let line = line.trim();
        if let Some(val) = line.strip_prefix("out_time_us=") {
            self.out_time_us = val.trim().parse::<i64>().ok();
        } else if let Some(val) = line.strip_prefix("out_time_ms=") {
            // Despite the name ffmpeg reports microseconds here too.
            if self.out_time_us.is_none() {
                self.out_time_us = val.trim().parse::<i64>().ok();
            }
        } else if let Some(state) = line.strip_prefix("progress=") {
            if state.trim() == "end" {
                return Some(100.0);
            }
            let (out_us, dur) = (self.out_time_us.take()?, self.duration_secs?);
            let elapsed = out_us.max(0) as f64 / 1_000_000.0;
            return Some((elapsed / dur * 100.0).clamp(0.0, 99.9));
        }
        None
    }
}

/// Extract the percentage from a tqdm-style line (` 45%|████ |`).
pub fn tqdm_percent(line: &str) -> Option<f64> {
    let (head, _) = line.split_once("%|")?;
    let digits: String = head
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse::<f64>().ok().filter(|p| (0.0..=100.0).contains(p))
}
