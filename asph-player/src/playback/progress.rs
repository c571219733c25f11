//! Progress line rendering

use std::io::Write;
use std::time::{Duration, Instant};

/// Cells in the progress bar
pub const BAR_WIDTH: usize = 50;

/// Render `[#####-----] NN% | Elapsed: MM:SS | Remaining: MM:SS | Loop: On`.
///
/// A zero `total` renders as complete.
pub fn render(elapsed: Duration, total: Duration, looping: bool) -> String {
    let total_ms = total.as_millis();
    let elapsed = elapsed.min(total);
    let fraction = if total_ms == 0 {
        1.0
    } else {
        elapsed.as_millis() as f64 / total_ms as f64
    };
    let filled = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
    let percent = (fraction * 100.0) as u32;

    format!(
        "[{}{}] {:>3}% | Elapsed: {} | Remaining: {} | Loop: {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent,
        format_clock(elapsed),
        format_clock(total - elapsed),
        if looping { "On" } else { "Off" }
    )
}

/// MM:SS, minutes unbounded
pub fn format_clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Redraws the progress line in place, at most once per interval
pub struct ProgressWriter<W: Write> {
    out: W,
    interval: Duration,
    last_draw: Option<Instant>,
}

impl<W: Write> ProgressWriter<W> {
    pub fn new(out: W, interval: Duration) -> Self {
        Self {
            out,
            interval,
            last_draw: None,
        }
    }

    /// Draw `line` unless the previous draw was too recent
    pub fn update(&mut self, line: &str) -> std::io::Result<()> {
        if let Some(last) = self.last_draw {
            if last.elapsed() < self.interval {
                return Ok(());
            }
        }
        self.draw(line)
    }

    /// Draw unconditionally
    pub fn draw(&mut self, line: &str) -> std::io::Result<()> {
        self.last_draw = Some(Instant::now());
        write!(self.out, "\r{}", line)?;
        self.out.flush()
    }

    /// Terminate the line
    pub fn finish(&mut self) -> std::io::Result<()> {
        if self.last_draw.is_some() {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_half_way() {
        let line = render(Duration::from_secs(30), Duration::from_secs(60), false);
        assert_eq!(
            line,
            format!(
                "[{}{}]  50% | Elapsed: 00:30 | Remaining: 00:30 | Loop: Off",
                "#".repeat(25),
                "-".repeat(25)
            )
        );
    }

    #[test]
    fn test_render_bounds() {
        let start = render(Duration::ZERO, Duration::from_secs(125), true);
        assert!(start.starts_with(&format!("[{}]", "-".repeat(BAR_WIDTH))));
        assert!(start.ends_with("Remaining: 02:05 | Loop: On"));

        let past_end = render(Duration::from_secs(200), Duration::from_secs(125), true);
        assert!(past_end.starts_with(&format!("[{}] 100%", "#".repeat(BAR_WIDTH))));
        assert!(past_end.contains("Remaining: 00:00"));

        let empty = render(Duration::ZERO, Duration::ZERO, false);
        assert!(empty.contains("100%"));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_millis(59_999)), "00:59");
        assert_eq!(format_clock(Duration::from_secs(6_000)), "100:00");
    }

    #[test]
    fn test_writer_throttles() {
        let mut writer = ProgressWriter::new(Vec::new(), Duration::from_secs(3600));
        writer.update("one").unwrap();
        writer.update("two").unwrap();
        writer.draw("three").unwrap();
        writer.finish().unwrap();
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "\rone\rthree\n");
    }

    #[test]
    fn test_finish_without_draw_writes_nothing() {
        let mut writer = ProgressWriter::new(Vec::new(), Duration::ZERO);
        writer.finish().unwrap();
        assert!(writer.into_inner().is_empty());
    }
}
