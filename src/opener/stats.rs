use crate::world::timer::Millis;

/// Throughput counters for one arm->stop cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenStats {
    started: Option<Millis>,
    opened: u64,
}

impl OpenStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now: Millis) {
        self.started = Some(now);
    }

    pub fn record_open(&mut self) {
        self.opened = self.opened.saturating_add(1);
    }

    pub fn opened(&self) -> u64 {
        self.opened
    }

    /// Human summary for the stop notice. None unless the run actually
    /// started and opened something.
    pub fn summary(&self, now: Millis) -> Option<String> {
        let started = self.started?;
        if self.opened == 0 {
            return None;
        }
        let elapsed_ms = now.saturating_since(started);
        let per_box = elapsed_ms as f64 / self.opened as f64 / 1000.0;
        Some(format!(
            "Box opener stopped. Opened: {} boxes. Time elapsed: {}. Per box: {} sec.",
            self.opened,
            format_elapsed(elapsed_ms),
            format_sig2(per_box)
        ))
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.opened = 0;
    }
}

fn format_elapsed(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3_600,
        (total_seconds % 3_600) / 60,
        total_seconds % 60
    )
}

/// Round to two significant figures, plain decimal notation.
fn format_sig2(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "0.0".to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    let decimals = 1 - exponent;
    if decimals <= 0 {
        let scale = 10f64.powi(-decimals);
        format!("{}", (value / scale).round() * scale)
    } else {
        format!("{:.*}", decimals as usize, value)
    }
}
