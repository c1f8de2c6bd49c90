// src/ui/series.rs
//
// Bounded sample history for one chart. Points are (time, value) pairs in
// seconds since dashboard start; the oldest point is evicted once capacity
// is reached so a long-running dashboard stays flat in memory.

pub struct ChartSeries {
    points: Vec<(f64, f64)>,
    capacity: usize,
}

impl ChartSeries {
    pub fn new(capacity: usize) -> Self {
        ChartSeries {
            points: Vec::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&mut self, t: f64, value: f64) {
        if self.points.len() >= self.capacity {
            self.points.remove(0);
        }
        self.points.push((t, value));
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn last_time(&self) -> Option<f64> {
        self.points.last().map(|&(t, _)| t)
    }
}

// ============================================================================
// Tests
// ============================================================================
