use std::time::Instant;

pub const FIXED_DT_US: u64 = 16_667;

/// Fixed-timestep clock: wall time feeds an accumulator that is drained in
/// whole `fixed_dt` slices.
pub struct FixedClock {
    pub fixed_dt: f64,
    pub max_frame_dt: f64,
    accumulator: f64,
    pub total_time: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_instant: Instant,
}

impl FixedClock {
    pub fn new() -> Self {
        Self {
            fixed_dt: FIXED_DT_US as f64 / 1_000_000.0,
            max_frame_dt: 0.25,
            accumulator: 0.0,
            total_time: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
        }
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.feed(real_dt);
    }

    /// Feed an explicit wall-clock delta. `begin_frame` calls this with the
    /// measured delta.
    pub fn feed(&mut self, real_dt: f64) {
        self.real_dt = real_dt;
        // Spiral-of-death cap
        if self.real_dt > self.max_frame_dt {
            log::warn!(
                "Frame took {:.1}ms, capping to {}ms",
                self.real_dt * 1000.0,
                self.max_frame_dt * 1000.0
            );
            self.real_dt = self.max_frame_dt;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.total_time += self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new()
    }
}
