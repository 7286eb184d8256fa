use bevy::prelude::*;

/// Hermite smoothstep: eases in and out, `0 -> 0` and `1 -> 1`.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * 2.0f32.mul_add(-t, 3.0)
}

/// Position of a snap motion at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapStep {
    pub position: Vec3,
    pub finished: bool,
}

/// Timed move from `start` to `target`, advanced by the frame clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapMotion {
    start: Vec3,
    target: Vec3,
    elapsed: f32,
    duration: f32,
}

impl SnapMotion {
    pub fn new(start: Vec3, target: Vec3, duration: f32) -> Self {
        Self {
            start,
            target,
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    pub const fn target(&self) -> Vec3 {
        self.target
    }

    /// Position after `elapsed` seconds, pinned exactly to the target once
    /// the duration is reached.
    pub fn sample(&self, elapsed: f32) -> SnapStep {
        if elapsed >= self.duration {
            return SnapStep {
                position: self.target,
                finished: true,
            };
        }

        let t = smoothstep(elapsed / self.duration);
        SnapStep {
            position: self.start.lerp(self.target, t),
            finished: false,
        }
    }

    pub fn tick(&mut self, delta_secs: f32) -> SnapStep {
        self.elapsed += delta_secs.max(0.0);
        self.sample(self.elapsed)
    }

    /// Jumps to the end of the motion.
    pub fn finish(&mut self) -> SnapStep {
        self.elapsed = self.duration;
        self.sample(self.elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert_eq!(smoothstep(-2.0), 0.0);
        assert_eq!(smoothstep(3.0), 1.0);
    }

    #[test]
    fn starts_at_start_and_ends_exactly_on_target() {
        let start = Vec3::new(0.3, 0.0, -1.7);
        let target = Vec3::new(1.0, 0.0, -2.0);
        let motion = SnapMotion::new(start, target, 0.2);

        assert_eq!(motion.sample(0.0).position, start);
        assert!(!motion.sample(0.0).finished);
        assert_eq!(motion.sample(0.2), SnapStep {
            position: target,
            finished: true
        });
    }

    #[test]
    fn ticking_closes_in_on_target() {
        let target = Vec3::new(2.0, 0.0, 0.0);
        let mut motion = SnapMotion::new(Vec3::ZERO, target, 0.25);
        let mut last_distance = f32::INFINITY;
        let mut ticks = 0;

        loop {
            let step = motion.tick(1.0 / 60.0);
            let distance = step.position.distance(target);
            assert!(distance < last_distance);
            last_distance = distance;
            ticks += 1;
            if step.finished {
                assert_eq!(step.position, target);
                break;
            }
        }

        // 0.25 s at 60 Hz, give or take float accumulation
        assert!((15..=16).contains(&ticks));
    }

    #[test]
    fn finish_pins_to_target() {
        let mut motion = SnapMotion::new(Vec3::ZERO, Vec3::ONE, 1.0);
        motion.tick(0.1);
        assert_eq!(motion.finish(), SnapStep {
            position: Vec3::ONE,
            finished: true
        });
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let mut motion = SnapMotion::new(Vec3::ZERO, Vec3::X, 0.0);
        assert!(motion.tick(0.0).finished);
    }
}
