use rand::Rng;
use serde::{Deserialize, Serialize};

/// Probability that a freshly spawned particle is a bass particle
const BASS_PROBABILITY: f64 = 0.08;

/// Probability that a normal particle draws from the slow speed range
const SLOW_PROBABILITY: f64 = 0.10;

/// Lowest tone a bass particle can carry
const BASS_TONE_BASE: u8 = 12;
/// Lowest tone a normal particle can carry
const NORMAL_TONE_BASE: u8 = 24;
/// Number of distinct tones above each base
const TONE_SPAN: u8 = 32;

/// Width and height of the simulated area, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A bounds rectangle with no area can hold no particle
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f64 {
        self.width.hypot(self.height)
    }
}

/// A circular body drifting across the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub radius: f64,
    pub left: f64,
    pub top: f64,
    /// Direction of travel in degrees
    pub heading: f64,
    /// Displacement per frame
    pub speed: f64,
    /// Set when a wall or another particle altered this particle during the last advance
    pub collided: bool,
    pub is_bass: bool,
    /// MIDI note number
    pub tone_id: u8,
}

impl Particle {
    /// Position reached after one unobstructed step along the current heading
    fn candidate_position(&self) -> (f64, f64) {
        let radian = self.heading.to_radians();
        (
            self.left + radian.cos() * self.speed,
            self.top + radian.sin() * self.speed,
        )
    }

    pub fn collision_event(&self) -> CollisionEvent {
        CollisionEvent {
            tone_id: self.tone_id,
            speed: self.speed,
            is_bass: self.is_bass,
        }
    }
}

/// Notification that a particle hit a wall or a peer during one advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub tone_id: u8,
    pub speed: f64,
    pub is_bass: bool,
}

/// Device class the particle field is generated for
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DeviceClass {
    #[default]
    Normal,
    /// Small screens: fewer, smaller, slower particles
    Compact,
}

impl DeviceClass {
    pub fn name(&self) -> &str {
        match self {
            DeviceClass::Normal => "Normal",
            DeviceClass::Compact => "Compact",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            DeviceClass::Normal => DeviceClass::Compact,
            DeviceClass::Compact => DeviceClass::Normal,
        }
    }

    pub fn spawn_profile(&self) -> SpawnProfile {
        match self {
            DeviceClass::Normal => SpawnProfile {
                min_count: 40,
                count_span: 40,
                bass_radius_max: 100.0,
                slow_speed_max: 1.9,
            },
            DeviceClass::Compact => SpawnProfile {
                min_count: 40,
                count_span: 20,
                bass_radius_max: 70.0,
                slow_speed_max: 0.9,
            },
        }
    }
}

/// Device-dependent constants used when generating a particle field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnProfile {
    pub min_count: usize,
    /// Count is drawn from `min_count..min_count + count_span`
    pub count_span: usize,
    pub bass_radius_max: f64,
    pub slow_speed_max: f64,
}

impl SpawnProfile {
    pub const NORMAL_RADIUS_MAX: f64 = 20.0;
    pub const MIN_RADIUS: f64 = 1.0;
    pub const MIN_SPEED: f64 = 0.1;
    const FAST_SPEED_FACTOR: f64 = 2.5;

    pub fn fast_speed_max(&self) -> f64 {
        self.slow_speed_max * Self::FAST_SPEED_FACTOR
    }

    /// Inclusive range of particle counts this profile can produce
    pub fn count_range(&self) -> (usize, usize) {
        (self.min_count, self.min_count + self.count_span.max(1) - 1)
    }
}

/// Generate a fresh particle field for the given bounds
///
/// Every draw is independent. Radii are capped to half of the smaller bounds
/// dimension so that a legal position always exists.
pub fn reset<R: Rng + ?Sized>(bounds: Bounds, profile: &SpawnProfile, rng: &mut R) -> Vec<Particle> {
    if bounds.is_degenerate() {
        return Vec::new();
    }

    let count = profile.min_count + rng.gen_range(0..profile.count_span.max(1));
    let radius_cap = bounds.width.min(bounds.height) / 2.0;

    (0..count)
        .map(|_| spawn_particle(bounds, profile, radius_cap, rng))
        .collect()
}

fn spawn_particle<R: Rng + ?Sized>(
    bounds: Bounds,
    profile: &SpawnProfile,
    radius_cap: f64,
    rng: &mut R,
) -> Particle {
    let is_bass = rng.gen::<f64>() < BASS_PROBABILITY;

    let radius_max = if is_bass {
        profile.bass_radius_max
    } else {
        SpawnProfile::NORMAL_RADIUS_MAX
    };
    let radius = (rng.gen::<f64>() * radius_max + SpawnProfile::MIN_RADIUS).min(radius_cap);

    // Span is zero when the radius fills a whole axis
    let left = rng.gen::<f64>() * (bounds.width - radius * 2.0) + radius;
    let top = rng.gen::<f64>() * (bounds.height - radius * 2.0) + radius;
    let heading = rng.gen::<f64>() * 360.0;

    let slow = is_bass || rng.gen::<f64>() < SLOW_PROBABILITY;
    let speed_max = if slow {
        profile.slow_speed_max
    } else {
        profile.fast_speed_max()
    };
    let speed = rng.gen::<f64>() * speed_max + SpawnProfile::MIN_SPEED;

    let tone_base = if is_bass { BASS_TONE_BASE } else { NORMAL_TONE_BASE };
    let tone_id = tone_base + rng.gen_range(0..TONE_SPAN);

    Particle {
        radius,
        left,
        top,
        heading,
        speed,
        collided: false,
        is_bass,
        tone_id,
    }
}

/// Advance every particle by one frame and report the collisions
///
/// Positions of other particles are read from the state as it was before this
/// frame started. The one exception is a peer collision: the partner's new
/// heading and its collided flag are written into the next-state buffer, so a
/// partner processed later in the same pass starts from the deflected heading.
pub fn advance(particles: &mut [Particle], bounds: Bounds) -> Vec<CollisionEvent> {
    if particles.is_empty() || bounds.is_degenerate() {
        return Vec::new();
    }

    let previous: Vec<Particle> = particles.to_vec();
    for particle in particles.iter_mut() {
        particle.collided = false;
    }

    for i in 0..particles.len() {
        let current = particles[i];
        let (mut left, mut top) = current.candidate_position();
        let mut heading = current.heading;
        let mut collided = current.collided;

        // Wall collisions. Both reflections start from the incoming heading,
        // so on a corner hit the vertical one replaces the horizontal one.
        if left < current.radius || left > bounds.width - current.radius {
            heading = 180.0 - current.heading;
            collided = true;
            left = clamp_axis(left, current.radius, bounds.width);
        }
        if top < current.radius || top > bounds.height - current.radius {
            heading = 360.0 - current.heading;
            collided = true;
            top = clamp_axis(top, current.radius, bounds.height);
        }

        // Peer collisions, first partner wins
        for (j, other) in previous.iter().enumerate() {
            if i == j {
                continue;
            }

            let dx = other.left - left;
            let dy = other.top - top;
            if dx.hypot(dy) < current.radius + other.radius {
                heading = (-dy).atan2(-dx).to_degrees();
                particles[j].heading = normalize_heading(dy.atan2(dx).to_degrees());
                particles[j].collided = true;
                collided = true;
                break;
            }
        }

        let particle = &mut particles[i];
        particle.left = left;
        particle.top = top;
        particle.heading = normalize_heading(heading);
        particle.collided = collided;
    }

    particles
        .iter()
        .filter(|p| p.collided)
        .map(Particle::collision_event)
        .collect()
}

/// Wrap a heading into `[0, 360)`
fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Clamp a coordinate into `[radius, bound - radius]`
fn clamp_axis(value: f64, radius: f64, bound: f64) -> f64 {
    if value < radius {
        radius
    } else if value > bound - radius {
        bound - radius
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    fn particle(left: f64, top: f64, radius: f64, heading: f64, speed: f64) -> Particle {
        Particle {
            radius,
            left,
            top,
            heading,
            speed,
            collided: false,
            is_bass: false,
            tone_id: 60,
        }
    }

    #[test]
    fn test_left_wall_bounce_scenario() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut particles = vec![particle(10.0, 300.0, 20.0, 180.0, 5.0)];

        let events = advance(&mut particles, bounds);

        assert_eq!(particles[0].left, 20.0);
        assert!((particles[0].top - 300.0).abs() < 1e-6);
        assert!(particles[0].heading.abs() < EPS);
        assert!(particles[0].collided);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_wall_reflection_inverts_offending_component() {
        let bounds = Bounds::new(200.0, 200.0);

        // Heading down-right towards the right wall
        let mut right = vec![particle(188.0, 100.0, 10.0, 30.0, 5.0)];
        advance(&mut right, bounds);
        let h = right[0].heading.to_radians();
        assert!(h.cos() < 0.0, "x component should now point left");
        assert!(h.sin() > 0.0, "y component should be untouched");

        // Heading up towards the top wall
        let mut top = vec![particle(100.0, 12.0, 10.0, 250.0, 5.0)];
        advance(&mut top, bounds);
        let h = top[0].heading.to_radians();
        assert!(h.sin() > 0.0, "y component should now point down");
        assert!(h.cos() < 0.0, "x component should be untouched");
    }

    #[test]
    fn test_corner_hit_keeps_vertical_reflection() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut particles = vec![particle(8.0, 8.0, 5.0, 225.0, 5.0)];

        advance(&mut particles, bounds);

        let p = particles[0];
        assert_eq!(p.left, 5.0);
        assert_eq!(p.top, 5.0);
        // 360 - 225, computed from the incoming heading
        assert!((p.heading - 135.0).abs() < EPS);
        assert!(p.collided);
    }

    #[test]
    fn test_headings_stay_normalized() {
        assert_eq!(normalize_heading(405.0), 45.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(-1e-20), 0.0);

        let bounds = Bounds::new(640.0, 480.0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut particles = reset(bounds, &DeviceClass::Normal.spawn_profile(), &mut rng);
        for _ in 0..300 {
            advance(&mut particles, bounds);
            for p in &particles {
                assert!((0.0..360.0).contains(&p.heading), "heading {}", p.heading);
            }
        }
    }

    #[test]
    fn test_peer_collision_points_headings_apart() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut particles = vec![
            particle(100.0, 100.0, 10.0, 0.0, 2.0),
            particle(120.0, 103.0, 10.0, 90.0, 0.0001),
        ];

        let events = advance(&mut particles, bounds);

        // A's candidate is (102, 100); B is read at its previous position (120, 103)
        let dx: f64 = 120.0 - 102.0;
        let dy: f64 = 103.0 - 100.0;
        let expected_a = (-dy).atan2(-dx).to_degrees() + 360.0;
        let expected_b = dy.atan2(dx).to_degrees();

        assert!(particles[0].collided);
        assert!(particles[1].collided);
        assert!((particles[0].heading - expected_a).abs() < EPS);
        assert!((particles[1].heading - expected_b).abs() < EPS);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_partner_heading_visible_later_in_pass() {
        let bounds = Bounds::new(1000.0, 1000.0);
        let mut particles = vec![
            particle(500.0, 500.0, 10.0, 0.0, 1.0),
            particle(515.0, 500.0, 10.0, 180.0, 30.0),
        ];

        advance(&mut particles, bounds);

        // B is pushed to 0 degrees by A and then steps right instead of left
        assert!((particles[1].left - 545.0).abs() < 1e-6);
        assert!(particles[1].collided);
    }

    #[test]
    fn test_first_collision_wins() {
        let bounds = Bounds::new(800.0, 600.0);
        let mut particles = vec![
            particle(300.0, 300.0, 10.0, 0.0, 1.0),
            particle(315.0, 300.0, 10.0, 0.0, 0.5),
            particle(300.0, 318.0, 10.0, 90.0, 5.0),
        ];

        advance(&mut particles, bounds);

        // A overlaps both B and C but only resolves against B
        assert!(particles[0].collided);
        assert!(particles[1].collided);
        assert!(!particles[2].collided);
        assert_eq!(particles[2].heading, 90.0);
    }

    #[test]
    fn test_events_match_collided_flags() {
        let bounds = Bounds::new(400.0, 300.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut particles = reset(bounds, &DeviceClass::Normal.spawn_profile(), &mut rng);

        for _ in 0..200 {
            let events = advance(&mut particles, bounds);
            let flagged: Vec<CollisionEvent> = particles
                .iter()
                .filter(|p| p.collided)
                .map(Particle::collision_event)
                .collect();
            assert_eq!(events, flagged);
        }
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        let bounds = Bounds::new(640.0, 480.0);
        let mut rng = StdRng::seed_from_u64(42);
        let mut particles = reset(bounds, &DeviceClass::Normal.spawn_profile(), &mut rng);

        for _ in 0..500 {
            advance(&mut particles, bounds);
            for p in &particles {
                assert!(p.left >= p.radius - EPS && p.left <= bounds.width - p.radius + EPS);
                assert!(p.top >= p.radius - EPS && p.top <= bounds.height - p.radius + EPS);
            }
        }
    }

    #[test]
    fn test_fixed_attributes_never_change() {
        let bounds = Bounds::new(500.0, 500.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut particles = reset(bounds, &DeviceClass::Compact.spawn_profile(), &mut rng);
        let before = particles.clone();

        for _ in 0..100 {
            advance(&mut particles, bounds);
        }

        assert_eq!(particles.len(), before.len());
        for (a, b) in particles.iter().zip(&before) {
            assert_eq!(a.radius, b.radius);
            assert_eq!(a.speed, b.speed);
            assert_eq!(a.is_bass, b.is_bass);
            assert_eq!(a.tone_id, b.tone_id);
        }
    }

    #[test]
    fn test_degenerate_inputs_are_noops() {
        let mut empty: Vec<Particle> = Vec::new();
        assert!(advance(&mut empty, Bounds::new(100.0, 100.0)).is_empty());

        let mut one = vec![particle(10.0, 10.0, 5.0, 0.0, 1.0)];
        assert!(advance(&mut one, Bounds::new(0.0, 100.0)).is_empty());
        assert_eq!(one[0].left, 10.0);

        let mut rng = StdRng::seed_from_u64(1);
        let profile = DeviceClass::Normal.spawn_profile();
        assert!(reset(Bounds::new(0.0, 0.0), &profile, &mut rng).is_empty());
    }

    #[test]
    fn test_reset_respects_profiles() {
        let bounds = Bounds::new(1280.0, 720.0);
        for device in [DeviceClass::Normal, DeviceClass::Compact] {
            let profile = device.spawn_profile();
            let (lo, hi) = profile.count_range();
            for seed in 0..20 {
                let mut rng = StdRng::seed_from_u64(seed);
                let particles = reset(bounds, &profile, &mut rng);
                assert!(particles.len() >= lo && particles.len() <= hi);

                for p in &particles {
                    assert!(p.left >= p.radius && p.left <= bounds.width - p.radius);
                    assert!(p.top >= p.radius && p.top <= bounds.height - p.radius);
                    assert!((0.0..360.0).contains(&p.heading));
                    assert!(p.speed >= SpawnProfile::MIN_SPEED);
                    assert!(p.speed <= profile.fast_speed_max() + SpawnProfile::MIN_SPEED);
                    if p.is_bass {
                        assert!(p.radius <= profile.bass_radius_max + 1.0);
                        assert!(p.speed <= profile.slow_speed_max + SpawnProfile::MIN_SPEED);
                        assert!((12..44).contains(&p.tone_id));
                    } else {
                        assert!(p.radius <= SpawnProfile::NORMAL_RADIUS_MAX + 1.0);
                        assert!((24..56).contains(&p.tone_id));
                    }
                }
            }
        }
    }

    #[test]
    fn test_reset_caps_radius_on_tiny_bounds() {
        let bounds = Bounds::new(30.0, 12.0);
        let mut rng = StdRng::seed_from_u64(9);
        let particles = reset(bounds, &DeviceClass::Normal.spawn_profile(), &mut rng);

        assert!(!particles.is_empty());
        for p in &particles {
            assert!(p.radius <= 6.0);
            assert!(p.top >= p.radius && p.top <= bounds.height - p.radius);
        }
    }

    #[test]
    fn test_reset_is_reproducible_with_seed() {
        let bounds = Bounds::new(800.0, 600.0);
        let profile = DeviceClass::Normal.spawn_profile();
        let a = reset(bounds, &profile, &mut StdRng::seed_from_u64(11));
        let b = reset(bounds, &profile, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
