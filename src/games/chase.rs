//! Chase evasion: escapees run for the safe zone while pursuers hunt the
//! nearest one still in play.
//!
//! Escapees can drop oil slicks that slow anything else crossing them. The
//! first escapee to reach the safe zone wins for its vote group; if every
//! escapee is caught, nobody wins.

use super::geometry::{circles_overlap, slide_move, Rect, Vec2};
use super::{
    seconds_to_ticks, Controller, ControllerLoss, Countdown, InputBuffer, MiniGameSnapshot,
    TickSimulation, TickStatus, Winner,
};
use crate::types::{DisplayName, MiniGameKind, Vote};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const FIELD_WIDTH: f64 = 700.0;
pub const FIELD_HEIGHT: f64 = 500.0;
const FIELD: (f64, f64) = (FIELD_WIDTH, FIELD_HEIGHT);

pub const ESCAPEE_RADIUS: f64 = 10.0;
/// Pixels per tick
pub const ESCAPEE_SPEED: f64 = 2.0;
pub const PURSUER_RADIUS: f64 = 8.0;
pub const PURSUER_SPEED: f64 = 0.75;
pub const PURSUERS_PER_ESCAPEE: usize = 2;
pub const MAX_ESCAPEES: usize = 8;

pub const SAFE_ZONE_CENTER: Vec2 = Vec2::new(640.0, 250.0);
pub const SAFE_ZONE_WIDTH: f64 = 50.0;
pub const SAFE_ZONE_HEIGHT: f64 = 80.0;

pub const BUILDINGS: [Rect; 4] = [
    Rect::new(150.0, 100.0, 80.0, 120.0),
    Rect::new(400.0, 250.0, 120.0, 70.0),
    Rect::new(250.0, 350.0, 60.0, 60.0),
    Rect::new(500.0, 50.0, 70.0, 100.0),
];

pub const SLICK_RADIUS: f64 = 15.0;
pub const SLICK_LIFETIME_SECONDS: u32 = 5;
pub const SLICK_COOLDOWN_SECONDS: u32 = 10;
pub const MAX_SLICKS_PER_ESCAPEE: usize = 3;
pub const SLOW_FACTOR: f64 = 0.4;
pub const SLOW_SECONDS: u32 = 2;
pub const COUNTDOWN_SECONDS: u32 = 5;

const SPAWN_ATTEMPTS: usize = 100;

fn safe_zone() -> Rect {
    Rect::centered(SAFE_ZONE_CENTER, SAFE_ZONE_WIDTH, SAFE_ZONE_HEIGHT)
}

#[derive(Debug)]
struct Escapee {
    id: String,
    controller: Controller,
    position: Vec2,
    caught: bool,
    safe: bool,
    slowed_until: u64,
    slick_ready_at: u64,
}

impl Escapee {
    fn in_play(&self) -> bool {
        !self.caught && !self.safe
    }
}

#[derive(Debug)]
struct Pursuer {
    id: String,
    position: Vec2,
    speed: f64,
    slowed_until: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OilSlick {
    pub id: String,
    pub position: Vec2,
    pub radius: f64,
    /// Escapee id of the placer
    pub placed_by: String,
    #[serde(skip)]
    expires_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscapeeView {
    pub id: String,
    pub display_name: DisplayName,
    pub vote: Vote,
    pub position: Vec2,
    pub caught: bool,
    pub safe: bool,
    pub slowed: bool,
    pub slick_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PursuerView {
    pub id: String,
    pub position: Vec2,
    pub slowed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaseSnapshot {
    pub escapees: Vec<EscapeeView>,
    pub pursuers: Vec<PursuerView>,
    pub slicks: Vec<OilSlick>,
    pub buildings: Vec<Rect>,
    pub safe_zone: Rect,
    pub countdown: u32,
}

pub struct ChaseEvasion {
    escapees: Vec<Escapee>,
    pursuers: Vec<Pursuer>,
    slicks: Vec<OilSlick>,
    /// Ticks since the countdown ended
    elapsed: u64,
    slicks_dropped: u64,
    first_safe: Option<Winner>,
    countdown: Countdown,
}

impl ChaseEvasion {
    pub fn new(controllers: Vec<Controller>, seed: u64) -> Self {
        let escapee_count = controllers.len();
        let escapees = controllers
            .into_iter()
            .enumerate()
            .map(|(i, controller)| Escapee {
                id: controller.vote.to_string(),
                position: Vec2::new(50.0 + 30.0 * i as f64, FIELD_HEIGHT / 2.0),
                controller,
                caught: false,
                safe: false,
                slowed_until: 0,
                slick_ready_at: 0,
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let pursuers = (0..(escapee_count * PURSUERS_PER_ESCAPEE).max(1))
            .map(|i| Pursuer {
                id: format!("pursuer-{}", i),
                position: spawn_point(&mut rng, escapee_count),
                speed: PURSUER_SPEED * rng.random_range(0.8..1.2),
                slowed_until: 0,
            })
            .collect();

        Self {
            escapees,
            pursuers,
            slicks: Vec::new(),
            elapsed: 0,
            slicks_dropped: 0,
            first_safe: None,
            countdown: Countdown::seconds(COUNTDOWN_SECONDS),
        }
    }

    fn slowed(&self, until: u64) -> bool {
        self.elapsed < until
    }

    fn move_escapees(&mut self, input: &mut InputBuffer) {
        for i in 0..self.escapees.len() {
            if !self.escapees[i].in_play() {
                continue;
            }
            let conn = self.escapees[i].controller.connection_id.clone();
            let held = input.held(&conn);
            let speed = if self.slowed(self.escapees[i].slowed_until) {
                ESCAPEE_SPEED * SLOW_FACTOR
            } else {
                ESCAPEE_SPEED
            };

            let escapee = &mut self.escapees[i];
            let delta = held.direction().normalized() * speed;
            escapee.position = slide_move(escapee.position, delta, ESCAPEE_RADIUS, &BUILDINGS, FIELD);

            if input.take_drop(&conn) {
                self.drop_slick(i);
            }
        }
    }

    fn drop_slick(&mut self, index: usize) {
        let escapee = &self.escapees[index];
        let active = self
            .slicks
            .iter()
            .filter(|s| s.placed_by == escapee.id)
            .count();
        if self.elapsed < escapee.slick_ready_at || active >= MAX_SLICKS_PER_ESCAPEE {
            return;
        }

        self.slicks_dropped += 1;
        let slick = OilSlick {
            id: format!("slick-{}-{}", escapee.id, self.slicks_dropped),
            position: escapee.position,
            radius: SLICK_RADIUS,
            placed_by: escapee.id.clone(),
            expires_at: self.elapsed + seconds_to_ticks(SLICK_LIFETIME_SECONDS),
        };
        self.slicks.push(slick);
        self.escapees[index].slick_ready_at =
            self.elapsed + seconds_to_ticks(SLICK_COOLDOWN_SECONDS);
    }

    fn nearest_in_play(&self, from: Vec2) -> Option<Vec2> {
        self.escapees
            .iter()
            .filter(|e| e.in_play())
            .map(|e| e.position)
            .min_by(|a, b| a.distance_sq(from).total_cmp(&b.distance_sq(from)))
    }

    fn move_pursuers(&mut self) {
        for i in 0..self.pursuers.len() {
            let pursuer = &self.pursuers[i];
            let Some(target) = self.nearest_in_play(pursuer.position) else {
                return;
            };
            let speed = if self.slowed(pursuer.slowed_until) {
                pursuer.speed * SLOW_FACTOR
            } else {
                pursuer.speed
            };
            let next = chase_step(pursuer.position, target, speed);
            self.pursuers[i].position = next;
        }
    }

    /// Catches, slicks and the safe zone, in that order
    fn resolve_contacts(&mut self) {
        let slow_until = self.elapsed + seconds_to_ticks(SLOW_SECONDS);
        let zone = safe_zone();

        for escapee in self.escapees.iter_mut().filter(|e| e.in_play()) {
            if self.pursuers.iter().any(|p| {
                circles_overlap(escapee.position, ESCAPEE_RADIUS, p.position, PURSUER_RADIUS)
            }) {
                escapee.caught = true;
                tracing::debug!("Escapee {} caught", escapee.id);
                continue;
            }

            if self.slicks.iter().any(|s| {
                s.placed_by != escapee.id
                    && circles_overlap(escapee.position, ESCAPEE_RADIUS, s.position, s.radius)
            }) {
                escapee.slowed_until = slow_until;
            }

            if zone.contains(escapee.position) {
                escapee.safe = true;
                tracing::debug!("Escapee {} reached safety", escapee.id);
                if self.first_safe.is_none() {
                    self.first_safe = Some(Winner::from(&escapee.controller));
                }
            }
        }

        for pursuer in &mut self.pursuers {
            if self
                .slicks
                .iter()
                .any(|s| circles_overlap(pursuer.position, PURSUER_RADIUS, s.position, s.radius))
            {
                pursuer.slowed_until = slow_until;
            }
        }
    }
}

/// Head straight for the target; when a building blocks most of that move,
/// skirt along its face instead
fn chase_step(from: Vec2, target: Vec2, speed: f64) -> Vec2 {
    let heading = (target - from).normalized();
    let min_progress = (speed * 0.25).powi(2);
    let step = |dir: Vec2| slide_move(from, dir * speed, PURSUER_RADIUS, &BUILDINGS, FIELD);

    let direct = step(heading);
    if direct.distance_sq(from) >= min_progress {
        return direct;
    }
    [heading.perpendicular(), heading.perpendicular() * -1.0]
        .into_iter()
        .map(step)
        .find(|p| p.distance_sq(from) >= min_progress)
        .unwrap_or(direct)
}

/// Random pursuer spawn away from the start line, the safe-zone approach and
/// the buildings. Falls back to the top middle of the field.
fn spawn_point(rng: &mut StdRng, escapee_count: usize) -> Vec2 {
    let start_zone_max_x = 50.0 + escapee_count as f64 * 30.0 + 50.0;
    let approach_min_x = SAFE_ZONE_CENTER.x - SAFE_ZONE_WIDTH - 50.0;
    let mid_y = FIELD_HEIGHT / 2.0;

    for _ in 0..SPAWN_ATTEMPTS {
        let p = Vec2::new(
            rng.random_range(PURSUER_RADIUS..FIELD_WIDTH - PURSUER_RADIUS),
            rng.random_range(PURSUER_RADIUS..FIELD_HEIGHT - PURSUER_RADIUS),
        );
        let in_start_zone = p.x < start_zone_max_x && (p.y - mid_y).abs() < 100.0;
        let in_approach =
            p.x > approach_min_x && (p.y - SAFE_ZONE_CENTER.y).abs() < SAFE_ZONE_HEIGHT + 50.0;
        let in_building = BUILDINGS.iter().any(|b| b.overlaps_circle(p, PURSUER_RADIUS));
        if !in_start_zone && !in_approach && !in_building {
            return p;
        }
    }
    Vec2::new(FIELD_WIDTH / 2.0, PURSUER_RADIUS * 2.0)
}

impl TickSimulation for ChaseEvasion {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::ChaseEvasion
    }

    fn entity_for(&self, connection_id: &str) -> Option<&str> {
        self.escapees
            .iter()
            .find(|e| e.controller.connection_id == connection_id)
            .map(|e| e.id.as_str())
    }

    fn tick(&mut self, input: &mut InputBuffer) -> TickStatus {
        if self.escapees.is_empty() {
            return TickStatus::Finished(self.first_safe.clone());
        }
        if self.countdown.consume() {
            return TickStatus::Running;
        }

        self.elapsed += 1;
        let now = self.elapsed;
        self.slicks.retain(|s| s.expires_at > now);

        self.move_escapees(input);
        self.move_pursuers();
        self.resolve_contacts();

        if self.escapees.iter().any(Escapee::in_play) {
            TickStatus::Running
        } else {
            TickStatus::Finished(self.first_safe.clone())
        }
    }

    fn snapshot(&self) -> MiniGameSnapshot {
        MiniGameSnapshot::ChaseEvasion(ChaseSnapshot {
            escapees: self
                .escapees
                .iter()
                .map(|e| EscapeeView {
                    id: e.id.clone(),
                    display_name: e.controller.display_name.clone(),
                    vote: e.controller.vote,
                    position: e.position,
                    caught: e.caught,
                    safe: e.safe,
                    slowed: self.slowed(e.slowed_until),
                    slick_ready: self.elapsed >= e.slick_ready_at,
                })
                .collect(),
            pursuers: self
                .pursuers
                .iter()
                .map(|p| PursuerView {
                    id: p.id.clone(),
                    position: p.position,
                    slowed: self.slowed(p.slowed_until),
                })
                .collect(),
            slicks: self.slicks.clone(),
            buildings: BUILDINGS.to_vec(),
            safe_zone: safe_zone(),
            countdown: self.countdown.whole_seconds(),
        })
    }

    fn countdown_seconds(&self) -> u32 {
        self.countdown.whole_seconds()
    }

    fn remove_controller(&mut self, connection_id: &str) -> ControllerLoss {
        let before = self.escapees.len();
        self.escapees
            .retain(|e| e.controller.connection_id != connection_id);
        if self.escapees.len() < before {
            ControllerLoss::EntityRemoved
        } else {
            ControllerLoss::Unaffected
        }
    }
}
