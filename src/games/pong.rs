//! Paddle duel: two vote groups, one paddle each, first to five points.

use super::geometry::Vec2;
use super::{
    ControllerLoss, Controller, Countdown, InputBuffer, MiniGameSnapshot, TickSimulation,
    TickStatus, Winner,
};
use crate::types::{DisplayName, MiniGameKind, Vote};
use serde::{Deserialize, Serialize};

pub const FIELD_WIDTH: f64 = 600.0;
pub const FIELD_HEIGHT: f64 = 400.0;
pub const PADDLE_WIDTH: f64 = 10.0;
pub const PADDLE_HEIGHT: f64 = 80.0;
/// Pixels per tick
pub const PADDLE_SPEED: f64 = 5.0;
pub const BALL_RADIUS: f64 = 7.0;
pub const SERVE_SPEED_X: f64 = 2.5;
pub const SERVE_SPEED_Y: f64 = 2.5;
pub const PADDLE_SPEEDUP: f64 = 1.05;
pub const WINNING_SCORE: u32 = 5;
pub const COUNTDOWN_SECONDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn entity_id(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Debug)]
struct Paddle {
    controller: Controller,
    /// Top edge
    y: f64,
    score: u32,
}

impl Paddle {
    fn new(controller: Controller) -> Self {
        Self {
            controller,
            y: (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0,
            score: 0,
        }
    }

    fn steer(&mut self, input: &InputBuffer) {
        let held = input.held(&self.controller.connection_id);
        if held.up {
            self.y = (self.y - PADDLE_SPEED).max(0.0);
        }
        if held.down {
            self.y = (self.y + PADDLE_SPEED).min(FIELD_HEIGHT - PADDLE_HEIGHT);
        }
    }

    fn spans(&self, y: f64) -> bool {
        y > self.y && y < self.y + PADDLE_HEIGHT
    }

    fn view(&self) -> PaddleView {
        PaddleView {
            display_name: self.controller.display_name.clone(),
            vote: self.controller.vote,
            y: self.y,
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddleView {
    pub display_name: DisplayName,
    pub vote: Vote,
    pub y: f64,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddleDuelSnapshot {
    pub left: PaddleView,
    pub right: PaddleView,
    pub ball: BallView,
    pub countdown: u32,
}

pub struct PaddleDuel {
    left: Paddle,
    right: Paddle,
    ball: Vec2,
    velocity: Vec2,
    serves: u32,
    countdown: Countdown,
}

impl PaddleDuel {
    pub fn new(left: Controller, right: Controller) -> Self {
        Self {
            left: Paddle::new(left),
            right: Paddle::new(right),
            ball: Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0),
            velocity: Vec2::new(SERVE_SPEED_X, SERVE_SPEED_Y),
            serves: 0,
            countdown: Countdown::seconds(COUNTDOWN_SECONDS),
        }
    }

    /// Re-serve from the centre toward the trailing side's opponent
    fn serve(&mut self) {
        self.serves += 1;
        let dx = if self.left.score > self.right.score {
            -SERVE_SPEED_X
        } else {
            SERVE_SPEED_X
        };
        let dy = if self.serves % 2 == 0 {
            SERVE_SPEED_Y
        } else {
            -SERVE_SPEED_Y
        };
        self.ball = Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0);
        self.velocity = Vec2::new(dx, dy);
    }

    fn bounce_walls(&mut self) {
        if self.ball.y + BALL_RADIUS > FIELD_HEIGHT || self.ball.y - BALL_RADIUS < 0.0 {
            self.velocity.y = -self.velocity.y;
            self.ball.y = self.ball.y.clamp(BALL_RADIUS, FIELD_HEIGHT - BALL_RADIUS);
        }
    }

    /// Bounce off a paddle the ball touched or swept through since `prev`
    fn bounce_paddles(&mut self, prev: Vec2) {
        let ball = self.ball;
        if self.velocity.x < 0.0 {
            let face = PADDLE_WIDTH;
            let swept = face_crossing(prev, ball, -BALL_RADIUS, face)
                .is_some_and(|y| self.left.spans(y));
            let inside = ball.x - BALL_RADIUS < face
                && ball.x - BALL_RADIUS > 0.0
                && self.left.spans(ball.y);
            if swept || inside {
                self.velocity.x = -self.velocity.x * PADDLE_SPEEDUP;
                self.ball.x = face + BALL_RADIUS;
            }
        } else if self.velocity.x > 0.0 {
            let face = FIELD_WIDTH - PADDLE_WIDTH;
            let swept = face_crossing(prev, ball, BALL_RADIUS, face)
                .is_some_and(|y| self.right.spans(y));
            let inside = ball.x + BALL_RADIUS > face
                && ball.x + BALL_RADIUS < FIELD_WIDTH
                && self.right.spans(ball.y);
            if swept || inside {
                self.velocity.x = -self.velocity.x * PADDLE_SPEEDUP;
                self.ball.x = face - BALL_RADIUS;
            }
        }
    }

    /// Ball past a goal line scores for the other side
    fn score_point(&mut self) -> Option<Side> {
        if self.ball.x - BALL_RADIUS < 0.0 {
            self.right.score += 1;
            Some(Side::Right)
        } else if self.ball.x + BALL_RADIUS > FIELD_WIDTH {
            self.left.score += 1;
            Some(Side::Left)
        } else {
            None
        }
    }

    fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Ball `y` where its leading edge (`x + edge`) crossed `face` moving from
/// `prev` to `ball`, if it crossed this tick
fn face_crossing(prev: Vec2, ball: Vec2, edge: f64, face: f64) -> Option<f64> {
    let from = prev.x + edge - face;
    let to = ball.x + edge - face;
    if from == to || from * to > 0.0 {
        return None;
    }
    let t = from / (from - to);
    Some(prev.y + (ball.y - prev.y) * t)
}

impl TickSimulation for PaddleDuel {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::PaddleDuel
    }

    fn entity_for(&self, connection_id: &str) -> Option<&str> {
        [Side::Left, Side::Right]
            .into_iter()
            .find(|side| self.paddle(*side).controller.connection_id == connection_id)
            .map(|side| side.entity_id())
    }

    fn tick(&mut self, input: &mut InputBuffer) -> TickStatus {
        if self.countdown.consume() {
            return TickStatus::Running;
        }

        self.left.steer(input);
        self.right.steer(input);

        let prev = self.ball;
        self.ball = self.ball + self.velocity;
        self.bounce_walls();
        self.bounce_paddles(prev);

        if let Some(scorer) = self.score_point() {
            let paddle = self.paddle(scorer);
            if paddle.score >= WINNING_SCORE {
                return TickStatus::Finished(Some(Winner::from(&paddle.controller)));
            }
            self.serve();
        }
        TickStatus::Running
    }

    fn snapshot(&self) -> MiniGameSnapshot {
        MiniGameSnapshot::PaddleDuel(PaddleDuelSnapshot {
            left: self.left.view(),
            right: self.right.view(),
            ball: BallView {
                position: self.ball,
                velocity: self.velocity,
            },
            countdown: self.countdown.whole_seconds(),
        })
    }

    fn countdown_seconds(&self) -> u32 {
        self.countdown.whole_seconds()
    }

    fn remove_controller(&mut self, connection_id: &str) -> ControllerLoss {
        if self.entity_for(connection_id).is_some() {
            ControllerLoss::Abandon
        } else {
            ControllerLoss::Unaffected
        }
    }
}
