use crate::remote::broker::Broker;
use crate::simulation::engine::FeederEngine;
use crossterm::event::KeyCode;
use std::time::Duration;

const MAX_INPUT_DIGITS: usize = 9;
const MIN_SPEED: f64 = 0.25;
const MAX_SPEED: f64 = 64.0;

/// Digits typed for the next order.
#[derive(Debug, Default, PartialEq)]
pub struct OrderInput {
    digits: String,
}

impl OrderInput {
    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() && self.digits.len() < MAX_INPUT_DIGITS {
            self.digits.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    /// Hands over the typed payload and clears the buffer.
    pub fn take(&mut self) -> Option<String> {
        if self.digits.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.digits))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }
}

pub struct App {
    pub engine: FeederEngine,
    pub broker: Broker,
    pub running: bool,
    pub paused: bool,
    speed: f64,
    input: OrderInput,
    status: Option<String>,
    carry: Duration,
}

impl App {
    pub fn new(engine: FeederEngine, broker: Broker, speed: f64) -> Self {
        Self {
            engine,
            broker,
            running: true,
            paused: false,
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            input: OrderInput::default(),
            status: None,
            carry: Duration::ZERO,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn input(&self) -> &str {
        self.input.as_str()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Feeds real elapsed time into the simulation, one simulated second at a time.
    pub fn update(&mut self, elapsed: Duration) {
        if self.paused {
            return;
        }
        self.carry += elapsed.mul_f64(self.speed);
        while self.carry >= Duration::from_secs(1) {
            self.carry -= Duration::from_secs(1);
            self.engine.step();
        }
    }

    pub fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char(' ') => self.engine.step(),
            KeyCode::Char('p') => self.paused = !self.paused,
            KeyCode::Char('+') => self.speed = (self.speed * 2.0).min(MAX_SPEED),
            KeyCode::Char('-') => self.speed = (self.speed / 2.0).max(MIN_SPEED),
            KeyCode::Char('o') => {
                let offline = !self.broker.is_offline();
                self.broker.set_offline(offline);
                self.status = Some(if offline { "link down" } else { "link up" }.to_string());
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.input.push(c),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Enter => self.submit_order(),
            _ => {}
        }
    }

    fn submit_order(&mut self) {
        let Some(payload) = self.input.take() else {
            return;
        };
        self.status = Some(match self.engine.receive_order(&payload) {
            Ok(receipt) => format!("order of {} accepted", receipt.quantity),
            Err(e) => e.to_string(),
        });
    }
}

impl Drop for App {
    fn drop(&mut self) {
        ratatui::restore();
    }
}
