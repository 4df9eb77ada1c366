//! Presentation model of the panel.
//!
//! Everything a front-end needs to draw: connection status, which controls
//! are enabled, the two sensor cards, the config input fields and which
//! plants are currently being watered.

use std::collections::HashMap;

use irrigation_protocol::{ConfigUpdate, SensorId, SensorUpdate, StatusClass};
use tokio::time::Instant;

/// One soil sensor card
#[derive(Clone, Debug, PartialEq)]
pub struct SensorCard {
    pub value: String,
    pub status: String,
    pub humidity_percent: f64,
    pub class: StatusClass,
}

impl SensorCard {
    /// What a card shows with no device attached
    pub fn disconnected() -> Self {
        Self {
            value: "--".to_string(),
            status: "Disconnected".to_string(),
            humidity_percent: 0.0,
            class: StatusClass::Primary,
        }
    }

    fn apply(&mut self, update: &SensorUpdate) {
        self.value.clone_from(&update.value);
        self.status.clone_from(&update.status);
        self.humidity_percent = update.humidity_percent;
        self.class = update.class;
    }
}

/// Editable config inputs. They mirror what the device last reported and
/// what the user last typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFields {
    pub dry_limit: String,
    pub wet_limit: String,
    pub read_interval: String,
}

impl ConfigFields {
    fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(value) = &update.dry_limit {
            self.dry_limit.clone_from(value);
        }
        if let Some(value) = &update.wet_limit {
            self.wet_limit.clone_from(value);
        }
        if let Some(value) = &update.read_interval {
            self.read_interval.clone_from(value);
        }
    }
}

#[derive(Clone, Debug)]
pub struct PanelState {
    pub connected: bool,
    /// False when the platform has no serial support
    pub connect_enabled: bool,
    /// Test, reset, irrigate and the command input
    pub controls_enabled: bool,
    pub sensor1: SensorCard,
    pub sensor2: SensorCard,
    pub config: ConfigFields,
    irrigating: HashMap<SensorId, Instant>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelState {
    pub fn new() -> Self {
        Self {
            connected: false,
            connect_enabled: true,
            controls_enabled: false,
            sensor1: SensorCard::disconnected(),
            sensor2: SensorCard::disconnected(),
            config: ConfigFields::default(),
            irrigating: HashMap::new(),
        }
    }

    pub fn sensor(&self, id: SensorId) -> &SensorCard {
        match id {
            SensorId::One => &self.sensor1,
            SensorId::Two => &self.sensor2,
        }
    }

    fn sensor_mut(&mut self, id: SensorId) -> &mut SensorCard {
        match id {
            SensorId::One => &mut self.sensor1,
            SensorId::Two => &mut self.sensor2,
        }
    }

    pub fn apply_sensor(&mut self, update: &SensorUpdate) {
        self.sensor_mut(update.sensor).apply(update);
    }

    pub fn apply_config(&mut self, update: &ConfigUpdate) {
        self.config.apply(update);
    }

    pub fn set_connected(&mut self) {
        self.connected = true;
        self.controls_enabled = true;
    }

    /// Back to the idle look: controls off, cards cleared, no watering
    pub fn set_disconnected(&mut self) {
        self.connected = false;
        self.controls_enabled = false;
        self.sensor1 = SensorCard::disconnected();
        self.sensor2 = SensorCard::disconnected();
        self.irrigating.clear();
    }

    pub fn is_irrigating(&self, id: SensorId) -> bool {
        self.irrigating.contains_key(&id)
    }

    pub fn can_irrigate(&self, id: SensorId) -> bool {
        self.controls_enabled && !self.is_irrigating(id)
    }

    pub(crate) fn start_irrigation(&mut self, id: SensorId, until: Instant) {
        self.irrigating.insert(id, until);
    }

    /// Release plants whose watering time is over. Returns the released ones.
    pub(crate) fn expire_irrigation(&mut self, now: Instant) -> Vec<SensorId> {
        let mut done: Vec<_> = self
            .irrigating
            .iter()
            .filter(|(_, until)| **until <= now)
            .map(|(id, _)| *id)
            .collect();
        done.sort_by_key(|id| id.number());
        for id in &done {
            self.irrigating.remove(id);
        }
        done
    }
}
