//! Simulated bus for tests
//!
//! [`SimPin`] keeps a virtual microsecond clock advanced only by delays, and
//! records every direction change, level write and sample. Whatever sits on
//! the other end of the line sees the low pulses the master produces and
//! answers samples.

use crate::{
    error::PinError,
    pin::{Direction, Level, Pin},
};
use std::{
    collections::VecDeque,
    io::{self, ErrorKind},
};

// A device samples a written bit, and drives a read bit, 15 µs into the slot.
const SAMPLE_WINDOW_US: u64 = 15;
const RESET_US: u64 = 480;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Event {
    Direction(Direction),
    Level(Level),
    Read(Level),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Pulse {
    pub(crate) start: u64,
    pub(crate) duration: u64,
}

pub(crate) struct SimPin {
    now: u64,
    direction: Direction,
    level: Level,
    low_since: Option<u64>,
    events: Vec<(u64, Event)>,
    pulses: Vec<Pulse>,
    fail_after: Option<usize>,
    device: Device,
}

impl SimPin {
    fn new(device: Device) -> Self {
        Self {
            now: 0,
            direction: Direction::Input,
            level: Level::High,
            low_since: None,
            events: Vec::new(),
            pulses: Vec::new(),
            fail_after: None,
            device,
        }
    }

    /// Nothing on the line, the pull-up keeps it high.
    pub(crate) fn absent() -> Self {
        Self::new(Device::Absent)
    }

    /// Stores written bits and replays them once [`SimPin::replay`] is called.
    pub(crate) fn loopback() -> Self {
        Self::new(Device::Loopback {
            bits: VecDeque::new(),
            replay: false,
        })
    }

    pub(crate) fn ds18b20(scratchpad: [u8; 9]) -> Self {
        Self::new(Device::Ds18b20(Ds18b20::new(scratchpad)))
    }

    pub(crate) fn replay(&mut self) {
        if let Device::Loopback { replay, .. } = &mut self.device {
            *replay = true;
        }
    }

    /// Every pin operation after the first `operations` fails, as when the
    /// line is unexported under our feet.
    pub(crate) fn fail_after(&mut self, operations: usize) {
        self.fail_after = Some(operations);
    }

    pub(crate) fn device_mut(&mut self) -> &mut Ds18b20 {
        match &mut self.device {
            Device::Ds18b20(device) => device,
            _ => panic!("not a simulated DS18B20"),
        }
    }

    pub(crate) fn device(&self) -> &Ds18b20 {
        match &self.device {
            Device::Ds18b20(device) => device,
            _ => panic!("not a simulated DS18B20"),
        }
    }

    pub(crate) fn now(&self) -> u64 {
        self.now
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.iter().map(|&(_, event)| event).collect()
    }

    pub(crate) fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    fn available(&self) -> Result<(), PinError> {
        match self.fail_after {
            Some(operations) if self.events.len() >= operations => Err(PinError::Io(
                io::Error::new(ErrorKind::NotFound, "gpio unexported"),
            )),
            _ => Ok(()),
        }
    }

    fn driven_low(&self) -> bool {
        self.direction == Direction::Output && self.level == Level::Low
    }

    fn update(&mut self) {
        match (self.low_since, self.driven_low()) {
            (None, true) => self.low_since = Some(self.now),
            (Some(start), false) => {
                self.low_since = None;
                let pulse = Pulse {
                    start,
                    duration: self.now - start,
                };
                self.pulses.push(pulse);
                self.device.pulse(pulse);
            }
            _ => {}
        }
    }
}

impl Pin for SimPin {
    fn set_direction(&mut self, direction: Direction) -> Result<(), PinError> {
        self.available()?;
        self.events.push((self.now, Event::Direction(direction)));
        self.direction = direction;
        self.update();
        Ok(())
    }

    fn write_level(&mut self, level: Level) -> Result<(), PinError> {
        self.available()?;
        self.events.push((self.now, Event::Level(level)));
        self.level = level;
        self.update();
        Ok(())
    }

    fn read_level(&mut self) -> Result<Level, PinError> {
        self.available()?;
        let level = if self.driven_low() {
            Level::Low
        } else {
            let since = self.pulses.last().map_or(u64::MAX, |pulse| self.now - pulse.start);
            self.device.sample(since)
        };
        self.events.push((self.now, Event::Read(level)));
        Ok(level)
    }

    fn delay_us(&mut self, us: u32) {
        self.now += us as u64;
    }
}

enum Device {
    Absent,
    Loopback { bits: VecDeque<bool>, replay: bool },
    Ds18b20(Ds18b20),
}

impl Device {
    fn pulse(&mut self, pulse: Pulse) {
        match self {
            Device::Absent => {}
            Device::Loopback { bits, replay } => {
                if !*replay {
                    bits.push_back(pulse.duration < SAMPLE_WINDOW_US);
                }
            }
            Device::Ds18b20(device) => device.pulse(pulse),
        }
    }

    /// `since` is the time elapsed from the start of the last low pulse.
    fn sample(&mut self, since: u64) -> Level {
        match self {
            Device::Absent => Level::High,
            Device::Loopback { bits, .. } => bits.pop_front().map_or(Level::High, Level::from),
            Device::Ds18b20(device) => device.sample(since),
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Presence(bool),
    Receive { byte: u8, bits: u32 },
    Converting,
    Transmit(VecDeque<bool>),
}

/// A DS18B20 answering Skip ROM, Convert T and Read Scratchpad
#[derive(Debug)]
pub(crate) struct Ds18b20 {
    scratchpad: [u8; 9],
    presence: VecDeque<bool>,
    busy_polls: u32,
    state: State,
    commands: Vec<u8>,
    polls: u32,
}

impl Ds18b20 {
    fn new(scratchpad: [u8; 9]) -> Self {
        Self {
            scratchpad,
            presence: VecDeque::new(),
            busy_polls: 0,
            state: State::Idle,
            commands: Vec::new(),
            polls: 0,
        }
    }

    /// Presence answers for the next resets, present once exhausted.
    pub(crate) fn presence(&mut self, presence: impl IntoIterator<Item = bool>) -> &mut Self {
        self.presence = presence.into_iter().collect();
        self
    }

    /// Number of conversion polls answered with 0 before the 1.
    pub(crate) fn busy_polls(&mut self, busy_polls: u32) -> &mut Self {
        self.busy_polls = busy_polls;
        self
    }

    pub(crate) fn commands(&self) -> &[u8] {
        &self.commands
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls
    }

    fn pulse(&mut self, pulse: Pulse) {
        if pulse.duration >= RESET_US {
            let present = self.presence.pop_front().unwrap_or(true);
            self.state = State::Presence(present);
            return;
        }
        if let State::Receive { byte, bits } = &mut self.state {
            if pulse.duration < SAMPLE_WINDOW_US {
                *byte |= 1 << *bits;
            }
            *bits += 1;
            if *bits == u8::BITS {
                let command = *byte;
                self.commands.push(command);
                self.state = match command {
                    0x44 => State::Converting,
                    0xBE => State::Transmit(
                        self.scratchpad
                            .iter()
                            .copied()
                            .flat_map(|byte| (0..u8::BITS).map(move |index| byte >> index & 1 != 0))
                            .collect(),
                    ),
                    _ => State::Receive { byte: 0, bits: 0 },
                };
            }
        }
    }

    fn sample(&mut self, since: u64) -> Level {
        match &mut self.state {
            State::Presence(present) => {
                let present = *present;
                self.state = if present {
                    State::Receive { byte: 0, bits: 0 }
                } else {
                    State::Idle
                };
                Level::from(!present)
            }
            State::Converting => {
                self.polls += 1;
                if self.polls > self.busy_polls {
                    Level::High
                } else {
                    Level::Low
                }
            }
            State::Transmit(bits) => {
                let bit = bits.pop_front().unwrap_or(true);
                // Past the window the device has let go of the line.
                Level::from(bit || since > SAMPLE_WINDOW_US)
            }
            State::Idle | State::Receive { .. } => Level::High,
        }
    }
}
