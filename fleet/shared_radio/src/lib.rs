#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Broadcast radio abstractions shared by field agents.
//!
//! Agents speak on numbered channels. Each channel has a per-tick payload
//! ceiling; whatever does not fit is cut off, and a configurable share of
//! transmissions is lost outright. Speech from tick `t` is heard at `t + 1`.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One payload spoken by one agent on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmission {
    /// Identifier of the speaking agent.
    pub sender: u32,
    /// Channel index.
    pub channel: u8,
    /// Tick at which the payload was spoken.
    pub tick: u32,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// Limits of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Maximum number of payload bytes accepted per tick, summed over speakers.
    pub bandwidth: usize,
    /// Probability in `[0, 1]` that a transmission is lost.
    #[serde(default)]
    pub loss: f64,
}

impl ChannelSpec {
    /// A channel that never drops anything.
    #[must_use]
    pub const fn reliable(bandwidth: usize) -> Self {
        Self {
            bandwidth,
            loss: 0.0,
        }
    }
}

/// Something that accepts outgoing speech.
pub trait RadioPublisher: Send + Sync {
    /// Queues a transmission for delivery.
    fn transmit(&self, transmission: Transmission) -> Result<()>;
}

/// Something that hands heard speech to a listener.
pub trait RadioSubscriber: Send + Sync {
    /// Returns what `listener` hears this tick on the given channels.
    ///
    /// A listener never hears itself.
    fn receive(&self, listener: u32, channels: &[u8]) -> Vec<Transmission>;
}

struct RadioState {
    outgoing: Vec<Transmission>,
    delivered: Vec<Transmission>,
    used: Vec<usize>,
    backlog: VecDeque<Transmission>,
    backlog_capacity: usize,
    rng: SmallRng,
}

/// In-memory radio for local simulation and tests.
#[derive(Clone)]
pub struct MemoryRadio {
    channels: Arc<Vec<ChannelSpec>>,
    state: Arc<Mutex<RadioState>>,
}

impl std::fmt::Debug for MemoryRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRadio")
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl MemoryRadio {
    /// Creates a radio with the given channels; `seed` drives loss decisions.
    #[must_use]
    pub fn new(channels: Vec<ChannelSpec>, seed: u64) -> Self {
        let used = vec![0; channels.len()];
        Self {
            channels: Arc::new(channels),
            state: Arc::new(Mutex::new(RadioState {
                outgoing: Vec::new(),
                delivered: Vec::new(),
                used,
                backlog: VecDeque::with_capacity(256),
                backlog_capacity: 256,
                rng: SmallRng::seed_from_u64(seed),
            })),
        }
    }

    /// Number of configured channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Closes the current tick: queued speech becomes audible, lost
    /// transmissions are discarded, and bandwidth counters reset.
    ///
    /// Returns the number of transmissions that survived.
    pub fn advance(&self) -> usize {
        let mut state = self.state.lock();
        let outgoing = std::mem::take(&mut state.outgoing);
        let mut delivered = Vec::with_capacity(outgoing.len());
        for transmission in outgoing {
            let loss = self.channels[usize::from(transmission.channel)]
                .loss
                .clamp(0.0, 1.0);
            if loss > 0.0 && state.rng.gen_bool(loss) {
                continue;
            }
            delivered.push(transmission);
        }
        for used in &mut state.used {
            *used = 0;
        }
        let count = delivered.len();
        for transmission in &delivered {
            if state.backlog.len() == state.backlog_capacity {
                state.backlog.pop_front();
            }
            state.backlog.push_back(transmission.clone());
        }
        state.delivered = delivered;
        count
    }

    /// Recently delivered transmissions, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Transmission> {
        self.state.lock().backlog.iter().cloned().collect()
    }
}

impl RadioPublisher for MemoryRadio {
    fn transmit(&self, mut transmission: Transmission) -> Result<()> {
        let Some(spec) = self.channels.get(usize::from(transmission.channel)) else {
            bail!("channel {} is not configured", transmission.channel);
        };
        let mut state = self.state.lock();
        let used = &mut state.used[usize::from(transmission.channel)];
        let remaining = spec.bandwidth.saturating_sub(*used);
        if remaining == 0 || transmission.payload.is_empty() {
            return Ok(());
        }
        transmission.payload.truncate(remaining);
        *used += transmission.payload.len();
        state.outgoing.push(transmission);
        Ok(())
    }
}

impl RadioSubscriber for MemoryRadio {
    fn receive(&self, listener: u32, channels: &[u8]) -> Vec<Transmission> {
        self.state
            .lock()
            .delivered
            .iter()
            .filter(|t| t.sender != listener && channels.contains(&t.channel))
            .cloned()
            .collect()
    }
}

/// Publisher that appends every transmission to a JSON-lines file.
#[derive(Debug, Clone)]
pub struct FileRadioRecorder {
    path: PathBuf,
}

impl FileRadioRecorder {
    /// Creates a recorder writing to the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Path of the recording.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RadioPublisher for FileRadioRecorder {
    fn transmit(&self, transmission: Transmission) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let data = serde_json::to_vec(&transmission)?;
        file.write_all(&data)?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn speech(sender: u32, channel: u8, payload: &[u8]) -> Transmission {
        Transmission {
            sender,
            channel,
            tick: 1,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn speech_is_heard_next_tick_by_others_only() {
        let radio = MemoryRadio::new(vec![ChannelSpec::reliable(64)], 7);
        radio.transmit(speech(1, 0, b"abc")).unwrap();
        assert!(radio.receive(2, &[0]).is_empty());

        assert_eq!(radio.advance(), 1);
        assert_eq!(radio.receive(2, &[0]).len(), 1);
        assert!(radio.receive(1, &[0]).is_empty());
        assert!(radio.receive(2, &[1]).is_empty());
    }

    #[test]
    fn bandwidth_truncates_late_speakers() {
        let radio = MemoryRadio::new(vec![ChannelSpec::reliable(5)], 7);
        radio.transmit(speech(1, 0, b"abc")).unwrap();
        radio.transmit(speech(2, 0, b"defg")).unwrap();
        radio.transmit(speech(3, 0, b"h")).unwrap();
        radio.advance();

        let heard = radio.receive(9, &[0]);
        assert_eq!(heard.len(), 2);
        assert_eq!(heard[1].payload, b"de".to_vec());
    }

    #[test]
    fn total_loss_drops_everything() {
        let radio = MemoryRadio::new(
            vec![ChannelSpec {
                bandwidth: 64,
                loss: 1.0,
            }],
            7,
        );
        radio.transmit(speech(1, 0, b"abc")).unwrap();
        assert_eq!(radio.advance(), 0);
        assert!(radio.receive(2, &[0]).is_empty());
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let radio = MemoryRadio::new(vec![ChannelSpec::reliable(8)], 7);
        assert!(radio.transmit(speech(1, 3, b"x")).is_err());
    }

    #[test]
    fn recorder_writes_transmissions() {
        let dir = tempdir().unwrap();
        let recorder = FileRadioRecorder::new(dir.path().join("radio.log")).unwrap();
        recorder.transmit(speech(4, 0, b"hi")).unwrap();
        let content = std::fs::read_to_string(recorder.path()).unwrap();
        assert!(content.contains("\"sender\":4"));
    }
}
