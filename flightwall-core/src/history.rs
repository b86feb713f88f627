//! Bounded telemetry history for the selected entity.
//!
//! A [`HistoryBuffer`] holds one fixed-capacity window per channel. Channels
//! stay index-aligned: a push appends to every channel (absent values as
//! `None`) and eviction drops the oldest entry from every channel at once.
//!
//! [`TrackedHistory`] ties a buffer to the current selection and tags
//! outgoing history requests so a response for an old selection can be
//! recognized and discarded.

use std::collections::VecDeque;

use crate::model::HistorySample;
use crate::types::Icao24;

/// Default number of samples kept per channel.
pub const DEFAULT_CAPACITY: usize = 30;

/// One named telemetry series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Altitude,
    Speed,
    Heading,
    VerticalRate,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Altitude,
        Channel::Speed,
        Channel::Heading,
        Channel::VerticalRate,
    ];

    fn index(self) -> usize {
        match self {
            Channel::Altitude => 0,
            Channel::Speed => 1,
            Channel::Heading => 2,
            Channel::VerticalRate => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Altitude => "altitude",
            Channel::Speed => "speed",
            Channel::Heading => "heading",
            Channel::VerticalRate => "vertical_rate",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Channel::Altitude => "Altitude",
            Channel::Speed => "Ground speed",
            Channel::Heading => "Heading",
            Channel::VerticalRate => "Vertical rate",
        }
    }

    fn read(self, sample: &HistorySample) -> Option<f64> {
        match self {
            Channel::Altitude => sample.altitude_ft,
            Channel::Speed => sample.speed_kts,
            Channel::Heading => sample.heading,
            Channel::VerticalRate => sample.vertical_rate_fpm,
        }
        .filter(|v| v.is_finite())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "altitude" | "alt" => Ok(Channel::Altitude),
            "speed" | "groundspeed" | "spd" => Ok(Channel::Speed),
            "heading" | "hdg" => Ok(Channel::Heading),
            "vertical_rate" | "vrate" | "vs" => Ok(Channel::VerticalRate),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity, index-aligned sliding windows, one per channel.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    timestamps: VecDeque<f64>,
    channels: [VecDeque<Option<f64>>; 4],
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryBuffer {
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
            channels: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of observation events held (equal for every channel).
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append one observation across all channels, evicting the oldest at capacity.
    pub fn push(&mut self, sample: &HistorySample) {
        if self.timestamps.len() == self.capacity {
            self.timestamps.pop_front();
            for ch in &mut self.channels {
                ch.pop_front();
            }
        }
        self.timestamps.push_back(sample.timestamp);
        for channel in Channel::ALL {
            self.channels[channel.index()].push_back(channel.read(sample));
        }
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
        for ch in &mut self.channels {
            ch.clear();
        }
    }

    /// Read-only view of one channel, absent samples included.
    pub fn channel(&self, channel: Channel) -> &VecDeque<Option<f64>> {
        &self.channels[channel.index()]
    }

    pub fn timestamps(&self) -> &VecDeque<f64> {
        &self.timestamps
    }

    /// Copy of one channel; slot `i` lines up with `timestamps()[i]`.
    pub fn slots(&self, channel: Channel) -> Vec<Option<f64>> {
        self.channel(channel).iter().copied().collect()
    }

    /// Most recent present value of a channel.
    pub fn latest(&self, channel: Channel) -> Option<f64> {
        self.channel(channel).iter().rev().find_map(|v| *v)
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        HistoryBuffer::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Selection-bound history
// ---------------------------------------------------------------------------

/// Identifies the selection a history request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTag {
    pub icao24: Icao24,
    generation: u64,
}

/// Result of offering history data to a [`TrackedHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Samples were accepted; the value is how many were pushed.
    Accepted(usize),
    /// The data belongs to a selection that is no longer current.
    Stale,
}

/// History buffer bound to at most one selected identifier.
#[derive(Debug, Clone, Default)]
pub struct TrackedHistory {
    selected: Option<Icao24>,
    generation: u64,
    /// Bumped whenever the buffer contents change.
    revision: u64,
    buffer: HistoryBuffer,
}

impl TrackedHistory {
    pub fn new(capacity: usize) -> Self {
        TrackedHistory {
            selected: None,
            generation: 0,
            revision: 0,
            buffer: HistoryBuffer::new(capacity),
        }
    }

    pub fn selected(&self) -> Option<Icao24> {
        self.selected
    }

    pub fn buffer(&self) -> &HistoryBuffer {
        &self.buffer
    }

    /// Changes on every accepted load or push and on selection changes, even
    /// when the buffer length stays the same.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Change the selection. Any change clears the buffer and invalidates
    /// outstanding tags; re-selecting the current identifier is a no-op.
    ///
    /// Returns a tag for the new selection if one is active.
    pub fn select(&mut self, icao24: Option<Icao24>) -> Option<RequestTag> {
        if icao24 != self.selected {
            self.selected = icao24;
            self.generation += 1;
            self.revision += 1;
            self.buffer.clear();
        }
        self.tag()
    }

    /// Tag for a request issued now, or `None` when nothing is selected.
    pub fn tag(&self) -> Option<RequestTag> {
        self.selected.map(|icao24| RequestTag {
            icao24,
            generation: self.generation,
        })
    }

    fn is_current(&self, tag: &RequestTag) -> bool {
        self.selected == Some(tag.icao24) && self.generation == tag.generation
    }

    /// Replace the buffer with fetched history, if the tag is still current.
    pub fn load(&mut self, tag: RequestTag, samples: &[HistorySample]) -> Applied {
        if !self.is_current(&tag) {
            return Applied::Stale;
        }
        self.buffer.clear();
        for s in samples {
            self.buffer.push(s);
        }
        self.revision += 1;
        Applied::Accepted(samples.len())
    }

    /// Append a live sample for `icao24` if it is the current selection.
    pub fn push_live(&mut self, icao24: Icao24, sample: &HistorySample) -> Applied {
        if self.selected != Some(icao24) {
            return Applied::Stale;
        }
        self.buffer.push(sample);
        self.revision += 1;
        Applied::Accepted(1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> HistorySample {
        HistorySample {
            timestamp: i as f64,
            altitude_ft: Some(1000.0 + i as f64),
            speed_kts: if i % 2 == 0 { Some(200.0) } else { None },
            heading: Some(90.0),
            vertical_rate_fpm: None,
            position: None,
        }
    }

    fn icao(v: u32) -> Icao24 {
        Icao24::new(v).unwrap()
    }

    #[test]
    fn test_buffer_bound_keeps_most_recent() {
        let mut buf = HistoryBuffer::new(30);
        for i in 0..45 {
            buf.push(&sample(i));
        }
        assert_eq!(buf.len(), 30);
        for ch in Channel::ALL {
            assert_eq!(buf.channel(ch).len(), 30);
        }
        let alts = buf.slots(Channel::Altitude);
        let expected: Vec<_> = (15..45).map(|i| Some(1000.0 + i as f64)).collect();
        assert_eq!(alts, expected);
        assert_eq!(buf.timestamps().front(), Some(&15.0));
    }

    #[test]
    fn test_synchronized_eviction() {
        let mut buf = HistoryBuffer::new(3);
        for i in 0..7 {
            buf.push(&sample(i));
            let lens: Vec<usize> = Channel::ALL.iter().map(|c| buf.channel(*c).len()).collect();
            assert!(lens.iter().all(|l| *l == buf.len()));
        }
        // absent values hold their slot so indices stay aligned
        assert_eq!(
            buf.channel(Channel::Speed).iter().copied().collect::<Vec<_>>(),
            vec![Some(200.0), None, Some(200.0)]
        );
        assert_eq!(buf.channel(Channel::VerticalRate).len(), 3);
        assert!(buf.slots(Channel::VerticalRate).iter().all(Option::is_none));
    }

    #[test]
    fn test_latest_skips_absent() {
        let mut buf = HistoryBuffer::new(5);
        buf.push(&sample(0));
        buf.push(&sample(1));
        assert_eq!(buf.latest(Channel::Speed), Some(200.0));
        assert_eq!(buf.latest(Channel::VerticalRate), None);
    }

    #[test]
    fn test_non_finite_reads_absent() {
        let mut buf = HistoryBuffer::new(5);
        let mut s = sample(0);
        s.altitude_ft = Some(f64::NAN);
        buf.push(&s);
        assert_eq!(buf.channel(Channel::Altitude)[0], None);
    }

    #[test]
    fn test_selection_switch_clears() {
        let mut hist = TrackedHistory::new(30);
        hist.select(Some(icao(1)));
        hist.push_live(icao(1), &sample(0));
        hist.push_live(icao(1), &sample(1));
        assert_eq!(hist.buffer().len(), 2);

        hist.select(Some(icao(2)));
        assert!(hist.buffer().is_empty());

        hist.push_live(icao(2), &sample(2));
        hist.select(None);
        assert!(hist.buffer().is_empty());
        assert!(hist.tag().is_none());
    }

    #[test]
    fn test_reselect_same_keeps_buffer() {
        let mut hist = TrackedHistory::new(30);
        let first = hist.select(Some(icao(1))).unwrap();
        hist.push_live(icao(1), &sample(0));
        let again = hist.select(Some(icao(1))).unwrap();
        assert_eq!(first, again);
        assert_eq!(hist.buffer().len(), 1);
    }

    #[test]
    fn test_stale_response_guard() {
        let mut hist = TrackedHistory::new(30);
        let tag_x = hist.select(Some(icao(0xA))).unwrap();
        hist.select(Some(icao(0xB)));

        let late = vec![sample(0), sample(1)];
        assert_eq!(hist.load(tag_x, &late), Applied::Stale);
        assert!(hist.buffer().is_empty());

        let tag_y = hist.tag().unwrap();
        assert_eq!(hist.load(tag_y, &late), Applied::Accepted(2));
        assert_eq!(hist.buffer().len(), 2);
    }

    #[test]
    fn test_stale_after_reselecting_same_id() {
        // X -> Y -> X: a response issued for the first X selection is still stale
        let mut hist = TrackedHistory::new(30);
        let old = hist.select(Some(icao(0xA))).unwrap();
        hist.select(Some(icao(0xB)));
        hist.select(Some(icao(0xA)));
        assert_eq!(hist.load(old, &[sample(0)]), Applied::Stale);
    }

    #[test]
    fn test_live_push_for_other_entity_ignored() {
        let mut hist = TrackedHistory::new(30);
        hist.select(Some(icao(1)));
        assert_eq!(hist.push_live(icao(2), &sample(0)), Applied::Stale);
        assert!(hist.buffer().is_empty());
    }

    #[test]
    fn test_load_replaces_and_bounds() {
        let mut hist = TrackedHistory::new(5);
        let tag = hist.select(Some(icao(1))).unwrap();
        hist.push_live(icao(1), &sample(100));
        let fetched: Vec<_> = (0..8).map(sample).collect();
        hist.load(tag, &fetched);
        assert_eq!(hist.buffer().len(), 5);
        assert_eq!(hist.buffer().timestamps().front(), Some(&3.0));
    }

    #[test]
    fn test_revision_moves_when_full_window_replaced() {
        let mut hist = TrackedHistory::new(5);
        let tag = hist.select(Some(icao(1))).unwrap();
        let first: Vec<_> = (0..5).map(sample).collect();
        let second: Vec<_> = (5..10).map(sample).collect();

        hist.load(tag, &first);
        let before = hist.revision();
        hist.load(tag, &second);
        assert_eq!(hist.buffer().len(), 5);
        assert_ne!(hist.revision(), before);

        let before = hist.revision();
        hist.push_live(icao(2), &sample(11));
        assert_eq!(hist.revision(), before);
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("alt".parse::<Channel>().unwrap(), Channel::Altitude);
        assert_eq!("vs".parse::<Channel>().unwrap(), Channel::VerticalRate);
        assert!("fuel".parse::<Channel>().is_err());
    }
}
