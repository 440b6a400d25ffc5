//! Shared decoder context: one entry point for `cc_data()` blocks, line-21
//! byte pairs and XDS pairs, with page snapshots and update events.

use std::time::Instant;

use cc_protocol::{decode_cc_data, CcType, Field, XdsCategory, FIRST_DTVCC_PAGE, LAST_CC_PAGE, LAST_DTVCC_PAGE};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::dtvcc::{render_service, DtvccDecoder};
use crate::eia608::{render_channel, Eia608Decoder};
use crate::error::Error;
use crate::event::DecoderEvent;
use crate::page::Page;
use crate::xds::{XdsDecoder, XdsSnapshot};

/// Default depth of the event channel.
const EVENT_CAPACITY: usize = 256;

/// Only this many NTSC pairs may precede the DTVCC data of one block.
const MAX_NTSC_PAIRS: usize = 3;

/// Decoder options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Korean double-width DTVCC: 84 column grids and 16-bit characters.
    pub double_width: bool,
    /// Upper-case EIA-608 text when the channel looks upper-case only.
    pub to_upper: bool,
    /// Events buffered per subscriber before it lags.
    pub event_capacity: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { double_width: false, to_upper: false, event_capacity: EVENT_CAPACITY }
    }
}

struct CaptionState {
    eia608: Eia608Decoder,
    dtvcc: DtvccDecoder,
    /// Capture time of the last line-21 pair.
    capture_time: Option<DateTime<Utc>>,
}

/// Closed caption decoder for one video stream.
///
/// Caption and XDS state sit behind separate locks so XDS readers never
/// wait for caption decoding. Events are sent after the locks are
/// released; a subscriber may call [`fetch_page`](Self::fetch_page) right
/// away and sees the state of that moment or a later one.
pub struct CaptionDecoder {
    config: DecoderConfig,
    state: Mutex<CaptionState>,
    xds: Mutex<XdsDecoder>,
    tx: broadcast::Sender<DecoderEvent>,
}

impl CaptionDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    /// Create a decoder whose flash clock starts at `epoch`.
    pub fn new_at(config: DecoderConfig, epoch: Instant) -> Self {
        let (tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            state: Mutex::new(CaptionState {
                eia608: Eia608Decoder::new(),
                dtvcc: DtvccDecoder::new(config.double_width, epoch),
                capture_time: None,
            }),
            xds: Mutex::new(XdsDecoder::new()),
            tx,
            config,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Subscribe to page updates, transcript lines and XDS updates.
    pub fn subscribe(&self) -> broadcast::Receiver<DecoderEvent> {
        self.tx.subscribe()
    }

    /// Decode one `cc_data()` block.
    pub fn decode(&self, pts: i64, buf: &[u8]) -> Result<(), Error> {
        self.decode_at(pts, buf, Instant::now())
    }

    pub fn decode_at(&self, pts: i64, buf: &[u8], now: Instant) -> Result<(), Error> {
        let triplets = decode_cc_data(buf)?;

        let mut events = Vec::new();
        let mut xds_pairs = Vec::new();
        {
            let mut state = self.state.lock();
            let mut dtvcc = false;
            for (i, triplet) in triplets.iter().enumerate() {
                match triplet.cc_type {
                    CcType::NtscField1 | CcType::NtscField2 => {
                        if !triplet.valid || i >= MAX_NTSC_PAIRS || dtvcc {
                            // Illegal, invalid or filler.
                            continue;
                        }
                        let field = if triplet.cc_type == CcType::NtscField1 { Field::First } else { Field::Second };
                        if let Some(pair) = state.eia608.feed(triplet.data, field, pts) {
                            xds_pairs.push(pair);
                        }
                    }
                    CcType::DtvccStart | CcType::DtvccData => {
                        dtvcc = true;
                        state.dtvcc.feed(triplet, pts, now);
                    }
                }
            }
            state.eia608.drain_events(pts, &mut events);
            state.dtvcc.update_service_status(now, &mut events);
        }

        for [d1, d2] in xds_pairs {
            if let Some(category) = self.xds_pair(d1, d2) {
                events.push(DecoderEvent::Xds(category));
            }
        }
        self.publish(events);
        Ok(())
    }

    /// Decode one line-21 byte pair captured at `tv`.
    ///
    /// Lines 21 and 22 are field 1, line 284 is field 2.
    pub fn feed(&self, pair: [u8; 2], line: u32, tv: DateTime<Utc>, pts: i64) -> Result<(), Error> {
        let field = Field::from_line(line)?;

        let mut events = Vec::new();
        let xds_pair = {
            let mut state = self.state.lock();
            state.capture_time = Some(tv);
            let xds_pair = state.eia608.feed(pair, field, pts);
            state.eia608.drain_events(pts, &mut events);
            xds_pair
        };

        if let Some([d1, d2]) = xds_pair {
            if let Some(category) = self.xds_pair(d1, d2) {
                events.push(DecoderEvent::Xds(category));
            }
        }
        self.publish(events);
        Ok(())
    }

    /// Decode one XDS byte pair, parity already removed.
    pub fn decode_xds(&self, data1: u8, data2: u8) -> Option<XdsCategory> {
        let category = self.xds_pair(data1, data2);
        if let Some(category) = category {
            self.publish(vec![DecoderEvent::Xds(category)]);
        }
        category
    }

    fn xds_pair(&self, data1: u8, data2: u8) -> Option<XdsCategory> {
        match self.xds.lock().decode(data1, data2) {
            Ok(category) => category,
            Err(e) => {
                debug!("XDS pair {:02X} {:02X} dropped: {}", data1, data2, e);
                None
            }
        }
    }

    /// Render page `pgno`: 1..=8 are CC1-CC4 and T1-T4, 9..=14 are DTVCC
    /// services 1-6.
    ///
    /// An EIA-608 page always yields one page; a DTVCC service yields one
    /// page per visible window, highest priority first.
    pub fn fetch_page(&self, pgno: u32) -> Result<Vec<Page>, Error> {
        let state = self.state.lock();
        match pgno {
            1..=LAST_CC_PAGE => {
                let channel = state.eia608.channel(pgno).ok_or(Error::InvalidPage(pgno))?;
                Ok(vec![render_channel(channel, self.config.to_upper)])
            }
            FIRST_DTVCC_PAGE..=LAST_DTVCC_PAGE => {
                let id = (pgno - FIRST_DTVCC_PAGE + 1) as u8;
                let service = state.dtvcc.service(id).ok_or(Error::InvalidPage(pgno))?;
                Ok(render_service(service, state.dtvcc.flash_phase()))
            }
            _ => Err(Error::InvalidPage(pgno)),
        }
    }

    /// Run delay timers and the flash clock without new data.
    pub fn tick(&self) {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&self, now: Instant) {
        let mut events = Vec::new();
        self.state.lock().dtvcc.update_service_status(now, &mut events);
        self.publish(events);
    }

    /// Deep copy of the decoded XDS metadata.
    pub fn xds_snapshot(&self) -> XdsSnapshot {
        self.xds.lock().snapshot().clone()
    }

    pub fn content_advisory_changed(&self) -> bool {
        self.xds.lock().content_advisory_changed()
    }

    pub fn reset_content_advisory_changed(&self) {
        self.xds.lock().reset_content_advisory_changed()
    }

    /// Checksum verdict of the last complete XDS packet.
    pub fn last_xds_checksum_valid(&self) -> Option<bool> {
        self.xds.lock().last_checksum_valid()
    }

    pub fn xds_checksum_errors(&self) -> u32 {
        self.xds.lock().checksum_errors()
    }

    /// Capture time of the last line-21 pair passed to [`feed`](Self::feed).
    pub fn capture_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().capture_time
    }

    /// Line-21 pair error history, most recent pair in bit 0.
    pub fn error_history(&self) -> u32 {
        self.state.lock().eia608.error_history()
    }

    /// Drop all caption and XDS state, e.g. after a channel change.
    pub fn reset(&self) {
        {
            let mut state = self.state.lock();
            state.eia608.reset();
            state.dtvcc.reset_all();
            state.capture_time = None;
        }
        self.xds.lock().reset();
        debug!("caption decoder reset");
    }

    fn publish(&self, events: Vec<DecoderEvent>) {
        for event in events {
            trace!("event: {:?}", event);
            // No subscribers is fine.
            let _ = self.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_protocol::{encode_cc_data, par8, CaptionEvent, CcTriplet, XdsChecksum};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ntsc(field: CcType, c1: u8, c2: u8) -> CcTriplet {
        CcTriplet::new(field, true, par8(c1), par8(c2))
    }

    fn block(triplets: &[CcTriplet]) -> Vec<u8> {
        encode_cc_data(triplets).unwrap().to_vec()
    }

    /// Pop-on caption "HI" on CC1, one pair per block.
    fn pop_on_hi() -> Vec<Vec<u8>> {
        [(0x14, 0x20), (0x11, 0x40), (b'H', b'I'), (0x14, 0x2F)]
            .iter()
            .map(|&(c1, c2)| block(&[ntsc(CcType::NtscField1, c1, c2)]))
            .collect()
    }

    /// One DTVCC packet for service 1: DF0 visible 2x4, then "HI".
    fn dtvcc_hi() -> Vec<u8> {
        let payload = [0x98, 0x20, 0x00, 0x00, 0x01, 0x03, 0x00, b'H', b'I'];
        let mut bytes = vec![0u8, 0x20 | payload.len() as u8];
        bytes.extend_from_slice(&payload);
        if bytes.len() % 2 == 1 {
            bytes.push(0);
        }
        bytes[0] = (bytes.len() / 2) as u8;
        block(&cc_protocol::packet_to_triplets(&bytes))
    }

    #[test]
    fn test_eia608_pop_on_page() {
        init_logger();
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        for (i, buf) in pop_on_hi().iter().enumerate() {
            decoder.decode(i as i64, buf).unwrap();
        }
        let pages = decoder.fetch_page(1).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].row_text(0), "HI");
        assert!(decoder.fetch_page(2).unwrap()[0].is_blank());
    }

    #[test]
    fn test_dtvcc_page() {
        init_logger();
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        decoder.decode(0, &dtvcc_hi()).unwrap();
        let pages = decoder.fetch_page(9).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].pgno, 9);
        assert_eq!(pages[0].row_text(0), "HI");
        assert!(decoder.fetch_page(10).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_input() {
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        assert_eq!(decoder.fetch_page(0).unwrap_err(), Error::InvalidPage(0));
        assert_eq!(decoder.fetch_page(15).unwrap_err(), Error::InvalidPage(15));
        assert!(matches!(decoder.decode(0, &[0x04, 0x41, 0xFF]), Err(Error::Protocol(_))));
        assert!(matches!(decoder.feed([0x80, 0x80], 20, Utc::now(), 0), Err(Error::Protocol(_))));
        // No process flag: nothing happens.
        assert!(decoder.decode(0, &[0x03, 0x01, 0xFF, 0xFC, 0x94, 0x20]).is_ok());
    }

    #[test]
    fn test_ntsc_after_dtvcc_is_ignored() {
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        let mut triplets = cc_protocol::decode_cc_data(&dtvcc_hi()).unwrap();
        triplets.push(ntsc(CcType::NtscField1, 0x14, 0x29));
        triplets.push(ntsc(CcType::NtscField1, 0x11, 0x40));
        triplets.push(ntsc(CcType::NtscField1, b'N', b'O'));
        decoder.decode(0, &block(&triplets)).unwrap();
        assert!(decoder.fetch_page(1).unwrap()[0].is_blank());
    }

    #[test]
    fn test_line21_feed_and_xds() {
        init_logger();
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        let tv = Utc::now();
        let mut sum = XdsChecksum::start(0x05, 0x01);
        let mut pairs = vec![[0x05, 0x01]];
        for chunk in [[b'P', b'B'], [b'S', 0x00]] {
            sum.push_pair(chunk[0], chunk[1]);
            pairs.push(chunk);
        }
        sum.push(0x0F);
        pairs.push([0x0F, sum.expected()]);

        for (i, [d1, d2]) in pairs.into_iter().enumerate() {
            decoder.feed([par8(d1), par8(d2)], 284, tv, i as i64).unwrap();
        }
        assert_eq!(decoder.capture_time(), Some(tv));
        assert_eq!(decoder.xds_snapshot().channel.network_name.as_deref(), Some("PBS"));
        // XDS bytes are not caption text.
        assert!(decoder.fetch_page(3).unwrap()[0].is_blank());
    }

    #[test]
    fn test_decode_xds_and_advisory_flag() {
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        let mut sum = XdsChecksum::start(0x01, 0x05);
        sum.push_pair(0x48, 0x44);
        sum.push(0x0F);
        assert_eq!(decoder.decode_xds(0x01, 0x05), None);
        assert_eq!(decoder.decode_xds(0x48, 0x44), None);
        assert_eq!(decoder.decode_xds(0x0F, sum.expected()), Some(XdsCategory::ContentAdvisory));
        assert!(decoder.content_advisory_changed());
        decoder.reset_content_advisory_changed();
        assert!(!decoder.content_advisory_changed());

        assert_eq!(decoder.last_xds_checksum_valid(), Some(true));

        // Same packet with a corrupted checksum is applied but flagged.
        assert_eq!(decoder.decode_xds(0x01, 0x05), None);
        assert_eq!(decoder.decode_xds(0x48, 0x44), None);
        assert_eq!(decoder.decode_xds(0x0F, sum.expected() ^ 0x01), Some(XdsCategory::ContentAdvisory));
        assert_eq!(decoder.last_xds_checksum_valid(), Some(false));
        assert_eq!(decoder.xds_checksum_errors(), 1);

        decoder.reset();
        assert_eq!(decoder.xds_snapshot(), XdsSnapshot::default());
        assert_eq!(decoder.last_xds_checksum_valid(), None);
    }

    #[test]
    fn test_reset_clears_pages() {
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        for buf in pop_on_hi() {
            decoder.decode(0, &buf).unwrap();
        }
        decoder.decode(0, &dtvcc_hi()).unwrap();
        decoder.reset();
        assert!(decoder.fetch_page(1).unwrap()[0].is_blank());
        assert!(decoder.fetch_page(9).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let decoder = CaptionDecoder::new(DecoderConfig::default());
        let mut rx = decoder.subscribe();

        decoder.decode(0, &dtvcc_hi()).unwrap();
        for (i, buf) in pop_on_hi().iter().enumerate() {
            decoder.decode(100 + i as i64, buf).unwrap();
        }

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&DecoderEvent::Caption(CaptionEvent {
            pgno: 9,
            first_seen: true,
            rolling: false,
            pts: 0
        })));
        assert!(events.iter().any(|e| matches!(e,
            DecoderEvent::Caption(ev) if ev.pgno == 1 && !ev.first_seen && ev.pts == 103)));
        assert!(events.iter().any(|e| matches!(e,
            DecoderEvent::Stream(line) if line.pgno == 1 && line.text == "HI")));
    }

    #[tokio::test]
    async fn test_subscriber_can_fetch_during_delivery() {
        let decoder = std::sync::Arc::new(CaptionDecoder::new(DecoderConfig::default()));
        let mut rx = decoder.subscribe();
        let reader = {
            let decoder = decoder.clone();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(DecoderEvent::Caption(ev)) if ev.pgno == 9 && !ev.first_seen => {
                            return decoder.fetch_page(ev.pgno).unwrap();
                        }
                        Ok(_) => continue,
                        Err(e) => panic!("channel closed: {}", e),
                    }
                }
            })
        };
        decoder.decode(0, &dtvcc_hi()).unwrap();
        let pages = reader.await.unwrap();
        assert_eq!(pages[0].row_text(0), "HI");
    }
}
