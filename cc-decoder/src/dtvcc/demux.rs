//! DTVCC caption channel packet reassembly and service block routing.
//!
//! ```text
//! packet:  seq[2] size[6] | block | block | ... | null block
//! block:   service[3] size[5] (ext[2] service[6]) data[size]
//! ```
//!
//! A packet arrives as a DTVCC start triplet followed by data triplets, two
//! bytes each. Whole service blocks, and whole syntactic elements of a
//! partial block, are handed to their service as soon as they are buffered.

use std::time::Instant;

use cc_protocol::{CaptionEvent, CcTriplet, CcType};
use log::{debug, trace, warn};

use crate::event::DecoderEvent;

use super::interp::element_length;
use super::service::Service;

/// Capacity of the packet reassembly buffer.
pub const PACKET_SIZE: usize = 128;
/// Number of decoded services.
pub const SERVICES: usize = 6;

/// Half period of the flash clock in milliseconds.
const FLASH_HALF_PERIOD_MS: u128 = 250;

/// Declared packet length including the header byte.
fn declared_size(header: u8) -> usize {
    match header & 0x3F {
        0 => PACKET_SIZE,
        code => code as usize * 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockHeader {
    service: u8,
    header_size: usize,
    block_size: usize,
}

impl BlockHeader {
    /// Parse a service block header. Returns `None` for the null block that
    /// ends the packet and for malformed extended headers.
    fn parse(buf: &[u8]) -> Option<Self> {
        let c = *buf.first()?;
        let service = c >> 5;
        let block_size = (c & 0x1F) as usize;
        match service {
            0 => None,
            7 => {
                let ext = *buf.get(1)?;
                // The null fill bits must be zero and the number above 6.
                (7..=63).contains(&ext).then_some(Self {
                    service: ext,
                    header_size: 2,
                    block_size,
                })
            }
            service => Some(Self { service, header_size: 1, block_size }),
        }
    }
}

pub struct DtvccDecoder {
    pub services: [Service; SERVICES],
    packet: Vec<u8>,
    /// Bytes of the current packet not yet handed to services, counted
    /// from the header byte.
    declared: usize,
    next_sequence: Option<u8>,
    /// Services that have reported data.
    announced: u8,
    /// Services that received data since the last status update.
    active: u8,
    flash_phase: bool,
    epoch: Instant,
    pts: i64,
    wide: bool,
}

impl DtvccDecoder {
    pub fn new(wide: bool, epoch: Instant) -> Self {
        Self {
            services: std::array::from_fn(|i| Service::new(i as u8 + 1, wide)),
            packet: Vec::with_capacity(PACKET_SIZE),
            declared: 0,
            next_sequence: None,
            announced: 0,
            active: 0,
            flash_phase: false,
            epoch,
            pts: -1,
            wide,
        }
    }

    /// Reset every service and drop the partial packet.
    pub fn reset(&mut self) {
        for service in self.services.iter_mut() {
            service.reset();
        }
        self.packet.clear();
        self.declared = 0;
        self.next_sequence = None;
    }

    /// Like [`reset`](Self::reset), and services report first data again.
    pub fn reset_all(&mut self) {
        self.reset();
        self.announced = 0;
        self.active = 0;
    }

    pub fn service(&self, id: u8) -> Option<&Service> {
        id.checked_sub(1).and_then(|i| self.services.get(i as usize))
    }

    /// Current phase of the 2 Hz flash clock.
    pub fn flash_phase(&self) -> bool {
        self.flash_phase
    }

    /// Feed one DTVCC triplet. NTSC triplets are ignored.
    pub fn feed(&mut self, triplet: &CcTriplet, pts: i64, now: Instant) {
        self.pts = pts;
        match triplet.cc_type {
            CcType::DtvccData => {
                if self.packet.is_empty() {
                    trace!("DTVCC data without packet start");
                } else if !triplet.valid {
                    // Padding after the end of the packet.
                } else if self.packet.len() + 2 > PACKET_SIZE {
                    warn!("DTVCC packet buffer overflow, resetting");
                    self.reset();
                } else {
                    self.packet.extend_from_slice(&triplet.data);
                    self.try_decode_packet(now);
                }
            }
            CcType::DtvccStart => {
                if !self.packet.is_empty() {
                    self.decode_packet(now);
                }
                if triplet.valid {
                    self.begin_packet(triplet.data, now);
                }
            }
            CcType::NtscField1 | CcType::NtscField2 => {}
        }
    }

    fn begin_packet(&mut self, data: [u8; 2], now: Instant) {
        let header = data[0];
        let sequence = header >> 6;
        if let Some(expected) = self.next_sequence {
            if sequence != expected {
                warn!(
                    "DTVCC sequence discontinuity: expected {}, got {}, resetting",
                    expected, sequence
                );
                self.reset();
            }
        }
        self.next_sequence = Some((sequence + 1) & 3);

        self.packet.clear();
        self.packet.extend_from_slice(&data);
        self.declared = declared_size(header);
        trace!("DTVCC packet seq {} size {}", sequence, self.declared);
        self.try_decode_packet(now);
    }

    /// Hand whatever can be extracted from the partial packet to the
    /// services, or decode it completely once all declared bytes arrived.
    fn try_decode_packet(&mut self, now: Instant) {
        if self.packet.is_empty() {
            return;
        }
        if self.declared <= self.packet.len() {
            self.decode_packet(now);
            return;
        }

        let mut pos = 1;
        let mut consumed = 0;

        while pos < self.packet.len() {
            let Some(block) = BlockHeader::parse(&self.packet[pos..]) else {
                break;
            };
            let body = pos + block.header_size;
            let left = self.packet.len() - pos;

            if left >= block.header_size + block.block_size {
                let end = body + block.block_size;
                self.deliver(block.service, body, end);
                pos = end;
                continue;
            }

            // Partial block: take its complete syntactic elements.
            let mut parsed = 0;
            while body + parsed < self.packet.len() {
                match element_length(&self.packet[body + parsed..], self.wide) {
                    Ok(len) => parsed += len,
                    Err(_) => break,
                }
            }
            if parsed > 0 {
                self.deliver(block.service, body, body + parsed);
                self.packet.drain(body..body + parsed);
                let remaining = block.block_size - parsed;
                self.packet[pos] = (self.packet[pos] & 0xE0) | remaining as u8;
                consumed += parsed;
            }
            break;
        }

        if pos > 1 || consumed > 0 {
            consumed += pos - 1;
            self.packet.drain(1..pos);
            self.declared = self.declared.saturating_sub(consumed);
            self.decode_services(now);
        }
    }

    /// Decode the buffered packet as complete, then clear it.
    fn decode_packet(&mut self, now: Instant) {
        let size = self.declared.min(self.packet.len());
        let mut pos = 1;

        while pos < size {
            let Some(block) = BlockHeader::parse(&self.packet[pos..size]) else {
                break;
            };
            let body = pos + block.header_size;
            let end = body + block.block_size;
            if end > size {
                debug!("DTVCC service block exceeds packet: {} > {}", end, size);
                break;
            }
            self.deliver(block.service, body, end);
            pos = end;
        }

        self.packet.clear();
        self.declared = 0;
        self.decode_services(now);
    }

    /// Copy `packet[start..end]` to a service. Extended services are
    /// skipped.
    fn deliver(&mut self, service: u8, start: usize, end: usize) {
        let Some(index) = service.checked_sub(1).map(usize::from).filter(|&i| i < SERVICES) else {
            trace!("DTVCC skipping extended service {}", service);
            return;
        };
        let bytes = &self.packet[start..end];
        if bytes.is_empty() {
            return;
        }
        self.services[index].push(bytes);
        self.active |= 1 << index;
    }

    fn decode_services(&mut self, now: Instant) {
        let pts = self.pts;
        for service in self.services.iter_mut() {
            service.process(now, pts);
        }
    }

    /// Run time driven updates and collect the resulting notifications.
    pub fn update_service_status(&mut self, now: Instant, events: &mut Vec<DecoderEvent>) {
        let elapsed = now.saturating_duration_since(self.epoch).as_millis();
        let phase = (elapsed / FLASH_HALF_PERIOD_MS) & 1 == 1;
        let flash_changed = phase != self.flash_phase;
        self.flash_phase = phase;

        let active = std::mem::take(&mut self.active);
        for (i, service) in self.services.iter_mut().enumerate() {
            let pgno = service.pgno();
            if active & (1 << i) != 0 && self.announced & (1 << i) == 0 {
                debug!("DTVCC service {} has data", service.id());
                self.announced |= 1 << i;
                events.push(DecoderEvent::Caption(CaptionEvent {
                    pgno,
                    first_seen: true,
                    rolling: false,
                    pts: self.pts,
                }));
            }

            service.tick(now, flash_changed);

            events.extend(service.take_lines().into_iter().map(DecoderEvent::Stream));
            if service.take_update() {
                events.push(DecoderEvent::Caption(CaptionEvent {
                    pgno,
                    first_seen: false,
                    rolling: false,
                    pts: self.pts,
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(d1: u8, d2: u8) -> CcTriplet {
        CcTriplet::new(CcType::DtvccStart, true, d1, d2)
    }

    fn data(d1: u8, d2: u8) -> CcTriplet {
        CcTriplet::new(CcType::DtvccData, true, d1, d2)
    }

    /// Build the triplets of one packet carrying `payload` for service 1.
    fn packet(seq: u8, payload: &[u8]) -> Vec<CcTriplet> {
        let mut bytes = vec![0u8, 0x20 | payload.len() as u8];
        bytes.extend_from_slice(payload);
        if bytes.len() % 2 == 1 {
            bytes.push(0);
        }
        bytes[0] = (seq << 6) | (bytes.len() / 2) as u8;
        bytes
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| if i == 0 { start(pair[0], pair[1]) } else { data(pair[0], pair[1]) })
            .collect()
    }

    fn feed_all(d: &mut DtvccDecoder, triplets: &[CcTriplet], now: Instant) {
        for t in triplets {
            d.feed(t, 0, now);
        }
    }

    fn row0(d: &DtvccDecoder) -> String {
        d.services[0].windows[0]
            .text_rows()
            .next()
            .unwrap()
            .iter()
            .map(|&c| if c == 0 { '.' } else { char::from_u32(c as u32).unwrap() })
            .collect()
    }

    // DF0 visible 2x4, then "HI".
    const CAPTION: [u8; 9] = [0x98, 0x20, 0x00, 0x00, 0x01, 0x03, 0x00, b'H', b'I'];

    #[test]
    fn test_declared_size() {
        assert_eq!(declared_size(0x00), 128);
        assert_eq!(declared_size(0xC5), 10);
    }

    #[test]
    fn test_block_header() {
        assert_eq!(
            BlockHeader::parse(&[0x25]),
            Some(BlockHeader { service: 1, header_size: 1, block_size: 5 })
        );
        assert_eq!(
            BlockHeader::parse(&[0xE2, 0x10]),
            Some(BlockHeader { service: 16, header_size: 2, block_size: 2 })
        );
        assert_eq!(BlockHeader::parse(&[0x00]), None);
        assert_eq!(BlockHeader::parse(&[0xE2, 0x45]), None);
    }

    #[test]
    fn test_packet_decodes_window() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        feed_all(&mut d, &packet(0, &CAPTION), now);
        assert_eq!(d.services[0].created, 1);
        assert_eq!(row0(&d), "HI..");
    }

    #[test]
    fn test_split_delivery_matches_single() {
        let now = Instant::now();
        let triplets = packet(0, &CAPTION);

        let mut whole = DtvccDecoder::new(false, now);
        feed_all(&mut whole, &triplets, now);

        // Same bytes, but each triplet in its own call with status updates
        // in between.
        let mut split = DtvccDecoder::new(false, now);
        let mut events = Vec::new();
        for t in &triplets {
            split.feed(t, 0, now);
            split.update_service_status(now, &mut events);
        }

        assert_eq!(row0(&whole), row0(&split));
        assert_eq!(whole.services[0].created, split.services[0].created);
        assert!(split.packet.is_empty());
    }

    #[test]
    fn test_incremental_flush_before_packet_end() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        // Declare 32 bytes but send the define window and two characters.
        let mut triplets = packet(0, &CAPTION);
        if let Some(first) = triplets.first_mut() {
            first.data[0] = 16;
        }
        feed_all(&mut d, &triplets, now);
        assert_eq!(row0(&d), "HI..");
        // The partial block header stays, its size reduced.
        assert_eq!(d.packet.len(), 2);
        assert_eq!(d.packet[1] & 0x1F, 0);
    }

    #[test]
    fn test_sequence_gap_resets_services() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        feed_all(&mut d, &packet(1, &CAPTION), now);
        assert_eq!(d.services[0].created, 1);

        // Sequence 3 after 1: everything is reset before "Z" is applied,
        // so it has no window to go to.
        feed_all(&mut d, &packet(3, b"Z"), now);
        assert_eq!(d.services[0].created, 0);
        assert_eq!(row0(&d), "....");

        // 3 -> 0 continues normally.
        feed_all(&mut d, &packet(0, &CAPTION), now);
        assert_eq!(row0(&d), "HI..");
    }

    #[test]
    fn test_data_after_packet_end_is_ignored() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        feed_all(&mut d, &packet(0, &CAPTION), now);
        assert!(d.packet.is_empty());
        // Stray continuation bytes without a start triplet.
        d.feed(&data(0x21, b'X'), 0, now);
        assert!(d.packet.is_empty());
        assert_eq!(row0(&d), "HI..");
    }

    #[test]
    fn test_continuation_flood_stays_within_packet() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        // Maximum declared size, then far more padding than fits.
        let mut triplets = packet(0, &CAPTION);
        if let Some(first) = triplets.first_mut() {
            first.data[0] = 0;
        }
        feed_all(&mut d, &triplets, now);
        assert_eq!(row0(&d), "HI..");

        for _ in 0..100 {
            d.feed(&data(0, 0), 0, now);
            assert!(d.packet.len() <= PACKET_SIZE);
            assert!(d.packet.is_empty() || d.packet.len() < d.declared);
        }
        assert!(d.packet.is_empty());
        // Completed normally: no reset, sequence continues.
        assert_eq!(d.next_sequence, Some(1));
        assert_eq!(d.services[0].created, 1);
        assert_eq!(row0(&d), "HI..");
    }

    #[test]
    fn test_first_seen_and_update_events() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        let mut events = Vec::new();
        feed_all(&mut d, &packet(0, &CAPTION), now);
        d.update_service_status(now, &mut events);

        let captions: Vec<&CaptionEvent> = events
            .iter()
            .filter_map(|e| match e {
                DecoderEvent::Caption(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(captions.len(), 2);
        assert!(captions[0].first_seen);
        assert_eq!(captions[0].pgno, 9);
        assert!(!captions[1].first_seen);

        // Second packet: no first-seen again.
        events.clear();
        feed_all(&mut d, &packet(1, b"!"), now);
        d.update_service_status(now, &mut events);
        assert!(events
            .iter()
            .all(|e| !matches!(e, DecoderEvent::Caption(c) if c.first_seen)));
    }

    #[test]
    fn test_invalid_start_drops_packet() {
        let now = Instant::now();
        let mut d = DtvccDecoder::new(false, now);
        d.feed(&CcTriplet::new(CcType::DtvccStart, false, 0x02, 0x21), 0, now);
        d.feed(&data(b'A', 0), 0, now);
        assert!(d.packet.is_empty());
    }
}
