//! Terminal and JSON output of decoded captions.

use cc_decoder::xds::{ContentAdvisory, XdsSnapshot};
use cc_decoder::{Cell, Opacity, Page, StreamLine};
use cc_protocol::XdsCategory;
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// One rendered page as emitted in JSON mode.
#[derive(Debug, Serialize)]
pub struct PageRecord {
    pub pgno: u32,
    pub subno: u32,
    pub pts: i64,
    pub rows: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputRecord<'a> {
    Page(PageRecord),
    Stream(&'a StreamLine),
    Xds { category: XdsCategory, snapshot: &'a XdsSnapshot },
    Summary { snapshot: &'a XdsSnapshot },
}

pub fn json_line(record: &OutputRecord<'_>) -> String {
    serde_json::to_string(record).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// Text of every row of a page.
pub fn page_rows(page: &Page) -> Vec<String> {
    (0..page.rows).map(|row| page.row_text(row)).collect()
}

fn styled_cell(cell: &Cell) -> ColoredString {
    let text = cell.ch.to_string();
    if cell.opacity == Opacity::TransparentSpace {
        return text.normal();
    }
    let (r, g, b) = cell.foreground.rgb();
    let mut out = text.truecolor(r, g, b);
    if cell.opacity != Opacity::TransparentFull {
        let (r, g, b) = cell.background.rgb();
        out = out.on_truecolor(r, g, b);
    }
    if cell.italic {
        out = out.italic();
    }
    if cell.underline {
        out = out.underline();
    }
    if cell.flash {
        out = out.blink();
    }
    out
}

/// ANSI rendering of the non-blank rows of a page.
pub fn page_ansi(page: &Page, pts: i64) -> String {
    let mut out = format!("{} page {} window {} pts {}\n", "==".dimmed(), page.pgno, page.subno, pts);
    for row in 0..page.rows {
        let Some(cells) = page.row(row) else { continue };
        if cells.iter().all(|c| !c.is_visible() || c.ch == ' ') {
            continue;
        }
        out.push_str(&format!("{:2} ", row).dimmed().to_string());
        for cell in cells {
            out.push_str(&styled_cell(cell).to_string());
        }
        out.push('\n');
    }
    out
}

pub fn stream_ansi(line: &StreamLine) -> String {
    format!("{} [{}] {}", format!("{:>10}", line.pts).dimmed(), line.pgno, line.text.bold())
}

fn advisory(rating: &ContentAdvisory) -> String {
    match rating {
        ContentAdvisory::Mpaa(r) => format!("MPAA {:?}", r),
        ContentAdvisory::UsTv { rating, flags } => {
            let mut s = format!("{:?}", rating);
            for (set, name) in [
                (flags.dialogue, "D"),
                (flags.language, "L"),
                (flags.sexual, "S"),
                (flags.violence, "V"),
                (flags.fantasy_violence, "FV"),
            ] {
                if set {
                    s.push('-');
                    s.push_str(name);
                }
            }
            s
        }
        ContentAdvisory::CanadianEnglish(r) => format!("Canadian English {:?}", r),
        ContentAdvisory::CanadianFrench(r) => format!("Canadian French {:?}", r),
        ContentAdvisory::NotAvailable => "n/a".to_string(),
    }
}

/// The snapshot fields a category update refers to.
pub fn xds_fields(category: XdsCategory, snapshot: &XdsSnapshot) -> String {
    let current = &snapshot.current;
    match category {
        XdsCategory::ProgramTime => {
            let mut parts = Vec::new();
            if let Some(s) = current.start {
                parts.push(format!("start {:02}/{:02} {:02}:{:02} UTC", s.month, s.date, s.hour, s.minute));
            }
            if let Some(l) = current.length {
                parts.push(format!("length {}:{:02}", l.hour, l.minute));
            }
            if let Some(e) = current.elapsed {
                parts.push(format!("elapsed {}:{:02}", e.hour, e.minute));
            }
            parts.join(", ")
        }
        XdsCategory::ProgramName => current.name.clone().unwrap_or_default(),
        XdsCategory::ProgramType => current.types.iter().map(|t| t.keyword()).collect::<Vec<_>>().join(", "),
        XdsCategory::ProgramDescription => current.description_lines().collect::<Vec<_>>().join(" / "),
        XdsCategory::CaptionServices => current
            .caption_services
            .iter()
            .map(|s| format!("{:?} {}", s.kind, s.language.code()))
            .collect::<Vec<_>>()
            .join(", "),
        XdsCategory::ContentAdvisory => current.rating.as_ref().map(advisory).unwrap_or_default(),
        XdsCategory::AudioServices => current
            .audio
            .map(|a| {
                format!("main {:?} {}, SAP {:?} {}", a.main_type, a.main_language.code(), a.sap_type, a.sap_language.code())
            })
            .unwrap_or_default(),
        XdsCategory::AspectRatio => current
            .aspect_ratio
            .map(|a| format!("lines {}-{} {:?}", a.start_line, a.end_line, a.kind))
            .unwrap_or_default(),
        XdsCategory::Cgms => current.cgms.map(|c| format!("{:?} APS {:?}", c.copy_control, c.aps)).unwrap_or_default(),
        XdsCategory::DateTime => snapshot
            .misc
            .time_of_day
            .map(|t| format!("{:04}-{:02}-{:02} {:02}:{:02} UTC", t.year, t.month, t.date, t.hour, t.minute))
            .unwrap_or_default(),
        XdsCategory::NetworkInfo => {
            let channel = &snapshot.channel;
            [channel.network_name.as_deref(), channel.call_letters.as_deref(), channel.channel_number.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        }
        XdsCategory::WeatherInfo => {
            let public = &snapshot.public_service;
            public.weather_message.clone().or_else(|| public.weather_code.clone()).unwrap_or_default()
        }
    }
}

pub fn xds_ansi(category: XdsCategory, snapshot: &XdsSnapshot) -> String {
    format!("{} {}: {}", "XDS".cyan().bold(), category.as_str(), xds_fields(category, snapshot))
}

/// Human readable end-of-input summary.
pub fn summary_ansi(snapshot: &XdsSnapshot) -> String {
    let mut out = String::from("XDS summary\n");
    for category in [
        XdsCategory::ProgramName,
        XdsCategory::ProgramTime,
        XdsCategory::ProgramType,
        XdsCategory::ContentAdvisory,
        XdsCategory::NetworkInfo,
        XdsCategory::DateTime,
    ] {
        let fields = xds_fields(category, snapshot);
        if !fields.is_empty() {
            out.push_str(&format!("  {:<16} {}\n", category.as_str(), fields));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_decoder::xds::{HourMinute, StartTime, TvFlags, TvRating};

    #[test]
    fn test_page_rows_and_ansi() {
        colored::control::set_override(false);
        let mut page = Page::new(1, 0, 2, 4);
        if let Some(row) = page.row_mut(1) {
            row[0] = Cell { ch: 'H', opacity: Opacity::Opaque, ..Cell::default() };
            row[1] = Cell { ch: 'I', opacity: Opacity::Opaque, ..Cell::default() };
        }
        assert_eq!(page_rows(&page), ["", "HI"]);
        let text = page_ansi(&page, 42);
        assert!(text.contains(" 1 HI"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_xds_fields() {
        let mut snapshot = XdsSnapshot::default();
        snapshot.current.start = Some(StartTime { minute: 5, hour: 3, date: 1, month: 2 });
        snapshot.current.length = Some(HourMinute { hour: 1, minute: 30 });
        snapshot.current.rating = Some(ContentAdvisory::UsTv {
            rating: TvRating::Tv14,
            flags: TvFlags { violence: true, ..TvFlags::default() },
        });
        assert_eq!(
            xds_fields(XdsCategory::ProgramTime, &snapshot),
            "start 02/01 03:05 UTC, length 1:30"
        );
        assert_eq!(xds_fields(XdsCategory::ContentAdvisory, &snapshot), "Tv14-V");
        assert_eq!(xds_fields(XdsCategory::ProgramName, &snapshot), "");
    }

    #[test]
    fn test_json_records() {
        let line = StreamLine { pgno: 1, text: "HELLO".into(), pts: 7 };
        let json = json_line(&OutputRecord::Stream(&line));
        assert_eq!(json, r#"{"type":"stream","pgno":1,"text":"HELLO","pts":7}"#);

        let snapshot = XdsSnapshot::default();
        let json = json_line(&OutputRecord::Xds { category: XdsCategory::Cgms, snapshot: &snapshot });
        assert!(json.starts_with(r#"{"type":"xds","category":"Cgms","snapshot":{"current":"#));
    }
}
