use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use streamcap_core::{ServerError, StreamSample};

use crate::UPLOAD_RATE_PREF;

const ROOT: &str = "MediaContainer";
/// Playable items listed under `/status/sessions`.
const SESSION_ITEMS: [&str; 2] = ["Video", "Track"];

/// Turns a `/status/sessions` document into one sample per playing item.
pub fn parse_sessions(xml: &str) -> Result<Vec<StreamSample>, ServerError> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0_usize;
    let mut saw_root = false;
    let mut current: Option<StreamSample> = None;
    let mut samples = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = element_name(&e);
                saw_root |= depth == 1 && name == ROOT;
                if depth == 2 && SESSION_ITEMS.contains(&name.as_str()) {
                    current = Some(StreamSample::default());
                } else if depth == 3 {
                    if let Some(sample) = current.as_mut() {
                        apply_item_child(sample, &name, &e);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                let child_depth = depth + 1;
                saw_root |= child_depth == 1 && name == ROOT;
                if child_depth == 2 && SESSION_ITEMS.contains(&name.as_str()) {
                    samples.push(StreamSample::default());
                } else if child_depth == 3 {
                    if let Some(sample) = current.as_mut() {
                        apply_item_child(sample, &name, &e);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(sample) = current.take() {
                        samples.push(sample);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(ServerError::Decode(err.to_string())),
            _ => {}
        }
    }

    if !saw_root {
        return Err(ServerError::Decode(format!("missing {ROOT} element")));
    }
    Ok(samples)
}

/// Reads the per-stream upload cap out of a `/:/prefs` document. A missing
/// or empty setting means it was never configured.
pub fn parse_upload_cap(xml: &str) -> Result<Option<u32>, ServerError> {
    let mut reader = Reader::from_str(xml);
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                saw_root |= name == ROOT;
                if name != "Setting" || attribute(&e, "id").as_deref() != Some(UPLOAD_RATE_PREF) {
                    continue;
                }
                return match attribute(&e, "value") {
                    Some(value) if !value.trim().is_empty() => {
                        value.trim().parse().map(Some).map_err(|_| {
                            ServerError::Decode(format!("{UPLOAD_RATE_PREF} value {value:?}"))
                        })
                    }
                    _ => Ok(None),
                };
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(ServerError::Decode(err.to_string())),
            _ => {}
        }
    }

    if !saw_root {
        return Err(ServerError::Decode(format!("missing {ROOT} element")));
    }
    Ok(None)
}

fn apply_item_child(sample: &mut StreamSample, name: &str, e: &BytesStart<'_>) {
    match name {
        "Player" => {
            if attribute(e, "local").as_deref() == Some("1") {
                sample.local = true;
            }
        }
        "Session" => {
            if attribute(e, "location").as_deref() == Some("lan") {
                sample.local = true;
            }
            if let Some(kbps) = attribute(e, "bandwidth").and_then(|v| v.parse().ok()) {
                sample.session_bandwidth_kbps = Some(kbps);
            }
        }
        "Media" if sample.media_bitrate_kbps.is_none() => {
            sample.media_bitrate_kbps = attribute(e, "bitrate").and_then(|v| v.parse().ok());
        }
        _ => {}
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    let local_name = e.local_name();
    String::from_utf8_lossy(local_name.as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let local = attr.key.local_name();
        if local.as_ref() == key.as_bytes() {
            attr.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}
