//! Parser for event stream selectors such as `[mousedown, window:mouseup] > window:mousemove!`
use crate::error::{Result, VegaLiteError};
use crate::spec::signal::{SignalOnEventSpec, SignalOnSourceEvent};
use crate::spec::values::StringOrStringList;

/// Parse a comma separated list of event streams, using `default_source`
/// for streams without an explicit `source:` prefix
pub fn parse_selector(selector: &str, default_source: &str) -> Result<Vec<SignalOnEventSpec>> {
    split_top_level(selector, ',')?
        .into_iter()
        .map(|stream| parse_stream(stream.trim(), default_source))
        .collect()
}

/// Split on `sep` where it is not nested in brackets or braces
fn split_top_level(s: &str, sep: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(unbalanced(s));
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(unbalanced(s));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn unbalanced(s: &str) -> VegaLiteError {
    VegaLiteError::specification(format!("Unbalanced brackets in event selector: {s}"))
}

/// Index of the bracket closing the one at the start of `s`
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_stream(s: &str, default_source: &str) -> Result<SignalOnEventSpec> {
    if s.is_empty() {
        return Err(VegaLiteError::specification("Empty event selector"));
    }
    if s.starts_with('[') {
        let close = matching_bracket(s).ok_or_else(|| unbalanced(s))?;
        let rest = s[close + 1..].trim_start();
        if let Some(rest) = rest.strip_prefix('>') {
            let between = split_top_level(&s[1..close], ',')?;
            let [start, end] = between.as_slice() else {
                return Err(VegaLiteError::specification(format!(
                    "Between filter must have exactly two event streams: {s}"
                )));
            };
            let start = parse_stream(start.trim(), default_source)?;
            let end = parse_stream(end.trim(), default_source)?;
            let stream = parse_stream(rest.trim(), default_source)?;
            return Ok(match stream {
                SignalOnEventSpec::Source(mut source) => {
                    source.between = Some(vec![start, end]);
                    SignalOnEventSpec::Source(source)
                }
                other => other,
            });
        }
    }
    parse_event(s, default_source)
}

fn parse_event(s: &str, default_source: &str) -> Result<SignalOnEventSpec> {
    let mut s = s.trim();
    let mut consume = None;
    if let Some(rest) = s.strip_suffix('!') {
        consume = Some(true);
        s = rest.trim_end();
    }

    let mut filters: Vec<String> = Vec::new();
    while s.ends_with(']') {
        let open = s.rfind('[').ok_or_else(|| unbalanced(s))?;
        filters.insert(0, s[open + 1..s.len() - 1].trim().to_string());
        s = s[..open].trim_end();
    }

    let (source, markname, type_) = if let Some(rest) = s.strip_prefix('@') {
        let (mark, type_) = rest.split_once(':').ok_or_else(|| {
            VegaLiteError::specification(format!("Mark name selector without event type: {s}"))
        })?;
        (default_source.to_string(), Some(mark.to_string()), type_)
    } else if let Some((source, type_)) = s.split_once(':') {
        (source.to_string(), None, type_)
    } else {
        (default_source.to_string(), None, s)
    };
    if type_.is_empty() {
        return Err(VegaLiteError::specification(format!(
            "Missing event type in selector: {s}"
        )));
    }

    let filter = match filters.len() {
        0 => None,
        1 => filters.pop().map(StringOrStringList::String),
        _ => Some(StringOrStringList::StringList(filters)),
    };
    Ok(SignalOnEventSpec::Source(SignalOnSourceEvent {
        source: Some(source),
        type_: Some(type_.to_string()),
        markname,
        filter,
        between: None,
        consume,
        extra: Default::default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_event() {
        let events = parse_selector("click", "scope").unwrap();
        assert_eq!(
            serde_json::to_value(&events).unwrap(),
            json!([{"source": "scope", "type": "click"}])
        );
    }

    #[test]
    fn test_drag_stream() {
        let events =
            parse_selector("[mousedown, window:mouseup] > window:mousemove!", "scope").unwrap();
        assert_eq!(
            serde_json::to_value(&events[0]).unwrap(),
            json!({
                "source": "window",
                "type": "mousemove",
                "between": [
                    {"source": "scope", "type": "mousedown"},
                    {"source": "window", "type": "mouseup"}
                ],
                "consume": true
            })
        );
    }

    #[test]
    fn test_filters_and_lists() {
        let events = parse_selector("click[event.shiftKey], @legend_symbols:dblclick", "view").unwrap();
        assert_eq!(
            serde_json::to_value(&events).unwrap(),
            json!([
                {"source": "view", "type": "click", "filter": "event.shiftKey"},
                {"source": "view", "type": "dblclick", "markname": "legend_symbols"}
            ])
        );
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(parse_selector("[mousedown > mousemove", "scope").is_err());
        assert!(parse_selector("[a, b, c] > mousemove", "scope").is_err());
        assert!(parse_selector("window:", "scope").is_err());
    }
}
