/// Ordinal vocabulary, longest spelling first so that a contains-scan never
/// matches a shorter word embedded in a longer one.
const ORDINAL_WORDS: &[(&str, u32)] = &[
    ("다섯", 5),
    ("여섯", 6),
    ("일곱", 7),
    ("여덟", 8),
    ("아홉", 9),
    ("하나", 1),
    ("일번", 1),
    ("이번", 2),
    ("삼번", 3),
    ("사번", 4),
    ("오번", 5),
    ("육번", 6),
    ("칠번", 7),
    ("팔번", 8),
    ("구번", 9),
    ("십번", 10),
    ("첫", 1),
    ("둘", 2),
    ("두", 2),
    ("셋", 3),
    ("세", 3),
    ("넷", 4),
    ("네", 4),
    ("열", 10),
];

/// Parsed "start at H for N hours" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_hour: u32,
    pub duration_hours: u32,
}

/// Address-phase utterance split into its fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceParts {
    /// First segment; the destination candidate.
    pub address: String,
    /// Inline selection ("3번째") carried in the same utterance, if any.
    pub ordinal: Option<u32>,
    /// Remaining segments joined; carried forward as the reservation-time
    /// hint ("오후 1시부터 3시까지").
    pub time_text: Option<String>,
}

/// Extract a 1-based selection ordinal from free-form text.
///
/// Matches "3번째"-style numerals and the native words 첫번째 through
/// 열번째 (plus 하나/둘/셋…); returns `None` when no ordinal is present.
/// Digit runs outside 1..=10 (hours, prices) are not ordinals.
pub fn parse_ordinal(text: &str) -> Option<u32> {
    let t: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(n) = first_digit_run(&t) {
        if (1..=10).contains(&n) {
            return Some(n);
        }
    }

    for (word, n) in ORDINAL_WORDS {
        if t.contains(word) {
            return Some(*n);
        }
    }

    None
}

/// Extract a start hour and a duration from free-form text.
///
/// Understands "20시부터 2시간" (hour + explicit duration) and "18시 20시"
/// (two hours; duration = max(1, second - first)). Returns `None` when no
/// such pair is present.
pub fn parse_time_range(text: &str) -> Option<TimeRange> {
    let t: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let chars: Vec<char> = t.chars().collect();

    let mut hours: Vec<u32> = Vec::new();
    let mut durations: Vec<u32> = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let n: u32 = match chars[start..i].iter().collect::<String>().parse() {
                Ok(n) => n,
                Err(_) => continue, // overflow; skip the run
            };

            if chars.get(i) == Some(&'시') {
                if chars.get(i + 1) == Some(&'간') {
                    durations.push(n);
                    i += 2;
                } else {
                    if n <= 23 {
                        hours.push(n);
                    }
                    i += 1;
                }
            }
        } else {
            i += 1;
        }
    }

    if let (Some(&h), Some(&d)) = (hours.first(), durations.first()) {
        return Some(TimeRange {
            start_hour: h,
            duration_hours: d.max(1),
        });
    }
    if hours.len() >= 2 {
        return Some(TimeRange {
            start_hour: hours[0],
            duration_hours: hours[1].saturating_sub(hours[0]).max(1),
        });
    }

    None
}

/// Split an Address-phase utterance into address / inline ordinal / time
/// fragments.
///
/// Segments are separated by commas, line breaks, and the connectives
/// 그리고 / 그 다음에 / 그다음에. The first segment is the address
/// candidate; among the rest, one ordinal-looking segment becomes the
/// inline selection and everything else is joined into the time hint.
pub fn split_utterance(text: &str) -> UtteranceParts {
    let normalized = text
        .replace("그 다음에", ",")
        .replace("그다음에", ",")
        .replace("그리고", ",");

    let segments: Vec<&str> = normalized
        .split(|c| c == ',' || c == '，' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let Some((address, rest)) = segments.split_first() else {
        return UtteranceParts {
            address: text.trim().to_string(),
            ordinal: None,
            time_text: None,
        };
    };

    let mut ordinal = None;
    let mut time_parts: Vec<String> = Vec::new();

    for seg in rest {
        match first_time_token_start(seg) {
            Some(at) => {
                // An inline ordinal may share the segment with the time
                // phrase ("3번째 오후 1시부터 3시까지").
                let at = widen_time_start(seg, at);
                if ordinal.is_none() {
                    ordinal = parse_ordinal(&seg[..at]);
                }
                time_parts.push(seg[at..].trim().to_string());
            }
            None => {
                if ordinal.is_none() {
                    if let Some(n) = parse_ordinal(seg) {
                        ordinal = Some(n);
                        continue;
                    }
                }
                time_parts.push((*seg).to_string());
            }
        }
    }

    UtteranceParts {
        address: (*address).to_string(),
        ordinal,
        time_text: if time_parts.is_empty() {
            None
        } else {
            Some(time_parts.join(" "))
        },
    }
}

fn first_digit_run(t: &str) -> Option<u32> {
    let digits: String = t
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Byte offset of the first "N시"/"N시간" token in `seg`, if any.
fn first_time_token_start(seg: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = seg.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].1.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].1.is_ascii_digit() {
                i += 1;
            }
            let mut j = i;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            if j < chars.len() && chars[j].1 == '시' {
                return Some(chars[start].0);
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Pull a leading 오전/오후 into the time fragment so "오후 1시…" keeps its
/// meridiem when the segment is split.
fn widen_time_start(seg: &str, start: usize) -> usize {
    let head = seg[..start].trim_end();
    for meridiem in ["오전", "오후"] {
        if head.ends_with(meridiem) {
            return head.len() - meridiem.len();
        }
    }
    start
}
