//! SDP rewriting
//!
//! Some receivers mishandle retransmission (RTX) payload streams, so the
//! locally produced description has every RTX payload type removed before it
//! is applied or transmitted. The rewrite never invents lines: it only drops
//! attribute lines tied to an RTX payload and filters the `m=video` payload
//! list.

use std::collections::HashSet;

/// Remove RTX payload types and their dependent lines from an SDP document.
///
/// Three passes over the lines, in order:
///
/// 1. collect the payload types declared as `rtx` by `a=rtpmap` lines;
/// 2. drop every `a=rtpmap:`/`a=fmtp:`/`a=rtcp-fb:` line referencing one of
///    those payload types;
/// 3. strip those payload types from the `m=video` line's payload list,
///    keeping the media/port/protocol header tokens verbatim.
///
/// Input without RTX payloads is returned unchanged, and the function is
/// idempotent. A malformed `m=video` line (fewer than four tokens) passes
/// through untouched.
pub fn strip_rtx(sdp: &str) -> String {
    let lines: Vec<&str> = sdp.split('\n').collect();

    let rtx_payloads = collect_rtx_payloads(&lines);
    if rtx_payloads.is_empty() {
        return sdp.to_string();
    }

    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| !references_rtx_payload(line, &rtx_payloads))
        .collect();

    let rewritten: Vec<String> = kept
        .into_iter()
        .map(|line| {
            if line.to_lowercase().starts_with("m=video") {
                filter_media_line(line, &rtx_payloads)
            } else {
                line.to_string()
            }
        })
        .collect();

    rewritten.join("\n")
}

/// Payload types declared as `rtx` by `a=rtpmap:<PT> rtx/<clock>` lines.
fn collect_rtx_payloads<'a>(lines: &[&'a str]) -> HashSet<&'a str> {
    let mut payloads = HashSet::new();

    for line in lines {
        let lower = line.to_lowercase();
        if !lower.starts_with("a=rtpmap:") {
            continue;
        }

        // "a=rtpmap:98 rtx/90000" -> payload "98", encoding "rtx"
        let rest = &line["a=rtpmap:".len()..];
        let Some((payload, encoding)) = rest.split_once(' ') else {
            continue;
        };
        let name = encoding.split('/').next().unwrap_or(encoding);
        if name.eq_ignore_ascii_case("rtx") {
            payloads.insert(payload);
        }
    }

    payloads
}

/// True if the line is an `a=rtpmap`/`a=fmtp`/`a=rtcp-fb` attribute for one
/// of the RTX payload types.
fn references_rtx_payload(line: &str, rtx_payloads: &HashSet<&str>) -> bool {
    let lower = line.to_lowercase();
    rtx_payloads.iter().any(|pt| {
        lower.starts_with(&format!("a=rtpmap:{pt}"))
            || lower.starts_with(&format!("a=fmtp:{pt}"))
            || lower.starts_with(&format!("a=rtcp-fb:{pt}"))
    })
}

/// Drop RTX payload types from an `m=video` line's payload list.
///
/// The first three tokens (media, port, protocol) are kept verbatim; the
/// remaining tokens are payload types, filtered in place. Lines with three
/// or fewer tokens are returned unchanged.
fn filter_media_line(line: &str, rtx_payloads: &HashSet<&str>) -> String {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() <= 3 {
        return line.to_string();
    }

    let mut kept: Vec<&str> = parts[..3].to_vec();
    kept.extend(parts[3..].iter().filter(|pt| !rtx_payloads.contains(*pt)));
    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDP_WITH_RTX: &str = "v=0\n\
        o=- 4611731400430051336 2 IN IP4 127.0.0.1\n\
        s=-\n\
        m=video 9 RTP/SAVPF 96 97 98\n\
        a=rtpmap:96 VP8/90000\n\
        a=rtcp-fb:96 nack\n\
        a=rtpmap:97 VP9/90000\n\
        a=rtpmap:98 rtx/90000\n\
        a=fmtp:98 apt=96\n\
        a=rtcp-fb:98 nack";

    #[test]
    fn test_strips_rtx_lines_and_media_payload() {
        let stripped = strip_rtx(SDP_WITH_RTX);

        assert!(!stripped.contains("rtx"));
        assert!(!stripped.contains("a=fmtp:98"));
        assert!(!stripped.contains("a=rtcp-fb:98"));
        assert!(stripped.contains("m=video 9 RTP/SAVPF 96 97\n"));

        // Unrelated attribute lines survive in order
        assert!(stripped.contains("a=rtpmap:96 VP8/90000"));
        assert!(stripped.contains("a=rtcp-fb:96 nack"));
        assert!(stripped.contains("a=rtpmap:97 VP9/90000"));
    }

    #[test]
    fn test_identity_without_rtx() {
        let sdp = "v=0\nm=video 9 RTP/SAVPF 96 97\na=rtpmap:96 VP8/90000\na=rtpmap:97 VP9/90000";
        assert_eq!(strip_rtx(sdp), sdp);
    }

    #[test]
    fn test_idempotent() {
        let once = strip_rtx(SDP_WITH_RTX);
        let twice = strip_rtx(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_short_media_line_untouched() {
        let sdp = "m=video 9 RTP/SAVPF\na=rtpmap:98 rtx/90000";
        let stripped = strip_rtx(sdp);
        assert!(stripped.contains("m=video 9 RTP/SAVPF"));
        assert!(!stripped.contains("a=rtpmap:98"));
    }

    #[test]
    fn test_audio_sections_pass_through() {
        let sdp = "m=audio 9 UDP/TLS/RTP/SAVPF 111\n\
            a=rtpmap:111 opus/48000/2\n\
            m=video 9 RTP/SAVPF 96 98\n\
            a=rtpmap:96 VP8/90000\n\
            a=rtpmap:98 rtx/90000\n\
            a=fmtp:98 apt=96";
        let stripped = strip_rtx(sdp);
        assert!(stripped.contains("m=audio 9 UDP/TLS/RTP/SAVPF 111"));
        assert!(stripped.contains("a=rtpmap:111 opus/48000/2"));
        assert!(stripped.contains("m=video 9 RTP/SAVPF 96\n"));
    }

    #[test]
    fn test_case_insensitive_rtpmap_prefix() {
        let sdp = "m=video 9 RTP/SAVPF 96 98\nA=RTPMAP:98 RTX/90000\na=fmtp:98 apt=96";
        let stripped = strip_rtx(sdp);
        assert!(!stripped.to_lowercase().contains("rtx"));
        assert!(stripped.contains("m=video 9 RTP/SAVPF 96"));
    }

    #[test]
    fn test_never_introduces_lines() {
        let stripped = strip_rtx(SDP_WITH_RTX);
        let original_lines: Vec<&str> = SDP_WITH_RTX.split('\n').collect();
        for line in stripped.split('\n') {
            if line.starts_with("m=video") {
                continue; // rewritten in place
            }
            assert!(original_lines.contains(&line));
        }
    }
}
