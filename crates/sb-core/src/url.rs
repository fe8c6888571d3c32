//! Character-sheet URL checks.
//!
//! A tab is a sync target only when it shows a D&D Beyond character. Two
//! shapes are recognised:
//!
//! - the strict allow-list used for payload routing:
//!   `/characters/<id>[/edit]` and `/profile/<user>/characters/<id>[/edit]`;
//! - the looser tab match used by the popup, which accepts any path prefix
//!   before `characters/<id>` and anything after a separator.
//!
//! Both require `https` and the exact host. Parsing works on slices of the
//! input and never allocates except for the returned id.

pub const DNDBEYOND_HOST: &str = "www.dndbeyond.com";

// =============================================================================
// URL parts
// =============================================================================

/// Scheme, host (with port and userinfo) and the rest of the URL.
struct UrlParts<'a> {
    host: &'a str,
    path: &'a str,
}

/// Split an `https://` URL. Any other scheme yields `None`.
fn split_https(url: &str) -> Option<UrlParts<'_>> {
    let url = url.trim();
    let bytes = url.as_bytes();
    if bytes.len() < 8 || !bytes[..8].eq_ignore_ascii_case(b"https://") {
        return None;
    }

    let rest = &url[8..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..host_end];

    let after_host = &rest[host_end..];
    let path_end = after_host.find(['?', '#']).unwrap_or(after_host.len());

    Some(UrlParts {
        host,
        path: &after_host[..path_end],
    })
}

/// Exact host match; userinfo and explicit ports are rejected.
fn is_dndbeyond_host(host: &str) -> bool {
    host.eq_ignore_ascii_case(DNDBEYOND_HOST)
}

fn is_character_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Strict allow-list
// =============================================================================

/// Character id from a strict character-sheet URL.
///
/// ```
/// use sb_core::url::extract_dndbeyond_character_id;
///
/// assert_eq!(
///     extract_dndbeyond_character_id("https://www.dndbeyond.com/characters/46441499/edit").as_deref(),
///     Some("46441499"),
/// );
/// assert_eq!(extract_dndbeyond_character_id("https://evil.com/characters/46441499"), None);
/// ```
pub fn extract_dndbeyond_character_id(url: &str) -> Option<String> {
    let parts = split_https(url)?;
    if !is_dndbeyond_host(parts.host) {
        return None;
    }

    let path = parts.path.strip_suffix('/').unwrap_or(parts.path);
    let segments: Vec<&str> = path.split('/').skip(1).collect();

    let tail = match segments.as_slice() {
        [first, rest @ ..] if first.eq_ignore_ascii_case("characters") => rest,
        [profile, user, characters, rest @ ..]
            if profile.eq_ignore_ascii_case("profile")
                && !user.is_empty()
                && characters.eq_ignore_ascii_case("characters") =>
        {
            rest
        }
        _ => return None,
    };

    match tail {
        [id] if is_character_id(id) => Some(id.to_string()),
        [id, edit] if is_character_id(id) && edit.eq_ignore_ascii_case("edit") => Some(id.to_string()),
        _ => None,
    }
}

// =============================================================================
// Loose tab match
// =============================================================================

/// Character id from any URL that looks like a character page.
///
/// Mirrors `^https://www.dndbeyond.com/(?:[^/?#]+/)*characters/(\d+)(?:/edit)?(?:[/?#]|$)`
/// (case-insensitive). When several `characters/<id>` pairs appear the last
/// one wins, as the greedy prefix would.
pub fn match_character_tab(url: &str) -> Option<String> {
    let parts = split_https(url)?;
    if !is_dndbeyond_host(parts.host) {
        return None;
    }

    // Segments up to a query or fragment; the id must be followed by a
    // separator or the end, which splitting on '/' already guarantees.
    let segments: Vec<&str> = parts.path.split('/').skip(1).collect();

    let mut found = None;
    for (i, pair) in segments.windows(2).enumerate() {
        let prefix_ok = segments[..i].iter().all(|s| !s.is_empty());
        if prefix_ok && pair[0].eq_ignore_ascii_case("characters") && is_character_id(pair[1]) {
            found = Some(pair[1]);
        }
    }

    found.map(str::to_string)
}

/// Whether the tab may receive `SYNC_EXECUTE` at all.
pub fn is_sync_target(url: &str) -> bool {
    extract_dndbeyond_character_id(url).is_some() || match_character_tab(url).is_some()
}

/// Character id to compare against a payload: strict form first.
pub fn tab_character_id(url: &str) -> Option<String> {
    extract_dndbeyond_character_id(url).or_else(|| match_character_tab(url))
}
