//! RSS feed document
//!
//! Hand-written writer so regeneration is byte-for-byte deterministic given
//! the same inputs and clock: fixed element order, RFC 1123 dates, and the
//! exact five-entity escape set. Text nodes are escaped; URLs are not.

use chrono::{DateTime, Utc};

use newscast_core::EpisodeManifest;
use newscast_config::PodcastMeta;

/// One feed item, derived from an episode manifest.
#[derive(Debug, Clone)]
pub struct FeedEpisode {
    pub title: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub enclosure_url: String,
    pub enclosure_length: u64,
    pub guid: String,
    pub duration_sec: u64,
}

/// Map a manifest onto its feed item.
pub fn episode_from_manifest(manifest: &EpisodeManifest, podcast_title: &str) -> FeedEpisode {
    let hook = manifest.pipeline_report.outline.opening_hook.trim();
    let description = if hook.is_empty() {
        format!(
            "Daily episode for {} covering {} stories.",
            manifest.date,
            manifest.picks.len()
        )
    } else {
        hook.to_string()
    };
    FeedEpisode {
        title: format!("{} - {}", podcast_title, manifest.date),
        description,
        pub_date: manifest.generated_at,
        enclosure_url: manifest.mp3_url.clone(),
        enclosure_length: manifest.mp3_bytes,
        guid: manifest.run_id.clone(),
        duration_sec: manifest.duration_sec.max(0.0).round() as u64,
    }
}

/// Render the full RSS document. `last_build` is injected so callers (and
/// tests) control the only non-derived timestamp.
pub fn render_feed(
    meta: &PodcastMeta,
    episodes: &[FeedEpisode],
    last_build: DateTime<Utc>,
) -> String {
    let mut out = String::with_capacity(1024 + episodes.len() * 512);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(
        r#"<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd" xmlns:atom="http://www.w3.org/2005/Atom">"#,
    );
    out.push('\n');
    out.push_str("  <channel>\n");
    element(&mut out, 4, "title", &meta.title);
    raw_element(&mut out, 4, "link", &meta.base_url);
    element(&mut out, 4, "description", &meta.description);
    element(&mut out, 4, "language", &meta.language);
    element(&mut out, 4, "lastBuildDate", &rfc1123(last_build));
    out.push_str(&format!(
        "    <atom:link href=\"{}/podcast/feed\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        meta.base_url
    ));
    element(&mut out, 4, "itunes:author", &meta.author);
    element(&mut out, 4, "itunes:summary", &meta.description);
    out.push_str("    <itunes:owner>\n");
    element(&mut out, 6, "itunes:name", &meta.author);
    element(&mut out, 6, "itunes:email", &meta.email);
    out.push_str("    </itunes:owner>\n");
    out.push_str(&format!(
        "    <itunes:image href=\"{}/cover.jpg\"/>\n",
        meta.base_url
    ));
    out.push_str(&format!(
        "    <itunes:category text=\"{}\"/>\n",
        xml_escape(&meta.category)
    ));
    element(&mut out, 4, "itunes:explicit", "no");
    for episode in episodes {
        out.push_str("    <item>\n");
        element(&mut out, 6, "title", &episode.title);
        element(&mut out, 6, "description", &episode.description);
        element(&mut out, 6, "pubDate", &rfc1123(episode.pub_date));
        out.push_str(&format!(
            "      <enclosure url=\"{}\" length=\"{}\" type=\"audio/mpeg\"/>\n",
            episode.enclosure_url, episode.enclosure_length
        ));
        out.push_str(&format!(
            "      <guid isPermaLink=\"false\">{}</guid>\n",
            xml_escape(&episode.guid)
        ));
        element(&mut out, 6, "itunes:duration", &format_duration(episode.duration_sec));
        out.push_str("    </item>\n");
    }
    out.push_str("  </channel>\n");
    out.push_str("</rss>\n");
    out
}

fn element(out: &mut String, indent: usize, tag: &str, text: &str) {
    out.push_str(&" ".repeat(indent));
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&xml_escape(text));
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

/// Like [`element`] but without escaping; for URL nodes.
fn raw_element(out: &mut String, indent: usize, tag: &str, text: &str) {
    out.push_str(&" ".repeat(indent));
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(text);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

/// The five XML entities, in one pass.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// RFC 1123 in UTC, e.g. `Tue, 01 Aug 2026 09:00:00 GMT`.
pub fn rfc1123(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Seconds under an hour, `H:MM:SS` above.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 3600 {
        seconds.to_string()
    } else {
        format!(
            "{}:{:02}:{:02}",
            seconds / 3600,
            (seconds % 3600) / 60,
            seconds % 60
        )
    }
}
