//! Site-specific chunk address resolution
//!
//! Chunk addressing is stateless given the completed-chunk count, which is
//! what makes resume trivial: re-derive the next URL from the persisted
//! count. Each hosting site maps to one [`ChunkRule`], selected once per
//! item.

use crate::queue::DownloadItem;
use crate::transport::HttpTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Placeholder token substituted by the fragment rule
const FRAGMENT_TOKEN: &str = "FRAGMENT";
/// Placeholder token substituted by the segment rule
const SEGMENT_TOKEN: &str = "SEGMENT";
/// CDN host prepended to manifest entries for twitter.com
const TWIMG_CDN: &str = "https://video.twimg.com";

/// How a relative manifest entry is made absolute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestJoin {
    /// Prepend a fixed CDN host
    CdnPrefix(&'static str),
    /// Prepend the manifest URL's directory prefix
    ManifestDir,
}

/// Chunk resolution rule for one hosting site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRule {
    /// Replace `FRAGMENT` in the base URL with `frag(n)`
    Fragment,
    /// Replace `SEGMENT` in the base URL with `segment-n`
    Segment,
    /// Scan an m3u8-style manifest for the nth media entry
    Manifest {
        media_suffix: &'static str,
        join: ManifestJoin,
    },
}

/// Rule for a hosting site, or `None` for sites without chunked content
pub fn rule_for_site(source_website: &str) -> Option<ChunkRule> {
    match source_website {
        "dailymotion.com" => Some(ChunkRule::Fragment),
        "vimeo.com" => Some(ChunkRule::Segment),
        "twitter.com" => Some(ChunkRule::Manifest {
            media_suffix: ".ts",
            join: ManifestJoin::CdnPrefix(TWIMG_CDN),
        }),
        "myspace.com" => Some(ChunkRule::Manifest {
            media_suffix: ".ts",
            join: ManifestJoin::ManifestDir,
        }),
        "metacafe.com" => Some(ChunkRule::Manifest {
            media_suffix: ".mp4",
            join: ManifestJoin::ManifestDir,
        }),
        _ => None,
    }
}

/// Derive the URL of chunk number `completed + 1`, or `None` when the
/// sequence is exhausted
///
/// Substitution rules always yield a URL; their termination is detected by
/// the fetch layer returning not-found. The manifest rule re-fetches the
/// manifest each time; a transport error during that fetch resolves to
/// `None` for this attempt (logged, not fatal).
pub async fn next_chunk_url(
    rule: ChunkRule,
    item: &DownloadItem,
    completed: u64,
    transport: &dyn HttpTransport,
    cancelled: &AtomicBool,
) -> Option<String> {
    match rule {
        ChunkRule::Fragment => Some(
            item.video_url
                .replace(FRAGMENT_TOKEN, &format!("frag({})", completed + 1)),
        ),
        ChunkRule::Segment => Some(
            item.video_url
                .replace(SEGMENT_TOKEN, &format!("segment-{}", completed + 1)),
        ),
        ChunkRule::Manifest { media_suffix, join } => {
            scan_manifest(item, completed, media_suffix, join, transport, cancelled).await
        }
    }
}

/// Walk the manifest to the URI of entry `completed + 1`
///
/// Entry #1 is the first line ending with the media suffix. Every further
/// entry occupies exactly two lines (metadata line, then URI line), so we
/// skip one pair per already-completed chunk.
async fn scan_manifest(
    item: &DownloadItem,
    completed: u64,
    media_suffix: &str,
    join: ManifestJoin,
    transport: &dyn HttpTransport,
    cancelled: &AtomicBool,
) -> Option<String> {
    let stream = match transport.open(&item.video_url, &[]).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Manifest fetch failed for {}: {}", item.video_url, e);
            return None;
        }
    };

    let mut lines = BufReader::new(stream).lines();

    // Scan forward to the first media entry.
    let mut uri = loop {
        if cancelled.load(Ordering::Relaxed) {
            return None;
        }
        match lines.next_line().await {
            Ok(Some(line)) if line.ends_with(media_suffix) => break line,
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(e) => {
                warn!("Manifest read failed for {}: {}", item.video_url, e);
                return None;
            }
        }
    };

    // Advance one metadata/URI pair per completed chunk.
    for _ in 0..completed {
        if cancelled.load(Ordering::Relaxed) {
            return None;
        }
        let skipped = lines.next_line().await.ok().flatten();
        match lines.next_line().await.ok().flatten() {
            Some(next) if skipped.is_some() => uri = next,
            _ => return None,
        }
    }
    match join {
        ManifestJoin::CdnPrefix(prefix) => Some(format!("{}{}", prefix, uri)),
        ManifestJoin::ManifestDir => {
            let base = &item.video_url;
            let cut = base.rfind('/')? + 1;
            Some(format!("{}{}", &base[..cut], uri))
        }
    }
}
