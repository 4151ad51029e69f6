//! LZ match-finding engine (spec §4.3).
//!
//! The most algorithmically demanding piece of the crate, and the one
//! shared by every LZ encoder: given an input buffer and a set of
//! window/length constraints, produce the ordered, non-overlapping list of
//! `(offset, distance, length)` matches an encoder will turn into tokens.
//! Parallel over fixed-size blocks, with a sequential seam-reconciliation
//! pass stitching the per-block results back together.

use rayon::prelude::*;

/// Default block size the match-finder parallelizes over (spec §4.3, §5).
pub const DEFAULT_BLOCK_SIZE: usize = 32 * 1024;

/// Per-codec window/length constraints (spec §3's `LzProperties`).
#[derive(Clone, Copy, Debug)]
pub struct LzProperties {
    pub window_size: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub min_distance: usize,
    pub window_start: usize,
}

impl LzProperties {
    pub fn new(window_size: usize, min_length: usize, max_length: usize, min_distance: usize) -> Self {
        Self {
            window_size,
            min_length,
            max_length,
            min_distance,
            window_start: 0,
        }
    }

    pub fn with_window_start(mut self, window_start: usize) -> Self {
        self.window_start = window_start;
        self
    }

    /// `distance_bits = ceil(log2(window_size))`
    pub fn distance_bits(&self) -> u32 {
        ceil_log2(self.window_size.max(1))
    }

    /// `length_bits = ceil(log2(max_length - min_length))`
    pub fn length_bits(&self) -> u32 {
        ceil_log2((self.max_length - self.min_length).max(1))
    }
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        return 0;
    }
    (usize::BITS - (n - 1).leading_zeros()).max(1)
}

/// A single back-reference produced by the finder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LzMatch {
    pub offset: usize,
    pub distance: usize,
    pub length: usize,
}

/// Compression effort level (spec §6's `Level`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    NoCompression,
    Fastest,
    Optimal,
    SmallestSize,
}

impl Level {
    /// Maps the level to an effective window size for this call.
    fn effective_window(self, window_size: usize) -> usize {
        match self {
            Level::NoCompression => 0,
            Level::Fastest => (window_size / 4).max(256).min(window_size),
            Level::Optimal => window_size,
            Level::SmallestSize => window_size,
        }
    }
}

/// One `(window_size, min_length, max_length, min_distance)` regime a match
/// may satisfy. Used by codecs with several distance/length bands (aPLib,
/// ECD-style codecs); a single-profile codec just passes one profile.
#[derive(Clone, Copy, Debug)]
pub struct MatchProfile {
    pub window_size: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub min_distance: usize,
}

impl From<&LzProperties> for MatchProfile {
    fn from(p: &LzProperties) -> Self {
        MatchProfile {
            window_size: p.window_size,
            min_length: p.min_length,
            max_length: p.max_length,
            min_distance: p.min_distance,
        }
    }
}

/// Accept a `(length, distance)` pair only if some profile is satisfied;
/// returns the chosen profile's clamped length. Spec §4.3 "multi-profile
/// validator".
fn validate(profiles: &[MatchProfile], distance: usize, length: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for p in profiles {
        if distance <= p.window_size && length >= p.min_length && distance >= p.min_distance {
            let clamped = length.min(p.max_length);
            if best.map_or(true, |b| clamped > b) {
                best = Some(clamped);
            }
        }
    }
    best
}

/// Find the ordered, non-overlapping list of matches in `source` subject to
/// `lz`, honoring `look_ahead` and `level`. `level == NoCompression` always
/// returns an empty list.
pub fn find_matches(source: &[u8], lz: &LzProperties, look_ahead: bool, level: Level) -> Vec<LzMatch> {
    find_matches_multi(source, &[MatchProfile::from(lz)], lz.window_size, look_ahead, level)
}

/// Same as [`find_matches`] but validated against several distance/length
/// profiles instead of one (spec §4.3 multi-profile validator).
pub fn find_matches_multi(
    source: &[u8],
    profiles: &[MatchProfile],
    window_size: usize,
    look_ahead: bool,
    level: Level,
) -> Vec<LzMatch> {
    if level == Level::NoCompression || source.is_empty() || profiles.is_empty() {
        return Vec::new();
    }
    let effective_window = level.effective_window(window_size);
    if effective_window == 0 {
        return Vec::new();
    }
    let min_length = profiles.iter().map(|p| p.min_length).min().unwrap_or(1);
    let max_length = profiles.iter().map(|p| p.max_length).max().unwrap_or(1);
    let block_size = DEFAULT_BLOCK_SIZE;

    let blocks: Vec<(usize, usize)> = block_bounds(source.len(), block_size);

    let per_block: Vec<Vec<LzMatch>> = blocks
        .par_iter()
        .map(|&(start, end)| {
            find_matches_in_block(
                source,
                start,
                end,
                profiles,
                effective_window,
                min_length,
                max_length,
                look_ahead,
            )
        })
        .collect();

    merge_blocks(per_block, max_length)
}

fn block_bounds(len: usize, block_size: usize) -> Vec<(usize, usize)> {
    let mut v = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + block_size).min(len);
        v.push((start, end));
        start = end;
    }
    v
}

/// Runs the per-position scan over `[block_start, block_end)`, with
/// back-references allowed to reach into `source` before `block_start`
/// (the window is global, only the forward scan position is block-local).
#[allow(clippy::too_many_arguments)]
fn find_matches_in_block(
    source: &[u8],
    block_start: usize,
    block_end: usize,
    profiles: &[MatchProfile],
    window_size: usize,
    min_length: usize,
    max_length: usize,
    look_ahead: bool,
) -> Vec<LzMatch> {
    let mut matches = Vec::new();
    let min_distance_floor = profiles.iter().map(|p| p.min_distance).min().unwrap_or(1);
    // earliest position a back-reference can exist at all: `min_distance`
    // bytes must already have been emitted (scenario 1 in spec §8 requires
    // a length-6/distance-2 match to start at offset 2 even though
    // `min_length` is 3, so the scan floor is bounded by distance, not length)
    let start_i = block_start.max(min_distance_floor.max(1));
    if block_end < 4 {
        return matches;
    }
    let end_i = block_end.saturating_sub(3).max(start_i);
    let mut i = start_i;
    while i < end_i {
        let window_lo = i.saturating_sub(window_size);
        // min_distance can vary per profile; use the smallest to scope the scan,
        // individual profiles re-check their own min_distance in `validate`.
        let min_distance = profiles.iter().map(|p| p.min_distance).min().unwrap_or(1);
        if i < min_distance {
            i += 1;
            continue;
        }
        let window_hi = i - min_distance;

        let cap_lookahead = max_length.min(source.len() - i);

        if cap_lookahead < min_length || i + 2 > source.len() {
            i += 1;
            continue;
        }

        let mut best_len = 0usize;
        let mut best_dist = 0usize;
        let prefix = u16::from_le_bytes([source[i], source[i + 1]]);

        let mut j = window_lo;
        while j <= window_hi {
            // per-j cap: in non-look-ahead mode a match may not read past
            // bytes it has not yet emitted, so it is bounded by the
            // distance itself (`i - j`) in addition to the block/length caps.
            let cap = if look_ahead {
                cap_lookahead
            } else {
                cap_lookahead.min(block_end - i).min(i - j)
            };
            if j + 1 < source.len() && cap >= min_length {
                let cand_prefix = u16::from_le_bytes([source[j], source[j + 1]]);
                if cand_prefix == prefix {
                    let mut len = 0usize;
                    while len < cap && source[i + len] == source[j + len] {
                        len += 1;
                    }
                    if len > best_len {
                        best_len = len;
                        best_dist = i - j;
                        if best_len >= cap_lookahead {
                            break;
                        }
                    }
                }
            }
            j += 1;
        }

        if best_len >= min_length {
            if let Some(clamped) = validate(profiles, best_dist, best_len) {
                matches.push(LzMatch {
                    offset: i,
                    distance: best_dist,
                    length: clamped,
                });
                i += clamped.max(1) - 1;
            }
        }
        i += 1;
    }
    matches
}

/// Reconciles the seam between consecutive blocks: merges or trims any
/// overlap between the last match of one block and the first match of the
/// next, then a general pass that combines touching same-distance matches.
fn merge_blocks(per_block: Vec<Vec<LzMatch>>, max_length: usize) -> Vec<LzMatch> {
    let mut all: Vec<LzMatch> = Vec::new();
    for block in per_block {
        for m in block {
            if let Some(last) = all.last_mut() {
                let last_end = last.offset + last.length;
                if m.offset < last_end {
                    let overlap = last_end - m.offset;
                    if last.distance == m.distance && last.length + m.length - overlap <= max_length {
                        last.length = last.length + m.length - overlap;
                        continue;
                    }
                    if m.length <= overlap {
                        continue; // fully swallowed, drop
                    }
                    let trimmed_len = m.length - overlap;
                    all.push(LzMatch {
                        offset: last_end,
                        distance: m.distance,
                        length: trimmed_len,
                    });
                    continue;
                }
            }
            all.push(m);
        }
    }

    // second pass: combine adjacent, same-distance, touching matches
    let mut combined: Vec<LzMatch> = Vec::with_capacity(all.len());
    for m in all {
        if let Some(last) = combined.last_mut() {
            let last_end = last.offset + last.length;
            if last_end == m.offset && last.distance == m.distance && last.length + m.length <= max_length {
                last.length += m.length;
                continue;
            }
        }
        combined.push(m);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(window: usize, min_len: usize, max_len: usize, min_dist: usize) -> LzProperties {
        LzProperties::new(window, min_len, max_len, min_dist)
    }

    #[test]
    fn empty_input_yields_no_matches() {
        let p = props(4096, 3, 18, 1);
        assert!(find_matches(&[], &p, true, Level::Optimal).is_empty());
    }

    #[test]
    fn no_compression_yields_no_matches() {
        let p = props(4096, 3, 18, 1);
        let data = b"ABABABABABABAB".repeat(4);
        assert!(find_matches(&data, &p, true, Level::NoCompression).is_empty());
    }

    #[test]
    fn finds_a_run() {
        let p = props(4096, 3, 255, 1);
        let mut data = vec![0xAAu8; 100];
        data.extend(vec![0xBBu8; 100]);
        data.extend(vec![0xAAu8; 100]);
        let matches = find_matches(&data, &p, true, Level::Optimal);
        assert!(!matches.is_empty());
        for m in &matches {
            assert!(m.distance >= p.min_distance);
            assert!(m.length >= p.min_length && m.length <= p.max_length);
            assert!(m.distance <= p.window_size);
        }
        // strictly increasing, non-overlapping
        for w in matches.windows(2) {
            assert!(w[0].offset + w[0].length <= w[1].offset);
        }
    }

    #[test]
    fn non_look_ahead_matches_never_self_overlap() {
        let p = props(4096, 3, 255, 1);
        let data = b"X".repeat(500);
        let matches = find_matches(&data, &p, false, Level::Optimal);
        for m in &matches {
            // source window used for the match must be disjoint from the
            // match region itself: distance must be at least the length.
            assert!(m.distance >= m.length);
            assert!(m.offset as i64 - m.distance as i64 >= 0);
        }
    }

    #[test]
    fn reconstructs_input_from_literals_and_matches() {
        let p = props(4096, 3, 255, 1);
        let data = b"the quick brown fox the quick brown fox jumps over".to_vec();
        let matches = find_matches(&data, &p, true, Level::Optimal);
        let mut reconstructed = vec![0u8; 0];
        let mut pos = 0usize;
        for m in &matches {
            while pos < m.offset {
                reconstructed.push(data[pos]);
                pos += 1;
            }
            for k in 0..m.length {
                let src = reconstructed.len() - m.distance;
                let b = reconstructed[src];
                reconstructed.push(b);
            }
            pos += m.length;
        }
        while pos < data.len() {
            reconstructed.push(data[pos]);
            pos += 1;
        }
        assert_eq!(reconstructed, data);
    }

    #[test]
    fn block_seam_merges_a_run_straddling_the_boundary() {
        let p = props(4096, 3, 255, 1);
        let mut data = vec![0u8; DEFAULT_BLOCK_SIZE - 50];
        data.extend(vec![0x7Au8; 300]); // run straddles the 32 KiB boundary
        data.extend(vec![1u8; 50]);
        let matches = find_matches(&data, &p, true, Level::Optimal);
        for w in matches.windows(2) {
            assert!(w[0].offset + w[0].length <= w[1].offset);
        }
    }

    #[test]
    fn multi_profile_validator_picks_satisfying_profile() {
        let profiles = [
            MatchProfile { window_size: 16, min_length: 2, max_length: 5, min_distance: 1 },
            MatchProfile { window_size: 1024, min_length: 4, max_length: 64, min_distance: 1 },
        ];
        assert_eq!(validate(&profiles, 500, 10), Some(10));
        assert_eq!(validate(&profiles, 8, 3), Some(3));
        assert_eq!(validate(&profiles, 500, 3), None);
    }
}
