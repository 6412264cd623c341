//! k-shingling and winnowing.
//!
//! Both passes run in O(n) over the number of tokens or shingles.

use std::collections::VecDeque;

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// A shingle hash picked by winnowing, with the index of its first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Selected {
    pub hash: u64,
    pub start_idx: usize,
}

/// Polynomial rolling hash over every run of `k` consecutive tokens.
///
/// Returns `n - k + 1` hashes, or none when `k == 0` or `n < k`.
pub(crate) fn make_shingles_rolling<S: AsRef<str>>(tokens: &[S], k: usize, seed: u64) -> Vec<u64> {
    let n = tokens.len();
    if k == 0 || n < k {
        return Vec::new();
    }
    let token_hashes: Vec<u64> = tokens
        .iter()
        .map(|t| xxh3_64_with_seed(t.as_ref().as_bytes(), seed))
        .collect();

    const BASE: u64 = 1_000_003;
    let base = BASE ^ splitmix64(seed);

    // base^(k-1), for dropping the oldest token from the window.
    let mut base_km1 = 1u64;
    for _ in 1..k {
        base_km1 = base_km1.wrapping_mul(base);
    }

    let mut out = Vec::with_capacity(n - k + 1);
    let mut h = token_hashes
        .iter()
        .take(k)
        .fold(0u64, |acc, &v| acc.wrapping_mul(base).wrapping_add(v));
    out.push(h);

    for (&old, &new) in token_hashes.iter().zip(token_hashes.iter().skip(k)) {
        h = h.wrapping_sub(old.wrapping_mul(base_km1));
        h = h.wrapping_mul(base).wrapping_add(new);
        out.push(h);
    }
    out
}

/// Winnowing over `w`-sized windows with a monotonic deque.
///
/// Each window contributes its minimum hash. On ties the rightmost occurrence
/// wins. A position is emitted once even when it stays the minimum across
/// several windows. When `w >= n` the single global minimum is returned.
pub(crate) fn winnow_minq(shingles: &[u64], w: usize) -> Vec<Selected> {
    let n = shingles.len();
    if n == 0 {
        return Vec::new();
    }

    let window = w.max(1);
    if window >= n {
        let (start_idx, &hash) = shingles
            .iter()
            .enumerate()
            .fold((0, &shingles[0]), |best, cur| {
                if *cur.1 <= *best.1 {
                    cur
                } else {
                    best
                }
            });
        return vec![Selected { hash, start_idx }];
    }

    let mut out = Vec::with_capacity(n - window + 1);
    // Indices in the current window, hash values strictly increasing front to back.
    let mut dq: VecDeque<usize> = VecDeque::with_capacity(window);
    let mut last_picked: Option<usize> = None;

    for i in 0..n {
        while let Some(&j) = dq.back() {
            // `<=` evicts equal values, so the rightmost tie survives.
            if shingles[i] <= shingles[j] {
                dq.pop_back();
            } else {
                break;
            }
        }
        dq.push_back(i);

        if i + 1 < window {
            continue;
        }
        let left = i + 1 - window;
        while dq.front().is_some_and(|&j| j < left) {
            dq.pop_front();
        }

        if let Some(&idx) = dq.front() {
            if last_picked != Some(idx) {
                out.push(Selected {
                    hash: shingles[idx],
                    start_idx: idx,
                });
                last_picked = Some(idx);
            }
        }
    }

    out
}

pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
