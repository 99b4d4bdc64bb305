use anyhow::{Result, bail};
use courtside_game::parse_seed;
use std::collections::HashSet;

const DEFAULT_SEED: u64 = 1337;

/// A seed resolved from the command line, with the token it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    pub label: String,
}

impl SeedInfo {
    #[must_use]
    pub fn from_numeric(seed: u64) -> Self {
        Self {
            seed,
            label: seed.to_string(),
        }
    }

    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        Self {
            seed: parse_seed(phrase),
            label: phrase.to_string(),
        }
    }
}

/// Resolve CLI seed tokens into canonical seeds.
///
/// Accepts decimal integers (negative values use their magnitude), `0x`
/// prefixed hex, and free-text phrases which hash to a seed. `range:A-B`
/// expands to every seed in the inclusive range. Duplicates are dropped
/// keeping the first occurrence; an empty list falls back to the default seed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if let Some(range) = token.strip_prefix("range:") {
            pending.extend(expand_range(range)?);
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(SeedInfo::from_numeric(value.unsigned_abs()));
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if token.starts_with("0x") || token.starts_with("0X") {
            let digits = &token[2..];
            let Ok(value) = u64::from_str_radix(digits, 16) else {
                bail!("Unrecognized seed token: {token}");
            };
            pending.push(SeedInfo {
                seed: value,
                label: token.to_string(),
            });
            continue;
        }

        pending.push(SeedInfo::from_phrase(token));
    }

    let mut seen = HashSet::new();
    pending.retain(|info| seen.insert(info.seed));

    if pending.is_empty() {
        pending.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }

    Ok(pending)
}

fn expand_range(range: &str) -> Result<Vec<SeedInfo>> {
    let Some((start, end)) = range.split_once('-') else {
        bail!("Seed range must look like range:START-END (got {range})");
    };
    let (Ok(start), Ok(end)) = (start.trim().parse::<u64>(), end.trim().parse::<u64>()) else {
        bail!("Seed range bounds must be integers (got {range})");
    };
    if start > end {
        bail!("Seed range is empty: {range}");
    }
    Ok((start..=end).map(SeedInfo::from_numeric).collect())
}
