use crate::ir::{PdCode, SocketId};
use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").unwrap());
static NESTED_ARRAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[\s*\[").unwrap());

/// Reads a PD code from text.
///
/// A nested array such as `[[1,2,3,4],[2,1,4,3]]` is read as JSON5. Any
/// other text, e.g. `PD[X[1,5,2,4],X[3,1,4,6],X[5,3,6,2]]`, contributes its
/// integers in order, four per crossing.
pub fn parse_pd_code(input: &str) -> Result<PdCode> {
    let crossings = if NESTED_ARRAY_RE.is_match(input) {
        parse_nested_array(input)?
    } else {
        parse_integer_stream(input)?
    };
    Ok(PdCode::new(crossings)?)
}

fn parse_nested_array(input: &str) -> Result<Vec<[SocketId; 4]>> {
    let rows: Vec<Vec<SocketId>> =
        json5::from_str(input).context("PD code is not a nested integer array")?;
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            <[SocketId; 4]>::try_from(row.as_slice()).map_err(|_| {
                anyhow::anyhow!("crossing {idx} has {} sockets, expected 4", row.len())
            })
        })
        .collect()
}

fn parse_integer_stream(input: &str) -> Result<Vec<[SocketId; 4]>> {
    let values = INTEGER_RE
        .find_iter(input)
        .map(|m| {
            m.as_str()
                .parse::<SocketId>()
                .with_context(|| format!("socket id {} out of range", m.as_str()))
        })
        .collect::<Result<Vec<_>>>()?;
    if values.is_empty() {
        bail!("no socket ids found in input");
    }
    if values.len() % 4 != 0 {
        bail!(
            "found {} socket ids, which is not a multiple of 4",
            values.len()
        );
    }
    Ok(values
        .chunks_exact(4)
        .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]])
        .collect())
}

/// Parses an `--outer` argument: a socket id, or `max` for the largest id.
pub fn parse_outer_target(token: &str) -> Result<crate::layout::OuterTarget> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("max") || token == "-1" {
        return Ok(crate::layout::OuterTarget::LargestId);
    }
    let id: SocketId = token
        .parse()
        .with_context(|| format!("outer target {token:?} is neither a socket id nor 'max'"))?;
    Ok(crate::layout::OuterTarget::Socket(id))
}
