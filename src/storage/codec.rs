//! Line format for animation files
//!
//! One loop per line, space separated:
//! `x y z index interval duration start end block`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::{Loop, LoopIndex, MAX_LOOPS_PER_MAP, MapAnimation, Position};
use crate::error::Result;

const FIELDS: usize = 9;

/// A line that could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Result of decoding a file
#[derive(Debug)]
pub struct Decoded {
    pub state: MapAnimation,
    /// Lines that were skipped
    pub errors: Vec<LineError>,
}

/// Render every loop of `state`, cells in position order then index order
pub fn encode(state: &MapAnimation) -> String {
    let mut out = String::new();
    for cell in state.cells() {
        let p = cell.position();
        for (index, lp) in cell.loops() {
            out.push_str(&format!(
                "{} {} {} {} {} {} {} {} {}\n",
                p.x, p.y, p.z, index, lp.interval, lp.duration, lp.start, lp.end, lp.block
            ));
        }
    }
    out
}

/// Parse one line into its position, index and loop
pub fn parse_line(line: &str) -> std::result::Result<(Position, LoopIndex, Loop), String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELDS {
        return Err(format!("expected {} fields, found {}", FIELDS, fields.len()));
    }

    let position = Position::new(field(&fields, 0, "x")?, field(&fields, 1, "y")?, field(&fields, 2, "z")?);
    let index: LoopIndex = field(&fields, 3, "index")?;
    if index == 0 {
        return Err("loop index 0 is reserved".to_string());
    }

    let lp = Loop::new(
        field(&fields, 4, "interval")?,
        field(&fields, 5, "duration")?,
        field(&fields, 6, "start")?,
        field(&fields, 7, "end")?,
        field(&fields, 8, "block")?,
    )
    .map_err(|e| e.to_string())?;

    Ok((position, index, lp))
}

fn field<T: FromStr>(fields: &[&str], at: usize, name: &str) -> std::result::Result<T, String> {
    fields[at]
        .parse()
        .map_err(|_| format!("{} is not a valid {}: {:?}", name, std::any::type_name::<T>(), fields[at]))
}

/// Parse a whole file, skipping lines that do not parse
///
/// A later line for the same position and index replaces the earlier one.
/// Blank lines are ignored.
pub fn decode(text: &str) -> Result<Decoded> {
    let mut cells: BTreeMap<Position, BTreeMap<LoopIndex, Loop>> = BTreeMap::new();
    let mut total = 0usize;
    let mut errors = Vec::new();

    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = n + 1;

        let (position, index, lp) = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(reason) => {
                errors.push(LineError { line: line_no, reason });
                continue;
            }
        };

        let loops = cells.entry(position).or_default();
        if !loops.contains_key(&index) {
            if total == MAX_LOOPS_PER_MAP {
                errors.push(LineError {
                    line: line_no,
                    reason: format!("map already holds {} loops", MAX_LOOPS_PER_MAP),
                });
                continue;
            }
            total += 1;
        }
        loops.insert(index, lp);
    }

    let mut state = MapAnimation::new();
    state.commit(cells.into_iter().filter(|(_, loops)| !loops.is_empty()).collect())?;
    Ok(Decoded { state, errors })
}
