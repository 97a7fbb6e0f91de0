use crate::config::{OutputFormat, output_fields};
use std::str::Lines;
use tracing::debug;

/// One row of grd2stream output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamlinePoint {
    pub x: f64,
    pub y: f64,
    pub dist: f64,
    pub v_x: Option<f64>,
    pub v_y: Option<f64>,
    pub time: Option<f64>,
}

impl StreamlinePoint {
    /// Attribute values in the column order of the output format.
    pub fn attributes(&self) -> Vec<f64> {
        [
            Some(self.x),
            Some(self.y),
            Some(self.dist),
            self.v_x,
            self.v_y,
            self.time,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn from_values(values: &[f64], format: Option<OutputFormat>) -> Self {
        let extra = |i: usize| match format {
            Some(_) => values.get(i).copied(),
            None => None,
        };
        StreamlinePoint {
            x: values[0],
            y: values[1],
            dist: values[2],
            v_x: extra(3),
            v_y: extra(4),
            time: match format {
                Some(OutputFormat::Time) => values.get(5).copied(),
                _ => None,
            },
        }
    }
}

/// Lazy iterator over the points in a block of tool output.
///
/// Cloning it restarts from the same position, so the output can be walked
/// several times without re-parsing upfront.
#[derive(Debug, Clone)]
pub struct StreamlinePoints<'a> {
    lines: Lines<'a>,
    format: Option<OutputFormat>,
}

impl Iterator for StreamlinePoints<'_> {
    type Item = StreamlinePoint;

    fn next(&mut self) -> Option<Self::Item> {
        let expected = output_fields(self.format).len();
        for line in self.lines.by_ref() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('>') {
                continue;
            }
            let values: Result<Vec<f64>, _> =
                line.split_whitespace().map(str::parse::<f64>).collect();
            match values {
                Ok(values) if values.len() >= expected => {
                    return Some(StreamlinePoint::from_values(&values, self.format));
                }
                _ => debug!("Skipping malformed output line: {}", line),
            }
        }
        None
    }
}

/// Parses grd2stream stdout for the given output format.
pub fn parse(stdout: &str, format: Option<OutputFormat>) -> StreamlinePoints<'_> {
    StreamlinePoints {
        lines: stdout.lines(),
        format,
    }
}
