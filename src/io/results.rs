use crate::config::{OutputFormat, output_fields};
use crate::parser::StreamlinePoint;

pub const STREAMLINE_LAYER_NAME: &str = "Streamline";

// One computed flowline, ready for a geometry sink
#[derive(Debug, Clone)]
pub struct Streamline {
    pub name: String,
    /// CRS tag of the caller's project; passed through untouched.
    pub crs: String,
    pub format: Option<OutputFormat>,
    pub points: Vec<StreamlinePoint>,
}

impl Streamline {
    pub fn new(crs: &str, format: Option<OutputFormat>, points: Vec<StreamlinePoint>) -> Self {
        Streamline {
            name: STREAMLINE_LAYER_NAME.to_string(),
            crs: crs.to_string(),
            format,
            points,
        }
    }

    pub fn fields(&self) -> &'static [&'static str] {
        output_fields(self.format)
    }
}
