use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HierError {
    #[snafu(display("Attribute `{}` is missing", field))]
    MissingField { field: String },
    #[snafu(display("Attribute `{}` is not a finite number: {}", field, value))]
    InvalidNumber { field: String, value: String },
    #[snafu(display("Attribute `{}` must be a string or a number", field))]
    InvalidText { field: String },
    #[snafu(display("Inverted box on {} axis: min {} > max {}", axis, min, max))]
    InvertedBox { axis: char, min: f64, max: f64 },
    #[snafu(display("No record {} of class `{}` in image `{}`", index, label, image_id))]
    UnknownRecord {
        image_id: String,
        label: String,
        index: usize,
    },
    #[snafu(display("Hierarchy pair `{}` is not of the form `child:parent`", text))]
    InvalidPair { text: String },
    #[snafu(display("Read or write `{}` error: {}", path, source))]
    Io {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Json `{}` error: {}", stage, source))]
    Json {
        source: serde_json::Error,
        stage: String,
    },
    #[snafu(display("Csv `{}` error: {}", path, source))]
    Csv { source: csv::Error, path: String },
}

impl HierError {
    /// Whether this error comes from a malformed input row rather than I/O.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            HierError::MissingField { .. }
                | HierError::InvalidNumber { .. }
                | HierError::InvalidText { .. }
                | HierError::InvertedBox { .. }
        )
    }
}
