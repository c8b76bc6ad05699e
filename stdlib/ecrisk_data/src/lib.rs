//! Patient tables in, prediction tables out.

pub mod output;
pub mod table;
pub mod validate;

pub use output::{
    error_report_path, read_predictions, resolve_output_path, write_error_report,
    write_predictions, PredictionTable, DEFAULT_OUTPUT_FILE,
};
pub use table::{read_delimited, read_table, InputFormat, ReadOptions, Table, TableRow};
pub use validate::{align_columns, validate_table, ValidationReport};
