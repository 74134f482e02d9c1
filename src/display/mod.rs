//! Display formatting for terminal output

pub mod transaction;

pub use transaction::{
    format_import_result, format_transaction_details, format_transaction_register,
    format_transaction_row,
};
